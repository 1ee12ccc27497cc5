// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The async render driver.
//!
//! Rendering a location means producing its component from the parent,
//! updating the component's dynamic properties, and storing the result.
//! Expanding a location means rendering its children. Both are lazy and
//! memoized in the store; the store lock is never held across an await.

use std::sync::Arc;

use arbor_location::Location;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::component::AnyComponent;
use crate::error::RenderResult;
use crate::graph::ShadowGraph;
use crate::modifier::Modifier;
use crate::primitives::Foundational;
use crate::property::{PropertyPath, update_properties};
use crate::shadow::Shadow;
use crate::store::ChildLocations;

/// Returns the component at `location`, rendering it from its parent if needed.
///
/// # Panics
///
/// Panics if the parent of `location` is not rendered.
pub(crate) fn render_if_needed<'a>(
    graph: &'a ShadowGraph,
    location: &'a Location,
) -> BoxFuture<'a, RenderResult<AnyComponent>> {
    async move {
        let cached = graph.lock().component(location);
        if let Some(component) = cached {
            return Ok(component);
        }

        let produced = match location.parent() {
            None => graph.lock().root(),
            Some(parent) => {
                let parent_component = graph.lock().component(&parent);
                let Some(parent_component) = parent_component else {
                    panic!("cannot render {location}: its parent {parent} has not been rendered");
                };
                produce_child(&parent_component, &parent, location).await?
            }
        };
        let component = prepare(graph, produced, location).await?;
        let mut store = graph.lock();
        if location.parent().is_none_or(|parent| store.is_rendered(&parent)) {
            store.set_component(location.clone(), component.clone());
        } else {
            log::debug!("not caching {location}: its parent was invalidated while rendering");
        }
        Ok(component)
    }
    .boxed()
}

/// Produces the unprepared component at `child` from its rendered parent.
async fn produce_child(
    parent_component: &AnyComponent,
    parent: &Location,
    child: &Location,
) -> RenderResult<AnyComponent> {
    let produced = match parent_component.as_foundational() {
        None => {
            assert!(
                *child == parent.body(),
                "cannot render {child}: `{}` only has a body",
                parent_component.type_name()
            );
            parent_component.body().await
        }
        Some(foundational) => {
            let relative = Location::from_directions(child.last().cloned());
            foundational.child(&relative).await
        }
    };
    produced.map_err(|error| {
        log::warn!("evaluating {parent} failed: {error}");
        error.at(parent)
    })
}

/// Updates the dynamic properties of `component`, which is to be stored at
/// `location`.
///
/// The component is updated on a private copy, so a failure leaves nothing
/// half-updated behind.
async fn prepare(
    graph: &ShadowGraph,
    component: AnyComponent,
    location: &Location,
) -> RenderResult<AnyComponent> {
    let mut updated = match component.composite() {
        Some(composite) => composite.boxed_clone(),
        None => return Ok(component),
    };
    graph.lock().forget_reads(location);

    let shadow = Shadow::tracked(graph.clone(), location.clone(), component.clone(), location.clone());
    let root = PropertyPath::root();
    update_properties(updated.properties(), &shadow, &root)
        .await
        .map_err(|error| {
            log::warn!("updating the properties of {location} failed: {error}");
            error.at(location)
        })?;
    Ok(AnyComponent::from_erased(Arc::from(updated)))
}

/// Returns the component at `location`, re-rendering any ancestor that was
/// invalidated on the way.
///
/// Returns `None` if `location` is no longer produced by its parent.
pub(crate) fn locate<'a>(
    graph: &'a ShadowGraph,
    location: &'a Location,
) -> BoxFuture<'a, RenderResult<Option<AnyComponent>>> {
    async move {
        loop {
            let cached = graph.lock().component(location);
            if cached.is_some() {
                return Ok(cached);
            }
            let Some(parent) = location.parent() else {
                return render_if_needed(graph, location).await.map(Some);
            };
            let Some(parent_component) = locate(graph, &parent).await? else {
                return Ok(None);
            };
            if !expand(graph, &parent, parent_component).await?.contains(location) {
                return Ok(None);
            }
            // Expanding may invalidate `parent` again, e.g. when a preference
            // assigned beneath it changes what an ancestor reads.
            if graph.lock().is_rendered(&parent) {
                return render_if_needed(graph, location).await.map(Some);
            }
            log::trace!("{parent} was invalidated while expanding; locating {location} again");
        }
    }
    .boxed()
}

/// Returns the locations of the children of `parent`, rendering `parent` and
/// its ancestors as needed.
pub(crate) async fn child_locations(
    graph: &ShadowGraph,
    parent: &Location,
) -> RenderResult<Vec<Location>> {
    match locate(graph, parent).await? {
        Some(component) => expand(graph, parent, component).await,
        None => Ok(Vec::new()),
    }
}

/// Renders the children of `parent`, whose rendered component is `component`.
///
/// Children that are already rendered are reused. Children that moved to a
/// new slot under the same identifier take their stored state along. Children
/// no longer produced are collected according to the graph's policy.
pub(crate) fn expand<'a>(
    graph: &'a ShadowGraph,
    parent: &'a Location,
    component: AnyComponent,
) -> BoxFuture<'a, RenderResult<Vec<Location>>> {
    async move {
        let cached = graph.lock().child_locations(parent);
        if let Some(children) = cached {
            return Ok(children);
        }

        let children: Vec<Location> = match component.as_foundational() {
            None => vec![parent.body()],
            Some(foundational) => foundational
                .child_locations()
                .iter()
                .map(|relative| parent.rebase(relative))
                .collect(),
        };
        log::trace!("expanding {parent} into {} children", children.len());
        {
            let mut store = graph.lock();
            store.collect_stale_children(parent);
            store.migrate_identities(parent, &children);
        }

        let mut prepared = Vec::new();
        for child in &children {
            let rendered = graph.lock().is_rendered(child);
            if rendered {
                continue;
            }
            let produced = produce_child(&component, parent, child).await?;
            prepared.push((child.clone(), prepare(graph, produced, child).await?));
        }

        let committed = graph
            .lock()
            .commit_expansion(parent, children.clone(), prepared);
        if !committed {
            let Some(component) = locate(graph, parent).await? else {
                return Ok(Vec::new());
            };
            return expand(graph, parent, component).await;
        }

        if let Some(Foundational::Modified(modified)) = component.as_foundational()
            && let Err(error) = apply_modifier(graph, parent, modified.modifier(), &children).await
        {
            graph.lock().remove_element::<ChildLocations>(parent);
            log::warn!("applying `{}` at {parent} failed: {error}", modified.modifier().name());
            return Err(error.at(parent));
        }
        Ok(children)
    }
    .boxed()
}

/// Calls `modifier` for every non-foundational component reachable from
/// `children` without crossing another modified primitive.
///
/// Reads made by the modifier are recorded on behalf of `origin`.
fn apply_modifier<'a>(
    graph: &'a ShadowGraph,
    origin: &'a Location,
    modifier: &'a dyn Modifier,
    children: &'a [Location],
) -> BoxFuture<'a, RenderResult<()>> {
    async move {
        for child in children {
            let Some(component) = locate(graph, child).await? else {
                continue;
            };
            match component.as_foundational() {
                None => {
                    let shadow =
                        Shadow::tracked(graph.clone(), child.clone(), component, origin.clone());
                    modifier.update(&shadow).await?;
                }
                Some(Foundational::Modified(_)) => {}
                Some(_) => {
                    let nested = expand(graph, child, component).await?;
                    apply_modifier(graph, origin, modifier, &nested).await?;
                }
            }
        }
        Ok(())
    }
    .boxed()
}
