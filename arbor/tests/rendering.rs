// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for rendering and expanding component trees.
//!
//! These exercise how locations are assigned by the foundational primitives,
//! and how state stays attached to its location across re-renders.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use arbor::{
    Body, Component, Either, Empty, ForEach, Group, IntoComponent, Location, PropertyField,
    RenderError, Shadow, ShadowGraph, State, ready,
};
use futures::executor::block_on;

#[derive(Clone, Debug)]
struct Label(&'static str);

impl Component for Label {
    fn body(&self) -> Body<'_> {
        ready(Empty)
    }
}

#[derive(Clone, Debug)]
struct Counter {
    count: State<u32>,
}

impl Counter {
    fn new() -> Self {
        Self {
            count: State::new(0),
        }
    }
}

impl Component for Counter {
    fn body(&self) -> Body<'_> {
        ready(Empty)
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![PropertyField::new("count", &mut self.count)]
    }
}

fn count_of(shadow: &Shadow) -> u32 {
    *shadow.subject_as::<Counter>().unwrap().count.get()
}

fn set_count(shadow: &Shadow, count: u32) {
    shadow.subject_as::<Counter>().unwrap().count.set(count);
}

/// A label that depends on a flag, followed by a counter.
#[derive(Clone, Debug)]
struct Toggled {
    flag: State<bool>,
}

impl Component for Toggled {
    fn body(&self) -> Body<'_> {
        let label = if *self.flag.get() { "on" } else { "off" };
        ready(Group::new([Label(label).into_any(), Counter::new().into_any()]))
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![PropertyField::new("flag", &mut self.flag)]
    }
}

#[test]
fn group_children_get_positional_locations() {
    block_on(async {
        let graph = ShadowGraph::new(Toggled {
            flag: State::new(false),
        });
        let root = graph.root().await.unwrap();
        assert_eq!(root.location(), &Location::anchor());

        let children = root.child_list().await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].subject_as::<Label>().unwrap().0, "off");
        assert_eq!(children[0].location(), &Location::anchor().body().child(0));
        assert_eq!(children[1].location(), &Location::anchor().body().child(1));
    });
}

#[test]
fn state_survives_a_sibling_change() {
    block_on(async {
        let graph = ShadowGraph::new(Toggled {
            flag: State::new(false),
        });
        let root = graph.root().await.unwrap();
        let counter = root.child_list().await.unwrap().remove(1);
        assert_eq!(count_of(&counter), 0);

        set_count(&counter, 5);
        assert_eq!(graph.apply_pending_mutations(), 1);
        assert!(!graph.is_rendered(counter.location()));
        let counter = counter.refresh().await.unwrap().unwrap();
        assert_eq!(count_of(&counter), 5);

        root.subject_as::<Toggled>().unwrap().flag.set(true);
        let root = graph.root().await.unwrap();
        let children = root.child_list().await.unwrap();
        assert_eq!(children[0].subject_as::<Label>().unwrap().0, "on");
        assert_eq!(children[1].location(), counter.location());
        assert_eq!(count_of(&children[1]), 5);
    });
}

#[test]
fn assignments_are_invisible_until_the_next_render() {
    block_on(async {
        let graph = ShadowGraph::new(Counter::new());
        let root = graph.root().await.unwrap();
        set_count(&root, 1);

        // The shadow is a snapshot of the render it came from.
        assert_eq!(count_of(&root), 0);
        assert_eq!(count_of(&graph.root().await.unwrap()), 1);
    });
}

/// Either a counter or another counter, depending on a flag.
#[derive(Clone, Debug)]
struct Switch {
    first: State<bool>,
}

impl Component for Switch {
    fn body(&self) -> Body<'_> {
        ready(Either::when(*self.first.get(), Counter::new(), Counter::new()))
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![PropertyField::new("first", &mut self.first)]
    }
}

async fn only_child(graph: &ShadowGraph) -> Shadow {
    let root = graph.root().await.unwrap();
    let mut children = root.child_list().await.unwrap();
    assert_eq!(children.len(), 1);
    children.remove(0)
}

fn flip(graph: &ShadowGraph, root: &Shadow, first: bool) {
    root.subject_as::<Switch>().unwrap().first.set(first);
    graph.apply_pending_mutations();
}

#[test]
fn either_cases_do_not_share_state() {
    block_on(async {
        let graph = ShadowGraph::new(Switch {
            first: State::new(true),
        });
        let first = only_child(&graph).await;
        assert_eq!(first.location(), &Location::anchor().body().child(0));
        set_count(&first, 3);
        assert_eq!(count_of(&only_child(&graph).await), 3);

        flip(&graph, &graph.root().await.unwrap(), false);
        let second = only_child(&graph).await;
        assert_eq!(second.location(), &Location::anchor().body().child(1));
        assert_eq!(count_of(&second), 0);

        // The first case was collected when it stopped being produced.
        flip(&graph, &graph.root().await.unwrap(), true);
        assert_eq!(count_of(&only_child(&graph).await), 0);
    });
}

/// One counter per identifier, in the order given by state.
#[derive(Clone, Debug)]
struct Rows {
    order: State<Vec<u32>>,
}

impl Component for Rows {
    fn body(&self) -> Body<'_> {
        ready(ForEach::new(self.order.get().clone(), |id| *id, |_| Counter::new()))
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![PropertyField::new("order", &mut self.order)]
    }
}

async fn counts(graph: &ShadowGraph) -> Vec<u32> {
    let root = graph.root().await.unwrap();
    let rows = root.child_list().await.unwrap();
    rows.iter().map(count_of).collect()
}

#[test]
fn for_each_children_keep_state_when_reordered() {
    block_on(async {
        let graph = ShadowGraph::new(Rows {
            order: State::new(vec![1, 2, 3]),
        });
        let root = graph.root().await.unwrap();
        let rows = root.child_list().await.unwrap();
        assert_eq!(rows[1].location(), &Location::anchor().body().child_identified(2_u32, 1));
        set_count(&rows[0], 10);
        set_count(&rows[1], 20);
        set_count(&rows[2], 30);
        assert_eq!(counts(&graph).await, [10, 20, 30]);

        root.subject_as::<Rows>().unwrap().order.set(vec![2, 3, 1]);
        assert_eq!(counts(&graph).await, [20, 30, 10]);

        let root = graph.root().await.unwrap();
        let rows = root.child_list().await.unwrap();
        assert_eq!(rows[0].location(), &Location::anchor().body().child_identified(2_u32, 0));
    });
}

#[test]
fn for_each_children_that_disappear_lose_their_state() {
    block_on(async {
        let graph = ShadowGraph::new(Rows {
            order: State::new(vec![1, 2]),
        });
        let root = graph.root().await.unwrap();
        let rows = root.child_list().await.unwrap();
        set_count(&rows[1], 7);
        assert_eq!(counts(&graph).await, [0, 7]);

        graph.root().await.unwrap().subject_as::<Rows>().unwrap().order.set(vec![1]);
        assert_eq!(counts(&graph).await, [0]);

        graph.root().await.unwrap().subject_as::<Rows>().unwrap().order.set(vec![1, 2]);
        assert_eq!(counts(&graph).await, [0, 0]);
    });
}

/// Two labels.
#[derive(Clone, Debug)]
struct Pair;

impl Component for Pair {
    fn body(&self) -> Body<'_> {
        ready(Group::new([Label("left").into_any(), Label("right").into_any()]))
    }
}

/// One pair per name, in the order given by state.
#[derive(Clone, Debug)]
struct Pairs {
    order: State<Vec<&'static str>>,
}

impl Component for Pairs {
    fn body(&self) -> Body<'_> {
        ready(ForEach::new(self.order.get().clone(), |name| *name, |_| Pair))
    }

    fn properties(&mut self) -> Vec<PropertyField<'_>> {
        vec![PropertyField::new("order", &mut self.order)]
    }
}

#[test]
fn hidden_rows_keep_their_children_when_moved() {
    block_on(async {
        let graph = ShadowGraph::new(Pairs {
            order: State::new(vec!["a", "b"]),
        });
        let root = graph.root().await.unwrap();
        let rows = root.child_list().await.unwrap();
        assert_eq!(rows[0].child_list().await.unwrap().len(), 2);
        rows[0].set_hidden(true);

        root.subject_as::<Pairs>().unwrap().order.set(vec!["b", "a"]);
        let rows = graph.root().await.unwrap().child_list().await.unwrap();
        let moved = &rows[1];
        assert_eq!(moved.location(), &Location::anchor().body().child_identified("a", 1));
        assert!(moved.is_hidden());

        let labels = moved.child_list().await.unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1].location(), &moved.location().body().child(1));
        assert_eq!(labels[1].subject_as::<Label>().unwrap().0, "right");
    });
}

/// Counts how often its body is evaluated.
#[derive(Clone, Debug)]
struct Counted {
    evaluations: Arc<AtomicUsize>,
}

impl Component for Counted {
    fn body(&self) -> Body<'_> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        ready(Group::new([Label("a").into_any(), Label("b").into_any()]))
    }
}

#[test]
fn rendering_again_reuses_the_cache() {
    block_on(async {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let graph = ShadowGraph::new(Counted {
            evaluations: evaluations.clone(),
        });

        let root = graph.root().await.unwrap();
        let first = root.child_list().await.unwrap();
        let second = root.child_list().await.unwrap();
        assert_eq!(evaluations.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), second.len());
        for (first, second) in first.iter().zip(&second) {
            assert!(first.subject().ptr_eq(second.subject()));
        }

        let again = graph.root().await.unwrap();
        assert!(again.subject().ptr_eq(root.subject()));

        let revision = graph.revision();
        again.child_list().await.unwrap();
        assert_eq!(graph.revision(), revision);
    });
}

#[test]
fn invalidating_a_location_renders_it_again() {
    block_on(async {
        let evaluations = Arc::new(AtomicUsize::new(0));
        let graph = ShadowGraph::new(Counted {
            evaluations: evaluations.clone(),
        });
        let root = graph.root().await.unwrap();
        root.child_list().await.unwrap();

        graph.invalidate(&Location::anchor());
        assert!(!graph.is_rendered(&Location::anchor().body()));
        let root = graph.root().await.unwrap();
        assert_eq!(root.child_list().await.unwrap().len(), 2);
        assert_eq!(evaluations.load(Ordering::SeqCst), 2);
    });
}

/// Fails to evaluate its body while `failing` is set.
#[derive(Clone, Debug)]
struct Flaky {
    failing: Arc<AtomicBool>,
}

impl Component for Flaky {
    fn body(&self) -> Body<'_> {
        if self.failing.load(Ordering::SeqCst) {
            Box::pin(async { Err(RenderError::new("feed unavailable")) })
        } else {
            ready(Label("loaded"))
        }
    }
}

#[test]
fn failed_renders_commit_nothing() {
    block_on(async {
        let failing = Arc::new(AtomicBool::new(true));
        let graph = ShadowGraph::new(Group::new([
            Label("header").into_any(),
            Flaky {
                failing: failing.clone(),
            }
            .into_any(),
        ]));
        let root = graph.root().await.unwrap();
        let children = root.child_list().await.unwrap();
        let flaky = &children[1];

        let error = flaky.child_list().await.unwrap_err();
        assert_eq!(error.location(), Some(flaky.location()));
        assert!(error.to_string().contains("feed unavailable"));
        assert!(graph.is_rendered(flaky.location()));
        assert!(!graph.is_rendered(&flaky.location().body()));

        failing.store(false, Ordering::SeqCst);
        let loaded = flaky.child_list().await.unwrap();
        assert_eq!(loaded[0].subject_as::<Label>().unwrap().0, "loaded");
    });
}

#[test]
fn primitives_are_never_exposed_as_children() {
    block_on(async {
        let graph = ShadowGraph::new(Group::new([
            Group::new([Label("a").into_any(), Empty.into_any()]).into_any(),
            Either::when(false, Label("x"), Label("b")).into_any(),
            Label("c").into_any(),
        ]));
        let root = graph.root().await.unwrap();
        let labels: Vec<&'static str> = root
            .child_list()
            .await
            .unwrap()
            .iter()
            .map(|child| child.subject_as::<Label>().unwrap().0)
            .collect();
        assert_eq!(labels, ["a", "b", "c"]);
    });
}

#[test]
fn parents_skip_primitives() {
    block_on(async {
        let graph = ShadowGraph::new(Toggled {
            flag: State::new(false),
        });
        let root = graph.root().await.unwrap();
        let label = root.child_list().await.unwrap().remove(0);
        let parent = label.parent().await.unwrap().unwrap();
        assert_eq!(parent.location(), &Location::anchor());
        assert!(parent.is::<Toggled>());
        assert!(parent.parent().await.unwrap().is_none());
    });
}

#[test]
fn children_of_type_filters_by_component() {
    block_on(async {
        let graph = ShadowGraph::new(Toggled {
            flag: State::new(false),
        });
        let root = graph.root().await.unwrap();
        let counters = root.children_of_type::<Counter>().await.unwrap();
        assert_eq!(counters.len(), 1);
        assert_eq!(counters[0].location(), &Location::anchor().body().child(1));
    });
}

#[test]
#[should_panic(expected = "has not been rendered")]
fn rendering_below_an_unrendered_parent_is_a_contract_violation() {
    let graph = ShadowGraph::new(Label("root"));
    drop(block_on(graph.shadow(Location::anchor().body().child(0))));
}
