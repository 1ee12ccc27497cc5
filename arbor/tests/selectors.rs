// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for selectors.

use arbor::{
    Body, Component, Group, IntoComponent, Location, RootSelector, Selector, Shadow, ShadowGraph,
    SubjectSelector, ready,
};
use futures::executor::block_on;

#[derive(Clone, Debug)]
struct Book(&'static str);

impl Component for Book {
    fn body(&self) -> Body<'_> {
        ready(arbor::Empty)
    }
}

#[derive(Clone, Debug)]
struct Note;

impl Component for Note {
    fn body(&self) -> Body<'_> {
        ready(arbor::Empty)
    }
}

/// Its books, followed by a note.
#[derive(Clone, Debug)]
struct Shelf(&'static [&'static str]);

impl Component for Shelf {
    fn body(&self) -> Body<'_> {
        let books = self.0.iter().map(|&title| Book(title).into_any());
        ready(Group::new(books.chain([Note.into_any()])))
    }
}

#[derive(Clone, Debug)]
struct Library;

impl Component for Library {
    fn body(&self) -> Body<'_> {
        ready(Group::new([
            Shelf(&["dune", "emma"]).into_any(),
            Shelf(&["ulysses"]).into_any(),
        ]))
    }
}

fn titles(selected: &[Shadow]) -> Vec<&'static str> {
    selected
        .iter()
        .map(|shadow| shadow.subject_as::<Book>().map_or("-", |book| book.0))
        .collect()
}

#[test]
fn children_of_children_skip_primitives() {
    block_on(async {
        let root = ShadowGraph::render(Library).await.unwrap();
        let shelves = root.select_list(&SubjectSelector.children()).await.unwrap();
        assert_eq!(shelves.len(), 2);
        assert!(shelves.iter().all(|shelf| shelf.is::<Shelf>()));

        let everything = SubjectSelector.children().children();
        let items = root.select_list(&everything).await.unwrap();
        assert_eq!(titles(&items), ["dune", "emma", "-", "ulysses", "-"]);

        let books = root
            .select_list(&SubjectSelector.children().children().typed::<Book>())
            .await
            .unwrap();
        assert_eq!(titles(&books), ["dune", "emma", "ulysses"]);
    });
}

#[test]
fn predecessors_of_notes_are_the_last_books() {
    block_on(async {
        let root = ShadowGraph::render(Library).await.unwrap();
        let last_books = SubjectSelector
            .children()
            .children()
            .typed::<Note>()
            .predecessor();
        let selected = root.select_list(&last_books).await.unwrap();
        assert_eq!(titles(&selected), ["emma", "ulysses"]);

        let first = SubjectSelector.children().children().at(0).successor();
        assert_eq!(titles(&root.select_list(&first).await.unwrap()), ["emma"]);
    });
}

#[test]
fn predicates_and_indices_narrow_the_selection() {
    block_on(async {
        let root = ShadowGraph::render(Library).await.unwrap();
        let short = SubjectSelector
            .children()
            .filter(|shelf| shelf.subject_as::<Shelf>().is_some_and(|shelf| shelf.0.len() == 1))
            .children();
        assert_eq!(titles(&root.select_list(&short).await.unwrap()), ["ulysses", "-"]);

        let second_shelf = SubjectSelector.children().at(1);
        let selected = root.select_list(&second_shelf).await.unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].location(), &Location::anchor().body().child(1));
    });
}

#[test]
fn parents_and_the_root_are_found_from_below() {
    block_on(async {
        let root = ShadowGraph::render(Library).await.unwrap();
        let book = root
            .select_list(&SubjectSelector.children().children().at(1))
            .await
            .unwrap()
            .remove(0);
        assert_eq!(titles(&[book.clone()]), ["emma"]);

        let shelf = book.select_list(&SubjectSelector.parents()).await.unwrap();
        assert_eq!(shelf.len(), 1);
        assert!(shelf[0].is::<Shelf>());

        let library = book.select_list(&SubjectSelector.parents().parents()).await.unwrap();
        assert_eq!(library[0].location(), &Location::anchor());
        assert!(root.select_list(&SubjectSelector.parents()).await.unwrap().is_empty());

        let top = book.select_list(&RootSelector).await.unwrap();
        assert!(top[0].subject().ptr_eq(root.subject()));
    });
}

#[test]
fn children_of_a_primitive_root_have_siblings() {
    block_on(async {
        let root = ShadowGraph::render(Group::new([
            Book("a").into_any(),
            Book("b").into_any(),
            Book("c").into_any(),
        ]))
        .await
        .unwrap();
        let middle = SubjectSelector.children().at(1);
        let around = [middle.clone().predecessor(), middle.clone().successor()];
        let mut selected = Vec::new();
        for selector in &around {
            selected.extend(root.select_list(selector).await.unwrap());
        }
        assert_eq!(titles(&selected), ["a", "c"]);

        let parents = root.select_list(&middle.parents()).await.unwrap();
        assert_eq!(parents[0].location(), &Location::anchor());
    });
}

#[test]
fn selectors_can_be_boxed() {
    block_on(async {
        let root = ShadowGraph::render(Library).await.unwrap();
        let selectors: Vec<Box<dyn Selector>> = vec![
            Box::new(SubjectSelector),
            Box::new(SubjectSelector.children().typed::<Book>()),
            Box::new(RootSelector.children().children().typed::<Book>().range(1..9)),
        ];
        let mut counts = Vec::new();
        for selector in &selectors {
            counts.push(root.select_list(selector.as_ref()).await.unwrap().len());
        }
        assert_eq!(counts, [1, 0, 2]);
    });
}
