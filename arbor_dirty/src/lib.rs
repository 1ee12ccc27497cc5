// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arbor Dirty: read-time dependency records and write-time invalidation.
//!
//! Incremental renderers need to know, for every cached value, which inputs
//! it was computed from. This crate provides the bookkeeping for that
//! relationship without knowing anything about what is being cached:
//!
//! - **Dependency records** ([`DependencyTable`], [`Scope`]): "consumer read
//!   the element of some kind at producer" records, created while computing a
//!   consumer and consumed when the producer's element is written.
//! - **Revisions** ([`Revision`]): a change counter for cheap "did anything
//!   change?" checks.
//! - **Tracing** ([`InvalidationTrace`], [`OneCauseRecorder`]): an opt-in hook
//!   that explains why a consumer was invalidated.
//!
//! ## Quick Start
//!
//! ```rust
//! use arbor_dirty::{DependencyTable, Scope};
//!
//! const TITLE: u8 = 0;
//!
//! let mut table = DependencyTable::<&str, u8>::new();
//!
//! // While computing "header", the title stored at "document" was read.
//! table.record("document", TITLE, "header", Scope::Exact);
//!
//! // "header" is recomputed: its previous reads no longer count.
//! table.forget_consumer(&"header");
//! table.record("document", TITLE, "header", Scope::Exact);
//!
//! // The title is written: "header" is stale.
//! assert_eq!(table.take_dependents(&"document", TITLE, Scope::Exact), ["header"]);
//! ```
//!
//! ## Scopes
//!
//! A record with [`Scope::Exact`] reacts to writes at exactly its producer.
//! A record with [`Scope::Subtree`] reacts to writes at its producer or any
//! key beneath it; since the table is agnostic of hierarchy, the caller looks
//! these records up on each ancestor of a written key.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod revision;
mod table;
mod trace;

pub use revision::Revision;
pub use table::{Dependency, DependencyTable, Scope};
pub use trace::{InvalidationCause, InvalidationTrace, OneCauseRecorder};
