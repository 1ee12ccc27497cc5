// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-cutting effects applied through [`Modified`](crate::Modified).

use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::RenderResult;
use crate::shadow::Shadow;

/// An effect applied to the components wrapped by a [`Modified`](crate::Modified).
///
/// After the modified content has been expanded, the graph calls
/// [`update`](Self::update) once for every non-foundational component that
/// can be reached from the content without crossing another `Modified`.
pub trait Modifier: Send + Sync + 'static {
    /// Applies the effect to `shadow`.
    ///
    /// Reads through `shadow` are recorded on behalf of the modified
    /// primitive, so writes to what was read re-apply the modifier.
    fn update<'a>(&'a self, shadow: &'a Shadow) -> BoxFuture<'a, RenderResult<()>>;

    /// Adds the modifier's context values to `context`.
    ///
    /// Context lookups walk up from the reader, and call this on every
    /// modifier found on the way, outermost first.
    fn contribute_context(&self, context: &mut Context) {
        let _ = context;
    }

    /// Returns the modifier's type name, for diagnostics.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
