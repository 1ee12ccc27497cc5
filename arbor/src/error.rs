// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable render failures.

use core::error::Error;
use core::fmt;

use arbor_location::Location;

/// Result alias for fallible rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// A component body, primitive child, modifier, or dynamic property failed.
///
/// Failures propagate to the caller that requested the render. The graph keeps
/// whatever it had cached before the failed attempt, so retrying is always
/// safe.
///
/// The error remembers the innermost location at which it was observed.
pub struct RenderError {
    location: Option<Location>,
    source: Box<dyn Error + Send + Sync>,
}

impl RenderError {
    /// Wraps a failure reported by user code.
    ///
    /// Strings are accepted too: `RenderError::new("feed unavailable")`.
    #[must_use]
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            location: None,
            source: source.into(),
        }
    }

    /// Returns the location whose rendering failed, if known.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Returns the underlying failure.
    #[must_use]
    pub fn failure(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.source
    }

    /// Consumes the error, returning the underlying failure.
    #[must_use]
    pub fn into_failure(self) -> Box<dyn Error + Send + Sync> {
        self.source
    }

    /// Attaches `location` unless a more specific one is already known.
    #[must_use]
    pub(crate) fn at(mut self, location: &Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }
}

impl fmt::Debug for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderError")
            .field("location", &self.location)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "rendering {location} failed: {}", self.source),
            None => write!(f, "rendering failed: {}", self.source),
        }
    }
}

impl Error for RenderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}
