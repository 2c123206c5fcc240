//! Opaque handle newtypes.
//!
//! A handle is an integer the foreign engine uses to name a value (or a
//! whole context) living in its own memory. Handles carry no meaning on
//! the host side beyond identity within the session that produced them.

use std::fmt;

/// Identifies one foreign engine context (an isolated heap plus its
/// global object). Produced by [`EngineBoundary::create_context`] and
/// only meaningful for calls against the same boundary.
///
/// [`EngineBoundary::create_context`]: crate::EngineBoundary::create_context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(pub u64);

/// Identifies one value inside a foreign context.
///
/// Two distinct handles may alias the same foreign value, which is why
/// value equality is always delegated to the engine instead of being
/// derived from handle identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueHandle(pub u64);

impl fmt::Display for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "val#{}", self.0)
    }
}
