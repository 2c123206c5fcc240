//! Boundary contract for the pontoon script-engine bridge.
//!
//! The foreign engine keeps every script value in native memory and
//! exposes it to the host only as an opaque integer handle. This crate
//! defines the contract the rest of the bridge programs against: the
//! handle newtypes, the finite set of value kinds ([`TypeTag`]), the
//! per-handle payload cache the engine uses to reach host-side data it
//! cannot store itself ([`HandleCache`]), the shared capability
//! closures that accompany every handle-producing call ([`Resolvers`]),
//! and the [`EngineBoundary`] trait itself.
//!
//! Nothing in this crate calls the engine; it only describes the call
//! surface. The lifecycle and resolution machinery lives in
//! `pontoon-runtime`.

mod boundary;
mod cache;
mod error;
mod handle;
mod types;

pub use boundary::{
    EngineBoundary, EqualityFn, ExternalValue, HostCallback, RawValue, Resolvers, SessionCaches,
    TypeResolverFn,
};
pub use cache::HandleCache;
pub use error::{EngineError, EngineResult};
pub use handle::{ContextHandle, ValueHandle};
pub use types::TypeTag;
