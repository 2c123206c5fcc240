//! Reference lifecycle and typed value resolution for the pontoon
//! script-engine bridge.
//!
//! The foreign engine owns every script value; the host sees only
//! opaque handles. This crate keeps the two lifetimes synchronized and
//! puts a statically-typed surface over the dynamically-typed foreign
//! values:
//!
//! - [`Session`] is the entry point: it owns one foreign context, one
//!   [`ReferenceMonitor`], and the accessor machinery. All boundary
//!   calls are serialized on a per-session reentrant lock, so the
//!   engine never sees two in-flight calls for one context.
//! - [`ValueReference`] describes one foreign value. Dropping the last
//!   clone notifies the monitor, which releases the foreign handle on
//!   its own thread — never on the dropping thread, which may not be
//!   allowed to touch the engine at that moment.
//! - [`Session::resolve`] maps a reference to a [`TypedValue`]: one
//!   wrapper shape per value kind, each carrying exactly the
//!   operations valid for that kind.
//!
//! # Example
//!
//! ```ignore
//! use pontoon_runtime::{Session, TypedValue};
//! use pontoon_engine::TypeTag;
//!
//! let session = Session::new(engine)?;
//! let value = session.new_reference(TypeTag::Integer)?;
//! if let TypedValue::Integer(n) = session.resolve(&value)? {
//!     n.set(42)?;
//!     assert_eq!(n.get()?, 42);
//! }
//! session.close();
//! ```
//!
//! Closing a session (or dropping it) first drains the monitor so
//! every outstanding handle release runs against the still-live
//! context, then releases the context itself. A closed session fails
//! every further operation with `ClosedSession`.

mod accessors;
mod monitor;
mod reference;
mod session;
mod value;

pub use monitor::{CleanUpAction, DEFAULT_POLL_INTERVAL, DropGuard, ReferenceMonitor};
pub use reference::ValueReference;
pub use session::{Session, SessionBuilder, TypeResolution};
pub use value::{
    FunctionCallback, JsArray, JsBoolean, JsDate, JsExternal, JsFloat, JsFunction, JsInteger,
    JsObject, JsString, TypedValue,
};

// Re-export the boundary contract so most consumers depend on one
// crate.
pub use pontoon_engine::{
    ContextHandle, EngineBoundary, EngineError, EngineResult, EqualityFn, ExternalValue,
    HandleCache, HostCallback, RawValue, Resolvers, SessionCaches, TypeResolverFn, TypeTag,
    ValueHandle,
};
