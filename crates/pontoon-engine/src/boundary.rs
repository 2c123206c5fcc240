//! The call surface into the foreign engine.
//!
//! This is the only place native calls occur. The engine is assumed not
//! to be safely reentrant from multiple threads: callers hold one
//! per-context lock around every method here. That discipline lives in
//! `pontoon-runtime`; implementations of [`EngineBoundary`] may rely
//! on it.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::HandleCache;
use crate::error::EngineResult;
use crate::handle::{ContextHandle, ValueHandle};
use crate::types::TypeTag;

/// Asks the engine for the *current* type of a value. Fails with
/// `ClosedSession` once the owning session is gone.
pub type TypeResolverFn = Arc<dyn Fn(ValueHandle) -> EngineResult<TypeTag> + Send + Sync>;

/// Delegates value equality to the engine (structural or reference
/// equality inside the foreign heap, never handle identity). Reports
/// unequal once the owning session is closed.
pub type EqualityFn = Arc<dyn Fn(ValueHandle, ValueHandle) -> bool + Send + Sync>;

/// Opaque host payload stored behind an external value.
pub type ExternalValue = Arc<dyn Any + Send + Sync>;

/// Host callback as the engine sees it: raw values in, raw value out.
///
/// The runtime wraps the host's typed callback into this shape; the
/// shim adopts every argument handle into lifecycle coverage before the
/// host code runs, so foreign-originated values are released like any
/// other. A callback error is wrapped by the engine into an execution
/// failure surfaced to the script caller.
pub type HostCallback = Arc<dyn Fn(&[RawValue]) -> EngineResult<RawValue> + Send + Sync>;

/// A new handle as the engine hands it back: the handle itself plus the
/// type the value had at that instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawValue {
    pub handle: ValueHandle,
    pub nominal_type: TypeTag,
}

/// The capability pair accompanying every call that can produce a new
/// handle, so the produced value is immediately resolvable.
///
/// Both closures are built once per session and shared by `Arc`; the
/// engine may key internal caches on closure identity, so clones of the
/// same pair must stay pointer-identical.
#[derive(Clone)]
pub struct Resolvers {
    pub type_of: TypeResolverFn,
    pub equals: EqualityFn,
}

impl Resolvers {
    /// True when `other` shares this pair's closure identities.
    pub fn same_identity(&self, other: &Resolvers) -> bool {
        Arc::ptr_eq(&self.type_of, &other.type_of) && Arc::ptr_eq(&self.equals, &other.equals)
    }
}

impl std::fmt::Debug for Resolvers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolvers")
            .field("type_of", &Arc::as_ptr(&self.type_of))
            .field("equals", &Arc::as_ptr(&self.equals))
            .finish()
    }
}

/// The four per-session caches handed to the engine at context
/// creation, one per payload kind. The engine retrieves host-side data
/// through them by numeric key; it has nowhere to store host objects
/// itself.
///
/// Each cache is individually locked because the engine may consult one
/// while a host thread registers into another; call sites are all
/// boundary-adjacent so contention is bounded by the session lock.
#[derive(Default)]
pub struct SessionCaches {
    pub callbacks: Mutex<HandleCache<HostCallback>>,
    pub type_getters: Mutex<HandleCache<TypeResolverFn>>,
    pub equality_checkers: Mutex<HandleCache<EqualityFn>>,
    pub externals: Mutex<HandleCache<ExternalValue>>,
}

impl SessionCaches {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}


/// Contract of the foreign engine.
///
/// One implementation wraps the real native engine; tests substitute an
/// in-memory double. Every method is synchronous and blocking; there is
/// no timeout on individual calls.
pub trait EngineBoundary: Send + Sync {
    /// Creates a fresh foreign context wired to the given caches.
    fn create_context(&self, caches: Arc<SessionCaches>) -> EngineResult<ContextHandle>;

    /// Releases the whole context. Returns false when the handle was
    /// unknown or already released.
    fn release_context(&self, ctx: ContextHandle) -> bool;

    /// Releases one value handle. Must tolerate a context that is
    /// already gone; this is called from cleanup actions.
    fn release_value(&self, ctx: ContextHandle, handle: ValueHandle);

    /// Current (live) type of the value, which may differ from the
    /// nominal type recorded at creation.
    fn value_type(&self, ctx: ContextHandle, handle: ValueHandle) -> TypeTag;

    /// Engine-defined equality between two values. Two distinct handles
    /// may alias one foreign value.
    fn values_equal(&self, ctx: ContextHandle, a: ValueHandle, b: ValueHandle) -> bool;

    /// Allocates a new uninitialized value slot of the given kind. The
    /// paired `init_*` call writes the kind's zero value.
    fn allocate(
        &self,
        ctx: ContextHandle,
        tag: TypeTag,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue>;

    fn init_undefined(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_null(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_boolean(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_integer(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_float(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_string(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_external(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_object(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_date(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_array(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;
    fn init_function(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()>;

    fn get_boolean(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<bool>;
    fn set_boolean(&self, ctx: ContextHandle, handle: ValueHandle, value: bool)
    -> EngineResult<()>;

    fn get_integer(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<i64>;
    fn set_integer(&self, ctx: ContextHandle, handle: ValueHandle, value: i64)
    -> EngineResult<()>;

    fn get_float(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<f64>;
    fn set_float(&self, ctx: ContextHandle, handle: ValueHandle, value: f64) -> EngineResult<()>;

    fn get_string(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<String>;
    fn set_string(&self, ctx: ContextHandle, handle: ValueHandle, value: &str)
    -> EngineResult<()>;

    /// Date values cross the boundary as timestamp strings in one
    /// shared, round-trippable format (RFC 3339 with milliseconds).
    fn get_date_string(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<String>;
    fn set_date_string(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: &str,
    ) -> EngineResult<()>;

    fn get_external(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<ExternalValue>;
    fn set_external(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: ExternalValue,
    ) -> EngineResult<()>;

    fn get_property(
        &self,
        ctx: ContextHandle,
        object: ValueHandle,
        name: &str,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue>;
    fn set_property(
        &self,
        ctx: ContextHandle,
        object: ValueHandle,
        name: &str,
        value: ValueHandle,
    ) -> EngineResult<()>;

    fn array_size(&self, ctx: ContextHandle, array: ValueHandle) -> EngineResult<usize>;
    fn get_element(
        &self,
        ctx: ContextHandle,
        array: ValueHandle,
        index: usize,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue>;
    fn set_element(
        &self,
        ctx: ContextHandle,
        array: ValueHandle,
        index: usize,
        value: ValueHandle,
    ) -> EngineResult<()>;

    /// Calls `function` with `receiver` as its `this` value.
    fn invoke(
        &self,
        ctx: ContextHandle,
        function: ValueHandle,
        receiver: ValueHandle,
        args: &[ValueHandle],
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue>;

    /// Calls `function` as a constructor.
    fn construct(
        &self,
        ctx: ContextHandle,
        function: ValueHandle,
        args: &[ValueHandle],
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue>;

    /// Installs a host callback behind a function value. The engine
    /// stores it in the session's callback cache keyed by the function
    /// handle, evicting any previous handler.
    fn set_function_handler(
        &self,
        ctx: ContextHandle,
        function: ValueHandle,
        callback: HostCallback,
        resolvers: &Resolvers,
    ) -> EngineResult<()>;

    /// Compiles and runs `source`. Compilation rejection and runtime
    /// failure surface as two distinct error kinds.
    fn run_script(
        &self,
        ctx: ContextHandle,
        name: &str,
        source: &str,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue>;

    /// The context's global object. The engine may hand out a fresh
    /// handle on every call, so callers must not cache the result
    /// across the session.
    fn global_object(&self, ctx: ContextHandle, resolvers: &Resolvers) -> EngineResult<RawValue>;
}
