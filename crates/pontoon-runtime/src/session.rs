//! Session orchestration: the one entry point host applications use.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::ReentrantMutex;
use pontoon_engine::{
    ContextHandle, EngineBoundary, EngineError, EngineResult, SessionCaches, TypeTag, ValueHandle,
};
use tracing::debug;

use crate::accessors::AccessorsFactory;
use crate::monitor::{DEFAULT_POLL_INTERVAL, ReferenceMonitor};
use crate::reference::ValueReference;
use crate::value::{
    JsArray, JsBoolean, JsDate, JsExternal, JsFloat, JsFunction, JsInteger, JsObject, JsString,
    TypedValue,
};

/// Which type drives resolution of a reference into a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeResolution {
    /// The type recorded when the handle was produced. Fast common
    /// path: no boundary call.
    #[default]
    Nominal,
    /// The type the engine reports right now. Escape hatch for
    /// precision-sensitive or polymorphic consumers; one boundary call.
    Actual,
}

/// Gate in front of the boundary: the per-session lock plus the closed
/// flag. Every boundary crossing in the crate goes through [`enter`],
/// which serializes calls (the engine tolerates one in-flight call per
/// context) and fails fast after close.
///
/// The lock is reentrant because a host callback invoked from inside
/// `invoke` legally reaches accessors again on the same thread.
///
/// [`enter`]: SessionCore::enter
pub(crate) struct SessionCore {
    engine: Arc<dyn EngineBoundary>,
    ctx: ContextHandle,
    lock: ReentrantMutex<()>,
    closed: AtomicBool,
}

impl SessionCore {
    pub(crate) fn enter<R>(
        &self,
        op: impl FnOnce(&dyn EngineBoundary, ContextHandle) -> EngineResult<R>,
    ) -> EngineResult<R> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ClosedSession);
        }
        let _guard = self.lock.lock();
        // Re-checked under the lock: close() may have won the race.
        if self.closed.load(Ordering::SeqCst) {
            return Err(EngineError::ClosedSession);
        }
        op(self.engine.as_ref(), self.ctx)
    }

    /// Release path for cleanup actions. Serialized like any boundary
    /// call but deliberately not gated on the closed flag: the
    /// shutdown drain runs *after* close() flips the flag and *before*
    /// the context itself is released.
    pub(crate) fn release_value(&self, handle: ValueHandle) {
        let _guard = self.lock.lock();
        self.engine.release_value(self.ctx, handle);
    }
}

/// Configures and builds a [`Session`].
pub struct SessionBuilder {
    engine: Arc<dyn EngineBoundary>,
    poll_interval: Duration,
}

impl SessionBuilder {
    /// How long the reference monitor sleeps between wake-ups when no
    /// release is pending. Bounds shutdown latency.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn build(self) -> EngineResult<Session> {
        let caches = SessionCaches::new();
        let ctx = self.engine.create_context(caches.clone())?;

        let monitor = Arc::new(ReferenceMonitor::with_poll_interval(self.poll_interval));
        monitor.start()?;

        let core = Arc::new(SessionCore {
            engine: self.engine,
            ctx,
            lock: ReentrantMutex::new(()),
            closed: AtomicBool::new(false),
        });
        let factory = AccessorsFactory::new(core.clone(), monitor.clone());

        debug!(%ctx, "session opened");
        Ok(Session {
            core,
            monitor,
            factory,
            caches,
        })
    }
}

/// One foreign engine context together with the machinery that keeps
/// host and foreign lifetimes synchronized.
///
/// Host code never touches handles directly: it creates values through
/// [`new_reference`] or [`run_script`], resolves them into
/// capability-typed wrappers with [`resolve`], and lets dropped
/// references release themselves through the session's reference
/// monitor. [`close`] is idempotent and also runs on drop.
///
/// [`new_reference`]: Session::new_reference
/// [`run_script`]: Session::run_script
/// [`resolve`]: Session::resolve
/// [`close`]: Session::close
pub struct Session {
    core: Arc<SessionCore>,
    monitor: Arc<ReferenceMonitor>,
    factory: AccessorsFactory,
    caches: Arc<SessionCaches>,
}

impl Session {
    /// Session over `engine` with default settings.
    pub fn new(engine: Arc<dyn EngineBoundary>) -> EngineResult<Self> {
        Self::builder(engine).build()
    }

    pub fn builder(engine: Arc<dyn EngineBoundary>) -> SessionBuilder {
        SessionBuilder {
            engine,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// The raw context handle, for external collaborators (inspector,
    /// library loaders) that identify sessions by it.
    pub fn native_handle(&self) -> ContextHandle {
        self.core.ctx
    }

    pub fn is_closed(&self) -> bool {
        self.core.closed.load(Ordering::SeqCst)
    }

    /// Allocates a new foreign value of the given kind, initialized to
    /// the kind's zero value, and registers it for lifecycle tracking
    /// before it is returned.
    pub fn new_reference(&self, tag: TypeTag) -> EngineResult<ValueReference> {
        let resolvers = self.factory.resolvers();
        let raw = self.core.enter(|engine, ctx| {
            let raw = engine.allocate(ctx, tag, resolvers)?;
            match tag {
                TypeTag::Undefined => engine.init_undefined(ctx, raw.handle)?,
                TypeTag::Null => engine.init_null(ctx, raw.handle)?,
                TypeTag::Boolean => engine.init_boolean(ctx, raw.handle)?,
                TypeTag::Integer => engine.init_integer(ctx, raw.handle)?,
                TypeTag::Float => engine.init_float(ctx, raw.handle)?,
                TypeTag::String => engine.init_string(ctx, raw.handle)?,
                TypeTag::External => engine.init_external(ctx, raw.handle)?,
                TypeTag::Object => engine.init_object(ctx, raw.handle)?,
                TypeTag::Date => engine.init_date(ctx, raw.handle)?,
                TypeTag::Array => engine.init_array(ctx, raw.handle)?,
                TypeTag::Function => engine.init_function(ctx, raw.handle)?,
            }
            Ok(raw)
        })?;
        Ok(self.factory.adopt(raw))
    }

    /// Resolves by nominal type. See [`resolve_as`].
    ///
    /// [`resolve_as`]: Session::resolve_as
    pub fn resolve(&self, reference: &ValueReference) -> EngineResult<TypedValue> {
        self.resolve_as(reference, TypeResolution::Nominal)
    }

    /// Maps a reference to the capability-typed wrapper for its type.
    ///
    /// Nominal resolution switches on the type recorded at creation;
    /// actual resolution asks the engine for the live type first, for
    /// values whose storage representation may have changed (an integer
    /// write can read back as a float).
    pub fn resolve_as(
        &self,
        reference: &ValueReference,
        resolution: TypeResolution,
    ) -> EngineResult<TypedValue> {
        if self.is_closed() {
            return Err(EngineError::ClosedSession);
        }
        let tag = match resolution {
            TypeResolution::Nominal => reference.nominal_type(),
            TypeResolution::Actual => reference.actual_type()?,
        };
        let f = &self.factory;
        let handle = reference.handle();
        Ok(match tag {
            TypeTag::Undefined => TypedValue::Undefined,
            TypeTag::Null => TypedValue::Null,
            TypeTag::Boolean => TypedValue::Boolean(JsBoolean {
                reference: reference.clone(),
                get: f.boolean_getter(handle),
                set: f.boolean_setter(handle),
            }),
            TypeTag::Integer => TypedValue::Integer(JsInteger {
                reference: reference.clone(),
                get: f.integer_getter(handle),
                set: f.integer_setter(handle),
            }),
            TypeTag::Float => TypedValue::Float(JsFloat {
                reference: reference.clone(),
                get: f.float_getter(handle),
                set: f.float_setter(handle),
            }),
            TypeTag::String => TypedValue::String(JsString {
                reference: reference.clone(),
                get: f.string_getter(handle),
                set: f.string_setter(handle),
            }),
            TypeTag::External => TypedValue::External(JsExternal {
                reference: reference.clone(),
                get: f.external_getter(handle),
                set: f.external_setter(handle),
            }),
            TypeTag::Object => TypedValue::Object(JsObject {
                reference: reference.clone(),
                get_prop: f.property_getter(handle),
                set_prop: f.property_setter(handle),
            }),
            TypeTag::Date => TypedValue::Date(JsDate {
                reference: reference.clone(),
                get: f.date_getter(handle),
                set: f.date_setter(handle),
                get_prop: f.property_getter(handle),
                set_prop: f.property_setter(handle),
            }),
            TypeTag::Array => TypedValue::Array(JsArray {
                reference: reference.clone(),
                get_prop: f.property_getter(handle),
                set_prop: f.property_setter(handle),
                size: f.array_size_getter(handle),
                get_element: f.element_getter(handle),
                set_element: f.element_setter(handle),
            }),
            TypeTag::Function => TypedValue::Function(JsFunction {
                reference: reference.clone(),
                get_prop: f.property_getter(handle),
                set_prop: f.property_setter(handle),
                invoke: f.function_invoker(handle),
                construct: f.constructor_invoker(handle),
                set_handler: f.handler_setter(handle),
            }),
        })
    }

    /// Compiles and runs `source` under `name` (used in diagnostics).
    /// The result value is lifecycle-tracked like any other reference.
    /// Compilation rejection and runtime failure surface as distinct
    /// errors; neither corrupts the session.
    pub fn run_script(&self, name: &str, source: &str) -> EngineResult<ValueReference> {
        let resolvers = self.factory.resolvers();
        let raw = self
            .core
            .enter(|engine, ctx| engine.run_script(ctx, name, source, resolvers))?;
        Ok(self.factory.adopt(raw))
    }

    /// The context's global object, resolved freshly on every call —
    /// the engine may hand out a new handle each time, so it is never
    /// cached across the session.
    pub fn global_object(&self) -> EngineResult<JsObject> {
        let resolvers = self.factory.resolvers();
        let raw = self
            .core
            .enter(|engine, ctx| engine.global_object(ctx, resolvers))?;
        let reference = self.factory.adopt(raw);
        let handle = reference.handle();
        Ok(JsObject {
            reference,
            get_prop: self.factory.property_getter(handle),
            set_prop: self.factory.property_setter(handle),
        })
    }

    /// Closes the session: stops the reference monitor, waits for it to
    /// drain every outstanding release against the still-live context,
    /// then releases the context itself and the session caches.
    ///
    /// Idempotent; later calls are no-ops. Every other operation fails
    /// with `ClosedSession` from the moment the first close begins.
    ///
    /// Draining before the context release is load-bearing: the other
    /// order would point outstanding cleanups at a destroyed context.
    pub fn close(&self) {
        if self.core.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(ctx = %self.core.ctx, "closing session");

        self.monitor.interrupt();
        self.monitor.join();

        let _guard = self.core.lock.lock();
        let released = self.core.engine.release_context(self.core.ctx);
        if !released {
            debug!(ctx = %self.core.ctx, "engine reported context already released");
        }

        self.caches.callbacks.lock().clear();
        self.caches.type_getters.lock().clear();
        self.caches.equality_checkers.lock().clear();
        self.caches.externals.lock().clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl PartialEq for Session {
    /// Two sessions are the same session iff they wrap the same
    /// foreign context.
    fn eq(&self, other: &Self) -> bool {
        self.core.ctx == other.core.ctx
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.core.ctx.hash(state);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("ctx", &self.core.ctx)
            .field("closed", &self.is_closed())
            .finish()
    }
}
