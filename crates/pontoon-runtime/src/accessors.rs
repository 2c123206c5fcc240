//! Builds the per-handle closures that route host operations to the
//! engine boundary.
//!
//! Every closure built here performs exactly one boundary call per
//! invocation, acquiring the session lock internally and failing fast
//! once the session is closed. The two cross-cutting capability
//! closures (type resolver, equality checker) are built once at factory
//! construction and shared by `Arc`, so their identity is stable for
//! the lifetime of the session — the engine keys internal caches on it.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use pontoon_engine::{
    EngineError, EngineResult, ExternalValue, HostCallback, RawValue, Resolvers, ValueHandle,
};

use crate::monitor::ReferenceMonitor;
use crate::reference::ValueReference;
use crate::session::SessionCore;
use crate::value::{
    ArraySizeGetter, ConstructorInvoker, ElementGetter, ElementSetter, FunctionCallback,
    FunctionInvoker, HandlerSetter, PropertyGetter, PropertySetter, ValueGetter, ValueSetter,
};

pub(crate) struct AccessorsFactory {
    shared: Arc<FactoryShared>,
}

/// State every accessor closure captures: the boundary gate, the
/// monitor that gives new handles lifecycle coverage, and the shared
/// resolution pair.
struct FactoryShared {
    core: Arc<SessionCore>,
    monitor: Arc<ReferenceMonitor>,
    resolvers: Resolvers,
}

impl FactoryShared {
    /// The single point where a raw engine value becomes a host-side
    /// reference: registers the handle's release with the monitor
    /// (capturing only the handle scalar and the boundary gate, never
    /// the reference) and wraps it. Every handle that reaches host
    /// code passes through here exactly once.
    fn adopt(&self, raw: RawValue) -> ValueReference {
        let core = self.core.clone();
        let handle = raw.handle;
        let guard = self.monitor.track(Box::new(move || {
            core.release_value(handle);
        }));
        ValueReference::new(raw.handle, raw.nominal_type, self.resolvers.clone(), guard)
    }
}

impl AccessorsFactory {
    pub(crate) fn new(core: Arc<SessionCore>, monitor: Arc<ReferenceMonitor>) -> Self {
        // Built eagerly, once: the engine caches against the closure
        // identity, so these must never be rebuilt for the session.
        let type_core = core.clone();
        let type_of: pontoon_engine::TypeResolverFn = Arc::new(move |handle: ValueHandle| {
            type_core.enter(|engine, ctx| Ok(engine.value_type(ctx, handle)))
        });

        let eq_core = core.clone();
        let equals: pontoon_engine::EqualityFn = Arc::new(move |a: ValueHandle, b: ValueHandle| {
            eq_core
                .enter(|engine, ctx| Ok(engine.values_equal(ctx, a, b)))
                .unwrap_or(false)
        });

        Self {
            shared: Arc::new(FactoryShared {
                core,
                monitor,
                resolvers: Resolvers { type_of, equals },
            }),
        }
    }

    /// The session-wide resolution pair. Clones share identity.
    pub(crate) fn resolvers(&self) -> &Resolvers {
        &self.shared.resolvers
    }

    pub(crate) fn adopt(&self, raw: RawValue) -> ValueReference {
        self.shared.adopt(raw)
    }

    pub(crate) fn boolean_getter(&self, handle: ValueHandle) -> ValueGetter<bool> {
        let core = self.shared.core.clone();
        Box::new(move || core.enter(|engine, ctx| engine.get_boolean(ctx, handle)))
    }

    pub(crate) fn boolean_setter(&self, handle: ValueHandle) -> ValueSetter<bool> {
        let core = self.shared.core.clone();
        Box::new(move |value| core.enter(|engine, ctx| engine.set_boolean(ctx, handle, *value)))
    }

    pub(crate) fn integer_getter(&self, handle: ValueHandle) -> ValueGetter<i64> {
        let core = self.shared.core.clone();
        Box::new(move || core.enter(|engine, ctx| engine.get_integer(ctx, handle)))
    }

    pub(crate) fn integer_setter(&self, handle: ValueHandle) -> ValueSetter<i64> {
        let core = self.shared.core.clone();
        Box::new(move |value| core.enter(|engine, ctx| engine.set_integer(ctx, handle, *value)))
    }

    pub(crate) fn float_getter(&self, handle: ValueHandle) -> ValueGetter<f64> {
        let core = self.shared.core.clone();
        Box::new(move || core.enter(|engine, ctx| engine.get_float(ctx, handle)))
    }

    pub(crate) fn float_setter(&self, handle: ValueHandle) -> ValueSetter<f64> {
        let core = self.shared.core.clone();
        Box::new(move |value| core.enter(|engine, ctx| engine.set_float(ctx, handle, *value)))
    }

    pub(crate) fn string_getter(&self, handle: ValueHandle) -> ValueGetter<String> {
        let core = self.shared.core.clone();
        Box::new(move || core.enter(|engine, ctx| engine.get_string(ctx, handle)))
    }

    pub(crate) fn string_setter(&self, handle: ValueHandle) -> ValueSetter<String> {
        let core = self.shared.core.clone();
        Box::new(move |value: &String| {
            core.enter(|engine, ctx| engine.set_string(ctx, handle, value))
        })
    }

    pub(crate) fn external_getter(&self, handle: ValueHandle) -> ValueGetter<ExternalValue> {
        let core = self.shared.core.clone();
        Box::new(move || core.enter(|engine, ctx| engine.get_external(ctx, handle)))
    }

    pub(crate) fn external_setter(&self, handle: ValueHandle) -> ValueSetter<ExternalValue> {
        let core = self.shared.core.clone();
        Box::new(move |value: &ExternalValue| {
            core.enter(|engine, ctx| engine.set_external(ctx, handle, value.clone()))
        })
    }

    /// Dates cross the boundary as RFC 3339 strings with millisecond
    /// precision — the one shared, round-trippable format. Parsing and
    /// formatting are stateless, so they run outside the session lock.
    pub(crate) fn date_getter(&self, handle: ValueHandle) -> ValueGetter<DateTime<Utc>> {
        let core = self.shared.core.clone();
        Box::new(move || {
            let text = core.enter(|engine, ctx| engine.get_date_string(ctx, handle))?;
            DateTime::parse_from_rfc3339(&text)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|e| {
                    EngineError::Internal(format!("engine returned malformed timestamp {text:?}: {e}"))
                })
        })
    }

    pub(crate) fn date_setter(&self, handle: ValueHandle) -> ValueSetter<DateTime<Utc>> {
        let core = self.shared.core.clone();
        Box::new(move |value: &DateTime<Utc>| {
            let text = value.to_rfc3339_opts(SecondsFormat::Millis, true);
            core.enter(|engine, ctx| engine.set_date_string(ctx, handle, &text))
        })
    }

    pub(crate) fn property_getter(&self, handle: ValueHandle) -> PropertyGetter {
        let shared = self.shared.clone();
        Box::new(move |name: &str| {
            let raw = shared
                .core
                .enter(|engine, ctx| engine.get_property(ctx, handle, name, &shared.resolvers))?;
            Ok(shared.adopt(raw))
        })
    }

    pub(crate) fn property_setter(&self, handle: ValueHandle) -> PropertySetter {
        let core = self.shared.core.clone();
        Box::new(move |name: &str, value: &ValueReference| {
            core.enter(|engine, ctx| engine.set_property(ctx, handle, name, value.handle()))
        })
    }

    pub(crate) fn array_size_getter(&self, handle: ValueHandle) -> ArraySizeGetter {
        let core = self.shared.core.clone();
        Box::new(move || core.enter(|engine, ctx| engine.array_size(ctx, handle)))
    }

    pub(crate) fn element_getter(&self, handle: ValueHandle) -> ElementGetter {
        let shared = self.shared.clone();
        Box::new(move |index: usize| {
            let raw = shared
                .core
                .enter(|engine, ctx| engine.get_element(ctx, handle, index, &shared.resolvers))?;
            Ok(shared.adopt(raw))
        })
    }

    pub(crate) fn element_setter(&self, handle: ValueHandle) -> ElementSetter {
        let core = self.shared.core.clone();
        Box::new(move |index: usize, value: &ValueReference| {
            core.enter(|engine, ctx| engine.set_element(ctx, handle, index, value.handle()))
        })
    }

    pub(crate) fn function_invoker(&self, handle: ValueHandle) -> FunctionInvoker {
        let shared = self.shared.clone();
        Box::new(move |receiver: &ValueReference, args: &[ValueReference]| {
            let arg_handles: Vec<ValueHandle> = args.iter().map(ValueReference::handle).collect();
            let raw = shared.core.enter(|engine, ctx| {
                engine.invoke(ctx, handle, receiver.handle(), &arg_handles, &shared.resolvers)
            })?;
            Ok(shared.adopt(raw))
        })
    }

    pub(crate) fn constructor_invoker(&self, handle: ValueHandle) -> ConstructorInvoker {
        let shared = self.shared.clone();
        Box::new(move |args: &[ValueReference]| {
            let arg_handles: Vec<ValueHandle> = args.iter().map(ValueReference::handle).collect();
            let raw = shared.core.enter(|engine, ctx| {
                engine.construct(ctx, handle, &arg_handles, &shared.resolvers)
            })?;
            Ok(shared.adopt(raw))
        })
    }

    /// Wraps the host's typed callback into the raw shape the engine
    /// invokes. The shim adopts every argument handle before the host
    /// code sees it — this is how foreign-originated values get
    /// lifecycle coverage — and wraps a callback error into the
    /// execution failure surfaced to the script caller.
    pub(crate) fn handler_setter(&self, handle: ValueHandle) -> HandlerSetter {
        let shared = self.shared.clone();
        Box::new(move |callback: FunctionCallback| {
            let shim_shared = shared.clone();
            let raw_callback: HostCallback = Arc::new(move |raws: &[RawValue]| {
                let args: Vec<ValueReference> =
                    raws.iter().map(|raw| shim_shared.adopt(*raw)).collect();
                let result = callback(&args).map_err(EngineError::execution_from_callback)?;
                Ok(RawValue {
                    handle: result.handle(),
                    nominal_type: result.nominal_type(),
                })
            });
            shared.core.enter(|engine, ctx| {
                engine.set_function_handler(ctx, handle, raw_callback, &shared.resolvers)
            })
        })
    }
}
