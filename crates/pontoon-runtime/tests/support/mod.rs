//! In-memory engine double.
//!
//! Stands in for the native engine wrapper: values live in a slot map
//! behind the same opaque-handle contract, with enough canned script
//! behavior to exercise the runtime. Handles are minted fresh on every
//! boundary call that produces one, and may alias a shared underlying
//! value — exactly the aliasing the real engine exhibits — so equality
//! has to be delegated, not derived from handle numbers.

// Shared by several test binaries; none of them uses all of it.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use pontoon_runtime::{
    ContextHandle, EngineBoundary, EngineError, EngineResult, ExternalValue, HostCallback,
    RawValue, Resolvers, SessionCaches, TypeTag, ValueHandle,
};

/// Identity of an underlying value; several handles may point at one.
type ObjId = u64;

#[derive(Clone)]
enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Timestamp kept in the boundary's string format.
    Date(String),
    External(Option<ExternalValue>),
    Object(HashMap<String, ObjId>),
    Array(Vec<ObjId>),
    /// Handle key under which the host handler was cached, if any.
    Function(Option<ValueHandle>),
}

impl Value {
    fn tag(&self) -> TypeTag {
        match self {
            Value::Undefined => TypeTag::Undefined,
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Int(_) => TypeTag::Integer,
            Value::Float(_) => TypeTag::Float,
            Value::Str(_) => TypeTag::String,
            Value::Date(_) => TypeTag::Date,
            Value::External(_) => TypeTag::External,
            Value::Object(_) => TypeTag::Object,
            Value::Array(_) => TypeTag::Array,
            Value::Function(_) => TypeTag::Function,
        }
    }
}

struct ContextState {
    caches: Arc<SessionCaches>,
    slots: HashMap<ValueHandle, ObjId>,
    objects: HashMap<ObjId, Value>,
    global: ObjId,
    /// First resolver pair seen; later pairs must share its identity.
    resolvers: Option<Resolvers>,
    resolver_identity_stable: bool,
    released_values: HashSet<ValueHandle>,
    release_count: usize,
    double_release: bool,
}

#[derive(Default)]
struct EngineState {
    next_ctx: u64,
    next_obj: u64,
    next_handle: u64,
    contexts: HashMap<ContextHandle, ContextState>,
    /// Accounting snapshots of released contexts, so assertions can run
    /// after a session has fully closed.
    retired: HashMap<ContextHandle, RetiredStats>,
}

#[derive(Clone, Copy)]
struct RetiredStats {
    release_count: usize,
    double_release: bool,
    resolver_identity_stable: bool,
}

/// The test double. Create once, share via `Arc`, hand to `Session`.
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many value handles the session has released so far. Survives
    /// context release.
    pub fn release_count(&self, ctx: ContextHandle) -> usize {
        let state = self.state.lock();
        state
            .contexts
            .get(&ctx)
            .map(|c| c.release_count)
            .or_else(|| state.retired.get(&ctx).map(|s| s.release_count))
            .unwrap_or(0)
    }

    /// True when some handle was released more than once.
    pub fn saw_double_release(&self, ctx: ContextHandle) -> bool {
        let state = self.state.lock();
        state
            .contexts
            .get(&ctx)
            .map(|c| c.double_release)
            .or_else(|| state.retired.get(&ctx).map(|s| s.double_release))
            .unwrap_or(false)
    }

    /// True while every resolver pair seen so far shared one identity.
    pub fn resolver_identity_stable(&self, ctx: ContextHandle) -> bool {
        let state = self.state.lock();
        state
            .contexts
            .get(&ctx)
            .map(|c| c.resolver_identity_stable)
            .or_else(|| state.retired.get(&ctx).map(|s| s.resolver_identity_stable))
            .unwrap_or(true)
    }

    pub fn context_alive(&self, ctx: ContextHandle) -> bool {
        self.state.lock().contexts.contains_key(&ctx)
    }

    fn with_ctx<R>(
        &self,
        ctx: ContextHandle,
        op: impl FnOnce(&mut EngineState, ContextHandle) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let mut state = self.state.lock();
        if !state.contexts.contains_key(&ctx) {
            return Err(EngineError::Internal(format!("unknown context {ctx}")));
        }
        op(&mut state, ctx)
    }
}

impl EngineState {
    fn ctx_mut(&mut self, ctx: ContextHandle) -> &mut ContextState {
        self.contexts.get_mut(&ctx).expect("context checked by caller")
    }

    fn mint_handle(&mut self, ctx: ContextHandle, obj: ObjId) -> ValueHandle {
        self.next_handle += 1;
        let handle = ValueHandle(self.next_handle);
        self.ctx_mut(ctx).slots.insert(handle, obj);
        handle
    }

    fn mint_object(&mut self, ctx: ContextHandle, value: Value) -> (ValueHandle, ObjId) {
        self.next_obj += 1;
        let obj = self.next_obj;
        self.ctx_mut(ctx).objects.insert(obj, value.clone());
        let handle = self.mint_handle(ctx, obj);
        (handle, obj)
    }

    fn raw_for_obj(&mut self, ctx: ContextHandle, obj: ObjId) -> RawValue {
        let tag = self
            .ctx_mut(ctx)
            .objects
            .get(&obj)
            .map(Value::tag)
            .unwrap_or(TypeTag::Undefined);
        RawValue {
            handle: self.mint_handle(ctx, obj),
            nominal_type: tag,
        }
    }

    fn resolve_obj(&mut self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<ObjId> {
        self.ctx_mut(ctx)
            .slots
            .get(&handle)
            .copied()
            .ok_or_else(|| EngineError::Internal(format!("unknown handle {handle}")))
    }

    fn value(&mut self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<Value> {
        let obj = self.resolve_obj(ctx, handle)?;
        self.ctx_mut(ctx)
            .objects
            .get(&obj)
            .cloned()
            .ok_or_else(|| EngineError::Internal(format!("dangling object for {handle}")))
    }

    fn write(
        &mut self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: Value,
    ) -> EngineResult<()> {
        let obj = self.resolve_obj(ctx, handle)?;
        self.ctx_mut(ctx).objects.insert(obj, value);
        Ok(())
    }

    fn note_resolvers(&mut self, ctx: ContextHandle, resolvers: &Resolvers) {
        let state = self.ctx_mut(ctx);
        match &state.resolvers {
            None => {
                state
                    .caches
                    .type_getters
                    .lock()
                    .store(ValueHandle(ctx.0), resolvers.type_of.clone());
                state
                    .caches
                    .equality_checkers
                    .lock()
                    .store(ValueHandle(ctx.0), resolvers.equals.clone());
                state.resolvers = Some(resolvers.clone());
            }
            Some(seen) => {
                if !seen.same_identity(resolvers) {
                    state.resolver_identity_stable = false;
                }
            }
        }
    }
}

fn mismatch(expected: TypeTag, found: &Value) -> EngineError {
    EngineError::TypeMismatch {
        expected,
        actual: found.tag(),
    }
}

/// Structural equality, with identity as the fast path. Float compare
/// is bitwise so the double stays deterministic about NaN.
fn values_structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
            *x as f64 == *y
        }
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        _ => false,
    }
}

impl EngineBoundary for MockEngine {
    fn create_context(&self, caches: Arc<SessionCaches>) -> EngineResult<ContextHandle> {
        let mut state = self.state.lock();
        state.next_ctx += 1;
        let ctx = ContextHandle(state.next_ctx);
        state.next_obj += 1;
        let global = state.next_obj;
        state.contexts.insert(
            ctx,
            ContextState {
                caches,
                slots: HashMap::new(),
                objects: HashMap::from([(global, Value::Object(HashMap::new()))]),
                global,
                resolvers: None,
                resolver_identity_stable: true,
                released_values: HashSet::new(),
                release_count: 0,
                double_release: false,
            },
        );
        Ok(ctx)
    }

    fn release_context(&self, ctx: ContextHandle) -> bool {
        let mut state = self.state.lock();
        match state.contexts.remove(&ctx) {
            Some(context) => {
                state.retired.insert(
                    ctx,
                    RetiredStats {
                        release_count: context.release_count,
                        double_release: context.double_release,
                        resolver_identity_stable: context.resolver_identity_stable,
                    },
                );
                true
            }
            None => false,
        }
    }

    fn release_value(&self, ctx: ContextHandle, handle: ValueHandle) {
        let mut state = self.state.lock();
        // Tolerated after the context is gone.
        let Some(context) = state.contexts.get_mut(&ctx) else {
            return;
        };
        if !context.released_values.insert(handle) || context.slots.remove(&handle).is_none() {
            context.double_release = true;
            return;
        }
        context.release_count += 1;
    }

    fn value_type(&self, ctx: ContextHandle, handle: ValueHandle) -> TypeTag {
        let mut state = self.state.lock();
        if !state.contexts.contains_key(&ctx) {
            return TypeTag::Undefined;
        }
        state.value(ctx, handle).map(|v| v.tag()).unwrap_or(TypeTag::Undefined)
    }

    fn values_equal(&self, ctx: ContextHandle, a: ValueHandle, b: ValueHandle) -> bool {
        let mut state = self.state.lock();
        if !state.contexts.contains_key(&ctx) {
            return false;
        }
        let (Ok(obj_a), Ok(obj_b)) = (state.resolve_obj(ctx, a), state.resolve_obj(ctx, b)) else {
            return false;
        };
        if obj_a == obj_b {
            return true;
        }
        let (Ok(va), Ok(vb)) = (state.value(ctx, a), state.value(ctx, b)) else {
            return false;
        };
        values_structurally_equal(&va, &vb)
    }

    fn allocate(
        &self,
        ctx: ContextHandle,
        tag: TypeTag,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue> {
        self.with_ctx(ctx, |state, ctx| {
            state.note_resolvers(ctx, resolvers);
            let (handle, _) = state.mint_object(ctx, Value::Undefined);
            Ok(RawValue {
                handle,
                nominal_type: tag,
            })
        })
    }

    fn init_undefined(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Undefined))
    }

    fn init_null(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Null))
    }

    fn init_boolean(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Bool(false)))
    }

    fn init_integer(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Int(0)))
    }

    fn init_float(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Float(0.0)))
    }

    fn init_string(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Str(String::new())))
    }

    fn init_external(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::External(None)))
    }

    fn init_object(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Object(HashMap::new())))
    }

    fn init_date(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| {
            s.write(c, handle, Value::Date("1970-01-01T00:00:00.000Z".into()))
        })
    }

    fn init_array(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Array(Vec::new())))
    }

    fn init_function(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Function(None)))
    }

    fn get_boolean(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<bool> {
        self.with_ctx(ctx, |s, c| match s.value(c, handle)? {
            Value::Bool(v) => Ok(v),
            other => Err(mismatch(TypeTag::Boolean, &other)),
        })
    }

    fn set_boolean(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: bool,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Bool(value)))
    }

    fn get_integer(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<i64> {
        self.with_ctx(ctx, |s, c| match s.value(c, handle)? {
            Value::Int(v) => Ok(v),
            Value::Float(v) => Ok(v as i64),
            other => Err(mismatch(TypeTag::Integer, &other)),
        })
    }

    fn set_integer(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: i64,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Int(value)))
    }

    fn get_float(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<f64> {
        self.with_ctx(ctx, |s, c| match s.value(c, handle)? {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(mismatch(TypeTag::Float, &other)),
        })
    }

    fn set_float(&self, ctx: ContextHandle, handle: ValueHandle, value: f64) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Float(value)))
    }

    fn get_string(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<String> {
        self.with_ctx(ctx, |s, c| match s.value(c, handle)? {
            Value::Str(v) => Ok(v),
            other => Err(mismatch(TypeTag::String, &other)),
        })
    }

    fn set_string(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: &str,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Str(value.to_string())))
    }

    fn get_date_string(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<String> {
        self.with_ctx(ctx, |s, c| match s.value(c, handle)? {
            Value::Date(v) => Ok(v),
            other => Err(mismatch(TypeTag::Date, &other)),
        })
    }

    fn set_date_string(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: &str,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| s.write(c, handle, Value::Date(value.to_string())))
    }

    fn get_external(&self, ctx: ContextHandle, handle: ValueHandle) -> EngineResult<ExternalValue> {
        let key = self.with_ctx(ctx, |s, c| match s.value(c, handle)? {
            Value::External(Some(payload)) => Ok(Some(payload)),
            Value::External(None) => Ok(None),
            other => Err(mismatch(TypeTag::External, &other)),
        })?;
        key.ok_or_else(|| EngineError::Internal("external value never set".into()))
    }

    fn set_external(
        &self,
        ctx: ContextHandle,
        handle: ValueHandle,
        value: ExternalValue,
    ) -> EngineResult<()> {
        // Mirror of the external cache contract: the payload lives
        // host-side, keyed by handle.
        self.with_ctx(ctx, |s, c| {
            s.ctx_mut(c)
                .caches
                .externals
                .lock()
                .store(handle, value.clone());
            s.write(c, handle, Value::External(Some(value)))
        })
    }

    fn get_property(
        &self,
        ctx: ContextHandle,
        object: ValueHandle,
        name: &str,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue> {
        self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            let obj = match s.value(c, object)? {
                Value::Object(map) => map,
                Value::Date(_) | Value::Array(_) | Value::Function(_) => HashMap::new(),
                other => return Err(mismatch(TypeTag::Object, &other)),
            };
            match obj.get(name) {
                Some(&target) => Ok(s.raw_for_obj(c, target)),
                None => {
                    let (handle, _) = s.mint_object(c, Value::Undefined);
                    Ok(RawValue {
                        handle,
                        nominal_type: TypeTag::Undefined,
                    })
                }
            }
        })
    }

    fn set_property(
        &self,
        ctx: ContextHandle,
        object: ValueHandle,
        name: &str,
        value: ValueHandle,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| {
            let target = s.resolve_obj(c, value)?;
            let obj_id = s.resolve_obj(c, object)?;
            match s.ctx_mut(c).objects.get_mut(&obj_id) {
                Some(Value::Object(map)) => {
                    map.insert(name.to_string(), target);
                    Ok(())
                }
                Some(other) => Err(mismatch(TypeTag::Object, &other.clone())),
                None => Err(EngineError::Internal("dangling object".into())),
            }
        })
    }

    fn array_size(&self, ctx: ContextHandle, array: ValueHandle) -> EngineResult<usize> {
        self.with_ctx(ctx, |s, c| match s.value(c, array)? {
            Value::Array(items) => Ok(items.len()),
            other => Err(mismatch(TypeTag::Array, &other)),
        })
    }

    fn get_element(
        &self,
        ctx: ContextHandle,
        array: ValueHandle,
        index: usize,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue> {
        self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            let items = match s.value(c, array)? {
                Value::Array(items) => items,
                other => return Err(mismatch(TypeTag::Array, &other)),
            };
            match items.get(index) {
                Some(&target) => Ok(s.raw_for_obj(c, target)),
                None => {
                    let (handle, _) = s.mint_object(c, Value::Undefined);
                    Ok(RawValue {
                        handle,
                        nominal_type: TypeTag::Undefined,
                    })
                }
            }
        })
    }

    fn set_element(
        &self,
        ctx: ContextHandle,
        array: ValueHandle,
        index: usize,
        value: ValueHandle,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| {
            let target = s.resolve_obj(c, value)?;
            let arr_id = s.resolve_obj(c, array)?;
            let len = match s.ctx_mut(c).objects.get(&arr_id) {
                Some(Value::Array(items)) => items.len(),
                Some(other) => return Err(mismatch(TypeTag::Array, &other.clone())),
                None => return Err(EngineError::Internal("dangling array".into())),
            };
            // Holes get distinct undefined values, like a real engine.
            let holes: Vec<ObjId> = (len..index)
                .map(|_| s.mint_object(c, Value::Undefined).1)
                .collect();
            match s.ctx_mut(c).objects.get_mut(&arr_id) {
                Some(Value::Array(items)) => {
                    items.extend(holes);
                    if items.len() <= index {
                        items.push(target);
                    } else {
                        items[index] = target;
                    }
                    Ok(())
                }
                _ => Err(EngineError::Internal("array changed shape".into())),
            }
        })
    }

    fn invoke(
        &self,
        ctx: ContextHandle,
        function: ValueHandle,
        _receiver: ValueHandle,
        args: &[ValueHandle],
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue> {
        // Gather the handler and argument snapshots, then drop the
        // state lock before running host code: the callback will
        // re-enter this engine through the session's reentrant lock.
        let (callback, raw_args) = self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            let handler_key = match s.value(c, function)? {
                Value::Function(key) => key,
                other => return Err(mismatch(TypeTag::Function, &other)),
            };
            let key = handler_key
                .ok_or_else(|| EngineError::execution("function has no handler installed"))?;
            let callback: HostCallback = s
                .ctx_mut(c)
                .caches
                .callbacks
                .lock()
                .get_cloned(key)
                .ok_or_else(|| EngineError::execution("handler missing from callback cache"))?;
            let mut raw_args = Vec::with_capacity(args.len());
            for &arg in args {
                let obj = s.resolve_obj(c, arg)?;
                raw_args.push(s.raw_for_obj(c, obj));
            }
            Ok((callback, raw_args))
        })?;

        let result = callback(&raw_args)?;

        self.with_ctx(ctx, |s, c| {
            let obj = s.resolve_obj(c, result.handle)?;
            Ok(s.raw_for_obj(c, obj))
        })
    }

    fn construct(
        &self,
        ctx: ContextHandle,
        function: ValueHandle,
        args: &[ValueHandle],
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue> {
        // The double models construction as invocation with a fresh
        // receiver; a handler-less constructor yields an empty object.
        let has_handler = self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            match s.value(c, function)? {
                Value::Function(key) => Ok(key.is_some()),
                other => Err(mismatch(TypeTag::Function, &other)),
            }
        })?;
        if has_handler {
            let receiver = self.with_ctx(ctx, |s, c| {
                let (handle, _) = s.mint_object(c, Value::Object(HashMap::new()));
                Ok(handle)
            })?;
            self.invoke(ctx, function, receiver, args, resolvers)
        } else {
            self.with_ctx(ctx, |s, c| {
                let (handle, _) = s.mint_object(c, Value::Object(HashMap::new()));
                Ok(RawValue {
                    handle,
                    nominal_type: TypeTag::Object,
                })
            })
        }
    }

    fn set_function_handler(
        &self,
        ctx: ContextHandle,
        function: ValueHandle,
        callback: HostCallback,
        resolvers: &Resolvers,
    ) -> EngineResult<()> {
        self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            s.ctx_mut(c).caches.callbacks.lock().store(function, callback);
            s.write(c, function, Value::Function(Some(function)))
        })
    }

    fn run_script(
        &self,
        ctx: ContextHandle,
        name: &str,
        source: &str,
        resolvers: &Resolvers,
    ) -> EngineResult<RawValue> {
        self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            let trimmed = source.trim();
            if trimmed.contains("syntax error") {
                return Err(EngineError::CompilationFailure {
                    script_name: name.to_string(),
                    message: format!("unexpected token in {name:?}"),
                });
            }
            if let Some(message) = trimmed.strip_prefix("throw ") {
                return Err(EngineError::execution(message.trim().to_string()));
            }

            let value = if trimmed == "undefined" || trimmed.is_empty() {
                Value::Undefined
            } else if trimmed == "null" {
                Value::Null
            } else if trimmed == "true" || trimmed == "false" {
                Value::Bool(trimmed == "true")
            } else if let Ok(n) = trimmed.parse::<i64>() {
                Value::Int(n)
            } else if let Ok(x) = trimmed.parse::<f64>() {
                Value::Float(x)
            } else if trimmed.len() >= 2
                && ((trimmed.starts_with('\'') && trimmed.ends_with('\''))
                    || (trimmed.starts_with('"') && trimmed.ends_with('"')))
            {
                Value::Str(trimmed[1..trimmed.len() - 1].to_string())
            } else if trimmed == "globalThis" {
                let global = s.ctx_mut(c).global;
                return Ok(s.raw_for_obj(c, global));
            } else {
                Value::Undefined
            };
            let (handle, _) = s.mint_object(c, value.clone());
            Ok(RawValue {
                handle,
                nominal_type: value.tag(),
            })
        })
    }

    fn global_object(&self, ctx: ContextHandle, resolvers: &Resolvers) -> EngineResult<RawValue> {
        self.with_ctx(ctx, |s, c| {
            s.note_resolvers(c, resolvers);
            // Fresh handle every call, aliasing the one global object.
            let global = s.ctx_mut(c).global;
            Ok(s.raw_for_obj(c, global))
        })
    }
}
