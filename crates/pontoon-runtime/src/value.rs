//! Capability-typed wrappers over foreign values.
//!
//! Resolution maps a [`ValueReference`] to exactly one of these shapes,
//! each exposing only the operations valid for its kind. The closures
//! inside are built by the accessors factory; every one performs a
//! single boundary call under the session lock, so callers never
//! reason about locking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pontoon_engine::{EngineResult, ExternalValue};

use crate::reference::ValueReference;

pub type ValueGetter<T> = Box<dyn Fn() -> EngineResult<T> + Send + Sync>;
pub type ValueSetter<T> = Box<dyn Fn(&T) -> EngineResult<()> + Send + Sync>;
pub type PropertyGetter = Box<dyn Fn(&str) -> EngineResult<ValueReference> + Send + Sync>;
pub type PropertySetter = Box<dyn Fn(&str, &ValueReference) -> EngineResult<()> + Send + Sync>;
pub type ArraySizeGetter = Box<dyn Fn() -> EngineResult<usize> + Send + Sync>;
pub type ElementGetter = Box<dyn Fn(usize) -> EngineResult<ValueReference> + Send + Sync>;
pub type ElementSetter = Box<dyn Fn(usize, &ValueReference) -> EngineResult<()> + Send + Sync>;
pub type FunctionInvoker =
    Box<dyn Fn(&ValueReference, &[ValueReference]) -> EngineResult<ValueReference> + Send + Sync>;
pub type ConstructorInvoker =
    Box<dyn Fn(&[ValueReference]) -> EngineResult<ValueReference> + Send + Sync>;
pub type HandlerSetter = Box<dyn Fn(FunctionCallback) -> EngineResult<()> + Send + Sync>;

/// Host function body installed behind a foreign function value.
///
/// Arguments arrive already wrapped and lifecycle-covered. An error
/// returned here reaches the foreign caller as an execution failure
/// wrapping this callback's own error.
pub type FunctionCallback =
    Arc<dyn Fn(&[ValueReference]) -> EngineResult<ValueReference> + Send + Sync>;

/// One wrapper shape per supported type tag.
///
/// `Undefined` and `Null` carry nothing: there is nothing to read or
/// write through them.
pub enum TypedValue {
    Undefined,
    Null,
    Boolean(JsBoolean),
    Integer(JsInteger),
    Float(JsFloat),
    String(JsString),
    External(JsExternal),
    Object(JsObject),
    Date(JsDate),
    Array(JsArray),
    Function(JsFunction),
}

impl TypedValue {
    /// The reference this wrapper was resolved from, when it has one.
    pub fn reference(&self) -> Option<&ValueReference> {
        match self {
            TypedValue::Undefined | TypedValue::Null => None,
            TypedValue::Boolean(v) => Some(&v.reference),
            TypedValue::Integer(v) => Some(&v.reference),
            TypedValue::Float(v) => Some(&v.reference),
            TypedValue::String(v) => Some(&v.reference),
            TypedValue::External(v) => Some(&v.reference),
            TypedValue::Object(v) => Some(&v.reference),
            TypedValue::Date(v) => Some(&v.reference),
            TypedValue::Array(v) => Some(&v.reference),
            TypedValue::Function(v) => Some(&v.reference),
        }
    }
}

impl std::fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypedValue::Undefined => "Undefined",
            TypedValue::Null => "Null",
            TypedValue::Boolean(_) => "Boolean",
            TypedValue::Integer(_) => "Integer",
            TypedValue::Float(_) => "Float",
            TypedValue::String(_) => "String",
            TypedValue::External(_) => "External",
            TypedValue::Object(_) => "Object",
            TypedValue::Date(_) => "Date",
            TypedValue::Array(_) => "Array",
            TypedValue::Function(_) => "Function",
        };
        write!(f, "TypedValue::{name}")
    }
}

/// A foreign boolean.
pub struct JsBoolean {
    pub(crate) reference: ValueReference,
    pub(crate) get: ValueGetter<bool>,
    pub(crate) set: ValueSetter<bool>,
}

impl JsBoolean {
    pub fn get(&self) -> EngineResult<bool> {
        (self.get)()
    }

    pub fn set(&self, value: bool) -> EngineResult<()> {
        (self.set)(&value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign number stored in integer representation.
pub struct JsInteger {
    pub(crate) reference: ValueReference,
    pub(crate) get: ValueGetter<i64>,
    pub(crate) set: ValueSetter<i64>,
}

impl JsInteger {
    pub fn get(&self) -> EngineResult<i64> {
        (self.get)()
    }

    pub fn set(&self, value: i64) -> EngineResult<()> {
        (self.set)(&value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign number stored in floating-point representation.
pub struct JsFloat {
    pub(crate) reference: ValueReference,
    pub(crate) get: ValueGetter<f64>,
    pub(crate) set: ValueSetter<f64>,
}

impl JsFloat {
    pub fn get(&self) -> EngineResult<f64> {
        (self.get)()
    }

    pub fn set(&self, value: f64) -> EngineResult<()> {
        (self.set)(&value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign string.
pub struct JsString {
    pub(crate) reference: ValueReference,
    pub(crate) get: ValueGetter<String>,
    pub(crate) set: ValueSetter<String>,
}

impl JsString {
    pub fn get(&self) -> EngineResult<String> {
        (self.get)()
    }

    pub fn set(&self, value: &str) -> EngineResult<()> {
        (self.set)(&value.to_string())
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// An opaque host payload stored inside the foreign heap.
pub struct JsExternal {
    pub(crate) reference: ValueReference,
    pub(crate) get: ValueGetter<ExternalValue>,
    pub(crate) set: ValueSetter<ExternalValue>,
}

impl JsExternal {
    pub fn get(&self) -> EngineResult<ExternalValue> {
        (self.get)()
    }

    pub fn set(&self, value: ExternalValue) -> EngineResult<()> {
        (self.set)(&value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign object: named property access.
pub struct JsObject {
    pub(crate) reference: ValueReference,
    pub(crate) get_prop: PropertyGetter,
    pub(crate) set_prop: PropertySetter,
}

impl JsObject {
    pub fn get(&self, name: &str) -> EngineResult<ValueReference> {
        (self.get_prop)(name)
    }

    pub fn set(&self, name: &str, value: &ValueReference) -> EngineResult<()> {
        (self.set_prop)(name, value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign date. The timestamp crosses the boundary as an RFC 3339
/// string with millisecond precision; property access works as on any
/// object.
pub struct JsDate {
    pub(crate) reference: ValueReference,
    pub(crate) get: ValueGetter<DateTime<Utc>>,
    pub(crate) set: ValueSetter<DateTime<Utc>>,
    pub(crate) get_prop: PropertyGetter,
    pub(crate) set_prop: PropertySetter,
}

impl JsDate {
    pub fn get(&self) -> EngineResult<DateTime<Utc>> {
        (self.get)()
    }

    pub fn set(&self, value: DateTime<Utc>) -> EngineResult<()> {
        (self.set)(&value)
    }

    pub fn get_property(&self, name: &str) -> EngineResult<ValueReference> {
        (self.get_prop)(name)
    }

    pub fn set_property(&self, name: &str, value: &ValueReference) -> EngineResult<()> {
        (self.set_prop)(name, value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign array: indexed access plus object-style properties.
pub struct JsArray {
    pub(crate) reference: ValueReference,
    pub(crate) get_prop: PropertyGetter,
    pub(crate) set_prop: PropertySetter,
    pub(crate) size: ArraySizeGetter,
    pub(crate) get_element: ElementGetter,
    pub(crate) set_element: ElementSetter,
}

impl JsArray {
    pub fn len(&self) -> EngineResult<usize> {
        (self.size)()
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get_element(&self, index: usize) -> EngineResult<ValueReference> {
        (self.get_element)(index)
    }

    pub fn set_element(&self, index: usize, value: &ValueReference) -> EngineResult<()> {
        (self.set_element)(index, value)
    }

    pub fn get_property(&self, name: &str) -> EngineResult<ValueReference> {
        (self.get_prop)(name)
    }

    pub fn set_property(&self, name: &str, value: &ValueReference) -> EngineResult<()> {
        (self.set_prop)(name, value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}

/// A foreign function: invocation, construction, host handler
/// installation, plus object-style properties.
pub struct JsFunction {
    pub(crate) reference: ValueReference,
    pub(crate) get_prop: PropertyGetter,
    pub(crate) set_prop: PropertySetter,
    pub(crate) invoke: FunctionInvoker,
    pub(crate) construct: ConstructorInvoker,
    pub(crate) set_handler: HandlerSetter,
}

impl JsFunction {
    /// Calls the function with `receiver` as its `this` value.
    pub fn invoke(
        &self,
        receiver: &ValueReference,
        args: &[ValueReference],
    ) -> EngineResult<ValueReference> {
        (self.invoke)(receiver, args)
    }

    /// Calls the function as a constructor.
    pub fn construct(&self, args: &[ValueReference]) -> EngineResult<ValueReference> {
        (self.construct)(args)
    }

    /// Installs `callback` as the function's body. Replaces any prior
    /// handler for the same function value.
    pub fn set_handler(&self, callback: FunctionCallback) -> EngineResult<()> {
        (self.set_handler)(callback)
    }

    pub fn get_property(&self, name: &str) -> EngineResult<ValueReference> {
        (self.get_prop)(name)
    }

    pub fn set_property(&self, name: &str, value: &ValueReference) -> EngineResult<()> {
        (self.set_prop)(name, value)
    }

    pub fn reference(&self) -> &ValueReference {
        &self.reference
    }
}
