//! The finite set of foreign value kinds.

use std::fmt;

/// Kind of a foreign value, as the engine reports it.
///
/// A value's *nominal* tag is the one recorded when the handle was
/// produced; its *actual* tag is whatever the engine reports now. The
/// two can diverge because the engine is free to change a value's
/// storage representation after creation (a number written as an
/// integer may read back as a float).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Undefined,
    Null,
    Boolean,
    Integer,
    Float,
    String,
    External,
    Object,
    Date,
    Array,
    Function,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Undefined => "undefined",
            TypeTag::Null => "null",
            TypeTag::Boolean => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::String => "string",
            TypeTag::External => "external",
            TypeTag::Object => "object",
            TypeTag::Date => "date",
            TypeTag::Array => "array",
            TypeTag::Function => "function",
        };
        f.write_str(name)
    }
}
