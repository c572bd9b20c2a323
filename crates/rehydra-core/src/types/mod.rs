//! # Core Type Definitions
//!
//! This module contains the value types shared by every stage of rehydration:
//! - Scalar types (`Type`, `TypeCode`)
//! - Parsed definitions (`Arg`, `Definition`, `DefinitionBody`)
//! - Error types (`RehydrateError`, `AccessError`, `ParseTypeError`)
//!
//! Definitions are generic over the accessor's opaque handles. Nothing here
//! knows how an expression or an iteration domain is actually encoded.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// SCALAR TYPES
// =============================================================================

/// The numeric class of a scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TypeCode {
    /// Signed integer.
    Int,
    /// Unsigned integer. `UInt` of width 1 is the boolean type.
    UInt,
    /// IEEE floating point.
    Float,
}

/// A resolved scalar type, e.g. `i32`, `u8`, `f32` or `bool`.
///
/// The textual form is what the front end writes and what `Display` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Type {
    /// Numeric class.
    pub code: TypeCode,
    /// Width in bits.
    pub bits: u8,
}

impl Type {
    /// Signed integer of the given width.
    #[must_use]
    pub const fn int(bits: u8) -> Self {
        Self {
            code: TypeCode::Int,
            bits,
        }
    }

    /// Unsigned integer of the given width.
    #[must_use]
    pub const fn uint(bits: u8) -> Self {
        Self {
            code: TypeCode::UInt,
            bits,
        }
    }

    /// Floating point of the given width.
    #[must_use]
    pub const fn float(bits: u8) -> Self {
        Self {
            code: TypeCode::Float,
            bits,
        }
    }

    /// The boolean type (`u1`).
    #[must_use]
    pub const fn bool() -> Self {
        Self::uint(1)
    }

    /// Check whether this is the boolean type.
    #[must_use]
    pub const fn is_bool(self) -> bool {
        matches!(self.code, TypeCode::UInt) && self.bits == 1
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bool() {
            return f.write_str("bool");
        }
        let prefix = match self.code {
            TypeCode::Int => 'i',
            TypeCode::UInt => 'u',
            TypeCode::Float => 'f',
        };
        write!(f, "{}{}", prefix, self.bits)
    }
}

impl FromStr for Type {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "bool" {
            return Ok(Self::bool());
        }

        let mut chars = s.chars();
        let code = match chars.next() {
            Some('i') => TypeCode::Int,
            Some('u') => TypeCode::UInt,
            Some('f') => TypeCode::Float,
            _ => return Err(ParseTypeError(s.to_string())),
        };
        let bits: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| ParseTypeError(s.to_string()))?;

        let valid = match code {
            TypeCode::Int => matches!(bits, 8 | 16 | 32 | 64),
            TypeCode::UInt => matches!(bits, 1 | 8 | 16 | 32 | 64),
            TypeCode::Float => matches!(bits, 16 | 32 | 64),
        };
        if !valid {
            return Err(ParseTypeError(s.to_string()));
        }

        Ok(Self { code, bits })
    }
}

impl TryFrom<String> for Type {
    type Error = ParseTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Type> for String {
    fn from(ty: Type) -> Self {
        ty.to_string()
    }
}

// =============================================================================
// DEFINITIONS
// =============================================================================

/// One formal argument of a definition. Position is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    /// Argument name, unique within its definition.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Arg {
    /// Create a new argument.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// The body of a definition, still in serialized form.
#[derive(Debug, Clone)]
pub enum DefinitionBody<E, D> {
    /// A single expression over the arguments and other dependencies.
    Pure(E),
    /// An update definition over an iteration domain.
    Reduce {
        /// Initializer expression.
        init: E,
        /// Update-site expression.
        update_location: E,
        /// Name of the function being updated.
        update_func: String,
        /// Iteration domain.
        domain: D,
    },
}

impl<E, D> DefinitionBody<E, D> {
    /// Check if this is a reduction/update body.
    #[must_use]
    pub fn is_reduce(&self) -> bool {
        matches!(self, Self::Reduce { .. })
    }
}

/// One named function as declared in the serialized environment.
///
/// Produced by the definition table builder; nothing in it is linked yet.
#[derive(Debug, Clone)]
pub struct Definition<E, D> {
    /// Unique name within the environment.
    pub name: String,
    /// Formal arguments in declared order.
    pub args: Vec<Arg>,
    /// Declared result type.
    pub return_type: Type,
    /// Pure or reduction body.
    pub body: DefinitionBody<E, D>,
}

impl<E, D> Definition<E, D> {
    /// Check if this definition is a reduction.
    #[must_use]
    pub fn is_reduce(&self) -> bool {
        self.body.is_reduce()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// A type string that is not one of the recognized scalar types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized type: '{0}'")]
pub struct ParseTypeError(pub String);

/// Failure inside the accessor layer (malformed serialized input).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("accessor error: {message}")]
pub struct AccessError {
    /// Human-readable description.
    pub message: String,
}

impl AccessError {
    /// Create a new accessor error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ParseTypeError> for AccessError {
    fn from(e: ParseTypeError) -> Self {
        Self::new(e.to_string())
    }
}

/// Errors that can occur while rehydrating an environment.
///
/// Every variant is fatal to the current `rehydrate` call. Unresolved image
/// references are not errors; they are kept as `ImageRef` dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RehydrateError {
    /// A definition could not be unpacked.
    #[error("malformed definition '{name}': {reason}")]
    MalformedDefinition { name: String, reason: String },

    /// A referenced definition is absent from the table.
    #[error("unknown definition: '{0}'")]
    UnknownDefinition(String),

    /// Reduction/update definitions cannot be rehydrated yet.
    #[error("reduction definitions are not supported: '{0}'")]
    UnsupportedReduction(String),

    /// A call into an external (foreign) function.
    #[error("external call to '{name}' from '{caller}' is not supported")]
    UnsupportedExternCall { name: String, caller: String },

    /// Two definitions share a name and duplicates are rejected.
    #[error("duplicate definition: '{0}'")]
    DuplicateDefinition(String),

    /// The call chain is deeper than the configured limit.
    #[error("call depth limit {limit} exceeded while rehydrating '{name}'")]
    CallDepthExceeded { name: String, limit: usize },

    /// The accessor layer rejected the serialized input.
    #[error(transparent)]
    Access(#[from] AccessError),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_parses_common_forms() {
        assert_eq!("i32".parse::<Type>().expect("i32"), Type::int(32));
        assert_eq!("u8".parse::<Type>().expect("u8"), Type::uint(8));
        assert_eq!("f64".parse::<Type>().expect("f64"), Type::float(64));
        assert_eq!("bool".parse::<Type>().expect("bool"), Type::bool());
        assert_eq!("u1".parse::<Type>().expect("u1"), Type::bool());
    }

    #[test]
    fn type_rejects_bad_widths() {
        assert!("i1".parse::<Type>().is_err());
        assert!("f8".parse::<Type>().is_err());
        assert!("x32".parse::<Type>().is_err());
        assert!("i".parse::<Type>().is_err());
        assert!("".parse::<Type>().is_err());
    }

    #[test]
    fn type_display_matches_parse() {
        for text in ["i8", "i64", "u16", "f32", "bool"] {
            let ty: Type = text.parse().expect("parse");
            assert_eq!(ty.to_string(), text);
        }
    }

    #[test]
    fn type_serde_uses_text_form() {
        let json = serde_json::to_string(&Type::float(32)).expect("serialize");
        assert_eq!(json, "\"f32\"");

        let arg: Arg = serde_json::from_str(r#"{"name":"x","type":"u16"}"#).expect("arg");
        assert_eq!(arg, Arg::new("x", Type::uint(16)));
    }

    #[test]
    fn definition_reports_reduce() {
        let pure: Definition<u8, ()> = Definition {
            name: "f".to_string(),
            args: vec![],
            return_type: Type::int(32),
            body: DefinitionBody::Pure(0),
        };
        assert!(!pure.is_reduce());

        let reduce: Definition<u8, ()> = Definition {
            body: DefinitionBody::Reduce {
                init: 0,
                update_location: 1,
                update_func: "f".to_string(),
                domain: (),
            },
            ..pure
        };
        assert!(reduce.is_reduce());
    }

    #[test]
    fn access_error_converts_into_rehydrate_error() {
        let err: RehydrateError = AccessError::new("bad list").into();
        assert_eq!(err.to_string(), "accessor error: bad list");
    }
}
