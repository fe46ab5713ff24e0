//! Error taxonomy for the Rayforce query execution core.
//!
//! Every operator returns either a value object or one of these variants;
//! the variant's context fields carry enough structure to render a message
//! like `"type: expected SYMBOL, got I64 at arg 0, field from"` without the
//! caller re-deriving anything from a string.

use thiserror::Error;

use crate::types::element::ElementKind;

/// Main error type for the query execution core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RayError {
    #[error("type: expected {expected:?}, got {actual:?} at arg {arg}{}", field.as_ref().map(|f| format!(", field {f}")).unwrap_or_default())]
    Type {
        expected: ElementKind,
        actual: ElementKind,
        arg: usize,
        field: Option<String>,
    },

    #[error("arity: need {need}, have {have}, arg {arg}")]
    Arity { need: usize, have: usize, arg: usize },

    #[error("length: need {need}, have {have} (arg1={arg1}, arg2={arg2}, field1={field1:?}, field2={field2:?})")]
    Length {
        need: usize,
        have: usize,
        arg1: usize,
        arg2: usize,
        field1: Option<String>,
        field2: Option<String>,
    },

    #[error("index: {idx} out of bounds for len {len}, arg {arg}{}", field.as_ref().map(|f| format!(", field {f}")).unwrap_or_default())]
    Index {
        idx: i64,
        len: usize,
        arg: usize,
        field: Option<String>,
    },

    #[error("domain: arg {arg}{}", field.as_ref().map(|f| format!(", field {f}")).unwrap_or_default())]
    Domain { arg: usize, field: Option<String> },

    #[error("value: unresolved symbol {symbol_id}")]
    Value { symbol_id: i64 },

    #[error("limit: exceeded {limit}")]
    Limit { limit: u64 },

    #[error("os: errno {errno}")]
    Os { errno: i32 },

    #[error("parse error")]
    Parse,

    #[error("not yet implemented: {op:?}")]
    Nyi { op: ElementKind },

    #[error("{0}")]
    User(String),
}

/// Result alias used throughout the crate.
pub type RayResult<T> = std::result::Result<T, RayError>;

impl RayError {
    /// Decode this error into a presentation-friendly set of fields,
    /// mirroring `err_info`'s `{code, ...}` dict in the original engine.
    pub fn code(&self) -> &'static str {
        match self {
            RayError::Type { .. } => "TYPE",
            RayError::Arity { .. } => "ARITY",
            RayError::Length { .. } => "LENGTH",
            RayError::Index { .. } => "INDEX",
            RayError::Domain { .. } => "DOMAIN",
            RayError::Value { .. } => "VALUE",
            RayError::Limit { .. } => "LIMIT",
            RayError::Os { .. } => "OS",
            RayError::Parse => "PARSE",
            RayError::Nyi { .. } => "NYI",
            RayError::User(_) => "USER",
        }
    }
}
