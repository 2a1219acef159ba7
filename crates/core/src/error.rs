//! Bridge error types

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by value decoding and property writes
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("value size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("object reference for property {0} no longer resolves")]
    StaleReference(Uuid),

    #[error("unknown id: {0}")]
    UnknownId(Uuid),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("enum {enum_name} has no member named '{member}'")]
    EnumNameNotFound { enum_name: String, member: String },

    #[error("field path did not resolve on the owning object")]
    FieldPathUnresolved,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
