use thiserror::Error;

use crate::module::ModuleKind;

/// Errors raised by the registry and by contract checks across the platform
#[derive(Error, Debug)]
pub enum VizError {
    #[error("Argument required: {0}")]
    ArgumentRequired(String),

    #[error("Argument invalid: {name}: {reason}")]
    ArgumentInvalid { name: String, reason: String },

    #[error("Module '{0}' is already declared")]
    DuplicateId(String),

    #[error("Module '{0}' not found")]
    NotFound(String),

    #[error("Ancestor '{ancestor}' of type '{id}' is not declared")]
    UnresolvedAncestor { id: String, ancestor: String },

    #[error("Type '{type_id}' of instance '{id}' is not declared")]
    UnresolvedType { id: String, type_id: String },

    #[error("Cyclic ancestry detected at '{0}'")]
    CyclicAncestry(String),

    #[error("Module '{id}' is a {actual}, expected a {expected}")]
    KindMismatch {
        id: String,
        expected: ModuleKind,
        actual: ModuleKind,
    },

    #[error("Invalid operation: {0}")]
    OperationInvalid(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Loading module '{id}' failed: {reason}")]
    LoadFailed { id: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VizError {
    /// Shorthand for [`VizError::ArgumentInvalid`]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        VizError::ArgumentInvalid {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VizError>;
