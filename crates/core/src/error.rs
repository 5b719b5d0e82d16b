use thiserror::Error;

/// Error taxonomy kinds from the gateway's error handling design: each
/// variant maps to exactly one HTTP status in the server crate.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown field: {name}")]
    UnknownField { name: String },

    #[error("unknown relation: {name}")]
    UnknownRelation { name: String },

    #[error("operator {operator} is not valid for field {field}")]
    OperatorTypeMismatch { field: String, operator: String },

    #[error("limit {limit} exceeds configured maximum {max}")]
    LimitExceeded { limit: i64, max: i64 },

    #[error("key does not match the primary key or a unique constraint")]
    KeyShapeMismatch,

    #[error("missing required field: {name}")]
    MissingField { name: String },

    #[error("missing required argument: {name}")]
    MissingArgument { name: String },

    #[error("malformed request body: {0}")]
    MalformedRequest(String),

    #[error("row not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("introspection failed: {kind:?}: {context}")]
    Introspection {
        kind: IntrospectionErrorKind,
        context: String,
    },

    #[error("failed to decode OID {oid}: {reason}")]
    Decode { oid: u32, reason: String },

    #[error("failed to encode value for OID {oid}: {reason}")]
    Encode { oid: u32, reason: String },

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrospectionErrorKind {
    ConnectionLost,
    QueryFailed,
    DecodeFailed,
}

/// Coarse classification used to pick an HTTP status in the server crate,
/// mirroring spec.md §7's taxonomy (Validation/NotFound/Conflict/
/// Unavailable/Internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Unavailable,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownField { .. }
            | Error::UnknownRelation { .. }
            | Error::OperatorTypeMismatch { .. }
            | Error::LimitExceeded { .. }
            | Error::KeyShapeMismatch
            | Error::MissingField { .. }
            | Error::MissingArgument { .. }
            | Error::MalformedRequest(_) => ErrorKind::Validation,
            Error::NotFound => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Unavailable(_) => ErrorKind::Unavailable,
            Error::Introspection { .. } | Error::Decode { .. } | Error::Encode { .. } => {
                ErrorKind::Internal
            }
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
