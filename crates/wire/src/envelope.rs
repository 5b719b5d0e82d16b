use serde::{Deserialize, Serialize};

/// Outbound shapes (spec.md §4.H). A single-record response is the row
/// object directly and is not represented here — only the shapes that wrap
/// more than one row, or that carry no row at all, need a dedicated type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListEnvelope<T> {
    pub results: Vec<T>,
    pub total: i64,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginationInfo {
    pub limit: i64,
    pub offset: i64,
    pub total: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteEnvelope {
    pub deleted: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OkEnvelope {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalarEnvelope<T> {
    pub result: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
