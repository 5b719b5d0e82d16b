pub mod envelope;
pub mod filter_document;
pub mod requests;

pub use envelope::{DeleteEnvelope, ErrorBody, ErrorEnvelope, ListEnvelope, OkEnvelope, PaginationInfo, ScalarEnvelope};
pub use filter_document::{FilterDocument, LogicalOperator, Operator, Pagination, SelectClause, WhereClause};
pub use requests::{
    reject_unknown_keys, CallRequest, CreateRequest, CreateRows, KeyValues, PrimaryKeyRequest,
    UpdateRequest,
};
