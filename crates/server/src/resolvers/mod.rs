pub mod callable;
pub mod relation;

use crate::api_error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

/// `POST /{namespace}/{object_name}` is shared by relations (a
/// FilterDocument query or an update-by-key, per spec.md §4.D) and
/// callables (an invocation, per spec.md §4.E). The schema snapshot
/// decides which one `object_name` names; relations take precedence since
/// a namespace cannot have both a relation and a callable sharing a name.
pub async fn post_entry(
    State(state): State<AppState>,
    Path((namespace, object_name)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<axum::response::Response, ApiError> {
    let is_relation = state
        .router
        .current()
        .schema
        .addressable_relation(&namespace, &object_name)
        .is_some();

    if is_relation {
        relation::post_dispatch(State(state), Path((namespace, object_name)), Json(body)).await
    } else {
        let call_request: pgcat_wire::CallRequest = serde_json::from_value(body)
            .map_err(|e| pgcat_core::Error::MalformedRequest(e.to_string()))?;
        callable::invoke(State(state), Path((namespace, object_name)), Json(call_request)).await
    }
}
