use crate::resolvers::{post_entry, relation};
use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Mounts the Schema Router's resolvers onto the HTTP surface from
/// spec.md §6. `axum` itself is out of scope for the endpoint *semantics*
/// (spec.md §1) — this function is only the mount point.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/{namespace}/{object_name}",
            get(relation::get_list)
                .post(post_entry)
                .put(relation::put_create)
                .delete(relation::delete_by_key),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
