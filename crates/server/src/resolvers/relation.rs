//! Relation Resolver (spec.md §4.D): GET list, POST filtered-query-or-update,
//! PUT create/batch-insert, DELETE by key. Mutations run inside one
//! transaction per request.

use crate::api_error::ApiError;
use crate::envelope;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pgcat_core::Error;
use pgcat_postgres::QueryCompiler;
use pgcat_wire::{reject_unknown_keys, CreateRequest, CreateRows, PrimaryKeyRequest, UpdateRequest};
use std::collections::HashMap;

pub async fn get_list(
    State(state): State<AppState>,
    Path((namespace, object_name)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let document = crate::query_string::parse(&params).map_err(Error::MalformedRequest)?;
    run_query(&state, &namespace, &object_name, document).await
}

pub async fn post_dispatch(
    State(state): State<AppState>,
    Path((namespace, object_name)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Result<axum::response::Response, ApiError> {
    let is_update = body.get("key").is_some();
    if is_update {
        reject_unknown_keys(&body, &["key", "data"])
            .map_err(|k| Error::MalformedRequest(format!("unknown field: {k}")))?;
        let request: UpdateRequest = serde_json::from_value(body)
            .map_err(|e| Error::MalformedRequest(e.to_string()))?;
        let response = run_update(&state, &namespace, &object_name, request).await?;
        Ok(response.into_response())
    } else {
        reject_unknown_keys(&body, &["select", "where", "pagination"])
            .map_err(|k| Error::MalformedRequest(format!("unknown field: {k}")))?;
        let document: pgcat_wire::FilterDocument = serde_json::from_value(body)
            .map_err(|e| Error::MalformedRequest(e.to_string()))?;
        let response = run_query(&state, &namespace, &object_name, document).await?;
        Ok(response.into_response())
    }
}

pub async fn put_create(
    State(state): State<AppState>,
    Path((namespace, object_name)): Path<(String, String)>,
    Json(body): Json<CreateRequest>,
) -> Result<axum::response::Response, ApiError> {
    let router_state = state.router.current();
    let relation = router_state
        .schema
        .addressable_relation(&namespace, &object_name)
        .ok_or_else(|| Error::UnknownRelation {
            name: object_name.clone(),
        })?
        .clone();

    let rows = match body.data {
        CreateRows::Single(row) => vec![row],
        CreateRows::Batch(rows) => rows,
    };

    let compiler = QueryCompiler {
        schema: &router_state.schema,
        registry: &router_state.registry,
        default_limit: state.config.pagination.default_limit,
        max_limit: state.config.pagination.max_limit,
    };
    let compiled = compiler.compile_insert(&relation, &rows)?;

    let mut client = pgcat_postgres::acquire(
        state.router.pool(),
        std::time::Duration::from_secs(state.config.request.timeout_s),
    )
    .await?;
    let txn = client
        .transaction()
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    let params: Vec<_> = compiled.params.iter().map(pgcat_postgres::to_sql_param).collect();
    let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

    let result_rows = txn
        .query(&compiled.sql, &param_refs)
        .await
        .map_err(classify_db_error)?;
    txn.commit().await.map_err(|e| Error::Internal(e.to_string()))?;

    let results: Vec<serde_json::Value> = result_rows
        .iter()
        .map(|r| r.get::<_, serde_json::Value>("__row"))
        .collect();

    Ok(if results.len() == 1 {
        (StatusCode::CREATED, Json(results.into_iter().next().unwrap())).into_response()
    } else {
        (StatusCode::CREATED, Json(serde_json::json!({ "results": results }))).into_response()
    })
}

pub async fn delete_by_key(
    State(state): State<AppState>,
    Path((namespace, object_name)): Path<(String, String)>,
    Json(body): Json<PrimaryKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let router_state = state.router.current();
    let relation = router_state
        .schema
        .addressable_relation(&namespace, &object_name)
        .ok_or_else(|| Error::UnknownRelation {
            name: object_name.clone(),
        })?
        .clone();

    let compiler = QueryCompiler {
        schema: &router_state.schema,
        registry: &router_state.registry,
        default_limit: state.config.pagination.default_limit,
        max_limit: state.config.pagination.max_limit,
    };
    let compiled = compiler.compile_delete(&relation, &body.values)?;

    let client = pgcat_postgres::acquire(
        state.router.pool(),
        std::time::Duration::from_secs(state.config.request.timeout_s),
    )
    .await?;

    let params: Vec<_> = compiled.params.iter().map(pgcat_postgres::to_sql_param).collect();
    let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

    let affected = client
        .execute(&compiled.sql, &param_refs)
        .await
        .map_err(classify_db_error)?;

    // Idempotent by design (spec.md §8): deleting an already-absent key
    // still returns 200 with deleted: 0, never a 404.
    Ok(Json(pgcat_wire::DeleteEnvelope {
        deleted: affected as i64,
        message: if affected > 0 {
            "deleted".to_string()
        } else {
            "no matching row".to_string()
        },
    }))
}

async fn run_update(
    state: &AppState,
    namespace: &str,
    object_name: &str,
    request: UpdateRequest,
) -> Result<impl IntoResponse, ApiError> {
    let router_state = state.router.current();
    let relation = router_state
        .schema
        .addressable_relation(namespace, object_name)
        .ok_or_else(|| Error::UnknownRelation {
            name: object_name.to_string(),
        })?
        .clone();

    let compiler = QueryCompiler {
        schema: &router_state.schema,
        registry: &router_state.registry,
        default_limit: state.config.pagination.default_limit,
        max_limit: state.config.pagination.max_limit,
    };
    let compiled = compiler.compile_update(&relation, &request.key.values, &request.data)?;

    let mut client = pgcat_postgres::acquire(
        state.router.pool(),
        std::time::Duration::from_secs(state.config.request.timeout_s),
    )
    .await?;
    let txn = client
        .transaction()
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

    let params: Vec<_> = compiled.params.iter().map(pgcat_postgres::to_sql_param).collect();
    let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

    let row = txn
        .query_opt(&compiled.sql, &param_refs)
        .await
        .map_err(classify_db_error)?
        .ok_or(Error::NotFound)?;
    txn.commit().await.map_err(|e| Error::Internal(e.to_string()))?;

    Ok(Json(row.get::<_, serde_json::Value>("__row")))
}

async fn run_query(
    state: &AppState,
    namespace: &str,
    object_name: &str,
    document: pgcat_wire::FilterDocument,
) -> Result<axum::response::Response, ApiError> {
    let validated = pgcat_filter::validate(&document).map_err(ApiError)?;

    let router_state = state.router.current();
    let relation = router_state
        .schema
        .addressable_relation(namespace, object_name)
        .ok_or_else(|| Error::UnknownRelation {
            name: object_name.to_string(),
        })?
        .clone();

    let compiler = QueryCompiler {
        schema: &router_state.schema,
        registry: &router_state.registry,
        default_limit: state.config.pagination.default_limit,
        max_limit: state.config.pagination.max_limit,
    };
    let compiled = compiler.compile_query(&relation, &validated)?;

    let client = pgcat_postgres::acquire(
        state.router.pool(),
        std::time::Duration::from_secs(state.config.request.timeout_s),
    )
    .await?;

    let params: Vec<_> = compiled.params.iter().map(pgcat_postgres::to_sql_param).collect();
    let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

    let rows = client
        .query(&compiled.sql, &param_refs)
        .await
        .map_err(classify_db_error)?;

    let limit = validated.pagination.limit.unwrap_or(state.config.pagination.default_limit);
    let offset = validated.pagination.offset;
    let envelope = envelope::build_list_envelope(&rows, limit, offset);
    Ok(Json(envelope).into_response())
}

fn classify_db_error(err: tokio_postgres::Error) -> Error {
    let Some(db_error) = err.as_db_error() else {
        return Error::Internal(err.to_string());
    };
    // SQLSTATE class, per spec.md §7: classify runtime DB errors by class,
    // anything unrecognized falls back to Internal.
    match &db_error.code().code()[0..2] {
        "23" => Error::Conflict(db_error.message().to_string()),
        "08" => Error::Unavailable(db_error.message().to_string()),
        _ => Error::Internal(db_error.message().to_string()),
    }
}
