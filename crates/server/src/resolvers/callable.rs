//! Callable Resolver (spec.md §4.E): POST-only invocation of functions,
//! procedures, aggregates and windows. Volatile callables always run in
//! their own transaction; stable/immutable ones may run outside a write
//! transaction.

use crate::api_error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use pgcat_core::schema::{CallableKind, ReturnSignature};
use pgcat_core::Error;
use pgcat_postgres::QueryCompiler;
use pgcat_wire::{CallRequest, OkEnvelope, ScalarEnvelope};

pub async fn invoke(
    State(state): State<AppState>,
    Path((namespace, fn_name)): Path<(String, String)>,
    Json(request): Json<CallRequest>,
) -> Result<axum::response::Response, ApiError> {
    let router_state = state.router.current();
    let callable = router_state
        .schema
        .callable(&namespace, &fn_name)
        .ok_or_else(|| Error::UnknownRelation {
            name: fn_name.clone(),
        })?
        .clone();

    let compiler = QueryCompiler {
        schema: &router_state.schema,
        registry: &router_state.registry,
        default_limit: state.config.pagination.default_limit,
        max_limit: state.config.pagination.max_limit,
    };
    let compiled = compiler.compile_call(&callable, &request.arguments)?;

    let params: Vec<_> = compiled.params.iter().map(pgcat_postgres::to_sql_param).collect();
    let param_refs: Vec<&(dyn tokio_postgres::types::ToSql + Sync)> =
        params.iter().map(|p| p.as_ref() as &(dyn tokio_postgres::types::ToSql + Sync)).collect();

    let mut client = pgcat_postgres::acquire(
        state.router.pool(),
        std::time::Duration::from_secs(state.config.request.timeout_s),
    )
    .await?;

    let rows = if callable.requires_dedicated_transaction() {
        let txn = client.transaction().await.map_err(|e| Error::Internal(e.to_string()))?;
        let rows = txn.query(&compiled.sql, &param_refs).await.map_err(classify)?;
        txn.commit().await.map_err(|e| Error::Internal(e.to_string()))?;
        rows
    } else {
        client.query(&compiled.sql, &param_refs).await.map_err(classify)?
    };

    Ok(match (&callable.kind, &callable.returns) {
        (CallableKind::Procedure, _) | (_, ReturnSignature::Void) => {
            Json(OkEnvelope { ok: true }).into_response()
        }
        (_, ReturnSignature::Scalar(_)) => {
            let value = rows
                .first()
                .map(|r| r.get::<_, serde_json::Value>("result"))
                .unwrap_or(serde_json::Value::Null);
            Json(ScalarEnvelope { result: value }).into_response()
        }
        (_, ReturnSignature::Composite(_)) => {
            let result = rows
                .first()
                .map(row_to_json)
                .unwrap_or(serde_json::Value::Null);
            Json(ScalarEnvelope { result }).into_response()
        }
        (_, ReturnSignature::SetOfComposite(_) | ReturnSignature::Table(_)) => {
            let results: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| row_to_json(row))
                .collect();
            let total = results.len() as i64;
            Json(serde_json::json!({ "results": results, "total": total })).into_response()
        }
    })
}

fn row_to_json(row: &tokio_postgres::Row) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value: serde_json::Value = row
            .try_get::<_, serde_json::Value>(i)
            .unwrap_or(serde_json::Value::Null);
        map.insert(column.name().to_string(), value);
    }
    serde_json::Value::Object(map)
}

fn classify(err: tokio_postgres::Error) -> Error {
    let Some(db_error) = err.as_db_error() else {
        return Error::Internal(err.to_string());
    };
    match &db_error.code().code()[0..2] {
        "23" => Error::Conflict(db_error.message().to_string()),
        "08" => Error::Unavailable(db_error.message().to_string()),
        _ => Error::Internal(db_error.message().to_string()),
    }
}
