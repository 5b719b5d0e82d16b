//! HTTP-surface scenarios that do not require a live database: query-string
//! and POST-body parity, key-shape rejection, nested-select SQL shape, and
//! the error envelope shape. End-to-end scenarios that do need a live
//! database (batch insert, delete idempotence, hot reload after a real DDL
//! change) are covered by `pgcat-postgres`'s live introspection suite and by
//! `SchemaRouter::rebuild` being directly callable, per DESIGN.md.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use pgcat_core::schema::{Attribute, Constraint, ConstraintKind, Relation, RelationKind};
use pgcat_core::types::TypeRegistry;
use pgcat_core::{Error, SchemaModel};
use pgcat_filter::validate;
use pgcat_postgres::QueryCompiler;
use pgcat_server::api_error::ApiError;
use pgcat_wire::FilterDocument;
use std::collections::HashMap;
use tower::ServiceExt;

fn widgets_schema() -> SchemaModel {
    SchemaModel {
        relations: vec![Relation {
            namespace: "public".into(),
            name: "widgets".into(),
            kind: RelationKind::Ordinary,
            attributes: vec![
                Attribute {
                    ordinal: 1,
                    name: "id".into(),
                    type_oid: 23,
                    not_null: true,
                    has_default: false,
                    generated: false,
                    identity: false,
                },
                Attribute {
                    ordinal: 2,
                    name: "name".into(),
                    type_oid: 25,
                    not_null: false,
                    has_default: false,
                    generated: false,
                    identity: false,
                },
            ],
            constraints: vec![Constraint {
                name: "widgets_pkey".into(),
                kind: ConstraintKind::PrimaryKey,
                attributes: vec!["id".into()],
                deferrable: false,
            }],
            privileges: vec![],
            comment: None,
        }],
        ..Default::default()
    }
}

fn compiler<'a>(schema: &'a SchemaModel, registry: &'a TypeRegistry) -> QueryCompiler<'a> {
    QueryCompiler {
        schema,
        registry,
        default_limit: 50,
        max_limit: 1000,
    }
}

/// S1: a filtered GET (`?name=eq.widget`) and the equivalent POST body
/// compile to identical SQL and parameters — both converge on the same
/// `pgcat_filter::validate` + `QueryCompiler::compile_query` path.
#[test]
fn get_query_string_and_post_body_compile_to_the_same_statement() {
    let mut query_params = HashMap::new();
    query_params.insert("name".to_string(), "eq.widget".to_string());
    let from_query_string = pgcat_server::query_string::parse(&query_params).unwrap();

    let from_post_body: FilterDocument = serde_json::from_str(
        r#"{"where": {"field": "name", "operator": "eq", "value": "widget"}}"#,
    )
    .unwrap();

    let schema = widgets_schema();
    let registry = TypeRegistry::default();
    let c = compiler(&schema, &registry);
    let relation = schema.relation("public", "widgets").unwrap();

    let validated_a = validate(&from_query_string).unwrap();
    let validated_b = validate(&from_post_body).unwrap();
    let compiled_a = c.compile_query(relation, &validated_a).unwrap();
    let compiled_b = c.compile_query(relation, &validated_b).unwrap();

    assert_eq!(compiled_a.sql, compiled_b.sql);
    assert_eq!(compiled_a.params.len(), compiled_b.params.len());
}

/// S3: updating by a key that is a strict superset of the primary key is
/// rejected before any SQL is generated.
#[test]
fn update_with_a_superset_key_is_a_key_shape_mismatch() {
    let schema = widgets_schema();
    let registry = TypeRegistry::default();
    let c = compiler(&schema, &registry);
    let relation = schema.relation("public", "widgets").unwrap();

    let mut key = HashMap::new();
    key.insert("id".to_string(), serde_json::json!(1));
    key.insert("name".to_string(), serde_json::json!("extra"));
    let mut values = HashMap::new();
    values.insert("name".to_string(), serde_json::json!("renamed"));

    let err = c.compile_update(relation, &key, &values).unwrap_err();
    assert!(matches!(err, Error::KeyShapeMismatch));
}

/// S6: a nested select reaching a child relation through its foreign key
/// produces `{id, orders: [...]}`-shaped SQL (a correlated `jsonb_agg`
/// subquery), not a join that would duplicate parent rows.
#[test]
fn nested_select_reaches_a_child_relation_through_its_foreign_key() {
    let customers = Relation {
        namespace: "public".into(),
        name: "customers".into(),
        kind: RelationKind::Ordinary,
        attributes: vec![Attribute {
            ordinal: 1,
            name: "id".into(),
            type_oid: 23,
            not_null: true,
            has_default: false,
            generated: false,
            identity: false,
        }],
        constraints: vec![Constraint {
            name: "customers_pkey".into(),
            kind: ConstraintKind::PrimaryKey,
            attributes: vec!["id".into()],
            deferrable: false,
        }],
        privileges: vec![],
        comment: None,
    };
    let orders = Relation {
        namespace: "public".into(),
        name: "orders".into(),
        kind: RelationKind::Ordinary,
        attributes: vec![
            Attribute {
                ordinal: 1,
                name: "id".into(),
                type_oid: 23,
                not_null: true,
                has_default: false,
                generated: false,
                identity: false,
            },
            Attribute {
                ordinal: 2,
                name: "customer_id".into(),
                type_oid: 23,
                not_null: true,
                has_default: false,
                generated: false,
                identity: false,
            },
        ],
        constraints: vec![
            Constraint {
                name: "orders_pkey".into(),
                kind: ConstraintKind::PrimaryKey,
                attributes: vec!["id".into()],
                deferrable: false,
            },
            Constraint {
                name: "orders_customer_id_fkey".into(),
                kind: ConstraintKind::ForeignKey {
                    references_namespace: "public".into(),
                    references_relation: "customers".into(),
                    references_attributes: vec!["id".into()],
                    dangling: false,
                },
                attributes: vec!["customer_id".into()],
                deferrable: false,
            },
        ],
        privileges: vec![],
        comment: None,
    };

    let schema = SchemaModel {
        relations: vec![customers.clone(), orders],
        ..Default::default()
    };
    let registry = TypeRegistry::default();
    let c = compiler(&schema, &registry);

    let document: FilterDocument = serde_json::from_str(
        r#"{"select": {"fields": ["id"], "orders": {"fields": ["id"]}}}"#,
    )
    .unwrap();
    let validated = validate(&document).unwrap();
    let compiled = c.compile_query(&customers, &validated).unwrap();

    assert!(compiled.sql.contains("jsonb_agg"));
    assert!(compiled.sql.contains("'orders'"));
    assert!(!compiled.sql.contains("JOIN"));
}

/// The error envelope shape from spec.md §7: `{"error": {"kind", "message"}}`
/// with the status derived from the error's coarse classification.
#[tokio::test]
async fn not_found_error_renders_the_documented_envelope_shape() {
    let app = Router::new().route(
        "/boom",
        get(|| async { ApiError(Error::NotFound).into_response() }),
    );

    let response = app
        .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["kind"], "not_found");
    assert!(json["error"]["message"].is_string());
}

/// spec.md §9 open question, resolved: a partition child is never
/// individually addressable, only its parent partitioned table.
#[test]
fn partition_children_are_excluded_from_addressable_lookup() {
    let schema = SchemaModel {
        relations: vec![
            Relation {
                namespace: "public".into(),
                name: "events".into(),
                kind: RelationKind::Partitioned,
                attributes: vec![],
                constraints: vec![],
                privileges: vec![],
                comment: None,
            },
            Relation {
                namespace: "public".into(),
                name: "events_2026_01".into(),
                kind: RelationKind::PartitionChild,
                attributes: vec![],
                constraints: vec![],
                privileges: vec![],
                comment: None,
            },
        ],
        ..Default::default()
    };

    assert!(schema.addressable_relation("public", "events").is_some());
    assert!(schema
        .addressable_relation("public", "events_2026_01")
        .is_none());
}
