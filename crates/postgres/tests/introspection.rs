use pgcat_core::schema::{ConstraintKind, RelationKind};
use pgcat_postgres::test_db::TestDb;
use pgcat_postgres::{introspect_schema, IntrospectionFilter};

#[tokio::test]
async fn introspects_a_basic_table_with_its_primary_key() -> Result<(), Box<dyn std::error::Error>> {
    let db = TestDb::new().await?;
    db.client
        .batch_execute("CREATE TABLE widgets (id integer PRIMARY KEY, name text NOT NULL);")
        .await?;

    let filter = IntrospectionFilter {
        namespaces: &["public".to_string()],
        excluded_objects: &[],
    };
    let model = introspect_schema(&db.client, &filter).await?;

    let relation = model
        .relation("public", "widgets")
        .expect("widgets should be introspected");
    assert_eq!(relation.kind, RelationKind::Ordinary);
    assert_eq!(relation.attributes.len(), 2);

    let name = relation.attribute("name").unwrap();
    assert!(name.not_null);

    let pk = relation.primary_key().expect("widgets should have a primary key");
    assert_eq!(pk.attributes, vec!["id".to_string()]);

    db.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn foreign_keys_resolve_within_the_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let db = TestDb::new().await?;
    db.client
        .batch_execute(
            "CREATE TABLE customers (id integer PRIMARY KEY);
             CREATE TABLE orders (id integer PRIMARY KEY, customer_id integer REFERENCES customers(id));",
        )
        .await?;

    let filter = IntrospectionFilter {
        namespaces: &["public".to_string()],
        excluded_objects: &[],
    };
    let model = introspect_schema(&db.client, &filter).await?;

    let orders = model.relation("public", "orders").unwrap();
    let fk = orders
        .constraints
        .iter()
        .find(|c| matches!(c.kind, ConstraintKind::ForeignKey { .. }))
        .expect("orders should have a foreign key");

    match &fk.kind {
        ConstraintKind::ForeignKey {
            references_relation,
            dangling,
            ..
        } => {
            assert_eq!(references_relation, "customers");
            assert!(!dangling);
        }
        _ => unreachable!(),
    }

    db.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn excluded_namespace_hides_its_relations() -> Result<(), Box<dyn std::error::Error>> {
    let db = TestDb::new().await?;
    db.client
        .batch_execute(
            "CREATE SCHEMA internal_only;
             CREATE TABLE internal_only.secrets (id integer PRIMARY KEY);",
        )
        .await?;

    let filter = IntrospectionFilter {
        namespaces: &["public".to_string()],
        excluded_objects: &[],
    };
    let model = introspect_schema(&db.client, &filter).await?;
    assert!(model.relation("internal_only", "secrets").is_none());

    db.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn enum_types_are_decoded_with_their_labels() -> Result<(), Box<dyn std::error::Error>> {
    let db = TestDb::new().await?;
    db.client
        .batch_execute("CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');")
        .await?;

    let filter = IntrospectionFilter {
        namespaces: &["public".to_string()],
        excluded_objects: &[],
    };
    let model = introspect_schema(&db.client, &filter).await?;
    let mood = model
        .types
        .iter()
        .find(|t| t.name == "mood")
        .expect("mood enum should be introspected");
    assert_eq!(mood.enum_labels, vec!["sad", "ok", "happy"]);

    db.cleanup().await?;
    Ok(())
}
