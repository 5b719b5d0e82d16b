//! Catalog Introspector (spec.md §4.B): reflects the live PostgreSQL catalog
//! into a `SchemaModel` inside one `REPEATABLE READ` transaction, so every
//! collection observes the same catalog snapshot even though it is built
//! from several queries.

use pgcat_core::schema::{
    Attribute, Callable, CallableKind, CallableParameter, Constraint, ConstraintKind,
    Namespace, ParameterMode, Relation, RelationKind, ReturnSignature, SchemaModel,
    TypeCatalogEntry, TypeCategoryHint, Volatility,
};
use pgcat_core::{Error, IntrospectionErrorKind, Result};
use std::collections::HashMap;
use tokio_postgres::GenericClient;

fn introspection_error(context: impl Into<String>) -> Error {
    Error::Introspection {
        kind: IntrospectionErrorKind::QueryFailed,
        context: context.into(),
    }
}

/// Regexes (already-compiled) of object names to exclude, per the
/// `excluded_objects` configuration entry in spec.md §6.
pub struct IntrospectionFilter<'a> {
    pub namespaces: &'a [String],
    pub excluded_objects: &'a [regex::Regex],
}

impl IntrospectionFilter<'_> {
    fn allows(&self, namespace: &str, name: &str) -> bool {
        let qualified = format!("{namespace}.{name}");
        !self
            .excluded_objects
            .iter()
            .any(|re| re.is_match(&qualified) || re.is_match(name))
    }
}

/// Runs the full introspection flow inside a caller-provided transaction.
/// The transaction's isolation level is the caller's responsibility (the
/// router opens `REPEATABLE READ` per spec.md §4.B before calling this).
pub async fn introspect_schema<C>(client: &C, filter: &IntrospectionFilter<'_>) -> Result<SchemaModel>
where
    C: GenericClient + Sync,
{
    let namespaces = introspect_namespaces(client, filter.namespaces).await?;
    let mut relations = introspect_relations(client, filter).await?;
    let callables = introspect_callables(client, filter).await?;
    let types = introspect_types(client).await?;

    resolve_dangling_foreign_keys(&mut relations);

    Ok(SchemaModel {
        namespaces,
        relations,
        callables,
        types,
    })
}

async fn introspect_namespaces<C: GenericClient>(
    client: &C,
    included: &[String],
) -> Result<Vec<Namespace>> {
    let query = r#"
        SELECT n.nspname,
               pg_get_userbyid(n.nspowner) AS owner,
               COALESCE(n.nspacl::text[], ARRAY[]::text[]) AS acl
        FROM pg_namespace n
        WHERE n.nspname = ANY($1)
    "#;
    let rows = client
        .query(query, &[&included])
        .await
        .map_err(|e| introspection_error(format!("listing namespaces: {e}")))?;

    Ok(rows
        .into_iter()
        .map(|row| Namespace {
            name: row.get("nspname"),
            owner: row.get("owner"),
            acl: row.get("acl"),
        })
        .collect())
}

async fn introspect_relations<C: GenericClient>(
    client: &C,
    filter: &IntrospectionFilter<'_>,
) -> Result<Vec<Relation>> {
    let query = r#"
        SELECT n.nspname AS namespace,
               c.relname AS name,
               c.relkind AS relkind,
               c.relispartition AS is_partition,
               obj_description(c.oid, 'pg_class') AS comment,
               c.oid AS reloid
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = ANY($1)
          AND c.relkind IN ('r', 'v', 'm', 'f', 'p')
    "#;
    let rows = client
        .query(query, &[&filter.namespaces])
        .await
        .map_err(|e| introspection_error(format!("listing relations: {e}")))?;

    let mut relations = Vec::with_capacity(rows.len());
    for row in rows {
        let namespace: String = row.get("namespace");
        let name: String = row.get("name");
        if !filter.allows(&namespace, &name) {
            continue;
        }
        let reloid: u32 = row.get("reloid");
        let relkind: i8 = row.get::<_, i8>("relkind");
        let is_partition: bool = row.get("is_partition");

        let kind = match (relkind as u8 as char, is_partition) {
            ('r', true) => RelationKind::PartitionChild,
            ('r', false) => RelationKind::Ordinary,
            ('v', _) => RelationKind::View,
            ('m', _) => RelationKind::MaterializedView,
            ('f', _) => RelationKind::Foreign,
            ('p', _) => RelationKind::Partitioned,
            _ => RelationKind::Ordinary,
        };

        let attributes = introspect_attributes(client, reloid).await?;
        let constraints = introspect_constraints(client, reloid).await?;
        let privileges = introspect_privileges(client, reloid).await?;

        relations.push(Relation {
            namespace,
            name,
            kind,
            attributes,
            constraints,
            privileges,
            comment: row.get("comment"),
        });
    }
    Ok(relations)
}

async fn introspect_attributes<C: GenericClient>(client: &C, reloid: u32) -> Result<Vec<Attribute>> {
    let query = r#"
        SELECT a.attnum::int4 AS attnum,
               a.attname,
               a.atttypid::oid AS type_oid,
               a.attnotnull,
               a.atthasdef,
               a.attgenerated <> '' AS generated,
               a.attidentity <> '' AS identity
        FROM pg_attribute a
        WHERE a.attrelid = $1 AND a.attnum > 0 AND NOT a.attisdropped
        ORDER BY a.attnum
    "#;
    let rows = client
        .query(query, &[&reloid])
        .await
        .map_err(|e| introspection_error(format!("listing attributes: {e}")))?;

    Ok(rows
        .into_iter()
        .map(|row| Attribute {
            ordinal: row.get("attnum"),
            name: row.get("attname"),
            type_oid: row.get("type_oid"),
            not_null: row.get("attnotnull"),
            has_default: row.get("atthasdef"),
            generated: row.get("generated"),
            identity: row.get("identity"),
        })
        .collect())
}

/// Resolves a scalar return type OID to its backing relation's columns when
/// it names a row type (`pg_type.typrelid != 0`), e.g. a function declared
/// `RETURNS sometable`. Returns `None` for genuinely scalar types.
async fn introspect_composite_fields<C: GenericClient>(
    client: &C,
    type_oid: u32,
) -> Result<Option<Vec<(String, u32)>>> {
    let row = client
        .query_opt(
            "SELECT typrelid FROM pg_type WHERE oid = $1",
            &[&type_oid],
        )
        .await
        .map_err(|e| introspection_error(format!("resolving composite return type: {e}")))?;
    let Some(row) = row else {
        return Ok(None);
    };
    let typrelid: u32 = row.get("typrelid");
    if typrelid == 0 {
        return Ok(None);
    }
    let attributes = introspect_attributes(client, typrelid).await?;
    Ok(Some(
        attributes.into_iter().map(|a| (a.name, a.type_oid)).collect(),
    ))
}

async fn introspect_constraints<C: GenericClient>(client: &C, reloid: u32) -> Result<Vec<Constraint>> {
    let query = r#"
        SELECT con.conname,
               con.contype,
               con.condeferrable,
               (
                   SELECT array_agg(att.attname ORDER BY k.ord)
                   FROM unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord)
                   JOIN pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
               ) AS attributes,
               ref_n.nspname AS ref_namespace,
               ref_c.relname AS ref_relation,
               (
                   SELECT array_agg(att.attname ORDER BY k.ord)
                   FROM unnest(con.confkey) WITH ORDINALITY AS k(attnum, ord)
                   JOIN pg_attribute att ON att.attrelid = con.confrelid AND att.attnum = k.attnum
               ) AS ref_attributes
        FROM pg_constraint con
        LEFT JOIN pg_class ref_c ON ref_c.oid = con.confrelid
        LEFT JOIN pg_namespace ref_n ON ref_n.oid = ref_c.relnamespace
        WHERE con.conrelid = $1
        ORDER BY con.conname
    "#;
    let rows = client
        .query(query, &[&reloid])
        .await
        .map_err(|e| introspection_error(format!("listing constraints: {e}")))?;

    let mut constraints: Vec<Constraint> = rows
        .into_iter()
        .map(|row| {
            let contype: i8 = row.get::<_, i8>("contype");
            let attributes: Vec<String> = row.get::<_, Option<Vec<String>>>("attributes").unwrap_or_default();
            let kind = match contype as u8 as char {
                'p' => ConstraintKind::PrimaryKey,
                'u' => ConstraintKind::Unique,
                'f' => ConstraintKind::ForeignKey {
                    references_namespace: row.get::<_, Option<String>>("ref_namespace").unwrap_or_default(),
                    references_relation: row.get::<_, Option<String>>("ref_relation").unwrap_or_default(),
                    references_attributes: row
                        .get::<_, Option<Vec<String>>>("ref_attributes")
                        .unwrap_or_default(),
                    // Resolved in a post-pass below, against the whole snapshot.
                    dangling: row.get::<_, Option<String>>("ref_relation").is_none(),
                },
                'c' => ConstraintKind::Check,
                'x' => ConstraintKind::Exclusion,
                _ => ConstraintKind::Check,
            };
            Constraint {
                name: row.get("conname"),
                kind,
                attributes,
                deferrable: row.get("condeferrable"),
            }
        })
        .collect();

    // Deterministic ordering for unique constraints, per invariant 3.
    constraints.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(constraints)
}

async fn introspect_privileges<C: GenericClient>(client: &C, reloid: u32) -> Result<Vec<String>> {
    let query = r#"
        SELECT COALESCE(relacl::text[], ARRAY[]::text[]) AS acl
        FROM pg_class WHERE oid = $1
    "#;
    let row = client
        .query_opt(query, &[&reloid])
        .await
        .map_err(|e| introspection_error(format!("listing privileges: {e}")))?;
    Ok(row.map(|r| r.get("acl")).unwrap_or_default())
}

async fn introspect_callables<C: GenericClient>(
    client: &C,
    filter: &IntrospectionFilter<'_>,
) -> Result<Vec<Callable>> {
    let query = r#"
        SELECT n.nspname AS namespace,
               p.proname AS name,
               p.prokind AS prokind,
               p.provolatile AS provolatile,
               p.proisstrict AS strict,
               p.prosecdef AS security_definer,
               p.proretset AS returns_set,
               p.prorettype::oid AS ret_type,
               p.proargnames AS arg_names,
               p.proargmodes AS arg_modes,
               p.proallargtypes AS all_arg_types,
               p.proargtypes::oid[] AS arg_types,
               p.pronargdefaults AS num_defaults,
               p.pronargs AS num_args
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        WHERE n.nspname = ANY($1)
    "#;
    let rows = client
        .query(query, &[&filter.namespaces])
        .await
        .map_err(|e| introspection_error(format!("listing callables: {e}")))?;

    let mut callables = Vec::with_capacity(rows.len());
    for row in rows {
        let namespace: String = row.get("namespace");
        let name: String = row.get("name");
        if !filter.allows(&namespace, &name) {
            continue;
        }

        let prokind: i8 = row.get::<_, i8>("prokind");
        let kind = match prokind as u8 as char {
            'f' => CallableKind::Function,
            'p' => CallableKind::Procedure,
            'a' => CallableKind::Aggregate,
            'w' => CallableKind::Window,
            _ => CallableKind::Function,
        };

        let provolatile: i8 = row.get::<_, i8>("provolatile");
        let volatility = match provolatile as u8 as char {
            'i' => Volatility::Immutable,
            's' => Volatility::Stable,
            _ => Volatility::Volatile,
        };

        let arg_names: Vec<String> = row.get::<_, Option<Vec<String>>>("arg_names").unwrap_or_default();
        let arg_types: Vec<u32> = row.get::<_, Option<Vec<u32>>>("arg_types").unwrap_or_default();
        let all_arg_types: Vec<u32> = row
            .get::<_, Option<Vec<u32>>>("all_arg_types")
            .unwrap_or_else(|| arg_types.clone());
        let arg_modes: Vec<i8> = row
            .get::<_, Option<Vec<i8>>>("arg_modes")
            .unwrap_or_default();
        let num_defaults: i16 = row.get("num_defaults");
        let num_args: i16 = row.get::<_, i16>("num_args");

        let parameters = build_parameters(&arg_names, &all_arg_types, &arg_modes, num_args, num_defaults);

        let returns_set: bool = row.get("returns_set");
        let ret_type: u32 = row.get("ret_type");
        let out_params: Vec<(String, u32)> = parameters
            .iter()
            .filter(|p| matches!(p.mode, ParameterMode::Out | ParameterMode::InOut | ParameterMode::Table))
            .map(|p| (p.name.clone(), p.type_oid))
            .collect();

        let returns = if ret_type == 2278 {
            // pg_catalog.void
            ReturnSignature::Void
        } else if !out_params.is_empty() {
            if returns_set {
                ReturnSignature::Table(out_params)
            } else {
                // RETURNS TABLE(...)/OUT params without SETOF: a single
                // composite row (spec.md §4.E), not a set.
                ReturnSignature::Composite(out_params)
            }
        } else if returns_set {
            ReturnSignature::SetOfComposite(vec![("column1".to_string(), ret_type)])
        } else if let Some(fields) = introspect_composite_fields(client, ret_type).await? {
            // Plain `RETURNS sometable`-style composite return: ret_type
            // names a row type whose fields come from pg_type.typrelid.
            ReturnSignature::Composite(fields)
        } else {
            ReturnSignature::Scalar(ret_type)
        };

        callables.push(Callable {
            namespace,
            name,
            kind,
            parameters,
            returns,
            volatility,
            strict: row.get("strict"),
            security_definer: row.get("security_definer"),
        });
    }
    Ok(callables)
}

fn build_parameters(
    arg_names: &[String],
    all_arg_types: &[u32],
    arg_modes: &[i8],
    num_args: i16,
    num_defaults: i16,
) -> Vec<CallableParameter> {
    let count = all_arg_types.len().max(num_args as usize);
    let mut params = Vec::with_capacity(count);
    for i in 0..count {
        let name = arg_names
            .get(i)
            .cloned()
            .unwrap_or_else(|| format!("arg{}", i + 1));
        let type_oid = all_arg_types.get(i).copied().unwrap_or(0);
        let mode = match arg_modes.get(i).map(|m| *m as u8 as char) {
            Some('o') => ParameterMode::Out,
            Some('b') => ParameterMode::InOut,
            Some('v') => ParameterMode::Variadic,
            Some('t') => ParameterMode::Table,
            _ => ParameterMode::In,
        };
        let has_default = i as i16 >= (num_args - num_defaults);
        params.push(CallableParameter {
            name,
            mode,
            type_oid,
            has_default,
        });
    }
    params
}

async fn introspect_types<C: GenericClient>(client: &C) -> Result<Vec<TypeCatalogEntry>> {
    let query = r#"
        SELECT t.oid,
               t.typname,
               n.nspname,
               t.typtype,
               t.typelem::oid AS element_oid,
               t.typbasetype::oid AS base_oid,
               t.typrelid::oid AS composite_reloid
        FROM pg_type t
        JOIN pg_namespace n ON n.oid = t.typnamespace
        WHERE t.typtype IN ('c', 'd', 'e', 'r', 'm')
          AND n.nspname NOT IN ('pg_catalog', 'information_schema')
    "#;
    let rows = client
        .query(query, &[])
        .await
        .map_err(|e| introspection_error(format!("listing types: {e}")))?;

    let mut types = Vec::with_capacity(rows.len());
    for row in rows {
        let typtype: i8 = row.get::<_, i8>("typtype");
        let oid: u32 = row.get("oid");
        let category = match typtype as u8 as char {
            'c' => TypeCategoryHint::Composite,
            'd' => TypeCategoryHint::Domain,
            'e' => TypeCategoryHint::Enum,
            'r' => TypeCategoryHint::Range,
            'm' => TypeCategoryHint::Multirange,
            _ => TypeCategoryHint::Base,
        };

        let composite_reloid: u32 = row.get("composite_reloid");
        let composite_fields = if composite_reloid != 0 {
            introspect_attributes(client, composite_reloid)
                .await?
                .into_iter()
                .map(|a| (a.name, a.type_oid))
                .collect()
        } else {
            Vec::new()
        };

        let enum_labels = if matches!(category, TypeCategoryHint::Enum) {
            introspect_enum_labels(client, oid).await?
        } else {
            Vec::new()
        };

        let element_oid: u32 = row.get("element_oid");
        let base_oid: u32 = row.get("base_oid");

        types.push(TypeCatalogEntry {
            oid,
            name: row.get("typname"),
            namespace: row.get("nspname"),
            category,
            element_oid: if element_oid == 0 { None } else { Some(element_oid) },
            base_oid: if base_oid == 0 { None } else { Some(base_oid) },
            composite_fields,
            enum_labels,
        });
    }
    Ok(types)
}

async fn introspect_enum_labels<C: GenericClient>(client: &C, oid: u32) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT enumlabel FROM pg_enum WHERE enumtypid = $1 ORDER BY enumsortorder",
            &[&oid],
        )
        .await
        .map_err(|e| introspection_error(format!("listing enum labels: {e}")))?;
    Ok(rows.into_iter().map(|r| r.get("enumlabel")).collect())
}

/// Invariant 2 from spec.md §3: a foreign key whose referenced relation
/// fell outside the introspected namespace set (or was dropped between
/// catalog reads) is flagged dangling and excluded from nested-select
/// traversal, never surfaced as a hard failure.
fn resolve_dangling_foreign_keys(relations: &mut [Relation]) {
    let known: HashMap<(String, String), ()> = relations
        .iter()
        .map(|r| ((r.namespace.clone(), r.name.clone()), ()))
        .collect();

    for relation in relations.iter_mut() {
        for constraint in relation.constraints.iter_mut() {
            if let ConstraintKind::ForeignKey {
                references_namespace,
                references_relation,
                dangling,
                ..
            } = &mut constraint.kind
            {
                let key = (references_namespace.clone(), references_relation.clone());
                if !known.contains_key(&key) {
                    *dangling = true;
                }
            }
        }
    }
}
