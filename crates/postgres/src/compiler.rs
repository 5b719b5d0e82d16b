//! Query Compiler (spec.md §4.C): turns a validated `FilterDocument` and
//! mutation requests into parameterized SQL against a particular
//! `SchemaModel` snapshot. Never interpolates a value into the SQL text —
//! every value becomes a `$n` placeholder bound through `Value`.

use pgcat_core::schema::{Callable, ConstraintKind, Relation, ReturnSignature};
use pgcat_core::types::{TypeDescriptor, TypeRegistry, Value};
use pgcat_core::{Error, SchemaModel};
use pgcat_filter::{SelectPlan, ValidatedFilter, WhereNode};
use pgcat_wire::{LogicalOperator, Operator};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

pub struct QueryCompiler<'a> {
    pub schema: &'a SchemaModel,
    pub registry: &'a TypeRegistry,
    pub default_limit: i64,
    pub max_limit: i64,
}

impl<'a> QueryCompiler<'a> {
    /// `compile_query`: SELECT with total count folded into the same
    /// round-trip via `count(*) OVER()`, per spec.md §4.C.
    pub fn compile_query(
        &self,
        relation: &Relation,
        filter: &ValidatedFilter,
    ) -> Result<CompiledStatement, Error> {
        let mut params = Vec::new();
        let projection = self.render_projection(relation, filter.select.as_ref(), "t", &mut params)?;

        let mut sql = format!(
            "SELECT {projection}, count(*) OVER() AS __total_count FROM {} ",
            qualify(&relation.namespace, &relation.name, "t")
        );

        if let Some(where_clause) = &filter.where_clause {
            let predicate = self.render_where(relation, where_clause, &mut params, "t")?;
            sql.push_str("WHERE ");
            sql.push_str(&predicate);
            sql.push(' ');
        }

        let limit = filter.pagination.limit.unwrap_or(self.default_limit);
        if limit > self.max_limit {
            return Err(Error::LimitExceeded {
                limit,
                max: self.max_limit,
            });
        }
        params.push(Value::Int(limit));
        let limit_idx = params.len();
        params.push(Value::Int(filter.pagination.offset));
        let offset_idx = params.len();
        sql.push_str(&format!("LIMIT ${limit_idx} OFFSET ${offset_idx}"));

        Ok(CompiledStatement { sql, params })
    }

    fn render_projection(
        &self,
        relation: &Relation,
        select: Option<&SelectPlan>,
        alias: &str,
        params: &mut Vec<Value>,
    ) -> Result<String, Error> {
        let Some(select) = select else {
            return Ok(format!("to_jsonb({alias}.*) AS __row"));
        };

        let mut parts = Vec::new();
        if let Some(fields) = &select.fields {
            for field in fields {
                self.resolve_field(relation, field)?;
                parts.push(format!("'{field}', {alias}.{}", quote_ident(field)));
            }
        }
        for (relation_alias, nested) in &select.relations {
            let constraint = self.resolve_reachable_relation(relation, relation_alias)?;
            let subquery = self.render_nested_subquery(&constraint, nested, alias, params)?;
            parts.push(format!("'{relation_alias}', ({subquery})"));
        }
        Ok(format!("jsonb_build_object({}) AS __row", parts.join(", ")))
    }

    /// Builds the correlated sub-aggregation for a FK-reachable relation
    /// (spec.md §4.C "nested select via FK-reachable correlated
    /// sub-aggregation"), e.g. `{id, orders:[{id,total},...]}`. The child
    /// relation is always aliased `c` inside the subquery; `parent_alias`
    /// is whatever the enclosing projection used for the correlated column.
    /// Any literal emitted by a further-nested relation still binds through
    /// `params`, the same parameter list as the rest of the statement, since
    /// Postgres numbers placeholders per-statement rather than per-subquery.
    fn render_nested_subquery(
        &self,
        fk: &ForeignKeyLink,
        nested: &SelectPlan,
        parent_alias: &str,
        params: &mut Vec<Value>,
    ) -> Result<String, Error> {
        let child = self
            .schema
            .relation(&fk.child_namespace, &fk.child_relation)
            .ok_or_else(|| Error::UnknownRelation {
                name: fk.child_relation.clone(),
            })?;

        let child_projection = self.render_projection(child, Some(nested), "c", params)?;
        // render_projection appends "AS __row"; strip it back off for reuse
        // inside the aggregate expression.
        let child_projection = child_projection
            .trim_end_matches(" AS __row")
            .to_string();

        let join_predicate = fk
            .child_columns
            .iter()
            .zip(fk.parent_columns.iter())
            .map(|(child_col, parent_col)| {
                format!(
                    "c.{} = {parent_alias}.{}",
                    quote_ident(child_col),
                    quote_ident(parent_col)
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ");

        Ok(format!(
            "SELECT COALESCE(jsonb_agg({child_projection}), '[]'::jsonb) FROM {} c WHERE {join_predicate}",
            qualify(&child.namespace, &child.name, "c")
        ))
    }

    fn resolve_field<'r>(&self, relation: &'r Relation, field: &str) -> Result<&'r pgcat_core::schema::Attribute, Error> {
        relation
            .attribute(field)
            .ok_or_else(|| Error::UnknownField { name: field.to_string() })
    }

    /// Finds the foreign key linking `relation` to `target_relation`,
    /// either as the FK owner or as the referenced side, per "FK-reachable"
    /// in spec.md §4.C. Unresolvable (dangling) FKs never qualify.
    fn resolve_reachable_relation(
        &self,
        relation: &Relation,
        target_relation: &str,
    ) -> Result<ForeignKeyLink, Error> {
        for constraint in &relation.constraints {
            if let ConstraintKind::ForeignKey {
                references_namespace,
                references_relation,
                references_attributes,
                dangling,
            } = &constraint.kind
            {
                if *dangling {
                    continue;
                }
                if references_relation == target_relation {
                    return Ok(ForeignKeyLink {
                        child_namespace: references_namespace.clone(),
                        child_relation: references_relation.clone(),
                        child_columns: references_attributes.clone(),
                        parent_columns: constraint.attributes.clone(),
                    });
                }
            }
        }

        // Reverse direction: target_relation has a FK pointing back at us.
        if let Some(target) = self.schema.relations.iter().find(|r| r.name == target_relation) {
            for constraint in &target.constraints {
                if let ConstraintKind::ForeignKey {
                    references_relation,
                    references_attributes,
                    dangling,
                    ..
                } = &constraint.kind
                {
                    if *dangling || references_relation != &relation.name {
                        continue;
                    }
                    return Ok(ForeignKeyLink {
                        child_namespace: target.namespace.clone(),
                        child_relation: target.name.clone(),
                        child_columns: constraint.attributes.clone(),
                        parent_columns: references_attributes.clone(),
                    });
                }
            }
        }

        Err(Error::UnknownRelation {
            name: target_relation.to_string(),
        })
    }

    fn render_where(
        &self,
        relation: &Relation,
        node: &WhereNode,
        params: &mut Vec<Value>,
        alias: &str,
    ) -> Result<String, Error> {
        match node {
            WhereNode::Comparison {
                field,
                operator,
                value,
            } => {
                let attribute = self.resolve_field(relation, field)?;
                let descriptor = self.registry.describe(attribute.type_oid);
                self.typecheck_operator(&descriptor, *operator, field)?;
                let column = format!("{alias}.{}", quote_ident(field));

                match operator {
                    Operator::IsNull => Ok(format!("{column} IS NULL")),
                    Operator::IsNotNull => Ok(format!("{column} IS NOT NULL")),
                    Operator::In | Operator::NotIn => {
                        let json = value.as_ref().ok_or(Error::KeyShapeMismatch)?;
                        let items = json.as_array().ok_or_else(|| {
                            Error::OperatorTypeMismatch {
                                field: field.clone(),
                                operator: format!("{operator:?}"),
                            }
                        })?;
                        let mut placeholders = Vec::with_capacity(items.len());
                        for item in items {
                            let v = self.registry.from_json(attribute.type_oid, item)?;
                            params.push(v);
                            placeholders.push(format!("${}", params.len()));
                        }
                        Ok(format!("{column} {} ({})", operator.sql_symbol(), placeholders.join(", ")))
                    }
                    _ => {
                        let json = value.as_ref().ok_or(Error::KeyShapeMismatch)?;
                        let v = self.registry.from_json(attribute.type_oid, json)?;
                        params.push(v);
                        Ok(format!("{column} {} ${}", operator.sql_symbol(), params.len()))
                    }
                }
            }
            WhereNode::Logical { operator, conditions } => {
                let rendered: Result<Vec<String>, Error> = conditions
                    .iter()
                    .map(|c| self.render_where(relation, c, params, alias))
                    .collect();
                let rendered = rendered?;
                match operator {
                    LogicalOperator::And => Ok(format!("({})", rendered.join(" AND "))),
                    LogicalOperator::Or => Ok(format!("({})", rendered.join(" OR "))),
                    LogicalOperator::Not => Ok(format!("NOT ({})", rendered[0])),
                }
            }
        }
    }

    fn typecheck_operator(
        &self,
        descriptor: &TypeDescriptor,
        operator: Operator,
        field: &str,
    ) -> Result<(), Error> {
        let ok = match operator {
            Operator::Like | Operator::Ilike => descriptor.is_text_like(),
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => descriptor.is_orderable(),
            Operator::IsNull | Operator::IsNotNull => descriptor.accepts_null_check(),
            Operator::Eq | Operator::Neq | Operator::In | Operator::NotIn => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::OperatorTypeMismatch {
                field: field.to_string(),
                operator: format!("{operator:?}"),
            })
        }
    }

    /// `compile_insert`: multi-row `INSERT ... VALUES (...), (...) RETURNING
    /// to_jsonb(t.*)`, used for both single-row PUT and batch insert.
    pub fn compile_insert(
        &self,
        relation: &Relation,
        rows: &[HashMap<String, serde_json::Value>],
    ) -> Result<CompiledStatement, Error> {
        if rows.is_empty() {
            return Err(Error::MalformedRequest("insert batch is empty".into()));
        }

        let mut columns: Vec<String> = rows[0].keys().cloned().collect();
        columns.sort();
        for column in &columns {
            self.resolve_field(relation, column)?;
        }

        let mut params = Vec::new();
        let mut value_groups = Vec::with_capacity(rows.len());
        for row in rows {
            let mut placeholders = Vec::with_capacity(columns.len());
            for column in &columns {
                let attribute = self.resolve_field(relation, column)?;
                let json = row.get(column).unwrap_or(&serde_json::Value::Null);
                let value = self.registry.from_json(attribute.type_oid, json)?;
                params.push(value);
                placeholders.push(format!("${}", params.len()));
            }
            value_groups.push(format!("({})", placeholders.join(", ")));
        }

        let quoted_columns = columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT INTO {} ({quoted_columns}) VALUES {} RETURNING to_jsonb(t.*) AS __row",
            qualify(&relation.namespace, &relation.name, "t"),
            value_groups.join(", "),
        );

        Ok(CompiledStatement { sql, params })
    }

    /// `compile_update`: enforces the strict key-shape rule before
    /// generating `UPDATE ... SET ... WHERE <key> RETURNING to_jsonb(t.*)`.
    pub fn compile_update(
        &self,
        relation: &Relation,
        key: &HashMap<String, serde_json::Value>,
        values: &HashMap<String, serde_json::Value>,
    ) -> Result<CompiledStatement, Error> {
        self.check_key_shape(relation, key)?;
        if values.is_empty() {
            return Err(Error::MalformedRequest("update has no values".into()));
        }

        let mut params = Vec::new();
        let mut set_clauses = Vec::new();
        let mut value_columns: Vec<&String> = values.keys().collect();
        value_columns.sort();
        for column in value_columns {
            let attribute = self.resolve_field(relation, column)?;
            let value = self.registry.from_json(attribute.type_oid, &values[column])?;
            params.push(value);
            set_clauses.push(format!("{} = ${}", quote_ident(column), params.len()));
        }

        let where_clause = self.render_key_predicate(relation, key, &mut params)?;

        let sql = format!(
            "UPDATE {} SET {} WHERE {where_clause} RETURNING to_jsonb(t.*) AS __row",
            qualify(&relation.namespace, &relation.name, "t"),
            set_clauses.join(", "),
        );

        Ok(CompiledStatement { sql, params })
    }

    /// `compile_delete`: `DELETE ... WHERE <key>`, returning the deleted row
    /// count (idempotent: a second call affects zero rows, per spec.md §8).
    pub fn compile_delete(
        &self,
        relation: &Relation,
        key: &HashMap<String, serde_json::Value>,
    ) -> Result<CompiledStatement, Error> {
        self.check_key_shape(relation, key)?;
        let mut params = Vec::new();
        let where_clause = self.render_key_predicate(relation, key, &mut params)?;
        let sql = format!(
            "DELETE FROM {} WHERE {where_clause}",
            qualify(&relation.namespace, &relation.name, "t")
        );
        Ok(CompiledStatement { sql, params })
    }

    fn render_key_predicate(
        &self,
        relation: &Relation,
        key: &HashMap<String, serde_json::Value>,
        params: &mut Vec<Value>,
    ) -> Result<String, Error> {
        let mut keys: Vec<&String> = key.keys().collect();
        keys.sort();
        let mut predicates = Vec::with_capacity(keys.len());
        for column in keys {
            let attribute = self.resolve_field(relation, column)?;
            let value = self.registry.from_json(attribute.type_oid, &key[column])?;
            params.push(value);
            predicates.push(format!("{} = ${}", quote_ident(column), params.len()));
        }
        Ok(predicates.join(" AND "))
    }

    /// Strict key-shape rule (spec.md §4.C): `key` must equal exactly the
    /// primary key's attributes or exactly one unique constraint's
    /// attributes. Partial or superset matches are `KeyShapeMismatch`.
    fn check_key_shape(
        &self,
        relation: &Relation,
        key: &HashMap<String, serde_json::Value>,
    ) -> Result<(), Error> {
        let key_fields: HashSet<&str> = key.keys().map(String::as_str).collect();
        if relation.matching_key_constraint(&key_fields).is_none() {
            return Err(Error::KeyShapeMismatch);
        }
        Ok(())
    }

    /// `compile_call`: named-argument invocation. Procedures compile to
    /// `CALL`, everything else to a `SELECT * FROM fn(...)`, which streams
    /// naturally for set-returning functions.
    pub fn compile_call(
        &self,
        callable: &Callable,
        arguments: &HashMap<String, serde_json::Value>,
    ) -> Result<CompiledStatement, Error> {
        let mut params = Vec::new();
        let mut argument_exprs = Vec::new();

        for parameter in &callable.parameters {
            if matches!(parameter.mode, pgcat_core::schema::ParameterMode::Out) {
                continue;
            }
            match arguments.get(&parameter.name) {
                Some(json) => {
                    let value = self.registry.from_json(parameter.type_oid, json)?;
                    params.push(value);
                    argument_exprs.push(format!("{} => ${}", quote_ident(&parameter.name), params.len()));
                }
                None if parameter.has_default => {}
                None => {
                    return Err(Error::MissingArgument {
                        name: parameter.name.clone(),
                    })
                }
            }
        }

        let call_expr = format!(
            "{}.{}({})",
            quote_ident(&callable.namespace),
            quote_ident(&callable.name),
            argument_exprs.join(", ")
        );

        let sql = match (&callable.kind, &callable.returns) {
            (pgcat_core::schema::CallableKind::Procedure, _) => format!("CALL {call_expr}"),
            (_, ReturnSignature::Void) => format!("SELECT {call_expr}"),
            (_, ReturnSignature::Scalar(_)) => format!("SELECT {call_expr} AS result"),
            (
                _,
                ReturnSignature::SetOfComposite(_)
                | ReturnSignature::Table(_)
                | ReturnSignature::Composite(_),
            ) => {
                format!("SELECT * FROM {call_expr}")
            }
        };

        Ok(CompiledStatement { sql, params })
    }
}

struct ForeignKeyLink {
    child_namespace: String,
    child_relation: String,
    child_columns: Vec<String>,
    parent_columns: Vec<String>,
}

fn qualify(namespace: &str, name: &str, alias: &str) -> String {
    format!(
        "{}.{} AS {alias}",
        quote_ident(namespace),
        quote_ident(name)
    )
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgcat_core::schema::{Attribute, Constraint, Relation, RelationKind};
    use pgcat_filter::{ValidatedFilter, ValidatedPagination, WhereNode};
    use pgcat_wire::Operator;

    fn widgets_relation() -> Relation {
        Relation {
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
        }
    }

    fn compiler<'a>(schema: &'a SchemaModel, registry: &'a TypeRegistry) -> QueryCompiler<'a> {
        QueryCompiler {
            schema,
            registry,
            default_limit: 50,
            max_limit: 500,
        }
    }

    #[test]
    fn select_never_interpolates_a_literal_into_the_sql_text() {
        let schema = SchemaModel {
            relations: vec![widgets_relation()],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);
        let filter = ValidatedFilter {
            select: None,
            where_clause: Some(WhereNode::Comparison {
                field: "name".into(),
                operator: Operator::Eq,
                value: Some(serde_json::json!("'; DROP TABLE widgets; --")),
            }),
            pagination: ValidatedPagination::default(),
        };
        let compiled = c.compile_query(&widgets_relation(), &filter).unwrap();
        assert!(!compiled.sql.contains("DROP TABLE"));
        assert!(compiled.sql.contains("$1"));
        assert_eq!(compiled.params.len(), 3); // value, limit, offset
    }

    #[test]
    fn unknown_field_is_rejected() {
        let schema = SchemaModel {
            relations: vec![widgets_relation()],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);
        let filter = ValidatedFilter {
            select: None,
            where_clause: Some(WhereNode::Comparison {
                field: "does_not_exist".into(),
                operator: Operator::Eq,
                value: Some(serde_json::json!(1)),
            }),
            pagination: ValidatedPagination::default(),
        };
        let err = c.compile_query(&widgets_relation(), &filter).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn like_on_an_integer_field_is_a_type_mismatch() {
        let schema = SchemaModel {
            relations: vec![widgets_relation()],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);
        let filter = ValidatedFilter {
            select: None,
            where_clause: Some(WhereNode::Comparison {
                field: "id".into(),
                operator: Operator::Like,
                value: Some(serde_json::json!("42")),
            }),
            pagination: ValidatedPagination::default(),
        };
        let err = c.compile_query(&widgets_relation(), &filter).unwrap_err();
        assert!(matches!(err, Error::OperatorTypeMismatch { .. }));
    }

    #[test]
    fn limit_above_maximum_is_rejected() {
        let schema = SchemaModel {
            relations: vec![widgets_relation()],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);
        let filter = ValidatedFilter {
            select: None,
            where_clause: None,
            pagination: ValidatedPagination {
                limit: Some(10_000),
                offset: 0,
                cursor: None,
            },
        };
        let err = c.compile_query(&widgets_relation(), &filter).unwrap_err();
        assert!(matches!(err, Error::LimitExceeded { .. }));
    }

    #[test]
    fn key_shape_must_match_exactly_the_primary_key() {
        let schema = SchemaModel {
            relations: vec![widgets_relation()],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);

        let mut partial_key = HashMap::new();
        partial_key.insert("id".to_string(), serde_json::json!(1));
        let mut values = HashMap::new();
        values.insert("name".to_string(), serde_json::json!("new name"));

        assert!(c.compile_update(&widgets_relation(), &partial_key, &values).is_ok());

        let mut superset_key = HashMap::new();
        superset_key.insert("id".to_string(), serde_json::json!(1));
        superset_key.insert("name".to_string(), serde_json::json!("extra"));
        let err = c
            .compile_update(&widgets_relation(), &superset_key, &values)
            .unwrap_err();
        assert!(matches!(err, Error::KeyShapeMismatch));
    }

    fn customers_and_orders() -> (Relation, Relation) {
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
                Attribute {
                    ordinal: 3,
                    name: "total".into(),
                    type_oid: 23,
                    not_null: false,
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
        (customers, orders)
    }

    #[test]
    fn nested_select_via_fk_builds_a_correlated_subquery() {
        let (customers, orders) = customers_and_orders();
        let schema = SchemaModel {
            relations: vec![customers.clone(), orders],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);

        let mut relations = HashMap::new();
        relations.insert(
            "orders".to_string(),
            SelectPlan {
                fields: Some(vec!["id".into(), "total".into()]),
                relations: HashMap::new(),
            },
        );
        let filter = ValidatedFilter {
            select: Some(SelectPlan {
                fields: Some(vec!["id".into()]),
                relations,
            }),
            where_clause: None,
            pagination: ValidatedPagination::default(),
        };

        let compiled = c.compile_query(&customers, &filter).unwrap();
        assert!(compiled.sql.contains("jsonb_agg"));
        assert!(compiled.sql.contains("c.\"customer_id\" = t.\"id\""));
        assert!(compiled.sql.contains("c.\"total\""));
        assert_eq!(compiled.params.len(), 2); // limit, offset
    }

    #[test]
    fn delete_compiles_a_parameterized_statement_by_key() {
        let schema = SchemaModel {
            relations: vec![widgets_relation()],
            ..Default::default()
        };
        let registry = TypeRegistry::default();
        let c = compiler(&schema, &registry);
        let mut key = HashMap::new();
        key.insert("id".to_string(), serde_json::json!(7));
        let compiled = c.compile_delete(&widgets_relation(), &key).unwrap();
        assert!(compiled.sql.starts_with("DELETE FROM"));
        assert_eq!(compiled.params.len(), 1);
    }
}
