use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw, unvalidated JSON body of a GET-as-POST query (spec.md §3
/// "FilterDocument grammar"). `pgcat-filter` turns this into a validated AST;
/// this type only knows how to deserialize the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FilterDocument {
    #[serde(default)]
    pub select: Option<SelectClause>,
    #[serde(default, rename = "where")]
    pub where_clause: Option<WhereClause>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// spec.md §3: `SelectClause := { fields?: [field_name...], <relation_alias>?:
/// SelectClause, ... }` — an object whose `fields` key lists scalar columns
/// and whose every other key names a relation reachable by a foreign key,
/// mapping to that relation's own nested `SelectClause`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SelectClause {
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(flatten)]
    pub relations: HashMap<String, SelectClause>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WhereClause {
    Comparison {
        field: String,
        operator: Operator,
        #[serde(default)]
        value: Option<serde_json::Value>,
    },
    Logical {
        operator: LogicalOperator,
        conditions: Vec<WhereClause>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    pub fn requires_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    pub fn sql_symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::Ilike => "ILIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Pagination {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_select_list_deserializes_under_fields() {
        let document: FilterDocument =
            serde_json::from_str(r#"{"select": {"fields": ["id", "name"]}}"#).unwrap();
        assert_eq!(
            document.select.unwrap().fields,
            Some(vec!["id".into(), "name".into()])
        );
    }

    #[test]
    fn nested_select_keys_by_relation_alias() {
        let document: FilterDocument = serde_json::from_str(
            r#"{"select": {"fields": ["id"], "orders": {"fields": ["id", "total"]}}}"#,
        )
        .unwrap();
        let select = document.select.unwrap();
        assert_eq!(select.fields, Some(vec!["id".into()]));
        let orders = select.relations.get("orders").expect("orders key present");
        assert_eq!(orders.fields, Some(vec!["id".into(), "total".into()]));
    }

    #[test]
    fn comparison_where_clause_deserializes() {
        let document: FilterDocument =
            serde_json::from_str(r#"{"where": {"field": "name", "operator": "eq", "value": "widget"}}"#)
                .unwrap();
        assert_eq!(
            document.where_clause,
            Some(WhereClause::Comparison {
                field: "name".into(),
                operator: Operator::Eq,
                value: Some(serde_json::json!("widget")),
            })
        );
    }

    #[test]
    fn logical_where_clause_nests_comparisons() {
        let document: FilterDocument = serde_json::from_str(
            r#"{"where": {"operator": "and", "conditions": [
                {"field": "active", "operator": "eq", "value": true},
                {"field": "name", "operator": "is_not_null"}
            ]}}"#,
        )
        .unwrap();
        let Some(WhereClause::Logical { operator, conditions }) = document.where_clause else {
            panic!("expected a logical clause");
        };
        assert_eq!(operator, LogicalOperator::And);
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn is_null_does_not_require_a_value() {
        let document: FilterDocument =
            serde_json::from_str(r#"{"where": {"field": "deleted_at", "operator": "is_null"}}"#).unwrap();
        assert_eq!(
            document.where_clause,
            Some(WhereClause::Comparison {
                field: "deleted_at".into(),
                operator: Operator::IsNull,
                value: None,
            })
        );
    }

    #[test]
    fn missing_sections_default_to_none() {
        let document: FilterDocument = serde_json::from_str("{}").unwrap();
        assert_eq!(document, FilterDocument::default());
    }
}
