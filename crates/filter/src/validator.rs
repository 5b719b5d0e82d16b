//! Grammar-level validation of a raw `FilterDocument` (spec.md §3): shape
//! and arity only, no field-existence or type checking (that needs a
//! `SchemaModel` and lives in the query compiler).

use crate::ast::{SelectPlan, ValidatedFilter, ValidatedPagination, WhereNode};
use pgcat_core::Error;
use pgcat_wire::{FilterDocument, LogicalOperator, SelectClause, WhereClause};
use std::collections::HashMap;

const MAX_NESTING_DEPTH: u8 = 8;

pub fn validate(document: &FilterDocument) -> Result<ValidatedFilter, Error> {
    let select = document.select.as_ref().map(validate_select).transpose()?;
    let where_clause = document
        .where_clause
        .as_ref()
        .map(|w| validate_where(w, 0))
        .transpose()?;
    let pagination = validate_pagination(document.pagination.as_ref())?;

    Ok(ValidatedFilter {
        select,
        where_clause,
        pagination,
    })
}

fn validate_select(clause: &SelectClause) -> Result<SelectPlan, Error> {
    let fields_empty = clause.fields.as_ref().map(Vec::is_empty).unwrap_or(true);
    if fields_empty && clause.relations.is_empty() {
        return Err(Error::MalformedRequest(
            "select clause names neither fields nor a relation".into(),
        ));
    }
    if let Some(fields) = &clause.fields {
        for field in fields {
            validate_identifier(field)?;
        }
    }

    let mut relations = HashMap::with_capacity(clause.relations.len());
    for (alias, nested) in &clause.relations {
        validate_identifier(alias)?;
        relations.insert(alias.clone(), validate_select(nested)?);
    }

    Ok(SelectPlan {
        fields: clause.fields.clone(),
        relations,
    })
}

fn validate_where(clause: &WhereClause, depth: u8) -> Result<WhereNode, Error> {
    if depth > MAX_NESTING_DEPTH {
        return Err(Error::MalformedRequest(format!(
            "where clause nests deeper than {MAX_NESTING_DEPTH} levels"
        )));
    }
    match clause {
        WhereClause::Comparison {
            field,
            operator,
            value,
        } => {
            validate_identifier(field)?;
            if operator.requires_value() && value.is_none() {
                return Err(Error::MalformedRequest(format!(
                    "operator {:?} on field {field} requires a value",
                    operator
                )));
            }
            if !operator.requires_value() && value.is_some() {
                return Err(Error::MalformedRequest(format!(
                    "operator {:?} on field {field} must not carry a value",
                    operator
                )));
            }
            Ok(WhereNode::Comparison {
                field: field.clone(),
                operator: *operator,
                value: value.clone(),
            })
        }
        WhereClause::Logical {
            operator,
            conditions,
        } => {
            if conditions.is_empty() {
                return Err(Error::MalformedRequest(
                    "logical clause has no conditions".into(),
                ));
            }
            if matches!(operator, LogicalOperator::Not) && conditions.len() != 1 {
                return Err(Error::MalformedRequest(
                    "not accepts exactly one condition".into(),
                ));
            }
            let mut validated = Vec::with_capacity(conditions.len());
            for condition in conditions {
                validated.push(validate_where(condition, depth + 1)?);
            }
            Ok(WhereNode::Logical {
                operator: *operator,
                conditions: validated,
            })
        }
    }
}

fn validate_pagination(
    pagination: Option<&pgcat_wire::Pagination>,
) -> Result<ValidatedPagination, Error> {
    let Some(pagination) = pagination else {
        return Ok(ValidatedPagination::default());
    };
    if let Some(limit) = pagination.limit {
        if limit < 0 {
            return Err(Error::MalformedRequest("limit must not be negative".into()));
        }
    }
    let offset = pagination.offset.unwrap_or(0);
    if offset < 0 {
        return Err(Error::MalformedRequest("offset must not be negative".into()));
    }
    Ok(ValidatedPagination {
        limit: pagination.limit,
        offset,
        // Cursor semantics are server-defined (spec.md §9 open question):
        // an unrecognized or stale cursor is ignored, never a hard error.
        cursor: pagination.cursor.clone(),
    })
}

fn validate_identifier(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.len() > 63 {
        return Err(Error::MalformedRequest(format!("invalid identifier: {name}")));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(Error::MalformedRequest(format!("invalid identifier: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgcat_wire::Operator;

    #[test]
    fn comparison_without_value_rejected_for_eq() {
        let doc = FilterDocument {
            where_clause: Some(WhereClause::Comparison {
                field: "id".into(),
                operator: Operator::Eq,
                value: None,
            }),
            ..Default::default()
        };
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn is_null_without_value_accepted() {
        let doc = FilterDocument {
            where_clause: Some(WhereClause::Comparison {
                field: "deleted_at".into(),
                operator: Operator::IsNull,
                value: None,
            }),
            ..Default::default()
        };
        assert!(validate(&doc).is_ok());
    }

    #[test]
    fn not_with_multiple_conditions_rejected() {
        let doc = FilterDocument {
            where_clause: Some(WhereClause::Logical {
                operator: LogicalOperator::Not,
                conditions: vec![
                    WhereClause::Comparison {
                        field: "a".into(),
                        operator: Operator::IsNull,
                        value: None,
                    },
                    WhereClause::Comparison {
                        field: "b".into(),
                        operator: Operator::IsNull,
                        value: None,
                    },
                ],
            }),
            ..Default::default()
        };
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn negative_offset_rejected() {
        let doc = FilterDocument {
            pagination: Some(pgcat_wire::Pagination {
                limit: None,
                offset: Some(-1),
                cursor: None,
            }),
            ..Default::default()
        };
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn nested_select_keys_by_relation_alias() {
        let mut relations = std::collections::HashMap::new();
        relations.insert(
            "orders".to_string(),
            SelectClause {
                fields: Some(vec!["id".into(), "total".into()]),
                relations: std::collections::HashMap::new(),
            },
        );
        let doc = FilterDocument {
            select: Some(SelectClause {
                fields: Some(vec!["id".into()]),
                relations,
            }),
            ..Default::default()
        };
        let validated = validate(&doc).unwrap().select.unwrap();
        assert_eq!(validated.fields, Some(vec!["id".into()]));
        let orders = validated.relations.get("orders").unwrap();
        assert_eq!(orders.fields, Some(vec!["id".into(), "total".into()]));
    }

    #[test]
    fn empty_select_clause_is_rejected() {
        let doc = FilterDocument {
            select: Some(SelectClause::default()),
            ..Default::default()
        };
        assert!(validate(&doc).is_err());
    }

    #[test]
    fn unknown_cursor_is_carried_not_rejected() {
        let doc = FilterDocument {
            pagination: Some(pgcat_wire::Pagination {
                limit: Some(10),
                offset: None,
                cursor: Some("stale-token".into()),
            }),
            ..Default::default()
        };
        let validated = validate(&doc).unwrap();
        assert_eq!(validated.pagination.cursor.as_deref(), Some("stale-token"));
    }
}
