//! Translates the GET query string into a `FilterDocument` (spec.md §4.D,
//! §6: "GET (query string filters)"). Each `field=operator.value` (or bare
//! `field=value`, implying `eq`) pair becomes one `Comparison`;
//! `select_fields`, `limit`, `offset` and `cursor` are reserved parameter
//! names.

use pgcat_wire::{FilterDocument, LogicalOperator, Operator, Pagination, SelectClause, WhereClause};
use std::collections::HashMap;

const RESERVED: &[&str] = &["select_fields", "limit", "offset", "cursor"];

pub fn parse(params: &HashMap<String, String>) -> Result<FilterDocument, String> {
    let select = params.get("select_fields").map(|raw| SelectClause {
        fields: Some(raw.split(',').map(|s| s.trim().to_string()).collect()),
        relations: HashMap::new(),
    });

    let mut conditions = Vec::new();
    for (key, raw_value) in params {
        if RESERVED.contains(&key.as_str()) {
            continue;
        }
        conditions.push(parse_condition(key, raw_value)?);
    }
    conditions.sort_by(|a, b| condition_field(a).cmp(condition_field(b)));

    let where_clause = match conditions.len() {
        0 => None,
        1 => Some(conditions.into_iter().next().unwrap()),
        _ => Some(WhereClause::Logical {
            operator: LogicalOperator::And,
            conditions,
        }),
    };

    let pagination = Pagination {
        limit: params.get("limit").map(|v| v.parse()).transpose().map_err(|_| "invalid limit".to_string())?,
        offset: params.get("offset").map(|v| v.parse()).transpose().map_err(|_| "invalid offset".to_string())?,
        cursor: params.get("cursor").cloned(),
    };

    Ok(FilterDocument {
        select,
        where_clause,
        pagination: Some(pagination),
    })
}

fn condition_field(clause: &WhereClause) -> &str {
    match clause {
        WhereClause::Comparison { field, .. } => field,
        WhereClause::Logical { .. } => "",
    }
}

fn parse_operator(token: &str) -> Option<Operator> {
    match token {
        "eq" => Some(Operator::Eq),
        "neq" => Some(Operator::Neq),
        "gt" => Some(Operator::Gt),
        "gte" => Some(Operator::Gte),
        "lt" => Some(Operator::Lt),
        "lte" => Some(Operator::Lte),
        "like" => Some(Operator::Like),
        "ilike" => Some(Operator::Ilike),
        "in" => Some(Operator::In),
        "not_in" => Some(Operator::NotIn),
        "is_null" => Some(Operator::IsNull),
        "is_not_null" => Some(Operator::IsNotNull),
        _ => None,
    }
}

fn parse_condition(field: &str, raw_value: &str) -> Result<WhereClause, String> {
    // spec.md §6: `<col>=<val>` is a bare value implying `eq`; `<col>=operator.value`
    // names an explicit operator. Only split on `.` when the prefix is a
    // recognized operator, so a bare value containing a dot (e.g. "3.14")
    // isn't mistaken for one.
    let (operator, rest) = match raw_value.split_once('.') {
        Some((operator_token, rest)) if parse_operator(operator_token).is_some() => {
            (parse_operator(operator_token).unwrap(), rest)
        }
        _ => (Operator::Eq, raw_value),
    };

    let value = match operator {
        Operator::IsNull | Operator::IsNotNull => None,
        Operator::In | Operator::NotIn => Some(serde_json::Value::Array(
            rest.split(',').map(|v| serde_json::Value::String(v.to_string())).collect(),
        )),
        _ => Some(serde_json::Value::String(rest.to_string())),
    };

    Ok(WhereClause::Comparison {
        field: field.to_string(),
        operator,
        value,
    })
}
