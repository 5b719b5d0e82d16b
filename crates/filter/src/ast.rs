use pgcat_wire::{LogicalOperator, Operator};
use std::collections::HashMap;

/// A `FilterDocument` that has passed grammar-level validation: every
/// comparison carries a value iff its operator requires one, every logical
/// node has an arity matching its operator, and nesting is bounded. This
/// AST still carries no knowledge of any particular schema: field and
/// relation names are just strings until the query compiler resolves them.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFilter {
    pub select: Option<SelectPlan>,
    pub where_clause: Option<WhereNode>,
    pub pagination: ValidatedPagination,
}

/// Mirrors `pgcat_wire::SelectClause`'s object-keyed shape (spec.md §3):
/// `fields` lists scalar columns, `relations` maps a relation alias to its
/// own nested plan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectPlan {
    pub fields: Option<Vec<String>>,
    pub relations: HashMap<String, SelectPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WhereNode {
    Comparison {
        field: String,
        operator: Operator,
        value: Option<serde_json::Value>,
    },
    Logical {
        operator: LogicalOperator,
        conditions: Vec<WhereNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedPagination {
    pub limit: Option<i64>,
    pub offset: i64,
    pub cursor: Option<String>,
}
