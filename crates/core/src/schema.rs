use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable snapshot of the introspected PostgreSQL catalog. Built once by
/// the Catalog Introspector, held by the Schema Router, and replaced
/// wholesale on DDL notification — no component mutates an existing
/// `SchemaModel` after it is published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SchemaModel {
    pub namespaces: Vec<Namespace>,
    pub relations: Vec<Relation>,
    pub callables: Vec<Callable>,
    pub types: Vec<TypeCatalogEntry>,
}

impl SchemaModel {
    pub fn relation(&self, namespace: &str, name: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.namespace == namespace && r.name == name)
    }

    /// Like [`SchemaModel::relation`], but excludes partition children from
    /// the lookup. A partitioned table's own endpoint already transparently
    /// scans every child partition when queried, so a child is never
    /// individually mounted (spec.md §9 open question, resolved: parent-only
    /// addressing, matching PostgreSQL's own declarative-partitioning
    /// querying semantics).
    pub fn addressable_relation(&self, namespace: &str, name: &str) -> Option<&Relation> {
        self.relation(namespace, name)
            .filter(|r| r.kind != RelationKind::PartitionChild)
    }

    pub fn callable(&self, namespace: &str, name: &str) -> Option<&Callable> {
        self.callables
            .iter()
            .find(|c| c.namespace == namespace && c.name == name)
    }

    pub fn type_by_oid(&self, oid: u32) -> Option<&TypeCatalogEntry> {
        self.types.iter().find(|t| t.oid == oid)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Namespace {
    pub name: String,
    pub owner: Option<String>,
    pub acl: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Ordinary,
    View,
    MaterializedView,
    Foreign,
    Partitioned,
    PartitionChild,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    pub namespace: String,
    pub name: String,
    pub kind: RelationKind,
    pub attributes: Vec<Attribute>,
    pub constraints: Vec<Constraint>,
    pub privileges: Vec<String>,
    pub comment: Option<String>,
}

impl Relation {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::PrimaryKey))
    }

    pub fn unique_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::Unique | ConstraintKind::PrimaryKey))
    }

    /// Returns the constraint whose attribute set is exactly `keys`, per
    /// the strict key-shape rule in spec.md §4.C: a partial match or a
    /// superset is rejected, only an exact set match qualifies.
    pub fn matching_key_constraint(&self, keys: &HashSet<&str>) -> Option<&Constraint> {
        self.unique_constraints().find(|c| {
            let attrs: HashSet<&str> = c.attributes.iter().map(String::as_str).collect();
            attrs == *keys
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    pub ordinal: i32,
    pub name: String,
    pub type_oid: u32,
    pub not_null: bool,
    pub has_default: bool,
    pub generated: bool,
    pub identity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConstraintKind {
    PrimaryKey,
    Unique,
    ForeignKey {
        references_namespace: String,
        references_relation: String,
        references_attributes: Vec<String>,
        /// Set when the referenced relation could not be resolved within
        /// this snapshot (spec.md §3 invariant 2); such constraints are
        /// excluded from nested-select traversal.
        dangling: bool,
    },
    Check,
    Exclusion,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub kind: ConstraintKind,
    pub attributes: Vec<String>,
    pub deferrable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Procedure,
    Aggregate,
    Window,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParameterMode {
    In,
    Out,
    InOut,
    Variadic,
    Table,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallableParameter {
    pub name: String,
    pub mode: ParameterMode,
    pub type_oid: u32,
    pub has_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ReturnSignature {
    Scalar(u32),
    /// A single composite row, not a set (spec.md §4.E): e.g. `RETURNS widgets`
    /// or `RETURNS TABLE(...)` without `SETOF`.
    Composite(Vec<(String, u32)>),
    SetOfComposite(Vec<(String, u32)>),
    Table(Vec<(String, u32)>),
    Void,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Volatility {
    Immutable,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Callable {
    pub namespace: String,
    pub name: String,
    pub kind: CallableKind,
    pub parameters: Vec<CallableParameter>,
    pub returns: ReturnSignature,
    pub volatility: Volatility,
    pub strict: bool,
    pub security_definer: bool,
}

impl Callable {
    pub fn is_set_returning(&self) -> bool {
        matches!(
            self.returns,
            ReturnSignature::SetOfComposite(_) | ReturnSignature::Table(_)
        )
    }

    /// spec.md §4.E: stable/immutable callables may run outside a write
    /// transaction; volatile callables always get their own transaction.
    pub fn requires_dedicated_transaction(&self) -> bool {
        matches!(self.volatility, Volatility::Volatile)
    }
}

/// Raw `pg_type` catalog row, feedstock for the Type Registry (§4.A). Kept
/// separate from the decoded `TypeDescriptor` so the registry can be
/// rebuilt cheaply from a `SchemaModel` without re-querying the database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeCatalogEntry {
    pub oid: u32,
    pub name: String,
    pub namespace: Option<String>,
    pub category: TypeCategoryHint,
    pub element_oid: Option<u32>,
    pub base_oid: Option<u32>,
    pub composite_fields: Vec<(String, u32)>,
    pub enum_labels: Vec<String>,
}

/// Mirrors `pg_type.typtype`: the coarse catalog classification the Type
/// Registry refines into a full `TypeDescriptor`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypeCategoryHint {
    Base,
    Composite,
    Domain,
    Enum,
    Pseudo,
    Range,
    Multirange,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(name: &str, kind: RelationKind) -> Relation {
        Relation {
            namespace: "public".into(),
            name: name.into(),
            kind,
            attributes: vec![],
            constraints: vec![],
            privileges: vec![],
            comment: None,
        }
    }

    #[test]
    fn partition_children_are_not_directly_addressable() {
        let schema = SchemaModel {
            relations: vec![
                relation("events", RelationKind::Partitioned),
                relation("events_2026_01", RelationKind::PartitionChild),
            ],
            ..Default::default()
        };
        assert!(schema.addressable_relation("public", "events").is_some());
        assert!(schema
            .addressable_relation("public", "events_2026_01")
            .is_none());
        // still visible through the unfiltered lookup, e.g. for introspection tooling
        assert!(schema.relation("public", "events_2026_01").is_some());
    }
}
