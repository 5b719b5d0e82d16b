pub mod error;
pub mod schema;
pub mod types;

pub use error::{Error, ErrorKind, IntrospectionErrorKind, Result};
pub use schema::{
    Attribute, Callable, CallableKind, CallableParameter, Constraint, ConstraintKind, Namespace,
    ParameterMode, Relation, RelationKind, ReturnSignature, SchemaModel, TypeCatalogEntry,
    TypeCategoryHint, Volatility,
};
pub use types::{SharedTypeRegistry, TypeDescriptor, TypeRegistry, Value};
