//! Knowledge-graph (schema directory) seam.
//!
//! The graph maps tables to the value types they contain and the locations
//! they cover. Only read access happens here; seeding belongs to setup
//! tooling. Statements are sent with named parameters, never with values
//! spliced into the statement text.

mod memory;

pub use memory::{NodeLabel, SchemaGraph};

use crate::error::StoreError;
use std::collections::{BTreeMap, BTreeSet};

/// Named parameters for a graph statement (`$name` in the statement text).
pub type GraphParams = BTreeMap<String, String>;

/// Fixed statements issued by the resolver.
pub mod statements {
    pub const KNOWN_ENTITY_NAMES: &str = "MATCH (n) \
        WHERE n:Table OR n:TimePoint OR n:ValueType OR n:Location OR n:PlantType \
        RETURN n.name AS name";

    pub const TABLE_BY_VALUE_TYPE: &str = "MATCH (t:Table)-[:CONTAINS]->(v:ValueType) \
        WHERE v.name = $value_type \
        RETURN t.name AS table_name, v.name AS column_name";

    pub const TABLE_BY_VALUE_TYPE_OR_PREDICTED: &str =
        "MATCH (t:Table)-[:CONTAINS]->(v:ValueType) \
        WHERE v.name = $value_type OR v.name = $predicted_value_type \
        RETURN t.name AS table_name, v.name AS column_name";

    pub const TABLE_BY_LOCATION: &str = "MATCH (t:Table)-[:LOCATED_IN]->(l:Location) \
        WHERE l.name = $location \
        RETURN t.name AS table_name, l.name AS location";
}

/// One returned record: field name → string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphRecord {
    fields: BTreeMap<String, String>,
}

impl GraphRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/// Graph store collaborator. Calls block until the store answers.
pub trait GraphStore: Send + Sync {
    /// Run a parameterized statement.
    fn query(&self, statement: &str, params: &GraphParams) -> Result<Vec<GraphRecord>, StoreError>;

    /// Names of every table, time point, value type, location and plant type.
    fn list_known_entity_names(&self) -> Result<BTreeSet<String>, StoreError>;
}

impl<T: GraphStore + ?Sized> GraphStore for std::sync::Arc<T> {
    fn query(&self, statement: &str, params: &GraphParams) -> Result<Vec<GraphRecord>, StoreError> {
        (**self).query(statement, params)
    }

    fn list_known_entity_names(&self) -> Result<BTreeSet<String>, StoreError> {
        (**self).list_known_entity_names()
    }
}
