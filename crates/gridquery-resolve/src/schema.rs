//! Schema resolution: intent + validated entities → table/column binding.

use crate::config::ResolverConfig;
use crate::error::{ResolveError, StoreError};
use crate::graph::{statements, GraphParams, GraphRecord, GraphStore};
use crate::{EntityBag, Intent, SchemaBinding, Slot};

pub struct SchemaResolver<'a> {
    graph: &'a dyn GraphStore,
    config: &'a ResolverConfig,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(graph: &'a dyn GraphStore, config: &'a ResolverConfig) -> Self {
        Self { graph, config }
    }

    /// Issue one graph lookup for `intent`. An empty answer is terminal for
    /// the run.
    pub fn resolve(
        &self,
        intent: Intent,
        entities: &EntityBag,
    ) -> Result<SchemaBinding, ResolveError> {
        let slot = |slot: Slot| {
            entities
                .get(slot)
                .ok_or(ResolveError::Extraction { intent, slot })
        };

        match intent {
            Intent::CalculationPoint => {
                let value_type = slot(Slot::ValueType)?;
                let params = GraphParams::from([("value_type".to_string(), value_type.to_string())]);
                let records = self.graph.query(statements::TABLE_BY_VALUE_TYPE, &params)?;
                let record = records.first().ok_or_else(|| no_binding(intent, value_type))?;
                column_binding(record)
            }
            Intent::PlanComparison => {
                let value_type = slot(Slot::ValueType)?;
                let predicted = self.config.predicted_value_type(value_type);
                let params = GraphParams::from([
                    ("value_type".to_string(), value_type.to_string()),
                    ("predicted_value_type".to_string(), predicted),
                ]);
                let records = self
                    .graph
                    .query(statements::TABLE_BY_VALUE_TYPE_OR_PREDICTED, &params)?;
                // Prefer the table holding the actual column.
                let record = records
                    .iter()
                    .find(|r| r.get("column_name") == Some(value_type))
                    .or_else(|| records.first())
                    .ok_or_else(|| no_binding(intent, value_type))?;
                column_binding(record)
            }
            Intent::StationInfo => {
                let location = slot(Slot::Location)?;
                let value_type = slot(Slot::ValueType)?;
                let params = GraphParams::from([("location".to_string(), location.to_string())]);
                let records = self.graph.query(statements::TABLE_BY_LOCATION, &params)?;
                let record = records.first().ok_or_else(|| no_binding(intent, location))?;
                Ok(SchemaBinding {
                    table_name: field(record, "table_name")?,
                    column_name: value_type.to_string(),
                    location: Some(
                        record
                            .get("location")
                            .unwrap_or(location)
                            .to_string(),
                    ),
                })
            }
        }
    }
}

fn no_binding(intent: Intent, key: &str) -> ResolveError {
    ResolveError::SchemaResolution {
        intent,
        key: key.to_string(),
    }
}

fn field(record: &GraphRecord, name: &str) -> Result<String, ResolveError> {
    record
        .get(name)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Malformed(format!("graph record without `{name}`")).into())
}

fn column_binding(record: &GraphRecord) -> Result<SchemaBinding, ResolveError> {
    Ok(SchemaBinding {
        table_name: field(record, "table_name")?,
        column_name: field(record, "column_name")?,
        location: None,
    })
}
