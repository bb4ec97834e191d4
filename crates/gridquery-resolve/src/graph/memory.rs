//! In-memory schema directory.
//!
//! Answers the resolver's fixed statements from an embedded node/edge set.
//! Interior locking lets the directory change while runs hold their own
//! [`KnownEntities`](crate::KnownEntities) snapshot.

use super::{statements, GraphParams, GraphRecord, GraphStore};
use crate::error::StoreError;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeLabel {
    Table,
    TimePoint,
    ValueType,
    Location,
    PlantType,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<NodeLabel, BTreeSet<String>>,
    /// (table, value type), insertion order.
    contains: Vec<(String, String)>,
    /// (table, location), insertion order.
    located_in: Vec<(String, String)>,
    offline: bool,
}

impl GraphData {
    fn insert_node(&mut self, label: NodeLabel, name: &str) {
        self.nodes.entry(label).or_default().insert(name.to_string());
    }
}

#[derive(Debug, Default)]
pub struct SchemaGraph {
    data: RwLock<GraphData>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory the production deployment is seeded with: a telemetry
    /// history table and a plant-information table for Guangdong.
    pub fn seeded() -> Self {
        let graph = Self::new();
        for value_type in ["系统负荷", "系统负荷预测值", "分布式光伏出力"] {
            graph.add_contains("yc_hs_720001cur_010", value_type);
        }
        for value_type in ["装机容量", "利用小时数"] {
            graph.add_contains("power_plant_info", value_type);
        }
        graph.add_located_in("power_plant_info", "广东省");
        for plant_type in ["煤电", "燃气"] {
            graph.add_node(NodeLabel::PlantType, plant_type);
        }
        for time_point in ["今天", "昨天", "本月", "上月"] {
            graph.add_node(NodeLabel::TimePoint, time_point);
        }
        graph
    }

    pub fn add_node(&self, label: NodeLabel, name: &str) {
        self.data.write().insert_node(label, name);
    }

    /// `(table)-[:CONTAINS]->(value_type)`, creating both nodes.
    pub fn add_contains(&self, table: &str, value_type: &str) {
        let mut data = self.data.write();
        data.insert_node(NodeLabel::Table, table);
        data.insert_node(NodeLabel::ValueType, value_type);
        data.contains
            .push((table.to_string(), value_type.to_string()));
    }

    /// `(table)-[:LOCATED_IN]->(location)`, creating both nodes.
    pub fn add_located_in(&self, table: &str, location: &str) {
        let mut data = self.data.write();
        data.insert_node(NodeLabel::Table, table);
        data.insert_node(NodeLabel::Location, location);
        data.located_in
            .push((table.to_string(), location.to_string()));
    }

    /// Simulate the store going away; every call fails until restored.
    pub fn set_offline(&self, offline: bool) {
        self.data.write().offline = offline;
    }

    pub fn node_count(&self) -> usize {
        self.data.read().nodes.values().map(BTreeSet::len).sum()
    }
}

fn param<'a>(params: &'a GraphParams, name: &str) -> Result<&'a str, StoreError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Malformed(format!("missing parameter `${name}`")))
}

impl GraphStore for SchemaGraph {
    fn query(&self, statement: &str, params: &GraphParams) -> Result<Vec<GraphRecord>, StoreError> {
        let data = self.data.read();
        if data.offline {
            return Err(StoreError::Unavailable("schema graph is offline".to_string()));
        }

        let contains_any = |names: &[&str]| {
            data.contains
                .iter()
                .filter(|(_, v)| names.contains(&v.as_str()))
                .map(|(t, v)| {
                    GraphRecord::new()
                        .with("table_name", t.as_str())
                        .with("column_name", v.as_str())
                })
                .collect::<Vec<_>>()
        };

        match statement {
            statements::TABLE_BY_VALUE_TYPE => {
                let value_type = param(params, "value_type")?;
                Ok(contains_any(&[value_type]))
            }
            statements::TABLE_BY_VALUE_TYPE_OR_PREDICTED => {
                let value_type = param(params, "value_type")?;
                let predicted = param(params, "predicted_value_type")?;
                Ok(contains_any(&[value_type, predicted]))
            }
            statements::TABLE_BY_LOCATION => {
                let location = param(params, "location")?;
                Ok(data
                    .located_in
                    .iter()
                    .filter(|(_, l)| l == location)
                    .map(|(t, l)| {
                        GraphRecord::new()
                            .with("table_name", t.as_str())
                            .with("location", l.as_str())
                    })
                    .collect())
            }
            statements::KNOWN_ENTITY_NAMES => Ok(data
                .nodes
                .values()
                .flatten()
                .map(|name| GraphRecord::new().with("name", name.as_str()))
                .collect()),
            other => Err(StoreError::Unsupported(other.to_string())),
        }
    }

    fn list_known_entity_names(&self) -> Result<BTreeSet<String>, StoreError> {
        self.query(statements::KNOWN_ENTITY_NAMES, &GraphParams::new())?
            .iter()
            .map(|record| {
                record
                    .get("name")
                    .map(str::to_string)
                    .ok_or_else(|| StoreError::Malformed("record without `name`".to_string()))
            })
            .collect()
    }
}
