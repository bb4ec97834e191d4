//! gridquery: staged resolution of power-grid questions
//!
//! Turns a free-text question about grid operations ("今天系统负荷最高值是多少？")
//! into a validated, parameterized SQL query, runs it, and renders the rows as
//! a natural-language answer. An external stepwise search driver calls
//! [`ResolutionRun::evaluate`] once per candidate thought; each call either
//! accepts the current step, accepts the run as final, or rejects.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                     QUERY RESOLUTION PIPELINE                        │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                                                                      │
//! │  step 0   text ──► IntentClassifier ──► Intent                       │
//! │                                                                      │
//! │  step 1   text ──► EntityExtractor ──► EntityBag                     │
//! │                          │                                           │
//! │                   EntityValidator ◄── KnownEntities (graph snapshot) │
//! │                          │                                           │
//! │                   SchemaResolver ──► graph store ──► SchemaBinding   │
//! │                                                                      │
//! │  step 2   QuerySynthesizer ──► SqlQuery ──► QueryValidator           │
//! │                                                │                     │
//! │                                       relational store ──► rows      │
//! │                                                                      │
//! │  done     ResponseRenderer ──► answer text                           │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every gate fails closed: a rejection never commits partial state and never
//! advances the step. All mutable state lives in the per-run
//! [`ResolutionRun`]; the [`QueryResolver`] it borrows from is shared and
//! read-only, so concurrent runs never alias each other's state.

pub mod config;
pub mod entities;
pub mod error;
pub mod graph;
pub mod intent;
pub mod machine;
pub mod prompts;
pub mod relational;
pub mod render;
pub mod schema;
pub mod synthesis;
pub mod time;

pub use config::ResolverConfig;
pub use entities::{EntityExtractor, EntityValidator, KnownEntities};
pub use error::{RenderError, ResolveError, StoreError};
pub use graph::{GraphParams, GraphRecord, GraphStore, SchemaGraph};
pub use intent::IntentClassifier;
pub use machine::{QueryResolver, ResolutionRun, ResolutionState, Step, TraceEvent};
pub use relational::RelationalStore;
pub use render::ResponseRenderer;
pub use schema::SchemaResolver;
pub use synthesis::QuerySynthesizer;

pub use gridquery_sql::{ResultRow, SqlQuery, SqlValue};

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Core Types
// ============================================================================

/// The fixed category of question being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// A point value such as "highest system load today".
    CalculationPoint,
    /// Actual versus predicted values.
    PlanComparison,
    /// Plant/station statistics for a region.
    StationInfo,
}

impl Intent {
    /// Priority order used by the classifier.
    pub const ALL: [Intent; 3] = [
        Intent::CalculationPoint,
        Intent::PlanComparison,
        Intent::StationInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::CalculationPoint => "calculation_point",
            Intent::PlanComparison => "plan_comparison",
            Intent::StationInfo => "station_info",
        }
    }

    /// Slots that must be present and validated before a schema binding is
    /// requested or a query synthesized.
    pub fn required_slots(&self) -> &'static [Slot] {
        match self {
            Intent::CalculationPoint => &[Slot::Time, Slot::ValueType],
            Intent::PlanComparison => &[Slot::Time, Slot::ValueType],
            Intent::StationInfo => &[Slot::Location, Slot::ValueType],
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named field extracted from the question text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Time,
    ValueType,
    Location,
    PlantType,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Time, Slot::ValueType, Slot::Location, Slot::PlantType];

    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Time => "time",
            Slot::ValueType => "value_type",
            Slot::Location => "location",
            Slot::PlantType => "plant_type",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracted slots; each one independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBag {
    pub time: Option<String>,
    pub value_type: Option<String>,
    pub location: Option<String>,
    pub plant_type: Option<String>,
}

impl EntityBag {
    pub fn get(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Time => self.time.as_deref(),
            Slot::ValueType => self.value_type.as_deref(),
            Slot::Location => self.location.as_deref(),
            Slot::PlantType => self.plant_type.as_deref(),
        }
    }

    pub fn set(&mut self, slot: Slot, value: Option<String>) {
        match slot {
            Slot::Time => self.time = value,
            Slot::ValueType => self.value_type = value,
            Slot::Location => self.location = value,
            Slot::PlantType => self.plant_type = value,
        }
    }

    /// Builder-style setter, mostly for tests and fixtures.
    pub fn with(mut self, slot: Slot, value: &str) -> Self {
        self.set(slot, Some(value.to_string()));
        self
    }

    /// Non-null slots in declaration order.
    pub fn filled(&self) -> impl Iterator<Item = (Slot, &str)> {
        Slot::ALL
            .into_iter()
            .filter_map(move |slot| self.get(slot).map(|v| (slot, v)))
    }

    /// The required slot of `intent` that is missing, if any.
    pub fn first_missing(&self, intent: Intent) -> Option<Slot> {
        intent
            .required_slots()
            .iter()
            .copied()
            .find(|slot| self.get(*slot).is_none())
    }
}

/// Concrete table/column identifiers resolved from the knowledge graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBinding {
    pub table_name: String,
    pub column_name: String,
    pub location: Option<String>,
}

/// Verdict returned to the search driver for one candidate thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThoughtValidity {
    ValidIntermediate,
    ValidFinal,
    Invalid,
}
