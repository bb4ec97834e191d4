//! Entity extraction and validation.
//!
//! Extraction runs four unrelated patterns over the question text and keeps
//! the first match of each. Validation is a separate, all-or-nothing gate
//! against the [`KnownEntities`] snapshot taken from the knowledge graph.

use crate::error::{ResolveError, StoreError};
use crate::graph::GraphStore;
use crate::{EntityBag, Slot};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// Extraction
// ============================================================================

/// Deployed slot patterns. Value types list longer names before their
/// suffixes so `系统负荷` is not cut down to `负荷`.
const DEFAULT_PATTERNS: &[(Slot, &str)] = &[
    (Slot::Time, r"\d{4}-\d{2}-\d{2}|今天|昨天|本月|上月"),
    (
        Slot::ValueType,
        r"系统负荷|地调负荷|分布式光伏出力|负荷|发电量|装机容量|利用小时数",
    ),
    (
        Slot::Location,
        r"[\p{Han}&&[^省]]+省|[\p{Han}&&[^市]]+市|[\p{Han}&&[^区]]+区",
    ),
    (Slot::PlantType, r"煤电|燃气|水电|风电|核电"),
];

struct SlotPattern {
    slot: Slot,
    regex: Regex,
}

pub struct EntityExtractor {
    patterns: Vec<SlotPattern>,
}

impl EntityExtractor {
    pub fn new() -> Self {
        Self::from_patterns(DEFAULT_PATTERNS).expect("built-in slot patterns compile")
    }

    pub fn from_patterns(patterns: &[(Slot, &str)]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|(slot, pattern)| {
                Ok(SlotPattern {
                    slot: *slot,
                    regex: Regex::new(pattern)?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { patterns })
    }

    /// Fill every slot whose pattern matches; the rest stay `None`.
    pub fn extract(&self, text: &str) -> EntityBag {
        let mut bag = EntityBag::default();
        for pattern in &self.patterns {
            if bag.get(pattern.slot).is_some() {
                continue;
            }
            if let Some(m) = pattern.regex.find(text) {
                bag.set(pattern.slot, Some(m.as_str().to_string()));
            }
        }
        bag
    }
}

impl Default for EntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Known entities
// ============================================================================

/// Read-only snapshot of entity names known to the knowledge graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownEntities {
    names: BTreeSet<String>,
}

impl KnownEntities {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Take a snapshot from the graph store. Later changes to the store are
    /// not observed by this value.
    pub fn load(graph: &dyn GraphStore) -> Result<Self, StoreError> {
        Ok(Self {
            names: graph.list_known_entity_names()?,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

// ============================================================================
// Validation
// ============================================================================

#[derive(Debug, Clone)]
pub struct EntityValidator {
    known: Arc<KnownEntities>,
}

impl EntityValidator {
    pub fn new(known: Arc<KnownEntities>) -> Self {
        Self { known }
    }

    /// Every non-null slot must be a known entity, verbatim. The first
    /// offending slot rejects the whole bag.
    pub fn validate(&self, bag: &EntityBag) -> Result<(), ResolveError> {
        match bag.filled().find(|(_, value)| !self.known.contains(value)) {
            Some((slot, value)) => Err(ResolveError::EntityValidation {
                slot,
                value: value.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn accepts(&self, bag: &EntityBag) -> bool {
        self.validate(bag).is_ok()
    }

    pub fn known(&self) -> &KnownEntities {
        &self.known
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_calculation_point_slots() {
        let bag = EntityExtractor::new().extract("今天系统负荷最高值是多少？");
        assert_eq!(bag.time.as_deref(), Some("今天"));
        assert_eq!(bag.value_type.as_deref(), Some("系统负荷"));
        assert_eq!(bag.location, None);
        assert_eq!(bag.plant_type, None);
    }

    #[test]
    fn extracts_station_info_slots() {
        let bag = EntityExtractor::new().extract("广东省内煤电装机容量是多少？");
        assert_eq!(bag.time, None);
        assert_eq!(bag.value_type.as_deref(), Some("装机容量"));
        assert_eq!(bag.location.as_deref(), Some("广东省"));
        assert_eq!(bag.plant_type.as_deref(), Some("煤电"));
    }

    #[test]
    fn first_match_per_slot() {
        let bag = EntityExtractor::new().extract("2024-03-20和2024-03-21的负荷");
        assert_eq!(bag.time.as_deref(), Some("2024-03-20"));
        assert_eq!(bag.value_type.as_deref(), Some("负荷"));
    }

    #[test]
    fn location_alternatives() {
        let ex = EntityExtractor::new();
        assert_eq!(ex.extract("广州市天河区").location.as_deref(), Some("广州市"));
        assert_eq!(ex.extract("天河区负荷").location.as_deref(), Some("天河区"));
        assert_eq!(ex.extract("ABC广东省").location.as_deref(), Some("广东省"));
    }

    #[test]
    fn validator_accepts_known_slots() {
        let known = Arc::new(KnownEntities::new(["广东省", "煤电", "装机容量"]));
        let bag = EntityBag::default()
            .with(Slot::Location, "广东省")
            .with(Slot::PlantType, "煤电")
            .with(Slot::ValueType, "装机容量");
        assert!(EntityValidator::new(known).accepts(&bag));
    }

    #[test]
    fn validator_rejects_whole_bag_on_one_unknown() {
        let known = Arc::new(KnownEntities::new(["今天", "系统负荷"]));
        let bag = EntityBag::default()
            .with(Slot::Time, "今天")
            .with(Slot::ValueType, "系统负荷")
            .with(Slot::Location, "火星");
        let err = EntityValidator::new(known).validate(&bag).unwrap_err();
        assert_eq!(
            err,
            ResolveError::EntityValidation {
                slot: Slot::Location,
                value: "火星".to_string()
            }
        );
    }

    #[test]
    fn empty_bag_passes_validation() {
        let validator = EntityValidator::new(Arc::new(KnownEntities::default()));
        assert!(validator.accepts(&EntityBag::default()));
    }
}
