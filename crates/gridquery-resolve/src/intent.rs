//! Intent classification: ordered `(pattern, intent)` rules, first match wins.

use crate::Intent;
use regex::Regex;

/// Deployed rule table. Groups are listed in priority order and patterns
/// within a group in declaration order.
const DEFAULT_RULES: &[(Intent, &str)] = &[
    (Intent::CalculationPoint, r".*系统负荷最高值.*"),
    (Intent::CalculationPoint, r".*系统最高负荷.*"),
    (Intent::PlanComparison, r".*负荷比预测值.*"),
    (Intent::PlanComparison, r".*比预测值.*"),
    (Intent::StationInfo, r".*装机容量.*"),
    (Intent::StationInfo, r".*利用小时数.*"),
    (Intent::StationInfo, r".*发电量.*"),
];

struct IntentRule {
    intent: Intent,
    regex: Regex,
}

pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::from_rules(DEFAULT_RULES).expect("built-in intent patterns compile")
    }

    /// Build from an explicit rule list. Rules are evaluated in the given
    /// order; each pattern must match the whole text.
    pub fn from_rules(rules: &[(Intent, &str)]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(intent, pattern)| {
                Ok(IntentRule {
                    intent: *intent,
                    regex: Regex::new(&format!("^(?:{pattern})$"))?,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn classify(&self, text: &str) -> Option<Intent> {
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(text))
            .map(|rule| rule.intent)
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}
