//! Property-based tests for the resolution gates
//!
//! 1. Classification is deterministic and honours rule priority
//! 2. Validation is all-or-nothing over the bag
//! 3. Synthesis is pure and never splices entity values into query text

use chrono::NaiveDate;
use gridquery_resolve::time::TimeResolver;
use gridquery_resolve::*;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Strategies
// ============================================================================

fn filler_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9 ]{0,12}"
}

fn keyword_strategy() -> impl Strategy<Value = (&'static str, Intent)> {
    prop_oneof![
        Just(("系统负荷最高值", Intent::CalculationPoint)),
        Just(("系统最高负荷", Intent::CalculationPoint)),
        Just(("负荷比预测值", Intent::PlanComparison)),
        Just(("比预测值", Intent::PlanComparison)),
        Just(("装机容量", Intent::StationInfo)),
        Just(("利用小时数", Intent::StationInfo)),
        Just(("发电量", Intent::StationInfo)),
    ]
}

fn known_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("今天".to_string()),
        Just("系统负荷".to_string()),
        Just("广东省".to_string()),
        Just("煤电".to_string()),
    ]
}

fn unknown_name_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_map(|s| format!("未知{s}"))
}

fn slot_strategy() -> impl Strategy<Value = Slot> {
    prop_oneof![
        Just(Slot::Time),
        Just(Slot::ValueType),
        Just(Slot::Location),
        Just(Slot::PlantType),
    ]
}

fn known() -> Arc<KnownEntities> {
    Arc::new(KnownEntities::new(["今天", "系统负荷", "广东省", "煤电"]))
}

// ============================================================================
// Classification
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_keyword_determines_intent(
        prefix in filler_strategy(),
        suffix in filler_strategy(),
        (keyword, intent) in keyword_strategy(),
    ) {
        let classifier = IntentClassifier::new();
        let text = format!("{prefix}{keyword}{suffix}");
        let first = classifier.classify(&text);
        prop_assert_eq!(first, Some(intent));
        prop_assert_eq!(classifier.classify(&text), first);
    }

    #[test]
    fn prop_ascii_text_never_classifies(text in "[ -~]{0,40}") {
        prop_assert_eq!(IntentClassifier::new().classify(&text), None);
    }

    #[test]
    fn prop_calculation_point_outranks_others(suffix in filler_strategy()) {
        let text = format!("系统负荷最高值比预测值装机容量{suffix}");
        prop_assert_eq!(
            IntentClassifier::new().classify(&text),
            Some(Intent::CalculationPoint)
        );
    }
}

// ============================================================================
// Validation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_known_values_are_accepted(
        values in prop::collection::vec((slot_strategy(), known_name_strategy()), 0..4),
    ) {
        let mut bag = EntityBag::default();
        for (slot, value) in &values {
            bag.set(*slot, Some(value.clone()));
        }
        prop_assert!(EntityValidator::new(known()).accepts(&bag));
    }

    #[test]
    fn prop_one_unknown_value_rejects_the_bag(
        values in prop::collection::vec((slot_strategy(), known_name_strategy()), 0..4),
        bad_slot in slot_strategy(),
        bad_value in unknown_name_strategy(),
    ) {
        let mut bag = EntityBag::default();
        for (slot, value) in &values {
            bag.set(*slot, Some(value.clone()));
        }
        bag.set(bad_slot, Some(bad_value.clone()));

        let err = EntityValidator::new(known()).validate(&bag).unwrap_err();
        prop_assert_eq!(
            err,
            ResolveError::EntityValidation { slot: bad_slot, value: bad_value }
        );
    }
}

// ============================================================================
// Synthesis
// ============================================================================

fn synthesize(
    intent: Intent,
    bag: &EntityBag,
    binding: &SchemaBinding,
) -> Result<SqlQuery, ResolveError> {
    let config = ResolverConfig::default();
    let time = TimeResolver::new(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap());
    QuerySynthesizer::new(&config, time).synthesize(intent, bag, binding)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_synthesis_is_pure_and_parameterized(
        location in "[^`]{1,20}",
        plant_type in "[^`]{1,10}",
        day in 1u32..=28,
    ) {
        let bag = EntityBag::default()
            .with(Slot::Location, &location)
            .with(Slot::PlantType, &plant_type)
            .with(Slot::ValueType, "装机容量")
            .with(Slot::Time, &format!("2024-02-{day:02}"));
        let binding = SchemaBinding {
            table_name: "power_plant_info".to_string(),
            column_name: "装机容量".to_string(),
            location: None,
        };

        let a = synthesize(Intent::StationInfo, &bag, &binding).unwrap();
        let b = synthesize(Intent::StationInfo, &bag, &binding).unwrap();
        prop_assert_eq!(&a, &b);

        let upper = a.text().to_ascii_uppercase();
        prop_assert!(upper.starts_with("SELECT "));
        prop_assert!(upper.contains(" FROM "));
        prop_assert_eq!(a.params().len(), 4);
        prop_assert_eq!(&a.params()[0], &SqlValue::from(location.as_str()));
        prop_assert_eq!(&a.params()[1], &SqlValue::from(plant_type.as_str()));
        prop_assert!(gridquery_sql::QueryValidator::new().validate(&a).is_ok());
    }

    #[test]
    fn prop_every_intent_yields_a_select(
        (intent, value_type) in prop_oneof![
            Just((Intent::CalculationPoint, "系统负荷")),
            Just((Intent::PlanComparison, "系统负荷")),
            Just((Intent::StationInfo, "利用小时数")),
        ],
        time in prop_oneof![Just("今天"), Just("昨天"), Just("本月"), Just("上月")],
    ) {
        let bag = EntityBag::default()
            .with(Slot::Time, time)
            .with(Slot::ValueType, value_type)
            .with(Slot::Location, "广东省");
        let binding = SchemaBinding {
            table_name: "t".to_string(),
            column_name: value_type.to_string(),
            location: None,
        };
        let query = synthesize(intent, &bag, &binding).unwrap();
        prop_assert!(gridquery_sql::QueryValidator::new().strict(true).validate(&query).is_ok());
    }
}
