//! Tests for models module

mod common;

use proptest::prelude::*;
use trendscout::models::{normalize_keyword, CollectionMode, Observation, ObservationSet, Source};

#[test]
fn test_observation_id_is_stable() {
    let a = common::observation("Soy  Candle", Source::Etsy, 10.0, common::now(), 1);
    let b = common::observation("soy candle", Source::Etsy, 99.0, common::now(), 1);

    // the metric value is not part of the identity
    assert_eq!(a.id(), b.id());
    assert_eq!(a.id().len(), 32);
}

#[test]
fn test_observation_id_differs_by_source_and_time() {
    let base = common::observation("soy candle", Source::Etsy, 10.0, common::now(), 1);
    let other_source = common::observation("soy candle", Source::Reddit, 10.0, common::now(), 1);
    let other_time = common::observation("soy candle", Source::Etsy, 10.0, common::now(), 2);

    assert_ne!(base.id(), other_source.id());
    assert_ne!(base.id(), other_time.id());
}

#[test]
fn test_validation() {
    let now = common::now();
    assert!(Observation::new("mug", Source::Amazon, 0.0, now).validate().is_ok());
    assert!(Observation::new("   ", Source::Amazon, 1.0, now).validate().is_err());
    assert!(Observation::new("mug", Source::Amazon, -1.0, now).validate().is_err());
    assert!(Observation::new("mug", Source::Amazon, f64::NAN, now).validate().is_err());
}

#[test]
fn test_source_and_mode_parsing() {
    assert_eq!(Source::parse("Google"), Some(Source::GoogleTrends));
    assert_eq!(Source::parse(" x "), Some(Source::Twitter));
    assert_eq!(Source::parse("myspace"), None);
    assert_eq!(CollectionMode::parse("WEEK"), Some(CollectionMode::Weekly));
    assert_eq!(CollectionMode::Weekly.lookback_hours(), 168);
}

#[test]
fn test_observation_set_serializes_per_source_map() {
    let mut set = ObservationSet::new(CollectionMode::Daily, common::now());
    set.per_source.insert(Source::Etsy, Default::default());

    let json = serde_json::to_value(&set).unwrap();
    assert!(json["per_source"]["etsy"].is_object());
    assert_eq!(json["mode"], "daily");
}

proptest! {
    #[test]
    fn prop_normalize_keyword_is_idempotent(raw in "[ a-zA-Z0-9\\t]{0,40}") {
        let once = normalize_keyword(&raw);
        prop_assert_eq!(normalize_keyword(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }
}
