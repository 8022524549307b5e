//! Property checks for the predicate filter engine and normalizer.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};
use swim_purge::{normalize, FilterSpec, ImageRecord, Predicate};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

fn word() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["cat9k", "CAT9K", "isr4k", "asr1k", "iosxe", "smu", "", "17.9.4a"])
        .prop_map(str::to_string)
}

fn record() -> impl Strategy<Value = ImageRecord> {
    (
        word(),
        word(),
        word(),
        word(),
        any::<bool>(),
        0u64..3,
        prop::option::of(0i64..400),
    )
        .prop_map(|(name, version, family, ty, golden, used, age)| {
            let mut r = ImageRecord::new("id")
                .with_name(name)
                .with_version(version)
                .with_family(family)
                .with_type(ty)
                .with_golden(golden)
                .with_used_devices(used);
            r.created_at = age.map(|days| now() - Duration::days(days));
            r
        })
}

/// At most one predicate of each kind, in generation order.
fn predicates() -> impl Strategy<Value = Vec<Predicate>> {
    let pattern = prop::sample::select(vec!["^cat", "9k", r"\.4a$", "iso?x"]);
    (
        prop::option::of(word()),
        prop::option::of(word()),
        prop::option::of(word()),
        prop::option::of(pattern.clone()),
        prop::option::of(word()),
        prop::option::of(pattern),
        prop::option::of(any::<bool>()),
        prop::option::of(0u32..365),
        any::<bool>(),
    )
        .prop_map(|(fam, ty, name, name_re, ver, ver_re, golden, age, unused)| {
            let mut spec = FilterSpec::new();
            if let Some(v) = fam {
                spec = spec.family(&v);
            }
            if let Some(v) = ty {
                spec = spec.image_type(&v);
            }
            if let Some(v) = name {
                spec = spec.name_contains(&v);
            }
            if let Some(p) = name_re {
                spec = spec.name_regex(p).unwrap();
            }
            if let Some(v) = ver {
                spec = spec.version(&v);
            }
            if let Some(p) = ver_re {
                spec = spec.version_regex(p).unwrap();
            }
            if let Some(g) = golden {
                spec = spec.golden(g);
            }
            if let Some(d) = age {
                spec = spec.older_than_days(d);
            }
            if unused {
                spec = spec.unused_only();
            }
            spec.predicates().to_vec()
        })
}

fn build(preds: impl IntoIterator<Item = Predicate>) -> FilterSpec {
    preds.into_iter().fold(FilterSpec::new(), FilterSpec::with)
}

proptest! {
    #[test]
    fn empty_spec_matches_everything(r in record()) {
        prop_assert!(FilterSpec::new().matches_at(&r, now()));
    }

    #[test]
    fn predicate_order_does_not_change_selection(
        preds in predicates(),
        rotation in 0usize..9,
        r in record(),
    ) {
        let forward = build(preds.clone());
        let mut rotated = preds.clone();
        if !rotated.is_empty() {
            let k = rotation % rotated.len();
            rotated.rotate_left(k);
        }
        let reversed = build(preds.into_iter().rev());
        let rotated = build(rotated);

        let expected = forward.matches_at(&r, now());
        prop_assert_eq!(rotated.matches_at(&r, now()), expected);
        prop_assert_eq!(reversed.matches_at(&r, now()), expected);
    }

    #[test]
    fn family_mismatch_always_excludes(preds in predicates(), r in record()) {
        prop_assume!(!r.family.to_lowercase().contains("asr"));
        let spec = build(preds.into_iter().filter(|p| !matches!(p, Predicate::FamilyContains(_))))
            .family("ASR");
        prop_assert!(!spec.matches_at(&r, now()));
    }

    #[test]
    fn unknown_age_is_never_excluded(days in 0u32..10_000, r in record()) {
        let mut r = r;
        r.created_at = None;
        prop_assert!(FilterSpec::new().older_than_days(days).matches_at(&r, now()));
    }

    #[test]
    fn unparsable_usage_reads_as_unused(
        key in prop::sample::select(vec!["usedDevicesCount", "usingDeviceCount", "deviceCount"]),
        junk in prop_oneof![
            Just(Value::Null),
            Just(json!("")),
            Just(json!("several")),
            Just(json!([1, 2, 3])),
            Just(json!({"count": 4})),
            Just(json!(-5)),
        ],
    ) {
        let mut raw = json!({"imageUuid": "x"}).as_object().cloned().unwrap();
        raw.insert(key.to_string(), junk);
        let r = normalize(&raw);
        prop_assert_eq!(r.used_device_count, 0);
        prop_assert!(FilterSpec::new().unused_only().matches_at(&r, now()));
    }

    #[test]
    fn unparsable_timestamp_passes_age_filter(
        junk in "[a-z ]{0,12}",
        days in 0u32..1000,
    ) {
        let raw = json!({"imageUuid": "x", "createdTime": junk}).as_object().cloned().unwrap();
        let r = normalize(&raw);
        prop_assert!(r.created_at.is_none());
        prop_assert!(FilterSpec::new().older_than_days(days).matches_at(&r, now()));
    }
}
