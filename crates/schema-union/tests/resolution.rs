//! End-to-end resolution scenarios.
//!
//! Payloads here are JSON values and a hand-written union enum, so the
//! engine is exercised without any byte encoding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use schema_union::{
    converter, ConversionError, RegistryError, ResolveError, Resolver, ResolverConfig,
    SchemaVersion, TaggedMessage, VersionEntry, VersionRegistry,
};
use serde_json::{json, Value};

fn v(n: u32) -> SchemaVersion {
    SchemaVersion::new(n).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn scale_n(f: impl Fn(i64) -> i64 + Send + Sync) -> impl schema_union::Converter<Value> {
    move |mut value: Value| -> Result<Value, ConversionError> {
        let n = value["n"]
            .as_i64()
            .ok_or_else(|| ConversionError::new("`n` is not an integer"))?;
        value["n"] = json!(f(n));
        Ok(value)
    }
}

fn double_then_increment() -> Resolver<Value> {
    init_tracing();
    let registry = VersionRegistry::from_table([
        VersionEntry::new(v(1), scale_n(|n| n * 2)),
        VersionEntry::new(v(2), scale_n(|n| n + 1)),
        VersionEntry::latest(v(3)),
    ])
    .unwrap();
    Resolver::new(registry).unwrap()
}

#[test]
fn doubling_then_increment_scenario() {
    let resolver = double_then_increment();

    let from_v1 = resolver.resolve(TaggedMessage::new(v(1), json!({ "n": 5 })));
    assert_eq!(from_v1.unwrap(), TaggedMessage::new(v(3), json!({ "n": 11 })));

    let from_v2 = resolver.resolve(TaggedMessage::new(v(2), json!({ "n": 5 })));
    assert_eq!(from_v2.unwrap(), TaggedMessage::new(v(3), json!({ "n": 6 })));

    let from_v3 = resolver.resolve(TaggedMessage::new(v(3), json!({ "n": 5 })));
    assert_eq!(from_v3.unwrap(), TaggedMessage::new(v(3), json!({ "n": 5 })));
}

#[test]
fn markers_apply_in_order_and_completely() {
    let mut registry = VersionRegistry::with_versions(4);
    for (from, tag) in [(1, "a"), (2, "b"), (3, "c")] {
        registry
            .register_converter(
                v(from),
                v(from + 1),
                converter::pure(move |mut value: Value| {
                    value["trail"]
                        .as_array_mut()
                        .expect("trail is an array")
                        .push(json!(tag));
                    value
                }),
            )
            .unwrap();
    }
    let resolver = Resolver::new(registry).unwrap();

    let expected = [
        (1, vec!["a", "b", "c"]),
        (2, vec!["b", "c"]),
        (3, vec!["c"]),
        (4, vec![]),
    ];
    for (from, trail) in expected {
        let out = resolver
            .resolve_payload(v(from), json!({ "trail": [] }))
            .unwrap();
        assert_eq!(out, json!({ "trail": trail }), "starting from v{from}");
    }
}

#[test]
fn future_versions_are_rejected() {
    let resolver = double_then_increment();
    for future in [4, 5, 1000] {
        let err = resolver
            .resolve(TaggedMessage::new(v(future), json!({ "n": 1 })))
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownVersion {
                version: v(future),
                oldest: v(1),
                latest: v(3),
            }
        );
    }
}

#[test]
fn failing_edge_is_atomic() {
    let registry = VersionRegistry::from_table([
        VersionEntry::new(v(1), scale_n(|n| n + 1)),
        VersionEntry::new(v(2), scale_n(|n| n + 1)),
        VersionEntry::new(v(3), scale_n(|n| n + 1)),
        VersionEntry::latest(v(4)),
    ])
    .unwrap();
    let resolver = Resolver::new(registry).unwrap();

    // Without `n` the very first edge fails and nothing after it runs.
    let err = resolver
        .resolve_payload(v(1), json!({ "m": 1 }))
        .unwrap_err();
    assert_eq!(err.failed_edge(), Some((v(1), v(2))));

    let err = resolver
        .resolve_payload(v(2), json!({ "n": "two" }))
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::ConversionFailed {
            from: v(2),
            to: v(3),
            source: ConversionError::new("`n` is not an integer"),
        }
    );
}

#[test]
fn validate_twice_agrees() {
    let mut registry = VersionRegistry::<Value>::with_versions(3);
    registry
        .register_converter(v(1), v(2), scale_n(|n| n))
        .unwrap();

    let first = registry.validate();
    let second = registry.validate();
    assert_eq!(first, second);
    assert_eq!(
        first,
        Err(RegistryError::MissingConverter {
            from: v(2),
            to: v(3)
        })
    );
}

#[test]
fn independent_registries_do_not_interact() {
    let a = double_then_increment();
    let b = Resolver::new(VersionRegistry::<Value>::with_versions(1)).unwrap();

    assert_eq!(a.latest(), v(3));
    assert_eq!(b.latest(), v(1));
    assert!(b.resolve_payload(v(2), json!({})).is_err());
}

#[test]
fn config_floor_from_toml() {
    let config: ResolverConfig = toml::from_str("min_supported_version = 2").unwrap();
    let registry = VersionRegistry::from_table([
        VersionEntry::new(v(1), scale_n(|n| n * 2)),
        VersionEntry::new(v(2), scale_n(|n| n + 1)),
        VersionEntry::latest(v(3)),
    ])
    .unwrap();
    let resolver = Resolver::with_config(registry, config).unwrap();

    assert!(matches!(
        resolver.resolve_payload(v(1), json!({ "n": 5 })),
        Err(ResolveError::UnknownVersion { .. })
    ));
    assert_eq!(
        resolver.resolve_payload(v(2), json!({ "n": 5 })).unwrap(),
        json!({ "n": 6 })
    );
}

#[test]
fn tagged_message_json_shape() {
    let message: TaggedMessage<Value> =
        serde_json::from_str(r#"{"version": 2, "payload": {"n": 5}}"#).unwrap();
    assert_eq!(message.version, v(2));

    let resolved = double_then_increment().resolve(message).unwrap();
    assert_eq!(
        serde_json::to_value(&resolved).unwrap(),
        json!({ "version": 3, "payload": { "n": 6 } })
    );
}

#[test]
fn concurrent_readers_share_one_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut registry = VersionRegistry::with_versions(3);
    registry
        .register_converter(v(1), v(2), move |n: u64| -> Result<u64, ConversionError> {
            counter.fetch_add(1, Ordering::Relaxed);
            Ok(n * 2)
        })
        .unwrap();
    registry
        .register_converter(v(2), v(3), converter::pure(|n: u64| n + 1))
        .unwrap();
    let resolver = Resolver::new(registry).unwrap();

    let handles: Vec<_> = (0..8u64)
        .map(|worker| {
            let resolver = resolver.clone();
            thread::spawn(move || {
                (0..100u64)
                    .map(|i| {
                        let version = v(1 + ((worker + i) % 3) as u32);
                        let payload = resolver.resolve_payload(version, i).unwrap();
                        let expected = match version.get() {
                            1 => i * 2 + 1,
                            2 => i + 1,
                            _ => i,
                        };
                        assert_eq!(payload, expected);
                        u64::from(version.get() == 1)
                    })
                    .sum::<u64>()
            })
        })
        .collect();

    let from_v1: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(calls.load(Ordering::Relaxed) as u64, from_v1);
}

// ── A closed union enum as the payload ──────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Contact {
    V1 { name: String },
    V2 { first: String, last: String },
    V3 { first: String, last: String, emails: Vec<String> },
}

fn contact_resolver() -> Resolver<Contact> {
    let mut registry = VersionRegistry::with_versions(3);
    registry
        .register_converter(v(1), v(2), |c: Contact| match c {
            Contact::V1 { name } => {
                let (first, last) = name.split_once(' ').unwrap_or((name.as_str(), ""));
                Ok(Contact::V2 {
                    first: first.to_string(),
                    last: last.to_string(),
                })
            }
            other => Err(ConversionError::new(format!("expected V1, got {other:?}"))),
        })
        .unwrap();
    registry
        .register_converter(v(2), v(3), |c: Contact| match c {
            Contact::V2 { first, last } => Ok(Contact::V3 {
                first,
                last,
                emails: Vec::new(),
            }),
            other => Err(ConversionError::new(format!("expected V2, got {other:?}"))),
        })
        .unwrap();
    Resolver::new(registry).unwrap()
}

#[test]
fn union_enum_resolves_to_latest_arm() {
    let resolver = contact_resolver();
    let latest = resolver
        .resolve_payload(
            v(1),
            Contact::V1 {
                name: "Ada Lovelace".into(),
            },
        )
        .unwrap();
    assert_eq!(
        latest,
        Contact::V3 {
            first: "Ada".into(),
            last: "Lovelace".into(),
            emails: vec![],
        }
    );
}

#[test]
fn union_enum_mismatched_tag_fails() {
    let resolver = contact_resolver();
    let err = resolver
        .resolve_payload(
            v(1),
            Contact::V2 {
                first: "a".into(),
                last: "b".into(),
            },
        )
        .unwrap_err();
    assert_eq!(err.failed_edge(), Some((v(1), v(2))));
}
