//! Generated instances are checked against an independent validator.

use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use proptest::prelude::*;
use serde_json::{Value, json};

use jsonalchemy_core::SchemaNode;
use jsonalchemy_generate::{GenerateOptions, GenerationSession, Seed};

fn load_fixture(name: &str) -> Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing json at {}", path.display()));
    serde_json::from_str(&contents).expect("parse json")
}

fn session() -> GenerationSession {
    GenerationSession::new(GenerateOptions::default()).expect("default options")
}

fn assert_conforms(schema: &Value, seeds: std::ops::Range<u64>) {
    let validator = JSONSchema::compile(schema).expect("schema compiles");
    let root = SchemaNode::root(schema.clone());
    let session = session();
    for seed in seeds {
        let outcome = session
            .generate(&root, Some(Seed::Number(seed)))
            .unwrap_or_else(|err| panic!("seed {seed}: {err}"));
        if let Err(errors) = validator.validate(&outcome.value) {
            let messages: Vec<String> = errors.map(|error| error.to_string()).collect();
            panic!(
                "seed {seed} produced an invalid instance {}: {messages:?}",
                outcome.value
            );
        }
    }
}

#[test]
fn catalog_fixture_conforms() {
    assert_conforms(&load_fixture("catalog.schema.json"), 0..60);
}

#[test]
fn numeric_keywords_conform() {
    assert_conforms(
        &json!({
            "type": "object",
            "required": ["stepped", "half", "open", "legacy"],
            "properties": {
                "stepped": {"type": "integer", "minimum": -50, "maximum": 50, "multipleOf": 7},
                "half": {"type": "number", "minimum": 1, "maximum": 3, "multipleOf": 0.5},
                "open": {"type": "number", "exclusiveMinimum": -1, "exclusiveMaximum": 1},
                "legacy": {"type": "integer", "exclusiveMinimum": 10}
            }
        }),
        0..40,
    );
}

#[test]
fn combinators_conform() {
    assert_conforms(
        &json!({
            "definitions": {
                "named": {
                    "type": "object",
                    "required": ["label"],
                    "properties": {"label": {"type": "string", "minLength": 2, "maxLength": 8}}
                }
            },
            "allOf": [
                {"$ref": "#/definitions/named"},
                {
                    "required": ["size"],
                    "properties": {"size": {"enum": ["s", "m", "l", "xl"], "not": {"enum": ["xl"]}}}
                }
            ],
            "properties": {
                "value": {"oneOf": [
                    {"type": "string", "maxLength": 5},
                    {"type": "integer", "minimum": 10}
                ]},
                "either": {"anyOf": [{"type": "boolean"}, {"type": "null"}]}
            }
        }),
        0..60,
    );
}

#[test]
fn array_keywords_conform() {
    assert_conforms(
        &json!({
            "type": "object",
            "required": ["pair", "unique", "marked"],
            "properties": {
                "pair": {
                    "type": "array",
                    "items": [{"type": "string"}, {"type": "integer"}],
                    "additionalItems": false
                },
                "unique": {
                    "type": "array",
                    "minItems": 2,
                    "maxItems": 6,
                    "uniqueItems": true,
                    "items": {"type": "integer", "minimum": 0, "maximum": 1000}
                },
                "marked": {
                    "type": "array",
                    "contains": {"const": 42},
                    "items": {"type": "integer"}
                }
            }
        }),
        0..40,
    );
}

#[test]
fn object_keywords_conform() {
    assert_conforms(
        &json!({
            "type": "object",
            "required": ["headers", "names", "pair"],
            "properties": {
                "headers": {
                    "type": "object",
                    "maxProperties": 6,
                    "properties": {"a": {"type": "string"}, "b": {"type": "integer"}},
                    "dependencies": {"a": ["b"]},
                    "patternProperties": {"^x-[a-z]+$": {"type": "string", "maxLength": 10}},
                    "additionalProperties": false
                },
                "names": {
                    "type": "object",
                    "minProperties": 2,
                    "propertyNames": {"pattern": "^[a-z]{3,6}$"},
                    "additionalProperties": {"type": "integer"}
                },
                "pair": {
                    "type": "object",
                    "minProperties": 2,
                    "maxProperties": 2,
                    "properties": {
                        "left": {"type": "integer"},
                        "right": {"type": "integer"},
                        "never": false
                    }
                }
            }
        }),
        0..60,
    );
}

#[test]
fn formats_conform() {
    assert_conforms(
        &json!({
            "type": "object",
            "required": ["email", "id", "day", "at", "host", "ip", "ip6", "site"],
            "properties": {
                "email": {"type": "string", "format": "email"},
                "id": {"type": "string", "format": "uuid"},
                "day": {"type": "string", "format": "date"},
                "at": {"type": "string", "format": "date-time"},
                "host": {"type": "string", "format": "hostname"},
                "ip": {"type": "string", "format": "ipv4"},
                "ip6": {"type": "string", "format": "ipv6"},
                "site": {"type": "string", "format": "uri"}
            }
        }),
        0..30,
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn integers_stay_within_bounds(lo in -10_000_i64..10_000, width in 0_i64..500, seed in any::<u64>()) {
        let schema = json!({"type": "integer", "minimum": lo, "maximum": lo + width});
        let value = session()
            .generate_value(schema, Some(Seed::Number(seed)))
            .expect("generate")
            .as_i64()
            .expect("integer");
        prop_assert!(value >= lo && value <= lo + width);
    }

    #[test]
    fn exclusive_numbers_stay_inside(lo in -1_000.0_f64..1_000.0, width in 0.001_f64..100.0, seed in any::<u64>()) {
        let schema = json!({"type": "number", "exclusiveMinimum": lo, "exclusiveMaximum": lo + width});
        let value = session()
            .generate_value(schema, Some(Seed::Number(seed)))
            .expect("generate")
            .as_f64()
            .expect("number");
        prop_assert!(value > lo && value < lo + width);
    }

    #[test]
    fn string_lengths_are_honoured(min in 0_usize..20, extra in 0_usize..20, seed in any::<u64>()) {
        let schema = json!({"type": "string", "minLength": min, "maxLength": min + extra});
        let value = session()
            .generate_value(schema, Some(Seed::Number(seed)))
            .expect("generate");
        let count = value.as_str().expect("string").chars().count();
        prop_assert!(count >= min && count <= min + extra);
    }

    #[test]
    fn tree_generation_is_deterministic(seed in any::<u64>()) {
        let root = SchemaNode::root(load_fixture("tree.schema.json"));
        let session = session();
        let first = session.generate(&root, Some(Seed::Number(seed))).expect("generate");
        let second = session.generate(&root, Some(Seed::Number(seed))).expect("generate");
        prop_assert_eq!(first.value, second.value);
    }
}
