//! End-to-end engine tests through the public envelope.
//!
//! Drives the two-cycle protocol: a first invocation without candidates
//! that yields only the requirements manifest, then a second invocation
//! with the fetched candidates that yields the merged environment.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use envcompose::{run, FunctionRequest, ResourceSelector, Severity, ENVIRONMENT_CONTEXT_KEY};

/// The five-source declaration exercised throughout: two references, a
/// Multiple-mode literal selector, an optional field-path selector whose
/// path is absent, and a required field-path selector whose path resolves.
fn five_source_input() -> Value {
    json!({
        "spec": {
            "environmentConfigs": [
                {"type": "Reference", "ref": {"name": "my-env-config"}},
                {"type": "Reference", "ref": {"name": "my-second-env-config"}},
                {
                    "type": "Selector",
                    "selector": {
                        "mode": "Multiple",
                        "matchLabels": [{"type": "Value", "key": "foo", "value": "bar"}]
                    }
                },
                {
                    "type": "Selector",
                    "selector": {
                        "mode": "Single",
                        "matchLabels": [{
                            "key": "someMoreFoo",
                            "valueFromFieldPath": "spec.missingEnvSelectorLabel",
                            "fromFieldPathPolicy": "Optional"
                        }]
                    }
                },
                {
                    "type": "Selector",
                    "selector": {
                        "mode": "Single",
                        "matchLabels": [{
                            "key": "someMoreFoo",
                            "valueFromFieldPath": "spec.existingEnvSelectorLabel",
                            "fromFieldPathPolicy": "Required"
                        }]
                    }
                }
            ]
        }
    })
}

fn observed() -> Value {
    json!({
        "apiVersion": "test.envcompose.dev/v1alpha1",
        "kind": "XR",
        "metadata": {"name": "my-xr"},
        "spec": {"existingEnvSelectorLabel": "someMoreBar"}
    })
}

fn env_config(name: &str, data: Value) -> Value {
    json!({
        "apiVersion": "envcompose.dev/v1beta1",
        "kind": "EnvironmentConfig",
        "metadata": {"name": name},
        "data": data
    })
}

fn request(tag: &str, input: Value) -> FunctionRequest {
    serde_json::from_value(json!({
        "meta": {"tag": tag},
        "observed": observed(),
        "input": input
    }))
    .unwrap()
}

fn five_source_candidates() -> BTreeMap<String, Vec<Value>> {
    BTreeMap::from([
        (
            "environment-config-0".to_string(),
            vec![env_config(
                "my-env-config",
                json!({"firstKey": "firstVal", "secondKey": "secondVal"}),
            )],
        ),
        (
            "environment-config-1".to_string(),
            vec![env_config(
                "my-second-env-config",
                json!({"secondKey": "secondVal-ok", "thirdKey": "thirdVal"}),
            )],
        ),
        (
            "environment-config-2".to_string(),
            vec![
                env_config("my-third-env-config-b", json!({"fourthKey": "fourthVal-b"})),
                env_config("my-third-env-config-a", json!({"fourthKey": "fourthVal-a"})),
            ],
        ),
        (
            "environment-config-3".to_string(),
            vec![env_config("my-third-env-config", json!({"fifthKey": "fifthVal"}))],
        ),
        (
            "environment-config-4".to_string(),
            vec![env_config("my-fourth-env-config", json!({"sixthKey": "sixthVal"}))],
        ),
    ])
}

#[test]
fn manifest_cycle_requests_needed_configs() {
    let response = run(&request("hello", five_source_input()));

    assert!(!response.is_fatal(), "results: {:?}", response.results);
    assert_eq!(response.meta.tag, "hello");

    let expected = BTreeMap::from([
        (
            "environment-config-0".to_string(),
            ResourceSelector::by_name("my-env-config"),
        ),
        (
            "environment-config-1".to_string(),
            ResourceSelector::by_name("my-second-env-config"),
        ),
        (
            "environment-config-2".to_string(),
            ResourceSelector::by_labels(BTreeMap::from([("foo".to_string(), "bar".to_string())])),
        ),
        // environment-config-3 is not requested: its only matcher was
        // optional and the field path is absent.
        (
            "environment-config-4".to_string(),
            ResourceSelector::by_labels(BTreeMap::from([(
                "someMoreFoo".to_string(),
                "someMoreBar".to_string(),
            )])),
        ),
    ]);
    assert_eq!(response.requirements, expected);

    // No candidates were supplied, so no environment was computed.
    assert!(!response.context.contains_key(ENVIRONMENT_CONTEXT_KEY));
}

#[test]
fn merge_cycle_computes_environment() {
    let mut req = request("hello", five_source_input());
    req.extra_resources = Some(five_source_candidates());

    let response = run(&req);
    assert!(!response.is_fatal(), "results: {:?}", response.results);

    // The manifest is recomputed on every cycle.
    assert_eq!(response.requirements.len(), 4);

    let env = &response.context[ENVIRONMENT_CONTEXT_KEY];
    assert_eq!(
        env,
        &json!({
            "apiVersion": "internal.envcompose.dev/v1alpha1",
            "kind": "Environment",
            "firstKey": "firstVal",
            "secondKey": "secondVal-ok",
            "thirdKey": "thirdVal",
            // The Multiple-mode selector sorts by metadata.name, so the
            // "-b" document merges after (and over) the "-a" document.
            "fourthKey": "fourthVal-b",
            "fifthKey": "fifthVal",
            "sixthKey": "sixthVal"
        })
    );
}

#[test]
fn required_reference_not_found_is_fatal() {
    let mut req = request(
        "hello",
        json!({
            "spec": {"environmentConfigs": [{"type": "Reference", "ref": {"name": "my-env-config"}}]}
        }),
    );
    req.extra_resources = Some(BTreeMap::from([(
        "environment-config-0".to_string(),
        Vec::new(),
    )]));

    let response = run(&req);
    assert_eq!(response.results.len(), 1);
    assert_eq!(response.results[0].severity, Severity::Fatal);
    assert!(response.results[0].message.contains("my-env-config"));
    assert!(!response.context.contains_key(ENVIRONMENT_CONTEXT_KEY));
    // The manifest still reflects what was computed before the failure.
    assert_eq!(
        response.requirements["environment-config-0"],
        ResourceSelector::by_name("my-env-config")
    );
}

#[test]
fn optional_reference_not_found_contributes_nothing() {
    let mut req = request(
        "hello",
        json!({
            "spec": {
                "policy": {"resolution": "Optional"},
                "environmentConfigs": [
                    {"type": "Reference", "ref": {"name": "my-env-config"}},
                    {"type": "Reference", "ref": {"name": "present-config"}}
                ]
            }
        }),
    );
    req.extra_resources = Some(BTreeMap::from([
        ("environment-config-0".to_string(), Vec::new()),
        (
            "environment-config-1".to_string(),
            vec![env_config("present-config", json!({"onlyKey": "onlyVal"}))],
        ),
    ]));

    let response = run(&req);
    assert!(!response.is_fatal(), "results: {:?}", response.results);
    assert_eq!(
        response.context[ENVIRONMENT_CONTEXT_KEY]["onlyKey"],
        "onlyVal"
    );
}

#[test]
fn single_mode_selector_with_two_candidates_is_fatal() {
    let mut req = request(
        "hello",
        json!({
            "spec": {
                "environmentConfigs": [{
                    "type": "Selector",
                    "selector": {
                        "mode": "Single",
                        "matchLabels": [{"type": "Value", "key": "foo", "value": "bar"}]
                    }
                }]
            }
        }),
    );
    req.extra_resources = Some(BTreeMap::from([(
        "environment-config-0".to_string(),
        vec![
            env_config("a", json!({})),
            env_config("b", json!({})),
        ],
    )]));

    let response = run(&req);
    assert!(response.is_fatal());
    assert!(response.results[0].message.contains("exactly one"));
}

#[test]
fn sort_type_mismatch_is_fatal_with_both_types_named() {
    let mut req = request(
        "hello",
        json!({
            "spec": {
                "environmentConfigs": [{
                    "type": "Selector",
                    "selector": {
                        "mode": "Multiple",
                        "sortByFieldPath": "data.weight",
                        "matchLabels": [{"type": "Value", "key": "foo", "value": "bar"}]
                    }
                }]
            }
        }),
    );
    req.extra_resources = Some(BTreeMap::from([(
        "environment-config-0".to_string(),
        vec![
            env_config("a", json!({"weight": 10})),
            env_config("b", json!({"weight": "heavy"})),
        ],
    )]));

    let response = run(&req);
    assert!(response.is_fatal());
    let message = &response.results[0].message;
    assert!(message.contains("integer"), "message: {message}");
    assert!(message.contains("string"), "message: {message}");
}

#[test]
fn missing_candidate_entry_is_fatal() {
    let mut req = request(
        "hello",
        json!({
            "spec": {"environmentConfigs": [{"type": "Reference", "ref": {"name": "a"}}]}
        }),
    );
    // A fetch cycle ran, but the fetcher ignored the manifest entirely.
    req.extra_resources = Some(BTreeMap::new());

    let response = run(&req);
    assert!(response.is_fatal());
    assert!(response.results[0]
        .message
        .contains("environment-config-0"));
}

#[test]
fn context_bag_passes_through_unrelated_keys() {
    let mut req = request(
        "hello",
        json!({
            "spec": {"environmentConfigs": [{"type": "Reference", "ref": {"name": "a"}}]}
        }),
    );
    req.context
        .insert("other.dev/stage".to_string(), json!({"step": 3}));
    req.extra_resources = Some(BTreeMap::from([(
        "environment-config-0".to_string(),
        vec![env_config("a", json!({"k": "v"}))],
    )]));

    let response = run(&req);
    assert!(!response.is_fatal());
    assert_eq!(response.context["other.dev/stage"], json!({"step": 3}));
    assert_eq!(response.context[ENVIRONMENT_CONTEXT_KEY]["k"], "v");
}

#[test]
fn max_match_truncates_after_sorting() {
    let mut req = request(
        "hello",
        json!({
            "spec": {
                "environmentConfigs": [{
                    "type": "Selector",
                    "selector": {
                        "mode": "Multiple",
                        "maxMatch": 1,
                        "matchLabels": [{"type": "Value", "key": "foo", "value": "bar"}]
                    }
                }]
            }
        }),
    );
    req.extra_resources = Some(BTreeMap::from([(
        "environment-config-0".to_string(),
        vec![
            env_config("cfg-c", json!({"pick": "c"})),
            env_config("cfg-a", json!({"pick": "a"})),
            env_config("cfg-b", json!({"pick": "b"})),
        ],
    )]));

    let response = run(&req);
    assert!(!response.is_fatal(), "results: {:?}", response.results);
    assert_eq!(response.context[ENVIRONMENT_CONTEXT_KEY]["pick"], "a");
}

#[test]
fn min_match_violation_is_fatal() {
    let mut req = request(
        "hello",
        json!({
            "spec": {
                "environmentConfigs": [{
                    "type": "Selector",
                    "selector": {
                        "mode": "Multiple",
                        "minMatch": 2,
                        "matchLabels": [{"type": "Value", "key": "foo", "value": "bar"}]
                    }
                }]
            }
        }),
    );
    req.extra_resources = Some(BTreeMap::from([(
        "environment-config-0".to_string(),
        vec![env_config("only", json!({}))],
    )]));

    let response = run(&req);
    assert!(response.is_fatal());
    assert!(response.results[0].message.contains("at least 2"));
}
