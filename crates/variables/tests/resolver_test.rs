use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rigger_core::{Error, Result, Scope};
use rigger_secrets::{SecretBackend, SecretOptions};
use rigger_variables::{VariableDescriptor, VariableResolver};
use serde_json::{json, Value};
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Backend serving fixed values; unknown keys fail
struct FixedSecrets {
    values: HashMap<&'static str, &'static str>,
    delay: Duration,
}

impl FixedSecrets {
    fn new(values: &[(&'static str, &'static str)]) -> Arc<Self> {
        Arc::new(Self {
            values: values.iter().copied().collect(),
            delay: Duration::ZERO,
        })
    }
}

#[async_trait]
impl SecretBackend for FixedSecrets {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn resolve(&self, key: &str, _: &SecretOptions) -> Result<Option<String>> {
        tokio::time::sleep(self.delay).await;
        self.values
            .get(key)
            .map(|value| Some(value.to_string()))
            .ok_or_else(|| Error::secret_resolution(key, "vault is sealed"))
    }

    async fn save(&self, _: &str, _: &str, _: &SecretOptions) -> Result<bool> {
        Ok(false)
    }
}

fn scope(value: Value) -> Scope {
    match value {
        Value::Object(map) => Scope::from_map(map),
        _ => Scope::new(),
    }
}

#[tokio::test]
async fn test_values_and_references() {
    let resolver = VariableResolver::new(FixedSecrets::new(&[]));
    let descriptors = vec![
        VariableDescriptor::value("a", 1),
        VariableDescriptor::reference("b", "x"),
    ];

    let resolved = resolver
        .process(&descriptors, &scope(json!({ "x": 42 })))
        .await
        .unwrap();

    assert_eq!(Value::Object(resolved.values), json!({ "a": 1, "b": 42 }));
}

#[tokio::test]
async fn test_failing_secret_degrades_to_default() {
    let resolver = VariableResolver::new(FixedSecrets::new(&[("db", "hunter2")]));
    let descriptors = vec![
        VariableDescriptor::secret("password", "db"),
        VariableDescriptor::secret("token", "missing").with_default("fallback"),
        VariableDescriptor::protected("api_key", "also-missing"),
    ];

    let resolved = resolver.process(&descriptors, &Scope::new()).await.unwrap();

    assert_eq!(resolved.get("password"), Some(&json!("hunter2")));
    assert_eq!(resolved.get("token"), Some(&json!("fallback")));
    assert_eq!(resolved.get("api_key"), None);
    assert!(resolved.is_secret("password"));
    assert!(!resolved.is_secret("token"));
    assert_eq!(resolved.redacted()["password"], json!("***"));
}

#[tokio::test]
#[serial]
async fn test_environment_reads_with_default() {
    std::env::set_var("RIGGER_TEST_REGION", "eu-west-1");
    std::env::remove_var("RIGGER_TEST_UNSET");

    let resolver = VariableResolver::new(FixedSecrets::new(&[]));
    let descriptors = vec![
        VariableDescriptor::environment("region", "RIGGER_TEST_REGION"),
        VariableDescriptor::environment("zone", "RIGGER_TEST_UNSET").with_default("a"),
        // no value: the name is the variable
        serde_json::from_value(json!({ "name": "RIGGER_TEST_REGION", "type": "environment" }))
            .unwrap(),
    ];

    let resolved = resolver.process(&descriptors, &Scope::new()).await.unwrap();
    std::env::remove_var("RIGGER_TEST_REGION");

    assert_eq!(resolved.get("region"), Some(&json!("eu-west-1")));
    assert_eq!(resolved.get("zone"), Some(&json!("a")));
    assert_eq!(resolved.get("RIGGER_TEST_REGION"), Some(&json!("eu-west-1")));
}

#[tokio::test]
async fn test_dotted_references_reach_nested_outputs() {
    let resolver = VariableResolver::new(FixedSecrets::new(&[]));
    let descriptors = vec![
        VariableDescriptor::reference("host", "db.host"),
        VariableDescriptor::reference("first_node", "nodes.0"),
        VariableDescriptor::reference("port", "db.port").with_default(5432),
    ];

    let resolved = resolver
        .process(
            &descriptors,
            &scope(json!({ "db": { "host": "10.0.0.5" }, "nodes": ["n1", "n2"] })),
        )
        .await
        .unwrap();

    assert_eq!(resolved.get("host"), Some(&json!("10.0.0.5")));
    assert_eq!(resolved.get("first_node"), Some(&json!("n1")));
    assert_eq!(resolved.get("port"), Some(&json!(5432)));
}

#[tokio::test]
async fn test_last_write_wins_in_input_order() {
    let resolver = VariableResolver::new(Arc::new(FixedSecrets {
        values: [("slow", "from-secret")].into_iter().collect(),
        delay: Duration::from_millis(20),
    }));
    let descriptors = vec![
        VariableDescriptor::secret("target", "slow"),
        VariableDescriptor::value("target", "literal"),
    ];

    let resolved = resolver.process(&descriptors, &Scope::new()).await.unwrap();

    assert_eq!(resolved.get("target"), Some(&json!("literal")));
    assert!(!resolved.is_secret("target"));
}

#[tokio::test]
async fn test_non_string_source_is_configuration_error() {
    let resolver = VariableResolver::new(FixedSecrets::new(&[]));
    let descriptor: VariableDescriptor =
        serde_json::from_value(json!({ "name": "x", "type": "reference", "value": 7 })).unwrap();

    let err = resolver.process(&[descriptor], &Scope::new()).await.unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
}
