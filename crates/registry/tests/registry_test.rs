use pretty_assertions::assert_eq;
use rigger_core::Error;
use rigger_registry::{
    Catalog, Construction, Descriptor, DescriptorSpecs, Factory, Instance, ModuleFormat, Registry,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Debug, Clone)]
struct Bucket {
    name: String,
    region: String,
}

fn bucket_factory() -> Factory {
    Factory::of("Bucket", |c: Construction| {
        Ok(Arc::new(Bucket {
            name: c.arg(0)?,
            region: c.dependencies.get::<Value>("region")?.as_str().unwrap_or_default().to_string(),
        }))
    })
}

fn counting_factory(name: &str, counter: Arc<AtomicUsize>) -> Factory {
    Factory::of(name, move |_: Construction| Ok(counter.fetch_add(1, Ordering::SeqCst)))
}

#[tokio::test]
async fn test_args_and_dependencies_reach_the_factory() {
    let registry = Registry::new();
    registry
        .register_one(
            Descriptor::class(bucket_factory())
                .with_args([json!("logs")])
                .with_dependency(Descriptor::value("region", json!("eu-west-1"))),
        )
        .unwrap();

    let bucket: Arc<Bucket> = registry.resolve("Bucket").await.unwrap();
    assert_eq!(bucket.name, "logs");
    assert_eq!(bucket.region, "eu-west-1");
    // nested dependency was registered on its own
    assert!(registry.contains("region"));
}

#[tokio::test]
async fn test_registering_twice_keeps_the_first_descriptor() {
    let registry = Registry::new();
    registry.register_value("region", json!("first")).unwrap();
    registry.register_value("region", json!("second")).unwrap();

    assert_eq!(registry.stats().descriptors, 1);
    let region: Value = registry.resolve("region").await.unwrap();
    assert_eq!(region, json!("first"));
}

#[tokio::test]
async fn test_singleton_and_transient_lifetimes() {
    let built = Arc::new(AtomicUsize::new(0));
    let catalog = Catalog::new()
        .with(counting_factory("Shared", built.clone()))
        .with(counting_factory("Fresh", built.clone()));
    let registry = Registry::with_catalog(catalog);
    registry
        .register([
            Descriptor::export("Shared"),
            Descriptor::export("Fresh").transient(),
        ])
        .unwrap();

    let a = registry.resolve_instance("Shared").await.unwrap();
    let b = registry.resolve_instance("Shared").await.unwrap();
    assert!(a.ptr_eq(&b));

    let c = registry.resolve_instance("Fresh").await.unwrap();
    let d = registry.resolve_instance("Fresh").await.unwrap();
    assert!(!c.ptr_eq(&d));

    assert_eq!(built.load(Ordering::SeqCst), 3);
    assert_eq!(registry.stats().singletons, 1);
}

#[tokio::test]
async fn test_scoped_instances_are_per_scope() {
    let catalog = Catalog::new().with(counting_factory("Session", Arc::new(AtomicUsize::new(0))));
    let registry = Registry::with_catalog(catalog);
    registry.register_one(Descriptor::export("Session").scoped()).unwrap();

    let first = registry.scope();
    let second = registry.scope();

    let a = first.resolve_instance("Session").await.unwrap();
    let b = first.resolve_instance("Session").await.unwrap();
    let c = second.resolve_instance("Session").await.unwrap();

    assert!(a.ptr_eq(&b));
    assert!(!a.ptr_eq(&c));
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn test_function_strategy_returns_the_factory() {
    let registry = Registry::new();
    registry
        .register_one(Descriptor::function(bucket_factory()))
        .unwrap();

    let factory: Factory = registry.resolve("Bucket").await.unwrap();
    assert_eq!(factory.name(), "Bucket");
}

#[tokio::test]
async fn test_auto_registration_happens_once() {
    let catalog = Catalog::new().with(counting_factory("AwsBucket", Arc::new(AtomicUsize::new(0))));
    let registry = Registry::with_catalog(catalog);
    registry
        .register_one(Descriptor::auto("^Aws").with_key("aws"))
        .unwrap();

    let a = registry.resolve_instance("AwsBucket").await.unwrap();
    let b = registry.resolve_instance("AwsBucket").await.unwrap();

    assert!(a.ptr_eq(&b));
    let stats = registry.stats();
    assert_eq!(stats.auto_registrations, 1);
    assert_eq!(stats.rules, 1);
    assert!(registry.contains("AwsBucket"));
}

#[tokio::test]
async fn test_failed_auto_rule_is_rolled_back_and_next_rule_wins() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("Widget.json"),
        r#"{"value":{"source":"manifest"}}"#,
    )
    .unwrap();

    let registry = Registry::new();
    registry
        .register([
            // nothing named Widget in the catalog
            Descriptor::auto("^Wid").with_key("catalog-rule"),
            Descriptor::auto("get$")
                .with_key("disk-rule")
                .with_path(temp_dir.path())
                .with_format(ModuleFormat::Manifest),
        ])
        .unwrap();

    let widget: Value = registry.resolve("Widget").await.unwrap();
    assert_eq!(widget["source"], "manifest");
    assert_eq!(registry.stats().auto_registrations, 1);
}

#[tokio::test]
async fn test_unmatched_key_is_resolution_error() {
    let registry = Registry::new();
    registry.register_one(Descriptor::auto("^Aws")).unwrap();

    let err = registry.resolve_instance("GcpBucket").await.unwrap_err();
    assert!(matches!(err, Error::Resolution { ref key, .. } if key == "GcpBucket"));
}

#[tokio::test]
async fn test_descriptor_keys_round_trip() {
    let registry = Registry::new();
    let keys = registry
        .register([
            Descriptor::value("b", 2u8),
            Descriptor::value("a", 1u8),
            Descriptor::alias("c", "a"),
            Descriptor::auto("^z").with_key("rule"),
        ])
        .unwrap();

    let mut expected = keys.clone();
    expected.sort();
    assert_eq!(registry.descriptors(), expected);
}

#[tokio::test]
async fn test_unregister_removes_descriptor_and_singleton() {
    let registry = Registry::new();
    registry.register_value("region", json!("eu")).unwrap();
    let _: Value = registry.resolve("region").await.unwrap();

    assert_eq!(registry.unregister(["region", "unknown"]), 1);
    assert!(!registry.contains("region"));
    assert!(registry.resolve_instance("region").await.is_err());
}

#[tokio::test]
async fn test_manifest_module_loaded_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("logs.json"),
        r#"{"type":"manifest","export":"Bucket","args":["logs"]}"#,
    )
    .unwrap();

    let registry = Registry::with_catalog(Catalog::new().with(bucket_factory()));
    registry
        .register_one(
            Descriptor::export("logs")
                .with_path(temp_dir.path())
                .with_dependency(Descriptor::value("region", json!("us-east-1"))),
        )
        .unwrap();

    // dynamic loading is only available asynchronously
    assert!(registry.resolve_sync::<Arc<Bucket>>("logs").is_err());

    let bucket: Arc<Bucket> = registry.resolve("logs").await.unwrap();
    assert_eq!(bucket.name, "logs");
    assert_eq!(bucket.region, "us-east-1");
}

#[tokio::test]
async fn test_wrong_format_hint_falls_back() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("settings.json"), r#"{"value":[1,2]}"#).unwrap();

    let registry = Registry::new();
    registry
        .register_one(
            Descriptor::export("settings")
                .with_path(temp_dir.path())
                .with_format(ModuleFormat::Native),
        )
        .unwrap();

    let settings: Value = registry.resolve("settings").await.unwrap();
    assert_eq!(settings, json!([1, 2]));
}

#[tokio::test]
async fn test_missing_module_names_the_path() {
    let temp_dir = TempDir::new().unwrap();
    let registry = Registry::new();
    registry
        .register_one(Descriptor::export("Ghost").with_path(temp_dir.path()))
        .unwrap();

    let err = registry.resolve_instance("Ghost").await.unwrap_err();
    match err {
        Error::ModuleLoad { path, .. } => assert_eq!(path, temp_dir.path().join("Ghost")),
        other => panic!("expected module load error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_registration_document() {
    let doc = r#"{
        "region": { "type": "value", "target": "eu-central-1" },
        "Bucket": { "args": ["artifacts"], "dependencies": [{ "key": "region", "type": "value", "target": "ignored" }] },
        "store": { "type": "alias", "target": "Bucket" }
    }"#;
    let specs: DescriptorSpecs = serde_json::from_str(doc).unwrap();

    let registry = Registry::with_catalog(Catalog::new().with(bucket_factory()));
    registry.register_specs(specs).unwrap();

    let bucket: Arc<Bucket> = registry.resolve("store").await.unwrap();
    assert_eq!(bucket.name, "artifacts");
    assert_eq!(bucket.region, "eu-central-1");
}

#[tokio::test]
async fn test_sync_resolution_refuses_auto_registration() {
    let catalog = Catalog::new().with(counting_factory("AwsQueue", Arc::new(AtomicUsize::new(0))));
    let registry = Registry::with_catalog(catalog);
    registry.register_one(Descriptor::auto("^Aws")).unwrap();

    assert!(registry.resolve_sync::<usize>("AwsQueue").is_err());
    assert!(registry.resolve::<usize>("AwsQueue").await.is_ok());
    // once registered, sync resolution works
    assert!(registry.resolve_sync::<usize>("AwsQueue").is_ok());
}

#[tokio::test]
async fn test_instances_hold_trait_objects() {
    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }
    struct Fixed;
    impl Named for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
    }

    let registry = Registry::new();
    let named: Arc<dyn Named> = Arc::new(Fixed);
    registry
        .register_one(Descriptor::instance("named", Instance::new(named)))
        .unwrap();

    let resolved: Arc<dyn Named> = registry.resolve("named").await.unwrap();
    assert_eq!(resolved.name(), "fixed");
}
