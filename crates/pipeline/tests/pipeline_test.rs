use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rigger_config::{
    ComponentSpec, InMemoryTemplateStore, OrchestratorSettings, PipelineTemplate, TemplateStore,
};
use rigger_core::{ComponentEvent, Error, Result, SystemEvent, TEMPLATE_SERVICE_KEY};
use rigger_pipeline::{
    component_descriptor, Action, Component, ComponentResult, Orchestrator, OrchestratorState,
    PipelineContext, RunArgs,
};
use rigger_registry::{Descriptor, Registry};
use rigger_variables::VariableDescriptor;
use serde_json::{json, Map, Value};
use serial_test::serial;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Calls = Arc<Mutex<Vec<(Action, Map<String, Value>)>>>;

#[derive(Clone)]
enum Behavior {
    Succeed,
    Throw(&'static str),
    Report(&'static str),
    Hang,
}

/// Records every invocation and answers with a canned output per action
#[derive(Clone)]
struct Recorder {
    actions: Vec<Action>,
    outputs: HashMap<Action, Map<String, Value>>,
    behavior: Behavior,
    calls: Calls,
}

impl Recorder {
    fn new(actions: &[Action]) -> Self {
        Self {
            actions: actions.to_vec(),
            outputs: HashMap::new(),
            behavior: Behavior::Succeed,
            calls: Arc::default(),
        }
    }

    fn output(mut self, action: Action, output: Value) -> Self {
        let Value::Object(map) = output else {
            panic!("outputs must be objects");
        };
        self.outputs.insert(action, map);
        self
    }

    fn behave(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn calls(&self) -> Vec<(Action, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Component for Recorder {
    fn supports(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    async fn invoke(
        &self,
        action: Action,
        input: &Map<String, Value>,
        _context: &PipelineContext,
    ) -> Result<Option<ComponentResult>> {
        self.calls.lock().unwrap().push((action, input.clone()));
        match self.behavior {
            Behavior::Throw(message) => Err(Error::configuration(message)),
            Behavior::Report(message) => Ok(Some(ComponentResult::failed(action, message))),
            Behavior::Hang => std::future::pending().await,
            Behavior::Succeed => {
                let mut result = ComponentResult::ok(action);
                if let Some(output) = self.outputs.get(&action) {
                    result = result.with_output(output.clone());
                }
                Ok(Some(result))
            }
        }
    }
}

async fn orchestrator(template: PipelineTemplate, components: &[(&str, &Recorder)]) -> Orchestrator {
    let registry = Registry::new();
    let store: Arc<dyn TemplateStore> = Arc::new(InMemoryTemplateStore::new().with(template));
    registry
        .register_one(Descriptor::value(TEMPLATE_SERVICE_KEY, store))
        .unwrap();
    for (key, component) in components {
        registry
            .register_one(component_descriptor(*key, (*component).clone()))
            .unwrap();
    }

    let orchestrator = Orchestrator::new(registry);
    orchestrator
        .configure(OrchestratorSettings::default())
        .await
        .unwrap();
    orchestrator
}

fn two_step_template() -> PipelineTemplate {
    PipelineTemplate::new("web", "terraform")
        .with_component(ComponentSpec::new("Network"))
        .with_component(
            ComponentSpec::new("Server")
                .with_input(vec![VariableDescriptor::reference("target", "ip")]),
        )
}

#[tokio::test]
async fn test_outputs_chain_into_later_inputs() {
    let network = Recorder::new(&[Action::Deploy, Action::Status])
        .output(Action::Status, json!({ "ip": "1.2.3.4" }));
    let server = Recorder::new(&[Action::Status]);
    let orchestrator =
        orchestrator(two_step_template(), &[("Network", &network), ("Server", &server)]).await;

    let result = orchestrator.status(RunArgs::new("web")).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.action, Action::Status);
    let calls = server.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.get("target"), Some(&json!("1.2.3.4")));
    assert_eq!(result.output.get("ip"), Some(&json!("1.2.3.4")));
    assert_eq!(result.invoked(), vec!["Network", "Server"]);
    assert_eq!(orchestrator.state(), OrchestratorState::Completed);
}

#[tokio::test]
async fn test_thrown_error_stops_the_run() {
    let network = Recorder::new(&[Action::Status]).behave(Behavior::Throw("subnet quota exceeded"));
    let server = Recorder::new(&[Action::Status]);
    let orchestrator =
        orchestrator(two_step_template(), &[("Network", &network), ("Server", &server)]).await;

    let result = orchestrator.status(RunArgs::new("web")).await;

    assert!(!result.success);
    assert!(server.calls().is_empty());
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("subnet quota exceeded"));
    assert!(result.results.is_empty());
    assert_eq!(orchestrator.state(), OrchestratorState::Failed);
}

#[tokio::test]
async fn test_reported_failure_lets_the_run_continue() {
    let network = Recorder::new(&[Action::Status]).behave(Behavior::Report("unreachable"));
    let server = Recorder::new(&[Action::Status]);
    let orchestrator =
        orchestrator(two_step_template(), &[("Network", &network), ("Server", &server)]).await;

    let result = orchestrator.status(RunArgs::new("web")).await;

    assert_eq!(server.calls().len(), 1);
    assert_eq!(result.results.len(), 2);
    assert!(!result.success);
    assert!(result.errors[0].contains("Network"));
    assert!(result.errors[0].contains("unreachable"));
}

#[tokio::test]
async fn test_validate_twice_gives_identical_output() {
    let template = PipelineTemplate::new("web", "terraform").with_component(
        ComponentSpec::new("Passthrough").with_input(vec![
            VariableDescriptor::value("region", "eu-west-1"),
            VariableDescriptor::value("replicas", 3),
        ]),
    );
    let orchestrator = orchestrator(template, &[]).await;

    let first = orchestrator.validate(RunArgs::new("web")).await;
    let second = orchestrator.validate(RunArgs::new("web")).await;

    assert!(first.success);
    assert_eq!(first.output, second.output);
    assert_eq!(first.output.get("replicas"), Some(&json!(3)));
    let strip = |result: &rigger_pipeline::PipelineRunResult| {
        result
            .results
            .iter()
            .map(|run| (run.component.clone(), run.result.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(&first), strip(&second));
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_deploy_setup_output_seeds_the_main_phase() {
    let bucket = Recorder::new(&[Action::Setup, Action::Deploy])
        .output(Action::Setup, json!({ "bucket_name": "logs-7f3a" }));
    let writer = Recorder::new(&[Action::Deploy]);
    let template = PipelineTemplate::new("storage", "pulumi")
        .with_component(ComponentSpec::new("Bucket"))
        .with_component(
            ComponentSpec::new("Writer")
                .with_input(vec![VariableDescriptor::reference("bucket", "bucket_name")]),
        );
    let orchestrator = orchestrator(template, &[("Bucket", &bucket), ("Writer", &writer)]).await;

    let result = orchestrator.deploy(RunArgs::new("storage")).await;

    assert!(result.success, "{:?}", result.errors);
    let bucket_actions: Vec<Action> = bucket.calls().into_iter().map(|(action, _)| action).collect();
    assert_eq!(bucket_actions, vec![Action::Setup, Action::Deploy]);
    assert_eq!(writer.calls()[0].1.get("bucket"), Some(&json!("logs-7f3a")));

    let setup: Vec<_> = result.phase(Action::Setup).collect();
    assert_eq!(setup.len(), 2);
    assert!(setup[1].result.is_none());
    assert_eq!(result.phase(Action::Deploy).count(), 2);
}

#[tokio::test]
async fn test_template_without_engine_fails_before_any_component() {
    let network = Recorder::new(&[Action::Validate]);
    let template = PipelineTemplate {
        name: "web".into(),
        components: vec![ComponentSpec::new("Network")],
        ..PipelineTemplate::default()
    };
    let orchestrator = orchestrator(template, &[("Network", &network)]).await;

    let result = orchestrator.validate(RunArgs::new("web")).await;

    assert!(!result.success);
    assert!(result.errors[0].contains("engine"));
    assert!(network.calls().is_empty());
}

#[tokio::test]
async fn test_unsupported_action_records_placeholder_and_skip_event() {
    let network = Recorder::new(&[Action::Deploy]);
    let template =
        PipelineTemplate::new("web", "terraform").with_component(ComponentSpec::new("Network"));
    let orchestrator = orchestrator(template, &[("Network", &network)]).await;
    let mut events = orchestrator.events().subscribe();

    let result = orchestrator.status(RunArgs::new("web")).await;

    assert!(result.success);
    assert_eq!(result.results.len(), 1);
    assert!(result.results[0].result.is_none());

    let mut skipped = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SystemEvent::Component(ComponentEvent::ComponentSkipped { component, action }) =
            event.event
        {
            skipped.push((component, action));
        }
    }
    assert_eq!(skipped, vec![("Network".to_string(), "status".to_string())]);
}

#[tokio::test]
async fn test_destroy_invokes_undeploy() {
    let network = Recorder::new(&[Action::Undeploy]);
    let template =
        PipelineTemplate::new("web", "terraform").with_component(ComponentSpec::new("Network"));
    let orchestrator = orchestrator(template, &[("Network", &network)]).await;

    let result = orchestrator.destroy(RunArgs::new("web")).await;

    assert!(result.success);
    assert_eq!(result.action, Action::Destroy);
    assert_eq!(network.calls()[0].0, Action::Undeploy);
}

#[tokio::test]
async fn test_unknown_component_is_a_resolution_failure() {
    let template =
        PipelineTemplate::new("web", "terraform").with_component(ComponentSpec::new("Missing"));
    let orchestrator = orchestrator(template, &[]).await;

    let result = orchestrator.deploy(RunArgs::new("web")).await;

    assert!(!result.success);
    assert!(result.errors[0].contains("Missing"));
}

#[tokio::test]
async fn test_cancelled_run_does_not_block_the_next_one() {
    let network = Recorder::new(&[Action::Status]).behave(Behavior::Hang);
    let template =
        PipelineTemplate::new("web", "terraform").with_component(ComponentSpec::new("Network"));
    let orchestrator = orchestrator(template, &[("Network", &network)]).await;

    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), orchestrator.status(RunArgs::new("web")))
            .await;
    assert!(cancelled.is_err());
    assert_eq!(orchestrator.state(), OrchestratorState::Failed);

    let result = orchestrator.validate(RunArgs::new("web")).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(orchestrator.state(), OrchestratorState::Completed);
}

#[tokio::test]
async fn test_runs_require_configuration() {
    let orchestrator = Orchestrator::new(Registry::new());

    let result = orchestrator.validate(RunArgs::new("web")).await;

    assert!(!result.success);
    assert_eq!(orchestrator.state(), OrchestratorState::Idle);
}

#[tokio::test]
#[serial]
async fn test_file_templates_and_secret_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let templates_dir = temp_dir.path().join("templates");
    std::fs::create_dir_all(&templates_dir).unwrap();
    std::fs::write(
        templates_dir.join("api.yaml"),
        r#"
name: api
engine: terraform
components:
  - name: Passthrough
    input:
      - name: token
        type: secret
        value: RIGGER_PIPELINE_TEST_TOKEN
      - name: missing
        type: secret
        value: RIGGER_PIPELINE_TEST_ABSENT
        default: fallback
"#,
    )
    .unwrap();
    std::env::set_var("RIGGER_PIPELINE_TEST_TOKEN", "s3cr3t");

    let orchestrator = Orchestrator::new(Registry::new());
    orchestrator
        .configure(OrchestratorSettings {
            templates_dir,
            ..OrchestratorSettings::default()
        })
        .await
        .unwrap();

    assert_eq!(orchestrator.templates().await.unwrap(), vec!["api".to_string()]);
    let result = orchestrator.validate(RunArgs::new("api")).await;
    std::env::remove_var("RIGGER_PIPELINE_TEST_TOKEN");

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.output.get("token"), Some(&json!("s3cr3t")));
    assert_eq!(result.output.get("missing"), Some(&json!("fallback")));
}
