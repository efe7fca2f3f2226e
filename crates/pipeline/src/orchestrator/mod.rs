//! The pipeline orchestrator
//!
//! An [`Orchestrator`] owns a [`Registry`], the event bus and a variable
//! resolver. `configure` registers the settings' descriptors plus the
//! built-in services; every action then loads a template from the
//! `template` service and drives its components in order, folding each
//! component's output into a scope later components can reference.

mod process;
mod state;

pub use state::OrchestratorState;
use state::RunClaim;

use crate::action::Action;
use crate::component::component_descriptor;
use crate::components::PassthroughComponent;
use crate::context::RunArgs;
use crate::result::PipelineRunResult;
use parking_lot::{Mutex, RwLock};
use process::RunState;
use rigger_config::{FileTemplateStore, OrchestratorSettings, PipelineTemplate, TemplateStore};
use rigger_core::{
    Error, EventEmitter, PipelineEvent, Result, SystemEvent, DEFAULT_EVENT_CAPACITY,
    EVENTS_SERVICE_KEY, PASSTHROUGH_COMPONENT_KEY, SECRET_SERVICE_KEY, TEMPLATE_SERVICE_KEY,
};
use rigger_registry::{Descriptor, Registry};
use rigger_secrets::{SecretBackend, SecretManager};
use rigger_utils::tracing::pipeline_span;
use rigger_variables::VariableResolver;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

pub struct Orchestrator {
    registry: Registry,
    events: Arc<EventEmitter>,
    resolver: RwLock<VariableResolver>,
    state: Mutex<OrchestratorState>,
    settings: RwLock<Option<OrchestratorSettings>>,
}

impl Orchestrator {
    pub fn new(registry: Registry) -> Self {
        Self::with_events(registry, Arc::new(EventEmitter::new(DEFAULT_EVENT_CAPACITY)))
    }

    /// Use an existing event bus, e.g. one a console subscriber is attached to
    pub fn with_events(registry: Registry, events: Arc<EventEmitter>) -> Self {
        Self {
            registry,
            events,
            resolver: RwLock::new(VariableResolver::default()),
            state: Mutex::new(OrchestratorState::Idle),
            settings: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventEmitter> {
        &self.events
    }

    pub fn state(&self) -> OrchestratorState {
        *self.state.lock()
    }

    /// Settings passed to the last successful `configure`
    pub fn settings(&self) -> Option<OrchestratorSettings> {
        self.settings.read().clone()
    }

    /// Register the settings' descriptors and the built-in services.
    ///
    /// Keys that are already registered are left alone, so services
    /// registered before `configure` take precedence over the defaults.
    pub async fn configure(&self, settings: OrchestratorSettings) -> Result<()> {
        if self.state() == OrchestratorState::Executing {
            return Err(Error::configuration(
                "cannot reconfigure while a pipeline run is in progress",
            ));
        }

        let registered = self.registry.register_specs(settings.registry.clone())?;
        self.register_services(&settings)?;

        let secrets: Arc<dyn SecretBackend> = self.registry.resolve(SECRET_SERVICE_KEY).await?;
        *self.resolver.write() = VariableResolver::new(secrets);

        info!(
            descriptors = registered.len(),
            templates_dir = %settings.templates_dir.display(),
            secrets = %settings.secrets.kind,
            "Orchestrator configured"
        );
        *self.settings.write() = Some(settings);
        *self.state.lock() = OrchestratorState::Configured;
        Ok(())
    }

    fn register_services(&self, settings: &OrchestratorSettings) -> Result<()> {
        let mut services = vec![
            Descriptor::value(EVENTS_SERVICE_KEY, Arc::clone(&self.events)),
            component_descriptor(PASSTHROUGH_COMPONENT_KEY, PassthroughComponent::new()),
        ];
        if !self.registry.contains(TEMPLATE_SERVICE_KEY) {
            let store: Arc<dyn TemplateStore> =
                Arc::new(FileTemplateStore::new(settings.templates_dir.clone()));
            services.push(Descriptor::value(TEMPLATE_SERVICE_KEY, store));
        }
        if !self.registry.contains(SECRET_SERVICE_KEY) {
            let secrets: Arc<dyn SecretBackend> =
                Arc::new(SecretManager::from_settings(&settings.secrets)?);
            services.push(Descriptor::value(SECRET_SERVICE_KEY, secrets));
        }
        self.registry.register(services)?;
        Ok(())
    }

    pub async fn deploy(&self, args: RunArgs) -> PipelineRunResult {
        self.run(Action::Deploy, args).await
    }

    pub async fn undeploy(&self, args: RunArgs) -> PipelineRunResult {
        self.run(Action::Undeploy, args).await
    }

    /// Tear down the template's components through their `undeploy` action
    pub async fn destroy(&self, args: RunArgs) -> PipelineRunResult {
        self.run(Action::Destroy, args).await
    }

    pub async fn validate(&self, args: RunArgs) -> PipelineRunResult {
        self.run(Action::Validate, args).await
    }

    pub async fn status(&self, args: RunArgs) -> PipelineRunResult {
        self.run(Action::Status, args).await
    }

    /// Load `args.template` from the template service and run `action` on it.
    ///
    /// Errors never escape: they are reported as a failed result.
    pub async fn run(&self, action: Action, args: RunArgs) -> PipelineRunResult {
        let mut run = RunState::new(action, &args.template);
        let claim = match RunClaim::acquire(&self.state) {
            Ok(claim) => claim,
            Err(error) => return run.finish(Some(error)),
        };

        let span = pipeline_span(&run.run_id, action.as_str(), &args.template);
        let outcome = async {
            let template = self.load_template(&args.template).await?;
            self.execute(&mut run, &template, &args).await
        }
        .instrument(span)
        .await;

        self.settle(claim, run, outcome).await
    }

    /// Run `action` on an already loaded template
    pub async fn process(
        &self,
        template: &PipelineTemplate,
        action: Action,
        args: &RunArgs,
    ) -> PipelineRunResult {
        let mut run = RunState::new(action, &template.name);
        let claim = match RunClaim::acquire(&self.state) {
            Ok(claim) => claim,
            Err(error) => return run.finish(Some(error)),
        };

        let span = pipeline_span(&run.run_id, action.as_str(), &template.name);
        let outcome = self.execute(&mut run, template, args).instrument(span).await;

        self.settle(claim, run, outcome).await
    }

    /// Names of the templates the template service knows about
    pub async fn templates(&self) -> Result<Vec<String>> {
        self.template_store().await?.list().await
    }

    /// Release the secret backend's connections
    pub async fn close(&self) -> Result<()> {
        if !self.registry.contains(SECRET_SERVICE_KEY) {
            return Ok(());
        }
        let secrets: Arc<dyn SecretBackend> = self.registry.resolve(SECRET_SERVICE_KEY).await?;
        secrets.close().await
    }

    async fn template_store(&self) -> Result<Arc<dyn TemplateStore>> {
        self.registry.resolve(TEMPLATE_SERVICE_KEY).await
    }

    async fn load_template(&self, name: &str) -> Result<PipelineTemplate> {
        if name.trim().is_empty() {
            return Err(Error::configuration("no template name given"));
        }
        self.template_store().await?.load(name).await
    }

    async fn settle(
        &self,
        claim: RunClaim<'_>,
        run: RunState,
        outcome: Result<()>,
    ) -> PipelineRunResult {
        let result = run.finish(outcome.err());
        claim.release(result.success);

        if result.success {
            info!(
                run_id = %result.run_id,
                action = %result.action,
                duration_ms = result.duration_ms,
                "Pipeline completed"
            );
        } else {
            warn!(
                run_id = %result.run_id,
                action = %result.action,
                errors = ?result.errors,
                "Pipeline failed"
            );
        }

        self.events
            .emit(SystemEvent::Pipeline(PipelineEvent::PipelineCompleted {
                run_id: result.run_id.clone(),
                action: result.action.to_string(),
                success: result.success,
                duration_ms: result.duration_ms,
                errors: result.errors.clone(),
            }))
            .await;
        result
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state())
            .field("registry", &self.registry.stats())
            .finish_non_exhaustive()
    }
}
