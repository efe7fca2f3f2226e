//! The per-component loop shared by every action

use super::Orchestrator;
use crate::action::Action;
use crate::component::ComponentRef;
use crate::context::{PipelineContext, RunArgs};
use crate::result::{ComponentResult, ComponentRun, PipelineRunResult};
use chrono::{DateTime, Utc};
use rigger_config::{ComponentSpec, PipelineTemplate};
use rigger_core::events::utils as events;
use rigger_core::{ComponentEvent, Error, PipelineEvent, Result, Scope, SystemEvent};
use rigger_registry::ScopedRegistry;
use rigger_utils::tracing::component_span;
use rigger_variables::{VariableDescriptor, VariableResolver};
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

/// One pass over a template's components
#[derive(Clone, Copy)]
pub(crate) struct Phase {
    /// Recorded on results and events
    label: Action,
    /// Passed to `Component::invoke`
    invoke: Action,
    /// Picks the variable list resolved before the action
    select: fn(&ComponentSpec) -> &[VariableDescriptor],
}

fn setup_variables(spec: &ComponentSpec) -> &[VariableDescriptor] {
    &spec.setup
}

fn input_variables(spec: &ComponentSpec) -> &[VariableDescriptor] {
    &spec.input
}

impl Phase {
    fn setup() -> Self {
        Self {
            label: Action::Setup,
            invoke: Action::Setup,
            select: setup_variables,
        }
    }

    fn main(action: Action) -> Self {
        Self {
            label: action,
            invoke: action.component_action(),
            select: input_variables,
        }
    }
}

enum Invocation {
    Skipped,
    Finished(Option<ComponentResult>),
}

/// Mutable state of one run
pub(crate) struct RunState {
    pub(crate) run_id: String,
    pub(crate) action: Action,
    pub(crate) template: String,
    started: Instant,
    timestamp: DateTime<Utc>,
    pub(crate) scope: Scope,
    pub(crate) results: Vec<ComponentRun>,
    pub(crate) errors: Vec<String>,
}

impl RunState {
    pub(crate) fn new(action: Action, template: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            action,
            template: template.to_string(),
            started: Instant::now(),
            timestamp: Utc::now(),
            scope: Scope::new(),
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn finish(self, fatal: Option<Error>) -> PipelineRunResult {
        let mut errors = self.errors;
        if let Some(error) = fatal {
            errors.push(error.to_string());
        }
        let success = errors.is_empty();
        let message = if success {
            let invoked = self.results.iter().filter(|run| run.result.is_some()).count();
            format!(
                "{} of '{}' completed: {invoked} component action(s) ran",
                self.action, self.template
            )
        } else {
            format!(
                "{} of '{}' failed: {}",
                self.action,
                self.template,
                errors.join("; ")
            )
        };

        PipelineRunResult {
            run_id: self.run_id,
            action: self.action,
            template: self.template,
            success,
            message,
            timestamp: self.timestamp,
            duration_ms: elapsed_ms(self.started),
            output: self.scope.into_inner(),
            results: self.results,
            errors,
        }
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl Orchestrator {
    /// Validate the template and run its phases; `deploy` runs `setup` first
    pub(crate) async fn execute(
        &self,
        run: &mut RunState,
        template: &PipelineTemplate,
        args: &RunArgs,
    ) -> Result<()> {
        template.validate()?;

        self.events
            .emit(SystemEvent::Pipeline(PipelineEvent::PipelineStarted {
                run_id: run.run_id.clone(),
                action: run.action.to_string(),
                template: template.name.clone(),
                total_components: template.components.len(),
            }))
            .await;
        info!(
            components = template.components.len(),
            engine = ?template.engine,
            "Starting pipeline"
        );

        let context = PipelineContext {
            run_id: run.run_id.clone(),
            action: run.action,
            template: template.name.clone(),
            engine: template.engine.clone(),
            stack: args.stack.clone(),
            project: args.project.clone(),
            config: args.config.clone(),
            stack_settings: template.stack.clone(),
        };
        let registry = self.registry.scope();
        let resolver = self.resolver.read().clone();

        if run.action == Action::Deploy {
            self.run_phase(run, &registry, &resolver, template, Phase::setup(), &context)
                .await?;
        }
        self.run_phase(run, &registry, &resolver, template, Phase::main(run.action), &context)
            .await
    }

    /// Drive every component through one phase, in template order.
    ///
    /// Stops at the first component that returns an error.
    async fn run_phase(
        &self,
        run: &mut RunState,
        registry: &ScopedRegistry,
        resolver: &VariableResolver,
        template: &PipelineTemplate,
        phase: Phase,
        context: &PipelineContext,
    ) -> Result<()> {
        debug!(phase = %phase.label, "Starting phase");
        for (index, spec) in template.components.iter().enumerate() {
            self.run_component(run, registry, resolver, spec, index, phase, context)
                .instrument(component_span(&spec.name, index))
                .await?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_component(
        &self,
        run: &mut RunState,
        registry: &ScopedRegistry,
        resolver: &VariableResolver,
        spec: &ComponentSpec,
        index: usize,
        phase: Phase,
        context: &PipelineContext,
    ) -> Result<()> {
        let label = phase.label.as_str();
        self.events
            .emit(events::component_started(&spec.name, label, index))
            .await;
        let started = Instant::now();

        let invocation = match self.invoke(run, registry, resolver, spec, phase, context).await {
            Ok(invocation) => invocation,
            Err(error) => {
                warn!(error = %error, "Component failed, aborting run");
                self.events
                    .emit(events::component_failed(&spec.name, label, &error.to_string()))
                    .await;
                return Err(error);
            }
        };
        let duration_ms = elapsed_ms(started);

        let result = match invocation {
            Invocation::Skipped => {
                debug!(action = label, "Component does not implement action");
                self.events
                    .emit(events::component_skipped(&spec.name, label))
                    .await;
                None
            }
            Invocation::Finished(result) => {
                self.record(run, spec, phase, result.as_ref(), duration_ms)
                    .await;
                result
            }
        };

        run.results.push(ComponentRun {
            component: spec.name.clone(),
            phase: phase.label,
            result,
            duration_ms,
        });
        Ok(())
    }

    async fn invoke(
        &self,
        run: &RunState,
        registry: &ScopedRegistry,
        resolver: &VariableResolver,
        spec: &ComponentSpec,
        phase: Phase,
        context: &PipelineContext,
    ) -> Result<Invocation> {
        let component: ComponentRef = registry.resolve(&spec.name).await?;
        component.configure(spec).await?;

        let input = resolver.process((phase.select)(spec), &run.scope).await?;
        debug!(input = ?input.redacted(), "Resolved component input");

        if !component.supports(phase.invoke) {
            return Ok(Invocation::Skipped);
        }

        component
            .invoke(phase.invoke, &input.values, context)
            .await
            .map(Invocation::Finished)
            .map_err(|error| Error::component_action(&spec.name, phase.label.as_str(), error.to_string()))
    }

    /// Fold a returned result into the run
    async fn record(
        &self,
        run: &mut RunState,
        spec: &ComponentSpec,
        phase: Phase,
        result: Option<&ComponentResult>,
        duration_ms: u64,
    ) {
        let (success, message) = match result {
            Some(result) => {
                if let Some(output) = &result.output {
                    run.scope.merge(output.clone());
                }
                if !result.success {
                    let reason = result
                        .error
                        .as_deref()
                        .or(result.message.as_deref())
                        .unwrap_or("no reason given");
                    warn!(reason, "Component reported failure, continuing");
                    run.errors.push(format!(
                        "component '{}' failed to {}: {reason}",
                        spec.name, phase.label
                    ));
                }
                (result.success, result.message.clone())
            }
            None => (true, None),
        };

        info!(success, duration_ms, "Component finished");
        self.events
            .emit(SystemEvent::Component(ComponentEvent::ComponentCompleted {
                component: spec.name.clone(),
                action: phase.label.to_string(),
                success,
                duration_ms,
                message,
            }))
            .await;
    }
}
