use crate::commands::PipelineArgs;
use crate::GlobalArgs;
use rigger_config::{load_registration, SettingsLoader};
use rigger_core::events::ConsoleSubscriber;
use rigger_core::EventEmitter;
use rigger_pipeline::{Action, Orchestrator, PipelineRunResult, RunArgs};
use rigger_registry::Registry;
use serde_json::{Map, Value};
use std::process::ExitCode;
use std::sync::Arc;

/// Build an orchestrator from the settings file and registration document
pub async fn orchestrator(globals: &GlobalArgs, console: bool) -> eyre::Result<Orchestrator> {
    let mut loader = SettingsLoader::new();
    if let Some(path) = &globals.config {
        loader = loader.file(path);
    }
    let loaded = loader.load().await?;
    match &loaded.source {
        Some(path) => tracing::debug!(path = %path.display(), "Using settings file"),
        None => tracing::debug!("No settings file found, using defaults"),
    }

    let registry = Registry::new();
    if let Some(path) = &globals.registry {
        let specs = load_registration(path).await?;
        let keys = registry.register_specs(specs)?;
        tracing::debug!(count = keys.len(), path = %path.display(), "Applied registration document");
    }

    let events = Arc::new(EventEmitter::default());
    if console {
        events.add_subscriber(Arc::new(ConsoleSubscriber::new())).await;
    }

    let orchestrator = Orchestrator::with_events(registry, events);
    orchestrator.configure(loaded.settings).await?;
    Ok(orchestrator)
}

pub async fn execute(action: Action, args: PipelineArgs, globals: &GlobalArgs) -> eyre::Result<ExitCode> {
    let orchestrator = orchestrator(globals, !args.json).await?;
    let run_args = RunArgs {
        template: args.template,
        stack: args.stack,
        project: args.project,
        config: parse_assignments(&args.set)?,
    };

    let result = orchestrator.run(action, run_args).await;
    if let Err(e) = orchestrator.close().await {
        tracing::warn!(error = %e, "Failed to close secret backend");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_summary(result: &PipelineRunResult) {
    println!("{}", result.message);
    for error in &result.errors {
        eprintln!("  error: {error}");
    }
    if !result.output.is_empty() {
        let keys: Vec<&str> = result.output.keys().map(String::as_str).collect();
        println!("  outputs: {}", keys.join(", "));
    }
}

/// Turn `KEY=VALUE` pairs into a config map
fn parse_assignments(assignments: &[String]) -> eyre::Result<Map<String, Value>> {
    let mut config = Map::new();
    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| eyre::eyre!("expected KEY=VALUE, got '{assignment}'"))?;
        if key.is_empty() {
            eyre::bail!("empty key in '{assignment}'");
        }
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        config.insert(key.to_string(), value);
    }
    Ok(config)
}
