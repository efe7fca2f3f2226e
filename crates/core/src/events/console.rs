//! Console event subscriber for terminal output

use crate::events::{ComponentEvent, EnhancedEvent, EventSubscriber, PipelineEvent, SystemEvent};
use async_trait::async_trait;
use std::io;
use tracing::debug;

/// Console subscriber for terminal output
pub struct ConsoleSubscriber {
    /// Use colored output
    use_colors: bool,
    /// Verbosity level
    verbosity: ConsoleVerbosity,
    /// Output writer
    writer: ConsoleWriter,
}

/// Console verbosity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleVerbosity {
    /// Only show failures and the final summary
    Quiet,
    /// Show component completions (default)
    Normal,
    /// Show every event
    Verbose,
}

/// Console output destination
enum ConsoleWriter {
    Stderr,
    Stdout,
}

impl ConsoleSubscriber {
    /// Create a new console subscriber with default settings
    pub fn new() -> Self {
        Self {
            use_colors: io::IsTerminal::is_terminal(&io::stderr()),
            verbosity: ConsoleVerbosity::Normal,
            writer: ConsoleWriter::Stderr,
        }
    }

    /// Create a console subscriber with custom settings
    pub fn with_config(use_colors: bool, verbosity: ConsoleVerbosity) -> Self {
        Self {
            use_colors,
            verbosity,
            writer: ConsoleWriter::Stderr,
        }
    }

    /// Create a console subscriber for CI/CD environments
    pub fn for_ci() -> Self {
        Self {
            use_colors: false,
            verbosity: ConsoleVerbosity::Normal,
            writer: ConsoleWriter::Stdout,
        }
    }

    fn verbose(&self) -> bool {
        matches!(self.verbosity, ConsoleVerbosity::Verbose)
    }

    /// Format an event for console output
    fn format_event(&self, event: &SystemEvent) -> Option<String> {
        match event {
            SystemEvent::Pipeline(pipeline_event) => self.format_pipeline_event(pipeline_event),
            SystemEvent::Component(component_event) => {
                self.format_component_event(component_event)
            }
        }
    }

    fn format_pipeline_event(&self, event: &PipelineEvent) -> Option<String> {
        match event {
            PipelineEvent::PipelineStarted {
                action,
                template,
                total_components,
                ..
            } => Some(self.colorize(
                &format!(
                    "▶ {action} '{template}': {total_components} components"
                ),
                "blue",
            )),
            PipelineEvent::PipelineCompleted {
                action,
                success,
                duration_ms,
                errors,
                ..
            } => {
                if *success {
                    Some(self.colorize(
                        &format!("✔ {action} completed in {duration_ms}ms"),
                        "green",
                    ))
                } else {
                    Some(self.colorize(
                        &format!(
                            "✘ {action} failed after {duration_ms}ms: {}",
                            errors.join("; ")
                        ),
                        "red",
                    ))
                }
            }
        }
    }

    fn format_component_event(&self, event: &ComponentEvent) -> Option<String> {
        match event {
            ComponentEvent::ComponentStarted {
                component, action, ..
            } => self
                .verbose()
                .then(|| self.colorize(&format!("  → {component}.{action}"), "cyan")),
            ComponentEvent::ComponentCompleted {
                component,
                success,
                duration_ms,
                message,
                ..
            } => {
                let suffix = message
                    .as_deref()
                    .map(|m| format!(": {m}"))
                    .unwrap_or_default();
                if *success {
                    (!matches!(self.verbosity, ConsoleVerbosity::Quiet)).then(|| {
                        self.colorize(
                            &format!("  ✔ {component} ({duration_ms}ms){suffix}"),
                            "green",
                        )
                    })
                } else {
                    Some(self.colorize(
                        &format!("  ✘ {component} reported failure{suffix}"),
                        "yellow",
                    ))
                }
            }
            ComponentEvent::ComponentSkipped { component, action } => self.verbose().then(|| {
                format!("  ⏭ {component} has no '{action}' action")
            }),
            ComponentEvent::ComponentFailed {
                component, error, ..
            } => Some(self.colorize(&format!("  ✘ {component}: {error}"), "red")),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        let color_code = match color {
            "red" => "\x1b[31m",
            "green" => "\x1b[32m",
            "yellow" => "\x1b[33m",
            "blue" => "\x1b[34m",
            "cyan" => "\x1b[36m",
            _ => "\x1b[0m",
        };

        format!("{color_code}{text}\x1b[0m")
    }

    fn write_output(&self, content: &str) {
        match self.writer {
            ConsoleWriter::Stderr => eprintln!("{content}"),
            ConsoleWriter::Stdout => println!("{content}"),
        }
    }
}

impl Default for ConsoleSubscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSubscriber for ConsoleSubscriber {
    async fn handle_event(
        &self,
        event: &EnhancedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(formatted) = self.format_event(&event.event) {
            self.write_output(&formatted);
            debug!(
                event_type = std::any::type_name_of_val(&event.event),
                "Console event output"
            );
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "console"
    }

    fn is_interested(&self, event: &SystemEvent) -> bool {
        match (event, self.verbosity) {
            (SystemEvent::Pipeline(PipelineEvent::PipelineCompleted { .. }), _) => true,
            (SystemEvent::Component(ComponentEvent::ComponentFailed { .. }), _) => true,
            (
                SystemEvent::Component(ComponentEvent::ComponentCompleted { success, .. }),
                ConsoleVerbosity::Quiet,
            ) => !success,
            (_, ConsoleVerbosity::Quiet) => false,
            _ => true,
        }
    }
}
