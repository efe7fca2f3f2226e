use rigger_core::constants::RIGGER_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `RIGGER_LOG`, then `RUST_LOG`, then defaults to
/// `info`. Output goes to stderr so stdout stays free for JSON results.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    init_with_default("info")
}

/// Initialize tracing with an explicit fallback filter directive
pub fn init_with_default(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(RIGGER_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default_directive))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span for an entire pipeline run
pub fn pipeline_span(run_id: &str, action: &str, template: &str) -> Span {
    span!(Level::INFO, "pipeline", run_id = %run_id, action = %action, template = %template)
}

/// Create a span for one component within a run
pub fn component_span(name: &str, index: usize) -> Span {
    span!(Level::INFO, "component", name = %name, index = index)
}
