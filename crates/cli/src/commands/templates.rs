use crate::commands::pipeline::orchestrator;
use crate::GlobalArgs;
use std::process::ExitCode;

pub async fn execute(json: bool, globals: &GlobalArgs) -> eyre::Result<ExitCode> {
    let orchestrator = orchestrator(globals, false).await?;
    let names = orchestrator.templates().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else if names.is_empty() {
        println!("No templates found");
    } else {
        for name in names {
            println!("{name}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
