use crate::commands::{pipeline, templates, Commands};
use crate::GlobalArgs;
use rigger_pipeline::Action;
use std::process::ExitCode;

impl Commands {
    pub async fn execute(self, globals: &GlobalArgs) -> eyre::Result<ExitCode> {
        match self {
            Commands::Deploy(args) => pipeline::execute(Action::Deploy, args, globals).await,
            Commands::Undeploy(args) => pipeline::execute(Action::Undeploy, args, globals).await,
            Commands::Destroy(args) => pipeline::execute(Action::Destroy, args, globals).await,
            Commands::Validate(args) => pipeline::execute(Action::Validate, args, globals).await,
            Commands::Status(args) => pipeline::execute(Action::Status, args, globals).await,
            Commands::Templates { json } => templates::execute(json, globals).await,
        }
    }
}
