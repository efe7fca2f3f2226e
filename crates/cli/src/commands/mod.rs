use clap::{Args, Subcommand};

pub mod pipeline;
pub mod templates;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the setup phase, then deploy every component
    Deploy(PipelineArgs),

    /// Undeploy every component
    Undeploy(PipelineArgs),

    /// Tear down every component
    Destroy(PipelineArgs),

    /// Validate every component without changing anything
    Validate(PipelineArgs),

    /// Report the status of every component
    Status(PipelineArgs),

    /// List the templates the template store knows about
    #[command(visible_alias = "ls")]
    Templates {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Template to run
    #[arg(short, long)]
    pub template: String,

    /// Stack (environment) the run targets
    #[arg(short, long)]
    pub stack: Option<String>,

    /// Project the run belongs to
    #[arg(short, long)]
    pub project: Option<String>,

    /// Run configuration entry, KEY=VALUE; values that parse as JSON are kept typed
    #[arg(long, value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Print the run result as JSON
    #[arg(long)]
    pub json: bool,
}
