//! CLI argument parsing for a single QA deployment.
use clap::Parser;
use std::path::PathBuf;

/// Deploy the latest QA build of a branch to one environment.
#[derive(Parser, Debug)]
#[command(
    name = "forge-deploy",
    version,
    about = "Deploy a QA build of hot-api-mono to a QA environment",
    after_help = "Examples:\n  forge-deploy --branch qa-feature-42 --env hot-1\n  forge-deploy -b main -e hot-3 --yes\n  forge-deploy -b main -e hot-3 --config ./forge-deploy.yml"
)]
pub struct DeployArgs {
    /// Branch whose "qa build" run produces the image tag
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: String,

    /// Environment name; edits areas/<ENV>.yaml in the qa-env working copy
    #[arg(short, long, value_name = "ENV")]
    pub env: String,

    /// Config file (default: ~/.config/forge-deploy.yml)
    #[arg(long, value_name = "PATH", env = "FORGE_DEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Push without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}
