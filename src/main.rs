use anyhow::Result;
use clap::Parser;
use forge_deploy::cli::DeployArgs;
use forge_deploy::config::{resolve_config_path, DeployConfig};
use forge_deploy::deploy::{DeployOutcome, Deployer};
use forge_deploy::envfile::EnvironmentEditor;
use forge_deploy::github::GithubClient;
use forge_deploy::prompt::{AssumeYes, Confirm, TerminalPrompt};
use forge_deploy::telemetry::init_tracing;
use forge_deploy::vcs::GitWorkingCopy;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::Level;

fn main() -> ExitCode {
    let args = DeployArgs::parse();
    init_tracing(if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if std::env::var_os("DEBUG").is_some() {
                eprintln!("{err:?}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: &DeployArgs) -> Result<()> {
    let config_path = resolve_config_path(args.config.as_deref())?;
    let config = DeployConfig::load(&config_path)?;
    tracing::debug!(config = ?config, "loaded config");

    let github = GithubClient::from_config(&config);
    let working_copy = GitWorkingCopy::open(&config.local.qa_env_path)?
        .with_color(std::io::stdout().is_terminal());
    let editor = EnvironmentEditor::new(config.local.qa_env_path.clone());
    let prompt: Box<dyn Confirm> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalPrompt)
    };

    let outcome = Deployer::new(&github, &editor, &working_copy, prompt.as_ref())
        .run(&args.branch, &args.env)?;
    match outcome {
        DeployOutcome::Deployed { tag, changed: true } => {
            println!("Deployed {tag} to {}", args.env);
        }
        DeployOutcome::Deployed { tag, changed: false } => {
            println!("{} already runs {tag}; provisioning finished", args.env);
        }
        DeployOutcome::Cancelled { tag, discarded } => {
            let state = if discarded { "discarded" } else { "left in working copy" };
            println!("Deployment of {tag} to {} cancelled; changes {state}", args.env);
        }
    }
    Ok(())
}
