// src/main.rs
use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

mod config;
mod installer;
mod manifest_updater;
mod plan;
mod report;
mod scripts;
mod secrets;
mod shell;
mod templates;
#[cfg(test)]
mod test_support;

use manifest_updater::VariableUpdate;
use plan::StepKind;

#[derive(Parser)]
#[command(name = "deploy-bootstrap")]
#[command(about = "Deploy Bootstrap - one-shot setup and deploy through your hosting platform's CLI")]
struct Cli {
    /// Path to the deploy manifest
    #[arg(short, long, global = true, default_value = config::MANIFEST_FILE)]
    manifest: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a deploy manifest with the default variable set
    Init {
        /// Project name (optional - uses current directory name if not specified)
        name: Option<String>,
        /// Source repository to link, e.g. owner/name
        #[arg(long)]
        repo: Option<String>,
        /// Overwrite an existing manifest
        #[arg(long)]
        force: bool,
    },
    /// Show the commands a deploy would run, secrets masked
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the platform CLI, login state and variable values
    Check,
    /// Install the CLI if needed, log in, create and link the project, set variables and deploy
    Deploy {
        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
        /// Continue after a failing step instead of stopping
        #[arg(long)]
        keep_going: bool,
        /// Skip every step before this one (resume after a failure)
        #[arg(long, value_enum)]
        start_at: Option<StepKind>,
        /// Refuse to run if any variable would be set to its placeholder
        #[arg(long)]
        require_secrets: bool,
        /// Fail instead of installing the CLI when it is missing
        #[arg(long)]
        skip_install: bool,
    },
    /// Add or change a variable in the manifest
    #[command(group(ArgGroup::new("source").required(true).args(["value", "from_env", "placeholder"])))]
    SetVar {
        /// Variable name
        name: String,
        /// Literal value
        #[arg(long)]
        value: Option<String>,
        /// Read the value from this environment variable at deploy time
        #[arg(long)]
        from_env: Option<String>,
        /// Placeholder used when no real value is available
        #[arg(long)]
        placeholder: Option<String>,
        /// Mask the value in all output
        #[arg(long, conflicts_with = "no_secret")]
        secret: bool,
        /// Stop masking the value
        #[arg(long)]
        no_secret: bool,
    },
    /// Remove a variable from the manifest
    UnsetVar {
        /// Variable name
        name: String,
    },
    /// Show the report of the last deploy
    LastRun,
}

/// `None` leaves the manifest's `secret` setting untouched.
fn secret_flag(secret: bool, no_secret: bool) -> Option<bool> {
    match (secret, no_secret) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let manifest = cli.manifest;

    match cli.command {
        Commands::Init { name, repo, force } => {
            scripts::init::run(&manifest, name, repo, force)?;
        }
        Commands::Plan { json } => {
            scripts::plan::run(&manifest, json)?;
        }
        Commands::Check => {
            scripts::check::run(&manifest).await?;
        }
        Commands::Deploy { dry_run, keep_going, start_at, require_secrets, skip_install } => {
            scripts::deploy::run(scripts::deploy::DeployOptions {
                manifest,
                dry_run,
                keep_going,
                start_at,
                require_secrets,
                skip_install,
            })
            .await?;
        }
        Commands::SetVar { name, value, from_env, placeholder, secret, no_secret } => {
            let update = match (value, from_env, placeholder) {
                (Some(v), _, _) => VariableUpdate::Value(v),
                (None, Some(env), _) => VariableUpdate::FromEnv(env),
                (None, None, Some(p)) => VariableUpdate::Placeholder(p),
                (None, None, None) => anyhow::bail!("One of --value, --from-env or --placeholder is required"),
            };
            scripts::vars::set(&manifest, &name, update, secret_flag(secret, no_secret))?;
        }
        Commands::UnsetVar { name } => {
            scripts::vars::unset(&manifest, &name)?;
        }
        Commands::LastRun => {
            scripts::last_run::run(&manifest)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_flags_parse() {
        let cli = Cli::try_parse_from([
            "deploy-bootstrap",
            "deploy",
            "--keep-going",
            "--start-at",
            "set-variables",
            "--manifest",
            "ops/deploy.toml",
        ])
        .unwrap();
        assert_eq!(cli.manifest, PathBuf::from("ops/deploy.toml"));
        match cli.command {
            Commands::Deploy { keep_going, start_at, dry_run, .. } => {
                assert!(keep_going);
                assert!(!dry_run);
                assert_eq!(start_at, Some(StepKind::SetVariables));
            }
            _ => panic!("expected deploy"),
        }
    }

    #[test]
    fn test_set_var_requires_a_value_source() {
        assert!(Cli::try_parse_from(["deploy-bootstrap", "set-var", "X"]).is_err());
        assert!(Cli::try_parse_from(["deploy-bootstrap", "set-var", "X", "--from-env", "X"]).is_ok());
    }

    #[test]
    fn test_set_var_can_clear_the_secret_flag() {
        let cli = Cli::try_parse_from(["deploy-bootstrap", "set-var", "X", "--value", "1", "--no-secret"])
            .unwrap();
        match cli.command {
            Commands::SetVar { secret, no_secret, .. } => {
                assert_eq!(secret_flag(secret, no_secret), Some(false));
            }
            _ => panic!("expected set-var"),
        }
        assert_eq!(secret_flag(false, false), None);
        assert_eq!(secret_flag(true, false), Some(true));
        assert!(Cli::try_parse_from([
            "deploy-bootstrap", "set-var", "X", "--value", "1", "--secret", "--no-secret"
        ])
        .is_err());
    }
}
