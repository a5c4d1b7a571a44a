use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use llmstxt_core::config::{self, Config};

mod commands;
mod logging;

#[derive(Parser)]
#[command(
    name = "llms-txt-generator",
    about = "Generate llms.txt and llms-full.txt for a project with a tool-calling LLM",
    after_help = "With no command: runs `build` when llms-txt-generator.yaml exists, otherwise `init` then `build`.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create llms-txt-generator.yaml interactively
    Init {
        /// Overwrite an existing config file without asking
        #[arg(long)]
        force: bool,
    },

    /// Generate llms.txt and llms-full.txt
    Build {
        /// Config file path (default: ./llms-txt-generator.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory the generated files are copied to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    config::load_env_files();

    // Logging settings come from the config file the command will use.
    let log_config_path = match &cli.command {
        Some(Commands::Build {
            config: Some(path), ..
        }) => path.clone(),
        _ => Config::default_path(),
    };
    let log_config = Config::load(&log_config_path).unwrap_or_default();
    logging::init(cli.verbose, log_config.logging.as_ref());

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Option<Commands>) -> anyhow::Result<()> {
    match command {
        Some(Commands::Init { force }) => {
            commands::init::run(&Config::default_path(), force)?;
        }
        Some(Commands::Build { config, output_dir }) => {
            commands::build::run(commands::build::BuildArgs { config, output_dir }).await?;
        }
        None => {
            let path = Config::default_path();
            if path.exists() {
                tracing::info!(path = %path.display(), "Configuration file found, generating documentation");
            } else {
                tracing::info!("No configuration file found, initializing");
                if !commands::init::run(&path, false)? {
                    return Ok(());
                }
            }
            commands::build::run(commands::build::BuildArgs::default()).await?;
        }
    }
    Ok(())
}
