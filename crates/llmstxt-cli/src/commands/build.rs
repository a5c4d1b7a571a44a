//! `build`: run the generation conversation and collect the artifacts.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use llmstxt_agent::{ChatEvent, ConversationDriver, DriverSettings, ToolDispatcher};
use llmstxt_core::config::Config;
use llmstxt_core::prompts::{GENERATE_PROMPT, PromptStore};
use llmstxt_core::types::Message;
use llmstxt_providers::openai::OpenAiProvider;
use llmstxt_tools::{ToolContext, ToolRegistry};

/// Directory the model writes into before the files are collected.
pub const STAGING_DIR: &str = ".llms";
pub const ARTIFACTS: [&str; 2] = ["llms.txt", "llms-full.txt"];

const USER_REQUEST: &str = "Create llms.txt and llms-full.txt of this project for me";

#[derive(Debug, Default)]
pub struct BuildArgs {
    pub config: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

fn load_config(args: &BuildArgs) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            Config::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => {
            let path = Config::default_path();
            if !path.exists() {
                info!("No config file, using environment variables");
            }
            Config::load(&path)?
        }
    };

    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.display().to_string());
    }
    Ok(config)
}

pub async fn run(args: BuildArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let resolved = config.resolve();

    let (warnings, errors) = config.validate_resolved(&resolved);
    for w in &warnings {
        warn!("{w}");
    }
    if !errors.is_empty() {
        bail!("Invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    let workspace = std::env::current_dir().context("reading current directory")?;
    let prompts = match &resolved.prompts_dir {
        Some(dir) => PromptStore::with_dir(dir),
        None => PromptStore::builtin(),
    };
    let system_prompt = prompts.load_prompt(GENERATE_PROMPT)?;

    let provider = Arc::new(OpenAiProvider::from_config(&resolved)?);
    let registry = Arc::new(ToolRegistry::with_builtin_tools());
    let dispatcher = ToolDispatcher::new(registry, Arc::new(ToolContext::new(&workspace)));
    let driver = Arc::new(ConversationDriver::new(
        provider,
        dispatcher,
        DriverSettings::from_config(&resolved),
    ));

    info!(
        model = %resolved.model,
        tools_type = %resolved.tools_type,
        workspace = %workspace.display(),
        "Generating llms.txt"
    );

    let mut handle = driver.spawn(vec![
        Message::system(system_prompt),
        Message::user(USER_REQUEST),
    ]);

    let failure = forward_events(&mut handle.events, &mut std::io::stdout()).await?;

    let outcome = handle.join().await;
    if let Some(message) = failure {
        bail!("Generation failed: {message}");
    }
    let outcome = outcome?;
    debug!(rounds = outcome.rounds, "Conversation complete");

    let output_dir = resolved
        .output_dir
        .clone()
        .map(|dir| if dir.is_absolute() { dir } else { workspace.join(dir) })
        .unwrap_or_else(|| workspace.clone());
    let copied = copy_artifacts(&workspace, &output_dir)?;
    info!(
        copied = copied.len(),
        output_dir = %output_dir.display(),
        "Generation complete"
    );
    Ok(())
}

/// Write streamed text to `out` until the conversation ends. Returns the
/// error message when it failed; reporting it is left to the caller.
async fn forward_events(
    events: &mut mpsc::UnboundedReceiver<ChatEvent>,
    out: &mut impl Write,
) -> anyhow::Result<Option<String>> {
    let mut failure = None;
    while let Some(event) = events.recv().await {
        match event {
            ChatEvent::Data(text) => {
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }
            ChatEvent::End => writeln!(out)?,
            ChatEvent::Error(message) => failure = Some(message),
        }
    }
    Ok(failure)
}

/// Copy the generated files into `output_dir`.
///
/// Each artifact is taken from the staging directory, or from the project
/// root when the model wrote it there. Missing artifacts are logged and
/// skipped. Returns the destination paths written.
pub fn copy_artifacts(workspace: &Path, output_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let mut copied = Vec::new();
    for name in ARTIFACTS {
        let staged = workspace.join(STAGING_DIR).join(name);
        let source = if staged.is_file() {
            staged
        } else {
            workspace.join(name)
        };
        if !source.is_file() {
            warn!(artifact = name, "Generated file not found");
            continue;
        }

        let dest = output_dir.join(name);
        if same_file(&source, &dest) {
            debug!(artifact = name, "Already in output directory");
            copied.push(dest);
            continue;
        }
        std::fs::copy(&source, &dest)
            .with_context(|| format!("copying {} to {}", source.display(), dest.display()))?;
        info!(artifact = name, dest = %dest.display(), "Copied");
        copied.push(dest);
    }
    Ok(copied)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
