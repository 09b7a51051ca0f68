//! chatloop terminal client
//!
//! Chats as a career persona: answers from the person's profile, records
//! unknown questions and visitor contact details through push notifications.

mod repl;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use career_persona::{career_tools, Profile};
use chatloop_core::{env_lookup, ConversationLoop, ModelBackend, Session, Settings};
use chatloop_runtime::{notifier_from_settings, OpenAiBackend};

use crate::repl::Repl;

#[derive(Debug, Parser)]
#[command(
    name = "chatloop",
    about = "Chat with a tool-using career persona",
    version
)]
struct Cli {
    /// Directory holding summary.txt, resume.txt and optionally name.txt;
    /// falls back to CHATLOOP_PROFILE_DIR, then ./profile
    #[arg(long)]
    profile_dir: Option<PathBuf>,

    /// Persona name; falls back to CHATLOOP_PERSONA_NAME, then name.txt
    #[arg(long)]
    name: Option<String>,

    /// Extra .env file to load before reading settings
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Override CHATLOOP_MAX_ROUNDS
    #[arg(long)]
    max_rounds: Option<usize>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

const DEFAULT_PROFILE_DIR: &str = "./profile";

/// Profile directory and persona name: flags first, then the environment
fn profile_source<F>(cli: &Cli, lookup: F) -> (PathBuf, Option<String>)
where
    F: Fn(&str) -> Option<String>,
{
    let dir = cli
        .profile_dir
        .clone()
        .or_else(|| lookup("CHATLOOP_PROFILE_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROFILE_DIR));
    let name = cli
        .name
        .clone()
        .or_else(|| lookup("CHATLOOP_PERSONA_NAME"));
    (dir, name)
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "debug"
    } else {
        "warn,chatloop_core=info"
    };

    // stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(path) = &cli.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
    }

    let mut settings = Settings::from_env()?;
    if let Some(max_rounds) = cli.max_rounds {
        settings.max_rounds = max_rounds;
    }
    tracing::debug!(?settings, "Settings loaded");

    let (profile_dir, name) = profile_source(&cli, env_lookup(std::env::vars()));
    let profile = Profile::load(&profile_dir, name.as_deref())
        .map_err(chatloop_core::ChatError::from)?;

    // Initialize model backend
    let backend = Arc::new(OpenAiBackend::from_settings(&settings)?);
    match backend.health_check().await {
        Ok(true) => tracing::info!(model = backend.model(), "Connected to model backend"),
        Ok(false) | Err(_) => {
            tracing::warn!("Model backend not reachable, requests may fail");
        }
    }

    // Initialize tools
    let notifier = notifier_from_settings(&settings);
    let tools = career_tools(notifier)?;
    tracing::info!(tools = ?tools.names(), "Registered tools");

    let mut repl = Repl {
        chat: ConversationLoop::new(backend, settings.loop_config()),
        tools,
        session: Session::with_system_prompt(profile.system_prompt()),
        name: profile.name,
    };
    tracing::info!(session = %repl.session.id, "Session started");

    repl.run(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        tokio::io::stderr(),
    )
    .await?;

    Ok(())
}
