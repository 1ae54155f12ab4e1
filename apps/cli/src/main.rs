//! markdeck: extract flashcards from Markdown notes and keep them
//! synchronized with Anki through AnkiConnect.

mod anki;
mod session;
mod templates;
mod vault;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use markdeck_core::Config;

use crate::session::{SessionError, SyncSession};

#[derive(Parser)]
#[command(
    name = "markdeck",
    version,
    about = "Sync Markdown flashcards with Anki"
)]
struct Cli {
    /// Markdown note or vault directory to synchronize
    path: PathBuf,

    /// Vault root; defaults to PATH when it is a directory, else its parent
    #[arg(long)]
    vault_root: Option<PathBuf>,

    /// TOML configuration file; defaults to <vault-root>/markdeck.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// AnkiConnect endpoint
    #[arg(long, default_value = anki::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Parse and report only; no remote calls, no file changes
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    match run(Cli::parse()).await {
        Ok(clean) => {
            if clean {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let vault_root = match &cli.vault_root {
        Some(root) => root.clone(),
        None if cli.path.is_dir() => cli.path.clone(),
        None => cli
            .path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
    };

    let config = load_config(&cli, &vault_root)?;
    let session =
        SyncSession::new(config, cli.endpoint.clone()).context("invalid configuration")?;

    let files = if cli.path.is_dir() {
        vault::collect_markdown_files(&cli.path)
            .with_context(|| format!("could not walk {}", cli.path.display()))?
    } else {
        vec![cli.path.clone()]
    };
    anyhow::ensure!(!files.is_empty(), "no Markdown files under {}", cli.path.display());

    if !cli.dry_run {
        session.prepare().await?;
    }

    let mut clean = true;
    let (mut created, mut updated, mut deleted, mut rewritten) = (0, 0, 0, 0);
    for file in &files {
        match session.sync_file(&vault_root, file, cli.dry_run).await {
            Ok(report) => {
                for line in &report.notifications {
                    println!("{}: {line}", file.display());
                }
                created += report.created;
                updated += report.updated;
                deleted += report.deleted;
                rewritten += usize::from(report.changed);
                if !report.not_found.is_empty() {
                    clean = false;
                }
            }
            Err(err @ SessionError::LocalWrite { .. }) => {
                // The remote store was already edited; stop instead of
                // drifting further.
                return Err(err.into());
            }
            Err(err @ (SessionError::Connectivity(_) | SessionError::Version)) => {
                return Err(err.into());
            }
            Err(err) => {
                eprintln!("{}: error: {err}", file.display());
                clean = false;
            }
        }
    }
    if !cli.dry_run {
        println!(
            "Done: {created} created, {updated} updated, {deleted} deleted, {rewritten} notes rewritten."
        );
    }
    Ok(clean)
}

fn load_config(cli: &Cli, vault_root: &std::path::Path) -> Result<Config> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let default = vault_root.join("markdeck.toml");
            default.is_file().then_some(default)
        }
    };
    match path {
        None => Ok(Config::default()),
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("could not read {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
        }
    }
}
