// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotkit::{
    config::Settings,
    label::{active_env, python_version, Labeler},
    path::{config_file, is_wsl},
    ssh::{self, op::OpCli, resolve_ssh_dir},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Confirm;
use std::{path::PathBuf, process::exit};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  dotkit prompt <segment>\n  dotkit sync-ssh [options]",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        match self.command {
            Command::Prompt(opts) => run_prompt(opts),
            Command::SyncSsh(opts) => run_sync_ssh(opts).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Compute a prompt segment for the status line.
    #[command(override_usage = "dotkit prompt <segment>")]
    Prompt(PromptOptions),

    /// Regenerate the SSH directory from the 1Password vault.
    #[command(name = "sync-ssh", override_usage = "dotkit sync-ssh [options]")]
    SyncSsh(SyncSshOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct PromptOptions {
    #[command(subcommand)]
    pub segment: Segment,
}

#[derive(Debug, Clone, Subcommand)]
enum Segment {
    /// Label for the active Python virtual environment.
    Virtualenv,

    /// Version of the resident Python interpreter.
    #[command(name = "python-version")]
    PythonVersion,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SyncSshOptions {
    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Regenerate this directory instead of the detected one.
    #[arg(short, long, value_name = "path")]
    pub ssh_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer().compact().with_target(false).without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn run_prompt(opts: PromptOptions) -> Result<()> {
    match opts.segment {
        Segment::Virtualenv => {
            // INVARIANT: The prompt must never break the shell, so a bad
            // configuration degrades to defaults instead of failing.
            let settings = load_settings().unwrap_or_else(|error| {
                warn!("falling back to default settings: {error:?}");
                Settings::default()
            });

            let labeler = Labeler::new(&settings.prompt);
            if let Some(label) = labeler.label(active_env().as_deref()) {
                println!("{label}");
            }
        }
        Segment::PythonVersion => {
            if let Some(version) = python_version() {
                println!("{version}");
            }
        }
    }

    Ok(())
}

async fn run_sync_ssh(opts: SyncSshOptions) -> Result<()> {
    let settings = load_settings()?;
    let vault = OpCli::discover()?;

    let ssh_dir = match opts.ssh_dir {
        Some(path) => path,
        None => resolve_ssh_dir()?,
    };

    if ssh_dir.exists() && !opts.yes {
        let proceed = Confirm::new("This will replace your existing SSH directory. Continue?")
            .with_help_message("a backup archive will be made next to it")
            .with_default(true)
            .prompt()?;
        if !proceed {
            return Ok(());
        }
    }

    let bar = ProgressBar::no_length();
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<30}  [{wide_bar:.yellow/blue}] {pos}/{len}",
    )?
    .progress_chars("-Cco.");
    bar.set_style(style);
    bar.set_message("fetching vault entries");

    let report = ssh::sync(&vault, &settings.ssh, &ssh_dir, is_wsl(), bar).await?;

    info!(
        "generated {} config entries at {:?}",
        report.entries.len(),
        ssh_dir.display()
    );
    if let Some(backup) = report.backup {
        info!("previous directory archived at {:?}", backup.display());
    }

    Ok(())
}

fn load_settings() -> Result<Settings> {
    let path = config_file()?;
    if !path.exists() {
        return Ok(Settings::default());
    }

    Ok(std::fs::read_to_string(&path)?.parse()?)
}
