//! `arena` — run, resume, judge and inspect model-vs-model debates.

use std::path::PathBuf;

use anyhow::{bail, Result};
use arena_runner::{Arena, RunnerConfig};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Runner configuration file
    #[arg(long, default_value = "arena.toml")]
    config: PathBuf,

    /// Override the state directory
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every debate in the config, then judge the completed ones
    Run {
        /// Debates run at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Skip judging
        #[arg(long)]
        no_judge: bool,
    },
    /// Resume a stored debate, then judge it
    Resume {
        debate_id: String,

        #[arg(long)]
        no_judge: bool,
    },
    /// Judge a completed stored debate
    Judge { debate_id: String },
    /// Print a stored debate
    Show { debate_id: String },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let mut config = RunnerConfig::load(&args.config)?;
    if let Some(dir) = args.state_dir {
        config.state_dir = dir;
    }
    if let Command::Run {
        concurrency: Some(n),
        ..
    } = &args.command
    {
        config.concurrency = *n;
    }

    info!(
        model_url = %config.model.url,
        search = config.search.is_some(),
        state_dir = %config.state_dir.display(),
        "Arena starting"
    );

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next round boundary");
            ctrl_c.cancel();
        }
    });

    let arena = Arena::from_config(&config, cancel).await?;

    match args.command {
        Command::Run { no_judge, .. } => {
            if config.debates.is_empty() {
                bail!("No [[debate]] entries in {}", args.config.display());
            }
            let entries = arena.run_all(&config).await?;
            let mut failed = 0;
            for entry in &entries {
                match &entry.result {
                    Ok(outcome) => {
                        println!("{}", outcome.summary_line());
                        if !no_judge && arena.has_judge() {
                            match arena.judge_outcome(outcome).await {
                                Ok(verdict) => println!("  {}", verdict.summary_line()),
                                Err(e) => {
                                    failed += 1;
                                    error!(debate_id = %entry.debate_id, error = %e, "Judging failed");
                                }
                            }
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        println!("[failed] debate={} {}", entry.debate_id, e);
                    }
                }
            }
            if failed > 0 {
                bail!("{} of {} debates failed", failed, entries.len());
            }
        }
        Command::Resume {
            debate_id,
            no_judge,
        } => {
            let outcome = arena.resume(&debate_id).await?;
            println!("{}", outcome.summary_line());
            if !no_judge && arena.has_judge() {
                let verdict = arena.judge_outcome(&outcome).await?;
                println!("  {}", verdict.summary_line());
            }
        }
        Command::Judge { debate_id } => {
            let verdict = arena.judge_stored(&debate_id).await?;
            println!("{}", verdict.summary_line());
        }
        Command::Show { debate_id } => {
            print!("{}", arena.describe(&debate_id).await?);
        }
    }

    Ok(())
}
