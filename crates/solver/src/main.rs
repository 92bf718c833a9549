use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use game::StateId;
use solver::pipeline::{self, ShowArgs, SolveArgs, SummaryArgs};

/// forty-thieves: concurrent best-first solver for Forty Thieves solitaire.
#[derive(Parser)]
#[command(name = "forty-thieves", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for solving and inspecting stored games.
#[derive(Subcommand)]
enum Command {
    /// Deal a game (or resume the latest) and search it.
    Solve {
        /// Deal a new game. This is the default.
        #[arg(long, conflicts_with = "resume")]
        new: bool,
        /// Continue the latest game in the journal.
        #[arg(long, conflicts_with = "in_memory")]
        resume: bool,
        /// Override the number of search workers.
        #[arg(long)]
        workers: Option<usize>,
        /// Path to solver config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the journal path.
        #[arg(long)]
        store: Option<PathBuf>,
        /// Keep the frontier in memory only.
        #[arg(long)]
        in_memory: bool,
        /// Seed for the deal.
        #[arg(long)]
        seed: Option<u64>,
        /// Path for the JSON run report.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Hide the progress spinner.
        #[arg(long)]
        quiet: bool,
    },
    /// Print frontier counts for a stored game.
    Summary {
        /// Path to solver config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the journal path.
        #[arg(long)]
        store: Option<PathBuf>,
        /// Game id. Defaults to the latest game.
        #[arg(long)]
        game: Option<u64>,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
    /// Print one stored state and its children.
    Show {
        /// Path to solver config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the journal path.
        #[arg(long)]
        store: Option<PathBuf>,
        /// State id (32 hex digits).
        #[arg(long)]
        state: StateId,
        /// Output as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Solve {
            new: _,
            resume,
            workers,
            config,
            store,
            in_memory,
            seed,
            output,
            quiet,
        } => {
            pipeline::run_solve(SolveArgs {
                config,
                store,
                in_memory,
                resume,
                workers,
                seed,
                output,
                progress: !quiet,
            })
            .await?;
        }
        Command::Summary {
            config,
            store,
            game,
            json,
        } => {
            pipeline::run_summary(SummaryArgs {
                config,
                store,
                game,
                json,
            })
            .await?;
        }
        Command::Show {
            config,
            store,
            state,
            json,
        } => {
            pipeline::run_show(ShowArgs {
                config,
                store,
                state,
                json,
            })
            .await?;
        }
    }
    Ok(())
}
