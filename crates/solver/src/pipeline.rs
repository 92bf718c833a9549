//! Command pipelines: solve, summary, show.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

use frontier::{Frontier, JournalFrontier, MemoryFrontier, StoreConfig};
use game::{GameId, GameState, StateId};
use search::{
    find_solved, solution_path, state_view, SearchEngine, SearchOutcome, SearchStats, StateView,
    TerminationReason,
};

use crate::config::{apply_overrides, resolve_solver_toml, Overrides};
use crate::results::{write_json, GameSummary, RunReport, SolutionReport};

/// Arguments for the `solve` subcommand.
#[derive(Debug, Default)]
pub struct SolveArgs {
    /// Path to the solver config TOML. Falls back to `configs/solver.toml`.
    pub config: Option<PathBuf>,
    /// Override the journal path from the config.
    pub store: Option<PathBuf>,
    /// Keep the frontier in memory; nothing is written to disk.
    pub in_memory: bool,
    /// Continue the latest game in the store instead of dealing a new one.
    pub resume: bool,
    /// Override the number of search workers.
    pub workers: Option<usize>,
    /// Seed for the deal. Random when absent.
    pub seed: Option<u64>,
    /// Where to write the JSON run report.
    pub output: Option<PathBuf>,
    /// Show a live spinner with frontier counts.
    pub progress: bool,
}

/// Arguments for the `summary` subcommand.
#[derive(Debug, Default)]
pub struct SummaryArgs {
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
    /// Game to summarize. Defaults to the latest.
    pub game: Option<u64>,
    /// Output as JSON instead of human-readable text.
    pub json: bool,
}

/// Arguments for the `show` subcommand.
#[derive(Debug)]
pub struct ShowArgs {
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub state: StateId,
    /// Output as JSON instead of human-readable text.
    pub json: bool,
}

fn open_frontier(store: &StoreConfig, in_memory: bool) -> anyhow::Result<Arc<dyn Frontier>> {
    if in_memory {
        tracing::info!("Using in-memory frontier");
        return Ok(Arc::new(MemoryFrontier::new(store)));
    }
    let journal = JournalFrontier::open(store)
        .with_context(|| format!("failed to open journal {}", store.path.display()))?;
    Ok(Arc::new(journal))
}

fn open_read_only(config: Option<PathBuf>, store: Option<PathBuf>) -> anyhow::Result<JournalFrontier> {
    let toml = apply_overrides(
        resolve_solver_toml(config.as_deref())?,
        &Overrides {
            workers: None,
            store,
        },
    );
    JournalFrontier::open_read_only(&toml.store)
        .with_context(|| format!("failed to read journal {}", toml.store.path.display()))
}

/// Deal a new game, or pick the latest one when resuming.
async fn select_game(
    frontier: &dyn Frontier,
    resume: bool,
    seed: Option<u64>,
) -> anyhow::Result<GameId> {
    if resume {
        let game_id = frontier
            .latest_game()
            .await?
            .context("nothing to resume: the store holds no games")?;
        let counts = frontier.counts(game_id).await?;
        tracing::info!(
            game_id = %game_id,
            unprocessed = counts.unprocessed,
            processed = counts.processed,
            "Resuming game"
        );
        return Ok(game_id);
    }

    let game_id = frontier.create_game().await?;
    let root = match seed {
        Some(seed) => GameState::deal_seeded(game_id, seed),
        None => GameState::deal(game_id),
    };
    tracing::info!(game_id = %game_id, root = %root.state_id, seed = ?seed, "Dealt new game");
    frontier.insert(root).await?;
    Ok(game_id)
}

/// Run the search for one game and report how it ended.
pub async fn run_solve(args: SolveArgs) -> anyhow::Result<RunReport> {
    let toml = apply_overrides(
        resolve_solver_toml(args.config.as_deref())?,
        &Overrides {
            workers: args.workers,
            store: args.store.clone(),
        },
    );
    toml.store.validate();

    let frontier = open_frontier(&toml.store, args.in_memory)?;
    let game_id = select_game(frontier.as_ref(), args.resume, args.seed).await?;

    let engine = SearchEngine::new(toml.search.clone());
    let workers = engine.config().effective_workers();

    let known = if args.resume {
        known_solution(frontier.as_ref(), game_id).await?
    } else {
        None
    };
    let outcome = match known {
        Some(outcome) => outcome,
        None => search_game(&engine, &frontier, game_id, args.progress).await?,
    };

    let solution = match &outcome.solution {
        Some(solved) => {
            let path = solution_path(frontier.as_ref(), solved.state_id).await?;
            SolutionReport::from_path(&path)
        }
        None => None,
    };
    let counts = frontier.counts(game_id).await?;
    let report = RunReport::new(game_id, &outcome, args.resume, workers, counts, solution);

    if let Some(output) = &args.output {
        write_json(output, &report)?;
    }

    println!("\n--- Search Summary ---");
    println!("Game: {}", report.game_id);
    println!("Result: {}", describe_reason(report.reason));
    println!("Workers: {}", report.workers);
    println!(
        "Expansions: {} ({:.0}/s)",
        report.stats.expansions,
        report.expansion_rate()
    );
    println!(
        "Children inserted: {} (duplicates skipped: {})",
        report.stats.children_inserted, report.stats.duplicates_skipped
    );
    println!(
        "Frontier: {} open, {} claimed, {} processed",
        report.counts.unprocessed, report.counts.claimed, report.counts.processed
    );
    if let Some(best) = report.counts.best_score {
        println!("Best score: {best}");
    }
    if let Some(solution) = &report.solution {
        println!("Solution: {} moves", solution.num_moves());
        for (i, mv) in solution.moves.iter().enumerate() {
            println!("  {:>4}. {mv}", i + 1);
        }
    }
    if !args.in_memory {
        println!("Store: {}", toml.store.path.display());
    }
    if let Some(output) = &args.output {
        println!("Report: {}", output.display());
    }
    println!("Elapsed: {:.1}s", report.wall_time_ms as f64 / 1000.0);

    Ok(report)
}

/// A resumed game whose store already holds a solved state needs no search.
async fn known_solution(
    frontier: &dyn Frontier,
    game_id: GameId,
) -> anyhow::Result<Option<SearchOutcome>> {
    if frontier.counts(game_id).await?.best_score != Some(0) {
        return Ok(None);
    }
    let Some(solved) = find_solved(frontier, game_id).await? else {
        return Ok(None);
    };
    tracing::info!(
        game_id = %game_id,
        state_id = %solved.state_id,
        "Game already solved, reporting the stored solution"
    );
    Ok(Some(SearchOutcome {
        reason: TerminationReason::Solved,
        solution: Some(solved),
        stats: SearchStats::default(),
        wall_time_ms: 0,
    }))
}

/// Run the engine with Ctrl-C wired to shutdown and an optional spinner.
async fn search_game(
    engine: &SearchEngine,
    frontier: &Arc<dyn Frontier>,
    game_id: GameId,
    progress: bool,
) -> anyhow::Result<SearchOutcome> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, letting workers finish their current state");
            shutdown_tx.send_replace(true);
        }
    });

    let pb = if progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    let progress_task = {
        let frontier = Arc::clone(frontier);
        let pb = pb.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(500));
            loop {
                ticker.tick().await;
                if let Ok(counts) = frontier.counts(game_id).await {
                    pb.set_message(format!(
                        "open {} | claimed {} | done {} | best score {}",
                        counts.unprocessed,
                        counts.claimed,
                        counts.processed,
                        counts
                            .best_score
                            .map_or_else(|| "-".to_string(), |s| s.to_string()),
                    ));
                }
            }
        })
    };

    let result = engine.run(Arc::clone(frontier), game_id, shutdown_rx).await;
    signal_task.abort();
    progress_task.abort();
    pb.finish_and_clear();
    Ok(result?)
}

fn describe_reason(reason: TerminationReason) -> &'static str {
    match reason {
        TerminationReason::Solved => "solved",
        TerminationReason::Exhausted => "frontier exhausted, no solution",
        TerminationReason::Shutdown => "interrupted",
        TerminationReason::BudgetExhausted => "expansion budget spent",
    }
}

/// Print frontier counts for a stored game.
pub async fn run_summary(args: SummaryArgs) -> anyhow::Result<GameSummary> {
    let frontier = open_read_only(args.config, args.store)?;
    let game_id = match args.game {
        Some(id) => GameId(id),
        None => frontier
            .latest_game()
            .await?
            .context("the store holds no games")?,
    };
    let root = frontier.root(game_id).await?;
    let counts = frontier.counts(game_id).await?;
    let summary = GameSummary {
        game_id,
        counts,
        root_score: root.score,
        root_state_id: root.state_id,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(summary);
    }

    println!("--- Game Summary ---");
    println!("Store: {}", frontier.path().display());
    println!("Game: {}", summary.game_id);
    println!("Root: {} (score {})", summary.root_state_id, summary.root_score);
    println!("States: {}", summary.counts.total());
    println!("  unprocessed: {}", summary.counts.unprocessed);
    println!("  claimed:     {}", summary.counts.claimed);
    println!("  processed:   {}", summary.counts.processed);
    match summary.counts.best_score {
        Some(best) => println!(
            "Best score: {best} ({:.1}% on foundations)",
            summary.best_progress_pct()
        ),
        None => println!("Best score: -"),
    }
    Ok(summary)
}

/// Print one stored state and its children.
pub async fn run_show(args: ShowArgs) -> anyhow::Result<StateView> {
    let frontier = open_read_only(args.config, args.store)?;
    let view = state_view(&frontier, args.state).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(view);
    }

    let state = &view.state;
    print!("{state}");
    println!("Status: {}", state.status);
    match state.parent_state_id {
        Some(parent) => println!("Parent: {parent}"),
        None => println!("Parent: - (root)"),
    }
    if let Some(mv) = state.last_move {
        println!("Last move: {mv}");
    }
    println!("Children: {}", view.children.len());
    for child in &view.children {
        println!("  {child}");
    }
    Ok(view)
}
