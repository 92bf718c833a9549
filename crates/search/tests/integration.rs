//! Integration tests for the search crate.
//!
//! Run the worker pool end to end against the in-memory frontier, the
//! journal frontier, and the mock frontiers. No network, no fixtures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use frontier::{Frontier, JournalFrontier, MemoryFrontier, StoreConfig};
use game::{Card, Face, GameId, GameState, Pile, Suit, TOTAL_CARDS};
use search::mocks::{CountingFrontier, Fault, FaultyFrontier};
use search::{
    move_sequence, solution_path, SearchConfig, SearchEngine, SearchError, TerminationReason,
};
use tempfile::TempDir;
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn quick_config(workers: usize) -> SearchConfig {
    SearchConfig {
        num_workers: Some(workers),
        claim_retries: 3,
        retry_backoff_ms: 1,
        max_backoff_ms: 8,
        ..SearchConfig::default()
    }
}

/// Everything on foundations except the two kings of hearts, which sit on
/// tableaus 3 and 7. Two moves from solved.
fn two_kings_left(game_id: GameId) -> GameState {
    let mut state = GameState::deal_seeded(game_id, 5);
    state.stock = Pile::new();
    state.waste = Pile::new();
    for tableau in state.tableaus.iter_mut() {
        *tableau = Pile::new();
    }
    let suits = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
    for (i, foundation) in state.foundations.iter_mut().enumerate() {
        let suit = suits[i % 4];
        let top = if suit == Suit::Heart { 12 } else { 13 };
        *foundation =
            Pile::from_cards(Face::ALL[..top].iter().map(|&f| Card::new(f, suit)).collect());
    }
    state.tableaus[3].push(Card::new(Face::King, Suit::Heart));
    state.tableaus[7].push(Card::new(Face::King, Suit::Heart));
    state.score = state.compute_score();
    state
}

fn never_shutdown() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_solves_two_move_position_and_path_replays() {
    let frontier: Arc<dyn Frontier> = Arc::new(MemoryFrontier::default());
    let game_id = frontier.create_game().await.unwrap();
    let root = two_kings_left(game_id);
    assert_eq!(root.card_count(), TOTAL_CARDS);
    assert_eq!(root.score, 2);
    frontier.insert(root.clone()).await.unwrap();

    let (_tx, rx) = never_shutdown();
    let outcome = SearchEngine::new(quick_config(4))
        .run(Arc::clone(&frontier), game_id, rx)
        .await
        .unwrap();

    assert_eq!(outcome.reason, TerminationReason::Solved);
    let solution = outcome.solution.unwrap();
    assert!(solution.is_solved());

    let path = solution_path(frontier.as_ref(), solution.state_id)
        .await
        .unwrap();
    assert_eq!(path.first().unwrap().state_id, root.state_id);
    assert_eq!(path.last().unwrap().state_id, solution.state_id);

    // Replaying the recorded moves from the root reproduces the solution layout.
    let mut replay = root.clone();
    for m in move_sequence(&path) {
        replay = match m {
            game::Move::FlipStock => game::flip_stock(&replay).unwrap(),
            game::Move::Card(request) => game::apply_move(&replay, &request).unwrap(),
        };
    }
    assert_eq!(replay.layout_fingerprint(), solution.layout_fingerprint());
    assert_eq!(replay.score, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_store_failure_aborts_run() {
    let faulty = FaultyFrontier::new().fail_inserts_after(0, Fault::Store);
    let game_id = faulty.create_game().await.unwrap();
    faulty
        .seed(GameState::deal_seeded(game_id, 3))
        .await
        .unwrap();

    let (_tx, rx) = never_shutdown();
    let result = SearchEngine::new(quick_config(2))
        .run(Arc::new(faulty), game_id, rx)
        .await;
    assert!(matches!(result, Err(SearchError::Frontier(_))));
}

#[tokio::test]
async fn test_duplicates_are_skipped_not_fatal() {
    let faulty = FaultyFrontier::new().fail_inserts_after(0, Fault::Duplicate);
    let game_id = faulty.create_game().await.unwrap();
    faulty
        .seed(GameState::deal_seeded(game_id, 4))
        .await
        .unwrap();

    let (_tx, rx) = never_shutdown();
    let outcome = SearchEngine::new(quick_config(1))
        .run(Arc::new(faulty), game_id, rx)
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::Exhausted);
    assert_eq!(outcome.stats.expansions, 1);
    assert_eq!(outcome.stats.children_inserted, 0);
    assert!(outcome.stats.duplicates_skipped >= 1);
}

#[tokio::test]
async fn test_transient_empty_claims_are_retried() {
    let faulty = FaultyFrontier::new().with_empty_claims(2);
    let game_id = faulty.create_game().await.unwrap();
    faulty
        .seed(GameState::deal_seeded(game_id, 6))
        .await
        .unwrap();

    let config = SearchConfig {
        max_expansions: 3,
        ..quick_config(1)
    };
    let (_tx, rx) = never_shutdown();
    let outcome = SearchEngine::new(config)
        .run(Arc::new(faulty), game_id, rx)
        .await
        .unwrap();
    assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
    assert_eq!(outcome.stats.claim_retries, 2);
    assert_eq!(outcome.stats.expansions, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_signal_drains_workers() {
    let inner: Arc<dyn Frontier> = Arc::new(MemoryFrontier::default());
    let counting = CountingFrontier::new(Arc::clone(&inner));
    let calls = counting.counts_handle();
    let game_id = inner.create_game().await.unwrap();
    inner
        .insert(GameState::deal_seeded(game_id, 8))
        .await
        .unwrap();

    let (tx, rx) = watch::channel(false);
    // The budget only bounds the run if shutdown never gets through.
    let engine = SearchEngine::new(SearchConfig {
        max_expansions: 100_000,
        ..quick_config(2)
    });
    let run = tokio::spawn(async move { engine.run(Arc::new(counting), game_id, rx).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(true).unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(10), run)
        .await
        .expect("workers drain after shutdown")
        .unwrap()
        .unwrap();

    assert_eq!(outcome.reason, TerminationReason::Shutdown);
    // Every expanded state was marked processed; nothing is left claimed.
    let counts = inner.counts(game_id).await.unwrap();
    assert_eq!(counts.claimed, 0);
    assert_eq!(counts.processed as u64, outcome.stats.expansions);
    assert_eq!(calls.processed() as u64, outcome.stats.expansions);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_from_task_with_every_thread_searching() {
    let frontier: Arc<dyn Frontier> = Arc::new(MemoryFrontier::default());
    let game_id = frontier.create_game().await.unwrap();
    frontier
        .insert(GameState::deal_seeded(game_id, 2024))
        .await
        .unwrap();

    let (tx, rx) = watch::channel(false);
    let fired = Arc::new(AtomicBool::new(false));
    let signal = {
        let fired = Arc::clone(&fired);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fired.store(true, Ordering::SeqCst);
            tx.send_replace(true);
        })
    };

    // As many workers as runtime threads, and a frontier that never runs dry.
    let engine = SearchEngine::new(SearchConfig {
        max_expansions: 100_000,
        ..quick_config(2)
    });
    let outcome = engine.run(Arc::clone(&frontier), game_id, rx).await.unwrap();
    signal.await.unwrap();

    assert!(fired.load(Ordering::SeqCst));
    assert_eq!(outcome.reason, TerminationReason::Shutdown);
    assert!(outcome.stats.expansions < 100_000);
    assert_eq!(frontier.counts(game_id).await.unwrap().claimed, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_journal_run_can_resume() {
    let dir = TempDir::new().unwrap();
    let store = StoreConfig {
        path: dir.path().join("resume.jsonl"),
        ..StoreConfig::default()
    };

    let (game_id, first_expansions) = {
        let frontier: Arc<dyn Frontier> = Arc::new(JournalFrontier::open(&store).unwrap());
        let game_id = frontier.create_game().await.unwrap();
        frontier
            .insert(GameState::deal_seeded(game_id, 9))
            .await
            .unwrap();
        let config = SearchConfig {
            max_expansions: 4,
            ..quick_config(1)
        };
        let (_tx, rx) = never_shutdown();
        let outcome = SearchEngine::new(config)
            .run(frontier, game_id, rx)
            .await
            .unwrap();
        assert_eq!(outcome.reason, TerminationReason::BudgetExhausted);
        (game_id, outcome.stats.expansions)
    };

    let frontier: Arc<dyn Frontier> = Arc::new(JournalFrontier::open(&store).unwrap());
    assert_eq!(frontier.latest_game().await.unwrap(), Some(game_id));
    let before = frontier.counts(game_id).await.unwrap();
    assert_eq!(before.processed as u64, first_expansions);
    assert_eq!(before.claimed, 0);

    let config = SearchConfig {
        max_expansions: 2,
        ..quick_config(1)
    };
    let (_tx, rx) = never_shutdown();
    SearchEngine::new(config)
        .run(Arc::clone(&frontier), game_id, rx)
        .await
        .unwrap();
    let after = frontier.counts(game_id).await.unwrap();
    assert_eq!(after.processed as u64, first_expansions + 2);
}
