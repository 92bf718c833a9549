//! Durable frontier: an append-only JSON-lines journal replayed on open.
//!
//! Every mutation is one line:
//!
//! ```text
//! {"op":"game","game_id":1}
//! {"op":"insert","state":{...}}
//! {"op":"claim","state_id":"…","at_ms":1700000000000}
//! {"op":"release","state_id":"…"}
//! {"op":"processed","state_id":"…"}
//! ```
//!
//! The journal is owned by one process at a time. Claims still open in the
//! file when it is reopened belonged to a process that is gone, so they are
//! released during open.

use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use game::{GameId, GameState, StateId};

use crate::config::StoreConfig;
use crate::error::FrontierError;
use crate::store::{Frontier, FrontierCounts};
use crate::table::{now_ms, StateTable};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Record<'a> {
    Game { game_id: GameId },
    Insert { state: Cow<'a, GameState> },
    Claim { state_id: StateId, at_ms: u64 },
    Release { state_id: StateId },
    Processed { state_id: StateId },
}

struct Journal {
    table: StateTable,
    /// `None` when opened read-only.
    writer: Option<BufWriter<File>>,
    sync: bool,
}

impl Journal {
    fn append(&mut self, record: &Record<'_>) -> Result<(), FrontierError> {
        let writer = self.writer.as_mut().ok_or_else(read_only)?;
        let mut line = serde_json::to_vec(record).map_err(io::Error::from)?;
        line.push(b'\n');
        writer.write_all(&line)?;
        writer.flush()?;
        if self.sync {
            writer.get_ref().sync_data()?;
        }
        Ok(())
    }
}

/// What replay found at the end of the file.
#[derive(Debug, Default)]
struct ReplayTail {
    records: usize,
    /// Byte offset to truncate to when the last line was torn.
    truncate_at: Option<u64>,
    /// The last line parsed but had no newline.
    missing_newline: bool,
}

/// Frontier persisted to a JSON-lines journal.
pub struct JournalFrontier {
    journal: Arc<Mutex<Journal>>,
    path: PathBuf,
    lease_ms: Option<u64>,
}

impl JournalFrontier {
    /// Open (or create) the journal at `config.path` and replay it.
    pub fn open(config: &StoreConfig) -> Result<Self, FrontierError> {
        let path = config.path.clone();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut table = StateTable::new(config.dedup_layouts);
        let tail = if path.exists() {
            replay(&path, &mut table)?
        } else {
            ReplayTail::default()
        };

        if let Some(offset) = tail.truncate_at {
            tracing::warn!(
                path = %path.display(),
                offset,
                "Dropping torn final journal line"
            );
            OpenOptions::new().write(true).open(&path)?.set_len(offset)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        if tail.missing_newline {
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        let mut journal = Journal {
            table,
            writer: Some(writer),
            sync: config.sync_every_write,
        };

        let orphaned = journal.table.claimed_ids();
        for &id in &orphaned {
            journal.table.release(id);
            journal.append(&Record::Release { state_id: id })?;
        }
        if !orphaned.is_empty() {
            tracing::warn!(
                count = orphaned.len(),
                "Released claims left open by a previous run"
            );
        }

        tracing::info!(
            path = %path.display(),
            records = tail.records,
            latest_game = ?journal.table.latest_game(),
            "Opened frontier journal"
        );

        Ok(Self {
            journal: Arc::new(Mutex::new(journal)),
            path,
            lease_ms: config.lease_timeout().map(|d| d.as_millis() as u64),
        })
    }

    /// Replay the journal without taking ownership of it.
    ///
    /// Safe while another process is appending. Nothing is truncated or
    /// released, and every mutation fails with a store error.
    pub fn open_read_only(config: &StoreConfig) -> Result<Self, FrontierError> {
        let path = config.path.clone();
        let mut table = StateTable::new(config.dedup_layouts);
        let tail = replay(&path, &mut table)?;
        tracing::info!(
            path = %path.display(),
            records = tail.records,
            "Opened frontier journal read-only"
        );
        Ok(Self {
            journal: Arc::new(Mutex::new(Journal {
                table,
                writer: None,
                sync: false,
            })),
            path,
            lease_ms: None,
        })
    }

    /// Override the claim lease (`None` = never expire).
    pub fn with_lease_timeout(mut self, lease: Option<Duration>) -> Self {
        self.lease_ms = lease.map(|d| d.as_millis() as u64);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a journal mutation on the blocking pool.
    ///
    /// Appends write and flush (and optionally fsync) under the lock, which
    /// must not happen on a runtime worker thread.
    async fn mutate<T, F>(&self, op: F) -> Result<T, FrontierError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Journal) -> Result<T, FrontierError> + Send + 'static,
    {
        let journal = Arc::clone(&self.journal);
        tokio::task::spawn_blocking(move || {
            let mut journal = journal.lock().unwrap_or_else(PoisonError::into_inner);
            if journal.writer.is_none() {
                return Err(read_only());
            }
            op(&mut journal)
        })
        .await
        .map_err(|e| FrontierError::Store(io::Error::new(io::ErrorKind::Other, e)))?
    }
}

fn replay(path: &Path, table: &mut StateTable) -> Result<ReplayTail, FrontierError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut tail = ReplayTail::default();
    let mut offset = 0u64;
    let mut line_no = 0usize;
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        let complete = line.ends_with('\n');
        let text = line.trim();
        if text.is_empty() {
            offset += read as u64;
            continue;
        }

        let record: Record<'static> = match serde_json::from_str(text) {
            Ok(record) => record,
            Err(_) if !complete => {
                tail.truncate_at = Some(offset);
                break;
            }
            Err(e) => {
                return Err(FrontierError::Corrupt {
                    path: path.to_path_buf(),
                    line: line_no,
                    reason: e.to_string(),
                })
            }
        };
        apply(table, record).map_err(|e| FrontierError::Corrupt {
            path: path.to_path_buf(),
            line: line_no,
            reason: e.to_string(),
        })?;
        tail.records += 1;
        tail.missing_newline = !complete;
        offset += read as u64;
    }
    Ok(tail)
}

fn read_only() -> FrontierError {
    FrontierError::Store(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "journal opened read-only",
    ))
}

fn apply(table: &mut StateTable, record: Record<'_>) -> Result<(), FrontierError> {
    match record {
        Record::Game { game_id } => table.register_game(game_id),
        Record::Insert { state } => {
            let state = state.into_owned();
            if !table.contains(state.state_id) {
                table.admit(state);
            }
        }
        Record::Claim { state_id, at_ms } => table.apply_claim(state_id, at_ms)?,
        Record::Release { state_id } => table.release(state_id),
        Record::Processed { state_id } => table.mark_processed(state_id)?,
    }
    Ok(())
}

#[async_trait]
impl Frontier for JournalFrontier {
    async fn create_game(&self) -> Result<GameId, FrontierError> {
        self.mutate(|journal| {
            let game_id = journal.table.create_game();
            journal.append(&Record::Game { game_id })?;
            Ok(game_id)
        })
        .await
    }

    async fn latest_game(&self) -> Result<Option<GameId>, FrontierError> {
        Ok(self.journal().table.latest_game())
    }

    async fn insert(&self, state: GameState) -> Result<(), FrontierError> {
        self.mutate(move |journal| {
            journal.table.check_insert(&state)?;
            journal.append(&Record::Insert {
                state: Cow::Borrowed(&state),
            })?;
            journal.table.admit(state);
            Ok(())
        })
        .await
    }

    async fn claim_next(&self, game_id: GameId) -> Result<Option<GameState>, FrontierError> {
        let lease_ms = self.lease_ms;
        self.mutate(move |journal| {
            let now = now_ms();
            let claim = journal.table.claim_next(game_id, now, lease_ms);
            for &state_id in &claim.reclaimed {
                journal.append(&Record::Release { state_id })?;
            }
            if !claim.reclaimed.is_empty() {
                tracing::warn!(
                    game_id = %game_id,
                    count = claim.reclaimed.len(),
                    "Reclaimed states with expired leases"
                );
            }
            if let Some(state) = &claim.state {
                journal.append(&Record::Claim {
                    state_id: state.state_id,
                    at_ms: now,
                })?;
            }
            Ok(claim.state)
        })
        .await
    }

    async fn mark_processed(&self, state_id: StateId) -> Result<(), FrontierError> {
        self.mutate(move |journal| {
            journal.table.mark_processed(state_id)?;
            journal.append(&Record::Processed { state_id })
        })
        .await
    }

    async fn children(&self, state_id: StateId) -> Result<Vec<StateId>, FrontierError> {
        Ok(self.journal().table.children(state_id))
    }

    async fn root(&self, game_id: GameId) -> Result<GameState, FrontierError> {
        self.journal().table.root(game_id)
    }

    async fn get(&self, state_id: StateId) -> Result<GameState, FrontierError> {
        self.journal().table.get(state_id)
    }

    async fn counts(&self, game_id: GameId) -> Result<FrontierCounts, FrontierError> {
        Ok(self.journal().table.counts(game_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game::{flip_stock, StateStatus};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> StoreConfig {
        StoreConfig {
            path: dir.path().join("frontier.jsonl"),
            ..StoreConfig::default()
        }
    }

    #[tokio::test]
    async fn test_reopen_restores_states_and_status() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let (game_id, root, child) = {
            let frontier = JournalFrontier::open(&config).unwrap();
            let game_id = frontier.create_game().await.unwrap();
            let root = GameState::deal_seeded(game_id, 17);
            let child = flip_stock(&root).unwrap();
            frontier.insert(root.clone()).await.unwrap();
            let claimed = frontier.claim_next(game_id).await.unwrap().unwrap();
            assert_eq!(claimed.state_id, root.state_id);
            frontier.insert(child.clone()).await.unwrap();
            frontier.mark_processed(root.state_id).await.unwrap();
            (game_id, root, child)
        };

        let frontier = JournalFrontier::open(&config).unwrap();
        assert_eq!(frontier.latest_game().await.unwrap(), Some(game_id));
        assert_eq!(frontier.root(game_id).await.unwrap().state_id, root.state_id);
        assert_eq!(
            frontier.get(root.state_id).await.unwrap().status,
            StateStatus::Processed
        );
        assert_eq!(
            frontier.children(root.state_id).await.unwrap(),
            vec![child.state_id]
        );
        let counts = frontier.counts(game_id).await.unwrap();
        assert_eq!((counts.unprocessed, counts.claimed, counts.processed), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_open_claims_are_released_on_reopen() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let root = GameState::deal_seeded(GameId(1), 3);
        {
            let frontier = JournalFrontier::open(&config).unwrap();
            frontier.insert(root.clone()).await.unwrap();
            frontier.claim_next(GameId(1)).await.unwrap().unwrap();
        }

        let frontier = JournalFrontier::open(&config).unwrap();
        let counts = frontier.counts(GameId(1)).await.unwrap();
        assert_eq!((counts.unprocessed, counts.claimed), (1, 0));
        let again = frontier.claim_next(GameId(1)).await.unwrap().unwrap();
        assert_eq!(again.state_id, root.state_id);
    }

    #[tokio::test]
    async fn test_torn_last_line_is_dropped() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let root = GameState::deal_seeded(GameId(1), 5);
        {
            let frontier = JournalFrontier::open(&config).unwrap();
            frontier.insert(root.clone()).await.unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&config.path).unwrap();
        file.write_all(br#"{"op":"insert","state":{"game_id":1,"#).unwrap();
        drop(file);

        let frontier = JournalFrontier::open(&config).unwrap();
        assert_eq!(frontier.get(root.state_id).await.unwrap(), root);
        let child = flip_stock(&root).unwrap();
        frontier.insert(child.clone()).await.unwrap();
        drop(frontier);

        // The journal must still be well formed after writing past the tear.
        let frontier = JournalFrontier::open(&config).unwrap();
        assert!(frontier.get(child.state_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        {
            let frontier = JournalFrontier::open(&config).unwrap();
            frontier.create_game().await.unwrap();
        }
        let mut file = OpenOptions::new().append(true).open(&config.path).unwrap();
        file.write_all(b"not json\n{\"op\":\"game\",\"game_id\":2}\n")
            .unwrap();
        drop(file);

        match JournalFrontier::open(&config) {
            Err(FrontierError::Corrupt { line, .. }) => assert_eq!(line, 2),
            Err(other) => panic!("expected Corrupt, got {other}"),
            Ok(_) => panic!("expected Corrupt, got a frontier"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_insert_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let frontier = JournalFrontier::open(&config).unwrap();
        let root = GameState::deal_seeded(GameId(1), 8);
        frontier.insert(root.clone()).await.unwrap();
        let len_before = fs::metadata(&config.path).unwrap().len();
        assert!(frontier.insert(root).await.unwrap_err().is_duplicate());
        assert_eq!(fs::metadata(&config.path).unwrap().len(), len_before);
    }

    #[tokio::test]
    async fn test_read_only_open_sees_state_and_refuses_writes() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        let writer = JournalFrontier::open(&config).unwrap();
        let root = GameState::deal_seeded(GameId(1), 21);
        writer.insert(root.clone()).await.unwrap();
        writer.claim_next(GameId(1)).await.unwrap().unwrap();
        let len_before = fs::metadata(&config.path).unwrap().len();

        let reader = JournalFrontier::open_read_only(&config).unwrap();
        assert_eq!(reader.counts(GameId(1)).await.unwrap().claimed, 1);
        assert!(matches!(
            reader.claim_next(GameId(1)).await,
            Err(FrontierError::Store(_))
        ));
        assert!(reader.insert(flip_stock(&root).unwrap()).await.is_err());
        assert_eq!(fs::metadata(&config.path).unwrap().len(), len_before);
    }

    #[tokio::test]
    async fn test_writes_leave_the_runtime_free() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            sync_every_write: true,
            ..config_in(&dir)
        };
        let frontier = JournalFrontier::open(&config).unwrap();

        // Single-threaded runtime: the ticker only runs if inserts suspend.
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };
        for seed in 0..20 {
            frontier
                .insert(GameState::deal_seeded(GameId(1), seed))
                .await
                .unwrap();
        }
        ticker.abort();
        assert!(ticks.load(Ordering::SeqCst) > 0);
        assert_eq!(frontier.counts(GameId(1)).await.unwrap().unprocessed, 20);
    }

    #[tokio::test]
    async fn test_read_only_open_of_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            JournalFrontier::open_read_only(&config_in(&dir)),
            Err(FrontierError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            path: dir.path().join("nested/deeper/frontier.jsonl"),
            ..StoreConfig::default()
        };
        let frontier = JournalFrontier::open(&config).unwrap();
        assert_eq!(frontier.create_game().await.unwrap(), GameId(1));
        assert!(config.path.exists());
    }
}
