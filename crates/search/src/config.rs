use std::num::NonZeroUsize;

/// Search configuration loaded from the `[search]` TOML section.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SearchConfig {
    /// Concurrent workers. `None` uses the available hardware parallelism.
    #[serde(default)]
    pub num_workers: Option<usize>,

    /// Empty-frontier retries before a worker checks for exhaustion.
    #[serde(default = "default_claim_retries")]
    pub claim_retries: u32,

    /// Initial backoff between empty claims, doubled per retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Backoff cap.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Stop after this many expansions across all workers. 0 = unbounded.
    #[serde(default)]
    pub max_expansions: u64,

    /// Skip moves that take a card off a foundation.
    #[serde(default = "default_true")]
    pub prune_foundation_moves: bool,

    /// Tell every worker to stop once one of them claims a solved state.
    #[serde(default = "default_true")]
    pub stop_on_solution: bool,
}

fn default_claim_retries() -> u32 {
    5
}
fn default_retry_backoff_ms() -> u64 {
    50
}
fn default_max_backoff_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}

impl SearchConfig {
    /// Worker count after resolving the hardware default. Never 0.
    pub fn effective_workers(&self) -> usize {
        match self.num_workers {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }

    /// Log warnings for settings that are legal but likely unintended.
    pub fn validate(&self) {
        if self.num_workers == Some(0) {
            tracing::warn!("num_workers = 0, falling back to available parallelism");
        }
        if self.retry_backoff_ms > self.max_backoff_ms {
            tracing::warn!(
                retry_backoff_ms = self.retry_backoff_ms,
                max_backoff_ms = self.max_backoff_ms,
                "initial backoff exceeds the cap; every retry will wait max_backoff_ms"
            );
        }
        if self.claim_retries == 0 {
            tracing::warn!("claim_retries = 0: a momentarily empty frontier is checked for exhaustion immediately");
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            num_workers: None,
            claim_retries: default_claim_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_expansions: 0,
            prune_foundation_moves: true,
            stop_on_solution: true,
        }
    }
}
