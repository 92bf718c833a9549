use std::path::PathBuf;
use std::time::Duration;

/// Frontier store configuration loaded from the `[store]` TOML section.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct StoreConfig {
    /// Journal file for the durable store.
    #[serde(default = "default_path")]
    pub path: PathBuf,

    /// Seconds before a claimed-but-unfinished state may be claimed again.
    /// 0 disables reclaiming.
    #[serde(default = "default_lease_timeout_secs")]
    pub lease_timeout_secs: u64,

    /// Reject inserts whose card layout is already known for the game.
    #[serde(default)]
    pub dedup_layouts: bool,

    /// fsync the journal after every appended record.
    #[serde(default)]
    pub sync_every_write: bool,
}

fn default_path() -> PathBuf {
    PathBuf::from("data/forty-thieves.jsonl")
}
fn default_lease_timeout_secs() -> u64 {
    300
}

impl StoreConfig {
    /// The lease as a duration, `None` when leases never expire.
    pub fn lease_timeout(&self) -> Option<Duration> {
        (self.lease_timeout_secs > 0).then(|| Duration::from_secs(self.lease_timeout_secs))
    }

    /// Log warnings for settings that are legal but likely unintended.
    pub fn validate(&self) {
        if self.lease_timeout_secs == 0 {
            tracing::warn!(
                "lease_timeout_secs = 0: states claimed by a crashed worker will never be revisited"
            );
        } else if self.lease_timeout_secs < 5 {
            tracing::warn!(
                lease_timeout_secs = self.lease_timeout_secs,
                "very short lease; slow expansions may be claimed twice"
            );
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            lease_timeout_secs: default_lease_timeout_secs(),
            dedup_layouts: false,
            sync_every_write: false,
        }
    }
}
