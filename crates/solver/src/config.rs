//! TOML config loading for the solver CLI.
//!
//! Deserializes `configs/solver.toml` which has `[search]` and `[store]` sections,
//! then merges with CLI overrides.

use std::path::{Path, PathBuf};

use frontier::StoreConfig;
use search::SearchConfig;
use serde::Deserialize;

/// Config file used when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "configs/solver.toml";

/// Top-level structure matching `configs/solver.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct SolverToml {
    /// Worker pool and search policy.
    #[serde(default)]
    pub search: SearchConfig,
    /// Frontier store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Load and deserialize a `SolverToml` from a TOML file.
pub fn load_solver_toml(path: &Path) -> anyhow::Result<SolverToml> {
    let contents = std::fs::read_to_string(path)?;
    let config: SolverToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded solver config");
    Ok(config)
}

/// Load `explicit` if given, else the default config file if present, else
/// built-in defaults.
pub fn resolve_solver_toml(explicit: Option<&Path>) -> anyhow::Result<SolverToml> {
    match explicit {
        Some(path) => load_solver_toml(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_solver_toml(default)
            } else {
                tracing::debug!("No config file, using defaults");
                Ok(SolverToml::default())
            }
        }
    }
}

/// CLI flags that override TOML values.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub workers: Option<usize>,
    pub store: Option<PathBuf>,
}

/// Priority chain: built-in defaults < TOML values < CLI flags.
pub fn apply_overrides(mut config: SolverToml, overrides: &Overrides) -> SolverToml {
    if let Some(n) = overrides.workers {
        config.search.num_workers = Some(n);
    }
    if let Some(path) = &overrides.store {
        config.store.path = path.clone();
    }
    config
}
