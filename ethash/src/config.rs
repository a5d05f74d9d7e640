use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine-wide settings. Loading these from a config file or CLI flags is
/// the embedder's responsibility — this crate only consumes the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory persisted DAG files are read from and written to.
    pub dag_dir: PathBuf,

    /// Worker threads used when building a cache or dataset.
    pub build_threads: usize,

    /// Number of upcoming epochs to pre-build datasets for, ahead of the
    /// block height actually reaching them. `0` disables pre-building;
    /// the dataset is then built lazily on first use, per epoch.
    pub epochs_ahead: u8,

    /// When `false`, searchers in `ethash-mining` yield briefly between
    /// nonce attempts instead of running a tight loop. Read by that crate,
    /// not by this one; kept here since it is one engine-wide setting.
    pub turbo: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            dag_dir: PathBuf::from("ethash-dag"),
            build_threads: num_cpus(),
            epochs_ahead: 0,
            turbo: true,
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
