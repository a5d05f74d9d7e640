//! Epoch lifecycle management (component H): keeps a bounded window of
//! `{current, previous}` epoch caches resident, builds datasets lazily and
//! persists them, and answers verification requests for any epoch —
//! including ones outside the retained window.
//!
//! Lock discipline (redesign note 9): `slots` is held only to read or
//! install a finished `Slot`, never across a cache or dataset build. A
//! build runs entirely outside the lock; if two callers race to build the
//! same epoch, both builds complete and the loser's result is discarded —
//! wasted CPU, never a correctness problem, and vanishingly rare in
//! practice since epoch transitions are far apart relative to build time.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use log::{debug, info};

use ethash_core::{build_cache, epoch::params_for, seed_for_epoch, Cache, Dataset, Params};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Resident resources for one epoch: always a cache, a dataset built and
/// persisted on first need.
pub struct Slot {
    pub epoch: u64,
    pub seed: [u8; 32],
    pub params: Params,
    pub cache: Arc<Cache>,
    dataset: Mutex<Option<Arc<Dataset>>>,
}

impl Slot {
    fn build(epoch: u64) -> Arc<Slot> {
        let seed = seed_for_epoch(epoch);
        let params = params_for(epoch);
        let cache = Arc::new(build_cache(params, &seed));
        Arc::new(Slot {
            epoch,
            seed,
            params,
            cache,
            dataset: Mutex::new(None),
        })
    }

    /// `n_full`, the dataset item count implied by this epoch's params —
    /// what the light hashimoto path needs even without a materialized
    /// dataset.
    pub fn n_dataset_items(&self) -> usize {
        self.params.full_size as usize / 64
    }
}

#[derive(Default)]
struct Slots {
    current: Option<Arc<Slot>>,
    previous: Option<Arc<Slot>>,
}

/// Owns the bounded cache/dataset retention window and hands out resources
/// for verification and mining.
pub struct EthashEngine {
    config: EngineConfig,
    slots: RwLock<Slots>,
}

impl EthashEngine {
    pub fn new(config: EngineConfig) -> Self {
        EthashEngine {
            config,
            slots: RwLock::new(Slots::default()),
        }
    }

    fn lookup(&self, epoch: u64) -> Option<Arc<Slot>> {
        let slots = self.slots.read().expect("slots lock poisoned");
        if slots.current.as_ref().is_some_and(|s| s.epoch == epoch) {
            return slots.current.clone();
        }
        if slots.previous.as_ref().is_some_and(|s| s.epoch == epoch) {
            return slots.previous.clone();
        }
        None
    }

    /// Installs `built` into the retention window, unless a racing caller
    /// already did. Epochs newer than the current slot advance the window
    /// (current becomes previous); an epoch exactly one behind current
    /// backfills previous; anything older is historical-transient and is
    /// simply returned without being retained.
    fn install(&self, built: Arc<Slot>) -> Arc<Slot> {
        let mut slots = self.slots.write().expect("slots lock poisoned");

        if let Some(cur) = &slots.current {
            if cur.epoch == built.epoch {
                return cur.clone();
            }
        }
        if let Some(prev) = &slots.previous {
            if prev.epoch == built.epoch {
                return prev.clone();
            }
        }

        match &slots.current {
            None => {
                slots.current = Some(built.clone());
            }
            Some(cur) if built.epoch > cur.epoch => {
                debug!("epoch {} supersedes current epoch {}", built.epoch, cur.epoch);
                slots.previous = slots.current.take();
                slots.current = Some(built.clone());
            }
            Some(cur) if built.epoch + 1 == cur.epoch => {
                slots.previous = Some(built.clone());
            }
            _ => {
                debug!(
                    "epoch {} is historical-transient, not retained",
                    built.epoch
                );
                return built;
            }
        }
        built
    }

    /// Returns the cache (and epoch parameters) for `epoch`, building it if
    /// it is neither the current nor previous epoch. Building runs outside
    /// any lock.
    pub fn ensure_cache(&self, epoch: u64) -> Arc<Slot> {
        if let Some(slot) = self.lookup(epoch) {
            return slot;
        }
        let built = Slot::build(epoch);
        self.install(built)
    }

    /// Returns the full dataset for `epoch`, reading it from
    /// `self.config.dag_dir` if a matching file is already there, else
    /// building and persisting it. The dataset is cached on the `Slot`
    /// itself so repeated calls for the same still-resident epoch are free.
    pub fn ensure_dataset(&self, epoch: u64) -> Result<Arc<Dataset>, EngineError> {
        let slot = self.ensure_cache(epoch);

        {
            let existing = slot.dataset.lock().expect("dataset lock poisoned");
            if let Some(dataset) = existing.as_ref() {
                return Ok(dataset.clone());
            }
        }

        info!("building dataset for epoch {} ({} bytes)", slot.epoch, slot.params.full_size);
        let dag_dir: PathBuf = self.config.dag_dir.clone();
        let threads = self.config.build_threads;
        let cache = slot.cache.clone();
        let params = slot.params;
        let seed = slot.seed;

        let dataset = ethash_core::open_or_build(&dag_dir, &seed, params, move || {
            ethash_core::build_dataset(&cache, params, threads, None)
        })?;
        let dataset = Arc::new(dataset);

        let mut guard = slot.dataset.lock().expect("dataset lock poisoned");
        if let Some(existing) = guard.as_ref() {
            return Ok(existing.clone());
        }
        *guard = Some(dataset.clone());
        Ok(dataset)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Spawns background threads to build and persist datasets for the
    /// `epochs_ahead` epochs following `current_epoch`, per §6's optional
    /// lookahead. A build failure is logged and simply retried the next
    /// time that epoch is actually needed — precomputation never surfaces
    /// an error to the caller (§7's background-precomputation policy).
    pub fn precompute_ahead(engine: &Arc<Self>, current_epoch: u64) {
        for offset in 1..=u64::from(engine.config.epochs_ahead) {
            let epoch = current_epoch + offset;
            let engine = engine.clone();
            std::thread::spawn(move || {
                if let Err(e) = engine.ensure_dataset(epoch) {
                    log::warn!("background precompute of epoch {epoch} failed: {e}");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EngineConfig {
        EngineConfig {
            dag_dir: std::env::temp_dir().join("ethash-engine-tests-unused"),
            build_threads: 1,
            epochs_ahead: 0,
            turbo: true,
        }
    }

    #[test]
    fn ensure_cache_reuses_current_slot() {
        let engine = EthashEngine::new(test_config());
        let a = engine.ensure_cache(5);
        let b = engine.ensure_cache(5);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn advancing_epoch_demotes_current_to_previous() {
        let engine = EthashEngine::new(test_config());
        let e5 = engine.ensure_cache(5);
        let e6 = engine.ensure_cache(6);
        let e5_again = engine.ensure_cache(5);
        assert!(Arc::ptr_eq(&e5, &e5_again));
        assert_ne!(e5.epoch, e6.epoch);
    }

    #[test]
    fn historical_epoch_is_not_retained() {
        let engine = EthashEngine::new(test_config());
        engine.ensure_cache(10);
        engine.ensure_cache(11);
        let old_a = engine.ensure_cache(1);
        let old_b = engine.ensure_cache(1);
        // Both calls succeed and agree on content, but are distinct builds.
        assert_eq!(old_a.epoch, old_b.epoch);
        assert!(!Arc::ptr_eq(&old_a, &old_b));
    }
}
