//! Epoch and seed derivation, cache and DAG construction, and the
//! hashimoto mixing loop for the Ethash proof-of-work engine.
//!
//! This crate is deliberately ignorant of blocks, difficulty and mining —
//! see the `ethash` and `ethash-mining` crates for those. It only knows how
//! to turn a block number into a seed, a seed into a cache, a cache into a
//! dataset, and a dataset (or cache) plus a header hash and nonce into a
//! hashimoto result.

pub mod cache;
pub mod dataset;
pub mod epoch;
pub mod error;
pub mod hashimoto;
pub mod persistence;

pub use cache::{build_cache, Cache};
pub use dataset::{build_dataset, compute_item, Dataset, ProgressCallback};
pub use epoch::{epoch, params_for, seed_for_epoch, seed_hash, Params, EPOCH_LENGTH, MAX_BLOCK_NUMBER};
pub use error::CoreError;
pub use hashimoto::{hashimoto, hashimoto_full, hashimoto_light, FullSource, HashimotoResult, ItemPairSource, LightSource};
pub use persistence::open_or_build;

#[cfg(test)]
pub(crate) mod test_support {
    /// Lower-case hex encoding, used only by this crate's own tests (the
    /// `ethash-util` crate owns the public-facing hex helpers).
    pub fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
