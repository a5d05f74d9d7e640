//! The mining loop (component I): a random-start, strictly-increasing nonce
//! search over the shared full dataset, sharded across threads with rayon —
//! the same parallel-search shape as the teacher's `CpuMiner::mine_job`,
//! generalized from KAWPOW's job-template loop to Ethash's
//! `hashimoto_full`, and with its `running: Arc<AtomicBool>` flag kept as
//! the cancellation mechanism (it already fits the redesign's "shared
//! atomic flag" requirement, so nothing about it needed to change).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use rayon::prelude::*;

use ethash::{EthashEngine, PowBlock};
use ethash_core::hashimoto::hashimoto_full;

use crate::error::MiningError;
use crate::stats::MiningStats;

/// A nonce/mix-digest pair satisfying the block's difficulty target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u64,
    pub mix_hash: [u8; 32],
    pub result: [u8; 32],
}

/// How often (in local, unshared hashes) a searcher thread flushes its
/// count into the shared [`MiningStats`] — keeps the atomic add off the
/// hot per-nonce path.
const STATS_FLUSH_BATCH: u64 = 4096;

const TURBO_OFF_SLEEP: Duration = Duration::from_micros(20);

/// Searches for a nonce solving `block` against `engine`'s dataset for its
/// epoch, sharding the nonce space across `threads` workers. Blocks until a
/// solution is found or `cancel` is observed set; every worker checks
/// `cancel` at least once per nonce, so it returns promptly after
/// cancellation. Dataset construction (on first use of a new epoch) is not
/// cancellable and happens before any worker starts.
pub fn search(
    engine: &EthashEngine,
    block: &impl PowBlock,
    threads: usize,
    cancel: &AtomicBool,
    stats: &MiningStats,
) -> Result<Option<Solution>, MiningError> {
    let epoch = ethash_core::epoch::epoch(block.number())?;
    let dataset = engine.ensure_dataset(epoch)?;
    let header_hash = block.hash_no_nonce();
    let target = ethash_util::difficulty_to_target(block.difficulty());
    let turbo = engine.config().turbo;
    let threads = threads.max(1);

    let solution = (0..threads).into_par_iter().find_map_any(|shard| {
        // Thread-local random start, salted by shard so siblings don't
        // retrace each other's early nonces.
        let mut nonce: u64 = rand::thread_rng().gen();
        nonce = nonce.wrapping_add((shard as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));

        let mut unflushed = 0u64;
        loop {
            if cancel.load(Ordering::Relaxed) {
                stats.record(unflushed);
                return None;
            }

            let outcome = hashimoto_full(&dataset, &header_hash, nonce);
            unflushed += 1;

            if ethash_util::be_bytes_to_u256(&outcome.result) <= target {
                stats.record(unflushed);
                return Some(Solution {
                    nonce,
                    mix_hash: outcome.mix_hash,
                    result: outcome.result,
                });
            }

            if unflushed >= STATS_FLUSH_BATCH {
                stats.record(unflushed);
                unflushed = 0;
            }

            nonce = nonce.wrapping_add(1);
            if !turbo {
                std::thread::sleep(TURBO_OFF_SLEEP);
            }
        }
    });

    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethash::EngineConfig;
    use primitive_types::U256;

    struct FakeBlock {
        number: u64,
        header_hash: [u8; 32],
        difficulty: U256,
    }

    impl PowBlock for FakeBlock {
        fn number(&self) -> u64 {
            self.number
        }
        fn hash_no_nonce(&self) -> [u8; 32] {
            self.header_hash
        }
        fn nonce(&self) -> u64 {
            0
        }
        fn mix_digest(&self) -> [u8; 32] {
            [0u8; 32]
        }
        fn difficulty(&self) -> U256 {
            self.difficulty
        }
    }

    fn test_engine() -> EthashEngine {
        EthashEngine::new(EngineConfig {
            dag_dir: std::env::temp_dir().join("ethash-search-tests-unused"),
            build_threads: 1,
            epochs_ahead: 0,
            turbo: true,
        })
    }

    #[test]
    fn finds_a_solution_against_trivial_difficulty() {
        let engine = test_engine();
        let block = FakeBlock {
            number: 0,
            header_hash: [1u8; 32],
            difficulty: U256::one(),
        };
        let cancel = AtomicBool::new(false);
        let stats = MiningStats::new();
        let solution = search(&engine, &block, 2, &cancel, &stats).unwrap();
        assert!(solution.is_some());
        assert!(stats.total_hashes() >= 1);
    }

    #[test]
    fn cancellation_stops_the_search_promptly() {
        let engine = test_engine();
        let block = FakeBlock {
            number: 0,
            header_hash: [2u8; 32],
            // Effectively unreachable difficulty, so the only way out is cancellation.
            difficulty: U256::MAX,
        };
        let cancel = AtomicBool::new(true);
        let stats = MiningStats::new();
        let solution = search(&engine, &block, 2, &cancel, &stats).unwrap();
        assert!(solution.is_none());
    }
}
