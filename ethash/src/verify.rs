//! Block verification (component J): the light (cache-only) path, since a
//! verifier should never need a multi-gigabyte dataset materialized just to
//! check a header.

use ethash_core::hashimoto::hashimoto_light;

use crate::block::PowBlock;
use crate::engine::EthashEngine;
use crate::error::EngineError;

/// Verifies `block`'s proof of work: recomputes hashimoto from the cache for
/// its epoch, checks the mix digest matches exactly, then checks the result
/// meets the claimed difficulty.
pub fn verify_block(engine: &EthashEngine, block: &impl PowBlock) -> Result<(), EngineError> {
    let epoch = ethash_core::epoch::epoch(block.number())?;
    let slot = engine.ensure_cache(epoch);

    let header_hash = block.hash_no_nonce();
    let outcome = hashimoto_light(&slot.cache, slot.n_dataset_items(), &header_hash, block.nonce());

    if outcome.mix_hash != block.mix_digest() {
        return Err(EngineError::MixMismatch);
    }
    if !ethash_util::meets_target(&outcome.result, block.difficulty()) {
        return Err(EngineError::BelowTarget);
    }
    Ok(())
}
