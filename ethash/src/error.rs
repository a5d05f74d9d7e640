use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] ethash_core::CoreError),

    #[error("mix digest does not match the recomputed hashimoto result")]
    MixMismatch,

    #[error("hashimoto result does not meet the block's difficulty target")]
    BelowTarget,
}
