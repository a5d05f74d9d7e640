use thiserror::Error;

#[derive(Error, Debug)]
pub enum MiningError {
    #[error(transparent)]
    Engine(#[from] ethash::EngineError),

    #[error(transparent)]
    Core(#[from] ethash_core::CoreError),
}
