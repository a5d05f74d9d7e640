//! Block-facing Ethash engine: epoch lifecycle management, the `PowBlock`
//! contract a host chain implements, and proof-of-work verification.
//!
//! Mining (searching for a nonce) lives in the separate `ethash-mining`
//! crate, which drives this engine's `ensure_dataset` to get a full dataset
//! to mine against.

pub mod block;
pub mod config;
pub mod engine;
pub mod error;
pub mod verify;

pub use block::PowBlock;
pub use config::EngineConfig;
pub use engine::{EthashEngine, Slot};
pub use error::EngineError;
pub use verify::verify_block;

pub use ethash_core::EPOCH_LENGTH;
