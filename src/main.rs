//! Ethash CLI - command-line front end for the proof-of-work engine
//!
//! This binary exposes the `ethash`/`ethash-mining` engine crates as three
//! subcommands: printing an epoch's seed hash, searching for a nonce
//! against a header hash and difficulty, and verifying a candidate
//! (header-hash, nonce, mix-digest) triple. It owns no chain state of its
//! own — per the engine's scope, block storage, networking and RPC are the
//! embedder's job.

use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};
use log::{error, info};
use primitive_types::U256;

use ethash::{EngineConfig, EthashEngine, PowBlock};
use ethash_mining::{search, MiningStats};

/// Command line arguments for the Ethash CLI
#[derive(Parser)]
#[clap(name = "ethash-cli")]
#[clap(about = "Ethash proof-of-work engine: epoch/DAG construction, mining and verification")]
struct Cli {
    /// Directory persisted DAG files are read from and written to.
    #[clap(long, value_name = "DIR")]
    dag_dir: Option<PathBuf>,

    /// Worker threads used when building a cache or dataset.
    #[clap(long)]
    build_threads: Option<usize>,

    /// Disable the tight mining loop; sleep briefly between nonce attempts.
    #[clap(long)]
    no_turbo: bool,

    /// Verbosity level (0-5)
    #[clap(short, long, default_value = "2")]
    verbosity: u8,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the seed hash for the epoch containing a block number.
    Seed {
        /// Block height.
        number: u64,
    },
    /// Search for a nonce solving a header hash at a given difficulty.
    Mine {
        /// Block height (selects the epoch's dataset).
        #[clap(long)]
        number: u64,
        /// Header hash without the nonce field, as 64 hex characters.
        #[clap(long)]
        header_hash: String,
        /// Target difficulty, as a decimal integer.
        #[clap(long)]
        difficulty: String,
        /// Number of searcher threads.
        #[clap(long, default_value = "1")]
        threads: usize,
    },
    /// Verify a candidate (header-hash, nonce, mix-digest) triple.
    Verify {
        /// Block height (selects the epoch's cache).
        #[clap(long)]
        number: u64,
        /// Header hash without the nonce field, as 64 hex characters.
        #[clap(long)]
        header_hash: String,
        /// Candidate nonce.
        #[clap(long)]
        nonce: u64,
        /// Claimed mix digest, as 64 hex characters.
        #[clap(long)]
        mix_digest: String,
        /// Difficulty the block claims to satisfy, as a decimal integer.
        #[clap(long)]
        difficulty: String,
    },
}

/// A block value assembled from CLI flags; implements the engine's minimal
/// block contract (`PowBlock`) without pulling in any chain or storage type.
struct CliBlock {
    number: u64,
    header_hash: [u8; 32],
    nonce: u64,
    mix_digest: [u8; 32],
    difficulty: U256,
}

impl PowBlock for CliBlock {
    fn number(&self) -> u64 {
        self.number
    }
    fn hash_no_nonce(&self) -> [u8; 32] {
        self.header_hash
    }
    fn nonce(&self) -> u64 {
        self.nonce
    }
    fn mix_digest(&self) -> [u8; 32] {
        self.mix_digest
    }
    fn difficulty(&self) -> U256 {
        self.difficulty
    }
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();
}

fn parse_hash32(label: &str, s: &str) -> [u8; 32] {
    match ethash_util::hex_to_array::<32>(s) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("invalid {label} (expected 32 bytes of hex): {e}");
            process::exit(1);
        }
    }
}

fn parse_difficulty(s: &str) -> U256 {
    match U256::from_dec_str(s) {
        Ok(value) => value,
        Err(_) => {
            error!("invalid difficulty '{s}': expected a decimal integer");
            process::exit(1);
        }
    }
}

fn build_engine(cli: &Cli) -> EthashEngine {
    let default = EngineConfig::default();
    EthashEngine::new(EngineConfig {
        dag_dir: cli.dag_dir.clone().unwrap_or(default.dag_dir),
        build_threads: cli.build_threads.unwrap_or(default.build_threads),
        turbo: !cli.no_turbo,
        ..default
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match &cli.command {
        Commands::Seed { number } => {
            let seed = match ethash_core::seed_hash(*number) {
                Ok(seed) => seed,
                Err(e) => {
                    error!("{e}");
                    process::exit(1);
                }
            };
            println!("{}", ethash_util::bytes_to_hex(&seed));
        }

        Commands::Mine {
            number,
            header_hash,
            difficulty,
            threads,
        } => {
            let engine = build_engine(&cli);
            let block = CliBlock {
                number: *number,
                header_hash: parse_hash32("header-hash", header_hash),
                nonce: 0,
                mix_digest: [0u8; 32],
                difficulty: parse_difficulty(difficulty),
            };

            info!("building dataset for block {number}, then searching with {threads} thread(s)");
            let cancel = AtomicBool::new(false);
            let stats = MiningStats::new();
            match search(&engine, &block, *threads, &cancel, &stats) {
                Ok(Some(solution)) => {
                    println!("nonce={:#018x}", solution.nonce);
                    println!("mix_digest={}", ethash_util::bytes_to_hex(&solution.mix_hash));
                    println!("result={}", ethash_util::bytes_to_hex(&solution.result));
                }
                Ok(None) => {
                    info!("search cancelled without finding a solution");
                }
                Err(e) => {
                    error!("mining failed: {e}");
                    process::exit(1);
                }
            }
        }

        Commands::Verify {
            number,
            header_hash,
            nonce,
            mix_digest,
            difficulty,
        } => {
            let engine = build_engine(&cli);
            let block = CliBlock {
                number: *number,
                header_hash: parse_hash32("header-hash", header_hash),
                nonce: *nonce,
                mix_digest: parse_hash32("mix-digest", mix_digest),
                difficulty: parse_difficulty(difficulty),
            };

            match ethash::verify_block(&engine, &block) {
                Ok(()) => {
                    println!("valid");
                }
                Err(e) => {
                    println!("invalid: {e}");
                    process::exit(1);
                }
            }
        }
    }
}
