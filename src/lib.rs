// xCrack Bundle Searcher Library

pub mod blockchain;
pub mod config;
pub mod constants;
pub mod core;
pub mod flashbots;
pub mod mocks;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use core::{SearcherCore, SearcherStatus};
pub use types::{MevError, MevResult};
