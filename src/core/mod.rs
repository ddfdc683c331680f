pub mod scanner;
pub mod profitability;
pub mod bundle_builder;
pub mod bundle_submitter;
pub mod scheduler;
pub mod status;
pub mod searcher_core;

pub use scanner::{CandidateFilter, OpportunityScanner, ScanReport};
pub use profitability::{EstimationPolicy, FixedShareEstimation, ProfitEstimator};
pub use bundle_builder::{BundleBuilder, BundleParams};
pub use bundle_submitter::BundleSubmitter;
pub use scheduler::{CycleOutcome, ScanScheduler};
pub use status::{RunStats, SearcherStatus, StatusBoard};
pub use searcher_core::SearcherCore;
