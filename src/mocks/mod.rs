pub mod chain_mock;
pub mod relay_mock;

pub use chain_mock::MockChainClient;
pub use relay_mock::{MockRelayClient, MockRelayOutcome};

use std::env;

/// Check if mock mode is enabled
pub fn is_mock_mode() -> bool {
    env::var("API_MODE").unwrap_or_default() == "mock"
}

/// Get mock configuration values
pub fn get_mock_config() -> MockConfig {
    MockConfig {
        chain_id: env::var("MOCK_CHAIN_ID")
            .unwrap_or_else(|_| "1337".to_string())
            .parse()
            .unwrap_or(1337),
        block_time: env::var("MOCK_BLOCK_TIME")
            .unwrap_or_else(|_| "12".to_string())
            .parse()
            .unwrap_or(12),
        base_fee: env::var("MOCK_BASE_FEE")
            .unwrap_or_else(|_| "15000000000".to_string())
            .parse()
            .unwrap_or(15_000_000_000u64),
        priority_fee: env::var("MOCK_PRIORITY_FEE")
            .unwrap_or_else(|_| "1000000000".to_string())
            .parse()
            .unwrap_or(1_000_000_000u64),
        tx_per_snapshot: env::var("MOCK_TX_PER_SNAPSHOT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10),
        mev_opportunity_rate: env::var("MOCK_MEV_OPPORTUNITY_RATE")
            .unwrap_or_else(|_| "0.05".to_string())
            .parse()
            .unwrap_or(0.05),
        network_latency: env::var("MOCK_NETWORK_LATENCY")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50),
        bundle_success_rate: env::var("MOCK_BUNDLE_SUCCESS_RATE")
            .unwrap_or_else(|_| "0.85".to_string())
            .parse()
            .unwrap_or(0.85),
    }
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub chain_id: u64,
    pub block_time: u64,
    pub base_fee: u64,
    pub priority_fee: u64,
    /// 스냅샷마다 생성할 펜딩 트랜잭션 수
    pub tx_per_snapshot: usize,
    /// 생성된 트랜잭션 중 라우터로 향하는 비율
    pub mev_opportunity_rate: f64,
    pub network_latency: u64,
    pub bundle_success_rate: f64,
}
