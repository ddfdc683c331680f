use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use anyhow::Result;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tracing::info;

use crate::constants::*;
use crate::types::{MevError, MevResult};
use crate::utils::math::{eth_to_wei, gwei_to_wei};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub block_time: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashbotsConfig {
    pub relay_url: String,
    /// 번들 트랜잭션 서명 키
    pub private_key: String,
    /// X-Flashbots-Signature 전용 평판 키 (없으면 임시 키 생성)
    #[serde(default)]
    pub auth_key: Option<String>,
    /// eth_callBundle만 수행하고 실제로 제출하지 않음
    #[serde(default)]
    pub simulation_mode: bool,
    /// 타겟 블록 이후 포함 여부를 확인할 블록 수
    pub max_wait_blocks: u64,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 사이클당 조회할 펜딩 트랜잭션 최대 개수
    pub max_pending_transactions: usize,
    pub min_value_eth: String, // ETH amount, exclusive
    pub router_allowlist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// 타겟 금액 대비 예상 수익 비율 (0.05 = 5%)
    pub profit_share: Decimal,
    /// 수익 중 블록 생산자 팁 비율 (0.5 = 50%)
    pub tip_share: Decimal,
    /// 타겟 금액 대비 프론트런 크기 (0.1 = 10%)
    pub front_run_fraction: Decimal,
    pub min_priority_fee_gwei: u64,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
    /// 상태 스냅샷에 보관할 최근 기회 수
    pub recent_opportunities: usize,
    pub status_report_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 목(mock) 체인/릴레이 사용
    #[serde(default)]
    pub mock_mode: bool,
    pub network: NetworkConfig,
    pub flashbots: FlashbotsConfig,
    pub scanner: ScannerConfig,
    pub strategy: StrategyConfig,
    pub scheduler: SchedulerConfig,
    pub monitoring: MonitoringConfig,
}

impl Config {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn default() -> Self {
        Self {
            mock_mode: false,
            network: NetworkConfig {
                chain_id: 1,
                name: "mainnet".to_string(),
                rpc_url: "https://eth-mainnet.g.alchemy.com/v2/YOUR_API_KEY".to_string(),
                block_time: BLOCK_TIME,
            },
            flashbots: FlashbotsConfig {
                relay_url: FLASHBOTS_MAINNET_RELAY.to_string(),
                private_key: "your_private_key_here".to_string(),
                auth_key: None,
                simulation_mode: false,
                max_wait_blocks: DEFAULT_MAX_WAIT_BLOCKS,
                request_timeout_ms: 10_000,
            },
            scanner: ScannerConfig {
                max_pending_transactions: DEFAULT_MAX_PENDING_TRANSACTIONS,
                min_value_eth: DEFAULT_MIN_TARGET_VALUE_ETH.to_string(),
                router_allowlist: KNOWN_DEX_ROUTERS.iter().map(|r| r.to_string()).collect(),
            },
            strategy: StrategyConfig {
                profit_share: decimal_const(DEFAULT_PROFIT_SHARE),
                tip_share: decimal_const(DEFAULT_TIP_SHARE),
                front_run_fraction: decimal_const(DEFAULT_FRONT_RUN_FRACTION),
                min_priority_fee_gwei: DEFAULT_MIN_PRIORITY_FEE_GWEI,
                gas_limit: DEFAULT_GAS_LIMIT,
            },
            scheduler: SchedulerConfig {
                interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            },
            monitoring: MonitoringConfig {
                log_level: "info".to_string(),
                recent_opportunities: 20,
                status_report_interval_secs: 60,
            },
        }
    }

    /// 환경 변수에서 민감한 정보 로드 (.env 포함)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(private_key) = env::var("PRIVATE_KEY") {
            self.flashbots.private_key = private_key;
            info!("🔑 Private key loaded from environment");
        }

        if let Ok(auth_key) = env::var("FLASHBOTS_AUTH_KEY") {
            self.flashbots.auth_key = Some(auth_key);
            info!("🪪 Flashbots auth key loaded from environment");
        }

        if let Ok(rpc_url) = env::var("RPC_URL") {
            self.network.rpc_url = rpc_url;
            info!("🌐 RPC URL loaded from environment");
        }

        if let Ok(relay_url) = env::var("FLASHBOTS_RELAY_URL") {
            self.flashbots.relay_url = relay_url;
            info!("⚡ Flashbots relay URL loaded from environment");
        }
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode || crate::mocks::is_mock_mode()
    }

    pub fn has_private_key(&self) -> bool {
        !self.flashbots.private_key.is_empty() && self.flashbots.private_key != "your_private_key_here"
    }

    /// 최소 타겟 금액 (wei, 초과해야 통과)
    pub fn min_value_wei(&self) -> MevResult<U256> {
        let eth = Decimal::from_str(&self.scanner.min_value_eth)
            .map_err(|_| MevError::Config(format!("Invalid scanner min value: {}", self.scanner.min_value_eth)))?;
        eth_to_wei(eth).map_err(|e| MevError::Config(e.to_string()))
    }

    /// 라우터 허용 목록 (주소 파싱은 대소문자 무관)
    pub fn router_addresses(&self) -> MevResult<HashSet<Address>> {
        self.scanner.router_allowlist.iter()
            .map(|router| {
                router.trim().to_lowercase().parse::<Address>()
                    .map_err(|_| MevError::Config(format!("Invalid router address: {}", router)))
            })
            .collect()
    }

    pub fn min_priority_fee_wei(&self) -> U256 {
        gwei_to_wei(self.strategy.min_priority_fee_gwei)
    }

    pub fn validate(&self) -> MevResult<()> {
        self.validate_for(self.is_mock())
    }

    /// `mock`이 참이면 RPC URL, 서명 키, 릴레이 URL 검사를 건너뛴다
    pub fn validate_for(&self, mock: bool) -> MevResult<()> {
        if self.network.rpc_url.is_empty() && !mock {
            return Err(MevError::Config("Network RPC URL cannot be empty".to_string()));
        }

        if !self.has_private_key() && !mock {
            return Err(MevError::Signer("Flashbots private key must be configured".to_string()));
        }

        if self.flashbots.relay_url.is_empty() && !mock {
            return Err(MevError::Relay("Relay URL cannot be empty".to_string()));
        }

        if self.scanner.max_pending_transactions == 0 {
            return Err(MevError::Config("Scanner max pending transactions must be greater than 0".to_string()));
        }

        if self.router_addresses()?.is_empty() {
            return Err(MevError::Config("At least one router must be allow-listed".to_string()));
        }

        self.min_value_wei()?;

        for (name, share) in [
            ("profit_share", self.strategy.profit_share),
            ("tip_share", self.strategy.tip_share),
            ("front_run_fraction", self.strategy.front_run_fraction),
        ] {
            if share.is_sign_negative() || share > Decimal::ONE {
                return Err(MevError::Config(format!("{} must be within [0, 1], got {}", name, share)));
            }
        }

        if self.strategy.gas_limit == 0 {
            return Err(MevError::Config("Gas limit must be greater than 0".to_string()));
        }

        if self.scheduler.interval_ms == 0 {
            return Err(MevError::Config("Scan interval must be greater than 0".to_string()));
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn load_test_config() -> Self {
        let mut config = Self::default();
        config.flashbots.private_key = TEST_PRIVATE_KEY.to_string();
        config.mock_mode = true;
        config.scheduler.interval_ms = 10;
        config
    }
}

#[cfg(test)]
pub const TEST_PRIVATE_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

fn decimal_const(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_default()
}
