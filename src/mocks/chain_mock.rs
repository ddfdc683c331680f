use std::collections::HashMap;
use std::time::Instant;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};
use rand::Rng;
use tokio::sync::RwLock;
use tracing::{info, debug};

use crate::blockchain::ChainClient;
use crate::constants::{KNOWN_DEX_ROUTERS, SWAP_EXACT_ETH_FOR_TOKENS};
use crate::types::{FeeParams, PendingTransaction, ReceiptSummary};
use super::MockConfig;

#[derive(Debug, Clone)]
struct MockChainState {
    block_height: u64,
    nonces: HashMap<Address, U256>,
    fees: FeeParams,
    pending: Vec<PendingTransaction>,
    receipts: HashMap<H256, ReceiptSummary>,
    fail_block_height: bool,
    fail_nonce: bool,
    fail_fee_estimate: bool,
    fail_pending_pool: bool,
    nonce_queries: u64,
    snapshot_queries: u64,
}

/// 인메모리 체인 클라이언트
///
/// 테스트에서는 상태를 직접 지정하고, mock 실행 모드에서는 펜딩 트랜잭션을 합성한다.
pub struct MockChainClient {
    state: RwLock<MockChainState>,
    synthetic: Option<(MockConfig, Instant)>,
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockChainState {
                block_height: 100,
                nonces: HashMap::new(),
                fees: FeeParams {
                    max_priority_fee_per_gas: U256::from(1_000_000_000u64),
                    max_fee_per_gas: U256::from(30_000_000_000u64),
                },
                pending: Vec::new(),
                receipts: HashMap::new(),
                fail_block_height: false,
                fail_nonce: false,
                fail_fee_estimate: false,
                fail_pending_pool: false,
                nonce_queries: 0,
                snapshot_queries: 0,
            }),
            synthetic: None,
        }
    }

    /// 시간에 따라 블록이 진행되고 매 스냅샷마다 펜딩 트랜잭션을 생성하는 mock
    pub fn synthetic(mock_config: MockConfig) -> Self {
        info!("🎭 MockChainClient initialized (synthetic mempool)");
        debug!("Mock MEV opportunity rate: {}", mock_config.mev_opportunity_rate);

        let client = Self::new().with_fees(FeeParams {
            max_priority_fee_per_gas: U256::from(mock_config.priority_fee),
            max_fee_per_gas: U256::from(mock_config.base_fee * 2 + mock_config.priority_fee),
        });
        Self {
            synthetic: Some((mock_config, Instant::now())),
            ..client
        }
    }

    pub fn with_block_height(mut self, height: u64) -> Self {
        self.state.get_mut().block_height = height;
        self
    }

    pub fn with_nonce(mut self, address: Address, nonce: u64) -> Self {
        self.state.get_mut().nonces.insert(address, U256::from(nonce));
        self
    }

    pub fn with_fees(mut self, fees: FeeParams) -> Self {
        self.state.get_mut().fees = fees;
        self
    }

    pub fn with_pending(mut self, pending: Vec<PendingTransaction>) -> Self {
        self.state.get_mut().pending = pending;
        self
    }

    pub async fn set_block_height(&self, height: u64) {
        self.state.write().await.block_height = height;
    }

    pub async fn set_receipt(&self, hash: H256, receipt: ReceiptSummary) {
        self.state.write().await.receipts.insert(hash, receipt);
    }

    pub async fn fail_block_height(&self, fail: bool) {
        self.state.write().await.fail_block_height = fail;
    }

    pub async fn fail_nonce(&self, fail: bool) {
        self.state.write().await.fail_nonce = fail;
    }

    pub async fn fail_fee_estimate(&self, fail: bool) {
        self.state.write().await.fail_fee_estimate = fail;
    }

    pub async fn fail_pending_pool(&self, fail: bool) {
        self.state.write().await.fail_pending_pool = fail;
    }

    pub async fn nonce_queries(&self) -> u64 {
        self.state.read().await.nonce_queries
    }

    pub async fn snapshot_queries(&self) -> u64 {
        self.state.read().await.snapshot_queries
    }

    fn generate_pending(mock_config: &MockConfig) -> Vec<PendingTransaction> {
        let mut rng = rand::thread_rng();

        (0..mock_config.tx_per_snapshot)
            .map(|_| {
                let to = if rng.gen_bool(mock_config.mev_opportunity_rate.clamp(0.0, 1.0)) {
                    let router = KNOWN_DEX_ROUTERS[rng.gen_range(0..KNOWN_DEX_ROUTERS.len())];
                    router.parse::<Address>().unwrap_or_else(|_| Address::random())
                } else {
                    Address::random()
                };
                // 0.001 ~ 2 ETH
                let value = U256::from(rng.gen_range(1_000_000_000_000_000u64..2_000_000_000_000_000_000u64));

                PendingTransaction {
                    hash: H256::random(),
                    from: Address::random(),
                    to: Some(to),
                    value,
                    data: Bytes::from(SWAP_EXACT_ETH_FOR_TOKENS.to_vec()),
                }
            })
            .collect()
    }
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn current_block_height(&self) -> Result<u64> {
        let state = self.state.read().await;
        if state.fail_block_height {
            return Err(anyhow!("🎭 [MOCK] block number unavailable"));
        }

        let advanced = match &self.synthetic {
            Some((mock_config, started)) => started.elapsed().as_secs() / mock_config.block_time.max(1),
            None => 0,
        };
        Ok(state.block_height + advanced)
    }

    async fn account_nonce(&self, address: Address) -> Result<U256> {
        let mut state = self.state.write().await;
        state.nonce_queries += 1;
        if state.fail_nonce {
            return Err(anyhow!("🎭 [MOCK] nonce query failed"));
        }
        Ok(state.nonces.get(&address).copied().unwrap_or_default())
    }

    async fn fee_estimate(&self) -> Result<FeeParams> {
        let state = self.state.read().await;
        if state.fail_fee_estimate {
            return Err(anyhow!("🎭 [MOCK] fee estimation failed"));
        }
        Ok(state.fees)
    }

    async fn pending_pool_snapshot(&self, limit: usize) -> Result<Vec<PendingTransaction>> {
        let mut state = self.state.write().await;
        state.snapshot_queries += 1;
        if state.fail_pending_pool {
            return Err(anyhow!("🎭 [MOCK] txpool unavailable"));
        }

        let pending = match &self.synthetic {
            Some((mock_config, _)) => Self::generate_pending(mock_config),
            None => state.pending.clone(),
        };
        Ok(pending.into_iter().take(limit).collect())
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<ReceiptSummary>> {
        Ok(self.state.read().await.receipts.get(&hash).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_respects_limit() {
        let pending = (0..5u8)
            .map(|i| PendingTransaction {
                hash: H256::repeat_byte(i),
                from: Address::repeat_byte(i),
                to: None,
                value: U256::zero(),
                data: Bytes::default(),
            })
            .collect();
        let chain = MockChainClient::new().with_pending(pending);

        let snapshot = tokio_test::assert_ok!(chain.pending_pool_snapshot(3).await);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].hash, H256::repeat_byte(0));
        assert_eq!(chain.snapshot_queries().await, 1);
    }

    #[tokio::test]
    async fn test_synthetic_mempool_generates_transactions() {
        let mut mock_config = super::super::get_mock_config();
        mock_config.tx_per_snapshot = 8;
        mock_config.mev_opportunity_rate = 1.0;
        let chain = MockChainClient::synthetic(mock_config);

        let snapshot = tokio_test::assert_ok!(chain.pending_pool_snapshot(5).await);
        assert_eq!(snapshot.len(), 5);

        let routers: Vec<Address> = KNOWN_DEX_ROUTERS.iter().map(|r| r.parse().unwrap()).collect();
        assert!(snapshot.iter().all(|tx| routers.contains(&tx.to.unwrap())));
    }
}
