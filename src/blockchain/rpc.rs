use std::sync::Arc;
use anyhow::{Result, anyhow, Context};
use async_trait::async_trait;
use ethers::{
    providers::{Provider, Http, Middleware},
    types::{Address, BlockNumber, Transaction, H256, U256},
};
use tracing::{info, debug};

use crate::types::{FeeParams, PendingTransaction, ReceiptSummary};

/// 체인 노드 RPC 계약
///
/// 번들 수학은 전부 이 값들에 의존한다: 블록 높이는 타겟 블록을, 논스는 번들 논스 시퀀스를,
/// 수수료 추정치는 팁이 더해질 기준 수수료를 결정한다.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// 현재 체인 헤드 높이
    async fn current_block_height(&self) -> Result<u64>;

    /// 계정의 현재 트랜잭션 수 (다음 사용할 논스)
    async fn account_nonce(&self, address: Address) -> Result<U256>;

    /// 네트워크 권장 EIP-1559 수수료
    async fn fee_estimate(&self) -> Result<FeeParams>;

    /// 펜딩 풀의 앞쪽 `limit`개 트랜잭션
    async fn pending_pool_snapshot(&self, limit: usize) -> Result<Vec<PendingTransaction>>;

    /// 트랜잭션 영수증 (아직 채굴되지 않았으면 None)
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<ReceiptSummary>>;
}

/// ethers HTTP 프로바이더 기반 체인 클라이언트
pub struct EthersChainClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl EthersChainClient {
    /// 노드에 연결하고 체인 ID를 확인
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        info!("🔌 블록체인 RPC 클라이언트 초기화: {}", rpc_url);

        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| anyhow!("Invalid RPC URL {}: {}", rpc_url, e))?;
        let provider = Arc::new(provider);

        let chain_id = provider.get_chainid().await
            .context("체인 ID 조회 실패")?
            .as_u64();
        info!("🔗 체인 ID: {}", chain_id);

        Ok(Self { provider, chain_id })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

/// 펜딩 블록의 트랜잭션 순서(노드의 가스 가격 정렬)를 그대로 두고 앞쪽 `limit`개만 취한다
fn first_pending(transactions: Vec<Transaction>, limit: usize) -> Vec<PendingTransaction> {
    transactions
        .into_iter()
        .take(limit)
        .map(PendingTransaction::from)
        .collect()
}

#[async_trait]
impl ChainClient for EthersChainClient {
    async fn current_block_height(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn account_nonce(&self, address: Address) -> Result<U256> {
        let nonce = self.provider
            .get_transaction_count(address, Some(BlockNumber::Pending.into()))
            .await?;
        Ok(nonce)
    }

    async fn fee_estimate(&self) -> Result<FeeParams> {
        let (max_fee_per_gas, max_priority_fee_per_gas) = self.provider
            .estimate_eip1559_fees(None)
            .await?;
        Ok(FeeParams {
            max_priority_fee_per_gas,
            max_fee_per_gas,
        })
    }

    async fn pending_pool_snapshot(&self, limit: usize) -> Result<Vec<PendingTransaction>> {
        let block = self.provider.get_block_with_txs(BlockNumber::Pending).await
            .context("펜딩 블록 조회 실패")?;

        let snapshot = match block {
            Some(block) => first_pending(block.transactions, limit),
            None => Vec::new(),
        };

        debug!("📥 펜딩 풀 스냅샷: {}개 트랜잭션", snapshot.len());
        Ok(snapshot)
    }

    async fn transaction_receipt(&self, hash: H256) -> Result<Option<ReceiptSummary>> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;

        Ok(receipt.and_then(|receipt| {
            receipt.block_number.map(|block| ReceiptSummary {
                block_number: block.as_u64(),
                success: receipt.status.map(|s| s.as_u64() == 1).unwrap_or(false),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_block(count: u8) -> Vec<Transaction> {
        (0..count)
            .map(|i| Transaction {
                hash: H256::repeat_byte(i),
                from: Address::repeat_byte(0xff - i),
                nonce: U256::from(i),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_first_pending_keeps_block_order() {
        let snapshot = first_pending(pending_block(12), 10);

        assert_eq!(snapshot.len(), 10);
        let hashes: Vec<H256> = snapshot.iter().map(|tx| tx.hash).collect();
        let expected: Vec<H256> = (0..10u8).map(H256::repeat_byte).collect();
        // 발신자 주소가 내림차순이어도 블록 순서가 유지된다
        assert_eq!(hashes, expected);
    }

    #[test]
    fn test_first_pending_shorter_than_limit() {
        assert_eq!(first_pending(pending_block(3), 10).len(), 3);
        assert!(first_pending(Vec::new(), 10).is_empty());
        assert!(first_pending(pending_block(3), 0).is_empty());
    }
}
