use std::collections::HashSet;
use std::sync::Arc;
use ethers::types::{Address, U256};
use tracing::{info, debug, warn};

use crate::blockchain::ChainClient;
use crate::config::Config;
use crate::types::{MevOpportunity, MevResult, PendingTransaction};
use super::profitability::ProfitEstimator;

/// 후보 트랜잭션 필터: 허용된 라우터로 향하고 최소 금액을 초과해야 통과
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    routers: HashSet<Address>,
    min_value_wei: U256,
}

impl CandidateFilter {
    pub fn new(routers: HashSet<Address>, min_value_wei: U256) -> Self {
        Self { routers, min_value_wei }
    }

    pub fn from_config(config: &Config) -> MevResult<Self> {
        Ok(Self::new(config.router_addresses()?, config.min_value_wei()?))
    }

    pub fn matches(&self, tx: &PendingTransaction) -> bool {
        let allowed_router = tx.to.map_or(false, |to| self.routers.contains(&to));
        allowed_router && tx.value > self.min_value_wei
    }

    pub fn min_value_wei(&self) -> U256 {
        self.min_value_wei
    }
}

/// 한 번의 스캔 결과
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub scanned: usize,
    pub candidates: usize,
    pub opportunities: Vec<MevOpportunity>,
}

/// 펜딩 풀을 조회해 기회를 찾는 스캐너
pub struct OpportunityScanner {
    chain: Arc<dyn ChainClient>,
    filter: CandidateFilter,
    estimator: Arc<ProfitEstimator>,
    max_pending_transactions: usize,
}

impl OpportunityScanner {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        filter: CandidateFilter,
        estimator: Arc<ProfitEstimator>,
        max_pending_transactions: usize,
    ) -> Self {
        Self {
            chain,
            filter,
            estimator,
            max_pending_transactions,
        }
    }

    /// 발견한 기회 목록. 실패하지 않는다 (조회 오류는 빈 목록).
    pub async fn scan(&self) -> Vec<MevOpportunity> {
        self.scan_with_report().await.opportunities
    }

    pub async fn scan_with_report(&self) -> ScanReport {
        let pending = match self.chain.pending_pool_snapshot(self.max_pending_transactions).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("⚠️ 펜딩 풀 조회 실패: {}", e);
                return ScanReport::default();
            }
        };

        // 다음 블록을 기회의 타겟으로 기록 (알 수 없으면 0)
        let target_block = match self.chain.current_block_height().await {
            Ok(height) => height + 1,
            Err(e) => {
                debug!("블록 높이 조회 실패, 타겟 블록 미정: {}", e);
                0
            }
        };

        let mut report = ScanReport {
            scanned: pending.len(),
            ..ScanReport::default()
        };

        for tx in pending.iter().filter(|tx| self.filter.matches(tx)) {
            report.candidates += 1;

            match self.estimator.estimate(tx) {
                Some(mut opportunity) => {
                    opportunity.target_block = target_block;
                    debug!("🎯 기회 발견: {} (예상 수익 {} ETH)", opportunity.id, opportunity.estimated_profit);
                    report.opportunities.push(opportunity);
                }
                None => {
                    debug!("후보 분석 실패, 건너뜀: {:?}", tx.hash);
                }
            }
        }

        if !report.opportunities.is_empty() {
            info!(
                "🔍 스캔 완료: {}개 중 후보 {}개, 기회 {}개",
                report.scanned, report.candidates, report.opportunities.len()
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use ethers::types::{Bytes, H256};
    use rust_decimal::Decimal;
    use crate::constants::{SUSHISWAP_ROUTER, UNISWAP_V2_ROUTER};
    use crate::core::profitability::FixedShareEstimation;
    use crate::mocks::MockChainClient;
    use crate::utils::math::eth_to_wei;

    fn eth(value: &str) -> U256 {
        eth_to_wei(Decimal::from_str(value).unwrap()).unwrap()
    }

    fn pending_tx(id: u8, to: Option<Address>, value: U256) -> PendingTransaction {
        PendingTransaction {
            hash: H256::repeat_byte(id),
            from: Address::repeat_byte(0xaa),
            to,
            value,
            data: Bytes::default(),
        }
    }

    fn scanner(chain: Arc<MockChainClient>) -> OpportunityScanner {
        let filter = CandidateFilter::from_config(&Config::load_test_config()).unwrap();
        let estimator = Arc::new(ProfitEstimator::new(
            filter.clone(),
            Arc::new(FixedShareEstimation::new(Decimal::from_str("0.05").unwrap())),
        ));
        OpportunityScanner::new(chain, filter, estimator, 10)
    }

    #[test]
    fn test_filter_threshold_is_exclusive() {
        let filter = CandidateFilter::from_config(&Config::load_test_config()).unwrap();
        let router = UNISWAP_V2_ROUTER.parse::<Address>().ok();

        assert!(!filter.matches(&pending_tx(1, router, eth("0.04"))));
        assert!(!filter.matches(&pending_tx(2, router, eth("0.05"))));
        assert!(filter.matches(&pending_tx(3, router, eth("0.050000000000000001"))));
        assert!(!filter.matches(&pending_tx(4, Some(Address::repeat_byte(0x99)), eth("5"))));
        assert!(!filter.matches(&pending_tx(5, None, eth("5"))));
    }

    #[tokio::test]
    async fn test_scan_keeps_only_allow_listed_candidates() {
        let uniswap = UNISWAP_V2_ROUTER.parse::<Address>().ok();
        let sushiswap = SUSHISWAP_ROUTER.parse::<Address>().ok();
        let chain = Arc::new(
            MockChainClient::new()
                .with_block_height(500)
                .with_pending(vec![
                    pending_tx(1, uniswap, eth("1.0")),
                    pending_tx(2, uniswap, eth("0.04")),
                    pending_tx(3, Some(Address::repeat_byte(0x99)), eth("3.0")),
                    pending_tx(4, sushiswap, eth("2.0")),
                ]),
        );

        let report = scanner(chain).scan_with_report().await;

        assert_eq!(report.scanned, 4);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.opportunities.len(), 2);
        assert_eq!(report.opportunities[0].transactions[0].hash, H256::repeat_byte(1));
        assert_eq!(report.opportunities[0].estimated_profit, Decimal::from_str("0.05").unwrap());
        assert_eq!(report.opportunities[0].target_block, 501);
        assert_eq!(report.opportunities[1].estimated_profit, Decimal::from_str("0.1").unwrap());
    }

    #[tokio::test]
    async fn test_scan_returns_empty_on_pool_error() {
        let uniswap = UNISWAP_V2_ROUTER.parse::<Address>().ok();
        let chain = Arc::new(MockChainClient::new().with_pending(vec![pending_tx(1, uniswap, eth("1.0"))]));
        chain.fail_pending_pool(true).await;

        assert!(scanner(chain).scan().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_head_leaves_target_block_unset() {
        let uniswap = UNISWAP_V2_ROUTER.parse::<Address>().ok();
        let chain = Arc::new(MockChainClient::new().with_pending(vec![pending_tx(1, uniswap, eth("1.0"))]));
        chain.fail_block_height(true).await;

        let opportunities = scanner(chain).scan().await;
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].target_block, 0);
    }
}
