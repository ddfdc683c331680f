use std::sync::Arc;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::types::{MevOpportunity, OpportunityType, PendingTransaction};
use crate::utils::math::wei_to_eth;
use super::scanner::CandidateFilter;

/// 타겟 트랜잭션 금액에서 예상 수익을 계산하는 정책
pub trait EstimationPolicy: Send + Sync {
    fn name(&self) -> &str;

    /// 타겟 금액(ETH) → 예상 순수익(ETH). 계산할 수 없으면 None.
    fn estimate_profit(&self, target_value_eth: Decimal) -> Option<Decimal>;
}

/// 타겟 금액의 고정 비율을 수익으로 보는 단순 정책
///
/// 실제 풀 리저브 기반 실행 시뮬레이션으로 교체되어야 하는 자리다.
#[derive(Debug, Clone)]
pub struct FixedShareEstimation {
    profit_share: Decimal,
}

impl FixedShareEstimation {
    pub fn new(profit_share: Decimal) -> Self {
        Self { profit_share }
    }
}

impl EstimationPolicy for FixedShareEstimation {
    fn name(&self) -> &str {
        "fixed_share"
    }

    fn estimate_profit(&self, target_value_eth: Decimal) -> Option<Decimal> {
        target_value_eth
            .checked_mul(self.profit_share)
            .filter(|profit| !profit.is_sign_negative())
    }
}

/// 후보 트랜잭션을 수치화된 기회로 변환
pub struct ProfitEstimator {
    filter: CandidateFilter,
    policy: Arc<dyn EstimationPolicy>,
}

impl ProfitEstimator {
    pub fn new(filter: CandidateFilter, policy: Arc<dyn EstimationPolicy>) -> Self {
        Self { filter, policy }
    }

    pub fn estimate(&self, tx: &PendingTransaction) -> Option<MevOpportunity> {
        // 스캐너 필터 재확인
        if !self.filter.matches(tx) {
            return None;
        }
        let router = tx.to?;

        let target_value_eth = match wei_to_eth(tx.value) {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ 타겟 금액 변환 실패 {:?}: {}", tx.hash, e);
                return None;
            }
        };

        let estimated_profit = self.policy.estimate_profit(target_value_eth)?;
        debug!(
            "💰 수익 추정 ({}): 타겟 {} ETH → 수익 {} ETH",
            self.policy.name(), target_value_eth, estimated_profit
        );

        Some(MevOpportunity {
            id: format!("sandwich_{}", uuid::Uuid::new_v4()),
            opportunity_type: OpportunityType::Sandwich,
            estimated_profit,
            transactions: vec![tx.clone()],
            target_block: 0,
            router,
            target_tx_value: Some(tx.value),
            detected_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use ethers::types::{Address, Bytes, H256, U256};
    use crate::config::Config;
    use crate::constants::ONEINCH_ROUTER;
    use crate::utils::math::eth_to_wei;

    fn estimator() -> ProfitEstimator {
        let filter = CandidateFilter::from_config(&Config::load_test_config()).unwrap();
        ProfitEstimator::new(filter, Arc::new(FixedShareEstimation::new(Decimal::from_str("0.05").unwrap())))
    }

    fn router_tx(value_eth: &str) -> PendingTransaction {
        PendingTransaction {
            hash: H256::random(),
            from: Address::random(),
            to: ONEINCH_ROUTER.parse().ok(),
            value: eth_to_wei(Decimal::from_str(value_eth).unwrap()).unwrap(),
            data: Bytes::default(),
        }
    }

    #[test]
    fn test_profit_is_five_percent_of_target() {
        let tx = router_tx("1.0");
        let opportunity = estimator().estimate(&tx).unwrap();

        assert_eq!(opportunity.estimated_profit, Decimal::from_str("0.05").unwrap());
        assert_eq!(opportunity.target_tx_value, Some(tx.value));
        assert_eq!(opportunity.opportunity_type, OpportunityType::Sandwich);
        assert_eq!(opportunity.router, ONEINCH_ROUTER.parse::<Address>().unwrap());
        assert_eq!(opportunity.target_tx(), Some(&tx));
    }

    #[test]
    fn test_odd_values_are_exact() {
        let opportunity = estimator().estimate(&router_tx("3.333333333333333333")).unwrap();
        assert_eq!(
            opportunity.estimated_profit,
            Decimal::from_str("0.16666666666666666665").unwrap()
        );
    }

    #[test]
    fn test_estimate_rechecks_filters() {
        assert!(estimator().estimate(&router_tx("0.04")).is_none());

        let mut tx = router_tx("1.0");
        tx.to = Some(Address::repeat_byte(0x01));
        assert!(estimator().estimate(&tx).is_none());
    }

    #[test]
    fn test_unrepresentable_value_is_skipped() {
        let mut tx = router_tx("1.0");
        tx.value = U256::MAX;
        assert!(estimator().estimate(&tx).is_none());
    }

    #[test]
    fn test_negative_share_yields_nothing() {
        let policy = FixedShareEstimation::new(Decimal::from_str("-0.1").unwrap());
        assert!(policy.estimate_profit(Decimal::ONE).is_none());
    }
}
