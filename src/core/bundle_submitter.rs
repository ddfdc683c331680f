use std::sync::Arc;
use chrono::Utc;
use tracing::{info, debug, warn, error};

use crate::flashbots::RelayClient;
use crate::types::{
    BundleRequest, BundleStats, BundleSubmissionResult, InclusionResponse, SubmissionState,
};
use super::status::StatusBoard;

/// 번들을 릴레이에 보내고 포함 여부를 판정
///
/// 재시도하지 않는다. 지나간 타겟 블록의 번들은 다시 제출되지 않고,
/// 다음 사이클에서 새 번들이 만들어진다.
pub struct BundleSubmitter {
    relay: Arc<dyn RelayClient>,
    status: Arc<StatusBoard>,
}

impl BundleSubmitter {
    pub fn new(relay: Arc<dyn RelayClient>, status: Arc<StatusBoard>) -> Self {
        Self { relay, status }
    }

    /// 포함이 확인된 경우에만 true
    pub async fn submit(&self, bundle: &BundleRequest) -> bool {
        self.submit_with_result(bundle).await.success
    }

    pub async fn submit_with_result(&self, bundle: &BundleRequest) -> BundleSubmissionResult {
        let mut state = SubmissionState::Idle;
        debug!("📮 번들 제출 상태: {} {:?}", bundle.id, state);

        let (bundle_hash, response) = match self.relay.submit_bundle(bundle).await {
            Ok(handle) => {
                state = SubmissionState::Submitted;
                debug!("📮 번들 제출 상태: {} {:?}", bundle.id, state);

                let response = match self.relay.await_inclusion(&handle).await {
                    Ok(response) => response,
                    Err(e) => InclusionResponse::failed(format!("inclusion wait failed: {}", e)),
                };
                (handle.bundle_hash, response)
            }
            Err(e) => (None, InclusionResponse::failed(format!("relay rejected bundle: {}", e))),
        };

        let result = match (response.is_confirmed(), response.block_number) {
            (true, Some(block_number)) => {
                info!("✅ 번들 포함 확인: {} (블록 {})", bundle.id, block_number);
                BundleSubmissionResult {
                    bundle_id: bundle.id.clone(),
                    bundle_hash,
                    success: true,
                    block_number: Some(block_number),
                    error: None,
                    state: SubmissionState::Included(block_number),
                    target_block: bundle.block_number,
                    settled_at: Utc::now(),
                }
            }
            _ => {
                let reason = response.error
                    .unwrap_or_else(|| "inclusion response without block number".to_string());
                error!("❌ 번들 제출 실패: {} ({})", bundle.id, reason);
                BundleSubmissionResult {
                    bundle_id: bundle.id.clone(),
                    bundle_hash,
                    success: false,
                    block_number: None,
                    error: Some(reason.clone()),
                    state: SubmissionState::Rejected(reason),
                    target_block: bundle.block_number,
                    settled_at: Utc::now(),
                }
            }
        };

        self.status.record_submission(&result).await;
        result
    }

    /// 사후 통계 조회. 실패해도 파이프라인에는 영향 없음.
    pub async fn stats(&self, bundle_id: &str) -> Option<BundleStats> {
        match self.relay.bundle_stats(bundle_id).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("⚠️ 번들 통계 조회 실패 ({}): {}", bundle_id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;
    use crate::mocks::{MockRelayClient, MockRelayOutcome};

    fn bundle() -> BundleRequest {
        BundleRequest {
            id: "bundle_test".to_string(),
            transactions: vec![],
            block_number: 101,
            tip: U256::zero(),
            opportunity_id: "sandwich_test".to_string(),
            created_at: Utc::now(),
        }
    }

    fn submitter(relay: Arc<MockRelayClient>) -> (BundleSubmitter, Arc<StatusBoard>) {
        let status = Arc::new(StatusBoard::new(10));
        (BundleSubmitter::new(relay, status.clone()), status)
    }

    #[tokio::test]
    async fn test_included_bundle_reports_success() {
        let relay = Arc::new(MockRelayClient::new(MockRelayOutcome::Include));
        let (submitter, status) = submitter(relay.clone());

        let result = submitter.submit_with_result(&bundle()).await;

        assert!(result.success);
        assert_eq!(result.block_number, Some(101));
        assert_eq!(result.state, SubmissionState::Included(101));
        assert_eq!(relay.submitted().await.len(), 1);
        assert_eq!(status.snapshot(true).await.stats.bundles_included, 1);
    }

    #[tokio::test]
    async fn test_inclusion_error_reports_failure() {
        let relay = Arc::new(MockRelayClient::new(MockRelayOutcome::Reject("simulation reverted".to_string())));
        relay.fail_stats(true).await;
        let (submitter, status) = submitter(relay);

        assert!(!submitter.submit(&bundle()).await);
        assert!(submitter.stats("bundle_test").await.is_none());

        let last = status.snapshot(true).await.last_submission.unwrap();
        assert_eq!(last.error.as_deref(), Some("simulation reverted"));
        assert!(last.state.is_terminal());
    }

    #[tokio::test]
    async fn test_relay_submit_error_skips_inclusion_wait() {
        let relay = Arc::new(MockRelayClient::new(MockRelayOutcome::SubmitError("connection refused".to_string())));
        let (submitter, _) = submitter(relay.clone());

        let result = submitter.submit_with_result(&bundle()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("connection refused"));
        assert_eq!(relay.inclusion_waits().await, 0);
    }

    #[tokio::test]
    async fn test_stats_are_tagged_with_provenance() {
        let relay = Arc::new(MockRelayClient::new(MockRelayOutcome::Include));
        let (submitter, _) = submitter(relay);

        assert!(submitter.submit(&bundle()).await);
        let stats = submitter.stats("bundle_test").await.unwrap();
        assert!(stats.is_simulated());
        assert_eq!(stats, BundleStats::Simulated {
            bundle_id: "bundle_test".to_string(),
            target_block: 101,
            included: true,
        });
    }
}
