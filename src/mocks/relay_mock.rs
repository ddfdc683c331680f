use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, debug, warn};

use crate::constants::MAX_TRACKED_BUNDLES;
use crate::flashbots::RelayClient;
use crate::types::{BundleRequest, BundleStats, InclusionResponse, SubmissionHandle};
use super::MockConfig;

/// Mock 릴레이의 포함 대기 결과
#[derive(Debug, Clone, PartialEq)]
pub enum MockRelayOutcome {
    /// 타겟 블록에 포함
    Include,
    /// 포함 대기가 오류 필드와 함께 끝남
    Reject(String),
    /// submit_bundle 자체가 실패
    SubmitError(String),
    /// 확률적으로 포함
    Random { success_rate: f64 },
}

#[derive(Debug, Clone)]
struct MockRelayState {
    outcome: MockRelayOutcome,
    /// 최근 MAX_TRACKED_BUNDLES개만 보관
    submitted: VecDeque<BundleRequest>,
    included: HashMap<String, bool>,
    fail_stats: bool,
    inclusion_waits: u64,
}

pub struct MockRelayClient {
    state: Mutex<MockRelayState>,
    latency: Duration,
}

impl MockRelayClient {
    pub fn new(outcome: MockRelayOutcome) -> Self {
        Self {
            state: Mutex::new(MockRelayState {
                outcome,
                submitted: VecDeque::new(),
                included: HashMap::new(),
                fail_stats: false,
                inclusion_waits: 0,
            }),
            latency: Duration::ZERO,
        }
    }

    /// mock 실행 모드용 - 설정된 성공률과 네트워크 지연을 흉내낸다
    pub fn from_mock_config(mock_config: &MockConfig) -> Self {
        info!("🎭 MockRelayClient initialized with mock configuration");
        debug!("Mock bundle success rate: {}", mock_config.bundle_success_rate);

        Self {
            latency: Duration::from_millis(mock_config.network_latency),
            ..Self::new(MockRelayOutcome::Random {
                success_rate: mock_config.bundle_success_rate,
            })
        }
    }

    pub async fn fail_stats(&self, fail: bool) {
        self.state.lock().await.fail_stats = fail;
    }

    pub async fn submitted(&self) -> Vec<BundleRequest> {
        self.state.lock().await.submitted.iter().cloned().collect()
    }

    pub async fn inclusion_waits(&self) -> u64 {
        self.state.lock().await.inclusion_waits
    }
}

#[async_trait]
impl RelayClient for MockRelayClient {
    async fn submit_bundle(&self, bundle: &BundleRequest) -> Result<SubmissionHandle> {
        info!("🎭 [MOCK] 번들 제출 중: {} (블록: {})", bundle.id, bundle.block_number);
        tokio::time::sleep(self.latency).await;

        let mut state = self.state.lock().await;
        if let MockRelayOutcome::SubmitError(reason) = &state.outcome {
            warn!("🎭 [MOCK] ❌ 번들 제출 실패: {}", reason);
            return Err(anyhow!("{}", reason));
        }
        state.submitted.push_back(bundle.clone());
        while state.submitted.len() > MAX_TRACKED_BUNDLES {
            if let Some(evicted) = state.submitted.pop_front() {
                state.included.remove(&evicted.id);
            }
        }

        Ok(SubmissionHandle {
            bundle_id: bundle.id.clone(),
            bundle_hash: Some(format!("0x{}", hex::encode(bundle.id.as_bytes()))),
            target_block: bundle.block_number,
            tx_hashes: bundle.transactions.iter().map(|tx| tx.hash).collect(),
            simulated: false,
        })
    }

    async fn await_inclusion(&self, handle: &SubmissionHandle) -> Result<InclusionResponse> {
        tokio::time::sleep(self.latency).await;

        let mut state = self.state.lock().await;
        state.inclusion_waits += 1;

        let response = match state.outcome.clone() {
            MockRelayOutcome::Include => InclusionResponse::included_at(handle.target_block),
            MockRelayOutcome::Reject(reason) => InclusionResponse::failed(reason),
            MockRelayOutcome::SubmitError(reason) => InclusionResponse::failed(reason),
            MockRelayOutcome::Random { success_rate } => {
                if rand::random::<f64>() < success_rate {
                    InclusionResponse::included_at(handle.target_block)
                } else {
                    InclusionResponse::failed("🎭 [MOCK] bundle not included")
                }
            }
        };

        if state.submitted.iter().any(|bundle| bundle.id == handle.bundle_id) {
            state.included.insert(handle.bundle_id.clone(), response.is_confirmed());
        }
        Ok(response)
    }

    async fn bundle_stats(&self, bundle_id: &str) -> Result<BundleStats> {
        let state = self.state.lock().await;
        if state.fail_stats {
            return Err(anyhow!("🎭 [MOCK] stats endpoint unavailable"));
        }

        let bundle = state.submitted.iter()
            .find(|bundle| bundle.id == bundle_id)
            .ok_or_else(|| anyhow!("알 수 없는 번들: {}", bundle_id))?;

        Ok(BundleStats::Simulated {
            bundle_id: bundle_id.to_string(),
            target_block: bundle.block_number,
            included: state.included.get(bundle_id).copied().unwrap_or(false),
        })
    }
}
