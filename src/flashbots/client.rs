use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, anyhow, Context};
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::U64;
use ethers::utils::keccak256;
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{info, debug, warn, error};

use crate::blockchain::ChainClient;
use crate::config::Config;
use crate::constants::MAX_TRACKED_BUNDLES;
use crate::types::{
    BundleRequest, BundleStats, InclusionResponse, MevError, MevResult, RelayBundleStats,
    SubmissionHandle,
};
use super::bundle::*;

/// 비공개 릴레이 계약
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// 서명된 트랜잭션 시퀀스를 타겟 블록용 번들로 제출
    async fn submit_bundle(&self, bundle: &BundleRequest) -> Result<SubmissionHandle>;

    /// 포함 확인 또는 오류가 나올 때까지 대기
    async fn await_inclusion(&self, handle: &SubmissionHandle) -> Result<InclusionResponse>;

    /// 제출된 번들의 사후 통계
    async fn bundle_stats(&self, bundle_id: &str) -> Result<BundleStats>;
}

/// 제출된 번들 추적 정보
#[derive(Debug, Clone)]
struct SubmittedBundle {
    bundle_hash: Option<String>,
    target_block: u64,
    simulated: bool,
    included: Option<bool>,
}

/// 최근 제출 번들만 보관하는 추적 테이블. 가득 차면 가장 오래된 번들부터 잊는다.
#[derive(Debug)]
struct TrackedBundles {
    records: HashMap<String, SubmittedBundle>,
    order: VecDeque<String>,
    capacity: usize,
}

impl TrackedBundles {
    fn new(capacity: usize) -> Self {
        Self {
            records: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, bundle_id: String, record: SubmittedBundle) {
        if self.records.insert(bundle_id.clone(), record).is_some() {
            return;
        }
        self.order.push_back(bundle_id);

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
            }
        }
    }

    fn get(&self, bundle_id: &str) -> Option<&SubmittedBundle> {
        self.records.get(bundle_id)
    }

    fn get_mut(&mut self, bundle_id: &str) -> Option<&mut SubmittedBundle> {
        self.records.get_mut(bundle_id)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

/// Flashbots 릴레이 클라이언트 - 번들 시뮬레이션, 제출, 포함 확인
pub struct FlashbotsRelayClient {
    http_client: HttpClient,
    relay_url: String,
    /// X-Flashbots-Signature 서명 키 (트랜잭션 서명 키와 분리)
    auth_signer: LocalWallet,
    chain: Arc<dyn ChainClient>,
    simulation_mode: bool,
    max_wait_blocks: u64,
    poll_interval: Duration,
    inclusion_timeout: Duration,
    submitted: Mutex<TrackedBundles>,
}

impl FlashbotsRelayClient {
    pub fn new(config: &Config, chain: Arc<dyn ChainClient>) -> MevResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_millis(config.flashbots.request_timeout_ms))
            .build()
            .map_err(|e| MevError::Relay(format!("HTTP client setup failed: {}", e)))?;

        let auth_signer = match &config.flashbots.auth_key {
            Some(key) => key.trim().trim_start_matches("0x").parse::<LocalWallet>()
                .map_err(|e| MevError::Relay(format!("Invalid Flashbots auth key: {}", e)))?,
            None => {
                warn!("⚠️ Flashbots 인증 키가 없어 임시 키를 생성합니다 (평판 누적 불가)");
                LocalWallet::new(&mut rand::thread_rng())
            }
        };

        // 포함 대기 상한: 타겟 블록 + 대기 블록 수만큼의 블록 시간
        let block_time = Duration::from_secs(config.network.block_time.max(1));
        let inclusion_timeout = block_time * (config.flashbots.max_wait_blocks as u32 + 2);

        info!("🔗 Flashbots 클라이언트 초기화: {}", config.flashbots.relay_url);
        if config.flashbots.simulation_mode {
            warn!("🧪 시뮬레이션 모드: 번들은 eth_callBundle로만 검증됩니다");
        }

        Ok(Self {
            http_client,
            relay_url: config.flashbots.relay_url.clone(),
            auth_signer,
            chain,
            simulation_mode: config.flashbots.simulation_mode,
            max_wait_blocks: config.flashbots.max_wait_blocks,
            poll_interval: Duration::from_secs(1),
            inclusion_timeout,
            submitted: Mutex::new(TrackedBundles::new(MAX_TRACKED_BUNDLES)),
        })
    }

    /// X-Flashbots-Signature 헤더 값: `<address>:<signature>`
    async fn flashbots_signature(&self, body: &str) -> Result<String> {
        let digest = format!("0x{}", hex::encode(keccak256(body.as_bytes())));
        let signature = self.auth_signer.sign_message(digest).await?;

        Ok(format!("{:?}:0x{}", self.auth_signer.address(), hex::encode(signature.to_vec())))
    }

    /// 서명된 JSON-RPC 요청 전송
    async fn post_signed<P, R>(&self, method: &'static str, params: P) -> Result<R>
    where
        P: Serialize + Send,
        R: DeserializeOwned + Send,
    {
        let body = serde_json::to_string(&JsonRpcRequest::new(method, params))?;
        let signature = self.flashbots_signature(&body).await?;

        let response = self.http_client
            .post(&self.relay_url)
            .header("Content-Type", "application/json")
            .header("X-Flashbots-Signature", signature)
            .body(body)
            .send()
            .await
            .with_context(|| format!("{} 요청 실패", method))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Flashbots API 오류 ({}): {} - {}", method, status, error_text));
        }

        let rpc_response: JsonRpcResponse<R> = response.json().await?;
        if let Some(error) = rpc_response.error {
            return Err(anyhow!("Flashbots 오류 ({}): {} - {}", method, error.code, error.message));
        }

        rpc_response.result
            .ok_or_else(|| anyhow!("Flashbots 응답에 result가 없습니다 ({})", method))
    }

    /// eth_callBundle로 번들 시뮬레이션
    async fn simulate(&self, bundle: &BundleRequest) -> Result<CallBundleResult> {
        debug!("🔬 번들 시뮬레이션: {} (블록 {})", bundle.id, bundle.block_number);

        let params = CallBundleParams {
            txs: bundle.raw_transactions(),
            block_number: U64::from(bundle.block_number),
            state_block_number: "latest".to_string(),
        };
        self.post_signed("eth_callBundle", params).await
    }
}

#[async_trait]
impl RelayClient for FlashbotsRelayClient {
    async fn submit_bundle(&self, bundle: &BundleRequest) -> Result<SubmissionHandle> {
        info!("📤 Flashbots 번들 제출 중: {} (블록: {})", bundle.id, bundle.block_number);

        let simulation = self.simulate(bundle).await?;
        if let Some(reason) = simulation.first_failure() {
            error!("❌ 번들 시뮬레이션 실패: {}", reason);
            return Err(anyhow!("simulation reverted: {}", reason));
        }
        debug!("✅ 번들 시뮬레이션 성공: 가스 {}", simulation.total_gas_used());

        let tx_hashes = bundle.transactions.iter().map(|tx| tx.hash).collect();

        let (bundle_hash, simulated) = if self.simulation_mode {
            info!("🧪 시뮬레이션 모드: 실제 제출 건너뜀");
            (simulation.bundle_hash, true)
        } else {
            let params = SendBundleParams {
                txs: bundle.raw_transactions(),
                block_number: U64::from(bundle.block_number),
            };
            let result: SendBundleResult = self.post_signed("eth_sendBundle", params).await?;
            info!("✅ Flashbots 번들 제출 성공: {} -> {}", bundle.id, result.bundle_hash);
            (Some(result.bundle_hash), false)
        };

        let mut submitted = self.submitted.lock().await;
        submitted.insert(bundle.id.clone(), SubmittedBundle {
            bundle_hash: bundle_hash.clone(),
            target_block: bundle.block_number,
            simulated,
            included: None,
        });
        debug!("📒 추적 중인 번들: {}개", submitted.len());
        drop(submitted);

        Ok(SubmissionHandle {
            bundle_id: bundle.id.clone(),
            bundle_hash,
            target_block: bundle.block_number,
            tx_hashes,
            simulated,
        })
    }

    async fn await_inclusion(&self, handle: &SubmissionHandle) -> Result<InclusionResponse> {
        if handle.simulated {
            return Ok(InclusionResponse::failed("simulation mode: bundle was not broadcast"));
        }

        let front_run_hash = *handle.tx_hashes.first()
            .ok_or_else(|| anyhow!("번들에 트랜잭션이 없습니다: {}", handle.bundle_id))?;
        let last_block = handle.target_block + self.max_wait_blocks;

        debug!("⏳ 번들 포함 대기 중: {} (블록 {}~{})", handle.bundle_id, handle.target_block, last_block);

        let wait = async {
            loop {
                if let Some(receipt) = self.chain.transaction_receipt(front_run_hash).await? {
                    return Ok::<_, anyhow::Error>(if receipt.success {
                        InclusionResponse::included_at(receipt.block_number)
                    } else {
                        InclusionResponse::failed(format!("front-run reverted in block {}", receipt.block_number))
                    });
                }

                let current_block = self.chain.current_block_height().await?;
                if current_block > last_block {
                    return Ok(InclusionResponse::failed(format!(
                        "bundle not included (target block {}, head {})",
                        handle.target_block, current_block
                    )));
                }

                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let response = match tokio::time::timeout(self.inclusion_timeout, wait).await {
            Ok(result) => result?,
            Err(_) => InclusionResponse::failed(format!(
                "inclusion wait timed out after {:?}", self.inclusion_timeout
            )),
        };

        if let Some(record) = self.submitted.lock().await.get_mut(&handle.bundle_id) {
            record.included = Some(response.is_confirmed());
        }

        Ok(response)
    }

    async fn bundle_stats(&self, bundle_id: &str) -> Result<BundleStats> {
        let record = self.submitted.lock().await.get(bundle_id).cloned()
            .ok_or_else(|| anyhow!("알 수 없는 번들: {}", bundle_id))?;

        if record.simulated {
            return Ok(BundleStats::Simulated {
                bundle_id: bundle_id.to_string(),
                target_block: record.target_block,
                included: record.included.unwrap_or(false),
            });
        }

        let bundle_hash = record.bundle_hash
            .ok_or_else(|| anyhow!("번들 해시 없음: {}", bundle_id))?;
        let params = BundleStatsParams {
            bundle_hash: bundle_hash.clone(),
            block_number: U64::from(record.target_block),
        };
        let stats: BundleStatsResponse = self.post_signed("flashbots_getBundleStatsV2", params).await?;

        Ok(BundleStats::Relay(RelayBundleStats {
            bundle_hash,
            is_high_priority: stats.is_high_priority,
            is_simulated: stats.is_simulated,
            simulated_at: stats.simulated_at,
            received_at: stats.received_at,
            considered_by_builders: stats.considered_by_builders_at.len(),
            sealed_by_builders: stats.sealed_by_builders_at.len(),
        }))
    }
}
