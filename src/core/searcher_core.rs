use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use anyhow::Result;
use ethers::types::Address;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, error};

use crate::blockchain::{ChainClient, EthersChainClient, TransactionSigner, WalletSigner};
use crate::config::Config;
use crate::flashbots::{FlashbotsRelayClient, RelayClient};
use crate::mocks::{get_mock_config, MockChainClient, MockRelayClient};
use crate::types::{BundleStats, MevError, MevResult};
use super::bundle_builder::{BundleBuilder, BundleParams};
use super::bundle_submitter::BundleSubmitter;
use super::profitability::{FixedShareEstimation, ProfitEstimator};
use super::scanner::{CandidateFilter, OpportunityScanner};
use super::scheduler::ScanScheduler;
use super::status::{SearcherStatus, StatusBoard};

/// 번들 서쳐 엔진
///
/// 체인 클라이언트, 서명자, 릴레이 클라이언트를 주입받아 파이프라인을 구성한다.
pub struct SearcherCore {
    config: Arc<Config>,
    signer_address: Address,
    scheduler: Arc<ScanScheduler>,
    submitter: Arc<BundleSubmitter>,
    status: Arc<StatusBoard>,
    is_running: Arc<AtomicBool>,
    shutdown: Mutex<Option<CancellationToken>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SearcherCore {
    pub fn new(
        config: Arc<Config>,
        chain: Arc<dyn ChainClient>,
        signer: Arc<dyn TransactionSigner>,
        relay: Arc<dyn RelayClient>,
    ) -> MevResult<Self> {
        info!("🔧 SearcherCore 초기화 중...");

        let filter = CandidateFilter::from_config(&config)?;
        let estimator = Arc::new(ProfitEstimator::new(
            filter.clone(),
            Arc::new(FixedShareEstimation::new(config.strategy.profit_share)),
        ));
        let status = Arc::new(StatusBoard::new(config.monitoring.recent_opportunities));

        let scanner = Arc::new(OpportunityScanner::new(
            Arc::clone(&chain),
            filter,
            estimator,
            config.scanner.max_pending_transactions,
        ));
        let signer_address = signer.address();
        let builder = Arc::new(BundleBuilder::new(chain, signer, BundleParams::from_config(&config)));
        let submitter = Arc::new(BundleSubmitter::new(relay, Arc::clone(&status)));
        let scheduler = Arc::new(ScanScheduler::new(
            scanner,
            builder,
            Arc::clone(&submitter),
            Arc::clone(&status),
            Duration::from_millis(config.scheduler.interval_ms),
        ));

        info!("✅ SearcherCore 초기화 완료 (계정 {:?})", signer_address);

        Ok(Self {
            config,
            signer_address,
            scheduler,
            submitter,
            status,
            is_running: Arc::new(AtomicBool::new(false)),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        })
    }

    /// 설정에 따라 실제 또는 mock 협력자로 엔진 구성
    ///
    /// 서명 키나 릴레이 설정이 잘못되면 오류를 반환하며, 호출자는 서쳐를 띄우지 않아야 한다.
    pub async fn from_config(config: Arc<Config>) -> MevResult<Self> {
        let mock = config.is_mock();
        Self::from_config_with_mode(config, mock).await
    }

    /// `API_MODE` 환경 변수와 무관하게 mock 여부를 직접 지정
    pub async fn from_config_with_mode(config: Arc<Config>, mock: bool) -> MevResult<Self> {
        config.validate_for(mock)?;

        if mock {
            let mock_config = get_mock_config();
            info!("🎭 Mock 모드로 서쳐 구성");

            let signer: Arc<dyn TransactionSigner> = if config.has_private_key() {
                Arc::new(WalletSigner::from_private_key(&config.flashbots.private_key, mock_config.chain_id)?)
            } else {
                Arc::new(WalletSigner::random(mock_config.chain_id))
            };
            let relay = Arc::new(MockRelayClient::from_mock_config(&mock_config));
            let chain = Arc::new(MockChainClient::synthetic(mock_config));

            return Self::new(config, chain, signer, relay);
        }

        let chain = EthersChainClient::connect(&config.network.rpc_url).await
            .map_err(|e| MevError::Network(format!("RPC 연결 실패: {}", e)))?;
        if chain.chain_id() != config.network.chain_id {
            warn!("⚠️ 설정된 체인 ID({})와 노드 체인 ID({})가 다릅니다", config.network.chain_id, chain.chain_id());
        }

        let signer = Arc::new(WalletSigner::from_private_key(&config.flashbots.private_key, chain.chain_id())?);
        let chain: Arc<dyn ChainClient> = Arc::new(chain);
        let relay = Arc::new(FlashbotsRelayClient::new(&config, Arc::clone(&chain))?);

        Self::new(config, chain, signer, relay)
    }

    /// 스케줄러 시작 (백그라운드 태스크)
    ///
    /// 토큰과 태스크 핸들은 `shutdown` 잠금을 쥔 채 저장되므로, 뒤이은 `stop`은 항상 이 태스크를 본다.
    pub async fn start(&self) -> Result<()> {
        let mut shutdown = self.shutdown.lock().await;
        if shutdown.is_some() {
            warn!("⚠️ SearcherCore가 이미 실행 중입니다");
            return Ok(());
        }

        info!("🚀 SearcherCore 시작 중...");
        let token = CancellationToken::new();
        let scheduler = Arc::clone(&self.scheduler);
        let is_running = Arc::clone(&self.is_running);
        let run_token = token.clone();

        self.is_running.store(true, Ordering::SeqCst);
        let handle = tokio::spawn(async move {
            scheduler.run(run_token).await;
            is_running.store(false, Ordering::SeqCst);
        });

        *self.task.lock().await = Some(handle);
        *shutdown = Some(token);

        info!("🎯 SearcherCore가 성공적으로 시작되었습니다!");
        Ok(())
    }

    /// 스케줄러 중지. 진행 중인 사이클은 끝날 때까지 기다린다.
    pub async fn stop(&self) -> Result<()> {
        let mut shutdown = self.shutdown.lock().await;
        let Some(token) = shutdown.take() else {
            warn!("⚠️ SearcherCore가 이미 중지됨");
            return Ok(());
        };

        info!("🛑 SearcherCore 중지 중...");
        token.cancel();

        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                error!("❌ 스케줄러 태스크 종료 오류: {}", e);
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("✅ SearcherCore 중지됨");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub async fn status(&self) -> SearcherStatus {
        self.status.snapshot(self.is_running()).await
    }

    pub async fn bundle_stats(&self, bundle_id: &str) -> Option<BundleStats> {
        self.submitter.stats(bundle_id).await
    }

    pub fn signer_address(&self) -> Address {
        self.signer_address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
