use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, debug};

use super::bundle_builder::BundleBuilder;
use super::bundle_submitter::BundleSubmitter;
use super::scanner::OpportunityScanner;
use super::status::StatusBoard;

/// 한 사이클의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    NoOpportunity,
    BuildFailed { opportunity_id: String },
    Submitted { bundle_id: String, included: bool },
}

/// Scanner → Estimator → Builder → Submitter 사이클을 고정 주기로 구동
pub struct ScanScheduler {
    scanner: Arc<OpportunityScanner>,
    builder: Arc<BundleBuilder>,
    submitter: Arc<BundleSubmitter>,
    status: Arc<StatusBoard>,
    interval: Duration,
}

impl ScanScheduler {
    pub fn new(
        scanner: Arc<OpportunityScanner>,
        builder: Arc<BundleBuilder>,
        submitter: Arc<BundleSubmitter>,
        status: Arc<StatusBoard>,
        interval: Duration,
    ) -> Self {
        Self {
            scanner,
            builder,
            submitter,
            status,
            interval,
        }
    }

    /// 사이클 1회 실행. 첫 번째 기회만 처리한다.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let report = self.scanner.scan_with_report().await;
        self.status.record_scan(&report).await;

        let mut opportunities = report.opportunities.into_iter();
        let Some(opportunity) = opportunities.next() else {
            return CycleOutcome::NoOpportunity;
        };

        let skipped = opportunities.len();
        if skipped > 0 {
            debug!("이번 사이클에서 {}개 기회는 처리하지 않음", skipped);
        }

        let Some(bundle) = self.builder.build(&opportunity).await else {
            self.status.record_build_failure().await;
            return CycleOutcome::BuildFailed {
                opportunity_id: opportunity.id,
            };
        };
        self.status.record_bundle_built().await;

        let included = self.submitter.submit(&bundle).await;
        CycleOutcome::Submitted {
            bundle_id: bundle.id,
            included,
        }
    }

    /// 취소될 때까지 사이클 반복
    ///
    /// 다음 틱은 현재 사이클(제출 대기 포함)이 끝난 뒤에야 예약된다.
    /// 취소는 사이클 사이에서만 확인되므로 진행 중인 포함 대기는 끝까지 실행된다.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("⏱️ 스캔 스케줄러 시작 (주기 {:?})", self.interval);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = self.run_cycle().await;
            debug!("🔁 사이클 결과: {:?}", outcome);

            if shutdown.is_cancelled() {
                break;
            }
            ticker.reset();
        }

        info!("🛑 스캔 스케줄러 중지됨");
    }
}
