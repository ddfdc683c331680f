use std::collections::VecDeque;
use std::time::Instant;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

use crate::types::{BundleSubmissionResult, MevOpportunity};
use super::scanner::ScanReport;

/// 실행 통계 카운터
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub cycles: u64,
    pub transactions_scanned: u64,
    pub candidates_found: u64,
    pub opportunities_found: u64,
    pub bundles_built: u64,
    pub build_failures: u64,
    pub bundles_submitted: u64,
    pub bundles_included: u64,
    pub bundles_rejected: u64,
}

impl RunStats {
    pub fn success_rate(&self) -> f64 {
        if self.bundles_submitted == 0 {
            0.0
        } else {
            self.bundles_included as f64 / self.bundles_submitted as f64
        }
    }
}

/// 외부(상태 API 등)에 노출되는 읽기 전용 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct SearcherStatus {
    pub is_running: bool,
    pub uptime_seconds: u64,
    pub recent_opportunities: Vec<MevOpportunity>,
    pub last_submission: Option<BundleSubmissionResult>,
    pub stats: RunStats,
}

#[derive(Debug, Default)]
struct StatusInner {
    recent_opportunities: VecDeque<MevOpportunity>,
    last_submission: Option<BundleSubmissionResult>,
    stats: RunStats,
}

/// 최근 기회, 마지막 제출 결과, 카운터를 보관
pub struct StatusBoard {
    inner: RwLock<StatusInner>,
    capacity: usize,
    started_at: Instant,
}

impl StatusBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(StatusInner::default()),
            capacity: capacity.max(1),
            started_at: Instant::now(),
        }
    }

    pub async fn record_scan(&self, report: &ScanReport) {
        let mut inner = self.inner.write().await;
        inner.stats.cycles += 1;
        inner.stats.transactions_scanned += report.scanned as u64;
        inner.stats.candidates_found += report.candidates as u64;
        inner.stats.opportunities_found += report.opportunities.len() as u64;

        for opportunity in &report.opportunities {
            if inner.recent_opportunities.len() == self.capacity {
                inner.recent_opportunities.pop_front();
            }
            inner.recent_opportunities.push_back(opportunity.clone());
        }
    }

    pub async fn record_bundle_built(&self) {
        self.inner.write().await.stats.bundles_built += 1;
    }

    pub async fn record_build_failure(&self) {
        self.inner.write().await.stats.build_failures += 1;
    }

    pub async fn record_submission(&self, result: &BundleSubmissionResult) {
        let mut inner = self.inner.write().await;
        inner.stats.bundles_submitted += 1;
        if result.success {
            inner.stats.bundles_included += 1;
        } else {
            inner.stats.bundles_rejected += 1;
        }
        inner.last_submission = Some(result.clone());
    }

    pub async fn snapshot(&self, is_running: bool) -> SearcherStatus {
        let inner = self.inner.read().await;
        SearcherStatus {
            is_running,
            uptime_seconds: self.started_at.elapsed().as_secs(),
            // 최신순
            recent_opportunities: inner.recent_opportunities.iter().rev().cloned().collect(),
            last_submission: inner.last_submission.clone(),
            stats: inner.stats.clone(),
        }
    }
}

impl SearcherStatus {
    /// 주기적 상태 리포트 출력
    pub fn log_report(&self) {
        info!("📊 서쳐 상태 리포트 (가동 {}초):", self.uptime_seconds);
        info!("  🔄 스캔 사이클: {}", self.stats.cycles);
        info!("  📥 스캔한 트랜잭션: {}", self.stats.transactions_scanned);
        info!("  🎯 기회 발견: {} (후보 {})", self.stats.opportunities_found, self.stats.candidates_found);
        info!("  📦 번들 생성: {} (실패 {})", self.stats.bundles_built, self.stats.build_failures);
        info!("  📤 번들 제출: {}", self.stats.bundles_submitted);
        info!("  ✅ 번들 포함: {} / ❌ 거절: {}", self.stats.bundles_included, self.stats.bundles_rejected);
        info!("  📈 성공률: {:.2}%", self.stats.success_rate() * 100.0);

        if let Some(last) = &self.last_submission {
            match &last.error {
                Some(error) => info!("  🕐 마지막 제출: {} 실패 ({})", last.bundle_id, error),
                None => info!("  🕐 마지막 제출: {} 포함 (블록 {:?})", last.bundle_id, last.block_number),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ethers::types::Address;
    use rust_decimal::Decimal;
    use crate::types::{OpportunityType, SubmissionState};

    fn opportunity(id: &str) -> MevOpportunity {
        MevOpportunity {
            id: id.to_string(),
            opportunity_type: OpportunityType::Sandwich,
            estimated_profit: Decimal::ONE,
            transactions: vec![],
            target_block: 1,
            router: Address::zero(),
            target_tx_value: None,
            detected_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_recent_opportunities_are_bounded() {
        let board = StatusBoard::new(2);
        let report = ScanReport {
            scanned: 3,
            candidates: 3,
            opportunities: vec![opportunity("a"), opportunity("b"), opportunity("c")],
        };
        board.record_scan(&report).await;

        let status = board.snapshot(true).await;
        let ids: Vec<&str> = status.recent_opportunities.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(status.stats.cycles, 1);
        assert_eq!(status.stats.opportunities_found, 3);
    }

    #[tokio::test]
    async fn test_submission_outcomes_are_counted() {
        let board = StatusBoard::new(5);
        let rejected = BundleSubmissionResult {
            bundle_id: "bundle_1".to_string(),
            bundle_hash: None,
            success: false,
            block_number: None,
            error: Some("not included".to_string()),
            state: SubmissionState::Rejected("not included".to_string()),
            target_block: 10,
            settled_at: Utc::now(),
        };
        board.record_submission(&rejected).await;

        let included = BundleSubmissionResult {
            bundle_id: "bundle_2".to_string(),
            success: true,
            block_number: Some(11),
            error: None,
            state: SubmissionState::Included(11),
            target_block: 11,
            ..rejected
        };
        board.record_submission(&included).await;

        let status = board.snapshot(false).await;
        assert_eq!(status.stats.bundles_submitted, 2);
        assert_eq!(status.stats.bundles_included, 1);
        assert_eq!(status.stats.bundles_rejected, 1);
        assert!((status.stats.success_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(status.last_submission.unwrap().bundle_id, "bundle_2");
    }
}
