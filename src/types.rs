use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};

/// 멤풀에서 읽어온 펜딩 트랜잭션 스냅샷 (읽기 전용)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingTransaction {
    pub hash: H256,
    pub from: Address,
    /// 컨트랙트 생성 트랜잭션은 수신자가 없음
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

impl From<ethers::types::Transaction> for PendingTransaction {
    fn from(tx: ethers::types::Transaction) -> Self {
        Self {
            hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value: tx.value,
            data: tx.input,
        }
    }
}

/// Opportunity types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OpportunityType {
    Sandwich,
    Arbitrage,
    Liquidation,
}

impl std::fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpportunityType::Sandwich => write!(f, "Sandwich"),
            OpportunityType::Arbitrage => write!(f, "Arbitrage"),
            OpportunityType::Liquidation => write!(f, "Liquidation"),
        }
    }
}

/// MEV Opportunity
///
/// 한 사이클 안에서 생성되고 번들 빌더가 소비한다. 저장되지 않음.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MevOpportunity {
    pub id: String,
    pub opportunity_type: OpportunityType,
    /// 예상 순수익 (ETH 단위, 음수 불가)
    pub estimated_profit: Decimal,
    /// 기회와 관련된 트랜잭션들 (첫 번째가 타겟 트랜잭션)
    pub transactions: Vec<PendingTransaction>,
    /// 스캔 시점의 다음 블록 (알 수 없으면 0)
    pub target_block: u64,
    /// 타겟이 호출한 라우터 컨트랙트
    pub router: Address,
    /// 번들 사이징의 유일한 입력값
    pub target_tx_value: Option<U256>,
    pub detected_at: DateTime<Utc>,
}

impl MevOpportunity {
    pub fn target_tx(&self) -> Option<&PendingTransaction> {
        self.transactions.first()
    }
}

/// 번들 내 트랜잭션 역할
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransactionRole {
    /// 타겟 트랜잭션 직전에 실행 (매수)
    FrontRun,
    /// 타겟 트랜잭션 직후에 실행 (매도)
    BackRun,
}

/// EIP-1559 수수료 파라미터 (wei)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeParams {
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
}

/// 서명 완료된 번들 트랜잭션
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignedBundleTransaction {
    pub role: TransactionRole,
    pub hash: H256,
    pub nonce: U256,
    pub to: Address,
    pub value: U256,
    pub gas_limit: U256,
    pub fees: FeeParams,
    /// RLP 인코딩된 서명 트랜잭션
    pub raw: Bytes,
}

/// 릴레이에 제출할 번들. 트랜잭션 순서가 곧 실행 순서.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleRequest {
    pub id: String,
    pub transactions: Vec<SignedBundleTransaction>,
    /// 빌드 시점 체인 높이 + 1
    pub block_number: u64,
    /// 블록 생산자에게 넘기는 팁 (wei)
    pub tip: U256,
    pub opportunity_id: String,
    pub created_at: DateTime<Utc>,
}

impl BundleRequest {
    pub fn raw_transactions(&self) -> Vec<Bytes> {
        self.transactions.iter().map(|tx| tx.raw.clone()).collect()
    }

    pub fn front_run(&self) -> Option<&SignedBundleTransaction> {
        self.transactions.iter().find(|tx| tx.role == TransactionRole::FrontRun)
    }
}

/// 릴레이 제출 후 포함 여부 조회에 쓰는 핸들
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionHandle {
    pub bundle_id: String,
    /// 릴레이가 돌려준 번들 해시 (시뮬레이션 모드에서는 없음)
    pub bundle_hash: Option<String>,
    pub target_block: u64,
    pub tx_hashes: Vec<H256>,
    /// 실제 브로드캐스트 없이 eth_callBundle만 수행된 경우
    pub simulated: bool,
}

/// 포함 대기 결과
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InclusionResponse {
    pub included: bool,
    pub block_number: Option<u64>,
    pub error: Option<String>,
}

impl InclusionResponse {
    pub fn included_at(block_number: u64) -> Self {
        Self {
            included: true,
            block_number: Some(block_number),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            included: false,
            block_number: None,
            error: Some(error.into()),
        }
    }

    /// 오류가 없고 블록 번호가 있을 때만 포함으로 인정
    pub fn is_confirmed(&self) -> bool {
        self.error.is_none() && self.block_number.is_some()
    }
}

/// 트랜잭션 영수증 요약
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceiptSummary {
    pub block_number: u64,
    pub success: bool,
}

/// 번들 제출 상태: Idle → Submitted → {Included, Rejected}
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitted,
    Included(u64),
    Rejected(String),
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Included(_) | SubmissionState::Rejected(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BundleSubmissionResult {
    pub bundle_id: String,
    /// 릴레이가 돌려준 번들 해시
    pub bundle_hash: Option<String>,
    pub success: bool,
    pub block_number: Option<u64>,
    pub error: Option<String>,
    pub state: SubmissionState,
    pub target_block: u64,
    pub settled_at: DateTime<Utc>,
}

/// 릴레이가 보고한 번들 통계 (flashbots_getBundleStatsV2)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayBundleStats {
    pub bundle_hash: String,
    pub is_high_priority: bool,
    pub is_simulated: bool,
    pub simulated_at: Option<String>,
    pub received_at: Option<String>,
    pub considered_by_builders: usize,
    pub sealed_by_builders: usize,
}

/// 번들 통계 - 출처(실제 릴레이 / 시뮬레이션)를 태그로 구분
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum BundleStats {
    Relay(RelayBundleStats),
    Simulated {
        bundle_id: String,
        target_block: u64,
        included: bool,
    },
}

impl BundleStats {
    pub fn is_simulated(&self) -> bool {
        matches!(self, BundleStats::Simulated { .. })
    }
}

/// Error types
#[derive(thiserror::Error, Debug)]
pub enum MevError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Result type alias
pub type MevResult<T> = Result<T, MevError>;
