use serde::{Deserialize, Serialize};
use ethers::types::{Bytes, U64};

/// JSON-RPC 요청 봉투
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: [P; 1],
}

impl<P: Serialize> JsonRpcRequest<P> {
    pub fn new(method: &'static str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params: [params],
        }
    }
}

/// JSON-RPC 응답 봉투
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub result: Option<R>,
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

/// eth_sendBundle 파라미터
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBundleParams {
    pub txs: Vec<Bytes>,
    pub block_number: U64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBundleResult {
    pub bundle_hash: String,
}

/// eth_callBundle 파라미터 (번들 시뮬레이션)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBundleParams {
    pub txs: Vec<Bytes>,
    pub block_number: U64,
    pub state_block_number: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBundleResult {
    #[serde(default)]
    pub bundle_hash: Option<String>,
    #[serde(default)]
    pub results: Vec<CallBundleTxResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBundleTxResult {
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub gas_used: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub revert: Option<String>,
}

impl CallBundleResult {
    /// 첫 번째 실패 사유 (revert 또는 error)
    pub fn first_failure(&self) -> Option<String> {
        self.results.iter().find_map(|r| {
            r.error.clone()
                .or_else(|| r.revert.clone())
                .map(|reason| match &r.tx_hash {
                    Some(hash) => format!("{}: {}", hash, reason),
                    None => reason,
                })
        })
    }

    pub fn total_gas_used(&self) -> u64 {
        self.results.iter().filter_map(|r| r.gas_used).sum()
    }
}

/// flashbots_getBundleStatsV2 파라미터
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStatsParams {
    pub bundle_hash: String,
    pub block_number: U64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStatsResponse {
    #[serde(default)]
    pub is_high_priority: bool,
    #[serde(default)]
    pub is_simulated: bool,
    #[serde(default)]
    pub simulated_at: Option<String>,
    #[serde(default)]
    pub received_at: Option<String>,
    #[serde(default)]
    pub considered_by_builders_at: Vec<serde_json::Value>,
    #[serde(default)]
    pub sealed_by_builders_at: Vec<serde_json::Value>,
}
