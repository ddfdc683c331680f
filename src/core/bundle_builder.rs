use std::sync::Arc;
use anyhow::{Result, anyhow, Context};
use chrono::Utc;
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, U256};
use rust_decimal::Decimal;
use tracing::{info, debug, warn};

use crate::blockchain::{ChainClient, TransactionSigner};
use crate::config::Config;
use crate::constants::{SWAP_EXACT_ETH_FOR_TOKENS, SWAP_EXACT_TOKENS_FOR_ETH};
use crate::types::{
    BundleRequest, FeeParams, MevOpportunity, SignedBundleTransaction, TransactionRole,
};
use crate::utils::math::{eth_to_wei, format_eth, scale_wei};

/// 번들 사이징/수수료 파라미터
#[derive(Debug, Clone)]
pub struct BundleParams {
    /// 수익 중 블록 생산자에게 넘기는 비율
    pub tip_share: Decimal,
    /// 타겟 금액 대비 프론트런 크기
    pub front_run_fraction: Decimal,
    /// 우선 수수료 하한 (wei)
    pub min_priority_fee: U256,
    pub gas_limit: U256,
}

impl BundleParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tip_share: config.strategy.tip_share,
            front_run_fraction: config.strategy.front_run_fraction,
            min_priority_fee: config.min_priority_fee_wei(),
            gas_limit: U256::from(config.strategy.gas_limit),
        }
    }
}

/// 기회 하나로 프론트런/백런 두 트랜잭션 번들을 만든다
pub struct BundleBuilder {
    chain: Arc<dyn ChainClient>,
    signer: Arc<dyn TransactionSigner>,
    params: BundleParams,
}

impl BundleBuilder {
    pub fn new(chain: Arc<dyn ChainClient>, signer: Arc<dyn TransactionSigner>, params: BundleParams) -> Self {
        Self { chain, signer, params }
    }

    /// 번들 생성. 어느 단계든 실패하면 None (부분 서명 결과는 버려진다).
    pub async fn build(&self, opportunity: &MevOpportunity) -> Option<BundleRequest> {
        match self.try_build(opportunity).await {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                warn!("⚠️ 번들 생성 실패 ({}): {}", opportunity.id, e);
                None
            }
        }
    }

    async fn try_build(&self, opportunity: &MevOpportunity) -> Result<BundleRequest> {
        let target_value = opportunity.target_tx_value
            .ok_or_else(|| anyhow!("타겟 트랜잭션 금액이 없습니다"))?;

        let height = self.chain.current_block_height().await
            .context("블록 높이 조회 실패")?;
        let target_block = height + 1;

        let account = self.signer.address();
        let nonce = self.chain.account_nonce(account).await
            .context("논스 조회 실패")?;

        let profit = eth_to_wei(opportunity.estimated_profit)?;
        let tip = scale_wei(profit, self.params.tip_share)?;
        let front_run_value = scale_wei(target_value, self.params.front_run_fraction)?;

        let suggested = self.chain.fee_estimate().await
            .context("수수료 추정 실패")?;
        let fees = FeeParams {
            max_priority_fee_per_gas: suggested.max_priority_fee_per_gas.max(self.params.min_priority_fee),
            max_fee_per_gas: suggested.max_fee_per_gas.checked_add(tip)
                .ok_or_else(|| anyhow!("max fee overflow"))?,
        };

        debug!(
            "🧮 번들 계산: 수익 {} ETH, 팁 {} ETH, 프론트런 {} ETH, 논스 {}",
            format_eth(profit), format_eth(tip), format_eth(front_run_value), nonce
        );

        let front_run = self.sign_leg(
            TransactionRole::FrontRun,
            opportunity.router,
            nonce,
            front_run_value,
            front_run_payload(account),
            fees,
        ).await?;

        let back_run = self.sign_leg(
            TransactionRole::BackRun,
            opportunity.router,
            nonce + 1,
            U256::zero(),
            back_run_payload(account),
            fees,
        ).await?;

        let bundle = BundleRequest {
            id: format!("bundle_{}", uuid::Uuid::new_v4()),
            transactions: vec![front_run, back_run],
            block_number: target_block,
            tip,
            opportunity_id: opportunity.id.clone(),
            created_at: Utc::now(),
        };

        info!("📦 번들 생성됨: {} (타겟 블록 {}, 논스 {}~{})", bundle.id, target_block, nonce, nonce + 1);
        Ok(bundle)
    }

    async fn sign_leg(
        &self,
        role: TransactionRole,
        router: Address,
        nonce: U256,
        value: U256,
        payload: Bytes,
        fees: FeeParams,
    ) -> Result<SignedBundleTransaction> {
        let request = Eip1559TransactionRequest::new()
            .from(self.signer.address())
            .to(router)
            .value(value)
            .data(payload)
            .nonce(nonce)
            .gas(self.params.gas_limit)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .max_fee_per_gas(fees.max_fee_per_gas);

        let signed = self.signer.sign(request).await
            .with_context(|| format!("{:?} 트랜잭션 서명 실패", role))?;

        Ok(SignedBundleTransaction {
            role,
            hash: signed.hash,
            nonce,
            to: router,
            value,
            gas_limit: self.params.gas_limit,
            fees,
            raw: signed.raw,
        })
    }
}

/// swapExactETHForTokens(amountOutMin, path, to, deadline)
fn front_run_payload(recipient: Address) -> Bytes {
    let args = encode(&[
        Token::Uint(U256::zero()),
        Token::Array(vec![]),
        Token::Address(recipient),
        Token::Uint(U256::MAX),
    ]);
    [SWAP_EXACT_ETH_FOR_TOKENS.to_vec(), args].concat().into()
}

/// swapExactTokensForETH(amountIn, amountOutMin, path, to, deadline)
///
/// 거래 경로를 디코딩하지 않으므로 amountIn과 path는 빈 값으로 채운다.
fn back_run_payload(recipient: Address) -> Bytes {
    let args = encode(&[
        Token::Uint(U256::zero()),
        Token::Uint(U256::zero()),
        Token::Array(vec![]),
        Token::Address(recipient),
        Token::Uint(U256::MAX),
    ]);
    [SWAP_EXACT_TOKENS_FOR_ETH.to_vec(), args].concat().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use ethers::abi::{decode, ParamType};
    use ethers::types::{transaction::eip2718::TypedTransaction, H256};
    use ethers::utils::{keccak256, rlp::Rlp};
    use crate::blockchain::WalletSigner;
    use crate::config::TEST_PRIVATE_KEY;
    use crate::constants::UNISWAP_V2_ROUTER;
    use crate::mocks::MockChainClient;
    use crate::types::{OpportunityType, PendingTransaction};

    const GWEI: u64 = 1_000_000_000;
    const ETH: u64 = 1_000_000_000_000_000_000;

    fn signer() -> Arc<WalletSigner> {
        Arc::new(WalletSigner::from_private_key(TEST_PRIVATE_KEY, 1).unwrap())
    }

    fn opportunity(target_value: Option<U256>) -> MevOpportunity {
        MevOpportunity {
            id: "sandwich_test".to_string(),
            opportunity_type: OpportunityType::Sandwich,
            estimated_profit: Decimal::from_str("0.05").unwrap(),
            transactions: vec![PendingTransaction {
                hash: H256::repeat_byte(0x01),
                from: Address::repeat_byte(0x02),
                to: UNISWAP_V2_ROUTER.parse().ok(),
                value: U256::from(ETH),
                data: Bytes::default(),
            }],
            target_block: 0,
            router: UNISWAP_V2_ROUTER.parse().unwrap(),
            target_tx_value: target_value,
            detected_at: Utc::now(),
        }
    }

    fn builder(chain: Arc<MockChainClient>, signer: Arc<WalletSigner>) -> BundleBuilder {
        BundleBuilder::new(chain, signer, BundleParams::from_config(&Config::load_test_config()))
    }

    fn mock_chain(signer: &WalletSigner) -> MockChainClient {
        MockChainClient::new()
            .with_block_height(1_000)
            .with_nonce(signer.address(), 7)
            .with_fees(FeeParams {
                max_priority_fee_per_gas: U256::from(GWEI),
                max_fee_per_gas: U256::from(30 * GWEI),
            })
    }

    #[tokio::test]
    async fn test_bundle_math_for_one_eth_target() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer));
        let bundle = builder(chain, signer.clone())
            .build(&opportunity(Some(U256::from(ETH))))
            .await
            .unwrap();

        // 수익 0.05 ETH → 팁 0.025 ETH, 프론트런 0.1 ETH
        assert_eq!(bundle.tip, U256::from(25_000_000_000_000_000u64));
        assert_eq!(bundle.block_number, 1_001);
        assert_eq!(bundle.transactions.len(), 2);

        let front = &bundle.transactions[0];
        let back = &bundle.transactions[1];
        assert_eq!(front.role, TransactionRole::FrontRun);
        assert_eq!(back.role, TransactionRole::BackRun);
        assert_eq!(front.value, U256::from(100_000_000_000_000_000u64));
        assert_eq!(back.value, U256::zero());
        assert_eq!(front.nonce, U256::from(7));
        assert_eq!(back.nonce, U256::from(8));

        // 우선 수수료 하한 2 gwei, 최대 수수료 = 추정치 + 팁
        assert_eq!(front.fees, back.fees);
        assert_eq!(front.fees.max_priority_fee_per_gas, U256::from(2 * GWEI));
        assert_eq!(front.fees.max_fee_per_gas, U256::from(30 * GWEI) + bundle.tip);
        assert_eq!(bundle.front_run(), Some(front));
    }

    #[tokio::test]
    async fn test_signed_payload_decodes() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer));
        let bundle = builder(chain, signer.clone())
            .build(&opportunity(Some(U256::from(ETH))))
            .await
            .unwrap();

        let front = &bundle.transactions[0];
        let raw = front.raw.as_ref();
        assert_eq!(raw[0], 0x02);
        assert_eq!(H256::from(keccak256(raw)), front.hash);

        let (decoded, signature) = TypedTransaction::decode_signed(&Rlp::new(raw)).unwrap();
        assert_eq!(decoded.nonce(), Some(&U256::from(7)));
        assert_eq!(decoded.to_addr(), Some(&front.to));
        assert_eq!(signature.recover(decoded.sighash()).unwrap(), signer.address());
        assert_eq!(&decoded.data().unwrap().as_ref()[..4], &SWAP_EXACT_ETH_FOR_TOKENS);
    }

    #[tokio::test]
    async fn test_back_run_leg_sells_to_searcher() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer));
        let bundle = builder(chain, signer.clone())
            .build(&opportunity(Some(U256::from(ETH))))
            .await
            .unwrap();

        let back = &bundle.transactions[1];
        let (decoded, _) = TypedTransaction::decode_signed(&Rlp::new(back.raw.as_ref())).unwrap();
        assert_eq!(decoded.value(), Some(&U256::zero()));
        assert_eq!(decoded.nonce(), Some(&U256::from(8)));

        let data = decoded.data().unwrap();
        assert_eq!(&data.as_ref()[..4], &SWAP_EXACT_TOKENS_FOR_ETH);

        let args = decode(
            &[
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Array(Box::new(ParamType::Address)),
                ParamType::Address,
                ParamType::Uint(256),
            ],
            &data.as_ref()[4..],
        ).unwrap();
        assert_eq!(args[0], Token::Uint(U256::zero()));
        assert_eq!(args[2], Token::Array(vec![]));
        assert_eq!(args[3], Token::Address(signer.address()));
        assert_eq!(args[4], Token::Uint(U256::MAX));
    }

    #[tokio::test]
    async fn test_suggested_priority_fee_above_floor_is_kept() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer).with_fees(FeeParams {
            max_priority_fee_per_gas: U256::from(5 * GWEI),
            max_fee_per_gas: U256::from(40 * GWEI),
        }));
        let bundle = builder(chain, signer)
            .build(&opportunity(Some(U256::from(ETH))))
            .await
            .unwrap();

        assert_eq!(bundle.transactions[0].fees.max_priority_fee_per_gas, U256::from(5 * GWEI));
    }

    #[tokio::test]
    async fn test_missing_target_value_aborts_without_queries() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer));
        let result = builder(chain.clone(), signer).build(&opportunity(None)).await;

        assert!(result.is_none());
        assert_eq!(chain.nonce_queries().await, 0);
    }

    #[tokio::test]
    async fn test_network_failure_aborts() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer));
        chain.fail_fee_estimate(true).await;

        let result = builder(chain, signer).build(&opportunity(Some(U256::from(ETH)))).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_build_is_structurally_idempotent() {
        let signer = signer();
        let chain = Arc::new(mock_chain(&signer));
        let builder = builder(chain, signer);
        let opportunity = opportunity(Some(U256::from(ETH)));

        let first = builder.build(&opportunity).await.unwrap();
        let second = builder.build(&opportunity).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.block_number, second.block_number);
        assert_eq!(first.tip, second.tip);
        for (a, b) in first.transactions.iter().zip(&second.transactions) {
            assert_eq!(a.nonce, b.nonce);
            assert_eq!(a.value, b.value);
            assert_eq!(a.fees, b.fees);
            assert_eq!(a.raw, b.raw);
        }
    }
}
