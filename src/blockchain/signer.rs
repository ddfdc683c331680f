use anyhow::Result;
use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest, H256,
};
use tracing::info;

use crate::types::{MevError, MevResult};

/// 서명된 트랜잭션
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    pub hash: H256,
    /// RLP 인코딩된 서명 트랜잭션
    pub raw: Bytes,
}

/// 하나의 계정/키에 묶인 트랜잭션 서명자
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    async fn sign(&self, request: Eip1559TransactionRequest) -> Result<SignedTransaction>;
}

/// 로컬 개인키 기반 서명자
pub struct WalletSigner {
    wallet: LocalWallet,
}

impl WalletSigner {
    pub fn from_private_key(private_key: &str, chain_id: u64) -> MevResult<Self> {
        let key = private_key.trim().trim_start_matches("0x");
        let wallet: LocalWallet = key.parse()
            .map_err(|e| MevError::Signer(format!("Invalid private key: {}", e)))?;
        let wallet = wallet.with_chain_id(chain_id);

        info!("🔑 서명 지갑 초기화 완료: {:?}", wallet.address());
        Ok(Self { wallet })
    }

    /// 임의 키로 서명자 생성 (mock 모드)
    pub fn random(chain_id: u64) -> Self {
        let wallet = LocalWallet::new(&mut rand::thread_rng()).with_chain_id(chain_id);
        Self { wallet }
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }
}

#[async_trait]
impl TransactionSigner for WalletSigner {
    fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn sign(&self, request: Eip1559TransactionRequest) -> Result<SignedTransaction> {
        let request = if request.chain_id.is_none() {
            request.chain_id(self.wallet.chain_id())
        } else {
            request
        };
        let request = if request.from.is_none() {
            request.from(self.wallet.address())
        } else {
            request
        };

        let typed_tx: TypedTransaction = request.into();
        let signature = self.wallet.sign_transaction(&typed_tx).await?;

        Ok(SignedTransaction {
            hash: typed_tx.hash(&signature),
            raw: typed_tx.rlp_signed(&signature),
        })
    }
}
