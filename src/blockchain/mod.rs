pub mod rpc;
pub mod signer;

pub use rpc::{ChainClient, EthersChainClient};
pub use signer::{SignedTransaction, TransactionSigner, WalletSigner};
