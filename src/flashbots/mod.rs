pub mod bundle;
pub mod client;

pub use client::{FlashbotsRelayClient, RelayClient};
