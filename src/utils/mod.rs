pub mod math;

pub use math::{eth_to_wei, format_eth, gwei_to_wei, scale_wei, wei_to_eth};
