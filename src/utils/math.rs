use anyhow::{anyhow, Result};
use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 1 ETH = 10^18 wei
pub const WEI_DECIMALS: u32 = 18;
const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;
const WEI_PER_GWEI: u64 = 1_000_000_000;

/// wei 금액을 ETH 단위 Decimal로 변환 (정밀도 손실 없음)
pub fn wei_to_eth(wei: U256) -> Result<Decimal> {
    if wei > U256::from(u128::MAX) {
        return Err(anyhow!("wei amount too large for decimal conversion: {}", wei));
    }
    let raw = i128::try_from(wei.as_u128())
        .map_err(|_| anyhow!("wei amount out of range: {}", wei))?;
    Decimal::try_from_i128_with_scale(raw, WEI_DECIMALS)
        .map_err(|e| anyhow!("wei amount not representable as decimal: {}", e))
}

/// ETH 단위 Decimal을 wei로 변환 (소수점 18자리 이하는 버림)
pub fn eth_to_wei(eth: Decimal) -> Result<U256> {
    if eth.is_sign_negative() && !eth.is_zero() {
        return Err(anyhow!("negative ETH amount: {}", eth));
    }
    let scaled = eth
        .checked_mul(Decimal::from(WEI_PER_ETH))
        .ok_or_else(|| anyhow!("ETH amount overflow: {}", eth))?;
    let wei = scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| anyhow!("ETH amount not convertible to wei: {}", eth))?;
    Ok(U256::from(wei))
}

/// wei 금액에 비율을 곱함 (예: 타겟 금액의 10%)
pub fn scale_wei(wei: U256, factor: Decimal) -> Result<U256> {
    let eth = wei_to_eth(wei)?;
    let scaled = eth
        .checked_mul(factor)
        .ok_or_else(|| anyhow!("scaling overflow: {} x {}", eth, factor))?;
    eth_to_wei(scaled)
}

pub fn gwei_to_wei(gwei: u64) -> U256 {
    U256::from(gwei) * U256::from(WEI_PER_GWEI)
}

/// ETH 금액 포맷팅
pub fn format_eth(wei: U256) -> String {
    match wei_to_eth(wei) {
        Ok(eth) => format!("{:.6}", eth),
        Err(_) => format!("{} wei", wei),
    }
}
