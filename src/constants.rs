// Gas limits
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;

// Time constants
pub const BLOCK_TIME: u64 = 12;
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 5_000;

// Scanner defaults
pub const DEFAULT_MAX_PENDING_TRANSACTIONS: usize = 10;
pub const DEFAULT_MIN_TARGET_VALUE_ETH: &str = "0.05";

// Bundle economics
pub const DEFAULT_PROFIT_SHARE: &str = "0.05";
pub const DEFAULT_TIP_SHARE: &str = "0.5";
pub const DEFAULT_FRONT_RUN_FRACTION: &str = "0.1";
pub const DEFAULT_MIN_PRIORITY_FEE_GWEI: u64 = 2;

// Relay
pub const FLASHBOTS_MAINNET_RELAY: &str = "https://relay.flashbots.net";
pub const FLASHBOTS_SEPOLIA_RELAY: &str = "https://relay-sepolia.flashbots.net";
pub const DEFAULT_MAX_WAIT_BLOCKS: u64 = 1;
/// 릴레이 클라이언트가 통계 조회용으로 기억하는 최근 번들 수
pub const MAX_TRACKED_BUNDLES: usize = 256;

// DEX Router addresses
pub const UNISWAP_V2_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";
pub const UNISWAP_V3_ROUTER: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";
pub const SUSHISWAP_ROUTER: &str = "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F";
pub const ONEINCH_ROUTER: &str = "0x1111111254EEB25477B68fb85Ed929f73A960582";

pub const KNOWN_DEX_ROUTERS: [&str; 4] = [
    UNISWAP_V2_ROUTER,
    UNISWAP_V3_ROUTER,
    SUSHISWAP_ROUTER,
    ONEINCH_ROUTER,
];

// Function selectors
pub const SWAP_EXACT_ETH_FOR_TOKENS: [u8; 4] = [0x7f, 0xf3, 0x6a, 0xb5];
pub const SWAP_EXACT_TOKENS_FOR_ETH: [u8; 4] = [0x18, 0xcb, 0xaf, 0xe5];
