pub const VERSION: &str = env!("BUILD_VERSION");

// Vulnerability this tool audits for
pub const CVE_ID: &str = "CVE-2019-12999";

// 8 decimals numbers
pub const COIN_DECIMALS: u8 = 8;
// 100 000 000 satoshis to represent 1 BTC
pub const COIN_VALUE: u64 = 10u64.pow(COIN_DECIMALS as u32);
// Ticker used when displaying amounts
pub const COIN_TICKER: &str = "BTC";

// Forwarding history request bounds
// The node rejects a start time of 0, the first valid second is 1
pub const FORWARDING_HISTORY_START_TIME: u64 = 1;
// Effectively unbounded so the whole ledger is returned in one response
pub const FORWARDING_HISTORY_MAX_EVENTS: u32 = u32::MAX;
