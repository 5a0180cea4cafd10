use crate::{
    amount::SignedAmount,
    config::{COIN_DECIMALS, COIN_TICKER, COIN_VALUE},
};

// Format a satoshi amount into a human readable coin amount
// Negative values keep their sign: -99900 => "-0.00099900 BTC"
pub fn format_coin(value: SignedAmount) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    format!(
        "{}{}.{:0width$} {}",
        sign,
        abs / u128::from(COIN_VALUE),
        abs % u128::from(COIN_VALUE),
        COIN_TICKER,
        width = COIN_DECIMALS as usize
    )
}
