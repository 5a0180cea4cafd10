// Amounts are expressed in satoshis, the base unit of the chain

// Unsigned amount as reported by the node (capacities, forwarded amounts, fees)
pub type Amount = u64;

// Signed amount used for accounting, negative values are losses.
// Wide enough to sum u64::MAX sized amounts over any history without overflow
pub type SignedAmount = i128;

// Convert a node amount into the accounting domain, lossless
#[inline]
pub fn to_signed(amount: Amount) -> SignedAmount {
    SignedAmount::from(amount)
}
