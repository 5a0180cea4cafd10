use crate::{amount::Amount, channel::ChannelId, time::TimestampSeconds};
use serde::{Deserialize, Serialize};

/// A payment the node routed: received on `chan_in`, sent on `chan_out`.
///
/// The difference between both amounts is the fee the node kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingEvent {
    pub timestamp: TimestampSeconds,
    pub chan_in: ChannelId,
    pub chan_out: ChannelId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub fee: Amount,
}

impl ForwardingEvent {
    // Build an event from both legs, the fee is derived from them
    pub fn new(
        chan_in: ChannelId,
        chan_out: ChannelId,
        amount_in: Amount,
        amount_out: Amount,
    ) -> Self {
        Self {
            timestamp: 0,
            chan_in,
            chan_out,
            amount_in,
            amount_out,
            fee: amount_in.saturating_sub(amount_out),
        }
    }

}
