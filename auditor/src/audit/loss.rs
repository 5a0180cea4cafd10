use std::collections::HashMap;

use chanaudit_common::{
    amount::{to_signed, SignedAmount},
    api::node::ForwardingHistoryParams,
    channel::ChannelId,
    forwarding::ForwardingEvent,
    time::TimestampSeconds,
};
use log::{debug, info};
use rayon::prelude::*;

use super::{detector::InvalidChannelSet, AuditError};
use crate::source::NodeSource;

// Below this many events a single fold is faster than splitting the work
pub const DEFAULT_FOLD_CHUNK_SIZE: usize = 4096;

/// Net value attributed to each invalid channel by the forwards that used it.
///
/// Negative entries are losses for the node operator. Only channels from the
/// invalid set ever get an entry, and only when a forward touched them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LossLedger {
    entries: HashMap<ChannelId, SignedAmount>,
}

impl LossLedger {
    // Account a single forward against the invalid channels it touched.
    //
    // Inbound leg invalid: the node handed out real coins on the outgoing
    // channel for counterfeit ones received, and the fee it believed it kept
    // was never backed either, so the channel is debited `amount_in - fee`.
    // Outbound leg invalid: real coins came in and only counterfeit ones went
    // out, so the channel is credited the full `amount_out`.
    pub fn apply(&mut self, event: &ForwardingEvent, invalid: &InvalidChannelSet) {
        if invalid.contains(&event.chan_in) {
            let delta = to_signed(event.amount_in) - to_signed(event.fee);
            self.add(event.chan_in, -delta);
        }

        if invalid.contains(&event.chan_out) {
            self.add(event.chan_out, to_signed(event.amount_out));
        }
    }

    // Sequential fold of a forwarding history
    pub fn from_events<'a, I>(events: I, invalid: &InvalidChannelSet) -> Self
    where
        I: IntoIterator<Item = &'a ForwardingEvent>,
    {
        events.into_iter().fold(Self::default(), |mut ledger, event| {
            ledger.apply(event, invalid);
            ledger
        })
    }

    // Same result as `from_events`: the history is split in chunks folded on
    // the rayon pool, partial ledgers are then merged entry by entry.
    pub fn from_events_parallel(
        events: &[ForwardingEvent],
        invalid: &InvalidChannelSet,
        chunk_size: usize,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        if events.len() <= chunk_size {
            return Self::from_events(events, invalid);
        }

        events
            .par_chunks(chunk_size)
            .map(|chunk| Self::from_events(chunk, invalid))
            .reduce(Self::default, Self::merge)
    }

    // Entry-wise addition of two partial ledgers
    pub fn merge(mut self, other: Self) -> Self {
        for (channel, amount) in other.entries {
            self.add(channel, amount);
        }
        self
    }

    // Exact accumulation: every term fits in 65 bits, the sum can not reach i128 bounds
    fn add(&mut self, channel: ChannelId, amount: SignedAmount) {
        *self.entries.entry(channel).or_insert(0) += amount;
    }

    pub fn get(&self, channel: &ChannelId) -> Option<SignedAmount> {
        self.entries.get(channel).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &SignedAmount)> {
        self.entries.iter()
    }

    // Entries ordered by channel, for reporting
    pub fn sorted_entries(&self) -> Vec<(ChannelId, SignedAmount)> {
        let mut entries: Vec<(ChannelId, SignedAmount)> =
            self.entries.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(channel, _)| *channel);
        entries
    }

    // Net result over every channel, negative when the operator lost funds
    pub fn total(&self) -> SignedAmount {
        self.entries.values().sum()
    }
}

/// Replays the forwarding history against the invalid channels.
pub struct LossQuantifier {
    chunk_size: usize,
}

impl Default for LossQuantifier {
    fn default() -> Self {
        Self::new(DEFAULT_FOLD_CHUNK_SIZE)
    }
}

impl LossQuantifier {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    // Fetch the whole forwarding history up to `now` and attribute it.
    // Without the complete history the figures would be wrong, so a failed
    // request aborts the audit. The fold runs on the blocking pool, off the
    // async workers.
    pub async fn quantify<S: NodeSource + ?Sized>(
        &self,
        source: &S,
        invalid: &InvalidChannelSet,
        now: TimestampSeconds,
    ) -> Result<LossLedger, AuditError> {
        info!("Quantifying amount lost due to forwards over invalid channels...");

        let params = ForwardingHistoryParams::whole_history(now);
        let events = source
            .get_forwarding_history(&params)
            .await
            .map_err(AuditError::ForwardingHistory)?;

        if log::log_enabled!(log::Level::Debug) {
            debug!("Replaying {} forwarding event(s)", events.len());
        }

        let invalid = invalid.clone();
        let chunk_size = self.chunk_size;
        let ledger = tokio::task::spawn_blocking(move || {
            LossLedger::from_events_parallel(&events, &invalid, chunk_size)
        })
        .await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "{} invalid channel(s) were used by at least one forward",
                ledger.len()
            );
        }
        Ok(ledger)
    }
}
