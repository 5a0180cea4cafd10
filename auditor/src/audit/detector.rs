use std::collections::HashSet;

use chanaudit_common::{amount::Amount, channel::ChannelId, rpc::NodeError};
use futures::{stream, StreamExt};
use log::{debug, info, warn};
use serde::Serialize;

use super::subjective::SubjectiveChannelView;
use crate::source::NodeSource;

/// Capacity disagreement between the node's own record and its channel graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityMismatch {
    pub channel: ChannelId,
    pub authoritative: Amount,
    pub subjective: Amount,
}

/// Channel the channel graph could not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedChannel {
    pub channel: ChannelId,
    pub subjective: Amount,
    // Why the lookup came back empty, kept for the operator
    pub cause: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Valid,
    Unresolved(UnresolvedChannel),
    Mismatch(CapacityMismatch),
}

impl Classification {
    pub fn is_invalid(&self) -> bool {
        !matches!(self, Self::Valid)
    }
}

// Decide the fate of a single channel from its graph lookup.
// A failed or empty lookup counts as invalid: a genuine channel always resolves.
pub fn classify(
    channel: ChannelId,
    subjective: Amount,
    lookup: Result<Option<Amount>, NodeError>,
) -> Classification {
    match lookup {
        Ok(Some(authoritative)) if authoritative == subjective => Classification::Valid,
        Ok(Some(authoritative)) => Classification::Mismatch(CapacityMismatch {
            channel,
            authoritative,
            subjective,
        }),
        Ok(None) => Classification::Unresolved(UnresolvedChannel {
            channel,
            subjective,
            cause: NodeError::NotFound(format!("channel {}", channel)).to_string(),
        }),
        Err(e) => Classification::Unresolved(UnresolvedChannel {
            channel,
            subjective,
            cause: e.to_string(),
        }),
    }
}

/// Channels whose capacity claim could not be confirmed.
///
/// Membership is decided only by [`classify`]; the mismatch and
/// unresolved records say why each channel ended up here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidChannelSet {
    channels: HashSet<ChannelId>,
    mismatches: Vec<CapacityMismatch>,
    unresolved: Vec<UnresolvedChannel>,
}

impl InvalidChannelSet {
    // Record a classification, valid channels are ignored
    pub fn insert(&mut self, classification: Classification) {
        match classification {
            Classification::Valid => {}
            Classification::Mismatch(mismatch) => {
                self.channels.insert(mismatch.channel);
                self.mismatches.push(mismatch);
            }
            Classification::Unresolved(unresolved) => {
                self.channels.insert(unresolved.channel);
                self.unresolved.push(unresolved);
            }
        }
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.channels.contains(channel)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter()
    }

    // Invalid channels ordered by their on chain position
    pub fn sorted(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.channels.iter().copied().collect();
        channels.sort();
        channels
    }

    pub fn mismatches(&self) -> &[CapacityMismatch] {
        &self.mismatches
    }

    pub fn unresolved(&self) -> &[UnresolvedChannel] {
        &self.unresolved
    }

    // Lookups complete in any order, sort records so reports are stable
    fn sort_records(&mut self) {
        self.mismatches.sort_by_key(|m| m.channel);
        self.unresolved.sort_by_key(|u| u.channel);
    }
}

impl Extend<Classification> for InvalidChannelSet {
    fn extend<I: IntoIterator<Item = Classification>>(&mut self, iter: I) {
        for classification in iter {
            self.insert(classification);
        }
    }
}

impl FromIterator<Classification> for InvalidChannelSet {
    fn from_iter<I: IntoIterator<Item = Classification>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set.sort_records();
        set
    }
}

/// Checks every channel of the subjective view against the channel graph.
pub struct InvalidityDetector {
    concurrency: usize,
}

impl InvalidityDetector {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    // Lookups are independent: at most `concurrency` run at once and a failing
    // lookup only affects its own channel. Nothing is retried.
    pub async fn detect<S: NodeSource + ?Sized>(
        &self,
        source: &S,
        view: &SubjectiveChannelView,
    ) -> InvalidChannelSet {
        info!("Filtering out valid channels...");

        let mut set: InvalidChannelSet = stream::iter(view.iter())
            .map(|(channel, subjective)| {
                let (channel, subjective) = (*channel, *subjective);
                async move {
                    let lookup = source.get_channel_capacity(&channel).await;
                    classify(channel, subjective, lookup)
                }
            })
            .buffer_unordered(self.concurrency)
            .inspect(report_classification)
            .collect()
            .await;

        set.sort_records();
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "{} of {} channel(s) confirmed by the channel graph",
                view.len() - set.len(),
                view.len()
            );
        }
        info!("Num invalid channels found: {}", set.len());
        set
    }
}

fn report_classification(classification: &Classification) {
    match classification {
        Classification::Valid => {}
        Classification::Unresolved(unresolved) => {
            warn!(
                "unable to obtain graph channel for cid({}): {}",
                unresolved.channel, unresolved.cause
            );
        }
        Classification::Mismatch(mismatch) => {
            warn!("**** FAKE CHANNEL FOUND ****");
            warn!("CID: {}", mismatch.channel);
            warn!("Actual channel value: {}", mismatch.authoritative);
            warn!("Subjective channel value: {}", mismatch.subjective);
            warn!("****************************");
        }
    }
}
