use std::collections::{hash_map, HashMap};

use chanaudit_common::{amount::Amount, channel::ChannelId};
use log::{debug, info};

use super::AuditError;
use crate::source::{NodeSource, OpenChannel};

/// Snapshot of the channels the node believes are open, keyed by id,
/// with the capacity the node recorded for each of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectiveChannelView {
    channels: HashMap<ChannelId, Amount>,
}

impl SubjectiveChannelView {
    // Query the node for its open channels
    // Failing to list them aborts the audit, nothing can be checked without them
    pub async fn build<S: NodeSource + ?Sized>(source: &S) -> Result<Self, AuditError> {
        info!("Obtaining candidate set of invalid channels...");
        let channels = source
            .list_open_channels()
            .await
            .map_err(AuditError::ListChannels)?;

        let view = Self::from_channels(channels);
        if log::log_enabled!(log::Level::Debug) {
            debug!("Subjective view contains {} open channel(s)", view.len());
        }
        Ok(view)
    }

    // A duplicated id keeps the last capacity seen
    pub fn from_channels<I: IntoIterator<Item = OpenChannel>>(channels: I) -> Self {
        Self {
            channels: channels
                .into_iter()
                .map(|channel| (channel.id, channel.capacity))
                .collect(),
        }
    }

    pub fn get(&self, id: &ChannelId) -> Option<Amount> {
        self.channels.get(id).copied()
    }

    pub fn contains(&self, id: &ChannelId) -> bool {
        self.channels.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &Amount)> {
        self.channels.iter()
    }
}

impl<'a> IntoIterator for &'a SubjectiveChannelView {
    type Item = (&'a ChannelId, &'a Amount);
    type IntoIter = hash_map::Iter<'a, ChannelId, Amount>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}
