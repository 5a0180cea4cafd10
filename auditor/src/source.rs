use async_trait::async_trait;
use chanaudit_common::{
    amount::Amount, api::node::ForwardingHistoryParams, channel::ChannelId,
    forwarding::ForwardingEvent, rpc::NodeError,
};

/// A channel as the audited node believes it to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenChannel {
    pub id: ChannelId,
    // Capacity the node recorded when accepting the channel
    pub capacity: Amount,
}

impl OpenChannel {
    pub fn new(id: ChannelId, capacity: Amount) -> Self {
        Self { id, capacity }
    }
}

/// Everything the audit needs from the node.
///
/// Implementations only move data: they never retry and never reinterpret
/// failures, the audit decides which errors are fatal.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Channels currently open on the node with their self reported capacity.
    async fn list_open_channels(&self) -> Result<Vec<OpenChannel>, NodeError>;

    /// Capacity of the channel according to the node's channel graph,
    /// which derives it from the funding output on chain.
    /// `Ok(None)` when the graph has no record of the channel.
    async fn get_channel_capacity(&self, id: &ChannelId) -> Result<Option<Amount>, NodeError>;

    /// Forwarding events matching the requested time range, in node order.
    async fn get_forwarding_history(
        &self,
        params: &ForwardingHistoryParams,
    ) -> Result<Vec<ForwardingEvent>, NodeError>;
}
