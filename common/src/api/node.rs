use serde::{Deserialize, Serialize};

use super::string_or_number;
use crate::{
    amount::Amount,
    channel::ChannelId,
    config::{FORWARDING_HISTORY_MAX_EVENTS, FORWARDING_HISTORY_START_TIME},
    forwarding::ForwardingEvent,
    time::TimestampSeconds,
};

// GET /v1/channels
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ListChannelsResult {
    #[serde(default)]
    pub channels: Vec<RPCChannel>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RPCChannel {
    #[serde(with = "string_or_number")]
    pub chan_id: u64,
    #[serde(with = "string_or_number")]
    pub capacity: Amount,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub remote_pubkey: String,
    #[serde(default)]
    pub channel_point: String,
}

impl RPCChannel {
    pub fn channel_id(&self) -> ChannelId {
        ChannelId::from_u64(self.chan_id)
    }
}

// GET /v1/graph/edge/{chan_id}
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChannelEdgeResult {
    #[serde(with = "string_or_number")]
    pub channel_id: u64,
    #[serde(with = "string_or_number")]
    pub capacity: Amount,
    #[serde(default)]
    pub chan_point: String,
}

// POST /v1/switch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ForwardingHistoryParams {
    #[serde(with = "string_or_number")]
    pub start_time: TimestampSeconds,
    #[serde(with = "string_or_number")]
    pub end_time: TimestampSeconds,
    #[serde(default)]
    pub index_offset: u32,
    pub num_max_events: u32,
}

impl ForwardingHistoryParams {
    // Request covering every forward the node ever completed up to `now`
    pub fn whole_history(now: TimestampSeconds) -> Self {
        Self {
            start_time: FORWARDING_HISTORY_START_TIME,
            end_time: now,
            index_offset: 0,
            num_max_events: FORWARDING_HISTORY_MAX_EVENTS,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct ForwardingHistoryResult {
    #[serde(default)]
    pub forwarding_events: Vec<RPCForwardingEvent>,
    #[serde(default)]
    pub last_offset_index: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RPCForwardingEvent {
    #[serde(with = "string_or_number", default)]
    pub timestamp: TimestampSeconds,
    #[serde(with = "string_or_number")]
    pub chan_id_in: u64,
    #[serde(with = "string_or_number")]
    pub chan_id_out: u64,
    #[serde(with = "string_or_number")]
    pub amt_in: Amount,
    #[serde(with = "string_or_number")]
    pub amt_out: Amount,
    #[serde(with = "string_or_number")]
    pub fee: Amount,
}

impl From<RPCForwardingEvent> for ForwardingEvent {
    fn from(event: RPCForwardingEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            chan_in: ChannelId::from_u64(event.chan_id_in),
            chan_out: ChannelId::from_u64(event.chan_id_out),
            amount_in: event.amt_in,
            amount_out: event.amt_out,
            fee: event.fee,
        }
    }
}

// Error body returned by the REST gateway on non 2xx responses
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RPCErrorBody {
    #[serde(default)]
    pub code: i32,
    #[serde(default, alias = "error")]
    pub message: String,
}
