#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chanaudit::source::{NodeSource, OpenChannel};
use chanaudit_common::{
    amount::Amount, api::node::ForwardingHistoryParams, channel::ChannelId,
    forwarding::ForwardingEvent, rpc::NodeError,
};

pub fn id(raw: u64) -> ChannelId {
    ChannelId::from_u64(raw)
}

/// In-memory node used to drive the audit without any network.
#[derive(Default)]
pub struct MockNode {
    open_channels: Vec<OpenChannel>,
    graph: HashMap<ChannelId, Amount>,
    failing_lookups: HashMap<ChannelId, String>,
    events: Vec<ForwardingEvent>,
    fail_listing: bool,
    fail_history: bool,
    lookup_delay: Option<Duration>,

    history_requests: Mutex<Vec<ForwardingHistoryParams>>,
    lookups: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    // Channel the node believes is open with the given capacity
    pub fn with_open_channel(mut self, channel: ChannelId, capacity: Amount) -> Self {
        self.open_channels.push(OpenChannel::new(channel, capacity));
        self
    }

    // Capacity recorded by the channel graph
    pub fn with_graph_edge(mut self, channel: ChannelId, capacity: Amount) -> Self {
        self.graph.insert(channel, capacity);
        self
    }

    // Lookup of this channel fails with a network error carrying `cause`
    pub fn with_failing_lookup(mut self, channel: ChannelId, cause: &str) -> Self {
        self.failing_lookups.insert(channel, cause.to_string());
        self
    }

    pub fn with_event(mut self, event: ForwardingEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_events<I: IntoIterator<Item = ForwardingEvent>>(mut self, events: I) -> Self {
        self.events.extend(events);
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.fail_history = true;
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn history_requests(&self) -> Vec<ForwardingHistoryParams> {
        self.history_requests.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeSource for MockNode {
    async fn list_open_channels(&self) -> Result<Vec<OpenChannel>, NodeError> {
        if self.fail_listing {
            return Err(NodeError::Connection("connection refused".to_string()));
        }
        Ok(self.open_channels.clone())
    }

    async fn get_channel_capacity(&self, id: &ChannelId) -> Result<Option<Amount>, NodeError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.failing_lookups.get(id) {
            Some(cause) => Err(NodeError::Network(cause.clone())),
            None => Ok(self.graph.get(id).copied()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get_forwarding_history(
        &self,
        params: &ForwardingHistoryParams,
    ) -> Result<Vec<ForwardingEvent>, NodeError> {
        self.history_requests.lock().unwrap().push(params.clone());
        if self.fail_history {
            return Err(NodeError::Http(500, "internal error".to_string()));
        }
        Ok(self.events.clone())
    }
}
