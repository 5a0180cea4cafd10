use std::{fmt, path::Path, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chanaudit_common::{
    amount::Amount,
    api::node::{
        ChannelEdgeResult, ForwardingHistoryParams, ForwardingHistoryResult, ListChannelsResult,
    },
    channel::ChannelId,
    forwarding::ForwardingEvent,
    rpc::{
        NodeError, CHANNEL_EDGE_PATH, FORWARDING_HISTORY_PATH, LIST_CHANNELS_PATH, MACAROON_HEADER,
    },
};
use log::{debug, trace};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Certificate, Client, RequestBuilder,
};
use serde::de::DeserializeOwned;
use url::Url;

use crate::source::{NodeSource, OpenChannel};

/// Configuration for node client timeouts and credentials
#[derive(Debug, Clone)]
pub struct NodeClientConfig {
    pub request_timeout: Duration,
    pub connection_timeout: Duration,
    // PEM certificate of the node, trusted as a root
    pub tls_cert_path: Option<String>,
    // Read only macaroon, sent hex encoded on every request
    pub macaroon_path: Option<String>,
}

impl Default for NodeClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            tls_cert_path: None,
            macaroon_path: None,
        }
    }
}

/// REST client for the audited node
pub struct NodeClient {
    client: Client,
    base_url: Url,
    config: NodeClientConfig,
}

// Build the base url of the node, https is assumed when no scheme is given
pub fn parse_node_address(address: &str) -> Result<Url, NodeError> {
    let with_scheme = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| NodeError::InvalidAddress(address.to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn read_macaroon(path: &Path) -> Result<HeaderValue, NodeError> {
    let bytes = std::fs::read(path)
        .map_err(|e| NodeError::Credentials(path.display().to_string(), e.to_string()))?;
    let mut value = HeaderValue::from_str(&hex::encode(bytes))
        .map_err(|e| NodeError::Credentials(path.display().to_string(), e.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

fn read_certificate(path: &Path) -> Result<Certificate, NodeError> {
    let pem = std::fs::read(path)
        .map_err(|e| NodeError::Credentials(path.display().to_string(), e.to_string()))?;
    Certificate::from_pem(&pem)
        .map_err(|e| NodeError::Credentials(path.display().to_string(), e.to_string()))
}

impl NodeClient {
    /// Create a new node client with default configuration
    pub fn new(node_address: &str) -> Result<Self> {
        Self::with_config(node_address, NodeClientConfig::default())
    }

    /// Create a new node client with custom configuration
    pub fn with_config(node_address: &str, config: NodeClientConfig) -> Result<Self> {
        let base_url = parse_node_address(node_address)?;

        let mut headers = HeaderMap::new();
        if let Some(path) = config.macaroon_path.as_ref() {
            headers.insert(MACAROON_HEADER, read_macaroon(Path::new(path))?);
        }

        let mut builder = Client::builder()
            .use_rustls_tls()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout);

        if let Some(path) = config.tls_cert_path.as_ref() {
            builder = builder.add_root_certificate(read_certificate(Path::new(path))?);
        }

        let client = builder.build().context("Failed to build the node HTTP client")?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, NodeError> {
        self.base_url
            .join(path)
            .map_err(|e| NodeError::InvalidAddress(path.to_string(), e.to_string()))
    }

    // Send a single request, there is no retry: the audit decides what a failure means
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        subject: &str,
    ) -> Result<T, NodeError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NodeError::Timeout(self.config.request_timeout.as_secs())
            } else if e.is_connect() {
                NodeError::Connection(e.to_string())
            } else {
                NodeError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NodeError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(NodeError::from_response(status.as_u16(), &body, subject));
        }

        Ok(serde_json::from_str(&body)?)
    }

    pub async fn list_channels(&self) -> Result<ListChannelsResult, NodeError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("list_channels");
        }
        let url = self.endpoint(LIST_CHANNELS_PATH)?;
        self.send(self.client.get(url), "channels").await
    }

    pub async fn get_channel_edge(&self, id: &ChannelId) -> Result<ChannelEdgeResult, NodeError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("get_channel_edge: {}", id);
        }
        let url = self.endpoint(&format!("{}/{}", CHANNEL_EDGE_PATH, id.to_u64()))?;
        self.send(self.client.get(url), &format!("channel {}", id))
            .await
    }

    pub async fn forwarding_history(
        &self,
        params: &ForwardingHistoryParams,
    ) -> Result<ForwardingHistoryResult, NodeError> {
        if log::log_enabled!(log::Level::Trace) {
            trace!(
                "forwarding_history: {} -> {}",
                params.start_time,
                params.end_time
            );
        }
        let url = self.endpoint(FORWARDING_HISTORY_PATH)?;
        self.send(self.client.post(url).json(params), "forwarding history")
            .await
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get the client configuration
    pub fn config(&self) -> &NodeClientConfig {
        &self.config
    }
}

#[async_trait]
impl NodeSource for NodeClient {
    async fn list_open_channels(&self) -> Result<Vec<OpenChannel>, NodeError> {
        let result = self.list_channels().await?;
        Ok(result
            .channels
            .iter()
            .map(|channel| OpenChannel::new(channel.channel_id(), channel.capacity))
            .collect())
    }

    async fn get_channel_capacity(&self, id: &ChannelId) -> Result<Option<Amount>, NodeError> {
        match self.get_channel_edge(id).await {
            Ok(edge) => Ok(Some(edge.capacity)),
            Err(e) if e.is_not_found() => {
                if log::log_enabled!(log::Level::Debug) {
                    debug!("Channel {} is unknown to the channel graph", id);
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_forwarding_history(
        &self,
        params: &ForwardingHistoryParams,
    ) -> Result<Vec<ForwardingEvent>, NodeError> {
        let result = self.forwarding_history(params).await?;
        if log::log_enabled!(log::Level::Debug) {
            debug!(
                "Received {} forwarding event(s), last offset {}",
                result.forwarding_events.len(),
                result.last_offset_index
            );
        }
        Ok(result
            .forwarding_events
            .into_iter()
            .map(ForwardingEvent::from)
            .collect())
    }
}

impl fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
