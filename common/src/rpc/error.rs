use serde_json::Error as SerdeError;
use thiserror::Error;

use crate::api::node::RPCErrorBody;

// The node answers "edge not found" when a channel is unknown to its graph
const NOT_FOUND_MESSAGE: &str = "not found";

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Invalid node address '{}': {}", _0, _1)]
    InvalidAddress(String, String),
    #[error("Unable to load credentials from '{}': {}", _0, _1)]
    Credentials(String, String),
    #[error("Request timeout after {} seconds", _0)]
    Timeout(u64),
    #[error("Connection failed: {}", _0)]
    Connection(String),
    #[error("Network error: {}", _0)]
    Network(String),
    #[error("HTTP error {}: {}", _0, _1)]
    Http(u16, String),
    #[error("Node error {}: {}", _0, _1)]
    Rpc(i32, String),
    #[error("Failed to parse JSON response: {}", _0)]
    Decode(#[from] SerdeError),
    #[error("No record found for {}", _0)]
    NotFound(String),
}

impl NodeError {
    // Build the error matching a non successful response of the node
    // `subject` names what was requested, used when the record is missing
    pub fn from_response(status: u16, body: &str, subject: &str) -> Self {
        let parsed: Option<RPCErrorBody> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .map(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| body.trim().to_string());

        if status == 404 || is_not_found_message(&message) {
            return Self::NotFound(subject.to_string());
        }

        match parsed {
            Some(e) if e.code != 0 => Self::Rpc(e.code, message),
            _ => Self::Http(status, message),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

fn is_not_found_message(message: &str) -> bool {
    message.to_lowercase().contains(NOT_FOUND_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_404_is_not_found() {
        let err = NodeError::from_response(404, "", "channel 1:2:3");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No record found for channel 1:2:3");
    }

    #[test]
    fn test_edge_not_found_body() {
        let body = r#"{"code": 2, "message": "edge not found", "details": []}"#;
        let err = NodeError::from_response(500, body, "channel 1:2:3");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_rpc_error_code() {
        let body = r#"{"code": 2, "message": "permission denied"}"#;
        let err = NodeError::from_response(500, body, "channels");
        assert!(matches!(err, NodeError::Rpc(2, ref m) if m == "permission denied"));
    }

    #[test]
    fn test_plain_http_error() {
        let err = NodeError::from_response(502, "Bad Gateway\n", "channels");
        assert!(matches!(err, NodeError::Http(502, ref m) if m == "Bad Gateway"));
    }
}
