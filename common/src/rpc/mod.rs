mod error;

pub use error::*;

// Header used by the node REST gateway to carry the macaroon
// Kept lowercase, header names are case insensitive on the wire
pub const MACAROON_HEADER: &str = "grpc-metadata-macaroon";

pub const LIST_CHANNELS_PATH: &str = "v1/channels";
pub const CHANNEL_EDGE_PATH: &str = "v1/graph/edge";
pub const FORWARDING_HISTORY_PATH: &str = "v1/switch";
