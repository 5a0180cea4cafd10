//! Channel capacity auditor
//!
//! This library checks the channels a node believes are open against its
//! channel graph and quantifies what forwards over unconfirmed channels cost.

pub mod audit;
pub mod config;
pub mod node_client;
pub mod source;

pub use audit::{AuditConfig, AuditError, AuditOutcome, AuditReport, Auditor};
pub use config::{ConfigValidationError, ValidatedConfig};
pub use node_client::{NodeClient, NodeClientConfig};
pub use source::{NodeSource, OpenChannel};
