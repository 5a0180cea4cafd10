//! Point in time audit of a node for channels whose capacity claim is not
//! backed by the chain.
//!
//! The audit runs three stages, each one only consuming the previous output:
//!
//! 1. [`SubjectiveChannelView`]: channels the node believes are open
//! 2. [`InvalidityDetector`]: channels the channel graph cannot confirm
//! 3. [`LossQuantifier`]: value moved through those channels by forwards
//!
//! The third stage only runs when the second one found something.

pub mod detector;
pub mod loss;
pub mod subjective;

use chanaudit_common::{
    amount::SignedAmount,
    channel::ChannelId,
    config::CVE_ID,
    rpc::NodeError,
    time::{get_current_time_in_seconds, TimestampSeconds},
};
use log::info;
use serde::{Serialize, Serializer};
use thiserror::Error;

pub use detector::{
    classify, CapacityMismatch, Classification, InvalidChannelSet, InvalidityDetector,
    UnresolvedChannel,
};
pub use loss::{LossLedger, LossQuantifier, DEFAULT_FOLD_CHUNK_SIZE};
pub use subjective::SubjectiveChannelView;

use crate::source::NodeSource;

// Default number of channel graph lookups in flight
pub const DEFAULT_LOOKUP_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("unable to obtain channels: {0}")]
    ListChannels(#[source] NodeError),
    #[error("unable to obtain forwarding history: {0}")]
    ForwardingHistory(#[source] NodeError),
    #[error("loss computation did not complete: {0}")]
    Quantify(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy)]
pub struct AuditConfig {
    pub lookup_concurrency: usize,
    pub fold_chunk_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
            fold_chunk_size: DEFAULT_FOLD_CHUNK_SIZE,
        }
    }
}

/// Findings of an audit where at least one channel failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub channels_audited: usize,
    pub invalid_channels: Vec<ChannelId>,
    pub mismatches: Vec<CapacityMismatch>,
    pub unresolved: Vec<UnresolvedChannel>,
    #[serde(serialize_with = "serialize_ledger")]
    pub ledger: LossLedger,
    pub total_loss: SignedAmount,
}

fn serialize_ledger<S: Serializer>(ledger: &LossLedger, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_map(ledger.sorted_entries())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuditOutcome {
    NotAffected { channels_audited: usize },
    Affected(AuditReport),
}

impl AuditOutcome {
    pub fn is_affected(&self) -> bool {
        matches!(self, Self::Affected(_))
    }

    pub fn report(&self) -> Option<&AuditReport> {
        match self {
            Self::Affected(report) => Some(report),
            Self::NotAffected { .. } => None,
        }
    }
}

/// Runs the audit stages against a node.
pub struct Auditor<S: ?Sized> {
    config: AuditConfig,
    source: Box<S>,
}

impl<S: NodeSource + ?Sized> Auditor<S> {
    pub fn new(source: Box<S>, config: AuditConfig) -> Self {
        Self { config, source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn run(&self) -> Result<AuditOutcome, AuditError> {
        self.run_at(get_current_time_in_seconds()).await
    }

    // Audit with the forwarding history cut at `now`
    pub async fn run_at(&self, now: TimestampSeconds) -> Result<AuditOutcome, AuditError> {
        let view = SubjectiveChannelView::build(self.source.as_ref()).await?;

        let detector = InvalidityDetector::new(self.config.lookup_concurrency);
        let invalid = detector.detect(self.source.as_ref(), &view).await;

        if invalid.is_empty() {
            info!("Your node was not affected by {}!", CVE_ID);
            return Ok(AuditOutcome::NotAffected {
                channels_audited: view.len(),
            });
        }

        let quantifier = LossQuantifier::new(self.config.fold_chunk_size);
        let ledger = quantifier
            .quantify(self.source.as_ref(), &invalid, now)
            .await?;
        let total_loss = ledger.total();

        Ok(AuditOutcome::Affected(AuditReport {
            channels_audited: view.len(),
            invalid_channels: invalid.sorted(),
            mismatches: invalid.mismatches().to_vec(),
            unresolved: invalid.unresolved().to_vec(),
            ledger,
            total_loss,
        }))
    }
}
