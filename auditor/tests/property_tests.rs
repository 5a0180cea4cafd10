//! Property tests for the audit stages.
//!
//! Properties tested:
//! - Channel invalidity is decided per channel, independently of the others
//! - The loss fold does not depend on the order of the forwarding history
//! - Chunked folding and merging gives the same ledger as a single fold

#![allow(clippy::disallowed_methods)]

mod common;

use std::collections::HashMap;

use chanaudit::audit::{classify, AuditConfig, Auditor, InvalidChannelSet, LossLedger};
use chanaudit_common::{amount::SignedAmount, channel::ChannelId, forwarding::ForwardingEvent};
use common::{id, MockNode};
use proptest::prelude::*;

// (subjective capacity, authoritative capacity if the graph knows the channel)
fn channel_records() -> impl Strategy<Value = HashMap<u64, (u64, Option<u64>)>> {
    prop::collection::hash_map(
        0u64..64,
        (1u64..1_000, prop::option::of(1u64..1_000)),
        0..32,
    )
}

fn forwarding_events() -> impl Strategy<Value = Vec<ForwardingEvent>> {
    prop::collection::vec(
        (0u64..12, 0u64..12, 0u64..1_000_000, 0u64..1_000).prop_map(
            |(chan_in, chan_out, amount_out, fee)| {
                ForwardingEvent::new(id(chan_in), id(chan_out), amount_out + fee, amount_out)
            },
        ),
        0..200,
    )
}

fn invalid_set(raws: &[u64]) -> InvalidChannelSet {
    raws.iter().map(|raw| classify(id(*raw), 1, Ok(None))).collect()
}

proptest! {
    #[test]
    fn test_classification_is_per_channel(records in channel_records()) {
        let set: InvalidChannelSet = records
            .iter()
            .map(|(raw, (subjective, authoritative))| {
                classify(id(*raw), *subjective, Ok(*authoritative))
            })
            .collect();

        for (raw, (subjective, authoritative)) in &records {
            let expected = authoritative.map_or(true, |capacity| capacity != *subjective);
            prop_assert_eq!(set.contains(&id(*raw)), expected);
        }
        prop_assert_eq!(set.len(), set.mismatches().len() + set.unresolved().len());
    }

    #[test]
    fn test_pipeline_classification_is_per_channel(records in channel_records()) {
        let mut node = MockNode::new();
        for (raw, (subjective, authoritative)) in &records {
            node = node.with_open_channel(id(*raw), *subjective);
            if let Some(capacity) = authoritative {
                node = node.with_graph_edge(id(*raw), *capacity);
            }
        }

        let runtime = tokio::runtime::Runtime::new().unwrap();
        let auditor = Auditor::new(Box::new(node), AuditConfig::default());
        let outcome = runtime.block_on(auditor.run_at(1_700_000_000)).unwrap();

        let mut expected: Vec<ChannelId> = records
            .iter()
            .filter(|(_, (subjective, authoritative))| {
                authoritative.map_or(true, |capacity| capacity != *subjective)
            })
            .map(|(raw, _)| id(*raw))
            .collect();
        expected.sort();

        match outcome.report() {
            Some(report) => prop_assert_eq!(&report.invalid_channels, &expected),
            None => {
                prop_assert!(expected.is_empty());
                prop_assert!(auditor.source().history_requests().is_empty());
            }
        }
    }

    #[test]
    fn test_fold_is_order_independent(
        (events, shuffled) in forwarding_events()
            .prop_flat_map(|events| (Just(events.clone()), Just(events).prop_shuffle())),
    ) {
        let set = invalid_set(&[0, 3, 7]);
        let expected = LossLedger::from_events(&events, &set);
        prop_assert_eq!(LossLedger::from_events(&shuffled, &set), expected);
    }

    #[test]
    fn test_chunked_fold_matches_single_fold(
        events in forwarding_events(),
        chunk_size in 1usize..64,
    ) {
        let set = invalid_set(&[1, 2, 5, 11]);
        let sequential = LossLedger::from_events(&events, &set);
        let parallel = LossLedger::from_events_parallel(&events, &set, chunk_size);
        prop_assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_ledger_only_holds_touched_invalid_channels(events in forwarding_events()) {
        let set = invalid_set(&[2, 4]);
        let ledger = LossLedger::from_events(&events, &set);

        for (channel, _) in ledger.iter() {
            prop_assert!(set.contains(channel));
            prop_assert!(events
                .iter()
                .any(|event| event.chan_in == *channel || event.chan_out == *channel));
        }

        let total: SignedAmount = ledger.iter().map(|(_, amount)| *amount).sum();
        prop_assert_eq!(ledger.total(), total);
    }
}
