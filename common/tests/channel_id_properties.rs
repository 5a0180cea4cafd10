#![allow(clippy::disallowed_methods)]

//! Property tests for the channel identifier encoding.
//!
//! The node only hands out the packed `u64`, every report shows the
//! `height:tx_index:output` form, so both must describe the same channel.

use chanaudit_common::channel::{ChannelId, MAX_BLOCK_HEIGHT, MAX_TX_INDEX};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #[test]
    fn test_raw_value_survives_conversion(raw in any::<u64>()) {
        let id = ChannelId::from_u64(raw);
        prop_assert_eq!(id.to_u64(), raw);
        prop_assert_eq!(u64::from(id), raw);
    }

    #[test]
    fn test_triple_survives_conversion(
        height in 0u32..=MAX_BLOCK_HEIGHT,
        tx_index in 0u32..=MAX_TX_INDEX,
        output in any::<u16>(),
    ) {
        let id = ChannelId::new(height, tx_index, output).unwrap();
        let back = ChannelId::from_u64(id.to_u64());
        prop_assert_eq!(back.block_height(), height);
        prop_assert_eq!(back.tx_index(), tx_index);
        prop_assert_eq!(back.output_index(), output);
    }

    #[test]
    fn test_display_parses_back(raw in any::<u64>()) {
        let id = ChannelId::from_u64(raw);
        let parsed: ChannelId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    // Distinct raw values never collide once used as map keys
    #[test]
    fn test_distinct_keys(raws in prop::collection::hash_set(any::<u64>(), 0..64)) {
        let ids: HashSet<ChannelId> = raws.iter().copied().map(ChannelId::from_u64).collect();
        prop_assert_eq!(ids.len(), raws.len());
    }
}
