use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

// Block height is stored on 3 bytes
pub const MAX_BLOCK_HEIGHT: u32 = (1 << 24) - 1;
// Transaction index inside the block is stored on 3 bytes
pub const MAX_TX_INDEX: u32 = (1 << 24) - 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelIdError {
    #[error("block height {0} does not fit in 24 bits")]
    BlockHeightOverflow(u32),
    #[error("transaction index {0} does not fit in 24 bits")]
    TxIndexOverflow(u32),
    #[error("invalid channel id '{0}', expected '<height>:<tx_index>:<output>' or a raw integer")]
    InvalidFormat(String),
}

/// Location of a channel funding output on chain.
///
/// The node exposes it as a single `u64` packing the block height (24 bits),
/// the transaction index in that block (24 bits) and the output index (16 bits).
/// Both forms convert into each other without loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId {
    block_height: u32,
    tx_index: u32,
    output_index: u16,
}

impl ChannelId {
    pub fn new(block_height: u32, tx_index: u32, output_index: u16) -> Result<Self, ChannelIdError> {
        if block_height > MAX_BLOCK_HEIGHT {
            return Err(ChannelIdError::BlockHeightOverflow(block_height));
        }
        if tx_index > MAX_TX_INDEX {
            return Err(ChannelIdError::TxIndexOverflow(tx_index));
        }

        Ok(Self {
            block_height,
            tx_index,
            output_index,
        })
    }

    pub const fn from_u64(value: u64) -> Self {
        Self {
            block_height: (value >> 40) as u32,
            tx_index: ((value >> 16) & 0xFF_FFFF) as u32,
            output_index: value as u16,
        }
    }

    pub const fn to_u64(&self) -> u64 {
        ((self.block_height as u64) << 40)
            | ((self.tx_index as u64) << 16)
            | (self.output_index as u64)
    }

    pub fn block_height(&self) -> u32 {
        self.block_height
    }

    pub fn tx_index(&self) -> u32 {
        self.tx_index
    }

    pub fn output_index(&self) -> u16 {
        self.output_index
    }
}

impl From<u64> for ChannelId {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<ChannelId> for u64 {
    fn from(id: ChannelId) -> Self {
        id.to_u64()
    }
}

impl Display for ChannelId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.block_height, self.tx_index, self.output_index
        )
    }
}

impl FromStr for ChannelId {
    type Err = ChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChannelIdError::InvalidFormat(s.to_string());

        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [raw] => raw.parse::<u64>().map(Self::from_u64).map_err(|_| invalid()),
            [height, tx_index, output] => {
                let height = height.parse::<u32>().map_err(|_| invalid())?;
                let tx_index = tx_index.parse::<u32>().map_err(|_| invalid())?;
                let output = output.parse::<u16>().map_err(|_| invalid())?;
                Self::new(height, tx_index, output)
            }
            _ => Err(invalid()),
        }
    }
}

// Serialized using the readable form so reports stay greppable against node logs
impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
