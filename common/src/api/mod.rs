pub mod node;

use serde::{de, Deserialize, Deserializer, Serializer};
use std::{fmt::Display, str::FromStr};

// The node REST gateway encodes 64 bits integers as JSON strings
// to stay compatible with JavaScript clients, but some fields
// are sent as plain numbers. Accept both and always emit strings.
pub mod string_or_number {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber<T> {
        String(String),
        Number(T),
    }

    pub fn serialize<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr + Deserialize<'de>,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        match StringOrNumber::<T>::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.parse().map_err(de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}
