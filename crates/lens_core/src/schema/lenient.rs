//! Numeric field decoding that tolerates form input.
//!
//! Numbers arrive either as JSON numbers or as the strings a text input
//! produces (`"42.50"`). Anything that does not read as a finite number
//! decodes as zero, the same reading `derive::sum_field` applies.

use crate::derive::progress::numeric_value;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(numeric_value(Some(&value)))
}

/// Counters: negatives clamp to zero, fractions truncate.
pub(crate) fn count_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    // Float-to-int `as` saturates at the target bounds.
    Ok(number(deserializer)?.max(0.0) as u32)
}

pub(crate) fn count_u8<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number(deserializer)?.max(0.0) as u8)
}

pub(crate) fn count_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number(deserializer)?.max(0.0) as u64)
}
