//! Field helpers that encode [`SnowflakeId`]s as decimal strings.
//!
//! Consumers that parse numbers as IEEE doubles (JavaScript, many JSON
//! libraries) silently lose precision above 2^53, so IDs that cross a wire
//! boundary are best sent as strings.
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use snowmint::SnowflakeId;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Row {
//!     #[serde(with = "snowmint::serde::as_decimal_string")]
//!     id: SnowflakeId,
//! }
//!
//! let row = Row { id: SnowflakeId::from_raw(9_007_199_254_740_993) };
//! let json = serde_json::to_string(&row).unwrap();
//! assert_eq!(json, r#"{"id":"9007199254740993"}"#);
//! ```

use crate::SnowflakeId;
use ::serde::de::{self, Deserializer, SeqAccess, Visitor};
use ::serde::ser::{SerializeSeq, Serializer};
use core::fmt;

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = SnowflakeId;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a snowflake id as a decimal string or unsigned integer")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        v.parse::<u64>()
            .map(SnowflakeId::from_raw)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(SnowflakeId::from_raw(v))
    }
}

pub mod as_decimal_string {
    use super::*;

    /// Serialize a snowflake ID as a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.collect_str(id)
    }

    /// Deserialize a snowflake ID from a decimal string or an integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is neither, or the string is not a valid
    /// `u64`.
    pub fn deserialize<'de, D>(d: D) -> Result<SnowflakeId, D::Error>
    where
        D: Deserializer<'de>,
    {
        d.deserialize_any(DecimalVisitor)
    }
}

pub mod as_decimal_strings {
    use super::*;

    /// Serialize a sequence of snowflake IDs as decimal strings, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S>(ids: &[SnowflakeId], s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = s.serialize_seq(Some(ids.len()))?;
        for id in ids {
            seq.serialize_element(&id.to_string())?;
        }
        seq.end()
    }

    /// Deserialize a sequence of decimal strings or integers.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a sequence or any element is
    /// invalid.
    pub fn deserialize<'de, D>(d: D) -> Result<Vec<SnowflakeId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Element(SnowflakeId);

        impl<'de> ::serde::Deserialize<'de> for Element {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                d.deserialize_any(DecimalVisitor).map(Element)
            }
        }

        struct SeqVisitor;

        impl<'de> Visitor<'de> for SeqVisitor {
            type Value = Vec<SnowflakeId>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of snowflake ids")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut ids = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Element(id)) = seq.next_element()? {
                    ids.push(id);
                }
                Ok(ids)
            }
        }

        d.deserialize_seq(SeqVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct Single {
        #[serde(with = "as_decimal_string")]
        id: SnowflakeId,
    }

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct Many {
        #[serde(with = "as_decimal_strings")]
        ids: Vec<SnowflakeId>,
    }

    #[test]
    fn encodes_above_f64_precision_losslessly() {
        let row = Single {
            id: SnowflakeId::from_raw(u64::MAX >> 1),
        };
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value, json!({ "id": "9223372036854775807" }));
        let back: Single = serde_json::from_value(value).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn accepts_integers_too() {
        let row: Single = serde_json::from_value(json!({ "id": 42 })).unwrap();
        assert_eq!(row.id, SnowflakeId::from_raw(42));
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(serde_json::from_value::<Single>(json!({ "id": "abc" })).is_err());
        assert!(serde_json::from_value::<Single>(json!({ "id": "-1" })).is_err());
    }

    #[test]
    fn sequences_keep_order() {
        let many = Many {
            ids: vec![SnowflakeId::from_raw(3), SnowflakeId::from_raw(1)],
        };
        let value = serde_json::to_value(&many).unwrap();
        assert_eq!(value, json!({ "ids": ["3", "1"] }));
        let back: Many = serde_json::from_value(value).unwrap();
        assert_eq!(back, many);
    }

    #[test]
    fn transparent_derive_uses_integer() {
        let value = serde_json::to_value(SnowflakeId::from_raw(7)).unwrap();
        assert_eq!(value, json!(7));
    }
}
