//! Serde helpers for validator output
//!
//! UmpleSync writes numeric fields (`line`, `severity`, `errorCode`) as JSON
//! strings in some versions and as numbers in others. These deserializers
//! accept either form.

use serde::de::{self, Deserializer, Unexpected, Visitor};
use std::fmt;

struct U32Visitor;

impl<'de> Visitor<'de> for U32Visitor {
    type Value = u32;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a string containing one")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<u32, E> {
        u32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<u32, E> {
        u32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<u32, E> {
        value
            .trim()
            .parse()
            .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
    }
}

/// Deserialize a `u32` written as a number or a numeric string
pub fn deserialize_u32_lenient<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(U32Visitor)
}

struct OptionalCodeVisitor;

impl<'de> Visitor<'de> for OptionalCodeVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an error code as a string or number")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(Some(value.to_string()))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(if value.is_empty() { None } else { Some(value.to_string()) })
    }
}

/// Deserialize an optional code written as a number, a string or `null`
pub fn deserialize_optional_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_option(OptionalCodeVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[serde(deserialize_with = "deserialize_u32_lenient")]
        line: u32,
        #[serde(default, deserialize_with = "deserialize_optional_code")]
        code: Option<String>,
    }

    #[test]
    fn test_accepts_numbers_and_strings() {
        let record: Record = serde_json::from_str(r#"{"line": "12", "code": 1502}"#).unwrap();
        assert_eq!(record.line, 12);
        assert_eq!(record.code.as_deref(), Some("1502"));

        let record: Record = serde_json::from_str(r#"{"line": 3}"#).unwrap();
        assert_eq!(record.line, 3);
        assert_eq!(record.code, None);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Record>(r#"{"line": "x"}"#).is_err());
        assert!(serde_json::from_str::<Record>(r#"{"line": -1}"#).is_err());
    }
}
