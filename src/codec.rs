//! Wire encodings shared by objects, operations and queries.
//!
//! The backend wraps a few value kinds in tagged envelopes (`__type`); this
//! module owns those shapes plus the response envelopes every command decodes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Keys that live on every record but must never be sent in a create/update
/// body; the server owns them.
pub(crate) const RESERVED_KEYS: [&str; 4] = ["objectId", "createdAt", "updatedAt", "originalData"];

/// Serialize a timestamp the way the server emits them: RFC 3339, millisecond
/// precision, `Z` suffix.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `serde(with)` helper for optional record timestamps (`createdAt` /
/// `updatedAt`), which travel as plain ISO strings.
pub mod iso8601_opt {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        match date {
            Some(d) => serializer.serialize_str(&format_date(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) => DateTime::parse_from_rfc3339(&s)
                .map(|d| Some(d.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

/// A user-declared date field, carried in the `{"__type":"Date"}` envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type", rename = "Date")]
pub struct WireDate {
    #[serde(
        serialize_with = "serialize_iso",
        deserialize_with = "deserialize_iso",
        rename = "iso"
    )]
    pub iso: DateTime<Utc>,
}

fn serialize_iso<S: serde::Serializer>(
    date: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(date))
}

fn deserialize_iso<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

impl WireDate {
    pub fn new(iso: DateTime<Utc>) -> Self {
        Self { iso }
    }
}

/// Serialize any value to its wire JSON form.
pub(crate) fn to_wire<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::decode)
}

/// Decode a wire JSON value back into a typed value.
pub(crate) fn from_wire<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(Error::decode)
}

/// Serialize a record into the JSON map sent as a create/update body,
/// stripping the server-owned keys.
pub(crate) fn to_body<T: Serialize>(record: &T) -> Result<Map<String, Value>> {
    let mut map = match to_wire(record)? {
        Value::Object(map) => map,
        other => {
            return Err(Error::Decode(format!(
                "record must encode to a JSON object, got {}",
                other
            )))
        }
    };
    for key in RESERVED_KEYS {
        map.remove(key);
    }
    Ok(map)
}

/// Standard query response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    pub count: Option<usize>,
}

/// Echo from a successful create.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateResponse {
    #[serde(rename = "objectId")]
    pub object_id: String,
    #[serde(rename = "createdAt", with = "iso8601_opt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

pub(crate) fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(Error::decode)
}
