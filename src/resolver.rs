//! Client identifier disambiguation against a roster snapshot.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::models::ClientRecord;

/// A client referred to either by numeric id or by name.
///
/// Text that reads as a base-10 integer is always an id, so a client whose
/// name is numeric cannot be addressed by name. Surrounding whitespace and
/// single `_` separators between digits are accepted (`" 42"`, `"1_000"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRef {
    Id(i64),
    /// An integer outside the id range. It never matches a client.
    LargeId(String),
    Name(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Client '{0}' not found")]
    NotFound(ClientRef),
}

impl ClientRef {
    pub fn parse(raw: &str) -> Self {
        match integer_text(raw) {
            Some(digits) => match digits.parse::<i64>() {
                Ok(id) => ClientRef::Id(id),
                Err(_) => ClientRef::LargeId(digits),
            },
            None => ClientRef::Name(raw.to_string()),
        }
    }
}

/// Normalize integer text to `[-]digits`, or `None` if `raw` is not an integer.
fn integer_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let (sign, body) = match trimmed.as_bytes().first()? {
        b'-' => ("-", &trimmed[1..]),
        b'+' => ("", &trimmed[1..]),
        _ => ("", trimmed),
    };

    let mut digits = String::from(sign);
    let mut prev_digit = false;
    for c in body.chars() {
        match c {
            '0'..='9' => {
                digits.push(c);
                prev_digit = true;
            }
            '_' if prev_digit => prev_digit = false,
            _ => return None,
        }
    }
    // Rejects "", "-" and a trailing separator.
    prev_digit.then_some(digits)
}

impl fmt::Display for ClientRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientRef::Id(id) => write!(f, "{id}"),
            ClientRef::LargeId(digits) => f.write_str(digits),
            ClientRef::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for ClientRef {
    fn from(raw: &str) -> Self {
        ClientRef::parse(raw)
    }
}

impl From<i64> for ClientRef {
    fn from(id: i64) -> Self {
        ClientRef::Id(id)
    }
}

/// Wire shape of an identifier in request bodies: a JSON integer or string.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawClientRef {
    Int(i64),
    Unsigned(u64),
    Text(String),
}

impl<'de> Deserialize<'de> for ClientRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match RawClientRef::deserialize(deserializer) {
            Ok(RawClientRef::Int(id)) => Ok(ClientRef::Id(id)),
            Ok(RawClientRef::Unsigned(big)) => Ok(ClientRef::LargeId(big.to_string())),
            Ok(RawClientRef::Text(text)) => Ok(ClientRef::parse(&text)),
            Err(_) => Err(serde::de::Error::custom(
                "client identifier must be an integer or a string",
            )),
        }
    }
}

impl Serialize for ClientRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ClientRef::Id(id) => serializer.serialize_i64(*id),
            ClientRef::LargeId(digits) => serializer.serialize_str(digits),
            ClientRef::Name(name) => serializer.serialize_str(name),
        }
    }
}

/// Find the client an identifier refers to. First match in roster order wins.
pub fn resolve<'a>(
    identifier: &ClientRef,
    roster: &'a [ClientRecord],
) -> Result<&'a ClientRecord, ResolveError> {
    let found = match identifier {
        ClientRef::Id(id) => roster.iter().find(|c| c.id == *id),
        ClientRef::LargeId(_) => None,
        ClientRef::Name(name) => roster.iter().find(|c| c.name == *name),
    };
    found.ok_or_else(|| ResolveError::NotFound(identifier.clone()))
}
