//! Protocol-level building blocks shared by the watcher binaries and tests:
//! the varint codec, status packet framing and parsing, and the roster
//! reconciliation that turns a raw sample into join/leave changes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod error;
pub mod reconcile;
pub mod status;
pub mod varint;

pub use error::ProbeError;
pub use reconcile::{reconcile, Reconciliation};
pub use status::{
    handshake_packet, parse_status_json, parse_status_response, status_request_packet,
    MAX_RESPONSE_SIZE, PROTOCOL_VERSION,
};
pub use varint::{decode_varint, encode_varint, BufferSource, ByteSource, StreamSource};

pub const DEFAULT_PORT: u16 = 25565;

/// What a single successful probe learned about the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusSample {
    pub reachable: bool,
    /// `players.online` as reported; absent when missing or not a count.
    pub reported_count: Option<u32>,
    /// `players.sample[].name`, possibly partial, in server order.
    pub sampled_names: Vec<String>,
}

impl StatusSample {
    pub fn new(reported_count: Option<u32>, sampled_names: Vec<String>) -> Self {
        Self {
            reachable: true,
            reported_count,
            sampled_names,
        }
    }
}

/// Ordered player roster: no duplicates, no empty names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Roster(Vec<String>);

impl Roster {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Builds a roster keeping the first occurrence of each non-empty name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut players = Vec::new();

        for name in names {
            let name = name.into();
            if name.is_empty() || seen.contains(&name) {
                continue;
            }
            seen.insert(name.clone());
            players.push(name);
        }

        Self(players)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|p| p == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// First `count` players in roster order.
    pub fn truncated(&self, count: usize) -> Self {
        Self(self.0.iter().take(count).cloned().collect())
    }

    /// Players in `self` that are absent from `other`, in `self`'s order.
    pub fn missing_from(&self, other: &Roster) -> Vec<String> {
        let other: HashSet<&str> = other.iter().collect();
        self.0
            .iter()
            .filter(|p| !other.contains(p.as_str()))
            .cloned()
            .collect()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let names = Option::<Vec<String>>::deserialize(deserializer)?;
        Ok(Roster::from_names(names.unwrap_or_default()))
    }
}

impl<S: Into<String>> FromIterator<S> for Roster {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Roster::from_names(iter)
    }
}

/// One persisted check-cycle result.
///
/// Field names on disk match the `status.json` format already in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: i64,
    pub online: bool,
    #[serde(rename = "lastChecked")]
    pub timestamp_ms: i64,
    #[serde(default)]
    pub players: Roster,
}
