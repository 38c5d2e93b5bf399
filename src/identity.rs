//! Caller identity handed to the pipeline by the request surface.
//!
//! The fields the pipeline reads are typed; everything else rides along in
//! `extra` and is forwarded verbatim to the platform as part of the embedded
//! user context.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Separator between location ids in the encoded form, e.g. `"1|||2|||3"`.
pub const LOCATION_SEPARATOR: &str = "|||";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn is_elevated(self) -> bool { self == Role::Admin }
}

/// Decoded list of practice location ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationIds(Vec<u64>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDecodeError {
    pub segment: String,
}

impl fmt::Display for LocationDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "location id '{}' is not a non-negative integer", self.segment)
    }
}

impl std::error::Error for LocationDecodeError {}

impl LocationIds {
    pub fn new(ids: Vec<u64>) -> Self { Self(ids) }

    pub fn as_slice(&self) -> &[u64] { &self.0 }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn encode(&self) -> String {
        self.0.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(LOCATION_SEPARATOR)
    }
}

impl FromStr for LocationIds {
    type Err = LocationDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() { return Ok(Self::default()); }
        let mut ids = Vec::new();
        for seg in s.split(LOCATION_SEPARATOR) {
            let id = seg.parse::<u64>().map_err(|_| LocationDecodeError { segment: seg.to_string() })?;
            ids.push(id);
        }
        Ok(Self(ids))
    }
}

impl Serialize for LocationIds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for LocationIds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub organisation_id: u64,
    pub user_type: Role,
    #[serde(default)]
    pub locations: LocationIds,
    /// Opaque attributes forwarded to the platform untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CallerIdentity {
    pub fn new(username: impl Into<String>, organisation_id: u64, user_type: Role) -> Self {
        Self {
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            organisation_id,
            user_type,
            locations: LocationIds::default(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_locations(mut self, locations: LocationIds) -> Self {
        self.locations = locations;
        self
    }
}
