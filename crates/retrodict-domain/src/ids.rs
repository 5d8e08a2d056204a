//! Identifiers: string ids for traces, entities and events, UUIDv7 ids for
//! claims and snapshot versions

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from any string-like value
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Get the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier assigned to a trace by the normalizer
    TraceId
);
string_id!(
    /// Identifier of a reconstructed entity
    EntityId
);
string_id!(
    /// Identifier of a reconstructed event
    EventId
);

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u128);

        impl $name {
            /// Generate a new UUIDv7-based identifier
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7().as_u128())
            }

            /// Create an identifier from a raw u128 value
            ///
            /// This is primarily for storage layer deserialization.
            pub fn from_value(value: u128) -> Self {
                Self(value)
            }

            /// Parse an identifier from a UUID string
            pub fn from_string(s: &str) -> Result<Self, String> {
                uuid::Uuid::parse_str(s)
                    .map(|u| Self(u.as_u128()))
                    .map_err(|e| format!("Invalid UUIDv7 string: {}", e))
            }

            /// Get the raw u128 value
            pub fn value(&self) -> u128 {
                self.0
            }

            /// Get the timestamp component of the UUIDv7 (milliseconds since Unix epoch)
            pub fn timestamp(&self) -> u64 {
                // UUIDv7: top 48 bits are Unix millisecond timestamp
                (self.0 >> 80) as u64
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", uuid::Uuid::from_u128(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Self::from_string(&raw).map_err(de::Error::custom)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a claim version (UUIDv7)
    ///
    /// UUIDv7 gives chronological sortability, so ledger order and id order
    /// agree for claims admitted by one process.
    ClaimId
);
uuid_id!(
    /// Stable identifier of a published snapshot (UUIDv7)
    VersionId
);

/// Reference to a node of the causal graph
///
/// Entities order before events; within a kind, ids order lexically. Every
/// deterministic traversal in the engine relies on this ordering.
///
/// Serialises as `entity:<id>` / `event:<id>` so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeRef {
    /// An entity node
    Entity(EntityId),
    /// An event node
    Event(EventId),
}

impl NodeRef {
    /// Shorthand for an entity reference
    pub fn entity(id: impl Into<String>) -> Self {
        NodeRef::Entity(EntityId::new(id))
    }

    /// Shorthand for an event reference
    pub fn event(id: impl Into<String>) -> Self {
        NodeRef::Event(EventId::new(id))
    }

    /// The event id, if this node is an event
    pub fn as_event(&self) -> Option<&EventId> {
        match self {
            NodeRef::Event(id) => Some(id),
            NodeRef::Entity(_) => None,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Entity(id) => write!(f, "entity:{}", id),
            NodeRef::Event(id) => write!(f, "event:{}", id),
        }
    }
}

impl FromStr for NodeRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("entity", id)) if !id.is_empty() => Ok(NodeRef::entity(id)),
            Some(("event", id)) if !id.is_empty() => Ok(NodeRef::event(id)),
            _ => Err(format!("Invalid node reference: {}", s)),
        }
    }
}

impl Serialize for NodeRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
