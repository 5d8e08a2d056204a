//! Claim module - assertions about the past and the claims that back them
//!
//! A [`ClaimTemplate`] is a candidate proposed upstream. The admission gate
//! turns an accepted template into a [`Claim`]: an immutable, versioned record
//! carrying its supporting traces and confidence. Claims are never deleted;
//! a newer version supersedes an older one.

use crate::{ClaimId, ConfidenceLevel, EntityId, EventId, Layer, NodeRef, TimeEstimate, TraceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Whether a causal assertion affirms or denies the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// The cause contributed to the effect
    #[default]
    Affirms,
    /// The cause did not contribute to the effect
    Denies,
}

/// Kind of causal relation carried onto an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Generic contribution
    #[default]
    Influences,
    /// The cause turned into the effect
    Transforms,
    /// The effect required the cause
    DependsOn,
    /// The effect arose out of the cause
    EmergesFrom,
    /// The cause ended the effect
    Destroys,
}

impl RelationKind {
    /// Get the relation name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Influences => "influences",
            RelationKind::Transforms => "transforms",
            RelationKind::DependsOn => "depends_on",
            RelationKind::EmergesFrom => "emerges_from",
            RelationKind::Destroys => "destroys",
        }
    }
}

/// Scope a claim asserts itself at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// Confined to one layer and one era
    #[default]
    Local,
    /// Spans layers (e.g. a climatic cause of an economic effect)
    CrossLayer,
    /// Spans eras
    CrossEra,
}

impl Significance {
    /// Whether the triangulation rule applies
    pub fn requires_triangulation(&self) -> bool {
        !matches!(self, Significance::Local)
    }
}

/// What a claim asserts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// An entity existed
    EntityExists {
        /// Entity being established
        entity: EntityId,
        /// Stratum the entity belongs to
        layer: Layer,
        /// Free-form category (e.g. "institution", "species")
        kind: String,
    },
    /// An event happened
    EventOccurred {
        /// Event being established
        event: EventId,
        /// Stratum the event belongs to
        layer: Layer,
        /// Free-form category (e.g. "collapse", "drought")
        kind: String,
        /// Entities taking part
        #[serde(default)]
        participants: BTreeSet<EntityId>,
    },
    /// An entity had a property value
    Attribute {
        /// Entity described
        entity: EntityId,
        /// Property name
        property: String,
        /// Asserted value
        value: serde_json::Value,
    },
    /// An event happened within a time estimate
    Timing {
        /// Event being dated
        event: EventId,
        /// When it happened
        estimate: TimeEstimate,
    },
    /// One node causally affected another
    Causal {
        /// Cause node
        cause: NodeRef,
        /// Effect node
        effect: NodeRef,
        /// Causal strength in [0, 1]
        weight: f64,
        /// Kind of relation
        #[serde(default)]
        relation: RelationKind,
        /// Affirmed or denied
        #[serde(default)]
        polarity: Polarity,
    },
}

impl Assertion {
    /// Key under which this assertion competes with others
    pub fn key(&self) -> AssertionKey {
        match self {
            Assertion::EntityExists { entity, .. } => AssertionKey::Exists {
                node: NodeRef::Entity(entity.clone()),
            },
            Assertion::EventOccurred { event, .. } => AssertionKey::Exists {
                node: NodeRef::Event(event.clone()),
            },
            Assertion::Attribute { entity, property, .. } => AssertionKey::Attribute {
                entity: entity.clone(),
                property: property.clone(),
            },
            Assertion::Timing { event, .. } => AssertionKey::Timing { event: event.clone() },
            Assertion::Causal { cause, effect, .. } => AssertionKey::Causal {
                cause: cause.clone(),
                effect: effect.clone(),
            },
        }
    }

    /// Node established by an existence assertion
    pub fn established_node(&self) -> Option<NodeRef> {
        match self {
            Assertion::EntityExists { entity, .. } => Some(NodeRef::Entity(entity.clone())),
            Assertion::EventOccurred { event, .. } => Some(NodeRef::Event(event.clone())),
            _ => None,
        }
    }

    /// Layer of an existence assertion
    pub fn layer(&self) -> Option<Layer> {
        match self {
            Assertion::EntityExists { layer, .. } | Assertion::EventOccurred { layer, .. } => Some(*layer),
            _ => None,
        }
    }

    /// Nodes that must already be established for this assertion to stand
    pub fn dependencies(&self) -> Vec<NodeRef> {
        match self {
            Assertion::EntityExists { .. } | Assertion::EventOccurred { .. } => Vec::new(),
            Assertion::Attribute { entity, .. } => vec![NodeRef::Entity(entity.clone())],
            Assertion::Timing { event, .. } => vec![NodeRef::Event(event.clone())],
            Assertion::Causal { cause, effect, .. } => vec![cause.clone(), effect.clone()],
        }
    }

    /// Whether two assertions sharing a key can both hold
    ///
    /// Existence claims must agree on layer and kind; attributes on value;
    /// timing estimates must have overlapping plausible ranges; causal claims
    /// must share polarity.
    pub fn compatible_with(&self, other: &Assertion) -> bool {
        match (self, other) {
            (
                Assertion::EntityExists { layer: la, kind: ka, .. },
                Assertion::EntityExists { layer: lb, kind: kb, .. },
            ) => la == lb && ka == kb,
            (
                Assertion::EventOccurred { layer: la, kind: ka, .. },
                Assertion::EventOccurred { layer: lb, kind: kb, .. },
            ) => la == lb && ka == kb,
            (Assertion::Attribute { value: a, .. }, Assertion::Attribute { value: b, .. }) => a == b,
            (Assertion::Timing { estimate: a, .. }, Assertion::Timing { estimate: b, .. }) => a.overlaps(b),
            (Assertion::Causal { polarity: a, .. }, Assertion::Causal { polarity: b, .. }) => a == b,
            _ => false,
        }
    }

    /// Commit phase: existence first, then attributes and timing, then causal links
    pub fn commit_phase(&self) -> u8 {
        match self {
            Assertion::EntityExists { .. } | Assertion::EventOccurred { .. } => 0,
            Assertion::Attribute { .. } | Assertion::Timing { .. } => 1,
            Assertion::Causal { .. } => 2,
        }
    }

    /// Whether this is an affirming causal assertion (one that can become an edge)
    pub fn is_affirmed_causal(&self) -> bool {
        matches!(self, Assertion::Causal { polarity: Polarity::Affirms, .. })
    }
}

/// Identity an assertion competes under
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssertionKey {
    /// Existence of a node
    Exists {
        /// Node established
        node: NodeRef,
    },
    /// One property of an entity
    Attribute {
        /// Entity described
        entity: EntityId,
        /// Property name
        property: String,
    },
    /// Timing of an event
    Timing {
        /// Event dated
        event: EventId,
    },
    /// Causal link between two nodes
    Causal {
        /// Cause node
        cause: NodeRef,
        /// Effect node
        effect: NodeRef,
    },
}

impl AssertionKey {
    /// Node this key is "about" (the effect for causal keys)
    pub fn subject(&self) -> NodeRef {
        match self {
            AssertionKey::Exists { node } => node.clone(),
            AssertionKey::Attribute { entity, .. } => NodeRef::Entity(entity.clone()),
            AssertionKey::Timing { event } => NodeRef::Event(event.clone()),
            AssertionKey::Causal { effect, .. } => effect.clone(),
        }
    }
}

impl fmt::Display for AssertionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionKey::Exists { node } => write!(f, "exists({})", node),
            AssertionKey::Attribute { entity, property } => write!(f, "attribute({}.{})", entity, property),
            AssertionKey::Timing { event } => write!(f, "timing({})", event),
            AssertionKey::Causal { cause, effect } => write!(f, "causal({} -> {})", cause, effect),
        }
    }
}

/// Candidate claim proposed upstream, not yet admitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimTemplate {
    /// Human-readable label (e.g. "drought contributed to palace economy collapse")
    pub label: String,
    /// What is asserted
    pub assertion: Assertion,
    /// Traces offered in support
    #[serde(default)]
    pub supporting_traces: Vec<TraceId>,
    /// Declared scope
    #[serde(default)]
    pub significance: Significance,
}

impl ClaimTemplate {
    /// Create a local-significance template with no traces
    pub fn new(label: impl Into<String>, assertion: Assertion) -> Self {
        Self {
            label: label.into(),
            assertion,
            supporting_traces: Vec::new(),
            significance: Significance::Local,
        }
    }

    /// Attach supporting traces
    pub fn with_traces<I, T>(mut self, traces: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TraceId>,
    {
        self.supporting_traces.extend(traces.into_iter().map(Into::into));
        self
    }

    /// Declare significance
    pub fn with_significance(mut self, significance: Significance) -> Self {
        self.significance = significance;
        self
    }
}

/// Lifecycle state of a claim version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ClaimStatus {
    /// In force
    #[default]
    Active,
    /// Replaced by a newer or stronger version
    Superseded {
        /// Claim that replaced this one
        by: ClaimId,
    },
}

/// An admitted claim version
///
/// Claims are immutable once created; updates create new claims that point
/// back through `supersedes`. Only `status` and `contested` change after
/// admission, and only through the claim ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique identifier of this version
    pub id: ClaimId,
    /// Human-readable label
    pub label: String,
    /// What is asserted
    pub assertion: Assertion,
    /// Declared or derived scope
    pub significance: Significance,
    /// Traces backing the claim (never empty)
    pub supporting_traces: BTreeSet<TraceId>,
    /// Number of distinct substrate types among the supporting traces
    pub distinct_substrates: usize,
    /// Aggregate evidence strength in [0, 1]
    pub strength: f64,
    /// Strength capped by the claims this one depends on
    pub confidence_score: f64,
    /// Categorical confidence
    pub confidence_level: ConfidenceLevel,
    /// Lifecycle state
    pub status: ClaimStatus,
    /// Previous version this claim replaced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<ClaimId>,
    /// An equally strong incompatible claim exists
    #[serde(default)]
    pub contested: bool,
}

impl Claim {
    /// Key this claim competes under
    pub fn key(&self) -> AssertionKey {
        self.assertion.key()
    }

    /// Whether the claim is in force
    pub fn is_active(&self) -> bool {
        matches!(self.status, ClaimStatus::Active)
    }

    /// Whether the claim meets the triangulation rule
    pub fn is_triangulated(&self, min_traces: usize, min_substrates: usize) -> bool {
        self.supporting_traces.len() >= min_traces && self.distinct_substrates >= min_substrates
    }
}
