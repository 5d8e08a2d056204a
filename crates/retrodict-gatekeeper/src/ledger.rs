//! Claim ledger - every admitted claim version, in admission order

use crate::GatekeeperError;
use retrodict_domain::{AssertionKey, Claim, ClaimId, ClaimStatus, Layer, NodeRef};
use std::collections::{BTreeMap, HashMap};

/// All claim versions, indexed by id and by assertion key
///
/// Claims are appended, never removed. Status changes (supersession,
/// contest marks) only happen through the gatekeeper's sequential commit.
#[derive(Debug, Clone, Default)]
pub struct ClaimLedger {
    claims: Vec<Claim>,
    by_id: HashMap<ClaimId, usize>,
    by_key: BTreeMap<AssertionKey, Vec<usize>>,
}

impl ClaimLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger from a claim list (e.g. a snapshot's claims)
    pub fn from_claims(claims: Vec<Claim>) -> Result<Self, GatekeeperError> {
        let mut ledger = Self::new();
        for claim in claims {
            if ledger.by_id.contains_key(&claim.id) {
                return Err(GatekeeperError::Ledger(format!("duplicate claim id {}", claim.id)));
            }
            ledger.push(claim);
        }
        Ok(ledger)
    }

    /// Claim by id
    pub fn get(&self, id: ClaimId) -> Option<&Claim> {
        self.by_id.get(&id).map(|&i| &self.claims[i])
    }

    /// All claim versions in admission order
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// Consume the ledger
    pub fn into_claims(self) -> Vec<Claim> {
        self.claims
    }

    /// Claims in force
    pub fn active(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(|c| c.is_active())
    }

    /// Active claims under a key, in admission order
    pub fn active_for_key(&self, key: &AssertionKey) -> Vec<&Claim> {
        self.by_key
            .get(key)
            .map(|idx| {
                idx.iter()
                    .map(|&i| &self.claims[i])
                    .filter(|c| c.is_active())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Strongest active existence claim for a node
    pub fn existence(&self, node: &NodeRef) -> Option<&Claim> {
        let key = AssertionKey::Exists { node: node.clone() };
        self.active_for_key(&key)
            .into_iter()
            .fold(None, |best: Option<&Claim>, c| match best {
                Some(b) if b.confidence_score >= c.confidence_score => Some(b),
                _ => Some(c),
            })
    }

    /// Layer of an established node
    pub fn node_layer(&self, node: &NodeRef) -> Option<Layer> {
        self.existence(node).and_then(|c| c.assertion.layer())
    }

    /// Confidence score of an established node's existence claim
    pub fn node_score(&self, node: &NodeRef) -> Option<f64> {
        self.existence(node).map(|c| c.confidence_score)
    }

    /// Number of claim versions
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub(crate) fn push(&mut self, claim: Claim) {
        let idx = self.claims.len();
        self.by_id.insert(claim.id, idx);
        self.by_key.entry(claim.key()).or_default().push(idx);
        self.claims.push(claim);
    }

    pub(crate) fn supersede(&mut self, id: ClaimId, by: ClaimId) {
        if let Some(&i) = self.by_id.get(&id) {
            self.claims[i].status = ClaimStatus::Superseded { by };
        }
    }

    pub(crate) fn mark_contested(&mut self, id: ClaimId) {
        if let Some(&i) = self.by_id.get(&id) {
            self.claims[i].contested = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrodict_domain::{Assertion, ConfidenceLevel, EntityId, Significance};

    fn existence(entity: &str, score: f64) -> Claim {
        Claim {
            id: ClaimId::new(),
            label: entity.into(),
            assertion: Assertion::EntityExists {
                entity: EntityId::new(entity),
                layer: Layer::L3,
                kind: "institution".into(),
            },
            significance: Significance::Local,
            supporting_traces: Default::default(),
            distinct_substrates: 1,
            strength: score,
            confidence_score: score,
            confidence_level: ConfidenceLevel::Plausible,
            status: ClaimStatus::Active,
            supersedes: None,
            contested: false,
        }
    }

    #[test]
    fn test_existence_picks_strongest_active() {
        let weak = existence("palace", 0.4);
        let strong = existence("palace", 0.7);
        let strong_id = strong.id;
        let ledger = ClaimLedger::from_claims(vec![weak, strong]).unwrap();

        let node = NodeRef::entity("palace");
        assert_eq!(ledger.existence(&node).map(|c| c.id), Some(strong_id));
        assert_eq!(ledger.node_layer(&node), Some(Layer::L3));
    }

    #[test]
    fn test_superseded_claims_are_not_active() {
        let old = existence("palace", 0.7);
        let new = existence("palace", 0.4);
        let (old_id, new_id) = (old.id, new.id);
        let mut ledger = ClaimLedger::from_claims(vec![old, new]).unwrap();
        ledger.supersede(old_id, new_id);

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.active().count(), 1);
        assert_eq!(ledger.node_score(&NodeRef::entity("palace")), Some(0.4));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let claim = existence("palace", 0.5);
        let result = ClaimLedger::from_claims(vec![claim.clone(), claim]);
        assert!(matches!(result, Err(GatekeeperError::Ledger(_))));
    }
}
