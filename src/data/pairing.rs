use std::collections::HashMap;

use log::{debug, info, warn};
use serde::Serialize;

use super::model::{negate, AttributeClass, AttributeTable, StateDataStore, StateId};
use crate::error::PairingError;

// ---------------------------------------------------------------------------
// Inverse-charge index
// ---------------------------------------------------------------------------

/// Charge vector → states holding exactly that vector, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct InverseChargeIndex {
    by_charges: HashMap<Vec<i64>, Vec<StateId>>,
}

impl InverseChargeIndex {
    /// Index the RM charges of `store`.
    pub fn build(store: &StateDataStore) -> Self {
        let mut by_charges: HashMap<Vec<i64>, Vec<StateId>> = HashMap::new();
        for (id, charges) in store.rm_charges().iter() {
            by_charges
                .entry(charges.clone())
                .or_default()
                .push(id.to_string());
        }
        Self { by_charges }
    }

    /// States whose vector equals `charges`; empty when there are none.
    pub fn lookup(&self, charges: &[i64]) -> &[StateId] {
        self.by_charges
            .get(charges)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// PairingResult
// ---------------------------------------------------------------------------

/// Outcome of one pairing pass over a tower.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PairingResult {
    /// Paired states with their partners, in store order.
    pub pairs: AttributeTable<Vec<StateId>>,
    /// States without any partner, in store order.
    pub unpaired: Vec<StateId>,
    /// One per (state, partner) edge. A mutual pair contributes 2.
    pub total_pairs: usize,
    pub num_paired_states: usize,
}

impl PairingResult {
    /// Partners of `id`; `None` when it is unpaired or unknown.
    pub fn partners_of(&self, id: &str) -> Option<&[StateId]> {
        self.pairs.get(id).map(Vec::as_slice)
    }

    pub fn is_paired(&self, id: &str) -> bool {
        self.pairs.contains(id)
    }
}

// ---------------------------------------------------------------------------
// PairingEngine
// ---------------------------------------------------------------------------

/// Pairs states whose RM charges are additive inverses and whose NA reps
/// are identical.
///
/// The index and the result are computed once in [`PairingEngine::new`];
/// afterwards the engine is read-only.
#[derive(Debug)]
pub struct PairingEngine {
    index: InverseChargeIndex,
    result: PairingResult,
}

impl PairingEngine {
    /// Fails only when the store lacks a whole required attribute class.
    pub fn new(store: &StateDataStore) -> Result<Self, PairingError> {
        if let Some(class) = store.missing_required() {
            return Err(PairingError::MissingData {
                tower: store.tower().to_string(),
                class,
            });
        }
        if store.is_empty() {
            warn!("tower {}: no rm charges loaded, nothing to pair", store.tower());
        }

        let gaps = store
            .rm_charges()
            .ids()
            .filter(|id| !store.na_reps().contains(id))
            .count();
        if gaps > 0 {
            debug!(
                "tower {}: {gaps} state(s) have rm charges but no {} entry",
                store.tower(),
                AttributeClass::NaReps
            );
        }

        let index = InverseChargeIndex::build(store);
        let result = compute_pairs(store, &index);
        info!(
            "tower {}: {} paired states, {} pairs, {} unpaired",
            store.tower(),
            result.num_paired_states,
            result.total_pairs,
            result.unpaired.len()
        );

        Ok(Self { index, result })
    }

    /// Charge index the result was computed from.
    pub fn index(&self) -> &InverseChargeIndex {
        &self.index
    }

    pub fn result(&self) -> &PairingResult {
        &self.result
    }

    pub fn into_result(self) -> PairingResult {
        self.result
    }
}

fn compute_pairs(store: &StateDataStore, index: &InverseChargeIndex) -> PairingResult {
    let mut result = PairingResult::default();

    for (id, charges) in store.rm_charges().iter() {
        let candidates: &[StateId] = match negate(charges) {
            Some(inverse) => index.lookup(&inverse),
            None => {
                debug!("state {id}: charges have no additive inverse");
                &[]
            }
        };
        let partners: Vec<StateId> = candidates
            .iter()
            .filter(|candidate| reps_match(store, id, candidate))
            .cloned()
            .collect();

        if partners.is_empty() {
            result.unpaired.push(id.to_string());
        } else {
            result.total_pairs += partners.len();
            result.num_paired_states += 1;
            result.pairs.insert(id.to_string(), partners);
        }
    }
    result
}

/// A missing rep entry on either side is a non-match.
fn reps_match(store: &StateDataStore, state: &str, candidate: &str) -> bool {
    let reps = store.na_reps();
    match (reps.get(state), reps.get(candidate)) {
        (Some(a), Some(b)) => a == b,
        _ => {
            debug!("no na reps for {state} or {candidate}; treated as unmatched");
            false
        }
    }
}
