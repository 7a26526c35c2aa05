use log::warn;
use serde::Serialize;

use super::model::{StateDataStore, StateId};
use super::pairing::PairingResult;

// ---------------------------------------------------------------------------
// Sector membership
// ---------------------------------------------------------------------------

/// States (in store order) whose descriptor block belongs to the Alpha
/// sector `sector`.
///
/// States without an RM charge vector are not part of the pairing and are
/// left out.
pub fn states_in_sector(store: &StateDataStore, sector: &str) -> Vec<StateId> {
    let descriptors = store.descriptors();
    store
        .rm_charges()
        .ids()
        .filter(|id| descriptors.sector_of(id) == Some(sector))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// SectorGroup – one sector's states with their partners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorMember {
    pub state: StateId,
    /// Empty when the state is unpaired.
    pub partners: Vec<StateId>,
}

impl SectorMember {
    pub fn is_paired(&self) -> bool {
        !self.partners.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectorGroup {
    pub sector: String,
    pub members: Vec<SectorMember>,
}

impl SectorGroup {
    pub fn paired(&self) -> impl Iterator<Item = &SectorMember> {
        self.members.iter().filter(|m| m.is_paired())
    }

    pub fn unpaired(&self) -> impl Iterator<Item = &SectorMember> {
        self.members.iter().filter(|m| !m.is_paired())
    }
}

/// Collect the members of `sector` together with their pairing partners.
/// An unknown sector gives an empty group.
pub fn group_sector(store: &StateDataStore, result: &PairingResult, sector: &str) -> SectorGroup {
    if !store.descriptors().sectors.contains(sector) {
        warn!("tower {}: no Alpha sector named {sector}", store.tower());
    }

    let members = states_in_sector(store, sector)
        .into_iter()
        .map(|state| {
            let partners = result
                .partners_of(&state)
                .map(<[StateId]>::to_vec)
                .unwrap_or_default();
            SectorMember { state, partners }
        })
        .collect();

    SectorGroup {
        sector: sector.to_string(),
        members,
    }
}
