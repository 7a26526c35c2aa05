/// Data layer: tower model, loading, pairing and sector grouping.
///
/// Architecture:
/// ```text
///  <tower>rm.u1.all / rm.na.all / lm.u1.all / states.all
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse lines → StateDataStore (plain or bracketed layout)
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ StateDataStore │  ordered per-state attribute tables
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ pairing   │  inverse-charge index → PairingResult
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  states of one Alpha sector with their partners
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod pairing;
