//! Vector pair identification for matter state towers.
//!
//! A tower is a group of files sharing a `2Ms<N>.EL<N>.ER<N>.` prefix. The
//! [`data::loader`] turns them into a [`StateDataStore`], the
//! [`PairingEngine`] pairs states whose RM charges are additive inverses and
//! whose NA reps agree, and [`report`] renders the legacy text outputs.

pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod report;

pub use config::{LoadOptions, RunConfig};
pub use data::model::{FormatMode, StateDataStore};
pub use data::pairing::{PairingEngine, PairingResult};
pub use error::{LoadError, PairingError};
