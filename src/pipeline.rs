use anyhow::{bail, Context, Result};
use log::{error, info};

use crate::config::RunConfig;
use crate::data::filter::group_sector;
use crate::data::loader::{find_towers, load_tower};
use crate::data::pairing::PairingEngine;
use crate::error::LoadError;
use crate::report::{
    sector_pairs_path, summary_path, write_report, write_sector_pairs, write_summary_json,
    write_tower_reports, PairingSummary,
};

/// What happened to one tower.
#[derive(Debug, Clone)]
pub struct TowerOutcome {
    pub summary: PairingSummary,
    /// Number of sector members written, when a sector was requested.
    pub sector_members: Option<usize>,
}

/// Load, pair and report a single tower.
pub fn process_tower(config: &RunConfig, tower: &str) -> Result<TowerOutcome> {
    let dir = config.directory.as_path();
    let store = load_tower(dir, tower, config.load)
        .with_context(|| format!("loading tower {tower}"))?;
    let engine = PairingEngine::new(&store)?;
    let result = engine.result();

    write_tower_reports(dir, tower, result)?;

    let summary = PairingSummary::new(&store, result);
    if config.json {
        write_report(&summary_path(dir, tower), |out| {
            write_summary_json(out, &summary)
        })?;
    }

    let sector_members = match &config.sector {
        Some(sector) => {
            let group = group_sector(&store, result, sector);
            write_report(&sector_pairs_path(dir, tower), |out| {
                write_sector_pairs(out, &group, &store)
            })?;
            Some(group.members.len())
        }
        None => None,
    };

    Ok(TowerOutcome {
        summary,
        sector_members,
    })
}

/// Process every tower in the configured directory.
///
/// A failing tower is logged and skipped; the run only fails when there is
/// nothing to process or every tower failed.
pub fn run(config: &RunConfig) -> Result<Vec<TowerOutcome>> {
    let towers = find_towers(&config.directory)?;
    if towers.is_empty() {
        return Err(LoadError::NoTower {
            dir: config.directory.clone(),
        }
        .into());
    }
    info!(
        "found {} tower(s) in {}",
        towers.len(),
        config.directory.display()
    );

    let mut outcomes = Vec::with_capacity(towers.len());
    for tower in &towers {
        match process_tower(config, tower) {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => error!("{err:#}"),
        }
    }

    if outcomes.is_empty() {
        bail!("all {} tower(s) failed", towers.len());
    }
    Ok(outcomes)
}
