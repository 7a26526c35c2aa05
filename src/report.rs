use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::filter::SectorGroup;
use crate::data::model::{AttributeClass, FormatMode, StateDataStore};
use crate::data::pairing::PairingResult;

// ---------------------------------------------------------------------------
// Legacy text reports
// ---------------------------------------------------------------------------

/// `<state>:<partner> <partner> ` per paired state, then the two counters.
pub fn write_vector_pairs<W: Write>(out: &mut W, result: &PairingResult) -> Result<()> {
    for (state, partners) in result.pairs.iter() {
        write!(out, "{state}:")?;
        for partner in partners {
            write!(out, "{partner} ")?;
        }
        writeln!(out)?;
    }
    write!(out, "\nTotal number of pairs: {}", result.total_pairs)?;
    write!(out, "\nNumber of paired states: {}", result.num_paired_states)?;
    Ok(())
}

/// One unpaired state per line, then the count.
pub fn write_unpaired<W: Write>(out: &mut W, result: &PairingResult) -> Result<()> {
    for state in &result.unpaired {
        writeln!(out, "{state}")?;
    }
    write!(out, "\nTotal number of unpaired states: {}", result.unpaired.len())?;
    Ok(())
}

/// Each sector member with its descriptor, followed by its partners.
pub fn write_sector_pairs<W: Write>(
    out: &mut W,
    group: &SectorGroup,
    store: &StateDataStore,
) -> Result<()> {
    let descriptor = |state: &str| -> String {
        store
            .descriptors()
            .states
            .get(state)
            .map(|values| {
                values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("  ")
            })
            .unwrap_or_default()
    };

    for member in &group.members {
        writeln!(out, "\t{}", member.state)?;
        writeln!(out, "{}", descriptor(member.state.as_str()))?;
        for partner in &member.partners {
            writeln!(out, "{partner}")?;
            writeln!(out, "{}", descriptor(partner.as_str()))?;
        }
        write!(out, "\n\n")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON summary
// ---------------------------------------------------------------------------

/// Serializable snapshot of one tower's pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingSummary {
    pub tower: String,
    pub format: FormatMode,
    pub states: usize,
    pub total_pairs: usize,
    pub num_paired_states: usize,
    pub unpaired: usize,
    /// Optional classes whose file was absent.
    pub missing_optional: Vec<AttributeClass>,
}

impl PairingSummary {
    pub fn new(store: &StateDataStore, result: &PairingResult) -> Self {
        Self {
            tower: store.tower().to_string(),
            format: store.format(),
            states: store.len(),
            total_pairs: result.total_pairs,
            num_paired_states: result.num_paired_states,
            unpaired: result.unpaired.len(),
            missing_optional: store.missing().filter(|c| !c.is_required()).collect(),
        }
    }
}

pub fn write_summary_json<W: Write>(out: &mut W, summary: &PairingSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary).context("serializing pairing summary")?;
    writeln!(out)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// File output
// ---------------------------------------------------------------------------

pub fn vector_pairs_path(dir: &Path, tower: &str) -> PathBuf {
    dir.join(format!("{tower}vector_pairs.txt"))
}

pub fn unpaired_path(dir: &Path, tower: &str) -> PathBuf {
    dir.join(format!("{tower}up_vectors.txt"))
}

pub fn sector_pairs_path(dir: &Path, tower: &str) -> PathBuf {
    dir.join(format!("{tower}sector_pairs.txt"))
}

pub fn summary_path(dir: &Path, tower: &str) -> PathBuf {
    dir.join(format!("{tower}pairing_summary.json"))
}

/// Create (or overwrite) `path` and hand a buffered writer to `render`.
pub fn write_report<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut out = BufWriter::new(file);
    render(&mut out).with_context(|| format!("writing {}", path.display()))?;
    out.flush()
        .with_context(|| format!("flushing {}", path.display()))
}

/// Write the two legacy reports of a tower into `dir`.
pub fn write_tower_reports(dir: &Path, tower: &str, result: &PairingResult) -> Result<()> {
    write_report(&vector_pairs_path(dir, tower), |out| {
        write_vector_pairs(out, result)
    })?;
    write_report(&unpaired_path(dir, tower), |out| write_unpaired(out, result))
}
