use std::path::PathBuf;

use crate::data::model::{FormatMode, DEFAULT_CHARGE_WIDTH};

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// How a tower's files are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub format: FormatMode,
    /// Load the four attribute classes as concurrent tasks.
    pub parallel: bool,
    /// RM charge lines of any other length are skipped.
    pub charge_width: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: FormatMode::Plain,
            parallel: false,
            charge_width: DEFAULT_CHARGE_WIDTH,
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Everything one invocation needs, independent of how it was parsed.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory holding the tower files; reports are written next to them.
    pub directory: PathBuf,
    pub load: LoadOptions,
    /// Also write `<tower>pairing_summary.json`.
    pub json: bool,
    /// Alpha sector to group into `<tower>sector_pairs.txt`.
    pub sector: Option<String>,
}

impl RunConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            load: LoadOptions::default(),
            json: false,
            sector: None,
        }
    }
}
