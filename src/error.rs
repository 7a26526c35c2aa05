use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::AttributeClass;

/// Whole-file failures while loading a tower. Per-line problems never
/// surface here; the loader skips those lines.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found for class {class}: {}", path.display())]
    MissingFile { class: AttributeClass, path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no tower files found in {}", dir.display())]
    NoTower { dir: PathBuf },
}

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("tower {tower}: missing RM or NA data (no {class} file)")]
    MissingData {
        tower: String,
        class: AttributeClass,
    },
}
