// crates/phasebench-cli/src/documents.rs
// ============================================================================
// Module: Result Tree Discovery
// Description: Locates and loads persisted metrics documents.
// Purpose: Share bounded document reads between validate and compare.
// Dependencies: phasebench-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A results tree holds one directory per scenario, each with a
//! `metrics.json` and, for multi-phase runs, a `metrics-extended.json`.
//! Discovery only matches those file names so raw generator output and
//! side-channel documents living next to them are never mistaken for
//! results. Reads are size-limited before any parsing happens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use phasebench_core::MetricsDocument;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of the primary metrics document.
pub const METRICS_FILE_NAME: &str = "metrics.json";
/// File name of the extended metrics document.
pub const EXTENDED_FILE_NAME: &str = "metrics-extended.json";
/// Maximum accepted document size in bytes.
pub const MAX_DOCUMENT_BYTES: u64 = 16 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while locating or reading documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The input path does not exist.
    #[error("input not found: {0}")]
    Missing(PathBuf),
    /// The input could not be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },
    /// The input exceeds [`MAX_DOCUMENT_BYTES`].
    #[error("{path} is {size} bytes (limit {limit})")]
    TooLarge {
        /// Offending path.
        path: PathBuf,
        /// Actual size.
        size: u64,
        /// Allowed size.
        limit: u64,
    },
    /// The input is not a valid document.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Finds files named `file_name` under `root`, sorted by path.
///
/// Only the top level is searched unless `recursive` is set.
///
/// # Errors
///
/// Returns [`DocumentError::Missing`] when `root` does not exist and
/// [`DocumentError::Io`] when a directory cannot be listed.
pub fn discover(
    root: &Path,
    file_name: &str,
    recursive: bool,
) -> Result<Vec<PathBuf>, DocumentError> {
    if !root.exists() {
        return Err(DocumentError::Missing(root.to_path_buf()));
    }
    let mut found = Vec::new();
    walk(root, file_name, recursive, &mut found)?;
    found.sort();
    Ok(found)
}

/// Appends matching files below `dir`.
fn walk(
    dir: &Path,
    file_name: &str,
    recursive: bool,
    found: &mut Vec<PathBuf>,
) -> Result<(), DocumentError> {
    let entries = fs::read_dir(dir).map_err(|err| io_error(dir, &err))?;
    for entry in entries {
        let entry = entry.map_err(|err| io_error(dir, &err))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|err| io_error(&path, &err))?;
        if file_type.is_dir() {
            if recursive {
                walk(&path, file_name, recursive, found)?;
            }
        } else if file_type.is_file() && entry.file_name() == file_name {
            found.push(path);
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Reads a JSON document with a size limit.
///
/// # Errors
///
/// Returns [`DocumentError`] when the file is missing, too large,
/// unreadable, or not JSON.
pub fn read_json(path: &Path) -> Result<Value, DocumentError> {
    let bytes = read_bounded(path)?;
    serde_json::from_slice(&bytes).map_err(|err| DocumentError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Reads and decodes a metrics document.
///
/// # Errors
///
/// Returns [`DocumentError`] when the file cannot be read or does not
/// decode as a metrics document.
pub fn read_metrics_document(path: &Path) -> Result<MetricsDocument, DocumentError> {
    let bytes = read_bounded(path)?;
    serde_json::from_slice(&bytes).map_err(|err| DocumentError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Reads a file while enforcing [`MAX_DOCUMENT_BYTES`].
fn read_bounded(path: &Path) -> Result<Vec<u8>, DocumentError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            DocumentError::Missing(path.to_path_buf())
        } else {
            io_error(path, &err)
        }
    })?;
    let size = file.metadata().map_err(|err| io_error(path, &err))?.len();
    if size > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    let mut bytes = Vec::new();
    file.take(MAX_DOCUMENT_BYTES.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| io_error(path, &err))?;
    let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if actual > MAX_DOCUMENT_BYTES {
        return Err(DocumentError::TooLarge {
            path: path.to_path_buf(),
            size: actual,
            limit: MAX_DOCUMENT_BYTES,
        });
    }
    Ok(bytes)
}

/// Wraps an I/O error with its path.
fn io_error(path: &Path, err: &std::io::Error) -> DocumentError {
    DocumentError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

// ============================================================================
// SECTION: Result Sets
// ============================================================================

/// Metrics documents keyed by scenario name.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// Documents by scenario name.
    pub documents: BTreeMap<String, MetricsDocument>,
    /// Files skipped because an earlier file already claimed the scenario.
    pub duplicates: Vec<PathBuf>,
}

/// Loads a result set from a single document or a results tree.
///
/// A file is loaded as one document; a directory is searched recursively
/// for `metrics.json`. When two files name the same scenario the first in
/// path order wins and the other is listed in [`ResultSet::duplicates`].
///
/// # Errors
///
/// Returns [`DocumentError`] when the input is missing or any document
/// cannot be read.
pub fn load_result_set(path: &Path) -> Result<ResultSet, DocumentError> {
    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        discover(path, METRICS_FILE_NAME, true)?
    };
    let mut set = ResultSet::default();
    for file in files {
        let document = read_metrics_document(&file)?;
        if set.documents.contains_key(&document.scenario.name) {
            set.duplicates.push(file);
            continue;
        }
        set.documents.insert(document.scenario.name.clone(), document);
    }
    Ok(set)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
