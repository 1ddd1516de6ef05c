//! Run directory creation and artifact persistence.
//!
//! Each process invocation gets its own directory named by its start time:
//!
//! ```text
//! workspace/<YYYYMMDD-HHMMSS>/
//!   outputs/
//!     summary.md
//!     commands_<n>.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::types::{CapturedOutput, ExecutedCommand};
use crate::error::FilesystemError;

pub const OUTPUTS_DIR: &str = "outputs";
pub const SUMMARY_FILE: &str = "summary.md";

/// Per-run directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Directory name (`YYYYMMDD-HHMMSS`).
    pub timestamp: String,
    pub run_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Workspace {
    /// Create the run directory for the current local time under `base_dir`.
    pub fn create(base_dir: &Path) -> Result<Self> {
        Self::create_named(base_dir, &generate_timestamp())
    }

    /// Create (or reuse) the run directory `base_dir/<timestamp>` and its `outputs/`.
    pub fn create_named(base_dir: &Path, timestamp: &str) -> Result<Self> {
        let run_dir = base_dir.join(timestamp);
        let output_dir = run_dir.join(OUTPUTS_DIR);
        create_dir(&run_dir)?;
        create_dir(&output_dir)?;
        info!(run_dir = %run_dir.display(), "workspace ready");
        Ok(Self {
            timestamp: timestamp.to_string(),
            run_dir,
            output_dir,
        })
    }

    /// Write `content` as the whole of `filename` under the run directory or `subdir`.
    ///
    /// Existing files are overwritten.
    pub fn save_file(
        &self,
        filename: &str,
        content: &str,
        subdir: Option<&str>,
    ) -> Result<PathBuf> {
        let dir = match subdir {
            Some(subdir) => {
                let dir = self.run_dir.join(subdir);
                create_dir(&dir)?;
                dir
            }
            None => self.run_dir.clone(),
        };
        let path = dir.join(filename);
        fs::write(&path, content).map_err(|err| FilesystemError::new(&path, err))?;
        debug!(path = %path.display(), bytes = content.len(), "saved file");
        Ok(path)
    }

    /// Write `outputs/commands_<n>.json`, `n` being the number of entries already in `outputs/`.
    ///
    /// The file holds `[[command, {"stdout", "stderr"}], ...]` for every command
    /// that completed; timed-out commands have no output pair.
    pub fn save_commands_manifest(&self, executed: &[ExecutedCommand]) -> Result<PathBuf> {
        let n = count_entries(&self.output_dir)?;
        let filename = format!("commands_{n}.json");
        let manifest = render_manifest(executed)?;
        self.save_file(&filename, &manifest, Some(OUTPUTS_DIR))
    }

    /// Absolute form of the run directory, for prompts.
    pub fn absolute_run_dir(&self) -> Result<PathBuf> {
        fs::canonicalize(&self.run_dir)
            .with_context(|| format!("resolve {}", self.run_dir.display()))
    }
}

#[derive(Serialize)]
struct ManifestEntry<'a>(&'a str, &'a CapturedOutput);

pub fn render_manifest(executed: &[ExecutedCommand]) -> Result<String> {
    let entries: Vec<ManifestEntry<'_>> = executed
        .iter()
        .filter_map(|entry| {
            entry
                .result
                .output()
                .map(|output| ManifestEntry(&entry.command, output))
        })
        .collect();
    serde_json::to_string(&entries).context("serialize commands manifest")
}

pub fn generate_timestamp() -> String {
    Local::now().format("%Y%m%d-%H%M%S").to_string()
}

fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| FilesystemError::new(path, err))?;
    Ok(())
}

fn count_entries(dir: &Path) -> Result<usize> {
    let entries = fs::read_dir(dir).map_err(|err| FilesystemError::new(dir, err))?;
    Ok(entries.filter(|entry| entry.is_ok()).count())
}
