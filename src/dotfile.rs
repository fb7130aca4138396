// Local assignment records.
//
// Each problem-set directory keeps a `.grind` file recording which
// assignment it belongs to and how far the user has got on each problem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{GrindError, Result};

/// Name of the record file inside a problem-set directory.
pub const DOTFILE_NAME: &str = ".grind";

#[cfg(unix)]
const DOTFILE_MODE: u32 = 0o644;

/// Progress on a single problem.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: i64,
    pub step: i64,
    /// Files the user is allowed to submit, stored as `{name: true}`.
    #[serde(default)]
    pub whitelist: BTreeMap<String, bool>,
}

impl ProblemRecord {
    pub fn allows(&self, filename: &str) -> bool {
        self.whitelist.get(filename).copied().unwrap_or(false)
    }

    pub fn allow(&mut self, filename: impl Into<String>) {
        self.whitelist.insert(filename.into(), true);
    }
}

/// The contents of one `.grind` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    #[serde(rename = "assignmentID")]
    pub assignment_id: i64,
    #[serde(default)]
    pub problems: BTreeMap<String, ProblemRecord>,
    /// Directory holding the record; filled in when loaded.
    #[serde(skip)]
    pub path: PathBuf,
}

impl AssignmentRecord {
    pub fn new(assignment_id: i64, dir: impl Into<PathBuf>) -> Self {
        Self {
            assignment_id,
            problems: BTreeMap::new(),
            path: dir.into(),
        }
    }

    /// Load the record stored directly in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let file = dir.join(DOTFILE_NAME);
        let raw = fs::read(&file).map_err(|source| GrindError::DotFileRead {
            path: file.clone(),
            source,
        })?;

        let mut record: AssignmentRecord =
            serde_json::from_slice(&raw).map_err(|source| GrindError::DotFileCorrupt {
                path: file,
                source,
            })?;
        record.path = dir.to_path_buf();
        Ok(record)
    }

    /// Load the record of the nearest enclosing problem-set directory,
    /// starting at `start` and walking up through its ancestors.
    pub fn find(start: &Path) -> Result<Self> {
        let dir = start
            .ancestors()
            .find(|dir| dir.join(DOTFILE_NAME).is_file())
            .ok_or_else(|| GrindError::DotFileNotFound {
                start: start.to_path_buf(),
            })?;
        Self::load(dir)
    }

    /// Write the record back to its directory.
    pub fn save(&self) -> Result<()> {
        let file = self.path.join(DOTFILE_NAME);
        let raw = config::to_indented_json(self).map_err(|source| GrindError::Encode {
            what: "assignment record",
            source,
        })?;

        #[cfg(unix)]
        let written = config::write_file(&file, &raw, DOTFILE_MODE);
        #[cfg(not(unix))]
        let written = config::write_file(&file, &raw);

        written.map_err(|source| GrindError::DotFileWrite { path: file, source })
    }
}
