use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one harvest run, written next to the batch files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestManifest {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub batch_size: usize,
    pub total: usize,
    pub extracted: usize,
    pub batches: Vec<BatchEntry>,
    pub failed: Vec<FailedLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub number: usize,
    pub path: PathBuf,
    pub records: usize,
}

/// `index` is 1-based over the whole input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedLink {
    pub index: usize,
    pub link: String,
    pub error: String,
}

impl HarvestManifest {
    pub fn start(total: usize, batch_size: usize) -> Self {
        HarvestManifest {
            started_at: Utc::now(),
            finished_at: None,
            batch_size,
            total,
            extracted: 0,
            batches: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("Malformed manifest {:?}", path))
    }
}
