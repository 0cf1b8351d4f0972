use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;

use crate::manifest::HarvestManifest;
use crate::record::{RawRecord, HEADERS};

/// Values of one named column, trimmed, in file order.
pub fn read_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;
    let idx = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", path))?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| anyhow!("{:?} has no '{}' column", path, column))?;

    let mut values = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Malformed row in {:?}", path))?;
        values.push(row.get(idx).unwrap_or_default().trim().to_string());
    }
    Ok(values)
}

/// `isbn,link` output of the resolver. Rows are written as they are resolved.
pub struct ResolutionWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ResolutionWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer =
            csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
        writer.write_record(["isbn", "link"])?;
        Ok(ResolutionWriter {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn write(&mut self, isbn: &str, link: Option<&str>) -> Result<()> {
        self.writer
            .write_record([isbn, link.unwrap_or_default()])
            .with_context(|| format!("Failed to write {:?}", self.path))
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path))
    }
}

/// Write a whole batch, then move it into place. A batch file either exists
/// complete or not at all.
pub fn write_batch(path: &Path, records: &[RawRecord]) -> Result<()> {
    let tmp = path.with_extension("csv.part");
    {
        let mut writer =
            csv::Writer::from_path(&tmp).with_context(|| format!("Failed to create {:?}", tmp))?;
        for record in records {
            writer
                .serialize(record)
                .with_context(|| format!("Failed to write {:?}", tmp))?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("Failed to move {:?} to {:?}", tmp, path))?;
    Ok(())
}

pub fn read_batch(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", path))?;
    if !headers.iter().any(|h| h == HEADERS[0]) {
        bail!("{:?} is not a batch file (no '{}' column)", path, HEADERS[0]);
    }
    reader
        .deserialize()
        .collect::<Result<Vec<RawRecord>, _>>()
        .with_context(|| format!("Malformed batch file {:?}", path))
}

/// Batch files `<prefix>_<n>.csv` in `dir`, ordered by `n`.
pub fn discover_batches(dir: &Path, prefix: &str) -> Result<Vec<(usize, PathBuf)>> {
    let re = Regex::new(&format!(r"^{}_(\d+)\.csv$", regex::escape(prefix)))?;
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(n) = re.captures(name).and_then(|c| c[1].parse::<usize>().ok()) {
            found.push((n, path));
        }
    }
    found.sort_by_key(|(n, _)| *n);
    Ok(found)
}

/// Every record from every batch file, batch order then row order.
pub fn read_all_batches(dir: &Path, prefix: &str) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for (_, path) in discover_batches(dir, prefix)? {
        records.extend(read_batch(&path)?);
    }
    Ok(records)
}

pub fn manifest_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{}_manifest.json", prefix))
}

/// Remove batch files and the manifest left by an earlier harvest.
pub fn clear_batches(dir: &Path, prefix: &str) -> Result<usize> {
    let mut removed = 0;
    if !dir.exists() {
        return Ok(removed);
    }
    for (_, path) in discover_batches(dir, prefix)? {
        fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        removed += 1;
    }
    let manifest = manifest_path(dir, prefix);
    if manifest.exists() {
        fs::remove_file(&manifest).with_context(|| format!("Failed to remove {:?}", manifest))?;
    }
    Ok(removed)
}

/// Records of the last harvest in `dir`. When a manifest is present only the
/// batches it lists are read; otherwise every batch file is.
pub fn read_harvested(dir: &Path, prefix: &str) -> Result<Vec<RawRecord>> {
    let manifest = manifest_path(dir, prefix);
    if !manifest.exists() {
        return read_all_batches(dir, prefix);
    }
    let manifest = HarvestManifest::read(&manifest)?;
    let mut records = Vec::new();
    for batch in &manifest.batches {
        let path = match batch.path.file_name() {
            Some(name) => dir.join(name),
            None => batch.path.clone(),
        };
        records.extend(read_batch(&path)?);
    }
    Ok(records)
}
