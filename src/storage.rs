//! File side of the batch: input backup, queue loading, report output and
//! the resume file.

use crate::errors::{AppError, ResultExt};
use crate::models::{PipelineMode, ResultTable, WorkQueue};
use chrono::{DateTime, Local};
use csv::Writer;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Copies the input list to `backup` byte for byte.
pub fn backup_file(original: &Path, backup: &Path) -> Result<u64, AppError> {
    if !original.exists() {
        return Err(AppError::InputNotFound(original.display().to_string()));
    }
    let bytes = fs::copy(original, backup).with_context(|| {
        format!(
            "Failed to back up {} to {}",
            original.display(),
            backup.display()
        )
    })?;
    info!("Backup created: {}", backup.display());
    Ok(bytes)
}

/// Reads one phone number per line, trimmed, skipping blank lines.
///
/// Order and duplicates are preserved.
pub fn load_phone_numbers(path: &Path) -> Result<WorkQueue, AppError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(AppError::InputNotFound(path.display().to_string()));
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    let queue = parse_phone_list(&content);
    info!("Loaded {} phone numbers.", queue.len());
    Ok(queue)
}

pub fn parse_phone_list(content: &str) -> WorkQueue {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<YYYYmmdd_HHMMSS><suffix>.csv` for the given start time.
pub fn output_file_name(started_at: &DateTime<Local>, mode: PipelineMode) -> String {
    format!(
        "{}{}.csv",
        started_at.format("%Y%m%d_%H%M%S"),
        mode.output_suffix()
    )
}

/// Writes the report into a file that did not exist before.
///
/// If `dir/file_name` is taken, `_1`, `_2`, ... is inserted before the
/// extension.
pub fn write_results(
    table: &ResultTable,
    columns: &[&str],
    dir: &Path,
    file_name: &str,
) -> Result<PathBuf, AppError> {
    let (file, path) = create_unique(dir, file_name)?;
    debug!("Exporting {} rows to CSV: {}", table.len(), path.display());

    let mut wtr = Writer::from_writer(file);
    wtr.write_record(columns)?;
    for row in table.rows() {
        wtr.write_record(row.to_row(columns))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    info!("Processed data written to {}", path.display());
    Ok(path)
}

fn create_unique(dir: &Path, file_name: &str) -> Result<(File, PathBuf), AppError> {
    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
        None => (file_name.to_string(), String::new()),
    };

    let mut candidate = dir.join(file_name);
    let mut n = 0u32;
    loop {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(file) => return Ok((file, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                n += 1;
                candidate = dir.join(format!("{}_{}{}", stem, n, ext));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", candidate.display()));
            }
        }
    }
}

/// Overwrites `path` with the numbers still queued, one per line.
pub fn save_remaining_data(path: &Path, queue: &WorkQueue) -> Result<(), AppError> {
    let file =
        File::create(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for phone in queue.iter() {
        writeln!(writer, "{}", phone)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    info!(
        "Remaining data ({} numbers) written back to '{}'",
        queue.len(),
        path.display()
    );
    Ok(())
}
