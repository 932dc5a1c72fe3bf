//! Run report writer
//!
//! Writes are atomic: the report is serialized to a sibling temp file and
//! renamed into place, so a reader never sees a half-written report.

use crate::error::ReportResult;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use stories_core::Run;

/// Write `run` as pretty-printed JSON to `path`, creating parent directories
pub fn write_run(run: &Run, path: &Path) -> ReportResult<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    match write_inner(run, &temp_path) {
        Ok(()) => {
            fs::rename(&temp_path, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}

fn write_inner(run: &Run, path: &Path) -> ReportResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, run)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
