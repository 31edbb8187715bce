//! Per-round registration records and the CSV quality log.

use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const CSV_HEADER: &str = "tile,round,fixed_path,moving_path,quality,matches,inliers";

/// One row of the quality log: a (tile, round) that reached the quality step.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRecord {
    pub tile: u32,
    pub round: String,
    pub fixed_path: PathBuf,
    pub moving_path: PathBuf,
    /// Pearson correlation of the Otsu masks, in `[-1, 1]`.
    pub quality: f64,
    pub matches: usize,
    /// RANSAC inliers; empty for the direct estimator.
    pub inliers: Option<usize>,
}

impl RegistrationRecord {
    pub fn to_csv_row(&self) -> String {
        let fixed = self.fixed_path.to_string_lossy();
        let moving = self.moving_path.to_string_lossy();
        format!(
            "{},{},{},{},{:.6},{},{}",
            self.tile,
            escape_field(&self.round),
            escape_field(&fixed),
            escape_field(&moving),
            self.quality,
            self.matches,
            self.inliers.map(|n| n.to_string()).unwrap_or_default()
        )
    }
}

/// Quote a field when it contains a separator, quote or line break.
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write the header and every record to `path`, replacing any existing file.
pub fn write_quality_log(path: &Path, records: &[RegistrationRecord]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = BufWriter::new(std::fs::File::create(path)?);
    writeln!(out, "{}", CSV_HEADER)?;
    for record in records {
        writeln!(out, "{}", record.to_csv_row())?;
    }
    out.flush()
}
