//! Write check results to disk.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::models::CheckResult;

/// Output format for exported results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Errors that can occur while writing results.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// `AmaChecker_<dd-mm-YYYY_HH-MM-SS>.<ext>` inside `dir`.
pub fn default_export_path(dir: &Path, format: ExportFormat, now: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "AmaChecker_{}.{}",
        now.format("%d-%m-%Y_%H-%M-%S"),
        format.extension()
    ))
}

/// Render results as CSV, failures first (stable within each group).
pub fn render_csv(results: &[CheckResult]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    write_csv_records(&mut buffer, results)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

fn write_csv_records<W: std::io::Write>(
    out: W,
    results: &[CheckResult],
) -> Result<(), ExportError> {
    let mut sorted: Vec<&CheckResult> = results.iter().collect();
    sorted.sort_by_key(|r| r.result);

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["identifier", "url", "result", "reason"])?;
    for r in sorted {
        let result = r.result.to_string();
        writer.write_record([
            r.identifier.as_str(),
            r.url.as_str(),
            result.as_str(),
            r.reason.as_str(),
        ])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write results to `path` in `format`.
pub fn write_results(
    path: &Path,
    results: &[CheckResult],
    format: ExportFormat,
) -> Result<(), ExportError> {
    match format {
        ExportFormat::Csv => write_csv(path, results),
        ExportFormat::Json => write_json(path, results),
    }
}

/// Write results as CSV, failures first.
pub fn write_csv(path: &Path, results: &[CheckResult]) -> Result<(), ExportError> {
    create_parent(path)?;
    let file = std::fs::File::create(path).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_csv_records(file, results)
}

/// Write results as a pretty-printed JSON array, in input order.
pub fn write_json(path: &Path, results: &[CheckResult]) -> Result<(), ExportError> {
    let contents = serde_json::to_string_pretty(results)?;
    create_parent(path)?;
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn create_parent(path: &Path) -> Result<(), ExportError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.display().to_string(),
            source,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn results() -> Vec<CheckResult> {
        vec![
            CheckResult::evaluated("B01", "https://shop.test/B01?th=1".into(), true),
            CheckResult::failed("B02", "https://shop.test/B02?th=1".into(), "no price element found"),
            CheckResult::evaluated("B03", "https://shop.test/B03?th=1".into(), false),
            CheckResult::failed("B04", "https://shop.test/B04?th=1".into(), "error, \"quoted\""),
        ]
    }

    #[test]
    fn test_render_csv_failures_first() {
        let csv = render_csv(&results()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "identifier,url,result,reason");
        assert_eq!(lines[1], "B02,https://shop.test/B02?th=1,false,no price element found");
        assert_eq!(lines[2], "B03,https://shop.test/B03?th=1,false,");
        assert_eq!(lines[3], "B04,https://shop.test/B04?th=1,false,\"error, \"\"quoted\"\"\"");
        assert_eq!(lines[4], "B01,https://shop.test/B01?th=1,true,");
    }

    #[test]
    fn test_csv_reason_with_newline_reads_back() {
        let results = vec![CheckResult::failed(
            "B05",
            "https://shop.test/B05?th=1".into(),
            "request failed:\nconnection reset",
        )];
        let rendered = render_csv(&results).unwrap();

        let mut reader = csv::Reader::from_reader(rendered.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][3], "request failed:\nconnection reset");
    }

    #[test]
    fn test_default_export_path() {
        let now = Local.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        let path = default_export_path(Path::new("/tmp/out"), ExportFormat::Csv, now);
        assert_eq!(path, PathBuf::from("/tmp/out/AmaChecker_07-03-2024_14-05-09.csv"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.json");
        write_results(&path, &results(), ExportFormat::Json).unwrap();

        let parsed: Vec<CheckResult> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, results());
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        write_results(&path, &results(), ExportFormat::Csv).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            render_csv(&results()).unwrap()
        );
    }
}
