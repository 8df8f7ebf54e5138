//! Report file naming and atomic output.
//!
//! Every rendered report is written to a hidden temp file first and renamed
//! into place only after all temp files of the batch were written, so a
//! failing run leaves no half-written reports behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use epicreport_shared::{ReportError, Result};

/// Timestamp layout used in report file names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Metadata for a single written report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// `{PROJECT}_Live_MCP_Report_{YYYYMMDD_HHMMSS}.{ext}`
pub fn report_file_name(project: &str, generated_at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}_Live_MCP_Report_{}.{extension}",
        sanitize(project),
        generated_at.format(FILE_TIMESTAMP_FORMAT)
    )
}

/// Keep file names portable: path separators and spaces become `_`.
fn sanitize(project: &str) -> String {
    let cleaned: String = project
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "Report".into()
    } else {
        cleaned
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Write `(filename, content)` pairs into `dir`.
///
/// 1. Creates `dir` if needed
/// 2. Writes every file to `.{filename}.tmp`
/// 3. Renames each temp file onto its target
///
/// If any temp write fails, the temp files already written are removed and
/// no target file is touched.
#[instrument(skip_all, fields(dir = %dir.display(), count = files.len()))]
pub fn write_artifacts(dir: &Path, files: &[(String, Vec<u8>)]) -> Result<Vec<ArtifactMeta>> {
    std::fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;

    let mut staged: Vec<PathBuf> = Vec::with_capacity(files.len());
    for (filename, content) in files {
        let temp = dir.join(format!(".{filename}.tmp"));
        if let Err(e) = std::fs::write(&temp, content) {
            discard(&staged);
            return Err(ReportError::io(&temp, e));
        }
        staged.push(temp);
    }

    let mut metas = Vec::with_capacity(files.len());
    for ((filename, content), temp) in files.iter().zip(&staged) {
        let target = dir.join(filename);
        std::fs::rename(temp, &target).map_err(|e| ReportError::io(&target, e))?;

        debug!(file = %filename, size = content.len(), "wrote report file");

        metas.push(ArtifactMeta {
            filename: filename.clone(),
            path: target,
            sha256: checksum(content),
            size_bytes: content.len(),
        });
    }

    info!(count = metas.len(), "report files written");
    Ok(metas)
}

fn discard(temps: &[PathBuf]) {
    for temp in temps {
        if let Err(e) = std::fs::remove_file(temp) {
            warn!(path = %temp.display(), error = %e, "failed to remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "epicreport-artifacts-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_name_layout() {
        let ts = Utc.with_ymd_and_hms(2025, 7, 1, 9, 5, 3).unwrap();
        assert_eq!(
            report_file_name("CloudInit", ts, "md"),
            "CloudInit_Live_MCP_Report_20250701_090503.md"
        );
        assert_eq!(
            report_file_name("One\\Cloud Init", ts, "xml"),
            "One_Cloud_Init_Live_MCP_Report_20250701_090503.xml"
        );
        assert_eq!(
            report_file_name("  ", ts, "json"),
            "Report_Live_MCP_Report_20250701_090503.json"
        );
    }

    #[test]
    fn checksum_is_sha256_hex() {
        assert_eq!(
            checksum(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn writes_files_and_reports_metadata() {
        let tmp = temp_dir();
        let out = tmp.join("reports");
        let files = vec![
            ("a.md".to_string(), b"# A\n".to_vec()),
            ("a.json".to_string(), b"{}".to_vec()),
        ];

        let metas = write_artifacts(&out, &files).unwrap();

        assert_eq!(metas.len(), 2);
        assert_eq!(std::fs::read(out.join("a.md")).unwrap(), b"# A\n");
        assert_eq!(metas[1].size_bytes, 2);
        assert_eq!(metas[1].sha256, checksum(b"{}"));
        assert_eq!(metas[0].path, out.join("a.md"));

        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn overwrite_is_idempotent() {
        let tmp = temp_dir();
        let files = vec![("r.md".to_string(), b"same".to_vec())];

        let first = write_artifacts(&tmp, &files).unwrap();
        let second = write_artifacts(&tmp, &files).unwrap();
        assert_eq!(first, second);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn failed_staging_leaves_no_files() {
        let tmp = temp_dir();
        let files = vec![
            ("ok.md".to_string(), b"x".to_vec()),
            ("missing/nested.md".to_string(), b"y".to_vec()),
        ];

        let err = write_artifacts(&tmp, &files).unwrap_err();
        assert!(matches!(err, ReportError::Io { .. }));

        let entries: Vec<_> = std::fs::read_dir(&tmp).unwrap().collect();
        assert!(entries.is_empty());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
