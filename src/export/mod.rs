//! Test suite export
//!
//! The server renders the export; the client only picks the format, works
//! out a file name and writes the bytes to disk.

use crate::types::{AppError, Result, TestSuiteId};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Excel,
    Json,
    Pdf,
}

impl ExportFormat {
    /// Value of the `format` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "excel",
            ExportFormat::Json => "json",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// File extension of the downloaded file
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Excel => "xlsx",
            ExportFormat::Json => "json",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "json" => Ok(ExportFormat::Json),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(AppError::InvalidInput(format!(
                "Unknown export format '{}'. Use excel, json or pdf.",
                other
            ))),
        }
    }
}

/// A file written by [`save_export`]
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// File name from a `Content-Disposition` header, quoted or bare
pub fn content_disposition_filename(header: &str) -> Option<String> {
    header.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        sanitize_filename(value)
    })
}

/// Keep only the final path component so a header cannot point outside the
/// target directory
pub fn sanitize_filename(name: &str) -> Option<String> {
    let normalized = name.replace('\\', "/");
    let base = Path::new(&normalized).file_name()?.to_str()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}

/// Pick the download name: the server's `Content-Disposition` name, then
/// the caller's choice, then `test-suite-{id}.{ext}`
pub fn resolve_filename(
    content_disposition: Option<&str>,
    requested: Option<&str>,
    suite_id: TestSuiteId,
    format: ExportFormat,
) -> String {
    content_disposition
        .and_then(content_disposition_filename)
        .or_else(|| requested.and_then(sanitize_filename))
        .unwrap_or_else(|| format!("test-suite-{}.{}", suite_id, format.extension()))
}

/// Write export bytes into `dir`, creating it when missing
pub async fn save_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<ExportedFile> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    info!("Saved export to {}", path.display());
    Ok(ExportedFile {
        path,
        file_name: file_name.to_string(),
        size: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("attachment; filename=\"report.xlsx\"", Some("report.xlsx"))]
    #[case("attachment; filename=suite_7.json", Some("suite_7.json"))]
    #[case("attachment; FileName=\"a b.pdf\"; size=10", Some("a b.pdf"))]
    #[case("attachment; filename=\"../../etc/passwd\"", Some("passwd"))]
    #[case("attachment", None)]
    #[case("attachment; filename=\"\"", None)]
    fn test_content_disposition(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(content_disposition_filename(header).as_deref(), expected);
    }

    #[rstest]
    #[case(ExportFormat::Excel, "test-suite-12.xlsx")]
    #[case(ExportFormat::Json, "test-suite-12.json")]
    #[case(ExportFormat::Pdf, "test-suite-12.pdf")]
    fn test_default_filename(#[case] format: ExportFormat, #[case] expected: &str) {
        assert_eq!(resolve_filename(None, None, 12, format), expected);
    }

    #[test]
    fn test_header_wins_over_request() {
        let name = resolve_filename(
            Some("attachment; filename=\"report.xlsx\""),
            Some("mine.xlsx"),
            3,
            ExportFormat::Excel,
        );
        assert_eq!(name, "report.xlsx");

        let name = resolve_filename(None, Some("out/mine.xlsx"), 3, ExportFormat::Excel);
        assert_eq!(name, "mine.xlsx");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert_eq!("pdf".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert!("csv".parse::<ExportFormat>().is_err());
        assert_eq!(ExportFormat::Excel.to_string(), "excel");
    }

    #[tokio::test]
    async fn test_save_export_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("exports");
        let saved = save_export(&target, "suite.json", b"{}").await.unwrap();
        assert_eq!(saved.size, 2);
        assert_eq!(tokio::fs::read(&saved.path).await.unwrap(), b"{}");
    }
}
