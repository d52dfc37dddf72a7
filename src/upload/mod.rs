//! Client-side upload guard
//!
//! Files are checked against the configured extension list and size limit
//! before anything is sent. This is a convenience for the user, not a
//! security boundary: the server validates again.

use crate::types::{AppError, Result};
use crate::utils::config::UploadConfig;
use reqwest::multipart::Part;
use std::path::Path;

/// A file read into memory and ready to be sent as a multipart part
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl UploadFile {
    /// Build from in-memory contents; the MIME type is guessed from the name
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name,
            bytes,
            mime,
        }
    }

    /// Read a file from disk. The guard runs on the file's metadata first,
    /// so a rejected file is never read.
    pub async fn from_path(path: impl AsRef<Path>, rules: &UploadConfig) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::InvalidInput(format!("{} is not a file", path.display())))?
            .to_string();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(AppError::InvalidInput(format!("{} is not a file", path.display())));
        }
        check(&file_name, metadata.len(), rules)?;

        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_bytes(file_name, bytes))
    }

    /// Lowercased extension, if the name has one
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.file_name)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Reject unsupported types and oversized files
    pub fn validate(&self, rules: &UploadConfig) -> Result<()> {
        check(&self.file_name, self.size(), rules)
    }

    pub(crate) fn to_part(&self) -> Result<Part> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.mime)
            .map_err(|e| AppError::InvalidInput(format!("Invalid MIME type '{}': {}", self.mime, e)))
    }
}

fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn check(file_name: &str, size: u64, rules: &UploadConfig) -> Result<()> {
    let allowed = extension_of(file_name).is_some_and(|ext| {
        rules
            .allowed_extensions
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    });
    if !allowed {
        let list = rules
            .allowed_extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_uppercase())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::InvalidInput(format!(
            "File type not supported. Please upload {} files.",
            list
        )));
    }

    if size > rules.max_file_size {
        return Err(AppError::InvalidInput(format!(
            "File is too large. Maximum size is {} MB.",
            rules.max_file_size / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_supported_types_case_insensitively() {
        let rules = UploadConfig::default();
        for name in ["brd.pdf", "Spec.DOCX", "notes.txt"] {
            let file = UploadFile::from_bytes(name, b"content".to_vec());
            assert!(file.validate(&rules).is_ok(), "{} should pass", name);
        }
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let rules = UploadConfig::default();
        let file = UploadFile::from_bytes("diagram.png", vec![0; 16]);
        let err = file.validate(&rules).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("PDF, DOCX, TXT")));

        let no_ext = UploadFile::from_bytes("README", vec![0; 16]);
        assert!(no_ext.validate(&rules).is_err());
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let rules = UploadConfig::default();
        let at_limit = UploadFile::from_bytes("big.pdf", vec![0; rules.max_file_size as usize]);
        assert!(at_limit.validate(&rules).is_ok());

        let over = UploadFile::from_bytes("big.pdf", vec![0; rules.max_file_size as usize + 1]);
        assert!(matches!(over.validate(&rules), Err(AppError::InvalidInput(ref m)) if m.contains("10 MB")));
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(UploadFile::from_bytes("a.pdf", vec![]).mime, "application/pdf");
        assert_eq!(UploadFile::from_bytes("a.txt", vec![]).mime, "text/plain");
        assert_eq!(
            UploadFile::from_bytes("a.unknownext", vec![]).mime,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.txt");
        tokio::fs::write(&path, b"The system shall log in users.").await.unwrap();

        let file = UploadFile::from_path(&path, &UploadConfig::default()).await.unwrap();
        assert_eq!(file.file_name, "requirements.txt");
        assert_eq!(file.extension().as_deref(), Some("txt"));
        assert_eq!(file.size(), 30);
    }

    #[tokio::test]
    async fn test_from_path_rejects_oversized_file_from_metadata() {
        let rules = UploadConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.pdf");
        // Sparse: reports 4 GB without allocating it
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(4 * 1024 * 1024 * 1024).unwrap();
        drop(file);

        let err = UploadFile::from_path(&path, &rules).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("10 MB")));
    }

    #[tokio::test]
    async fn test_from_path_rejects_type_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagram.png");
        tokio::fs::write(&path, [0u8; 8]).await.unwrap();

        let err = UploadFile::from_path(&path, &UploadConfig::default()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m.contains("File type not supported")));
    }
}
