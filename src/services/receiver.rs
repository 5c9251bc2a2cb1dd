//! Artifact receiver
//!
//! Validates an uploaded dataset (declared media type, size ceiling) and
//! persists it into the staging directory under a collision-resistant name.
//! Staged files are referenced for the duration of one pipeline run;
//! retention and cleanup are an external concern.

use chrono::Utc;
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// Hard ceiling on accepted artifact size (10 MiB)
pub const MAX_ARTIFACT_BYTES: u64 = 10 * 1024 * 1024;

/// Declared media type of an uploaded artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Csv,
    Json,
}

impl MediaType {
    /// Parse a declared content type, ignoring any `;charset=...` suffix.
    /// Returns `None` for anything other than CSV or JSON.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/csv" | "application/csv" => Some(MediaType::Csv),
            "application/json" => Some(MediaType::Json),
            _ => None,
        }
    }
}

/// An accepted, staged upload
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    /// Filename as declared by the uploader
    pub original_filename: String,
    /// Where the payload was staged
    pub staged_path: PathBuf,
    /// Declared media type (csv or json)
    pub media_type: MediaType,
    /// Payload size in bytes
    pub size: u64,
}

/// Receiver errors
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// Declared media type is not CSV or JSON
    #[error("unsupported media type: {0}")]
    InvalidMediaType(String),

    /// Payload exceeds the 10 MiB ceiling
    #[error("artifact of {0} bytes exceeds the {MAX_ARTIFACT_BYTES} byte ceiling")]
    TooLarge(u64),

    /// Staging directory creation or file write failed
    #[error("failed to stage artifact: {0}")]
    StagingWrite(#[source] std::io::Error),
}

/// Validates and stages uploaded artifacts
pub struct ArtifactReceiver {
    staging_dir: PathBuf,
}

impl ArtifactReceiver {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Validate an upload and write it into the staging directory.
    ///
    /// The staged name combines the multipart field name, the current epoch
    /// milliseconds, and a random suffix, so concurrent uploads never
    /// collide without any locking. The extension is normalized to `.csv`
    /// regardless of declared type.
    pub async fn receive(
        &self,
        field_name: &str,
        original_filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<UploadedArtifact, ReceiveError> {
        let media_type = MediaType::from_content_type(content_type)
            .ok_or_else(|| ReceiveError::InvalidMediaType(content_type.to_string()))?;

        let size = bytes.len() as u64;
        if size > MAX_ARTIFACT_BYTES {
            return Err(ReceiveError::TooLarge(size));
        }

        fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(ReceiveError::StagingWrite)?;

        let staged_name = format!(
            "{}-{}-{}.csv",
            field_name,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let staged_path = self.staging_dir.join(staged_name);

        fs::write(&staged_path, bytes)
            .await
            .map_err(ReceiveError::StagingWrite)?;

        debug!(
            staged_path = %staged_path.display(),
            size = size,
            "Artifact staged"
        );

        Ok(UploadedArtifact {
            original_filename: original_filename.to_string(),
            staged_path,
            media_type,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn accepts_csv_and_stages_under_csv_extension() {
        let dir = TempDir::new().unwrap();
        let receiver = ArtifactReceiver::new(dir.path());

        let artifact = receiver
            .receive("file", "sensors.csv", "text/csv", b"a,b\n1,2\n")
            .await
            .unwrap();

        assert_eq!(artifact.original_filename, "sensors.csv");
        assert_eq!(artifact.media_type, MediaType::Csv);
        assert_eq!(artifact.size, 8);
        assert_eq!(
            artifact.staged_path.extension().and_then(|e| e.to_str()),
            Some("csv")
        );

        let staged = std::fs::read(&artifact.staged_path).unwrap();
        assert_eq!(staged, b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn json_uploads_are_accepted_but_staged_as_csv() {
        let dir = TempDir::new().unwrap();
        let receiver = ArtifactReceiver::new(dir.path());

        let artifact = receiver
            .receive("file", "events.json", "application/json", b"[]")
            .await
            .unwrap();

        assert_eq!(artifact.media_type, MediaType::Json);
        assert!(artifact.staged_path.to_string_lossy().ends_with(".csv"));
    }

    #[tokio::test]
    async fn rejects_disallowed_media_type_without_staging() {
        let dir = TempDir::new().unwrap();
        let receiver = ArtifactReceiver::new(dir.path());

        let err = receiver
            .receive("file", "report.pdf", "application/pdf", b"%PDF")
            .await
            .unwrap_err();

        assert!(matches!(err, ReceiveError::InvalidMediaType(_)));
        // Nothing was written; the staging dir was never even created.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn rejects_oversized_payload_before_staging() {
        let dir = TempDir::new().unwrap();
        let receiver = ArtifactReceiver::new(dir.path());

        let oversized = vec![b'x'; (MAX_ARTIFACT_BYTES + 1) as usize];
        let err = receiver
            .receive("file", "big.csv", "text/csv", &oversized)
            .await
            .unwrap_err();

        assert!(matches!(err, ReceiveError::TooLarge(n) if n == MAX_ARTIFACT_BYTES + 1));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn concurrent_uploads_stage_under_distinct_names() {
        let dir = TempDir::new().unwrap();
        let receiver = ArtifactReceiver::new(dir.path());

        let first = receiver
            .receive("file", "a.csv", "text/csv", b"1")
            .await
            .unwrap();
        let second = receiver
            .receive("file", "a.csv", "text/csv", b"2")
            .await
            .unwrap();

        assert_ne!(first.staged_path, second.staged_path);
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert_eq!(
            MediaType::from_content_type("text/csv; charset=utf-8"),
            Some(MediaType::Csv)
        );
        assert_eq!(MediaType::from_content_type("application/octet-stream"), None);
    }
}
