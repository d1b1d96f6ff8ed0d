use mime::Mime;
use std::time::Duration;
use thiserror::Error;

/// Smallest part size the storage provider accepts for any part but the
/// last one.
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Static upload policy, fixed for the lifetime of the process.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Size of each uploaded part; every part but the last is exactly this
    /// big. Must be at least [`MIN_PART_SIZE`].
    pub chunk_size: u64,
    /// Total attempts per part, including the first.
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay: Duration,
    /// MIME types the upload widget accepts.
    pub allowed_content_types: Vec<Mime>,
    /// Requested lifetime of presigned part URLs.
    pub presigned_url_expiry: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: MIN_PART_SIZE,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            allowed_content_types: vec![
                "video/mp4".parse().expect("static mime"),
                "video/quicktime".parse().expect("static mime"),
                "video/x-matroska".parse().expect("static mime"),
                "video/webm".parse().expect("static mime"),
                "image/jpeg".parse().expect("static mime"),
                "image/png".parse().expect("static mime"),
            ],
            presigned_url_expiry: Duration::from_secs(900),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unsupported content type {content_type}; allowed: {}", allowed.join(", "))]
    InvalidType {
        content_type: String,
        allowed: Vec<String>,
    },
}

/// Gate a file before any network traffic. Pure: same input, same result.
pub fn validate_file(content_type: &str, config: &UploadConfig) -> Result<(), ValidationError> {
    let invalid = || ValidationError::InvalidType {
        content_type: content_type.to_string(),
        allowed: config
            .allowed_content_types
            .iter()
            .map(|m| m.essence_str().to_string())
            .collect(),
    };

    let mime: Mime = content_type.parse().map_err(|_| invalid())?;

    if config
        .allowed_content_types
        .iter()
        .any(|allowed| allowed.essence_str() == mime.essence_str())
    {
        Ok(())
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_video_type() {
        let config = UploadConfig::default();
        assert!(validate_file("video/mp4", &config).is_ok());
    }

    #[test]
    fn rejects_unlisted_type_with_allowed_set() {
        let config = UploadConfig::default();
        let err = validate_file("application/pdf", &config).unwrap_err();
        match err {
            ValidationError::InvalidType {
                content_type,
                allowed,
            } => {
                assert_eq!(content_type, "application/pdf");
                assert!(allowed.contains(&"video/mp4".to_string()));
            }
        }
    }

    #[test]
    fn rejects_malformed_content_type() {
        let config = UploadConfig::default();
        assert!(validate_file("not a mime", &config).is_err());
    }

    #[test]
    fn validation_is_idempotent() {
        let config = UploadConfig::default();
        assert_eq!(
            validate_file("video/webm", &config),
            validate_file("video/webm", &config)
        );
        assert_eq!(
            validate_file("text/plain", &config),
            validate_file("text/plain", &config)
        );
    }
}
