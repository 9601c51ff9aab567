use std::path::PathBuf;

use reqwest::StatusCode;
use serde_json::Value;

use super::normalize::server_message;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no files selected")]
    NoFiles,

    #[error("cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("upload failed: {message}")]
    Status { status: u16, message: String },

    #[error("server did not return any image ids")]
    NoIdentifiers,

    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("no uploaded images to analyze")]
    NoAssets,

    #[error("analysis request failed: {message}")]
    Status { status: u16, message: String },

    #[error("analysis request rejected: {message}")]
    Rejected { message: String },

    #[error("analysis request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("result fetch failed: {message}")]
    Status { status: u16, message: String },

    #[error("result fetch failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl UploadError {
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Reason shown to the user: the backend's own text when it sent one
    pub fn message(&self) -> String {
        match self {
            UploadError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl AnalyzeError {
    pub fn status(&self) -> Option<u16> {
        match self {
            AnalyzeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AnalyzeError::Status { message, .. } | AnalyzeError::Rejected { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            FetchError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Server message when the body has one, otherwise the HTTP status
pub(crate) fn failure_message(body: &Value, status: StatusCode) -> String {
    server_message(body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_message_prefers_server_text() {
        let body = json!({"message": "file too large"});
        assert_eq!(failure_message(&body, StatusCode::PAYLOAD_TOO_LARGE), "file too large");
    }

    #[test]
    fn test_failure_message_falls_back_to_status() {
        assert_eq!(failure_message(&json!({}), StatusCode::BAD_GATEWAY), "HTTP 502");
    }

    #[test]
    fn test_display_carries_message() {
        let err = UploadError::Status { status: 500, message: "disk full".to_string() };
        assert_eq!(err.to_string(), "upload failed: disk full");
        assert_eq!(err.status(), Some(500));

        let err = AnalyzeError::Rejected { message: "quota".to_string() };
        assert!(err.to_string().contains("quota"));
        assert_eq!(err.status(), None);

        let err = FetchError::Status { status: 404, message: "HTTP 404".to_string() };
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_message_is_bare_backend_text() {
        let err = UploadError::Status { status: 500, message: "disk full".to_string() };
        assert_eq!(err.message(), "disk full");

        let err = AnalyzeError::Rejected { message: "quota".to_string() };
        assert_eq!(err.message(), "quota");

        let err = FetchError::Status { status: 502, message: "HTTP 502".to_string() };
        assert_eq!(err.message(), "HTTP 502");

        assert_eq!(UploadError::NoIdentifiers.message(), "server did not return any image ids");
        assert_eq!(AnalyzeError::NoAssets.message(), "no uploaded images to analyze");
    }

    #[test]
    fn test_file_error_names_path() {
        let err = UploadError::File {
            path: PathBuf::from("/tmp/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/tmp/missing.png"));
    }
}
