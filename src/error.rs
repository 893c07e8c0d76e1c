//! Error types for dataset collection and curation operations

use thiserror::Error;

/// Result type alias for trackset operations
pub type Result<T> = std::result::Result<T, TracksetError>;

/// Error types for the collection, transcoding, and curation pipelines
#[derive(Error, Debug)]
pub enum TracksetError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or serialization errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Image format or processing errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Network request failures (timeout, non-2xx status, malformed response)
    #[error("Network error: {0}")]
    Network(String),

    /// A fetched resource did not declare an image content type
    #[error("Content type error: {0}")]
    ContentType(String),

    /// Payload not valid base64 or not a decodable image
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed dataset row missing an expected column
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TracksetError {
    /// Create a new network error with a source error for context
    pub fn network_error<S: Into<String>, E: std::fmt::Display>(msg: S, source: E) -> Self {
        Self::Network(format!("{}: {}", msg.into(), source))
    }

    /// Create a new content type error
    pub fn content_type<S: Into<String>>(msg: S) -> Self {
        Self::ContentType(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new invalid record error
    pub fn invalid_record<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRecord(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create an HTTP status error for a URL
    pub fn http_status(status: reqwest::StatusCode, url: &str) -> Self {
        Self::Network(format!("HTTP error {} for {}", status, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = TracksetError::invalid_config("test config error");
        assert!(matches!(err, TracksetError::InvalidConfig(_)));

        let err = TracksetError::content_type("text/html");
        assert!(matches!(err, TracksetError::ContentType(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TracksetError::invalid_config("missing destination path");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: missing destination path"
        );

        let err = TracksetError::decode("payload is not valid base64");
        assert_eq!(err.to_string(), "Decode error: payload is not valid base64");
    }

    #[test]
    fn test_file_io_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = TracksetError::file_io_error("append rows to", Path::new("tracks.csv"), io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("append rows to"));
        assert!(error_string.contains("tracks.csv"));
    }

    #[test]
    fn test_network_error_context() {
        let err = TracksetError::network_error("Failed to fetch page 3", "connection reset");
        let error_string = err.to_string();
        assert!(error_string.contains("page 3"));
        assert!(error_string.contains("connection reset"));
    }
}
