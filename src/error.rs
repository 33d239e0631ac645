//! Error types and handling for BatchScale

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for BatchScale operations
pub type Result<T> = std::result::Result<T, BatchScaleError>;

/// Main error type for BatchScale operations
#[derive(Debug, Error)]
pub enum BatchScaleError {
    /// Filesystem access failed (missing source tree, unwritable destination, ...)
    #[error("I/O error: {source} (path: {path:?})")]
    IoError {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// The source bytes are not a valid or supported image
    #[error("Failed to decode image: {source} (file: {path:?})")]
    DecodeError {
        path: Option<PathBuf>,
        #[source]
        source: image::ImageError,
    },

    /// The codec failed while producing JPEG output
    #[error("Failed to encode JPEG: {source} (file: {path:?})")]
    EncodeError {
        path: Option<PathBuf>,
        #[source]
        source: image::ImageError,
    },

    /// The batch cancellation signal was observed before work started
    #[error("Task canceled before starting (file: {file:?})")]
    Canceled { file: Option<PathBuf> },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerdeError(String),

    /// The wait-for-all mechanism itself faulted
    #[error("Parallel processing error: {message}")]
    ParallelError { message: String },
}

impl BatchScaleError {
    /// Create an I/O error bound to a path
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::IoError {
            path: Some(path.into()),
            source,
        }
    }

    /// Create a decode error bound to a path
    pub fn decode<P: Into<PathBuf>>(path: P, source: image::ImageError) -> Self {
        Self::DecodeError {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an encode error, optionally bound to a path
    pub fn encode(path: Option<PathBuf>, source: image::ImageError) -> Self {
        Self::EncodeError { path, source }
    }

    /// Create a cancellation error for a file
    pub fn canceled<P: Into<PathBuf>>(file: P) -> Self {
        Self::Canceled {
            file: Some(file.into()),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new parallel processing error
    pub fn parallel<S: Into<String>>(message: S) -> Self {
        Self::ParallelError {
            message: message.into(),
        }
    }

    /// Whether this is a cooperative cancellation
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled { .. })
    }

    /// Get the associated file path if available
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Self::IoError { path, .. }
            | Self::DecodeError { path, .. }
            | Self::EncodeError { path, .. }
            | Self::Canceled { file: path } => path.as_deref(),

            _ => None,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::IoError { source, .. } => format!("File system error: {}", source),
            Self::DecodeError { path, .. } => match path {
                Some(path) => format!(
                    "{} is not a readable image. Supported inputs: PNG, JPEG",
                    path.display()
                ),
                None => "Not a readable image. Supported inputs: PNG, JPEG".to_string(),
            },
            Self::EncodeError { source, .. } => format!(
                "JPEG encoding failed: {}. Check that the scale factor yields a non-empty image.",
                source
            ),
            Self::Canceled { .. } => "Skipped because the batch was canceled".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for BatchScaleError {
    fn from(source: std::io::Error) -> Self {
        Self::IoError { path: None, source }
    }
}

impl From<walkdir::Error> for BatchScaleError {
    fn from(err: walkdir::Error) -> Self {
        let path = err.path().map(Path::to_path_buf);
        Self::IoError {
            path,
            source: err.into(),
        }
    }
}

impl From<toml::de::Error> for BatchScaleError {
    fn from(err: toml::de::Error) -> Self {
        Self::SerdeError(format!("TOML parsing error: {}", err))
    }
}

impl From<serde_yaml::Error> for BatchScaleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerdeError(format!("YAML parsing error: {}", err))
    }
}

/// Error context extension for adding file path information
pub trait ErrorContext<T> {
    /// Add file context to an error that does not carry one yet
    fn with_file_context(self, file: &Path) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<BatchScaleError>,
{
    fn with_file_context(self, file: &Path) -> Result<T> {
        self.map_err(|e| {
            let mut error = e.into();

            match error {
                BatchScaleError::IoError { path: ref mut p, .. }
                | BatchScaleError::DecodeError { path: ref mut p, .. }
                | BatchScaleError::EncodeError { path: ref mut p, .. }
                | BatchScaleError::Canceled { file: ref mut p } => {
                    if p.is_none() {
                        *p = Some(file.to_path_buf());
                    }
                }
                _ => {}
            }

            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "gone")
    }

    #[test]
    fn test_error_creation() {
        let err = BatchScaleError::config("test message");
        assert!(matches!(err, BatchScaleError::ConfigError { .. }));
        assert_eq!(err.file_path(), None);
    }

    #[test]
    fn test_file_path_of_constructed_errors() {
        assert_eq!(
            BatchScaleError::canceled("a.png").file_path(),
            Some(Path::new("a.png"))
        );
        assert_eq!(
            BatchScaleError::io("b.png", not_found()).file_path(),
            Some(Path::new("b.png"))
        );
        assert_eq!(BatchScaleError::parallel("worker panicked").file_path(), None);
    }

    #[test]
    fn test_file_context_fills_missing_path() {
        let result: std::result::Result<(), std::io::Error> = Err(not_found());
        let err = result.with_file_context(Path::new("photo.png")).unwrap_err();

        assert_eq!(err.file_path(), Some(Path::new("photo.png")));
    }

    #[test]
    fn test_file_context_keeps_existing_path() {
        let result: Result<()> = Err(BatchScaleError::io("first.png", not_found()));
        let err = result.with_file_context(Path::new("second.png")).unwrap_err();

        assert_eq!(err.file_path(), Some(Path::new("first.png")));
    }

    #[test]
    fn test_user_messages() {
        let err = BatchScaleError::canceled("a.png");
        assert!(err.is_canceled());
        assert!(err.user_message().contains("canceled"));

        let err = BatchScaleError::decode(
            "broken.png",
            image::ImageError::IoError(not_found()),
        );
        let msg = err.user_message();
        assert!(msg.contains("broken.png"));
        assert!(msg.contains("PNG, JPEG"));
    }
}
