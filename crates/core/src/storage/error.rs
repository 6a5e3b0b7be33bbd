//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Error returned by the storage provider, passed through unchanged.
    #[error(transparent)]
    Provider(#[from] opendal::Error),

    /// Local file access failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Upload or protected upload failed.
    #[error("failed to upload file")]
    UploadFailed {
        /// Destination key of the failed upload.
        key: String,
        /// Underlying failure. Provider and IO errors are stored unwrapped,
        /// so `source()` is the `opendal::Error` or `std::io::Error` itself.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Delete failed.
    #[error("failed to delete file")]
    DeleteFailed {
        /// Key that could not be deleted.
        key: String,
        /// Bucket the key lives in.
        bucket: String,
        /// Underlying provider failure.
        #[source]
        source: opendal::Error,
    },
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wrap a failure as an upload failure for `key`.
    #[must_use]
    pub fn upload_failed(key: impl Into<String>, source: impl Into<StorageError>) -> Self {
        let source: Box<dyn std::error::Error + Send + Sync> = match source.into() {
            Self::Provider(err) => Box::new(err),
            Self::Io(err) => Box::new(err),
            other => Box::new(other),
        };
        Self::UploadFailed {
            key: key.into(),
            source,
        }
    }

    /// Wrap a provider failure as a delete failure for `key` in `bucket`.
    #[must_use]
    pub fn delete_failed(
        key: impl Into<String>,
        bucket: impl Into<String>,
        source: opendal::Error,
    ) -> Self {
        Self::DeleteFailed {
            key: key.into(),
            bucket: bucket.into(),
            source,
        }
    }

    /// Whether this error, or any error it wraps, means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Provider(err) | Self::DeleteFailed { source: err, .. } => {
                err.kind() == opendal::ErrorKind::NotFound
            }
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            Self::UploadFailed { source, .. } => chain_not_found(source.as_ref()),
            Self::Configuration(_) => false,
        }
    }
}

fn chain_not_found(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(storage) = err.downcast_ref::<StorageError>() {
            return storage.is_not_found();
        }
        let provider_missing = err
            .downcast_ref::<opendal::Error>()
            .is_some_and(|e| e.kind() == opendal::ErrorKind::NotFound);
        let local_missing = err
            .downcast_ref::<std::io::Error>()
            .is_some_and(|e| e.kind() == std::io::ErrorKind::NotFound);
        if provider_missing || local_missing {
            return true;
        }
        current = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    fn not_found() -> opendal::Error {
        opendal::Error::new(opendal::ErrorKind::NotFound, "object missing")
    }

    #[test]
    fn test_upload_failed_keeps_cause() {
        let err = StorageError::upload_failed("uploads/1_a.png", not_found());

        assert_eq!(err.to_string(), "failed to upload file");
        let source = err.source().expect("cause should be preserved");
        assert!(source.to_string().contains("object missing"));
    }

    #[test]
    fn test_delete_failed_keeps_cause() {
        let err = StorageError::delete_failed(
            "a.png",
            "my-bucket",
            opendal::Error::new(opendal::ErrorKind::PermissionDenied, "forbidden"),
        );

        assert_eq!(err.to_string(), "failed to delete file");
        assert!(err.source().is_some());
        assert!(!err.is_not_found());
        match err {
            StorageError::DeleteFailed { key, bucket, .. } => {
                assert_eq!(key, "a.png");
                assert_eq!(bucket, "my-bucket");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_passthrough_errors_display_once() {
        let err = StorageError::from(not_found());
        assert_eq!(err.to_string(), not_found().to_string());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read denied");
        let err = StorageError::from(io);
        assert_eq!(err.to_string(), "read denied");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_upload_failed_source_is_the_original_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = StorageError::upload_failed("uploads/1_a.png", io);

        let source = err.source().expect("cause should be preserved");
        let io = source
            .downcast_ref::<std::io::Error>()
            .expect("cause is the io error itself");
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
        assert!(source.source().is_none());

        let err = StorageError::upload_failed("uploads/1_a.png", not_found());
        let source = err.source().expect("cause should be preserved");
        assert!(source.downcast_ref::<opendal::Error>().is_some());
    }

    #[test]
    fn test_is_not_found_walks_chain() {
        assert!(StorageError::from(not_found()).is_not_found());
        assert!(StorageError::upload_failed("k", not_found()).is_not_found());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        assert!(StorageError::upload_failed("k", io).is_not_found());

        assert!(!StorageError::configuration("bucket name is required").is_not_found());
        assert!(
            !StorageError::upload_failed("k", StorageError::configuration("bucket")).is_not_found()
        );
    }
}
