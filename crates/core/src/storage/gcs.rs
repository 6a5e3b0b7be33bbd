//! Google Cloud Storage file service using Apache OpenDAL.

use async_trait::async_trait;
use chrono::Utc;
use futures::{StreamExt, TryFutureExt, TryStreamExt};
use opendal::{Operator, services};
use tracing::{debug, error, info};

use super::config::StorageConfig;
use super::error::StorageError;
use super::key::ObjectKey;
use super::service::{
    DeleteRequest, DownloadStream, FileService, GetFileRequest, PRESIGNED_URL_TTL, UploadFile,
    UploadResult, UploadStream, UploadStreamRequest,
};

/// Predefined ACL granting anonymous read access to newly written objects.
const PUBLIC_READ_ACL: &str = "publicRead";

/// File service backed by a single GCS bucket.
///
/// Holds two operators over the same bucket: `public_operator` writes objects
/// with the `publicRead` ACL, `operator` handles everything else.
pub struct GcsFileService {
    operator: Operator,
    public_operator: Operator,
    config: StorageConfig,
}

impl GcsFileService {
    /// Create a new GCS file service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or the GCS client
    /// cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        config.validate()?;

        let credential = config.credentials.encoded()?;
        let operator = Self::create_operator(&config.bucket, &credential, None)?;
        let public_operator =
            Self::create_operator(&config.bucket, &credential, Some(PUBLIC_READ_ACL))?;

        Ok(Self::assemble(config, operator, public_operator))
    }

    /// Create a file service over pre-built operators.
    ///
    /// `public_operator` is used for `upload` and `upload_protected`; it should
    /// make written objects publicly readable. Any OpenDAL backend works,
    /// which is how the service runs against the in-memory backend in tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete.
    pub fn with_operators(
        config: StorageConfig,
        operator: Operator,
        public_operator: Operator,
    ) -> Result<Self, StorageError> {
        config.validate()?;
        Ok(Self::assemble(config, operator, public_operator))
    }

    fn assemble(config: StorageConfig, operator: Operator, public_operator: Operator) -> Self {
        info!(
            bucket = %config.bucket,
            directory = ?config.directory,
            "File service initialized"
        );
        Self {
            operator,
            public_operator,
            config,
        }
    }

    /// Create OpenDAL operator for the bucket.
    fn create_operator(
        bucket: &str,
        credential: &str,
        predefined_acl: Option<&str>,
    ) -> Result<Operator, StorageError> {
        let mut builder = services::Gcs::default()
            .bucket(bucket)
            .credential(credential)
            .disable_vm_metadata()
            .disable_config_load();
        if let Some(acl) = predefined_acl {
            builder = builder.predefined_acl(acl);
        }

        Ok(Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish())
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// Get the directory prefix, if any.
    #[must_use]
    pub fn directory(&self) -> Option<&str> {
        self.config.directory.as_deref()
    }

    /// Get the configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Backends without content-type support reject the option outright.
    fn supports_content_type(operator: &Operator) -> bool {
        operator.info().full_capability().write_with_content_type
    }

    /// Upload a local file under a fresh key through the public operator.
    async fn upload_public(&self, file: &UploadFile) -> Result<UploadResult, StorageError> {
        let key = ObjectKey::timestamped(
            self.directory(),
            Utc::now().timestamp_millis(),
            &file.original_name,
        );

        match self.write_local_file(&key, file).await {
            Ok(()) => {
                info!(bucket = %self.config.bucket, key = %key, "File uploaded");
                Ok(key.into_upload_result(&self.config.bucket))
            }
            Err(err) => {
                error!(
                    bucket = %self.config.bucket,
                    key = %key,
                    path = %file.path.display(),
                    error = %err,
                    "Error uploading file to GCS"
                );
                Err(StorageError::upload_failed(key, err))
            }
        }
    }

    /// Single-request upload, matching a non-resumable GCS upload.
    async fn write_local_file(&self, key: &ObjectKey, file: &UploadFile) -> Result<(), StorageError> {
        let content = tokio::fs::read(&file.path).await?;

        let mut write = self.public_operator.write_with(key.as_str(), content);
        if Self::supports_content_type(&self.public_operator) {
            write = write.content_type(&file.mime_type);
        }
        write.await?;

        Ok(())
    }
}

#[async_trait]
impl FileService for GcsFileService {
    async fn upload(&self, file: &UploadFile) -> Result<UploadResult, StorageError> {
        self.upload_public(file).await
    }

    /// Identical to [`FileService::upload`]: the object is publicly readable.
    async fn upload_protected(&self, file: &UploadFile) -> Result<UploadResult, StorageError> {
        self.upload_public(file).await
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<(), StorageError> {
        let key = &request.file_key;

        // OpenDAL reports a missing object as deleted; GCS rejects it.
        let deleted = match self.operator.stat(key).await {
            Ok(_) => self.operator.delete(key).await,
            Err(err) => Err(err),
        };

        match deleted {
            Ok(()) => {
                info!(bucket = %self.config.bucket, key = %key, "File deleted");
                Ok(())
            }
            Err(err) => {
                error!(
                    bucket = %self.config.bucket,
                    key = %key,
                    error = %err,
                    "Error deleting file from GCS"
                );
                Err(StorageError::delete_failed(key, &self.config.bucket, err))
            }
        }
    }

    async fn get_upload_stream_descriptor(
        &self,
        request: &UploadStreamRequest,
    ) -> Result<UploadStream, StorageError> {
        let key = ObjectKey::named(self.directory(), &request.name);

        let mut writer = self.operator.writer_with(key.as_str());
        if Self::supports_content_type(&self.operator) {
            writer = writer.content_type(&request.ext);
        }
        let writer = writer.await?;

        debug!(bucket = %self.config.bucket, key = %key, "Upload stream opened");

        let url = key.public_url(&self.config.bucket);
        Ok(UploadStream {
            writer: Box::pin(writer.into_futures_async_write()),
            key: key.into(),
            url,
        })
    }

    async fn get_download_stream(
        &self,
        request: &GetFileRequest,
    ) -> Result<DownloadStream, StorageError> {
        let operator = self.operator.clone();
        let key = request.file_key.clone();

        debug!(bucket = %self.config.bucket, key = %key, "Download stream requested");

        // Nothing is sent until the stream is first polled.
        let open = async move {
            let reader = operator.reader(&key).await?;
            let bytes = reader.into_bytes_stream(..).await?;
            Ok::<_, StorageError>(bytes.map_err(StorageError::from))
        };

        Ok(open.try_flatten_stream().boxed())
    }

    async fn get_presigned_download_url(
        &self,
        request: &GetFileRequest,
    ) -> Result<String, StorageError> {
        let presigned = self
            .operator
            .presign_read(&request.file_key, PRESIGNED_URL_TTL)
            .await?;

        debug!(
            bucket = %self.config.bucket,
            key = %request.file_key,
            ttl_secs = PRESIGNED_URL_TTL.as_secs(),
            "Presigned download URL issued"
        );

        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
#[path = "gcs_tests.rs"]
mod tests;
