//! File-service contract shared by every storage backend.

use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::io::AsyncWrite;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Validity of presigned download URLs.
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// A local file to upload, typically a temporary file written by the
/// upstream multipart parser. The service reads it but never removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFile {
    /// Path of the local file.
    pub path: PathBuf,
    /// File name as sent by the client.
    pub original_name: String,
    /// MIME type, stored as the object's content type.
    pub mime_type: String,
}

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Storage key.
    pub key: String,
    /// Public URL of the object.
    pub url: String,
}

/// Request to delete an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Key of the object to delete.
    pub file_key: String,
}

/// Request to open an upload stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStreamRequest {
    /// Object name, used verbatim under the directory prefix.
    pub name: String,
    /// MIME type of the content.
    pub ext: String,
}

/// Request naming an existing object, for downloads and presigned URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetFileRequest {
    /// Key of the object.
    pub file_key: String,
}

/// Writable byte sink targeting one object.
pub type UploadWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Readable byte source for one object.
pub type DownloadStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Open upload stream returned by [`FileService::get_upload_stream_descriptor`].
///
/// Bytes written to `writer` land in the object at `key` once the writer is
/// closed. Transfer errors surface from the writer's own `write`/`close`.
pub struct UploadStream {
    /// Sink for the object's content.
    pub writer: UploadWriter,
    /// Storage key.
    pub key: String,
    /// Public URL of the object.
    pub url: String,
}

impl fmt::Debug for UploadStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStream")
            .field("key", &self.key)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

/// File operations the host application requires from a storage backend.
#[async_trait]
pub trait FileService: Send + Sync {
    /// Upload a local file under a fresh timestamped key and make it public.
    async fn upload(&self, file: &UploadFile) -> Result<UploadResult, StorageError>;

    /// Upload a local file for restricted access.
    async fn upload_protected(&self, file: &UploadFile) -> Result<UploadResult, StorageError>;

    /// Delete an object.
    async fn delete(&self, request: &DeleteRequest) -> Result<(), StorageError>;

    /// Open a writable sink for a new object without waiting for the transfer.
    async fn get_upload_stream_descriptor(
        &self,
        request: &UploadStreamRequest,
    ) -> Result<UploadStream, StorageError>;

    /// Open a readable stream over an object.
    ///
    /// Implementations must not check existence up front; a missing object
    /// is reported by the stream itself.
    async fn get_download_stream(
        &self,
        request: &GetFileRequest,
    ) -> Result<DownloadStream, StorageError>;

    /// Signed read-only URL valid for [`PRESIGNED_URL_TTL`].
    async fn get_presigned_download_url(
        &self,
        request: &GetFileRequest,
    ) -> Result<String, StorageError>;
}
