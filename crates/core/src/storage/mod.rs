//! File storage for the host application, backed by Google Cloud Storage.
//!
//! [`FileService`] is the contract the host codes against; [`GcsFileService`]
//! implements it on top of Apache OpenDAL.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         FileService                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │ upload / upload_protected  -> public_operator.write_with(key)    │
//! │ delete                     -> operator.delete(key)               │
//! │ get_upload_stream_descriptor -> operator.writer_with(key)        │
//! │ get_download_stream        -> operator.reader(key) (lazy)        │
//! │ get_presigned_download_url -> operator.presign_read(key, 15min)  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are `[directory/]{millis}_{filename}` and public URLs are
//! `https://storage.googleapis.com/{bucket}/{key}`, see [`ObjectKey`].

mod config;
mod error;
mod gcs;
mod key;
mod service;

pub use config::{GcsCredentials, StorageConfig};
pub use error::StorageError;
pub use gcs::GcsFileService;
pub use key::{ObjectKey, PUBLIC_URL_BASE, presigned_expiry};
pub use service::{
    DeleteRequest, DownloadStream, FileService, GetFileRequest, PRESIGNED_URL_TTL, UploadFile,
    UploadResult, UploadStream, UploadStreamRequest, UploadWriter,
};
