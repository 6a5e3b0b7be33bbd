//! Core of gcsfile: the file-service contract and its GCS implementation.
//!
//! This crate has no HTTP or host-framework dependencies. Hosts construct a
//! [`storage::GcsFileService`] once and share it as `Arc<dyn FileService>`.

pub mod storage;

pub use storage::{FileService, GcsFileService, StorageConfig, StorageError};
