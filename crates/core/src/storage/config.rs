//! Storage configuration types.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use gcsfile_shared::GcpConfig;
use serde::Serialize;

use super::error::StorageError;

/// OAuth token endpoint recorded in the service-account document.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service-account credentials used to authenticate against GCS.
#[derive(Clone)]
pub struct GcsCredentials {
    /// GCP project identifier.
    pub project_id: String,
    /// Service-account email.
    pub client_email: String,
    /// PEM private key with real newlines.
    pub private_key: String,
}

#[derive(Serialize)]
struct ServiceAccountKey<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    project_id: &'a str,
    client_email: &'a str,
    private_key: &'a str,
    token_uri: &'static str,
}

impl GcsCredentials {
    /// Create credentials, turning literal `\n` escapes in the key into newlines.
    ///
    /// Keys pasted into a single environment variable usually arrive with
    /// escaped newlines, which PEM parsers reject.
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        client_email: impl Into<String>,
        private_key: &str,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            client_email: client_email.into(),
            private_key: private_key.replace("\\n", "\n"),
        }
    }

    /// Render the service-account JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_service_account_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(&ServiceAccountKey {
            kind: "service_account",
            project_id: &self.project_id,
            client_email: &self.client_email,
            private_key: &self.private_key,
            token_uri: TOKEN_URI,
        })
        .map_err(|e| StorageError::configuration(format!("invalid credentials: {e}")))
    }

    /// Base64-encoded service-account document, as the GCS client expects it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encoded(&self) -> Result<String, StorageError> {
        Ok(STANDARD.encode(self.to_service_account_json()?))
    }
}

impl fmt::Debug for GcsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsCredentials")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket holding every object written by the service.
    pub bucket: String,
    /// Optional directory prefix, without trailing slash.
    pub directory: Option<String>,
    /// Provider credentials.
    pub credentials: GcsCredentials,
}

impl StorageConfig {
    /// Create a storage config with no directory prefix.
    #[must_use]
    pub fn new(bucket: impl Into<String>, credentials: GcsCredentials) -> Self {
        Self {
            bucket: bucket.into(),
            directory: None,
            credentials,
        }
    }

    /// Set the directory prefix.
    ///
    /// Blank values clear the prefix; trailing slashes are dropped.
    #[must_use]
    pub fn with_directory(mut self, directory: Option<impl AsRef<str>>) -> Self {
        self.directory = directory
            .map(|d| d.as_ref().trim().trim_end_matches('/').to_string())
            .filter(|d| !d.is_empty());
        self
    }

    /// Check that every required value is present.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first missing value.
    pub fn validate(&self) -> Result<(), StorageError> {
        let required = [
            ("bucket name", &self.bucket),
            ("project id", &self.credentials.project_id),
            ("client email", &self.credentials.client_email),
            ("private key", &self.credentials.private_key),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(StorageError::configuration(format!("{name} is required")));
            }
        }

        Ok(())
    }
}

impl From<&GcpConfig> for StorageConfig {
    fn from(config: &GcpConfig) -> Self {
        let credentials = GcsCredentials::new(
            config.project_id.clone(),
            config.client_email.clone(),
            &config.private_key,
        );
        Self::new(config.bucket_name.clone(), credentials).with_directory(config.directory.as_ref())
    }
}
