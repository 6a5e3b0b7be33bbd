//! Object key and public URL derivation.
//!
//! Keys and URLs are always built from one [`ObjectKey`], so the key handed
//! back to a caller is exactly the path embedded in its URL.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use url::Url;

use super::service::UploadResult;

/// Public GCS endpoint that object URLs are built on.
pub const PUBLIC_URL_BASE: &str = "https://storage.googleapis.com";

/// Destination of an object inside a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Key for an uploaded file: `[directory/]{millis}_{filename}`.
    ///
    /// The millisecond timestamp keeps repeated uploads of the same file name
    /// from overwriting each other.
    #[must_use]
    pub fn timestamped(directory: Option<&str>, millis: i64, filename: &str) -> Self {
        Self::named(directory, &format!("{millis}_{filename}"))
    }

    /// Key for a caller-named object: `[directory/]{name}`.
    #[must_use]
    pub fn named(directory: Option<&str>, name: &str) -> Self {
        match directory.filter(|d| !d.is_empty()) {
            Some(dir) => Self(format!("{dir}/{name}")),
            None => Self(name.to_string()),
        }
    }

    /// The key as stored in the bucket.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public URL: `https://storage.googleapis.com/{bucket}/{key}`.
    #[must_use]
    pub fn public_url(&self, bucket: &str) -> String {
        format!("{PUBLIC_URL_BASE}/{bucket}/{}", self.0)
    }

    /// Build the `{key, url}` pair returned by uploads.
    #[must_use]
    pub fn into_upload_result(self, bucket: &str) -> UploadResult {
        let url = self.public_url(bucket);
        UploadResult { key: self.0, url }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

/// Expiry instant embedded in a V4 signed GCS URL.
///
/// Computed from the `X-Goog-Date` and `X-Goog-Expires` query parameters.
/// Returns `None` if the URL is not a V4 signed URL or the expiry does not
/// fit in a `DateTime<Utc>`.
#[must_use]
pub fn presigned_expiry(url: &str) -> Option<DateTime<Utc>> {
    let parsed = Url::parse(url).ok()?;

    let mut signed_at = None;
    let mut expires_secs = None;
    for (name, value) in parsed.query_pairs() {
        match name.as_ref() {
            "X-Goog-Date" => {
                signed_at = NaiveDateTime::parse_from_str(&value, "%Y%m%dT%H%M%SZ").ok();
            }
            "X-Goog-Expires" => expires_secs = value.parse::<i64>().ok(),
            _ => {}
        }
    }

    let ttl = chrono::Duration::try_seconds(expires_secs?)?;
    signed_at?.and_utc().checked_add_signed(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MILLIS: i64 = 1_700_000_000_000;

    #[test]
    fn test_key_with_directory() {
        let key = ObjectKey::timestamped(Some("uploads"), MILLIS, "photo.png");
        assert_eq!(key.as_str(), "uploads/1700000000000_photo.png");
        assert_eq!(
            key.public_url("my-bucket"),
            "https://storage.googleapis.com/my-bucket/uploads/1700000000000_photo.png"
        );
    }

    #[test]
    fn test_key_without_directory() {
        let key = ObjectKey::timestamped(None, MILLIS, "photo.png");
        assert_eq!(key.as_str(), "1700000000000_photo.png");
        assert_eq!(
            key.public_url("my-bucket"),
            "https://storage.googleapis.com/my-bucket/1700000000000_photo.png"
        );
    }

    #[test]
    fn test_named_key_keeps_name_verbatim() {
        assert_eq!(
            ObjectKey::named(Some("exports"), "products.csv").as_str(),
            "exports/products.csv"
        );
        assert_eq!(ObjectKey::named(None, "products.csv").as_str(), "products.csv");
        assert_eq!(ObjectKey::named(Some(""), "products.csv").as_str(), "products.csv");
    }

    #[test]
    fn test_upload_result_from_key() {
        let result = ObjectKey::timestamped(Some("uploads"), MILLIS, "photo.png")
            .into_upload_result("my-bucket");

        assert_eq!(result.key, "uploads/1700000000000_photo.png");
        assert_eq!(
            result.url,
            "https://storage.googleapis.com/my-bucket/uploads/1700000000000_photo.png"
        );
    }

    #[test]
    fn test_presigned_expiry() {
        let url = "https://storage.googleapis.com/my-bucket/a.png\
            ?X-Goog-Algorithm=GOOG4-RSA-SHA256\
            &X-Goog-Credential=files%40shop.iam.gserviceaccount.com%2F20231114%2Fauto%2Fstorage%2Fgoog4_request\
            &X-Goog-Date=20231114T221320Z\
            &X-Goog-Expires=900\
            &X-Goog-SignedHeaders=host\
            &X-Goog-Signature=abcdef";

        let expiry = presigned_expiry(url).expect("should parse expiry");
        assert_eq!(
            expiry,
            Utc.with_ymd_and_hms(2023, 11, 14, 22, 28, 20).unwrap()
        );
    }

    #[test]
    fn test_presigned_expiry_unsigned_url() {
        assert_eq!(
            presigned_expiry("https://storage.googleapis.com/my-bucket/a.png"),
            None
        );
        assert_eq!(presigned_expiry("not a url"), None);
    }

    #[test]
    fn test_presigned_expiry_out_of_range() {
        let base = "https://storage.googleapis.com/my-bucket/a.png?X-Goog-Date=20231114T221320Z";
        for expires in ["9223372036854775807", "-9223372036854775808", "9223372036854775"] {
            let url = format!("{base}&X-Goog-Expires={expires}");
            assert_eq!(presigned_expiry(&url), None, "X-Goog-Expires={expires}");
        }
    }
}
