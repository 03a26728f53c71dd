/// Object storage for uploaded files
///
/// Uploads go through the [`ObjectStore`] trait. In deployments with a
/// bucket it is backed by [`GcsStorageClient`], which PUTs files to Google
/// Cloud Storage through V4 signed URLs. Without one, [`UnconfiguredStore`]
/// refuses every upload.
use crate::config::StorageSettings;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client as HttpClient;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Characters that must be percent-encoded in the path component
const PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const GCS_HOST: &str = "storage.googleapis.com";
const UPLOAD_URL_EXPIRY_SECS: u64 = 300;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file and return its public URL
    async fn upload_file(
        &self,
        local_path: &Path,
        object_name: &str,
        content_type: &str,
    ) -> Result<String>;
}

/// Store used when no bucket is configured
pub struct UnconfiguredStore;

#[async_trait]
impl ObjectStore for UnconfiguredStore {
    async fn upload_file(
        &self,
        _local_path: &Path,
        object_name: &str,
        _content_type: &str,
    ) -> Result<String> {
        tracing::error!(object_name, "Upload attempted but no storage bucket is configured");
        Err(AppError::Internal("Object storage is not configured".to_string()))
    }
}

/// Build the object store for the configured bucket
pub fn build_object_store(settings: &StorageSettings) -> Result<Arc<dyn ObjectStore>> {
    match (&settings.sa_key_path, &settings.bucket_name) {
        (Some(path), Some(bucket)) => {
            let raw_json = std::fs::read_to_string(path).map_err(|e| {
                AppError::Internal(format!(
                    "Failed to read GCS service account JSON at {path}: {e}"
                ))
            })?;
            Ok(Arc::new(GcsStorageClient::from_service_account_json(
                &raw_json, bucket,
            )?))
        }
        _ => {
            tracing::warn!("GCP_SA_KEY_PATH / GCP_BUCKET_NAME not set; uploads are disabled");
            Ok(Arc::new(UnconfiguredStore))
        }
    }
}

// ============================================================================
// Google Cloud Storage
// ============================================================================

#[derive(serde::Deserialize)]
struct ServiceAccount {
    client_email: String,
    private_key: String,
}

/// GCS client signing requests with a service-account key
pub struct GcsStorageClient {
    client_email: String,
    private_key: RsaPrivateKey,
    bucket: String,
    scheme: String,
    host: String,
    http_client: HttpClient,
}

impl GcsStorageClient {
    /// Create a client from service-account JSON (`client_email`, `private_key`)
    pub fn from_service_account_json(raw_json: &str, bucket: &str) -> Result<Self> {
        let sa: ServiceAccount = serde_json::from_str(raw_json)
            .map_err(|e| AppError::Internal(format!("Invalid service account JSON: {e}")))?;

        let private_key = RsaPrivateKey::from_pkcs8_pem(&sa.private_key).map_err(|e| {
            AppError::Internal(format!("Failed to parse service account private key: {e}"))
        })?;

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        tracing::info!(bucket = %bucket, "GCS storage client initialized");

        Ok(Self {
            client_email: sa.client_email,
            private_key,
            bucket: bucket.to_string(),
            scheme: "https".to_string(),
            host: GCS_HOST.to_string(),
            http_client,
        })
    }

    /// Send requests to another endpoint (used against mock servers)
    pub fn with_endpoint(mut self, scheme: &str, host: &str) -> Self {
        self.scheme = scheme.to_string();
        self.host = host.to_string();
        self
    }

    /// Public URL of an object
    pub fn public_url(&self, object_name: &str) -> String {
        format!(
            "https://{GCS_HOST}/{}/{}",
            self.bucket,
            utf8_percent_encode(object_name, PATH_SET)
        )
    }

    /// Generate a V4 signed URL for a given HTTP method
    fn sign_url(&self, method: &str, object_name: &str, expires_in: Duration) -> Result<String> {
        let now = chrono::Utc::now();
        let datestamp = now.format("%Y%m%d").to_string();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();

        let credential_scope = format!("{datestamp}/auto/storage/goog4_request");
        let credential = format!("{}/{}", self.client_email, credential_scope);

        let encoded_object = utf8_percent_encode(object_name.trim_start_matches('/'), PATH_SET);
        let canonical_uri = format!("/{}/{}", self.bucket, encoded_object);

        let canonical_headers = format!("host:{}\n", self.host);
        let signed_headers = "host";

        let mut query_items = [
            ("X-Goog-Algorithm", "GOOG4-RSA-SHA256".to_string()),
            (
                "X-Goog-Credential",
                urlencoding::encode(&credential).into_owned(),
            ),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", expires_in.as_secs().to_string()),
            ("X-Goog-SignedHeaders", signed_headers.to_string()),
        ];
        query_items.sort_by(|a, b| a.0.cmp(b.0));
        let canonical_query = query_items
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\nUNSIGNED-PAYLOAD"
        );
        let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));

        let string_to_sign =
            format!("GOOG4-RSA-SHA256\n{timestamp}\n{credential_scope}\n{canonical_hash}");

        let signing_key = SigningKey::<Sha256>::new(self.private_key.clone());
        let signature = signing_key
            .try_sign(string_to_sign.as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to sign GCS request: {e}")))?;
        let signature_hex = hex::encode(signature.to_bytes());

        Ok(format!(
            "{}://{}{canonical_uri}?{canonical_query}&X-Goog-Signature={signature_hex}",
            self.scheme, self.host
        ))
    }

    async fn put_object(&self, object_name: &str, data: Bytes, content_type: &str) -> Result<()> {
        let signed_url = self.sign_url(
            "PUT",
            object_name,
            Duration::from_secs(UPLOAD_URL_EXPIRY_SECS),
        )?;

        let response = self
            .http_client
            .put(&signed_url)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("GCS upload failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "GCS upload failed with status {status}: {body}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for GcsStorageClient {
    async fn upload_file(
        &self,
        local_path: &Path,
        object_name: &str,
        content_type: &str,
    ) -> Result<String> {
        let data = tokio::fs::read(local_path).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to read file {}: {e}",
                local_path.display()
            ))
        })?;

        self.put_object(object_name, Bytes::from(data), content_type)
            .await?;

        tracing::info!(object_name, bucket = %self.bucket, "Uploaded file to GCS");
        Ok(self.public_url(object_name))
    }
}
