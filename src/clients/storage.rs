use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct StoredObject {
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Object storage over named buckets. Private buckets are read through
/// time-limited signed URLs.
#[derive(Debug, Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StorageClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }

    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.object_url(bucket, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    pub async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, AppError> {
        let response = self
            .http
            .get(self.object_url(bucket, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;
        let response = self.check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<StoredObject>, AppError> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, bucket);
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "prefix": prefix }))
            .send()
            .await?;
        let response = self.check(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| AppError::Storage(format!("list {}: {}", bucket, e)))
    }

    pub async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), AppError> {
        let url = format!("{}/storage/v1/object/{}", self.base_url, bucket);
        let response = self
            .http
            .delete(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;
        self.check(response).await?;
        Ok(())
    }

    /// Signed URL for a private read, valid for `expires_in_secs`.
    pub async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        expires_in_secs: u64,
    ) -> Result<String, AppError> {
        let url = format!("{}/storage/v1/object/sign/{}/{}", self.base_url, bucket, path);
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "expiresIn": expires_in_secs }))
            .send()
            .await?;
        let response = self.check(response).await?;
        let body = response.text().await?;
        let parsed: SignedUrlResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Storage(format!("sign {}/{}: {}", bucket, path, e)))?;
        Ok(format!("{}{}", self.base_url, parsed.signed_url))
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Storage(format!("status {}: {}", status, message)));
        }
        Ok(response)
    }
}
