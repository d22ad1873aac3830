use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;

/// Response envelope every serverless function uses. `error` set means the
/// call failed even when the transport returned 200.
#[derive(Debug, Deserialize)]
struct FunctionEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Invokes named serverless functions with a JSON body. The contract is
/// "send JSON, receive `{data, error}`".
#[derive(Debug, Clone)]
pub struct FunctionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FunctionsClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn invoke(&self, name: &str, body: &Value) -> Result<Value, AppError> {
        let url = format!("{}/functions/v1/{}", self.base_url, name);
        // Request id lets the function side deduplicate a resent invocation.
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Request-Id", Uuid::new_v4().to_string())
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Function {
                name: name.to_string(),
                message: format!("status {}: {}", status, text),
            });
        }
        let envelope: FunctionEnvelope = serde_json::from_str(&text)?;
        if let Some(message) = envelope.error {
            return Err(AppError::Function {
                name: name.to_string(),
                message,
            });
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// Sends the admin-invitation function a new admin's details.
    pub async fn invite_admin(
        &self,
        organization_id: &str,
        email: &str,
        branch_id: &str,
    ) -> Result<Value, AppError> {
        self.invoke(
            "invite-admin",
            &serde_json::json!({
                "organization_id": organization_id,
                "email": email,
                "branch_id": branch_id,
            }),
        )
        .await
    }

    /// Notifies branch staff that a document landed in their bucket.
    pub async fn notify_document_upload(
        &self,
        organization_id: &str,
        branch_id: &str,
        document_path: &str,
    ) -> Result<Value, AppError> {
        self.invoke(
            "document-upload-notification",
            &serde_json::json!({
                "organization_id": organization_id,
                "branch_id": branch_id,
                "path": document_path,
            }),
        )
        .await
    }
}
