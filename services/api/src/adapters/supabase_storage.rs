//! services/api/src/adapters/supabase_storage.rs
//!
//! Implements the `ObjectStorage` port on top of the Supabase Storage REST API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use study_assistant_core::ports::{ObjectStorage, PortError, PortResult};
use tracing::info;
use uuid::Uuid;

/// Uploads files to one public Supabase Storage bucket.
#[derive(Clone)]
pub struct SupabaseStorageAdapter {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStorageAdapter {
    pub fn new(client: Client, base_url: String, api_key: String, bucket: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            bucket,
        }
    }

    /// The public retrieval URL of an object in the bucket.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

/// Builds the user-scoped object path: `<user>/<millis>-<file name>`.
pub fn object_path(user_id: Uuid, file_name: &str, millis: i64) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    };
    format!("{}/{}-{}", user_id, millis, cleaned)
}

#[async_trait]
impl ObjectStorage for SupabaseStorageAdapter {
    async fn upload(
        &self,
        user_id: Uuid,
        access_token: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> PortResult<String> {
        let path = object_path(user_id, file_name, Utc::now().timestamp_millis());
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("apikey", &self.api_key)
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Storage upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Storage upload returned {}: {}",
                status, body
            )));
        }

        info!(%path, bucket = %self.bucket, "Stored upload");
        Ok(self.public_url(&path))
    }
}
