use async_trait::async_trait;
use reqwest::multipart;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::{config::MediaConfig, GetField};

use super::{MediaCategory, MediaError, MediaStore, UploadedMedia};

/// Cloudinary-style REST client with signed requests.
#[derive(Clone)]
pub struct CloudMediaStore {
    http: reqwest::Client,
    config: MediaConfig,
}

impl CloudMediaStore {
    pub fn new(http: reqwest::Client, config: MediaConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, category: MediaCategory, op: &str) -> String {
        format!(
            "{}/v1_1/{}/{}/{op}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            category.as_str(),
        )
    }
}

/// Signs request parameters: `k=v` pairs sorted by key, joined with `&`,
/// secret appended, SHA-256, hex.
pub(crate) fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut params = params.to_vec();
    params.sort_by_key(|(key, _)| *key);
    let joined = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{secret}").as_bytes()))
}

fn malformed(err: anyhow::Error) -> MediaError {
    MediaError::Malformed(format!("{err:#}"))
}

#[async_trait]
impl MediaStore for CloudMediaStore {
    async fn upload(&self, bytes: Vec<u8>, category: MediaCategory) -> Result<UploadedMedia, MediaError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = sign(&[("timestamp", timestamp.as_str())], &self.config.api_secret);

        let form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name("upload"))
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let body: serde_json::Value = self.http
            .post(self.endpoint(category, "upload"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(UploadedMedia {
            public_id: body.get_str_field("public_id").map_err(malformed)?,
            url: body.get_str_field("secure_url").map_err(malformed)?,
        })
    }

    async fn destroy(&self, public_id: &str, category: MediaCategory) -> Result<(), MediaError> {
        let timestamp = OffsetDateTime::now_utc().unix_timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let body: serde_json::Value = self.http
            .post(self.endpoint(category, "destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let result = body.get_str_field("result").map_err(malformed)?;
        match result.as_str() {
            "ok" | "not found" => Ok(()),
            _ => Err(MediaError::Rejected { public_id: public_id.to_owned(), result }),
        }
    }
}
