use async_trait::async_trait;
use serde::Serialize;

use crate::{config::IdentityConfig, GetField};

use super::{IdentityError, IdentityService};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountRequest<'a> {
    local_id: &'a str,
}

/// Identity Toolkit admin client.
#[derive(Clone)]
pub struct FirebaseIdentity {
    http: reqwest::Client,
    delete_url: String,
    admin_token: String,
}

impl FirebaseIdentity {
    pub fn new(http: reqwest::Client, config: &IdentityConfig) -> Self {
        Self {
            http,
            delete_url: format!(
                "{}/v1/projects/{}/accounts:delete",
                config.base_url.trim_end_matches('/'),
                config.project_id,
            ),
            admin_token: config.admin_token.clone(),
        }
    }
}

/// Maps an Identity Toolkit error body onto `IdentityError`.
pub(crate) fn classify_error(uid: &str, body: &serde_json::Value) -> IdentityError {
    let message = body
        .get_obj_field("error")
        .and_then(|error| error.get_str_field("message"));

    match message {
        Ok(message) if message.starts_with("USER_NOT_FOUND") => IdentityError::NotFound(uid.to_owned()),
        Ok(message) => IdentityError::Other(message),
        Err(_) => IdentityError::Other(body.to_string()),
    }
}

#[async_trait]
impl IdentityService for FirebaseIdentity {
    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        let response = self.http
            .post(&self.delete_url)
            .bearer_auth(&self.admin_token)
            .json(&DeleteAccountRequest { local_id: uid })
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| serde_json::json!({ "error": { "message": status.to_string() } }));
        Err(classify_error(uid, &body))
    }
}
