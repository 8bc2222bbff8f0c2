//! Tailscale REST client
//!
//! Thin wrapper over the v2 API with token basic-auth. ACL writes carry
//! the ETag from the matching read so concurrent admin edits fail with a
//! conflict instead of being clobbered.

use serde::Deserialize;

use crate::acl::{AclPolicy, AclResponse};
use crate::authkey::{AuthKeyRequest, AuthKeyResponse};
use crate::error::{Result, TailscaleError};

const DEFAULT_BASE_URL: &str = "https://api.tailscale.com/api/v2";

pub struct Client {
    http: reqwest::Client,
    api_token: String,
    tailnet: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error: String,
}

impl Client {
    pub fn new(api_token: impl Into<String>, tailnet: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(TailscaleError::MissingToken);
        }
        let tailnet = tailnet.into().trim().to_string();
        if tailnet.is_empty() {
            return Err(TailscaleError::MissingTailnet);
        }

        Ok(Self {
            http: reqwest::Client::new(),
            api_token,
            tailnet,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn tailnet(&self) -> &str {
        &self.tailnet
    }

    /// The principal to use as a tag owner. The API has no whoami
    /// endpoint, so the admin autogroup is the safe choice.
    pub fn current_user(&self) -> &'static str {
        "autogroup:admin"
    }

    fn url(&self, path: &str) -> String {
        format!("{}/tailnet/{}{}", self.base_url, self.tailnet, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .map(|parsed| {
                if parsed.message.is_empty() {
                    parsed.error
                } else {
                    parsed.message
                }
            })
            .filter(|message| !message.is_empty())
            .unwrap_or(body);

        Err(TailscaleError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch the ACL policy with its ETag.
    pub async fn get_acl(&self) -> Result<AclResponse> {
        let response = self
            .http
            .get(self.url("/acl"))
            .basic_auth(&self.api_token, Some(""))
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = Self::check(response).await?;

        let etag = response
            .headers()
            .get("etag")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let policy: AclPolicy = response.json().await?;
        Ok(AclResponse { policy, etag })
    }

    /// Write the ACL policy back. Fails with a 412 conflict if the policy
    /// changed since `etag` was fetched.
    pub async fn update_acl(&self, policy: &AclPolicy, etag: &str) -> Result<()> {
        let mut request = self
            .http
            .post(self.url("/acl"))
            .basic_auth(&self.api_token, Some(""))
            .json(policy);

        if !etag.is_empty() {
            request = request.header("If-Match", etag);
        }

        Self::check(request.send().await?).await?;
        tracing::debug!(tailnet = %self.tailnet, "ACL updated");
        Ok(())
    }

    /// Validate a policy without applying it. A valid policy returns an
    /// empty object; anything else carries the validation errors.
    pub async fn validate_acl(&self, policy: &AclPolicy) -> Result<()> {
        let response = self
            .http
            .post(self.url("/acl/validate"))
            .basic_auth(&self.api_token, Some(""))
            .json(policy)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let result: serde_json::Value = response.json().await?;
        match result.as_object() {
            Some(object) if object.is_empty() => Ok(()),
            _ => Err(TailscaleError::AclValidation(result.to_string())),
        }
    }

    pub async fn create_auth_key(&self, request: &AuthKeyRequest) -> Result<AuthKeyResponse> {
        let response = self
            .http
            .post(self.url("/keys"))
            .basic_auth(&self.api_token, Some(""))
            .json(request)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}
