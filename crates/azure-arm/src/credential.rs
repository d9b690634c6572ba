use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{Error, Result};

/// OAuth2 scope for the Resource Manager audience.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Cached tokens are refreshed this long before they expire.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Bearer token for the management API.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn expires_within(&self, margin: TimeDelta) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Source of bearer tokens for [`crate::AzureClient`].
#[async_trait]
pub trait TokenCredential: Send + Sync + 'static {
    async fn token(&self) -> Result<AccessToken>;
}

/// A token acquired out of band, e.g. `az account get-access-token`.
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken {
                token: token.into(),
                expires_at: DateTime::<Utc>::MAX_UTC,
            },
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn token(&self) -> Result<AccessToken> {
        Ok(self.token.clone())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Service principal login via the OAuth2 client-credentials grant.
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    http: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl ClientSecretCredential {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.into(),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    async fn request_token(&self) -> Result<AccessToken> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        );

        let resp = self
            .http
            .post(url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Credential(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let body: TokenResponse = resp.json().await?;
        Ok(AccessToken {
            token: body.access_token,
            expires_at: Utc::now() + TimeDelta::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn token(&self) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(TimeDelta::minutes(REFRESH_MARGIN_MINUTES)) {
                return Ok(token.clone());
            }
        }

        let fresh = self.request_token().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}
