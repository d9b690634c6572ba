//! Typed Rust client for the Azure Resource Manager REST API.
//!
//! Covers the subset needed to stand up a single VM: resource groups,
//! virtual networks, network security groups, subnets, public IP addresses,
//! network interfaces and virtual machines (create-or-update only).
//!
//! Every create-or-update waits for the long-running operation behind it to
//! reach a terminal state before returning the final resource.

mod credential;
mod types;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

pub use credential::*;
pub use types::*;

pub const DEFAULT_BASE_URL: &str = "https://management.azure.com";

pub const NETWORK_API_VERSION: &str = "2023-09-01";
pub const COMPUTE_API_VERSION: &str = "2024-03-01";
pub const RESOURCES_API_VERSION: &str = "2021-04-01";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("azure api request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("azure api {endpoint} returned {status}: {body}")]
    Api {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("azure operation {endpoint} ended {status}: {message}")]
    OperationFailed {
        endpoint: &'static str,
        status: String,
        message: String,
    },

    #[error("azure credential error: {0}")]
    Credential(String),

    #[error("azure api {endpoint} returned an invalid body: {reason}")]
    InvalidResponse {
        endpoint: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Client for the Azure Resource Manager REST API, scoped to one subscription.
#[derive(Clone)]
pub struct AzureClient {
    subscription_id: String,
    credential: Arc<dyn TokenCredential>,
    base_url: String,
    poll_interval: Duration,
    http: reqwest::Client,
}

impl AzureClient {
    pub fn new(
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            subscription_id: subscription_id.into(),
            credential,
            base_url: DEFAULT_BASE_URL.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Delay between long-running-operation polls when the service sends no
    /// `Retry-After`.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/subscriptions/{}{path}",
            self.base_url, self.subscription_id
        )
    }

    fn network_url(&self, resource_group: &str, path: &str) -> String {
        self.url(&format!(
            "/resourceGroups/{resource_group}/providers/Microsoft.Network{path}"
        ))
    }

    fn compute_url(&self, resource_group: &str, path: &str) -> String {
        self.url(&format!(
            "/resourceGroups/{resource_group}/providers/Microsoft.Compute{path}"
        ))
    }

    async fn auth(&self) -> Result<String> {
        let token = self.credential.token().await?;
        Ok(format!("Bearer {}", token.token))
    }

    async fn check(resp: reqwest::Response, endpoint: &'static str) -> Result<reqwest::Response> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                endpoint,
                status,
                body,
            });
        }
        Ok(resp)
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        endpoint: &'static str,
    ) -> Result<reqwest::Response> {
        let resp = builder
            .header("Authorization", self.auth().await?)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string())
            .send()
            .await?;

        Self::check(resp, endpoint).await
    }

    fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
        resp.headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Read a response body as JSON, treating an empty body as `null`.
    async fn body_value(resp: reqwest::Response, endpoint: &'static str) -> Result<Value> {
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        })
    }

    /// `GET` a resource, returning its body and any `Retry-After` hint.
    async fn get_value(
        &self,
        endpoint: &'static str,
        url: &str,
        api_version: &'static str,
    ) -> Result<(Value, Option<Duration>)> {
        let resp = self
            .send(
                self.http.get(url).query(&[("api-version", api_version)]),
                endpoint,
            )
            .await?;
        let retry_after = Self::retry_after(&resp);
        Ok((Self::body_value(resp, endpoint).await?, retry_after))
    }

    /// Poll an `Azure-AsyncOperation` URL until it reports a terminal status.
    async fn wait_for_operation(
        &self,
        endpoint: &'static str,
        operation_url: &str,
        mut delay: Option<Duration>,
    ) -> Result<()> {
        loop {
            tokio::time::sleep(delay.unwrap_or(self.poll_interval)).await;

            let resp = self.send(self.http.get(operation_url), endpoint).await?;
            delay = Self::retry_after(&resp);
            let op: AsyncOperationStatus =
                serde_json::from_value(Self::body_value(resp, endpoint).await?).map_err(|e| {
                    Error::InvalidResponse {
                        endpoint,
                        reason: e.to_string(),
                    }
                })?;

            match op.status.as_str() {
                "Succeeded" => return Ok(()),
                terminal @ ("Failed" | "Canceled") => {
                    let message = op
                        .error
                        .clone()
                        .and_then(|e| e.message.or(e.code))
                        .unwrap_or_default();
                    return Err(Error::OperationFailed {
                        endpoint,
                        status: terminal.to_string(),
                        message,
                    });
                }
                other => debug!(endpoint, status = other, "azure: operation in progress"),
            }
        }
    }

    /// `PUT` a resource and wait for it to finish provisioning.
    async fn create_or_update<B, T>(
        &self,
        endpoint: &'static str,
        url: String,
        api_version: &'static str,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .send(
                self.http
                    .put(&url)
                    .query(&[("api-version", api_version)])
                    .json(body),
                endpoint,
            )
            .await?;

        let operation_url = resp
            .headers()
            .get("azure-asyncoperation")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let mut retry_after = Self::retry_after(&resp);
        let mut value = Self::body_value(resp, endpoint).await?;

        if let Some(operation_url) = operation_url {
            self.wait_for_operation(endpoint, &operation_url, retry_after)
                .await?;
            (value, retry_after) = self.get_value(endpoint, &url, api_version).await?;
        } else if value.is_null() {
            (value, retry_after) = self.get_value(endpoint, &url, api_version).await?;
        }

        loop {
            let state = provisioning_state(&value).map(str::to_owned);
            match state.as_deref() {
                None | Some("Succeeded") => break,
                Some(terminal @ ("Failed" | "Canceled")) => {
                    return Err(Error::OperationFailed {
                        endpoint,
                        status: terminal.to_string(),
                        message: error_message(&value),
                    });
                }
                Some(other) => {
                    debug!(endpoint, state = other, "azure: waiting for provisioning state");
                    tokio::time::sleep(retry_after.unwrap_or(self.poll_interval)).await;
                    (value, retry_after) = self.get_value(endpoint, &url, api_version).await?;
                }
            }
        }

        serde_json::from_value(value).map_err(|e| Error::InvalidResponse {
            endpoint,
            reason: e.to_string(),
        })
    }

    // ── Resource groups ──────────────────────────────────────────────

    pub async fn create_or_update_resource_group(
        &self,
        name: &str,
        req: &ResourceGroup,
    ) -> Result<ResourceGroup> {
        self.create_or_update(
            "create or update resource group",
            self.url(&format!("/resourcegroups/{name}")),
            RESOURCES_API_VERSION,
            req,
        )
        .await
    }

    // ── Network ──────────────────────────────────────────────────────

    pub async fn create_or_update_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        req: &VirtualNetwork,
    ) -> Result<VirtualNetwork> {
        self.create_or_update(
            "create or update virtual network",
            self.network_url(resource_group, &format!("/virtualNetworks/{name}")),
            NETWORK_API_VERSION,
            req,
        )
        .await
    }

    pub async fn create_or_update_network_security_group(
        &self,
        resource_group: &str,
        name: &str,
        req: &NetworkSecurityGroup,
    ) -> Result<NetworkSecurityGroup> {
        self.create_or_update(
            "create or update network security group",
            self.network_url(resource_group, &format!("/networkSecurityGroups/{name}")),
            NETWORK_API_VERSION,
            req,
        )
        .await
    }

    pub async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        virtual_network: &str,
        name: &str,
        req: &Subnet,
    ) -> Result<Subnet> {
        self.create_or_update(
            "create or update subnet",
            self.network_url(
                resource_group,
                &format!("/virtualNetworks/{virtual_network}/subnets/{name}"),
            ),
            NETWORK_API_VERSION,
            req,
        )
        .await
    }

    pub async fn create_or_update_public_ip_address(
        &self,
        resource_group: &str,
        name: &str,
        req: &PublicIpAddress,
    ) -> Result<PublicIpAddress> {
        self.create_or_update(
            "create or update public ip address",
            self.network_url(resource_group, &format!("/publicIPAddresses/{name}")),
            NETWORK_API_VERSION,
            req,
        )
        .await
    }

    pub async fn create_or_update_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        req: &NetworkInterface,
    ) -> Result<NetworkInterface> {
        self.create_or_update(
            "create or update network interface",
            self.network_url(resource_group, &format!("/networkInterfaces/{name}")),
            NETWORK_API_VERSION,
            req,
        )
        .await
    }

    // ── Compute ──────────────────────────────────────────────────────

    pub async fn create_or_update_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        req: &VirtualMachine,
    ) -> Result<VirtualMachine> {
        self.create_or_update(
            "create or update virtual machine",
            self.compute_url(resource_group, &format!("/virtualMachines/{name}")),
            COMPUTE_API_VERSION,
            req,
        )
        .await
    }
}

fn provisioning_state(value: &Value) -> Option<&str> {
    value
        .pointer("/properties/provisioningState")
        .and_then(Value::as_str)
}

fn error_message(value: &Value) -> String {
    value
        .pointer("/properties/error/message")
        .or_else(|| value.pointer("/error/message"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
