use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azure_arm::{
    AzureClient, ClientSecretCredential, NetworkInterface, NetworkSecurityGroup, PublicIpAddress,
    ResourceGroup, StaticTokenCredential, Subnet, TokenCredential, VirtualMachine, VirtualNetwork,
};
use tracing::info;

use crate::config::env_var;
use crate::{Error, ResourceManager, Result};

/// Azure Resource Manager backend.
///
/// Delegates to `azure_arm::AzureClient` for all HTTP calls.
pub struct AzureResourceManager {
    client: AzureClient,
}

impl AzureResourceManager {
    pub fn new(client: AzureClient) -> Self {
        Self { client }
    }

    /// Create from env vars:
    ///
    /// - `AZURE_SUBSCRIPTION_ID` (required)
    /// - credentials, see [`credential_from_lookup`]
    /// - `AZURE_RESOURCE_MANAGER_URL` (default: `https://management.azure.com`)
    /// - `AZPROV_POLL_INTERVAL_SECS` (default: `5`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let subscription_id = lookup("AZURE_SUBSCRIPTION_ID")
            .ok_or_else(|| Error::MissingEnv("AZURE_SUBSCRIPTION_ID".into()))?;

        let credential = credential_from_lookup(&lookup)?;

        let poll_interval = match lookup("AZPROV_POLL_INTERVAL_SECS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                Error::InvalidConfig(format!(
                    "AZPROV_POLL_INTERVAL_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?,
            None => azure_arm::DEFAULT_POLL_INTERVAL,
        };

        let mut client =
            AzureClient::new(subscription_id, credential)?.with_poll_interval(poll_interval);
        if let Some(base_url) = lookup("AZURE_RESOURCE_MANAGER_URL") {
            client = client.with_base_url(base_url);
        }

        Ok(Self::new(client))
    }
}

/// Pick a credential source from the environment.
///
/// `AZURE_ACCESS_TOKEN` wins if set. Otherwise a service principal is built
/// from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET`, with an
/// optional `AZURE_AUTHORITY_HOST`.
pub fn credential_from_lookup(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Arc<dyn TokenCredential>> {
    if let Some(token) = lookup("AZURE_ACCESS_TOKEN") {
        info!("using pre-acquired access token");
        return Ok(Arc::new(StaticTokenCredential::new(token)));
    }

    match (
        lookup("AZURE_TENANT_ID"),
        lookup("AZURE_CLIENT_ID"),
        lookup("AZURE_CLIENT_SECRET"),
    ) {
        (Some(tenant), Some(client_id), Some(secret)) => {
            let mut credential = ClientSecretCredential::new(tenant, client_id, secret);
            if let Some(host) = lookup("AZURE_AUTHORITY_HOST") {
                credential = credential.with_authority_host(host);
            }
            info!("using service principal credentials");
            Ok(Arc::new(credential))
        }
        _ => Err(Error::MissingEnv(
            "no Azure credentials configured (set AZURE_ACCESS_TOKEN, or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET)".into(),
        )),
    }
}

#[async_trait]
impl ResourceManager for AzureResourceManager {
    async fn create_or_update_resource_group(
        &self,
        name: &str,
        req: &ResourceGroup,
    ) -> Result<ResourceGroup> {
        let group = self.client.create_or_update_resource_group(name, req).await?;
        info!(
            resource_group = name,
            location = %group.location,
            "azure: resource group provisioned"
        );
        Ok(group)
    }

    async fn create_or_update_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        req: &VirtualNetwork,
    ) -> Result<VirtualNetwork> {
        let vnet = self
            .client
            .create_or_update_virtual_network(resource_group, name, req)
            .await?;
        info!(resource_id = ?vnet.id, "azure: virtual network provisioned");
        Ok(vnet)
    }

    async fn create_or_update_network_security_group(
        &self,
        resource_group: &str,
        name: &str,
        req: &NetworkSecurityGroup,
    ) -> Result<NetworkSecurityGroup> {
        let nsg = self
            .client
            .create_or_update_network_security_group(resource_group, name, req)
            .await?;
        info!(
            resource_id = ?nsg.id,
            rules = nsg.properties.security_rules.len(),
            "azure: network security group provisioned"
        );
        Ok(nsg)
    }

    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        virtual_network: &str,
        name: &str,
        req: &Subnet,
    ) -> Result<Subnet> {
        let subnet = self
            .client
            .create_or_update_subnet(resource_group, virtual_network, name, req)
            .await?;
        info!(resource_id = ?subnet.id, "azure: subnet provisioned");
        Ok(subnet)
    }

    async fn create_or_update_public_ip_address(
        &self,
        resource_group: &str,
        name: &str,
        req: &PublicIpAddress,
    ) -> Result<PublicIpAddress> {
        let ip = self
            .client
            .create_or_update_public_ip_address(resource_group, name, req)
            .await?;
        info!(
            resource_id = ?ip.id,
            address = ?ip.properties.ip_address,
            "azure: public ip address provisioned"
        );
        Ok(ip)
    }

    async fn create_or_update_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        req: &NetworkInterface,
    ) -> Result<NetworkInterface> {
        let nic = self
            .client
            .create_or_update_network_interface(resource_group, name, req)
            .await?;
        info!(resource_id = ?nic.id, "azure: network interface provisioned");
        Ok(nic)
    }

    async fn create_or_update_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        req: &VirtualMachine,
    ) -> Result<VirtualMachine> {
        let vm = self
            .client
            .create_or_update_virtual_machine(resource_group, name, req)
            .await?;
        info!(
            resource_id = ?vm.id,
            vm_id = ?vm.properties.vm_id,
            "azure: virtual machine provisioned"
        );
        Ok(vm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn subscription_is_required() {
        let err = AzureResourceManager::from_lookup(lookup(&[("AZURE_ACCESS_TOKEN", "t")]))
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingEnv(ref key) if key == "AZURE_SUBSCRIPTION_ID"));
    }

    #[test]
    fn credentials_are_required() {
        let err = AzureResourceManager::from_lookup(lookup(&[
            ("AZURE_SUBSCRIPTION_ID", "sub"),
            ("AZURE_TENANT_ID", "tenant"),
        ]))
        .err()
        .unwrap();

        match err {
            Error::MissingEnv(msg) => {
                assert!(msg.contains("AZURE_ACCESS_TOKEN"));
                assert!(msg.contains("AZURE_CLIENT_SECRET"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn poll_interval_must_be_numeric() {
        let err = AzureResourceManager::from_lookup(lookup(&[
            ("AZURE_SUBSCRIPTION_ID", "sub"),
            ("AZURE_ACCESS_TOKEN", "t"),
            ("AZPROV_POLL_INTERVAL_SECS", "soon"),
        ]))
        .err()
        .unwrap();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn access_token_takes_precedence() {
        let credential = credential_from_lookup(&lookup(&[
            ("AZURE_ACCESS_TOKEN", "from-cli"),
            ("AZURE_TENANT_ID", "tenant"),
            ("AZURE_CLIENT_ID", "app"),
            ("AZURE_CLIENT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(credential.token().await.unwrap().token, "from-cli");
    }
}
