pub mod azure;
pub mod config;
pub mod descriptors;
pub mod provisioner;
pub mod types;

use async_trait::async_trait;
use azure_arm::{
    NetworkInterface, NetworkSecurityGroup, PublicIpAddress, ResourceGroup, Subnet,
    VirtualMachine, VirtualNetwork,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("azure error: {0}")]
    Azure(#[from] azure_arm::Error),

    #[error("missing env var: {0}")]
    MissingEnv(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("{resource} response is missing {field}")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    #[error("failed to write progress: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Create-or-update surface of the cloud management API.
///
/// Every method blocks until the remote resource has finished provisioning and
/// returns the resource as the service reports it. [`azure::AzureResourceManager`]
/// is the production implementation.
#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    async fn create_or_update_resource_group(
        &self,
        name: &str,
        req: &ResourceGroup,
    ) -> Result<ResourceGroup>;

    async fn create_or_update_virtual_network(
        &self,
        resource_group: &str,
        name: &str,
        req: &VirtualNetwork,
    ) -> Result<VirtualNetwork>;

    async fn create_or_update_network_security_group(
        &self,
        resource_group: &str,
        name: &str,
        req: &NetworkSecurityGroup,
    ) -> Result<NetworkSecurityGroup>;

    /// Subnets are addressed through their parent virtual network.
    async fn create_or_update_subnet(
        &self,
        resource_group: &str,
        virtual_network: &str,
        name: &str,
        req: &Subnet,
    ) -> Result<Subnet>;

    async fn create_or_update_public_ip_address(
        &self,
        resource_group: &str,
        name: &str,
        req: &PublicIpAddress,
    ) -> Result<PublicIpAddress>;

    async fn create_or_update_network_interface(
        &self,
        resource_group: &str,
        name: &str,
        req: &NetworkInterface,
    ) -> Result<NetworkInterface>;

    async fn create_or_update_virtual_machine(
        &self,
        resource_group: &str,
        name: &str,
        req: &VirtualMachine,
    ) -> Result<VirtualMachine>;
}
