use std::fmt;

/// Admin password for the VM's OS profile. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminPassword(String);

impl AdminPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminPassword(<redacted>)")
    }
}

/// The single inbound allow rule placed on the security group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRule {
    pub name: String,
    pub protocol: azure_arm::SecurityRuleProtocol,
    pub destination_port: String,
    pub priority: u32,
}

/// Identifiers collected over one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub resource_group_id: Option<String>,
    pub virtual_network_id: Option<String>,
    pub network_security_group_id: String,
    pub subnet_id: String,
    pub public_ip_address_id: String,
    pub public_ip_address: Option<String>,
    pub network_interface_id: String,
    pub virtual_machine_id: Option<String>,
    pub virtual_machine_name: String,
}
