//! Request bodies for each provisioning step.
//!
//! These are pure functions of the run configuration and the ids returned by
//! earlier steps, so the same inputs always produce the same bodies.

use azure_arm::{
    AddressSpace, HardwareProfile, IpAllocationMethod, IpConfigurationProperties, IpVersion,
    NetworkInterface, NetworkInterfaceIpConfiguration, NetworkInterfaceProperties,
    NetworkInterfaceReference, NetworkProfile, NetworkSecurityGroup,
    NetworkSecurityGroupProperties, OsProfile, PublicIpAddress, PublicIpAddressProperties,
    PublicIpSku, PublicIpSkuName, ResourceGroup, SecurityRule, SecurityRuleAccess,
    SecurityRuleDirection, SecurityRuleProperties, StorageProfile, SubResource, Subnet,
    SubnetProperties, VirtualMachine, VirtualMachineProperties, VirtualNetwork,
    VirtualNetworkProperties,
};

use crate::config::ProvisionConfig;
use crate::types::InboundRule;

pub fn resource_group(config: &ProvisionConfig) -> ResourceGroup {
    ResourceGroup {
        id: None,
        name: None,
        location: config.location.clone(),
        properties: None,
    }
}

pub fn virtual_network(config: &ProvisionConfig) -> VirtualNetwork {
    VirtualNetwork {
        id: None,
        name: None,
        location: config.location.clone(),
        properties: VirtualNetworkProperties {
            address_space: AddressSpace {
                address_prefixes: vec![config.vnet_address_prefix.clone()],
            },
            provisioning_state: None,
        },
    }
}

fn security_rule(rule: &InboundRule) -> SecurityRule {
    SecurityRule {
        id: None,
        name: rule.name.clone(),
        properties: SecurityRuleProperties {
            protocol: rule.protocol,
            source_port_range: "*".into(),
            destination_port_range: rule.destination_port.clone(),
            source_address_prefix: "*".into(),
            destination_address_prefix: "*".into(),
            access: SecurityRuleAccess::Allow,
            priority: rule.priority,
            direction: SecurityRuleDirection::Inbound,
            provisioning_state: None,
        },
    }
}

pub fn network_security_group(config: &ProvisionConfig) -> NetworkSecurityGroup {
    NetworkSecurityGroup {
        id: None,
        name: None,
        location: config.location.clone(),
        properties: NetworkSecurityGroupProperties {
            security_rules: vec![security_rule(&config.inbound_rule)],
            provisioning_state: None,
        },
    }
}

pub fn subnet(config: &ProvisionConfig, nsg_id: &str) -> Subnet {
    Subnet {
        id: None,
        name: None,
        properties: SubnetProperties {
            address_prefix: Some(config.subnet_address_prefix.clone()),
            network_security_group: Some(SubResource::new(nsg_id)),
            provisioning_state: None,
        },
    }
}

pub fn public_ip_address(config: &ProvisionConfig) -> PublicIpAddress {
    PublicIpAddress {
        id: None,
        name: None,
        location: config.location.clone(),
        sku: Some(PublicIpSku {
            name: PublicIpSkuName::Basic,
        }),
        properties: PublicIpAddressProperties {
            allocation_method: Some(IpAllocationMethod::Static),
            address_version: Some(IpVersion::IPv4),
            ip_address: None,
            provisioning_state: None,
        },
    }
}

pub fn network_interface(
    config: &ProvisionConfig,
    subnet_id: &str,
    public_ip_id: &str,
    nsg_id: &str,
) -> NetworkInterface {
    NetworkInterface {
        id: None,
        name: None,
        location: config.location.clone(),
        properties: NetworkInterfaceProperties {
            ip_configurations: vec![NetworkInterfaceIpConfiguration {
                id: None,
                name: config.ip_config_name.clone(),
                properties: IpConfigurationProperties {
                    subnet: Some(SubResource::new(subnet_id)),
                    public_ip_address: Some(SubResource::new(public_ip_id)),
                    private_ip_address: None,
                },
            }],
            network_security_group: Some(SubResource::new(nsg_id)),
            provisioning_state: None,
        },
    }
}

pub fn virtual_machine(config: &ProvisionConfig, nic_id: &str) -> VirtualMachine {
    VirtualMachine {
        id: None,
        name: None,
        location: config.location.clone(),
        properties: VirtualMachineProperties {
            hardware_profile: HardwareProfile {
                vm_size: config.vm_size.clone(),
            },
            storage_profile: StorageProfile {
                image_reference: Some(config.image.clone()),
            },
            os_profile: Some(OsProfile {
                computer_name: config.vm_name.clone(),
                admin_username: config.admin_username.clone(),
                admin_password: Some(config.admin_password.expose().to_string()),
            }),
            network_profile: NetworkProfile {
                network_interfaces: vec![NetworkInterfaceReference {
                    id: nic_id.to_string(),
                }],
            },
            vm_id: None,
            provisioning_state: None,
        },
    }
}
