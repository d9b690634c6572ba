use azure_arm::{ImageReference, SecurityRuleProtocol};

use crate::types::{AdminPassword, InboundRule};
use crate::{Error, Result};

/// Everything one provisioning run needs to know about the resources it creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub resource_group: String,
    pub location: String,
    pub vnet_name: String,
    pub vnet_address_prefix: String,
    pub subnet_name: String,
    pub subnet_address_prefix: String,
    pub ip_name: String,
    pub ip_config_name: String,
    pub nic_name: String,
    pub nsg_name: String,
    pub inbound_rule: InboundRule,
    pub vm_name: String,
    pub vm_size: String,
    pub image: ImageReference,
    pub admin_username: String,
    pub admin_password: AdminPassword,
    /// Upsert the resource group before the network. Off unless asked for.
    pub create_resource_group: bool,
}

impl ProvisionConfig {
    /// Built-in defaults. Only the admin password has none.
    pub fn with_defaults(admin_password: AdminPassword) -> Self {
        Self {
            resource_group: "Data_Engineer".into(),
            location: "westeurope".into(),
            vnet_name: "Vnet-Sreehari-Butla".into(),
            vnet_address_prefix: "10.0.0.0/16".into(),
            subnet_name: "subnet-sreehari".into(),
            subnet_address_prefix: "10.0.0.0/24".into(),
            ip_name: "ip-example".into(),
            ip_config_name: "ip-config-example".into(),
            nic_name: "nic-example".into(),
            nsg_name: "nsg-example".into(),
            inbound_rule: InboundRule {
                name: "Allow-SSH".into(),
                protocol: SecurityRuleProtocol::Tcp,
                destination_port: "22".into(),
                priority: 100,
            },
            vm_name: "VM-Sreehari".into(),
            vm_size: "Standard_DS1_v2".into(),
            image: ImageReference {
                publisher: "Canonical".into(),
                offer: "UbuntuServer".into(),
                sku: "16.04.0-LTS".into(),
                version: "latest".into(),
            },
            admin_username: "azureuser".into(),
            admin_password,
            create_resource_group: false,
        }
    }

    /// Load from env vars (after reading `.env` if present):
    ///
    /// - `AZPROV_ADMIN_PASSWORD` (required)
    /// - `AZPROV_RESOURCE_GROUP`, `AZPROV_LOCATION`
    /// - `AZPROV_VNET_NAME`, `AZPROV_VNET_PREFIX`
    /// - `AZPROV_SUBNET_NAME`, `AZPROV_SUBNET_PREFIX`
    /// - `AZPROV_IP_NAME`, `AZPROV_IP_CONFIG_NAME`, `AZPROV_NIC_NAME`, `AZPROV_NSG_NAME`
    /// - `AZPROV_VM_NAME`, `AZPROV_VM_SIZE`, `AZPROV_ADMIN_USERNAME`
    /// - `AZPROV_CREATE_RESOURCE_GROUP` (default: `false`)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let password = lookup("AZPROV_ADMIN_PASSWORD")
            .ok_or_else(|| Error::MissingEnv("AZPROV_ADMIN_PASSWORD".into()))?;

        let mut config = Self::with_defaults(AdminPassword::new(password));

        let overrides: [(&str, &mut String); 13] = [
            ("AZPROV_RESOURCE_GROUP", &mut config.resource_group),
            ("AZPROV_LOCATION", &mut config.location),
            ("AZPROV_VNET_NAME", &mut config.vnet_name),
            ("AZPROV_VNET_PREFIX", &mut config.vnet_address_prefix),
            ("AZPROV_SUBNET_NAME", &mut config.subnet_name),
            ("AZPROV_SUBNET_PREFIX", &mut config.subnet_address_prefix),
            ("AZPROV_IP_NAME", &mut config.ip_name),
            ("AZPROV_IP_CONFIG_NAME", &mut config.ip_config_name),
            ("AZPROV_NIC_NAME", &mut config.nic_name),
            ("AZPROV_NSG_NAME", &mut config.nsg_name),
            ("AZPROV_VM_NAME", &mut config.vm_name),
            ("AZPROV_VM_SIZE", &mut config.vm_size),
            ("AZPROV_ADMIN_USERNAME", &mut config.admin_username),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }

        if let Some(raw) = lookup("AZPROV_CREATE_RESOURCE_GROUP") {
            config.create_resource_group = parse_bool("AZPROV_CREATE_RESOURCE_GROUP", &raw)?;
        }

        Ok(config)
    }
}

/// Read an env var, treating empty values as unset.
pub(crate) fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::InvalidConfig(format!(
            "{key} must be a boolean, got {other:?}"
        ))),
    }
}
