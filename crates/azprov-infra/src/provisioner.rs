use std::io::Write;
use std::sync::Arc;

use tracing::info;

use crate::config::ProvisionConfig;
use crate::types::ProvisionReport;
use crate::{Error, ResourceManager, Result, descriptors};

/// Runs the fixed network-then-VM sequence against a [`ResourceManager`].
///
/// Each step is awaited to completion before the next one starts, and the ids
/// it returns are threaded into the requests that reference it. The first
/// failure ends the run; nothing already created is rolled back.
pub struct Provisioner {
    manager: Arc<dyn ResourceManager>,
    config: ProvisionConfig,
}

impl Provisioner {
    pub fn new(manager: Arc<dyn ResourceManager>, config: ProvisionConfig) -> Self {
        Self { manager, config }
    }

    /// Provision everything, writing one progress line per step to `out`.
    pub async fn run<W: Write>(&self, out: &mut W) -> Result<ProvisionReport> {
        let cfg = &self.config;
        let rg = cfg.resource_group.as_str();

        writeln!(
            out,
            "Provisioning a virtual machine...some operations might take a minute or two."
        )?;

        let resource_group_id = if cfg.create_resource_group {
            let group = self
                .manager
                .create_or_update_resource_group(rg, &descriptors::resource_group(cfg))
                .await?;
            writeln!(
                out,
                "Provisioned resource group {} in {}",
                display_name(&group.name, rg),
                group.location
            )?;
            group.id
        } else {
            None
        };

        // 1. Virtual network
        let vnet = self
            .manager
            .create_or_update_virtual_network(
                rg,
                &cfg.vnet_name,
                &descriptors::virtual_network(cfg),
            )
            .await?;
        writeln!(
            out,
            "Provisioned virtual network {} with address prefixes {:?}",
            display_name(&vnet.name, &cfg.vnet_name),
            vnet.properties.address_space.address_prefixes
        )?;

        // 2. Network security group
        let nsg = self
            .manager
            .create_or_update_network_security_group(
                rg,
                &cfg.nsg_name,
                &descriptors::network_security_group(cfg),
            )
            .await?;
        writeln!(out, "Provisioned NSG {}", display_name(&nsg.name, &cfg.nsg_name))?;
        let nsg_id = require_id("network security group", nsg.id)?;

        // 3. Subnet, guarded by the NSG
        let subnet = self
            .manager
            .create_or_update_subnet(
                rg,
                &cfg.vnet_name,
                &cfg.subnet_name,
                &descriptors::subnet(cfg, &nsg_id),
            )
            .await?;
        writeln!(
            out,
            "Provisioned subnet {} with address prefix {}",
            display_name(&subnet.name, &cfg.subnet_name),
            subnet.properties.address_prefix.as_deref().unwrap_or("-")
        )?;
        let subnet_id = require_id("subnet", subnet.id)?;

        // 4. Public IP
        let ip = self
            .manager
            .create_or_update_public_ip_address(
                rg,
                &cfg.ip_name,
                &descriptors::public_ip_address(cfg),
            )
            .await?;
        writeln!(
            out,
            "Provisioned public IP address {} with address {}",
            display_name(&ip.name, &cfg.ip_name),
            ip.properties.ip_address.as_deref().unwrap_or("unassigned")
        )?;
        let public_ip_address = ip.properties.ip_address.clone();
        let public_ip_address_id = require_id("public ip address", ip.id)?;

        // 5. Network interface
        let nic = self
            .manager
            .create_or_update_network_interface(
                rg,
                &cfg.nic_name,
                &descriptors::network_interface(cfg, &subnet_id, &public_ip_address_id, &nsg_id),
            )
            .await?;
        writeln!(
            out,
            "Provisioned network interface {}",
            display_name(&nic.name, &cfg.nic_name)
        )?;
        let network_interface_id = require_id("network interface", nic.id)?;

        // 6. Virtual machine
        writeln!(
            out,
            "Provisioning virtual machine {}; this operation might take a few minutes.",
            cfg.vm_name
        )?;
        let vm = self
            .manager
            .create_or_update_virtual_machine(
                rg,
                &cfg.vm_name,
                &descriptors::virtual_machine(cfg, &network_interface_id),
            )
            .await?;
        let virtual_machine_name = display_name(&vm.name, &cfg.vm_name).to_string();
        writeln!(out, "Provisioned virtual machine {virtual_machine_name}")?;

        info!(vm = %virtual_machine_name, "provisioning run complete");

        Ok(ProvisionReport {
            resource_group_id,
            virtual_network_id: vnet.id,
            network_security_group_id: nsg_id,
            subnet_id,
            public_ip_address_id,
            public_ip_address,
            network_interface_id,
            virtual_machine_id: vm.id,
            virtual_machine_name,
        })
    }
}

fn display_name<'a>(reported: &'a Option<String>, requested: &'a str) -> &'a str {
    reported.as_deref().unwrap_or(requested)
}

fn require_id(resource: &'static str, id: Option<String>) -> Result<String> {
    id.filter(|id| !id.is_empty()).ok_or(Error::MissingField {
        resource,
        field: "id",
    })
}
