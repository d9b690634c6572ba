use std::process::ExitCode;
use std::sync::Arc;

use azprov_infra::azure::AzureResourceManager;
use azprov_infra::config::ProvisionConfig;
use azprov_infra::provisioner::Provisioner;
use azprov_infra::types::ProvisionReport;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout is reserved for progress lines
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(report) => {
            tracing::info!(
                vm = %report.virtual_machine_name,
                vm_id = ?report.virtual_machine_id,
                public_ip = ?report.public_ip_address,
                "virtual machine ready"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "provisioning failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> azprov_infra::Result<ProvisionReport> {
    let config = ProvisionConfig::from_env()?;
    let manager = AzureResourceManager::from_env()?;

    tracing::info!(
        resource_group = %config.resource_group,
        location = %config.location,
        vm = %config.vm_name,
        "starting provisioning run"
    );

    let provisioner = Provisioner::new(Arc::new(manager), config);
    let mut stdout = std::io::stdout();
    provisioner.run(&mut stdout).await
}
