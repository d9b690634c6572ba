use std::sync::Arc;
use std::time::Duration;

use azprov_infra::azure::AzureResourceManager;
use azprov_infra::config::ProvisionConfig;
use azprov_infra::provisioner::Provisioner;
use azprov_infra::types::AdminPassword;
use azprov_infra::Error;
use azure_arm::{AzureClient, StaticTokenCredential};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RG: &str = "/subscriptions/sub-1/resourceGroups/Data_Engineer";

struct Resource {
    path: String,
    body: Value,
}

fn resources() -> Vec<Resource> {
    let net = format!("{RG}/providers/Microsoft.Network");
    let vm = format!("{RG}/providers/Microsoft.Compute/virtualMachines/VM-Sreehari");
    let vnet = format!("{net}/virtualNetworks/Vnet-Sreehari-Butla");
    let nsg = format!("{net}/networkSecurityGroups/nsg-example");
    let subnet = format!("{vnet}/subnets/subnet-sreehari");
    let ip = format!("{net}/publicIPAddresses/ip-example");
    let nic = format!("{net}/networkInterfaces/nic-example");

    vec![
        Resource {
            body: json!({
                "id": vnet, "name": "Vnet-Sreehari-Butla", "location": "westeurope",
                "properties": {
                    "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] },
                    "provisioningState": "Succeeded"
                }
            }),
            path: vnet,
        },
        Resource {
            body: json!({
                "id": nsg, "name": "nsg-example", "location": "westeurope",
                "properties": { "provisioningState": "Succeeded" }
            }),
            path: nsg,
        },
        Resource {
            body: json!({
                "id": subnet, "name": "subnet-sreehari",
                "properties": { "addressPrefix": "10.0.0.0/24", "provisioningState": "Succeeded" }
            }),
            path: subnet,
        },
        Resource {
            body: json!({
                "id": ip, "name": "ip-example", "location": "westeurope",
                "properties": { "ipAddress": "51.105.0.10", "provisioningState": "Succeeded" }
            }),
            path: ip,
        },
        Resource {
            body: json!({
                "id": nic, "name": "nic-example", "location": "westeurope",
                "properties": { "provisioningState": "Succeeded" }
            }),
            path: nic,
        },
        Resource {
            body: json!({
                "id": vm, "name": "VM-Sreehari", "location": "westeurope",
                "properties": { "vmId": "5c1d", "provisioningState": "Succeeded" }
            }),
            path: vm,
        },
    ]
}

fn provisioner(server: &MockServer) -> Provisioner {
    let client = AzureClient::new("sub-1", Arc::new(StaticTokenCredential::new("token")))
        .unwrap()
        .with_base_url(server.uri())
        .with_poll_interval(Duration::ZERO);

    Provisioner::new(
        Arc::new(AzureResourceManager::new(client)),
        ProvisionConfig::with_defaults(AdminPassword::new("Correct-Horse-9")),
    )
}

async fn put_requests(server: &MockServer) -> Vec<(String, Value)> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            (r.url.path().to_string(), body)
        })
        .collect()
}

#[tokio::test]
async fn provisions_six_resources_in_order() {
    let server = MockServer::start().await;
    let resources = resources();

    for resource in &resources {
        Mock::given(method("PUT"))
            .and(path(resource.path.as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(resource.body.clone()))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut out = Vec::new();
    let report = provisioner(&server).run(&mut out).await.unwrap();

    let puts = put_requests(&server).await;
    let paths: Vec<&str> = puts.iter().map(|(p, _)| p.as_str()).collect();
    let expected: Vec<&str> = resources.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, expected);

    let (_, vnet) = &puts[0];
    assert_eq!(vnet["location"], "westeurope");
    assert_eq!(vnet["properties"]["addressSpace"]["addressPrefixes"], json!(["10.0.0.0/16"]));

    let (_, nsg) = &puts[1];
    let rules = nsg["properties"]["securityRules"].as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["properties"]["protocol"], "Tcp");
    assert_eq!(rules[0]["properties"]["destinationPortRange"], "22");
    assert_eq!(rules[0]["properties"]["sourceAddressPrefix"], "*");
    assert_eq!(rules[0]["properties"]["direction"], "Inbound");

    let (_, subnet) = &puts[2];
    assert_eq!(subnet["properties"]["addressPrefix"], "10.0.0.0/24");
    assert_eq!(
        subnet["properties"]["networkSecurityGroup"]["id"],
        resources[1].body["id"]
    );

    let (_, nic) = &puts[4];
    let ipcfg = &nic["properties"]["ipConfigurations"][0]["properties"];
    assert_eq!(ipcfg["subnet"]["id"], resources[2].body["id"]);
    assert_eq!(ipcfg["publicIPAddress"]["id"], resources[3].body["id"]);

    let (_, vm) = &puts[5];
    assert_eq!(
        vm["properties"]["networkProfile"]["networkInterfaces"][0]["id"],
        resources[4].body["id"]
    );
    assert_eq!(vm["properties"]["osProfile"]["adminPassword"], "Correct-Horse-9");

    assert_eq!(report.virtual_machine_id.as_deref(), Some(resources[5].path.as_str()));
    assert_eq!(report.public_ip_address.as_deref(), Some("51.105.0.10"));

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Provisioned public IP address ip-example with address 51.105.0.10"));
    assert!(out.ends_with("Provisioned virtual machine VM-Sreehari\n"));
}

#[tokio::test]
async fn rejected_interface_prevents_machine_request() {
    let server = MockServer::start().await;
    let resources = resources();

    for resource in &resources[..4] {
        Mock::given(method("PUT"))
            .and(path(resource.path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(resource.body.clone()))
            .mount(&server)
            .await;
    }

    Mock::given(method("PUT"))
        .and(path(resources[4].path.as_str()))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": { "code": "InUseSubnetCannotBeDeleted", "message": "conflict" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path(resources[5].path.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(resources[5].body.clone()))
        .expect(0)
        .mount(&server)
        .await;

    let mut out = Vec::new();
    let err = provisioner(&server).run(&mut out).await.unwrap_err();

    match err {
        Error::Azure(azure_arm::Error::Api { status, .. }) => assert_eq!(status.as_u16(), 409),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(put_requests(&server).await.len(), 5);
}
