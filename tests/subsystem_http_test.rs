use anyhow::Result;
use httpmock::prelude::*;
use hydra_hub::adapters::build_http_client;
use hydra_hub::app::connect_all;
use hydra_hub::{
    FileTokenStore, HttpSubsystemClient, HubApi, HubConfig, HubError, MemoryTokenStore,
    SubsystemClient, SubsystemConfig, TokenStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

const HUB_VERSION: &str = "1.0.0";

fn subsystem_config(server: &MockServer) -> SubsystemConfig {
    SubsystemConfig {
        url: format!("{}/", server.base_url()),
        login: "hub".to_string(),
        password: "secret".to_string(),
    }
}

/// Registers login and info endpoints for a subsystem issuing `token`.
async fn handshake_mocks<'a>(
    server: &'a MockServer,
    subsystem_id: &str,
    token: &str,
    api_version: &str,
) -> (httpmock::Mock<'a>, httpmock::Mock<'a>) {
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hydra/login")
                .json_body(json!({ "login": "hub", "password": "secret" }));
            then.status(200).json_body(json!(token));
        })
        .await;
    let info = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/hydra/info")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json");
            then.status(200).json_body(json!({
                "subsystemId": subsystem_id,
                "version": "1.9.2",
                "api_version": api_version
            }));
        })
        .await;
    (login, info)
}

async fn connect(server: &MockServer, tokens: &MemoryTokenStore) -> hydra_hub::Result<HttpSubsystemClient> {
    let client = build_http_client(Duration::from_secs(5))?;
    HttpSubsystemClient::connect(&subsystem_config(server), HUB_VERSION, tokens, client).await
}

#[tokio::test]
async fn test_handshake_acknowledges_compatible_subsystem() -> Result<()> {
    let server = MockServer::start_async().await;
    let (login, info) = handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    let tokens = MemoryTokenStore::new();

    let subsystem = connect(&server, &tokens).await?;

    login.assert_async().await;
    info.assert_async().await;
    assert_eq!(subsystem.subsystem_id(), "server-1");
    assert_eq!(subsystem.platform_version(), "1.9.2");
    assert_eq!(subsystem.base_url(), server.base_url());
    assert_eq!(
        tokens.get(&format!("token_{}", server.base_url())).await?.as_deref(),
        Some("tok-1")
    );
    Ok(())
}

#[tokio::test]
async fn test_cached_token_skips_login() -> Result<()> {
    let server = MockServer::start_async().await;
    let (login, info) = handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    let tokens = MemoryTokenStore::new();

    connect(&server, &tokens).await?;
    connect(&server, &tokens).await?;

    login.assert_hits_async(1).await;
    info.assert_hits_async(2).await;
    Ok(())
}

#[tokio::test]
async fn test_file_token_cache_shared_between_runs() -> Result<()> {
    let server = MockServer::start_async().await;
    let (login, _info) = handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    let dir = TempDir::new()?;
    let path = dir.path().join("tokens.json");
    let client = build_http_client(Duration::from_secs(5))?;

    let first_run = FileTokenStore::new(&path);
    HttpSubsystemClient::connect(&subsystem_config(&server), HUB_VERSION, &first_run, client.clone()).await?;
    let second_run = FileTokenStore::new(&path);
    HttpSubsystemClient::connect(&subsystem_config(&server), HUB_VERSION, &second_run, client).await?;

    login.assert_hits_async(1).await;
    Ok(())
}

#[tokio::test]
async fn test_incompatible_subsystem_is_refused() -> Result<()> {
    let server = MockServer::start_async().await;
    handshake_mocks(&server, "server-1", "tok-1", "^2.0").await;

    let result = connect(&server, &MemoryTokenStore::new()).await;

    match result {
        Err(HubError::IncompatibleSubsystem {
            subsystem_id,
            required,
            hub_version,
        }) => {
            assert_eq!(subsystem_id, "server-1");
            assert_eq!(required, "^2.0");
            assert_eq!(hub_version, HUB_VERSION);
        }
        other => panic!("expected IncompatibleSubsystem, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[tokio::test]
async fn test_failed_login_is_unreachable() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/hydra/login");
            then.status(401).json_body(json!({ "message": "bad credentials" }));
        })
        .await;
    let tokens = MemoryTokenStore::new();

    let result = connect(&server, &tokens).await;

    assert!(matches!(result, Err(HubError::SubsystemUnreachable { .. })));
    assert_eq!(tokens.get(&format!("token_{}", server.base_url())).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_non_ok_status_maps_to_unreachable() -> Result<()> {
    let server = MockServer::start_async().await;
    handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/hydra/modules");
            then.status(500).body("boom");
        })
        .await;
    let subsystem = connect(&server, &MemoryTokenStore::new()).await?;

    match subsystem.list_modules().await {
        Err(HubError::SubsystemUnreachable {
            subsystem_id,
            reason,
        }) => {
            assert_eq!(subsystem_id, "server-1");
            assert!(reason.contains("500"));
        }
        other => panic!("expected SubsystemUnreachable, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_listing_stamps_subsystem_and_filters_installed() -> Result<()> {
    let server = MockServer::start_async().await;
    handshake_mocks(&server, "client-1", "tok-2", "*").await;
    let installed = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/hydra/modules")
                .query_param("filter[installed]", "true")
                .header("Authorization", "Bearer tok-2")
                .header("Content-Type", "application/json");
            then.status(200).json_body(json!([{
                "moduleId": "test.serverClientModule2",
                "vendor": "test",
                "name": "serverClientModule2",
                "title": "Server and client module",
                "description": "Lives on both sides",
                "installed": true,
                "active": true,
                "version": "1.0.0"
            }]));
        })
        .await;
    let subsystem = connect(&server, &MemoryTokenStore::new()).await?;

    let records = subsystem.list_installed_modules().await?;

    installed.assert_async().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subsystem_id, "client-1");
    assert_eq!(records[0].module_id, "test.serverClientModule2");
    assert!(records[0].installed && records[0].active);
    assert_eq!(records[0].version.as_deref(), Some("1.0.0"));
    Ok(())
}

#[tokio::test]
async fn test_versions_accept_empty_dependency_lists() -> Result<()> {
    let server = MockServer::start_async().await;
    handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/hydra/modules/test.serverModule1/versions");
            then.status(200).json_body(json!([
                {
                    "version": "1.0.0",
                    "systemVersion": "*",
                    "dependencies": [],
                    "subsystemDependencies": []
                },
                {
                    "moduleId": "test.serverModule1",
                    "version": "1.1.0",
                    "systemVersion": "^1.5",
                    "dependencies": { "test.core": "^1.0" },
                    "subsystemDependencies": { "client-1": "^1.0" }
                }
            ]));
        })
        .await;
    let subsystem = connect(&server, &MemoryTokenStore::new()).await?;

    let versions = subsystem.list_versions("test.serverModule1").await?;

    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0].module_id, "test.serverModule1");
    assert!(versions[0].dependencies.is_empty());
    assert_eq!(versions[1].subsystem_dependencies["client-1"], "^1.0");
    Ok(())
}

#[tokio::test]
async fn test_install_posts_module_and_version() -> Result<()> {
    let server = MockServer::start_async().await;
    handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    let install = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hydra/modules/install")
                .header("Authorization", "Bearer tok-1")
                .header("Content-Type", "application/json")
                .json_body(json!({ "moduleId": "test.serverModule1", "version": "1.4.2" }));
            then.status(200).json_body(json!(true));
        })
        .await;
    let subsystem = connect(&server, &MemoryTokenStore::new()).await?;

    subsystem.install("test.serverModule1", "1.4.2").await?;

    install.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_activation_rejection_body() -> Result<()> {
    let server = MockServer::start_async().await;
    handshake_mocks(&server, "server-1", "tok-1", "^1.0").await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hydra/modules/activate")
                .json_body(json!({ "moduleId": "test.serverModule1" }));
            then.status(200)
                .json_body(json!({ "success": false, "error": "missing dependency" }));
        })
        .await;
    let subsystem = connect(&server, &MemoryTokenStore::new()).await?;

    match subsystem.activate("test.serverModule1").await {
        Err(HubError::ActivationFailed {
            subsystem_id,
            detail,
            ..
        }) => {
            assert_eq!(subsystem_id, "server-1");
            assert_eq!(detail, "missing dependency");
        }
        other => panic!("expected ActivationFailed, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_full_workflow_across_two_subsystems() -> Result<()> {
    let server_1 = MockServer::start_async().await;
    let client_1 = MockServer::start_async().await;
    handshake_mocks(&server_1, "server-1", "tok-s", "^1.0").await;
    handshake_mocks(&client_1, "client-1", "tok-c", "^1.0").await;

    for (server, modules) in [
        (&server_1, json!([{ "moduleId": "A" }, { "moduleId": "B" }])),
        (
            &client_1,
            json!([
                { "moduleId": "B" },
                { "moduleId": "C", "installed": true, "active": true, "version": "1.0.0" }
            ]),
        ),
    ] {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/hydra/modules");
                then.status(200).json_body(modules.clone());
            })
            .await;
    }
    server_1
        .mock_async(|when, then| {
            when.method(GET).path("/hydra/modules/B/versions");
            then.status(200).json_body(json!([
                { "version": "1.0.0", "systemVersion": "*" },
                { "version": "1.4.0", "systemVersion": "*" },
                { "version": "1.4.2", "systemVersion": "*" },
                { "version": "2.0.0", "systemVersion": "*" }
            ]));
        })
        .await;
    let server_install = server_1
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hydra/modules/install")
                .json_body(json!({ "moduleId": "B", "version": "1.4.2" }));
            then.status(200);
        })
        .await;
    let client_deactivate = client_1
        .mock_async(|when, then| {
            when.method(POST)
                .path("/hydra/modules/deactivate")
                .json_body(json!({ "moduleId": "C" }));
            then.status(200);
        })
        .await;
    let server_deactivate = server_1
        .mock_async(|when, then| {
            when.method(POST).path("/hydra/modules/deactivate");
            then.status(200);
        })
        .await;

    let config = HubConfig::from_toml_str(&format!(
        r#"
[hub]
version = "{}"

[http]
timeout_seconds = 5

[[subsystems]]
url = "{}"
login = "hub"
password = "secret"

[[subsystems]]
url = "{}"
login = "hub"
password = "secret"
"#,
        HUB_VERSION,
        server_1.base_url(),
        client_1.base_url()
    ))?;

    let hub = connect_all(&config, &MemoryTokenStore::new()).await?;
    assert_eq!(hub.subsystem_ids(), vec!["server-1", "client-1"]);

    let catalog = hub.get_modules().await?;
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog["B"].subsystem_modules.len(), 2);
    assert!(catalog["C"].is_active());

    let mut constraints = HashMap::new();
    constraints.insert("server-1".to_string(), "~1.4.0".to_string());
    hub.install_module("B", &constraints).await?;
    server_install.assert_async().await;

    hub.deactivate_module("C").await?;
    server_deactivate.assert_async().await;
    client_deactivate.assert_async().await;
    Ok(())
}
