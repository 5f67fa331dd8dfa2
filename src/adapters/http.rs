use crate::config::toml_config::SubsystemConfig;
use crate::core::version;
use crate::core::{ModuleVersion, SubsystemClient, SubsystemInfo, SubsystemModuleRecord, TokenStore};
use crate::utils::error::{HubError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Builds the shared HTTP client used for every subsystem.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HubError::ConfigValidationError {
            field: "http".to_string(),
            message: format!("cannot build HTTP client: {}", e),
        })
}

/// `SubsystemClient` speaking the Hydra HTTP contract.
///
/// Only obtainable through [`HttpSubsystemClient::connect`], which authenticates and
/// checks that the subsystem accepts this hub's API version.
#[derive(Debug, Clone)]
pub struct HttpSubsystemClient {
    client: Client,
    base_url: String,
    token: String,
    info: SubsystemInfo,
}

impl HttpSubsystemClient {
    pub async fn connect<T: TokenStore>(
        config: &SubsystemConfig,
        hub_version: &str,
        tokens: &T,
        client: Client,
    ) -> Result<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();
        tracing::info!("🔌 Attaching to subsystem at {}", base_url);

        let cache_key = format!("token_{}", base_url);
        let token = match tokens.get(&cache_key).await? {
            Some(token) => {
                tracing::info!("🔑 Access token retrieved from cache");
                token
            }
            None => {
                tracing::info!("🔑 Attempting to login");
                let token = login(&client, &base_url, &config.login, &config.password).await?;
                tokens.put(&cache_key, &token).await?;
                tracing::info!("🔑 Logged in successfully. Access token saved to cache.");
                token
            }
        };

        tracing::info!("Retrieving subsystem information");
        let response = check_status(
            &base_url,
            client
                .get(format!("{}/hydra/info", base_url))
                .bearer_auth(&token)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await,
        )?;
        let info: SubsystemInfo = response
            .json()
            .await
            .map_err(|e| HubError::unreachable(&base_url, e))?;

        version::parse_version(&info.version)?;
        if !version::satisfies(hub_version, &info.api_version)? {
            tracing::warn!(
                "Subsystem not acknowledged: {}(v{}) requires hub {}",
                info.subsystem_id,
                info.version,
                info.api_version
            );
            return Err(HubError::IncompatibleSubsystem {
                subsystem_id: info.subsystem_id,
                required: info.api_version,
                hub_version: hub_version.to_string(),
            });
        }

        tracing::info!(
            "✅ Acknowledged subsystem: {}(v{})",
            info.subsystem_id,
            info.version
        );

        Ok(Self {
            client,
            base_url,
            token,
            info,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/hydra{}", self.base_url, path)
    }

    fn unreachable(&self, reason: impl ToString) -> HubError {
        HubError::unreachable(&self.info.subsystem_id, reason)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut request = request
            .bearer_auth(&self.token)
            .build()
            .map_err(|e| self.unreachable(e))?;
        // insert replaces the header `.json()` may already have set
        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        check_status(&self.info.subsystem_id, self.client.execute(request).await)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response.json().await.map_err(|e| self.unreachable(e))
    }

    /// POSTs a module action and returns the raw response body.
    async fn post_action(&self, action: &str, body: Value) -> Result<String> {
        tracing::debug!("📡 {}: POST /hydra/modules/{}", self.info.subsystem_id, action);
        let request = self
            .client
            .post(self.endpoint(&format!("/modules/{}", action)))
            .json(&body);
        let response = self.send(request).await?;
        response.text().await.map_err(|e| self.unreachable(e))
    }

    async fn fetch_modules(&self, installed_only: bool) -> Result<Vec<SubsystemModuleRecord>> {
        let mut request = self.client.get(self.endpoint("/modules"));
        if installed_only {
            request = request.query(&[("filter[installed]", "true")]);
        }

        let mut records: Vec<SubsystemModuleRecord> = self.get_json(request).await?;
        for record in &mut records {
            record.subsystem_id = self.info.subsystem_id.clone();
        }
        Ok(records)
    }
}

#[async_trait]
impl SubsystemClient for HttpSubsystemClient {
    fn subsystem_id(&self) -> &str {
        &self.info.subsystem_id
    }

    fn platform_version(&self) -> &str {
        &self.info.version
    }

    async fn list_modules(&self) -> Result<Vec<SubsystemModuleRecord>> {
        self.fetch_modules(false).await
    }

    async fn list_installed_modules(&self) -> Result<Vec<SubsystemModuleRecord>> {
        self.fetch_modules(true).await
    }

    async fn list_versions(&self, module_id: &str) -> Result<Vec<ModuleVersion>> {
        let mut url = Url::parse(&self.endpoint("/modules")).map_err(|e| self.unreachable(e))?;
        url.path_segments_mut()
            .map_err(|_| self.unreachable("base URL cannot carry a path"))?
            .push(module_id)
            .push("versions");

        let mut versions: Vec<ModuleVersion> = self.get_json(self.client.get(url)).await?;
        for v in &mut versions {
            if v.module_id.is_empty() {
                v.module_id = module_id.to_string();
            }
        }
        Ok(versions)
    }

    async fn install(&self, module_id: &str, version: &str) -> Result<()> {
        self.post_action("install", json!({ "moduleId": module_id, "version": version }))
            .await?;
        Ok(())
    }

    async fn uninstall(&self, module_id: &str) -> Result<()> {
        self.post_action("uninstall", json!({ "moduleId": module_id }))
            .await?;
        Ok(())
    }

    async fn activate(&self, module_id: &str) -> Result<()> {
        let body = self
            .post_action("activate", json!({ "moduleId": module_id }))
            .await?;
        match activation_rejection(&body) {
            Some(detail) => Err(HubError::ActivationFailed {
                module_id: module_id.to_string(),
                subsystem_id: self.info.subsystem_id.clone(),
                detail,
            }),
            None => Ok(()),
        }
    }

    async fn deactivate(&self, module_id: &str) -> Result<()> {
        self.post_action("deactivate", json!({ "moduleId": module_id }))
            .await?;
        Ok(())
    }
}

async fn login(client: &Client, base_url: &str, login: &str, password: &str) -> Result<String> {
    let response = check_status(
        base_url,
        client
            .post(format!("{}/hydra/login", base_url))
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await,
    )?;
    response
        .json::<String>()
        .await
        .map_err(|e| HubError::unreachable(base_url, format!("unexpected login response: {}", e)))
}

// Anything but 200 is a protocol failure.
fn check_status(
    subsystem_id: &str,
    sent: std::result::Result<Response, reqwest::Error>,
) -> Result<Response> {
    let response = sent.map_err(|e| HubError::unreachable(subsystem_id, e))?;
    if response.status() != StatusCode::OK {
        tracing::debug!("📡 {}: {} {}", subsystem_id, response.url(), response.status());
        return Err(HubError::unreachable(
            subsystem_id,
            format!("request failed with code {}", response.status().as_u16()),
        ));
    }
    Ok(response)
}

/// A 200 reply to `activate` whose body is `{"success": false, ...}` is a rejection.
fn activation_rejection(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    if object.get("success").and_then(Value::as_bool) != Some(false) {
        return None;
    }
    let detail = object
        .get("error")
        .or_else(|| object.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("activation rejected by subsystem");
    Some(detail.to_string())
}
