use crate::adapters::http::{build_http_client, HttpSubsystemClient};
use crate::config::toml_config::HubConfig;
use crate::core::hub::HubControlService;
use crate::domain::ports::{SubsystemClient, TokenStore};
use crate::utils::error::Result;

/// Attaches to every configured subsystem in file order and binds them to a hub.
///
/// Any failed handshake aborts startup.
pub async fn connect_all<T: TokenStore>(config: &HubConfig, tokens: &T) -> Result<HubControlService> {
    let client = build_http_client(config.timeout())?;
    let mut subsystems: Vec<Box<dyn SubsystemClient>> = Vec::with_capacity(config.subsystems.len());

    for subsystem in &config.subsystems {
        let connected =
            HttpSubsystemClient::connect(subsystem, config.hub_version(), tokens, client.clone())
                .await?;
        subsystems.push(Box::new(connected));
    }

    tracing::info!("🚀 Hub bound to {} subsystem(s)", subsystems.len());
    Ok(HubControlService::new(subsystems))
}
