use crate::core::aggregator;
use crate::core::version::{self, Constraint};
use crate::domain::model::{ModuleCatalog, ModuleVersion, SubsystemVersions};
use crate::domain::ports::{HubApi, SubsystemClient};
use crate::utils::error::{HubError, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Central hub service: fans operations out to every bound subsystem.
///
/// Subsystems are always visited one at a time in binding order. The first failure
/// aborts the operation; changes already made in other subsystems are kept.
pub struct HubControlService {
    subsystems: Vec<(String, Box<dyn SubsystemClient>)>,
}

#[derive(Debug, Clone, Copy)]
enum Lifecycle {
    Uninstall,
    Activate,
    Deactivate,
}

impl Lifecycle {
    fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Uninstall => "uninstall",
            Lifecycle::Activate => "activate",
            Lifecycle::Deactivate => "deactivate",
        }
    }
}

impl HubControlService {
    /// Indexes the clients by their reported subsystem id. A repeated id replaces the
    /// earlier client but keeps its position.
    pub fn new(clients: Vec<Box<dyn SubsystemClient>>) -> Self {
        let mut subsystems: Vec<(String, Box<dyn SubsystemClient>)> = Vec::new();
        for client in clients {
            let id = client.subsystem_id().to_string();
            match subsystems.iter_mut().find(|(bound, _)| *bound == id) {
                Some(slot) => {
                    tracing::warn!("⚠️ Subsystem '{}' bound twice, keeping the last client", id);
                    slot.1 = client;
                }
                None => subsystems.push((id, client)),
            }
        }

        tracing::info!(
            "Hub bound to {} subsystem(s): {}",
            subsystems.len(),
            subsystems
                .iter()
                .map(|(id, _)| id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Self { subsystems }
    }

    pub fn subsystem_ids(&self) -> Vec<&str> {
        self.subsystems.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Picks, per requested subsystem, the newest version matching its constraint.
    /// Issues no mutating call.
    async fn resolve_versions(
        &self,
        module_id: &str,
        constraints: &HashMap<String, String>,
    ) -> Result<Vec<(&dyn SubsystemClient, ModuleVersion)>> {
        if let Some(unknown) = constraints
            .keys()
            .find(|id| !self.subsystems.iter().any(|(bound, _)| bound == *id))
        {
            return Err(HubError::UnknownSubsystem {
                subsystem_id: unknown.clone(),
            });
        }

        let mut resolved = Vec::new();
        for (subsystem_id, client) in &self.subsystems {
            let Some(raw_constraint) = constraints.get(subsystem_id) else {
                continue;
            };
            let constraint: Constraint = raw_constraint.parse()?;

            let mut versions = client.list_versions(module_id).await?;
            version::sort_descending(&mut versions);

            let matched = versions.into_iter().find(|candidate| {
                match version::parse_version(&candidate.version) {
                    Ok(v) => constraint.matches(&v),
                    Err(e) => {
                        tracing::warn!("Skipping version published by '{}': {}", subsystem_id, e);
                        false
                    }
                }
            });

            let Some(matched) = matched else {
                tracing::warn!(
                    "No version of {} in '{}' satisfies '{}'",
                    module_id,
                    subsystem_id,
                    raw_constraint
                );
                return Err(HubError::VersionNotFound {
                    module_id: module_id.to_string(),
                    subsystem_id: subsystem_id.clone(),
                });
            };

            tracing::debug!(
                "📦 {}: resolved {} {} (constraint '{}')",
                subsystem_id,
                module_id,
                matched.version,
                raw_constraint
            );
            resolved.push((client.as_ref(), matched));
        }

        Ok(resolved)
    }

    async fn broadcast(&self, action: Lifecycle, module_id: &str) -> Result<()> {
        tracing::info!("🔧 {} {} on all subsystems", action.as_str(), module_id);

        for (subsystem_id, client) in &self.subsystems {
            tracing::debug!("🔧 {}: {} {}", subsystem_id, action.as_str(), module_id);
            let outcome = match action {
                Lifecycle::Uninstall => client.uninstall(module_id).await,
                Lifecycle::Activate => client.activate(module_id).await,
                Lifecycle::Deactivate => client.deactivate(module_id).await,
            };
            if let Err(e) = outcome {
                tracing::warn!(
                    "❌ {} {} stopped at '{}': {}",
                    action.as_str(),
                    module_id,
                    subsystem_id,
                    e
                );
                return Err(e);
            }
        }

        tracing::info!("✅ {} {} done", action.as_str(), module_id);
        Ok(())
    }
}

#[async_trait]
impl HubApi for HubControlService {
    async fn get_modules(&self) -> Result<ModuleCatalog> {
        let mut catalog = ModuleCatalog::new();
        for (subsystem_id, client) in &self.subsystems {
            let records = client.list_modules().await?;
            tracing::debug!("📋 {}: {} module(s)", subsystem_id, records.len());
            aggregator::collect_into(&mut catalog, subsystem_id, records);
        }
        Ok(catalog)
    }

    async fn get_installed_modules(&self) -> Result<ModuleCatalog> {
        let mut catalog = ModuleCatalog::new();
        for (subsystem_id, client) in &self.subsystems {
            let records = client.list_installed_modules().await?;
            tracing::debug!("📋 {}: {} installed module(s)", subsystem_id, records.len());
            aggregator::collect_into(&mut catalog, subsystem_id, records);
        }
        Ok(catalog)
    }

    async fn get_module_versions(&self, module_id: &str) -> Result<SubsystemVersions> {
        let mut by_subsystem = SubsystemVersions::new();
        for (subsystem_id, client) in &self.subsystems {
            let platform = version::parse_version(client.platform_version())?;
            let mut available = Vec::new();
            for candidate in client.list_versions(module_id).await? {
                let runs_on: Constraint = candidate.system_version.parse()?;
                if runs_on.matches(&platform) {
                    available.push(candidate);
                }
            }
            tracing::debug!(
                "📋 {} (v{}): {} compatible version(s) of {}",
                subsystem_id,
                platform,
                available.len(),
                module_id
            );
            by_subsystem.insert(subsystem_id.clone(), available);
        }
        Ok(by_subsystem)
    }

    async fn install_module(
        &self,
        module_id: &str,
        constraints: &HashMap<String, String>,
    ) -> Result<()> {
        tracing::info!("📦 Installing {} in {} subsystem(s)", module_id, constraints.len());

        let plan = self.resolve_versions(module_id, constraints).await?;

        for (client, chosen) in plan {
            tracing::debug!(
                "📦 {}: installing {} {}",
                client.subsystem_id(),
                chosen.module_id,
                chosen.version
            );
            if let Err(e) = client.install(&chosen.module_id, &chosen.version).await {
                tracing::warn!(
                    "❌ Install of {} stopped at '{}', earlier subsystems stay installed: {}",
                    module_id,
                    client.subsystem_id(),
                    e
                );
                return Err(e);
            }
        }

        tracing::info!("✅ Installed {}", module_id);
        Ok(())
    }

    async fn uninstall_module(&self, module_id: &str) -> Result<()> {
        self.broadcast(Lifecycle::Uninstall, module_id).await
    }

    async fn activate_module(&self, module_id: &str) -> Result<()> {
        self.broadcast(Lifecycle::Activate, module_id).await
    }

    async fn deactivate_module(&self, module_id: &str) -> Result<()> {
        self.broadcast(Lifecycle::Deactivate, module_id).await
    }

    // TODO: define version selection for upgrade/downgrade over the installed subsystems
    async fn upgrade_module(&self, module_id: &str, _constraint: &str) -> Result<()> {
        Err(HubError::NotImplemented {
            operation: format!("upgrade {}", module_id),
        })
    }

    async fn downgrade_module(&self, module_id: &str, _constraint: &str) -> Result<()> {
        Err(HubError::NotImplemented {
            operation: format!("downgrade {}", module_id),
        })
    }
}
