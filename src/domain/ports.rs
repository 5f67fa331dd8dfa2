use crate::domain::model::{ModuleCatalog, ModuleVersion, SubsystemModuleRecord, SubsystemVersions};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Bearer token cache keyed by subsystem base URL.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> impl std::future::Future<Output = Result<Option<String>>> + Send;
    fn put(&self, key: &str, token: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Capabilities the hub needs from one subsystem.
///
/// Every call fails with `HubError::SubsystemUnreachable` on transport errors or a
/// non-success response.
#[async_trait]
pub trait SubsystemClient: Send + Sync {
    fn subsystem_id(&self) -> &str;

    /// Platform version currently running in the subsystem.
    fn platform_version(&self) -> &str;

    async fn list_modules(&self) -> Result<Vec<SubsystemModuleRecord>>;
    async fn list_installed_modules(&self) -> Result<Vec<SubsystemModuleRecord>>;
    async fn list_versions(&self, module_id: &str) -> Result<Vec<ModuleVersion>>;
    async fn install(&self, module_id: &str, version: &str) -> Result<()>;
    async fn uninstall(&self, module_id: &str) -> Result<()>;

    /// Rejections by the subsystem's activation logic surface as
    /// `HubError::ActivationFailed`.
    async fn activate(&self, module_id: &str) -> Result<()>;
    async fn deactivate(&self, module_id: &str) -> Result<()>;
}

/// Operations the hub exposes to its callers.
#[async_trait]
pub trait HubApi: Send + Sync {
    async fn get_modules(&self) -> Result<ModuleCatalog>;
    async fn get_installed_modules(&self) -> Result<ModuleCatalog>;

    /// Versions of `module_id` each subsystem can run, keyed by subsystem id.
    async fn get_module_versions(&self, module_id: &str) -> Result<SubsystemVersions>;

    /// Installs the newest version satisfying the constraint in each listed subsystem.
    /// Subsystems missing from `constraints` are left alone.
    async fn install_module(
        &self,
        module_id: &str,
        constraints: &HashMap<String, String>,
    ) -> Result<()>;

    async fn uninstall_module(&self, module_id: &str) -> Result<()>;
    async fn activate_module(&self, module_id: &str) -> Result<()>;
    async fn deactivate_module(&self, module_id: &str) -> Result<()>;
    async fn upgrade_module(&self, module_id: &str, constraint: &str) -> Result<()>;
    async fn downgrade_module(&self, module_id: &str, constraint: &str) -> Result<()>;
}
