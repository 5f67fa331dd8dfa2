use crate::core::{ModuleVersion, SubsystemClient, SubsystemModuleRecord};
use crate::utils::error::{HubError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Subsystem client operations, used to count calls and inject failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListModules,
    ListInstalledModules,
    ListVersions,
    Install,
    Uninstall,
    Activate,
    Deactivate,
}

#[derive(Debug, Default)]
struct State {
    modules: Vec<SubsystemModuleRecord>,
    versions: HashMap<String, Vec<ModuleVersion>>,
    calls: HashMap<Operation, usize>,
}

/// A subsystem living in process memory.
///
/// Clones share state, so a test can keep a handle after giving the subsystem to the hub.
#[derive(Debug, Clone)]
pub struct InMemorySubsystem {
    subsystem_id: String,
    platform_version: String,
    state: Arc<Mutex<State>>,
    unreachable_on: HashSet<Operation>,
    activation_rejection: Option<String>,
    strict: bool,
}

impl InMemorySubsystem {
    pub fn new(subsystem_id: impl Into<String>, platform_version: impl Into<String>) -> Self {
        Self {
            subsystem_id: subsystem_id.into(),
            platform_version: platform_version.into(),
            state: Arc::new(Mutex::new(State::default())),
            unreachable_on: HashSet::new(),
            activation_rejection: None,
            strict: false,
        }
    }

    pub fn with_module(self, mut record: SubsystemModuleRecord) -> Self {
        record.subsystem_id = self.subsystem_id.clone();
        self.lock().modules.push(record);
        self
    }

    pub fn with_versions(self, module_id: &str, versions: Vec<ModuleVersion>) -> Self {
        self.lock()
            .versions
            .insert(module_id.to_string(), versions);
        self
    }

    /// Every call of `operation` fails as if the subsystem were down.
    pub fn unreachable_on(mut self, operation: Operation) -> Self {
        self.unreachable_on.insert(operation);
        self
    }

    /// Every activation is refused with `detail`.
    pub fn reject_activation(mut self, detail: impl Into<String>) -> Self {
        self.activation_rejection = Some(detail.into());
        self
    }

    /// Lifecycle calls on modules that are not installed fail with `ModuleNotInstalled`.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    pub fn module(&self, module_id: &str) -> Option<SubsystemModuleRecord> {
        self.lock()
            .modules
            .iter()
            .find(|m| m.module_id == module_id)
            .cloned()
    }

    // never held across an await
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_call(&self, operation: Operation) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;
        if self.unreachable_on.contains(&operation) {
            return Err(HubError::unreachable(
                &self.subsystem_id,
                format!("simulated outage on {:?}", operation),
            ));
        }
        Ok(state)
    }

    fn ensure_installed(&self, state: &State, module_id: &str) -> Result<()> {
        if !self.strict {
            return Ok(());
        }
        let installed = state
            .modules
            .iter()
            .any(|m| m.module_id == module_id && m.installed);
        if installed {
            Ok(())
        } else {
            Err(HubError::ModuleNotInstalled {
                module_id: module_id.to_string(),
            })
        }
    }
}

#[async_trait]
impl SubsystemClient for InMemorySubsystem {
    fn subsystem_id(&self) -> &str {
        &self.subsystem_id
    }

    fn platform_version(&self) -> &str {
        &self.platform_version
    }

    async fn list_modules(&self) -> Result<Vec<SubsystemModuleRecord>> {
        let state = self.record_call(Operation::ListModules)?;
        Ok(state.modules.clone())
    }

    async fn list_installed_modules(&self) -> Result<Vec<SubsystemModuleRecord>> {
        let state = self.record_call(Operation::ListInstalledModules)?;
        Ok(state
            .modules
            .iter()
            .filter(|m| m.installed)
            .cloned()
            .collect())
    }

    async fn list_versions(&self, module_id: &str) -> Result<Vec<ModuleVersion>> {
        let state = self.record_call(Operation::ListVersions)?;
        Ok(state.versions.get(module_id).cloned().unwrap_or_default())
    }

    async fn install(&self, module_id: &str, version: &str) -> Result<()> {
        let mut state = self.record_call(Operation::Install)?;
        for module in state.modules.iter_mut().filter(|m| m.module_id == module_id) {
            module.installed = true;
            module.version = Some(version.to_string());
        }
        Ok(())
    }

    async fn uninstall(&self, module_id: &str) -> Result<()> {
        let mut state = self.record_call(Operation::Uninstall)?;
        self.ensure_installed(&state, module_id)?;
        for module in state.modules.iter_mut().filter(|m| m.module_id == module_id) {
            module.installed = false;
            module.active = false;
            module.version = None;
        }
        Ok(())
    }

    async fn activate(&self, module_id: &str) -> Result<()> {
        let mut state = self.record_call(Operation::Activate)?;
        self.ensure_installed(&state, module_id)?;
        if let Some(detail) = &self.activation_rejection {
            return Err(HubError::ActivationFailed {
                module_id: module_id.to_string(),
                subsystem_id: self.subsystem_id.clone(),
                detail: detail.clone(),
            });
        }
        for module in state.modules.iter_mut().filter(|m| m.module_id == module_id) {
            module.active = true;
        }
        Ok(())
    }

    async fn deactivate(&self, module_id: &str) -> Result<()> {
        let mut state = self.record_call(Operation::Deactivate)?;
        self.ensure_installed(&state, module_id)?;
        for module in state.modules.iter_mut().filter(|m| m.module_id == module_id) {
            module.active = false;
        }
        Ok(())
    }
}
