use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A module as seen by a single subsystem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubsystemModuleRecord {
    pub module_id: String,
    #[serde(default)]
    pub subsystem_id: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub active: bool,
    /// Installed version, present whenever `installed` is true.
    #[serde(default)]
    pub version: Option<String>,
}

/// The hub-wide view of one module across every subsystem that reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalModule {
    pub module_id: String,
    pub vendor: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub subsystem_modules: Vec<SubsystemModuleRecord>,
}

impl LogicalModule {
    /// Starts a logical module from the first record seen for its id.
    pub fn from_record(record: &SubsystemModuleRecord) -> Self {
        Self {
            module_id: record.module_id.clone(),
            vendor: record.vendor.clone(),
            name: record.name.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            subsystem_modules: Vec::new(),
        }
    }

    /// True when every subsystem record is active. Vacuously true without records,
    /// which aggregation never produces.
    pub fn is_active(&self) -> bool {
        self.subsystem_modules.iter().all(|m| m.active)
    }

    pub fn is_installed(&self) -> bool {
        self.subsystem_modules.iter().all(|m| m.installed)
    }

    pub fn record_for(&self, subsystem_id: &str) -> Option<&SubsystemModuleRecord> {
        self.subsystem_modules
            .iter()
            .find(|m| m.subsystem_id == subsystem_id)
    }

    pub fn subsystem_ids(&self) -> Vec<&str> {
        self.subsystem_modules
            .iter()
            .map(|m| m.subsystem_id.as_str())
            .collect()
    }
}

/// One installable version of a module within a subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleVersion {
    pub module_id: String,
    pub version: String,
    /// Constraint over the subsystem platform versions this module version runs on.
    pub system_version: String,
    #[serde(default, deserialize_with = "lenient_map")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub subsystem_dependencies: BTreeMap<String, String>,
}

impl ModuleVersion {
    pub fn new(
        module_id: impl Into<String>,
        version: impl Into<String>,
        system_version: impl Into<String>,
    ) -> Self {
        Self {
            module_id: module_id.into(),
            version: version.into(),
            system_version: system_version.into(),
            dependencies: BTreeMap::new(),
            subsystem_dependencies: BTreeMap::new(),
        }
    }

    pub fn with_subsystem_dependency(
        mut self,
        subsystem_id: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        self.subsystem_dependencies
            .insert(subsystem_id.into(), constraint.into());
        self
    }
}

/// Self-description returned by `GET /hydra/info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemInfo {
    #[serde(rename = "subsystemId")]
    pub subsystem_id: String,
    pub version: String,
    /// Constraint the subsystem requires of the hub's own version.
    pub api_version: String,
}

/// Ordered mapping module id -> logical module, in first-seen order.
pub type ModuleCatalog = IndexMap<String, LogicalModule>;

/// Ordered mapping subsystem id -> compatible versions, in binding order.
pub type SubsystemVersions = IndexMap<String, Vec<ModuleVersion>>;

// PHP backed subsystems encode an empty map as `[]`.
fn lenient_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(BTreeMap<String, String>),
        List(Vec<serde_json::Value>),
    }

    match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(list) if list.is_empty() => Ok(BTreeMap::new()),
        MapOrList::List(_) => Err(serde::de::Error::custom(
            "expected an object of constraints or an empty list",
        )),
    }
}
