pub mod aggregator;
pub mod hub;
pub mod version;

pub use crate::domain::model::{
    LogicalModule, ModuleCatalog, ModuleVersion, SubsystemInfo, SubsystemModuleRecord,
    SubsystemVersions,
};
pub use crate::domain::ports::{HubApi, SubsystemClient, TokenStore};
pub use crate::utils::error::Result;
