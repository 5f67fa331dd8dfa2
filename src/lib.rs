pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliArgs, Command};

pub use adapters::{FileTokenStore, HttpSubsystemClient, InMemorySubsystem, MemoryTokenStore};
pub use config::{HubConfig, SubsystemConfig};
pub use core::hub::HubControlService;
pub use domain::ports::{HubApi, SubsystemClient, TokenStore};
pub use utils::error::{HubError, Result};
