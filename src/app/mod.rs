pub mod bootstrap;
#[cfg(feature = "cli")]
pub mod commands;

pub use bootstrap::connect_all;
