// Adapters layer: concrete implementations of the domain ports (http subsystems,
// in-memory subsystems, token caches).

pub mod http;
pub mod memory;
pub mod token_store;

pub use http::{build_http_client, HttpSubsystemClient};
pub use memory::{InMemorySubsystem, Operation};
pub use token_store::{FileTokenStore, MemoryTokenStore};
