use crate::core::TokenStore;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Process-local token cache.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let tokens = self.tokens.lock().await;
        Ok(tokens.get(key).cloned())
    }

    async fn put(&self, key: &str, token: &str) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        tokens.insert(key.to_string(), token.to_string());
        Ok(())
    }
}

/// Token cache persisted as a JSON object, so tokens survive between CLI runs.
///
/// Entries never expire. Concurrent writers are not serialized: the last write wins.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(HashMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let tokens = self.load().await?;
        Ok(tokens.get(key).cloned())
    }

    async fn put(&self, key: &str, token: &str) -> Result<()> {
        let mut tokens = self.load().await?;
        tokens.insert(key.to_string(), token.to_string());

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let data = serde_json::to_string_pretty(&tokens)?;
        tokio::fs::write(&self.path, data).await?;
        tracing::debug!("Token cache written to {}", self.path.display());
        Ok(())
    }
}
