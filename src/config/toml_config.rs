use crate::core::version;
use crate::utils::error::{HubError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub hub: HubSection,
    pub http: Option<HttpConfig>,
    pub tokens: Option<TokenCacheConfig>,
    #[serde(default)]
    pub subsystems: Vec<SubsystemConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSection {
    /// Hydra API version this hub speaks; checked against each subsystem's `api_version`.
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCacheConfig {
    pub cache_path: Option<String>,
}

/// Where a subsystem lives and how to log in to it.
#[derive(Clone, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub url: String,
    pub login: String,
    pub password: String,
}

impl std::fmt::Debug for SubsystemConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubsystemConfig")
            .field("url", &self.url)
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

impl HubConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HubError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HubError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${HYDRA_PASSWORD})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| HubError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("hub.version", &self.hub.version)?;
        version::parse_version(&self.hub.version).map_err(|e| HubError::InvalidConfigValueError {
            field: "hub.version".to_string(),
            value: self.hub.version.clone(),
            reason: e.to_string(),
        })?;

        if let Some(timeout) = self.http.as_ref().and_then(|h| h.timeout_seconds) {
            validation::validate_range("http.timeout_seconds", timeout, 1, 600)?;
        }

        if let Some(path) = self.token_cache_path() {
            validation::validate_path("tokens.cache_path", path)?;
        }

        if self.subsystems.is_empty() {
            return Err(HubError::MissingConfigError {
                field: "subsystems".to_string(),
            });
        }

        for (index, subsystem) in self.subsystems.iter().enumerate() {
            validation::validate_url(&format!("subsystems[{}].url", index), &subsystem.url)?;
            validation::validate_non_empty_string(
                &format!("subsystems[{}].login", index),
                &subsystem.login,
            )?;
        }

        Ok(())
    }

    pub fn hub_version(&self) -> &str {
        &self.hub.version
    }

    pub fn timeout(&self) -> Duration {
        let seconds = self
            .http
            .as_ref()
            .and_then(|h| h.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
        Duration::from_secs(seconds)
    }

    /// 取得 token 快取檔案路徑，未設定時使用記憶體快取
    pub fn token_cache_path(&self) -> Option<&str> {
        self.tokens.as_ref().and_then(|t| t.cache_path.as_deref())
    }
}

impl Validate for HubConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
