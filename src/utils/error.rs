use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    #[error("Subsystem {subsystem_id} does not respond: {reason}")]
    SubsystemUnreachable { subsystem_id: String, reason: String },

    #[error("Suitable module version of {module_id} is not found for subsystem '{subsystem_id}'")]
    VersionNotFound {
        module_id: String,
        subsystem_id: String,
    },

    #[error("Module {module_id} is not installed")]
    ModuleNotInstalled { module_id: String },

    #[error("Failed to activate module `{module_id}` for subsystem `{subsystem_id}`: {detail}")]
    ActivationFailed {
        module_id: String,
        subsystem_id: String,
        detail: String,
    },

    #[error("Malformed version constraint '{constraint}': {reason}")]
    MalformedConstraint { constraint: String, reason: String },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("Operation '{operation}' is not implemented")]
    NotImplemented { operation: String },

    #[error(
        "Subsystem '{subsystem_id}' does not support Hydra API v{hub_version} (requires {required})"
    )]
    IncompatibleSubsystem {
        subsystem_id: String,
        required: String,
        hub_version: String,
    },

    #[error("Subsystem '{subsystem_id}' is not bound to this hub")]
    UnknownSubsystem { subsystem_id: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

pub type Result<T> = std::result::Result<T, HubError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Subsystem,
    Resolution,
    Validation,
    Configuration,
    System,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HubError {
    pub fn unreachable(subsystem_id: impl Into<String>, reason: impl ToString) -> Self {
        HubError::SubsystemUnreachable {
            subsystem_id: subsystem_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HubError::SubsystemUnreachable { .. }
            | HubError::ActivationFailed { .. }
            | HubError::IncompatibleSubsystem { .. } => ErrorCategory::Subsystem,
            HubError::VersionNotFound { .. } | HubError::ModuleNotInstalled { .. } => {
                ErrorCategory::Resolution
            }
            HubError::MalformedConstraint { .. }
            | HubError::InvalidVersion { .. }
            | HubError::UnknownSubsystem { .. } => ErrorCategory::Validation,
            HubError::ConfigValidationError { .. }
            | HubError::InvalidConfigValueError { .. }
            | HubError::MissingConfigError { .. } => ErrorCategory::Configuration,
            HubError::IoError(_) | HubError::SerializationError(_) => ErrorCategory::System,
            HubError::NotImplemented { .. } => ErrorCategory::Unsupported,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 呼叫者可以修正輸入後重試
            HubError::VersionNotFound { .. }
            | HubError::MalformedConstraint { .. }
            | HubError::InvalidVersion { .. }
            | HubError::UnknownSubsystem { .. }
            | HubError::ModuleNotInstalled { .. } => ErrorSeverity::Medium,
            HubError::NotImplemented { .. } => ErrorSeverity::Low,
            HubError::SubsystemUnreachable { .. }
            | HubError::ActivationFailed { .. }
            | HubError::ConfigValidationError { .. }
            | HubError::InvalidConfigValueError { .. }
            | HubError::MissingConfigError { .. } => ErrorSeverity::High,
            HubError::IncompatibleSubsystem { .. }
            | HubError::IoError(_)
            | HubError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            HubError::SubsystemUnreachable { subsystem_id, .. } => format!(
                "Check that subsystem '{}' is running and reachable, then repeat the operation. \
                 Subsystems already changed by this call are not rolled back.",
                subsystem_id
            ),
            HubError::VersionNotFound { module_id, subsystem_id } => format!(
                "Run `versions {}` to see what '{}' offers and relax the constraint",
                module_id, subsystem_id
            ),
            HubError::ModuleNotInstalled { module_id } => {
                format!("Install module {} before changing its state", module_id)
            }
            HubError::ActivationFailed { subsystem_id, .. } => format!(
                "Inspect the logs of subsystem '{}' for the activation failure",
                subsystem_id
            ),
            HubError::MalformedConstraint { .. } => {
                "Use a constraint such as `*`, `1.2.3`, `^1.2`, `~1.2.0` or `>=1.0 <2.0`".to_string()
            }
            HubError::InvalidVersion { .. } => {
                "Versions must look like MAJOR.MINOR.PATCH with numeric components".to_string()
            }
            HubError::NotImplemented { .. } => {
                "Uninstall the module and install the wanted version instead".to_string()
            }
            HubError::IncompatibleSubsystem { .. } => {
                "Upgrade the hub or the subsystem so their Hydra API versions match".to_string()
            }
            HubError::UnknownSubsystem { .. } => {
                "Only use subsystem IDs listed by the `modules` command".to_string()
            }
            HubError::ConfigValidationError { field, .. }
            | HubError::InvalidConfigValueError { field, .. }
            | HubError::MissingConfigError { field } => {
                format!("Fix '{}' in the hub configuration file", field)
            }
            HubError::IoError(_) => "Check file permissions and available disk space".to_string(),
            HubError::SerializationError(_) => {
                "The peer returned data in an unexpected format".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Subsystem => format!("Subsystem problem: {}", self),
            ErrorCategory::Resolution => format!("Cannot resolve module: {}", self),
            ErrorCategory::Validation => format!("Invalid input: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
            ErrorCategory::Unsupported => format!("Unsupported: {}", self),
        }
    }
}
