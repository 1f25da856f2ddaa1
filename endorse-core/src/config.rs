//! Authorizer configuration.
//!
//! Parses YAML files describing authorizer settings and, for tooling and
//! tests, the initial contents of an in-memory role registry.
//!
//! # Configuration File Format
//!
//! ```yaml
//! version: "1"
//!
//! settings:
//!   view: uncommitted        # committed | uncommitted
//!   audit: stdout            # none | stdout | stderr
//!
//! registry:
//!   - did: "V4SGRU86Z58d6TV7PBUe6f"
//!     role: TRUSTEE
//!     verkey: "~CoRER63DVYnWZtK8uAzNbx"
//!     seq_no: 1
//!   - did: "7JhapNNMLnwkbiC2ZmPZSE"
//!     role: ENDORSER
//!     seq_no: 12
//!     committed: false
//! ```

use crate::audit::{AuditLogger, NoOpLogger, StderrLogger, StdoutLogger};
use crate::authorizer::EndorserAuthorizer;
use crate::error::ErrorCode;
use crate::registry::{InMemoryRoleRegistry, RoleBinding, RoleRegistry, View};
use crate::request::Did;
use crate::role::Role;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Supported configuration version.
pub const CONFIG_VERSION: &str = "1";

/// Top-level configuration parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndorseConfig {
    /// Configuration version
    pub version: String,
    /// Authorizer settings
    #[serde(default)]
    pub settings: AuthorizerSettings,
    /// Registry seed bindings
    #[serde(default)]
    pub registry: Vec<RegistryEntry>,
}

/// Where audit events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSink {
    #[default]
    None,
    Stdout,
    Stderr,
}

/// Authorizer settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizerSettings {
    /// Registry view for role lookups
    #[serde(default)]
    pub view: View,
    /// Audit event sink
    #[serde(default)]
    pub audit: AuditSink,
}

/// One registry binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub did: Did,
    /// Omitted for identity owners
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub verkey: Option<String>,
    #[serde(default)]
    pub seq_no: u64,
    /// Whether the binding is committed (default) or part of the pending batch
    #[serde(default = "default_committed")]
    pub committed: bool,
}

fn default_committed() -> bool {
    true
}

impl EndorseConfig {
    /// Parse configuration from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(ConfigError::YamlParse)
    }

    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(path.as_ref().display().to_string(), e))?;
        Self::from_yaml(&content)
    }

    /// Validate the configuration for common errors.
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        if self.version != CONFIG_VERSION {
            errors.push(ConfigValidationError {
                location: "version".into(),
                message: format!(
                    "Unsupported version '{}' (expected '{}')",
                    self.version, CONFIG_VERSION
                ),
            });
        }

        let mut seen = HashSet::new();
        for (i, entry) in self.registry.iter().enumerate() {
            if !seen.insert((&entry.did, entry.committed)) {
                errors.push(ConfigValidationError {
                    location: format!("registry[{}]", i),
                    message: format!(
                        "DID '{}' is bound more than once in the {} view",
                        entry.did,
                        if entry.committed {
                            "committed"
                        } else {
                            "uncommitted"
                        }
                    ),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Build an in-memory registry holding the configured bindings.
    pub fn build_registry(&self) -> InMemoryRoleRegistry {
        let registry = InMemoryRoleRegistry::new();
        let now = Utc::now();
        for entry in &self.registry {
            registry.set(
                entry.did.clone(),
                RoleBinding {
                    role: entry.role,
                    verkey: entry.verkey.clone(),
                    seq_no: entry.seq_no,
                    txn_time: now,
                },
                entry.committed,
            );
        }
        registry
    }

    /// The audit logger selected by `settings.audit`.
    pub fn audit_logger(&self) -> Arc<dyn AuditLogger> {
        match self.settings.audit {
            AuditSink::None => Arc::new(NoOpLogger),
            AuditSink::Stdout => Arc::new(StdoutLogger::new()),
            AuditSink::Stderr => Arc::new(StderrLogger::new()),
        }
    }

    /// Build an authorizer over `registry` with the configured settings.
    pub fn build_authorizer<R: RoleRegistry>(&self, registry: R) -> EndorserAuthorizer<R> {
        EndorserAuthorizer::new(registry)
            .with_view(self.settings.view)
            .with_audit_logger(self.audit_logger())
    }
}

/// Configuration loading error.
#[derive(Debug)]
pub enum ConfigError {
    /// YAML parsing error
    YamlParse(serde_yaml::Error),
    /// File reading error
    FileRead(String, std::io::Error),
    /// Semantic validation failures
    Invalid(Vec<ConfigValidationError>),
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::YamlParse(_) => ErrorCode::MalformedYaml,
            ConfigError::FileRead(..) => ErrorCode::ConfigurationUnreadable,
            ConfigError::Invalid(_) => ErrorCode::ConfigurationInvalid,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::YamlParse(e) => write!(f, "YAML parse error: {}", e),
            ConfigError::FileRead(path, e) => write!(f, "Failed to read {}: {}", path, e),
            ConfigError::Invalid(errors) => {
                write!(f, "Invalid configuration: ")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<Vec<ConfigValidationError>> for ConfigError {
    fn from(errors: Vec<ConfigValidationError>) -> Self {
        ConfigError::Invalid(errors)
    }
}

/// Configuration validation error.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub location: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}
