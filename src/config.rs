//! Server configuration
//!
//! Tool paths are resolved from, highest priority first: command-line flags,
//! environment variables (`UMPLESYNC_JAR`, `UMPLE_JAVA`), the client's
//! `initializationOptions`, and finally `java` on the `PATH`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::lsp::diagnostic_provider::BackendConfig;

pub const ENV_UMPLESYNC_JAR: &str = "UMPLESYNC_JAR";
pub const ENV_JAVA: &str = "UMPLE_JAVA";

/// Quiet period after an edit before the document is validated
pub const DEFAULT_VALIDATION_DEBOUNCE: Duration = Duration::from_millis(300);

/// Quiet period before re-validating open documents that import a changed file
pub const DEFAULT_CASCADE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Paths given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOverrides {
    pub umplesync_jar: Option<PathBuf>,
    pub java: Option<PathBuf>,
}

/// `initializationOptions` sent by the client
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitializationOptions {
    #[serde(default)]
    pub umple_sync_jar_path: Option<PathBuf>,
    #[serde(default)]
    pub java_path: Option<PathBuf>,
}

impl InitializationOptions {
    /// Lenient parse: unknown or malformed options are ignored
    pub fn from_value(value: Option<&serde_json::Value>) -> Self {
        match value {
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
                warn!("Ignoring malformed initializationOptions: {}", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub umplesync_jar: Option<PathBuf>,
    pub java: Option<PathBuf>,
    pub validation_debounce: Duration,
    pub cascade_debounce: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            umplesync_jar: None,
            java: None,
            validation_debounce: DEFAULT_VALIDATION_DEBOUNCE,
            cascade_debounce: DEFAULT_CASCADE_DEBOUNCE,
        }
    }
}

impl ServerConfig {
    /// Resolve against the process environment
    pub fn resolve(cli: &ToolOverrides, init: &InitializationOptions) -> Self {
        Self::resolve_with(cli, |key| std::env::var(key).ok(), init)
    }

    /// Resolve with an explicit environment lookup
    pub fn resolve_with(
        cli: &ToolOverrides,
        env: impl Fn(&str) -> Option<String>,
        init: &InitializationOptions,
    ) -> Self {
        let from_env = |key: &str| env(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        let umplesync_jar = cli
            .umplesync_jar
            .clone()
            .or_else(|| from_env(ENV_UMPLESYNC_JAR))
            .or_else(|| init.umple_sync_jar_path.clone());
        let java = cli
            .java
            .clone()
            .or_else(|| from_env(ENV_JAVA))
            .or_else(|| init.java_path.clone())
            .or_else(|| which::which("java").ok());

        let config = Self {
            umplesync_jar,
            java,
            ..Self::default()
        };
        debug!("Resolved configuration: {:?}", config);
        config
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::from_paths(self.java.clone(), self.umplesync_jar.clone())
    }
}
