//! Diagnostic provider abstraction for pluggable validation backends
//!
//! A provider takes a file on disk (normally the target of a shadow workspace)
//! and returns the validator's raw records. Mapping those records onto the
//! editor's document is done by the caller.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::serde_helpers::{deserialize_optional_code, deserialize_u32_lenient};

/// One result record written by the validator
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiagnostic {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub error_code: Option<String>,
    /// 1 and 2 are errors, anything higher is a warning
    #[serde(deserialize_with = "deserialize_u32_lenient")]
    pub severity: u32,
    #[serde(default)]
    pub url: Option<String>,
    /// 1-based
    #[serde(deserialize_with = "deserialize_u32_lenient")]
    pub line: u32,
    pub filename: String,
    pub message: String,
}

/// Why a validation produced no records
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The validator process could not be started or was killed
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("validator artifact not found: {0}")]
    MissingArtifact(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Superseded by a newer validation; never reported
    #[error("validation cancelled")]
    Cancelled,
}

impl ValidatorError {
    /// Configuration problems the user has to fix, as opposed to transient ones
    pub fn is_setup_problem(&self) -> bool {
        matches!(self, ValidatorError::Spawn { .. } | ValidatorError::MissingArtifact(_))
    }
}

/// Common interface for validation backends
#[async_trait::async_trait]
pub trait DiagnosticProvider: Send + Sync {
    /// Validate the file at `target`. Implementations stop early and return
    /// [`ValidatorError::Cancelled`] once `token` is cancelled.
    async fn validate(
        &self,
        target: &Path,
        token: &CancellationToken,
    ) -> Result<Vec<RawDiagnostic>, ValidatorError>;

    /// Get a human-readable name for this backend (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}

/// Configuration for selecting a diagnostic backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Run `java -jar <jar> -generate nothing <file>`
    UmpleSync { java: PathBuf, jar: PathBuf },

    /// Diagnostics are off; the reason is shown to the user once
    Disabled(String),
}

impl BackendConfig {
    /// Pick a backend from the resolved tool paths
    pub fn from_paths(java: Option<PathBuf>, jar: Option<PathBuf>) -> Self {
        match (java, jar) {
            (Some(java), Some(jar)) => Self::UmpleSync { java, jar },
            (None, _) => Self::Disabled("no java executable found; set javaPath or UMPLE_JAVA".to_string()),
            (_, None) => Self::Disabled(
                "umplesync.jar not configured; set umpleSyncJarPath or UMPLESYNC_JAR".to_string(),
            ),
        }
    }
}

/// Create a diagnostic provider based on the configuration.
///
/// Returns the reason diagnostics are unavailable instead of a provider when
/// the configuration is unusable. Other features keep working either way.
pub fn create_provider(config: BackendConfig) -> Result<Box<dyn DiagnosticProvider>, String> {
    match config {
        BackendConfig::UmpleSync { java, jar } => {
            if !jar.is_file() {
                let reason = ValidatorError::MissingArtifact(jar).to_string();
                warn!("{}", reason);
                return Err(reason);
            }
            info!("Creating UmpleSync diagnostic provider ({} -jar {})", java.display(), jar.display());
            Ok(Box::new(super::umple_validator::UmpleSyncValidator::new(java, jar)))
        }
        BackendConfig::Disabled(reason) => {
            warn!("Diagnostics disabled: {}", reason);
            Err(reason)
        }
    }
}
