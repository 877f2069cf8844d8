//! Backend state management
//!
//! This module defines the UmpleBackend struct, which holds the workspace,
//! the resolved configuration and the channels of the validation debouncer.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::Client;
use tower_lsp::lsp_types::Url;

use crate::config::{ServerConfig, ToolOverrides};
use crate::lsp::workspace::UmpleWorkspace;

/// Request to validate an open document once it has been quiet for `delay`
#[derive(Debug, Clone)]
pub(super) struct ValidationRequest {
    pub(super) uri: Url,
    pub(super) path: PathBuf,
    pub(super) delay: Duration,
}

/// The Umple language server backend
#[derive(Clone)]
pub struct UmpleBackend {
    pub(super) client: Client,
    pub(super) workspace: Arc<UmpleWorkspace>,
    /// Tool paths from the command line; they outrank everything else
    pub(super) overrides: ToolOverrides,
    pub(super) config: Arc<RwLock<ServerConfig>>,
    /// Why diagnostics are unavailable, reported once after `initialized`
    pub(super) disabled_reason: Arc<RwLock<Option<String>>>,
    pub(super) setup_warning_shown: Arc<AtomicBool>,
    pub(super) validation_tx: tokio::sync::mpsc::Sender<ValidationRequest>,
    /// Token of the latest validation per document
    pub(super) validation_cancel: Arc<DashMap<Url, CancellationToken>>,
    pub(super) shutdown_tx: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl std::fmt::Debug for UmpleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UmpleBackend")
            .field("workspace", &self.workspace)
            .field("config", &*self.config.read())
            .finish()
    }
}
