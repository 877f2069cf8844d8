use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tower_lsp::Client;
use tower_lsp::lsp_types::{MessageType, Url};
use tracing::{debug, info, trace, warn};

use crate::config::{InitializationOptions, ServerConfig, ToolOverrides};
use crate::lsp::diagnostic_provider::create_provider;
use crate::lsp::workspace::UmpleWorkspace;

pub mod dependency_graph;
mod handlers;
mod reactive;
mod state;

pub use state::UmpleBackend;
use state::ValidationRequest;

impl UmpleBackend {
    /// Creates the backend and spawns its validation debouncer.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(client: Client, overrides: ToolOverrides) -> Self {
        let (validation_tx, validation_rx) = tokio::sync::mpsc::channel::<ValidationRequest>(100);
        let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

        let backend = Self {
            client,
            workspace: Arc::new(UmpleWorkspace::default()),
            overrides,
            config: Arc::new(RwLock::new(ServerConfig::default())),
            disabled_reason: Arc::new(RwLock::new(None)),
            setup_warning_shown: Arc::new(AtomicBool::new(false)),
            validation_tx,
            validation_cancel: Arc::new(DashMap::new()),
            shutdown_tx: Arc::new(shutdown_tx),
        };

        Self::spawn_validation_debouncer(backend.clone(), validation_rx);
        backend
    }

    /// Resolve the configuration and pick a diagnostic provider
    pub(super) fn configure(&self, init: &InitializationOptions) {
        let config = ServerConfig::resolve(&self.overrides, init);
        match create_provider(config.backend_config()) {
            Ok(provider) => {
                info!("Using {} backend for validation", provider.backend_name());
                self.workspace.set_provider(Some(Arc::from(provider)));
                *self.disabled_reason.write() = None;
            }
            Err(reason) => {
                self.workspace.set_provider(None);
                *self.disabled_reason.write() = Some(reason);
            }
        }
        *self.config.write() = config;
    }

    /// Tell the user once that diagnostics cannot run
    pub(super) async fn report_setup_problem(&self, reason: String) {
        if self.setup_warning_shown.swap(true, Ordering::SeqCst) {
            debug!("Diagnostics unavailable: {}", reason);
            return;
        }
        warn!("Diagnostics unavailable: {}", reason);
        self.client
            .show_message(
                MessageType::WARNING,
                format!("Umple diagnostics are unavailable: {}", reason),
            )
            .await;
    }

    fn validation_debounce(&self) -> Duration {
        self.config.read().validation_debounce
    }

    fn cascade_debounce(&self) -> Duration {
        self.config.read().cascade_debounce
    }

    async fn schedule_validation(&self, uri: Url, path: PathBuf, delay: Duration) {
        if !self.workspace.has_provider() {
            trace!("Diagnostics disabled; not scheduling {}", uri);
            return;
        }
        let request = ValidationRequest { uri, path, delay };
        if let Err(e) = self.validation_tx.send(request).await {
            warn!("Failed to queue validation: {}", e);
        }
    }

    /// Re-validate open documents that import `path`
    async fn schedule_dependents(&self, path: &Path) {
        let dependents = self.workspace.open_dependents(path);
        if !dependents.is_empty() {
            debug!("{} open document(s) import {}", dependents.len(), path.display());
        }
        let delay = self.cascade_debounce();
        for document in dependents {
            self.schedule_validation(document.uri().clone(), document.path().to_path_buf(), delay)
                .await;
        }
    }

    /// Cancel any running validation of `uri`
    fn cancel_validation(&self, uri: &Url) {
        if let Some((_, token)) = self.validation_cancel.remove(uri) {
            token.cancel();
            trace!("Cancelled validation for {}", uri);
        }
    }
}

fn file_path(uri: &Url) -> Option<PathBuf> {
    match uri.to_file_path() {
        Ok(path) => Some(path),
        Err(()) => {
            warn!("Ignoring non-file URI {}", uri);
            None
        }
    }
}
