//! Debounced validation
//!
//! Validation requests are coalesced per document: each request pushes the
//! document's deadline out by its delay, and the document is validated once
//! the deadline passes with no newer request. A longer cascade request never
//! delays a pending edit request. Starting a validation cancels the previous
//! one for the same document.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info, trace, warn};

use super::state::{UmpleBackend, ValidationRequest};

/// How often pending deadlines are checked
const TICK: Duration = Duration::from_millis(50);

type Pending = HashMap<Url, (Instant, ValidationRequest)>;

/// Queue `request`, merging it with the document's pending request
fn coalesce(pending: &mut Pending, request: ValidationRequest, now: Instant) {
    let deadline = now + request.delay;
    if let Some((due, queued)) = pending.get_mut(&request.uri) {
        if queued.delay < request.delay {
            *due = (*due).min(deadline);
            trace!("Validation of {} stays due in {:?}", request.uri, due.saturating_duration_since(now));
            return;
        }
    }
    trace!("Validation of {} due in {:?}", request.uri, request.delay);
    pending.insert(request.uri.clone(), (deadline, request));
}

impl UmpleBackend {
    /// Spawns the per-document validation debouncer
    pub(super) fn spawn_validation_debouncer(
        backend: UmpleBackend,
        validation_rx: tokio::sync::mpsc::Receiver<ValidationRequest>,
    ) {
        let mut shutdown_rx = backend.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut requests = Box::pin(ReceiverStream::new(validation_rx).take_until(async move {
                let _ = shutdown_rx.recv().await;
                info!("Validation debouncer received shutdown signal");
            }));

            let mut pending = Pending::new();

            loop {
                tokio::select! {
                    request = requests.next() => {
                        let Some(request) = request else {
                            break;
                        };
                        coalesce(&mut pending, request, Instant::now());
                    }
                    _ = tokio::time::sleep(TICK) => {
                        let now = Instant::now();
                        let ready: Vec<Url> = pending
                            .iter()
                            .filter(|(_, (deadline, _))| *deadline <= now)
                            .map(|(uri, _)| uri.clone())
                            .collect();
                        for uri in ready {
                            if let Some((_, request)) = pending.remove(&uri) {
                                backend.start_validation(request);
                            }
                        }
                    }
                }
            }

            for token in backend.validation_cancel.iter() {
                token.value().cancel();
            }
            info!("Validation debouncer task terminated");
        });
    }

    /// Cancel the document's running validation and start a new one
    fn start_validation(&self, request: ValidationRequest) {
        let Some(document) = self.workspace.document(&request.path) else {
            trace!("Skipping validation of closed document {}", request.uri);
            return;
        };
        let (text, version) = document.snapshot();

        let token = CancellationToken::new();
        if let Some(previous) = self.validation_cancel.insert(request.uri.clone(), token.clone()) {
            previous.cancel();
            trace!("Cancelled previous validation for {}", request.uri);
        }

        let backend = self.clone();
        tokio::spawn(async move {
            match backend
                .workspace
                .validate(&request.path, &text, version, &token)
                .await
            {
                Ok(Some(diagnostics))
                    if !token.is_cancelled() && backend.workspace.is_current(&request.path, version) =>
                {
                    backend
                        .client
                        .publish_diagnostics(request.uri, diagnostics, Some(version))
                        .await;
                }
                Ok(_) => debug!("Validation of {} (version {}) not published", request.uri, version),
                Err(e) if e.is_setup_problem() => backend.report_setup_problem(e.to_string()).await,
                Err(e) => warn!("Validation failed for {}: {}", request.uri, e),
            }
        });
    }
}
