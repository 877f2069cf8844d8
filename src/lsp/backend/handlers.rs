//! LSP protocol handler implementations
//!
//! - Lifecycle handlers (initialize, initialized, shutdown)
//! - Document lifecycle (did_open, did_change, did_save, did_close)
//! - Navigation (goto_definition) and outline (document_symbol)
//! - Completion

use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, DidSaveTextDocumentParams, DocumentSymbolParams,
    DocumentSymbolResponse, GotoDefinitionParams, GotoDefinitionResponse, InitializeParams, InitializeResult,
    InitializedParams, Location, OneOf, Range, SaveOptions, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url,
};
use tower_lsp::{LanguageServer, jsonrpc};
use tracing::{debug, info, warn};

use super::file_path;
use super::state::UmpleBackend;
use crate::config::InitializationOptions;

#[tower_lsp::async_trait]
impl LanguageServer for UmpleBackend {
    async fn initialize(&self, params: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        info!("Received initialize from {:?}", params.client_info.as_ref().map(|c| &c.name));
        let options = InitializationOptions::from_value(params.initialization_options.as_ref());
        self.configure(&options);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::INCREMENTAL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(false),
                    })),
                    ..Default::default()
                })),
                definition_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["/".to_string(), ".".to_string()]),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Initialized");
        let reason = self.disabled_reason.read().clone();
        if let Some(reason) = reason {
            self.report_setup_problem(reason).await;
        }
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        info!("Received shutdown request");
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        info!("Opening document: URI={}, version={}", uri, version);
        let Some(path) = file_path(&uri) else {
            return;
        };

        let document = self.workspace.open_document(uri.clone(), &path, &params.text_document.text, version);
        self.schedule_validation(uri, document.path().to_path_buf(), self.validation_debounce())
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        debug!("textDocument/didChange: URI={}, version={}", uri, version);
        let Some(path) = file_path(&uri) else {
            return;
        };

        match self.workspace.change_document(&path, &params.content_changes, version) {
            Some(Ok(document)) => {
                self.schedule_validation(uri, document.path().to_path_buf(), self.validation_debounce())
                    .await;
                self.schedule_dependents(document.path()).await;
            }
            Some(Err(e)) => warn!("Failed to apply changes to {}: {}", uri, e),
            None => warn!("Failed to find document with URI={}", uri),
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("textDocument/didSave: {}", uri);
        let Some(path) = file_path(&uri) else {
            return;
        };
        if let Some(document) = self.workspace.document(&path) {
            self.schedule_validation(uri, document.path().to_path_buf(), self.validation_debounce())
                .await;
        }
        self.schedule_dependents(&path).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("Closing document: {}", uri);
        self.cancel_validation(&uri);
        if let Some(path) = file_path(&uri) {
            if self.workspace.close_document(&path).await.is_some() {
                // Importers now see the saved file instead of the editor buffer
                self.schedule_dependents(&path).await;
            } else {
                warn!("Failed to find document with URI={}", uri);
            }
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn completion(&self, params: CompletionParams) -> LspResult<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some(path) = file_path(&uri) else {
            return Ok(None);
        };
        let Some(document) = self.workspace.document(&path) else {
            return Ok(None);
        };

        let items = self
            .workspace
            .completion_items_at(
                document.path(),
                &document.text(),
                position.line as usize,
                position.character as usize,
            )
            .await;
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> LspResult<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some(path) = file_path(&uri) else {
            return Ok(None);
        };
        let Some(document) = self.workspace.document(&path) else {
            return Ok(None);
        };
        let text = document.text();
        let (line, col) = (position.line as usize, position.character as usize);

        if let Some(target) = self.workspace.import_target(document.path(), &text, line, col) {
            if tokio::fs::metadata(&target).await.map(|m| m.is_file()).unwrap_or(false) {
                if let Ok(target_uri) = Url::from_file_path(&target) {
                    return Ok(Some(GotoDefinitionResponse::Scalar(Location::new(
                        target_uri,
                        Range::default(),
                    ))));
                }
            }
            return Ok(None);
        }

        let locations: Vec<Location> = self
            .workspace
            .definition_at(document.path(), &text, line, col)
            .await
            .into_iter()
            .filter_map(|entry| Url::from_file_path(&entry.file).ok().map(|uri| Location::new(uri, entry.range)))
            .collect();

        Ok(match locations.len() {
            0 => None,
            1 => locations.into_iter().next().map(GotoDefinitionResponse::Scalar),
            _ => Some(GotoDefinitionResponse::Array(locations)),
        })
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> LspResult<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some(path) = file_path(&uri) else {
            return Ok(None);
        };
        let Some(document) = self.workspace.document(&path) else {
            return Ok(None);
        };
        let symbols = self.workspace.document_symbols(document.path(), &document.text());
        Ok(Some(DocumentSymbolResponse::Nested(symbols)))
    }
}
