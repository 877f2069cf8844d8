//! Open editor documents
//!
//! Text is kept in a [`Rope`] so incremental edits are cheap; the version is
//! the one the client sent with the edit.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use ropey::Rope;
use thiserror::Error;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use crate::parsers::position_utils::position_to_byte_offset;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("version {new} is not newer than {current}")]
    StaleVersion { new: i32, current: i32 },
}

#[derive(Debug)]
struct DocumentState {
    text: Rope,
    version: i32,
}

/// A document the client has opened
#[derive(Debug)]
pub struct UmpleDocument {
    uri: Url,
    path: PathBuf,
    state: RwLock<DocumentState>,
}

impl UmpleDocument {
    pub fn new(uri: Url, path: PathBuf, text: &str, version: i32) -> Self {
        Self {
            uri,
            path,
            state: RwLock::new(DocumentState {
                text: Rope::from_str(text),
                version,
            }),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> String {
        self.state.read().text.to_string()
    }

    pub fn version(&self) -> i32 {
        self.state.read().version
    }

    /// Text and version read together
    pub fn snapshot(&self) -> (String, i32) {
        let state = self.state.read();
        (state.text.to_string(), state.version)
    }

    /// Apply the client's edits in order and move to `version`.
    ///
    /// Ranged changes are spliced into the rope; a change without a range
    /// replaces the whole text.
    pub fn apply(&self, changes: &[TextDocumentContentChangeEvent], version: i32) -> Result<String, DocumentError> {
        let mut state = self.state.write();
        if version <= state.version {
            return Err(DocumentError::StaleVersion {
                new: version,
                current: state.version,
            });
        }
        for change in changes {
            match change.range {
                Some(range) => {
                    let start = position_to_byte_offset(&range.start, &state.text);
                    let end = position_to_byte_offset(&range.end, &state.text).max(start);
                    let start_char = state.text.byte_to_char(start);
                    let end_char = state.text.byte_to_char(end);
                    state.text.remove(start_char..end_char);
                    state.text.insert(start_char, &change.text);
                }
                None => state.text = Rope::from_str(&change.text),
            }
        }
        state.version = version;
        Ok(state.text.to_string())
    }
}
