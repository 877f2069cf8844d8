//! Shadow workspaces for the external validator
//!
//! The validator only sees files on disk, while the editor may hold unsaved
//! changes. A shadow workspace is a temporary mirror of the document and the
//! files it imports: unsaved content is written out, everything else is
//! symlinked (or copied where symlinks are not allowed).
//!
//! Files keep their layout relative to the deepest directory that contains
//! all of them, so relative `use` paths resolve the same way inside the
//! mirror. The directory is removed by [`ShadowWorkspace::cleanup`] or, on any
//! other exit path, when the workspace is dropped.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::lsp::diagnostic_provider::ValidatorError;
use crate::lsp::imports::{Overlays, normalize_path};

/// Deepest directory containing every path in `paths`
pub fn common_ancestor<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    let mut ancestor: Option<PathBuf> = None;
    for path in paths {
        let dir = path.parent().unwrap_or(path);
        ancestor = Some(match ancestor {
            None => dir.to_path_buf(),
            Some(current) => {
                let mut candidate = current.as_path();
                while !dir.starts_with(candidate) {
                    candidate = candidate.parent()?;
                }
                candidate.to_path_buf()
            }
        });
    }
    ancestor
}

/// Content written for the document itself. The validator misreports errors
/// on the last line unless the file ends with a blank line.
pub fn with_trailing_blank_line(content: &str) -> String {
    let mut text = content.to_string();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    if !text.ends_with("\n\n") {
        text.push('\n');
    }
    text
}

/// Translates paths the validator reports inside a shadow tree back to the
/// files they mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowPaths {
    root: PathBuf,
    ancestor: PathBuf,
    target_dir: PathBuf,
}

impl ShadowPaths {
    pub fn new(root: &Path, ancestor: &Path, target: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ancestor: ancestor.to_path_buf(),
            target_dir: target.parent().unwrap_or(root).to_path_buf(),
        }
    }

    /// Original path for a file name reported by the validator.
    ///
    /// Relative names resolve against the document's shadow directory, where
    /// the validator runs. A bare file name carries no directory and yields
    /// `None`.
    pub fn original(&self, reported: &str) -> Option<PathBuf> {
        let path = Path::new(reported);
        if !path.is_absolute() && path.components().count() < 2 {
            return None;
        }
        let shadowed = normalize_path(&self.target_dir.join(path));
        match shadowed.strip_prefix(&self.root) {
            Ok(relative) => Some(self.ancestor.join(relative)),
            Err(_) if path.is_absolute() => Some(shadowed),
            Err(_) => None,
        }
    }

    /// `file` relative to the mirrored directory, for messages
    pub fn display<'a>(&self, file: &'a Path) -> &'a Path {
        file.strip_prefix(&self.ancestor).unwrap_or(file)
    }
}

/// A temporary mirror of one document and its reachable files
#[derive(Debug)]
pub struct ShadowWorkspace {
    dir: TempDir,
    ancestor: PathBuf,
    target: PathBuf,
    materialized: Vec<PathBuf>,
}

impl ShadowWorkspace {
    /// Materialize `document` (with live `content`) and every file in
    /// `reachable` under a fresh temporary directory.
    pub async fn create(
        document: &Path,
        content: &str,
        reachable: &HashSet<PathBuf>,
        overlays: &Overlays,
        token: &CancellationToken,
    ) -> Result<Self, ValidatorError> {
        let document = normalize_path(document);
        let files: Vec<PathBuf> = reachable
            .iter()
            .map(|path| normalize_path(path))
            .filter(|path| path != &document)
            .collect();

        let ancestor = common_ancestor(files.iter().map(PathBuf::as_path).chain([document.as_path()]))
            .ok_or_else(|| io::Error::other("no common ancestor for shadow workspace"))?;
        let dir = tempfile::Builder::new().prefix("umple-shadow-").tempdir()?;
        debug!(
            "Shadow workspace {} mirrors {} ({} imported file(s))",
            dir.path().display(),
            ancestor.display(),
            files.len()
        );

        let mut workspace = Self {
            target: shadow_path(dir.path(), &ancestor, &document)?,
            dir,
            ancestor,
            materialized: Vec::new(),
        };

        for file in &files {
            if token.is_cancelled() {
                return Err(ValidatorError::Cancelled);
            }
            let shadow = shadow_path(workspace.dir.path(), &workspace.ancestor, file)?;
            if let Some(parent) = shadow.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            if let Some(text) = overlays.get(file) {
                tokio::fs::write(&shadow, text).await?;
            } else if tokio::fs::metadata(file).await.map(|m| m.is_file()).unwrap_or(false) {
                link_or_copy(file, &shadow).await?;
            } else {
                trace!("Skipping missing import {}", file.display());
                continue;
            }
            workspace.materialized.push(shadow);
        }

        if token.is_cancelled() {
            return Err(ValidatorError::Cancelled);
        }
        if let Some(parent) = workspace.target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&workspace.target, with_trailing_blank_line(content)).await?;
        workspace.materialized.push(workspace.target.clone());
        Ok(workspace)
    }

    /// The document's path inside the shadow tree
    pub fn target_file(&self) -> &Path {
        &self.target
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path mapping that outlives the shadow tree
    pub fn paths(&self) -> ShadowPaths {
        ShadowPaths::new(self.dir.path(), &self.ancestor, &self.target)
    }

    /// Every path written or linked, the target last
    pub fn materialized(&self) -> &[PathBuf] {
        &self.materialized
    }

    /// Remove the shadow tree now
    pub fn cleanup(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        trace!("Removed shadow workspace {}", path.display());
        Ok(())
    }
}

fn shadow_path(root: &Path, ancestor: &Path, file: &Path) -> io::Result<PathBuf> {
    let relative = file.strip_prefix(ancestor).map_err(|_| {
        io::Error::other(format!("{} is outside {}", file.display(), ancestor.display()))
    })?;
    Ok(root.join(relative))
}

async fn link_or_copy(original: &Path, shadow: &Path) -> io::Result<()> {
    #[cfg(unix)]
    let linked = tokio::fs::symlink(original, shadow).await;
    #[cfg(windows)]
    let linked = tokio::fs::symlink_file(original, shadow).await;
    #[cfg(not(any(unix, windows)))]
    let linked: io::Result<()> = Err(io::Error::other("symlinks unsupported"));

    if let Err(e) = linked {
        warn!("Symlink {} failed ({}), copying instead", shadow.display(), e);
        tokio::fs::copy(original, shadow).await?;
    }
    Ok(())
}
