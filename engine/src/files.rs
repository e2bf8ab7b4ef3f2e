//! Workspace file collaborator.
//!
//! All file access the engine performs goes through [`Workspace`]: reads
//! distinguish text from binary at the UTF-8 boundary, writes are atomic
//! (temp file + rename, with a backup-and-restore fallback where the
//! platform refuses to rename over an existing file), and listing walks the
//! tree in deterministic order while respecting ignore rules.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Stand-in content for files that are not valid UTF-8. This exact text is
/// what a prompt sees in place of binary bytes.
pub const BINARY_MARKER: &str = "... <binary file, content omitted> ...";

/// What a read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileBody {
    Text(String),
    Binary,
}

impl FileBody {
    /// The content as prompt text; binary files render as the marker.
    #[must_use]
    pub fn as_prompt_text(&self) -> &str {
        match self {
            FileBody::Text(content) => content,
            FileBody::Binary => BINARY_MARKER,
        }
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, FileBody::Binary)
    }
}

/// One workspace file as rendered into prompts: directory part, file name,
/// and content (binary content already replaced by the marker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub name: String,
    pub content: String,
}

impl SourceFile {
    /// The `path/name` form used by file-block headers.
    #[must_use]
    pub fn qualified_path(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.path, self.name)
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("path escapes the workspace root: {path}")]
    OutsideRoot { path: String },
    #[error("workspace walk failed: {0}")]
    Walk(#[from] ignore::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A directory subtree the engine may read and patch.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a workspace-relative path, refusing absolute paths and any
    /// `..` traversal out of the root.
    fn resolve(&self, rel: &str) -> Result<PathBuf, FileError> {
        let rel_path = Path::new(rel);
        if rel_path.is_absolute() {
            return Err(FileError::OutsideRoot {
                path: rel.to_string(),
            });
        }
        for component in rel_path.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(FileError::OutsideRoot {
                        path: rel.to_string(),
                    });
                }
            }
        }
        Ok(self.root.join(rel_path))
    }

    /// Read a file, classifying non-UTF-8 content as binary.
    pub fn read(&self, rel: &str) -> Result<FileBody, FileError> {
        let path = self.resolve(rel)?;
        let bytes = std::fs::read(path)?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(FileBody::Text(content)),
            Err(_) => Ok(FileBody::Binary),
        }
    }

    /// Atomically replace a file's content, creating parent directories as
    /// needed.
    pub fn write(&self, rel: &str, content: &str) -> Result<(), FileError> {
        let path = self.resolve(rel)?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;

        // Persist (rename) - handle platforms where rename fails if the
        // target exists.
        if let Err(err) = tmp.persist(&path) {
            if path.exists() {
                let backup = path.with_extension("bak");
                let _ = std::fs::remove_file(&backup);
                std::fs::rename(&path, &backup)?;
                if let Err(rename_err) = err.file.persist(&path) {
                    let _ = std::fs::rename(&backup, &path);
                    return Err(rename_err.error.into());
                }
                if let Err(e) = std::fs::remove_file(&backup) {
                    tracing::warn!(
                        path = %backup.display(),
                        "Failed to remove .bak after atomic write: {e}"
                    );
                }
            } else {
                return Err(err.error.into());
            }
        }
        Ok(())
    }

    /// Every file under the root, ordered by qualified path. Ignore rules
    /// (`.gitignore` and friends) apply; binary files carry the marker as
    /// their content.
    pub fn list_all(&self) -> Result<Vec<SourceFile>, FileError> {
        let mut files = Vec::new();
        for entry in ignore::WalkBuilder::new(&self.root).build() {
            let entry = entry?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = rel
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let path = rel
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();

            let body = match std::fs::read(entry.path()) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(content) => content,
                    Err(_) => BINARY_MARKER.to_string(),
                },
                Err(e) => return Err(e.into()),
            };

            files.push(SourceFile {
                path,
                name,
                content: body,
            });
        }
        files.sort_by_key(SourceFile::qualified_path);
        Ok(files)
    }
}
