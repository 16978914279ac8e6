use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::EngineError;

/// A text source read from the working tree.
///
/// Holds the exact text analyzed and a fingerprint of the bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Path relative to the run root, `/`-separated.
    pub path: String,
    pub text: String,
    pub size_bytes: u64,
    /// Hex-encoded SHA-256 of the file bytes.
    pub sha256: String,
}

impl Document {
    /// Build a document from in-memory text, as if read from `path`.
    pub fn from_text(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            path: path.into(),
            size_bytes: text.len() as u64,
            sha256: sha256_hex(text.as_bytes()),
            text,
        }
    }

    /// File name component of `path`.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Read a document relative to `root`.
///
/// The fingerprint depends only on file bytes; invalid UTF-8 is replaced
/// rather than rejected so a stray byte never blocks validation.
pub fn read_document(root: &Path, rel: &Path) -> Result<Document, EngineError> {
    let full = root.join(rel);
    let bytes = fs::read(&full).map_err(|e| EngineError::source(&full, e))?;

    Ok(Document {
        path: display_path(rel),
        size_bytes: bytes.len() as u64,
        sha256: sha256_hex(&bytes),
        text: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Render a relative path with `/` separators for reports and git.
pub fn display_path(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Expand a configured source into files, relative to `root`.
///
/// Files are returned as-is; directories yield their `*.md` files
/// recursively, sorted. Returns `None` when the path does not exist.
pub fn expand_source(root: &Path, rel: &Path) -> Option<Vec<PathBuf>> {
    let full = root.join(rel);
    if full.is_file() {
        return Some(vec![rel.to_path_buf()]);
    }
    if !full.is_dir() {
        return None;
    }
    let mut files: Vec<PathBuf> = list_files(&full)
        .into_iter()
        .filter(|p| {
            p.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        })
        .filter_map(|p| p.strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    Some(files)
}

/// All regular files under `dir`, recursively. Missing directories are empty.
pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}
