//! Static file serving under a fixed root.
//!
//! [`StaticFiles`] maps a wildcard capture to a file below its root. The
//! router mounts it with [`Router::static_files`](crate::Router::static_files).
//!
//! # Security
//!
//! The capture is percent-decoded once, then rejected with 403 if it:
//!
//! - contains a `..` component
//! - is absolute, or starts with a drive prefix such as `C:`
//! - contains a backslash or NUL byte
//! - canonicalizes (following symlinks) to a path outside the root
//!
//! Missing files and directories without `index.html` are 404.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use http::{Method, StatusCode};
use thiserror::Error;

/// File served for a directory request.
pub const INDEX_FILE: &str = "index.html";

/// Errors that can occur when serving static files.
#[derive(Debug, Error)]
pub enum StaticFileError {
    /// The requested file was not found.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The path escapes the root or is malformed.
    #[error("forbidden path: {0}")]
    Forbidden(String),

    /// Only GET and HEAD are served.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// I/O error while reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StaticFileError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            Self::Io(_) => "INTERNAL_ERROR",
        }
    }
}

/// A file ready to be written to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    /// Canonical path that was read
    pub path: PathBuf,
    /// Guessed media type
    pub content_type: &'static str,
    /// File size in bytes
    pub len: u64,
    /// File contents; empty for HEAD
    pub body: Bytes,
}

/// Serves files below one canonical root directory.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    /// Creates a server for `root`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if `root` does not exist or cannot be
    /// canonicalized.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            root: root.as_ref().canonicalize()?,
        })
    }

    /// Returns the canonical root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads the file addressed by the raw (still percent-encoded) capture.
    pub fn serve(&self, method: &Method, capture: &str) -> Result<StaticFile, StaticFileError> {
        if method != Method::GET && method != Method::HEAD {
            return Err(StaticFileError::MethodNotAllowed);
        }

        let mut path = self.resolve(capture)?;
        if path.is_dir() {
            path = self.contain(&path.join(INDEX_FILE), capture)?;
            if !path.is_file() {
                return Err(StaticFileError::NotFound(capture.to_string()));
            }
        }

        let len = std::fs::metadata(&path)?.len();
        let body = if method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(std::fs::read(&path)?)
        };

        Ok(StaticFile {
            content_type: mime_type(&path),
            path,
            len,
            body,
        })
    }

    /// Decodes and validates a capture, returning the canonical target.
    pub fn resolve(&self, capture: &str) -> Result<PathBuf, StaticFileError> {
        let decoded = urlencoding::decode(capture)
            .map_err(|_| StaticFileError::Forbidden("invalid percent-encoding".to_string()))?;

        if decoded.contains('\0') || decoded.contains('\\') {
            return Err(StaticFileError::Forbidden(
                "backslash or NUL in path".to_string(),
            ));
        }
        if has_drive_prefix(&decoded) {
            return Err(StaticFileError::Forbidden("drive prefix in path".to_string()));
        }

        let relative = Path::new(&*decoded);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(StaticFileError::Forbidden(
                        "directory traversal not allowed".to_string(),
                    ));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(StaticFileError::Forbidden(
                        "absolute path not allowed".to_string(),
                    ));
                }
            }
        }

        self.contain(&self.root.join(relative), capture)
    }

    /// Canonicalizes `candidate` and checks it stays under the root.
    fn contain(&self, candidate: &Path, capture: &str) -> Result<PathBuf, StaticFileError> {
        let canonical = candidate.canonicalize().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StaticFileError::NotFound(capture.to_string()),
            _ => StaticFileError::Io(e),
        })?;

        if !canonical.starts_with(&self.root) {
            return Err(StaticFileError::Forbidden(
                "path escapes root directory".to_string(),
            ));
        }
        Ok(canonical)
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Guesses a media type from the file extension.
#[must_use]
pub fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "md" => "text/markdown; charset=utf-8",

        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",

        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",

        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",
        "mp4" => "video/mp4",
        "webm" => "video/webm",

        _ => "application/octet-stream",
    }
}
