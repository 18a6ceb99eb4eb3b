//! Saving downloaded responses.

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::base::predicates;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::HeaderMap;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

/// Name used when nothing better is known.
pub const DEFAULT_FILE_NAME: &str = "download";

/// Persists the body of a successful download.
pub trait FileSaver: Send + Sync {
    /// Store `contents` under `file_name` and return where it went.
    fn save(&self, file_name: &str, contents: Bytes) -> BoxFuture<'static, Result<PathBuf, NetError>>;
}

impl<S: FileSaver + ?Sized> FileSaver for std::sync::Arc<S> {
    fn save(&self, file_name: &str, contents: Bytes) -> BoxFuture<'static, Result<PathBuf, NetError>> {
        (**self).save(file_name, contents)
    }
}

/// Writes downloads into a directory.
#[derive(Debug, Clone)]
pub struct FsSaver {
    dir: PathBuf,
}

impl Default for FsSaver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FsSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path for `file_name`. Directory components are stripped so a
    /// server-provided name cannot escape the directory.
    pub fn target(&self, file_name: &str) -> PathBuf {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME);
        self.dir.join(name)
    }
}

impl FileSaver for FsSaver {
    fn save(&self, file_name: &str, contents: Bytes) -> BoxFuture<'static, Result<PathBuf, NetError>> {
        let path = self.target(file_name);
        async move {
            tokio::fs::write(&path, &contents).await.file_context(&path)?;
            tracing::debug!(path = %path.display(), bytes = contents.len(), "download saved");
            Ok(path)
        }
        .boxed()
    }
}

/// Pick the file name for a download: the explicit one, then the
/// `Content-Disposition` filename, then the last part of the URL path.
pub fn resolve_file_name(
    explicit: Option<&str>,
    headers: &HeaderMap,
    path_segments: &[String],
) -> String {
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    if let Some(name) = predicates::header_filename(headers) {
        return name;
    }
    path_segments
        .last()
        .and_then(|segment| segment.rsplit('/').next())
        .map(|last| percent_decode_str(last).decode_utf8_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string())
}
