//! File capability used by the fan-in scenario

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Create/write/close operations a producer performs
///
/// Treated as opaque side effects: whatever happens inside becomes one
/// producer outcome.
#[async_trait]
pub trait FileCapability: Send + Sync {
    type Handle: Send;

    /// Create (or truncate) the named file
    async fn create(&self, name: &str) -> io::Result<Self::Handle>;

    /// Write all of `bytes`, returning the count written
    async fn write(&self, handle: &mut Self::Handle, bytes: &[u8]) -> io::Result<usize>;

    /// Flush and release the handle
    async fn close(&self, handle: Self::Handle) -> io::Result<()>;
}

/// Files on the local filesystem under a root directory
#[derive(Debug, Clone)]
pub struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileCapability for LocalFiles {
    type Handle = File;

    async fn create(&self, name: &str) -> io::Result<File> {
        let path = self.root.join(name);
        debug!(path = %path.display(), "LocalFiles::create: called");
        tokio::fs::create_dir_all(&self.root).await?;
        File::create(&path).await
    }

    async fn write(&self, handle: &mut File, bytes: &[u8]) -> io::Result<usize> {
        debug!(len = bytes.len(), "LocalFiles::write: called");
        handle.write_all(bytes).await?;
        Ok(bytes.len())
    }

    async fn close(&self, mut handle: File) -> io::Result<()> {
        debug!("LocalFiles::close: called");
        handle.flush().await
    }
}
