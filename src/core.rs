pub use crate::error::{FsError, Result, VERSION};

/// Abstract file interface. `RemoteFile` is the only real implementation
/// today, but callers (and the capi layer) only ever see this trait.
pub trait File: Send {
    /// Read up to buf.len() bytes into buf.
    /// Returns number of bytes read (0 = EOF).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Seek to absolute position. Positions past the end are clamped.
    fn seek(&mut self, pos: u64) -> Result<()>;

    /// Seek to `size() as i64 + delta`, clamped the same way `seek` clamps
    /// an absolute position. Fails if the size isn't known.
    fn seek_end(&mut self, delta: i64) -> Result<()> {
        let size = self
            .size()
            .ok_or_else(|| FsError::Protocol("cannot seek from end: unknown file size".into()))?;
        let target = if delta >= 0 {
            size.saturating_add(delta as u64)
        } else {
            size.saturating_sub((-delta) as u64)
        };
        self.seek(target)
    }

    /// Get current position.
    fn tell(&self) -> u64;

    /// Check if at end of file.
    fn eof(&self) -> bool;

    /// Get file size if available.
    /// Returns None for streams, pipes, or chunked responses.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Close the file (optional, called automatically on drop).
    fn close(&mut self) {}

    /// No-op: the remote resource is read-only by contract.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// No-op: the remote resource is read-only by contract.
    fn store_8(&mut self, _byte: u8) -> Result<()> {
        Ok(())
    }

    /// No-op: the remote resource is read-only by contract.
    fn store_buffer(&mut self, _buf: &[u8]) -> Result<()> {
        Ok(())
    }
}

pub trait FileSystem: Send + Sync {
    fn open(&self, path: &str, mode: &str) -> Result<Box<dyn File>>;

    /// Probe whether `path` exists without opening a handle to it.
    fn exists(&self, path: &str) -> bool {
        let _ = path;
        false
    }
}

/// Create a filesystem for the given URL.
pub fn create(url: &str) -> Result<Box<dyn FileSystem>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Box::new(crate::http::HttpFileSystem::new()))
    } else {
        Err(FsError::UnsupportedProtocol(url.to_string()))
    }
}

/// Open a file directly.
pub fn open(url: &str, mode: &str) -> Result<Box<dyn File>> {
    let fs = create(url)?;
    fs.open(url, mode)
}

/// Probe whether `url` exists, without keeping a handle open.
pub fn exists(url: &str) -> bool {
    match create(url) {
        Ok(fs) => fs.exists(url),
        Err(_) => false,
    }
}
