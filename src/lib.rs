//! # flowfile
//!
//! flowfile lets you read files from HTTP(S) URLs like they're regular files
//! on disk. A dedicated background thread prefetches the bytes ahead of
//! your read position into a bounded ring buffer, so sequential reads
//! return immediately once the worker has a head start; random-access
//! seeks just reset the ring and let the worker catch up at the new
//! position.
//!
//! ## Basic usage
//!
//! ```rust
//! use flowfile::{open, File};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut file = open("https://example.com/data.bin", "r")?;
//!
//! let mut buffer = vec![0u8; 1024];
//! let bytes_read = file.read(&mut buffer)?;
//!
//! file.seek(1000)?;
//!
//! if let Some(size) = file.size() {
//!     println!("File size: {} bytes", size);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## What it does
//!
//! When you read from a remote file, it:
//! - Probes the resource on open with a 2-byte `Range` request to learn its total size
//! - Fetches data in configurable chunks (default 1 MiB) on a dedicated worker thread
//! - Keeps the worker running ahead of you in a bounded ring buffer for sequential reads
//! - Retries failed requests with exponential backoff, then surfaces the failure on read
//! - Concrete file implementations (`RemoteFile`) implement `std::io::Read` and `Seek`
//!
//! ## Using with standard I/O libraries
//!
//! The `open()` function returns `Box<dyn File>`, which uses the `File` trait from this crate.
//! To use with libraries that require `std::io::Read` and `Seek`, wrap it in `FileAdapter`:
//!
//! ```rust
//! use flowfile::{open, FileAdapter};
//! use zip::ZipArchive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = open("https://example.com/archive.zip", "r")?;
//! let mut archive = ZipArchive::new(FileAdapter::new(file))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Tuning the behavior
//!
//! If the defaults don't work for you:
//!
//! ```rust
//! use flowfile::{HttpFileSystem, FileSystem};
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fs = HttpFileSystem::builder()
//!     .chunk_size(512 * 1024)             // fetch 512KB at a time
//!     .ring_capacity(4 * 1024 * 1024)      // keep up to 4MB prefetched ahead of the reader
//!     .retry_max_attempts(5)               // try 5 times before giving up
//!     .connect_timeout(Duration::from_secs(10))
//!     .read_timeout(Duration::from_secs(30))
//!     .build();
//!
//! let mut file = fs.open("https://example.com/large-file.bin", "r")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using it from C
//!
//! Build with `--features capi` to get C bindings:
//!
//! ```c
//! #include <flowfile.h>
//!
//! FlowfileFile* file = flowfile_open_url("https://example.com/data.bin", "r");
//! if (!file) {
//!     fprintf(stderr, "Error: %s\n", flowfile_last_error());
//!     return 1;
//! }
//!
//! char buffer[1024];
//! ssize_t bytes_read = flowfile_read(file, buffer, sizeof(buffer));
//!
//! flowfile_file_close(file);
//! ```
//!
//! ## Some things to know
//!
//! Bigger chunks (256KB to 1MB) work better if you're reading files sequentially on a fast
//! network. Smaller chunks are fine for random access or slower connections.
//!
//! There is no cross-open cache: re-opening the same URL re-probes and re-prefetches from
//! scratch. The `lru` module is a standalone, capacity-bounded cache utility you can layer on
//! top yourself if you want one; the read path does not use it.
//!
//! The library needs servers to support HTTP Range requests (most do). If a server returns 200
//! instead of 206 for a range request, you'll get an error.
//!
//! The `size()` method returns `None` for streams without a known content-length or when the
//! server doesn't provide this information. You can still read from such files, but you won't
//! know their size in advance and cannot seek from the end.
//!
//! ## Errors
//!
//! You'll get different errors for different problems:
//! - Network errors: can't connect, timeout, connection dropped
//! - Protocol errors: server doesn't support ranges, returned wrong data
//! - IO errors: standard Rust IO problems
//! - File closed: you tried to use a file after closing it
//! - Unsupported protocol: right now this means you tried something other than http/https
//!
//! A failed prefetch is retried with exponential backoff; once the retry budget is exhausted
//! the failure is surfaced on the next `read()` call rather than blocking forever.
//!
//! ## Thread safety
//!
//! The FileSystem can be shared between threads safely. Individual File handles can be sent to
//! other threads but shouldn't be used from multiple threads at once (which is the recommended Rust
//! IO pattern anyway).
//!
//! ## Feature flags
//!
//! - `curl` (default): use libcurl for HTTP
//! - `reqwest`: use reqwest instead of curl (don't enable both)
//! - `capi`: build the C API

pub mod core;
pub mod error;
pub mod http;
pub mod lru;
pub mod plug;
pub mod ring;

pub use core::*;
pub use http::*;
pub use plug::*;

#[cfg(feature = "capi")]
pub mod ffi;

use std::io::{self, Read, Seek, SeekFrom};

pub struct FileAdapter {
    inner: Box<dyn File>,
}

impl FileAdapter {
    pub fn new(file: Box<dyn File>) -> Self {
        Self { inner: file }
    }

    pub fn into_inner(self) -> Box<dyn File> {
        self.inner
    }
}

impl From<Box<dyn File>> for FileAdapter {
    fn from(file: Box<dyn File>) -> Self {
        Self::new(file)
    }
}

impl Read for FileAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(io::Error::other)
    }
}

impl Seek for FileAdapter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::Start(offset) => {
                self.inner.seek(offset).map_err(io::Error::other)?;
                Ok(offset)
            }
            SeekFrom::Current(offset) => {
                let current = self.inner.tell();
                let new_pos = if offset >= 0 {
                    current.saturating_add(offset as u64)
                } else {
                    current.saturating_sub((-offset) as u64)
                };
                self.inner.seek(new_pos).map_err(io::Error::other)?;
                Ok(new_pos)
            }
            SeekFrom::End(offset) => {
                self.inner.seek_end(offset).map_err(io::Error::other)?;
                Ok(self.inner.tell())
            }
        }
    }
}
