//! Lazy, pull-driven byte streams.
//!
//! # Overview
//!
//! A [`ByteStream`] is a single-pass iterator of `io::Result<Vec<u8>>` chunks.
//! Nothing is read until the consumer asks for the next chunk, and every
//! combinator holds at most what it needs to answer one request, so memory
//! stays bounded no matter how large the underlying file is.
//!
//! Streams are not rewindable. To read the same data again, call the
//! constructor again (e.g. [`ByteStream::from_file`] reopens the file).
//!
//! # Example
//!
//! ```no_run
//! use treedupe::scanner::{ByteStream, HashAlgorithm};
//! use std::path::Path;
//!
//! let padded = ByteStream::from_file(Path::new("data.bin"))
//!     .concat(ByteStream::zeros())
//!     .take(1 << 20);
//! let digest = padded.digest(HashAlgorithm::Blake3).unwrap();
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use super::hasher::{Hash, HashAlgorithm, Hasher};

/// Chunk size used for file reads and zero padding (100 KiB).
pub const CHUNK_SIZE: usize = 102_400;

type Chunks = Box<dyn Iterator<Item = io::Result<Vec<u8>>> + Send>;

/// A lazy, chunked byte sequence.
pub struct ByteStream {
    inner: Chunks,
}

impl ByteStream {
    /// Wrap any chunk iterator.
    pub fn new<I>(chunks: I) -> Self
    where
        I: Iterator<Item = io::Result<Vec<u8>>> + Send + 'static,
    {
        Self {
            inner: Box::new(chunks),
        }
    }

    /// A stream with no chunks.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// A stream of exactly one chunk.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(std::iter::once(Ok(bytes)))
    }

    /// Sequential chunked read of a file.
    ///
    /// The file is opened on the first pull; an open failure is yielded as
    /// the first item.
    #[must_use]
    pub fn from_file(path: &Path) -> Self {
        Self::new(FileChunks {
            path: path.to_path_buf(),
            file: None,
            done: false,
        })
    }

    /// Infinite stream of zero-filled chunks.
    #[must_use]
    pub fn zeros() -> Self {
        Self::new(std::iter::repeat_with(|| Ok(vec![0u8; CHUNK_SIZE])))
    }

    /// This stream followed by `other`.
    #[must_use]
    pub fn concat(self, other: ByteStream) -> Self {
        Self::new(self.inner.chain(other.inner))
    }

    /// Stop after `limit` bytes, truncating the final chunk.
    #[must_use]
    pub fn take(self, limit: u64) -> Self {
        Self::new(Take {
            inner: self.inner,
            remaining: limit,
        })
    }

    /// Re-buffer into chunks of exactly `size` bytes, plus a final short
    /// chunk if bytes remain.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[must_use]
    pub fn rechunk(self, size: usize) -> Self {
        assert!(size > 0, "rechunk size must be non-zero");
        Self::new(Rechunk {
            inner: self.inner,
            size,
            buffer: Vec::with_capacity(size),
            done: false,
        })
    }

    /// Report the length of every chunk as it passes through.
    #[must_use]
    pub fn observe<F>(self, mut on_chunk: F) -> Self
    where
        F: FnMut(usize) + Send + 'static,
    {
        Self::new(self.inner.inspect(move |chunk| {
            if let Ok(bytes) = chunk {
                on_chunk(bytes.len());
            }
        }))
    }

    /// Consume the stream into a digest.
    ///
    /// # Errors
    ///
    /// Returns the first error yielded by the stream.
    pub fn digest(self, algorithm: HashAlgorithm) -> io::Result<Hash> {
        let mut hasher = Hasher::new(algorithm);
        for chunk in self {
            hasher.update(&chunk?);
        }
        Ok(hasher.finalize())
    }

    /// Copy the whole stream into a writer.
    ///
    /// # Errors
    ///
    /// Returns stream errors and write errors.
    pub fn write_to<W: io::Write>(self, mut writer: W) -> io::Result<u64> {
        let mut written = 0u64;
        for chunk in self {
            let chunk = chunk?;
            writer.write_all(&chunk)?;
            written += chunk.len() as u64;
        }
        writer.flush()?;
        Ok(written)
    }
}

impl Iterator for ByteStream {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}

struct FileChunks {
    path: PathBuf,
    file: Option<File>,
    done: bool,
}

impl Iterator for FileChunks {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.file.is_none() {
            match File::open(&self.path) {
                Ok(f) => self.file = Some(f),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        let file = self.file.as_mut()?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut filled = 0;
        // Fill the whole chunk unless EOF comes first.
        while filled < CHUNK_SIZE {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    self.file = None;
                    return Some(Err(e));
                }
            }
        }
        if filled < CHUNK_SIZE {
            self.done = true;
            self.file = None;
            if filled == 0 {
                return None;
            }
        }
        buf.truncate(filled);
        Some(Ok(buf))
    }
}

struct Take {
    inner: Chunks,
    remaining: u64,
}

impl Iterator for Take {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.inner.next()? {
            Ok(mut chunk) => {
                if chunk.len() as u64 > self.remaining {
                    chunk.truncate(self.remaining as usize);
                }
                self.remaining -= chunk.len() as u64;
                Some(Ok(chunk))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

struct Rechunk {
    inner: Chunks,
    size: usize,
    buffer: Vec<u8>,
    done: bool,
}

impl Iterator for Rechunk {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.buffer.len() < self.size {
            match self.inner.next() {
                Some(Ok(piece)) => self.buffer.extend_from_slice(&piece),
                Some(Err(e)) => {
                    self.done = true;
                    self.buffer.clear();
                    return Some(Err(e));
                }
                None => self.done = true,
            }
        }
        if self.buffer.is_empty() {
            return None;
        }
        if self.buffer.len() <= self.size {
            return Some(Ok(std::mem::take(&mut self.buffer)));
        }
        let rest = self.buffer.split_off(self.size);
        Some(Ok(std::mem::replace(&mut self.buffer, rest)))
    }
}
