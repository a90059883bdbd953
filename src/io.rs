//! Container backends holding the named streams of an XRM/TXRM file

use crate::error::{Result, XrmError};
use bytes::Bytes;
use cfb::CompoundFile;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

/// Named-stream access to a compound-file container
///
/// Reads take `&mut self`: a handle serves one stream at a time.
pub trait Container {
    /// Check if a stream exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Read the whole stream at `path`
    fn read(&mut self, path: &str) -> Result<Bytes>;

    /// Get the length of the stream at `path`
    fn size(&self, path: &str) -> Result<usize>;
}

/// Container backed by an OLE2 compound file
pub struct CompoundFileContainer<F> {
    inner: CompoundFile<F>,
}

impl CompoundFileContainer<File> {
    /// Open a compound file on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!(path = %path.display(), "opening compound file");
        Self::from_reader(file)
    }
}

impl<F: Read + Seek> CompoundFileContainer<F> {
    /// Wrap any seekable byte source holding a compound file
    pub fn from_reader(reader: F) -> Result<Self> {
        let inner = CompoundFile::open(reader).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                XrmError::NotAContainer(e.to_string())
            }
            _ => XrmError::Io(e),
        })?;
        Ok(Self { inner })
    }
}

impl<F: Read + Seek> Container for CompoundFileContainer<F> {
    fn exists(&self, path: &str) -> bool {
        self.inner.is_stream(path)
    }

    fn read(&mut self, path: &str) -> Result<Bytes> {
        if !self.exists(path) {
            return Err(XrmError::MissingField(path.to_string()));
        }
        let mut stream = self.inner.open_stream(path)?;
        let mut data = Vec::with_capacity(stream.len() as usize);
        stream.read_to_end(&mut data)?;
        Ok(Bytes::from(data))
    }

    fn size(&self, path: &str) -> Result<usize> {
        if !self.exists(path) {
            return Err(XrmError::MissingField(path.to_string()));
        }
        let entry = self.inner.entry(path)?;
        Ok(entry.len() as usize)
    }
}

/// Container holding its streams in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    streams: HashMap<String, Bytes>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a stream
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Bytes>) {
        self.streams.insert(path.into(), data.into());
    }

    /// Builder form of [`MemoryContainer::insert`]
    pub fn with_stream(mut self, path: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(path, data);
        self
    }
}

impl Container for MemoryContainer {
    fn exists(&self, path: &str) -> bool {
        self.streams.contains_key(path)
    }

    fn read(&mut self, path: &str) -> Result<Bytes> {
        self.streams
            .get(path)
            .cloned()
            .ok_or_else(|| XrmError::MissingField(path.to_string()))
    }

    fn size(&self, path: &str) -> Result<usize> {
        self.streams
            .get(path)
            .map(|data| data.len())
            .ok_or_else(|| XrmError::MissingField(path.to_string()))
    }
}

impl<C: Container + ?Sized> Container for &mut C {
    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }

    fn read(&mut self, path: &str) -> Result<Bytes> {
        (**self).read(path)
    }

    fn size(&self, path: &str) -> Result<usize> {
        (**self).size(path)
    }
}
