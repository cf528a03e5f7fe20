//! Opaque byte stores backing [`ExternalTable`](crate::table::ExternalTable).
//!
//! A store exposes a flat, fixed-length byte range. Implementations may copy
//! on read (files, remote blobs) or lend their memory directly.

use std::borrow::Cow;

use crate::dtype::Element;
use crate::error::{Result, TableError};

/// Random-access byte storage of fixed length.
pub trait ByteStore: Send + Sync {
    /// Total number of bytes.
    fn len(&self) -> usize;

    /// Whether the store holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read `len` bytes starting at `offset`.
    fn read_range(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>>;

    /// Overwrite `bytes.len()` bytes starting at `offset`.
    fn write_range(&mut self, offset: usize, bytes: &[u8]) -> Result<()>;
}

/// In-memory [`ByteStore`] over a `Vec<u8>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryByteStore {
    bytes: Vec<u8>,
}

impl MemoryByteStore {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Store holding the native-endian bytes of `values`.
    pub fn from_elements<T: Element>(values: &[T]) -> Self {
        Self::new(bytemuck::cast_slice(values).to_vec())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }

    fn range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>> {
        match offset.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(offset..end),
            _ => Err(TableError::Store(format!(
                "byte range {offset}+{len} exceeds store of {} bytes",
                self.bytes.len()
            ))),
        }
    }
}

impl ByteStore for MemoryByteStore {
    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn read_range(&self, offset: usize, len: usize) -> Result<Cow<'_, [u8]>> {
        let range = self.range(offset, len)?;
        Ok(Cow::Borrowed(&self.bytes[range]))
    }

    fn write_range(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let range = self.range(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }
}
