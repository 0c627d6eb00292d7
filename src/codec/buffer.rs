//! Fixed-capacity byte buffer.

use super::error::Error;
use heapless::Vec;

/// A byte container with a fixed capacity `C` and a current length.
///
/// The storage is a `heapless::Vec` and never reallocates. Every mutating operation either succeeds
/// completely or leaves the buffer untouched and reports why.
///
/// # Examples
///
/// ```rust
/// use mqtt_rpc::codec::{Error, FixedBuffer};
///
/// let mut buf = FixedBuffer::<4>::new();
/// buf.append(&[1, 2, 3]).unwrap();
/// assert_eq!(buf.append(&[4, 5]), Err(Error::CapacityExceeded));
/// assert_eq!(buf.as_slice(), &[1, 2, 3]);
///
/// buf.replace(1, 1, &[7, 8]).unwrap();
/// assert_eq!(buf.as_slice(), &[1, 7, 8, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedBuffer<const C: usize> {
    bytes: Vec<u8, C>,
}

impl<const C: usize> FixedBuffer<C> {
    /// Create an empty buffer.
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Total number of bytes the buffer can hold.
    pub const fn capacity(&self) -> usize {
        C
    }

    /// Number of bytes currently stored.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when no bytes are stored.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `true` when the buffer is at capacity.
    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    /// Free space left before the buffer is full.
    pub fn remaining(&self) -> usize {
        C - self.bytes.len()
    }

    /// The stored bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Drop all stored bytes.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Shorten the buffer to `len` bytes. Has no effect if `len` is not
    /// smaller than the current length.
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// Copy `data` onto the end of the buffer.
    pub fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        self.bytes
            .extend_from_slice(data)
            .map_err(|_| Error::CapacityExceeded)
    }

    /// Append a single byte.
    pub fn append_u8(&mut self, value: u8) -> Result<(), Error> {
        self.bytes.push(value).map_err(|_| Error::CapacityExceeded)
    }

    /// Append a big-endian `u16`.
    pub fn append_u16_be(&mut self, value: u16) -> Result<(), Error> {
        self.append(&value.to_be_bytes())
    }

    /// Store one byte read from the wire.
    pub fn push_received(&mut self, byte: u8) -> Result<(), Error> {
        self.append_u8(byte)
    }

    /// Borrow `size` bytes starting at `offset`.
    pub fn get(&self, offset: usize, size: usize) -> Result<&[u8], Error> {
        let end = self.checked_end(offset, size)?;
        Ok(&self.bytes[offset..end])
    }

    /// Mutably borrow `size` bytes starting at `offset`.
    pub fn get_mut(&mut self, offset: usize, size: usize) -> Result<&mut [u8], Error> {
        let end = self.checked_end(offset, size)?;
        Ok(&mut self.bytes[offset..end])
    }

    /// Read the byte at `offset`.
    pub fn get_u8(&self, offset: usize) -> Result<u8, Error> {
        Ok(self.get(offset, 1)?[0])
    }

    /// Read a big-endian `u16` at `offset`.
    pub fn get_u16_be(&self, offset: usize) -> Result<u16, Error> {
        let bytes = self.get(offset, 2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Replace the `old_size` bytes at `offset` with `data`.
    ///
    /// `data` may be shorter or longer than the range it replaces; the bytes
    /// after the edit point move accordingly and the length is adjusted.
    pub fn replace(&mut self, offset: usize, old_size: usize, data: &[u8]) -> Result<(), Error> {
        let old_end = self.checked_end(offset, old_size)?;
        let old_len = self.bytes.len();
        let new_len = old_len - old_size + data.len();
        if new_len > C {
            return Err(Error::CapacityExceeded);
        }
        let new_end = offset + data.len();
        if new_len > old_len {
            self.bytes
                .resize(new_len, 0)
                .map_err(|_| Error::CapacityExceeded)?;
        }
        self.bytes.copy_within(old_end..old_len, new_end);
        self.bytes.truncate(new_len);
        self.bytes[offset..new_end].copy_from_slice(data);
        Ok(())
    }

    /// Insert `data` at `offset`, moving the tail back.
    pub fn insert(&mut self, offset: usize, data: &[u8]) -> Result<(), Error> {
        self.replace(offset, 0, data)
    }

    /// Remove `size` bytes at `offset`, moving the tail forward.
    pub fn remove(&mut self, offset: usize, size: usize) -> Result<(), Error> {
        self.replace(offset, size, &[])
    }

    fn checked_end(&self, offset: usize, size: usize) -> Result<usize, Error> {
        offset
            .checked_add(size)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(Error::OutOfBounds)
    }
}

impl<const C: usize> Default for FixedBuffer<C> {
    fn default() -> Self {
        Self::new()
    }
}
