//! A network abstraction layer for embedded systems
//!
//! Transports are described by the small synchronous traits below. A
//! connection is anything that can [`Read`], [`Write`] and [`Close`]; a
//! [`Connect`] implementation opens connections to a `"host:port"` remote.
//!
//! The protocol layers only ever talk to a connection through [`IoStream`],
//! a byte-level view that every `Read + Write` type gets for free. A TLS
//! session is just another connection implementing the same traits.

#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Interrupt-safe byte queue feeding a connection
pub mod fifo;

/// Application-layer protocols built on the transport traits
pub mod application;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, IoStream, Read, ReadStatus, Write};
}

/// Read bytes from a connection.
pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read available data into `buf`. `Ok(0)` means nothing is available yet.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Write bytes to a connection.
pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Close a connection.
pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection to `remote`, given as `"host:port"`.
    fn connect(&mut self, remote: &str) -> Result<Self::Connection, Self::Error>;
}

/// Outcome of a single non-blocking byte read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Nothing is available right now.
    NoData,
    /// One byte was read.
    Data(u8),
    /// The transport failed.
    Error,
}

/// Byte-level stream contract used by the protocol state machines.
pub trait IoStream {
    /// Read one byte without blocking.
    fn read_byte(&mut self) -> ReadStatus;
    /// Write all of `buf`. Returns `false` if the transport failed or stopped
    /// accepting data.
    fn write_bytes(&mut self, buf: &[u8]) -> bool;
}

impl<T: Read + Write> IoStream for T {
    fn read_byte(&mut self) -> ReadStatus {
        let mut byte = [0u8; 1];
        match self.read(&mut byte) {
            Ok(0) => ReadStatus::NoData,
            Ok(_) => ReadStatus::Data(byte[0]),
            Err(_) => ReadStatus::Error,
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> bool {
        let mut written = 0;
        while written < buf.len() {
            match self.write(&buf[written..]) {
                Ok(0) | Err(_) => return false,
                Ok(n) => written += n,
            }
        }
        self.flush().is_ok()
    }
}
