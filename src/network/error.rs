//! Common error types for network operations

use crate::codec;

/// A common error type for the transport and MQTT client layers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An operation needs an established MQTT session.
    NotConnected,
    /// The call is not valid in the current state (for example `connect`
    /// while a session is already open).
    InvalidState,
    /// An error occurred during a write operation.
    WriteError,
    /// An error occurred during a read operation.
    ReadError,
    /// The connector could not open a transport.
    ConnectFailed,
    /// The remote host and port do not form a usable address.
    InvalidAddress,
    /// An argument is out of range (too long, empty, or QoS not supported).
    InvalidArgument,
    /// The connection manager was started without credentials.
    CredentialsNotSet,
    /// Building or parsing a packet failed.
    Codec(codec::Error),
}

impl From<codec::Error> for Error {
    fn from(err: codec::Error) -> Self {
        Error::Codec(err)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::InvalidState => defmt::write!(f, "InvalidState"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectFailed => defmt::write!(f, "ConnectFailed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::InvalidArgument => defmt::write!(f, "InvalidArgument"),
            Error::CredentialsNotSet => defmt::write!(f, "CredentialsNotSet"),
            Error::Codec(e) => defmt::write!(f, "Codec({})", e),
        }
    }
}
