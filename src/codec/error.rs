//! Common error types for codec operations

/// A common error type for buffer, field and packet codec operations.
///
/// The variants split into two groups: capacity/bounds errors, which point at
/// undersized buffers or a misuse of the field tree, and malformed-input errors,
/// which are raised while validating bytes received from the network.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An append or replace would grow the buffer past its capacity.
    CapacityExceeded,
    /// A read or edit addressed bytes past the current buffer length.
    OutOfBounds,
    /// The field tree has no free slot for another field.
    TooManyFields,
    /// A field handle does not belong to the tree, or the operation is not
    /// allowed on that field.
    InvalidField,
    /// A value does not fit the wire encoding (remaining length above
    /// 268,435,455 or a string longer than 65,535 bytes).
    LengthOverflow,
    /// A remaining-length field uses more than four bytes.
    MalformedLength,
    /// Received bytes are inconsistent with the packet layout.
    MalformedPacket,
    /// The packet type nibble does not name a supported packet.
    UnknownPacketType(u8),
    /// A string field is not valid UTF-8.
    InvalidUtf8,
    /// The message has not been built or validated yet.
    NotConfigured,
    /// The accessor does not apply to the configured packet type.
    WrongPacketType,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            Error::OutOfBounds => defmt::write!(f, "OutOfBounds"),
            Error::TooManyFields => defmt::write!(f, "TooManyFields"),
            Error::InvalidField => defmt::write!(f, "InvalidField"),
            Error::LengthOverflow => defmt::write!(f, "LengthOverflow"),
            Error::MalformedLength => defmt::write!(f, "MalformedLength"),
            Error::MalformedPacket => defmt::write!(f, "MalformedPacket"),
            Error::UnknownPacketType(t) => defmt::write!(f, "UnknownPacketType({})", t),
            Error::InvalidUtf8 => defmt::write!(f, "InvalidUtf8"),
            Error::NotConfigured => defmt::write!(f, "NotConfigured"),
            Error::WrongPacketType => defmt::write!(f, "WrongPacketType"),
        }
    }
}
