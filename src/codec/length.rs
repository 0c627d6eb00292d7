//! MQTT variable-length integer ("remaining length") encoding.
//!
//! Seven value bits per byte, least significant group first, with the high
//! bit set on every byte except the last. At most four bytes.

use super::error::Error;

/// Largest value a four-byte remaining length can carry.
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Maximum number of bytes in an encoded remaining length.
pub const MAX_LENGTH_BYTES: usize = 4;

/// Number of bytes needed to encode `value`.
pub fn remaining_length_size(value: usize) -> Result<usize, Error> {
    match value {
        0..=127 => Ok(1),
        128..=16_383 => Ok(2),
        16_384..=2_097_151 => Ok(3),
        2_097_152..=MAX_REMAINING_LENGTH => Ok(4),
        _ => Err(Error::LengthOverflow),
    }
}

/// Encode `value` into `out`, returning the number of bytes used.
pub fn encode_remaining_length(
    value: usize,
    out: &mut [u8; MAX_LENGTH_BYTES],
) -> Result<usize, Error> {
    if value > MAX_REMAINING_LENGTH {
        return Err(Error::LengthOverflow);
    }
    let mut x = value;
    let mut i = 0;
    loop {
        let mut byte = (x % 128) as u8;
        x /= 128;
        if x > 0 {
            byte |= 0x80;
        }
        out[i] = byte;
        i += 1;
        if x == 0 {
            return Ok(i);
        }
    }
}

/// Decode a remaining length from the start of `bytes`.
///
/// Returns `Ok(None)` while the encoding is incomplete, and
/// `Ok(Some((value, bytes_used)))` once the terminating byte is seen. A
/// fourth byte that still has its continuation bit set is
/// [`Error::MalformedLength`].
pub fn decode_remaining_length(bytes: &[u8]) -> Result<Option<(usize, usize)>, Error> {
    let mut value = 0usize;
    let mut multiplier = 1usize;
    for (i, &byte) in bytes.iter().enumerate() {
        value += (byte & 0x7F) as usize * multiplier;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        if i + 1 == MAX_LENGTH_BYTES {
            return Err(Error::MalformedLength);
        }
        multiplier *= 128;
    }
    Ok(None)
}
