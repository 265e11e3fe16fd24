// socketcan-codec/src/errors.rs
//
// Errors for the SocketCAN wire codecs.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Codec errors.
//!
//! Every codec operation either fully succeeds or fails with one of the
//! variants of [`Error`]. Validation is eager: identifiers, lengths and
//! bit-field widths are checked when a record is constructed or mutated,
//! not when it is encoded. The only exception is the check of a CAN XL
//! frame against the negotiated MTU, which can only be made at encode
//! time.
//!
//! Note that walking a netlink buffer that simply runs out of bytes is
//! _not_ an error. A short final record is the normal end of a receive
//! buffer. Only a record whose declared length is smaller than its own
//! header is reported, as [`Error::MalformedMessage`].

use crate::frame::FrameKind;
use thiserror::Error;

/// A codec error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A CAN or J1939 identifier was malformed or overflowed its format.
    #[error("Invalid CAN identifier: {0:#010X}")]
    InvalidIdentifier(u32),
    /// A DLC or length value is not valid for the frame type.
    #[error("Invalid length or DLC: {0}")]
    InvalidLength(usize),
    /// The payload is larger than the frame type can carry.
    #[error("Payload of {len} bytes exceeds the maximum of {max}")]
    PayloadTooLong {
        /// The offered payload length
        len: usize,
        /// The maximum for the frame type
        max: usize,
    },
    /// The write length is smaller than the fixed frame header.
    #[error("Frame length {len} is shorter than the minimum of {min}")]
    FrameTooShort {
        /// The requested write length
        len: usize,
        /// The minimum length
        min: usize,
    },
    /// The write length exceeds the negotiated MTU.
    #[error("Frame length {len} exceeds the MTU of {mtu}")]
    FrameTooLong {
        /// The requested write length
        len: usize,
        /// The negotiated MTU
        mtu: usize,
    },
    /// A field value exceeds its declared bit width or domain.
    #[error("Value {value:#X} for '{field}' is out of range (max {max:#X})")]
    OutOfRange {
        /// The name of the field
        field: &'static str,
        /// The offending value
        value: u64,
        /// The largest legal value
        max: u64,
    },
    /// Fewer bytes are available than the minimum valid encoding requires.
    #[error("Truncated buffer: need {needed} bytes, have {available}")]
    TruncatedBuffer {
        /// The number of bytes required
        needed: usize,
        /// The number of bytes available
        available: usize,
    },
    /// A record of one frame kind was used where another is required.
    #[error("Incompatible frame type: expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind required by the container
        expected: FrameKind,
        /// The kind that was offered
        found: FrameKind,
    },
    /// A netlink message or attribute declares a length smaller than its header.
    #[error("Malformed netlink record at offset {offset}: length {len}")]
    MalformedMessage {
        /// Offset of the record in the buffer being walked
        offset: usize,
        /// The declared length
        len: usize,
    },
}

impl Error {
    /// Creates an out-of-range error for a named field.
    pub(crate) fn out_of_range(field: &'static str, value: impl Into<u64>, max: impl Into<u64>) -> Self {
        Error::OutOfRange {
            field,
            value: value.into(),
            max: max.into(),
        }
    }

    /// Creates a truncated-buffer error.
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        Error::TruncatedBuffer { needed, available }
    }
}

/// A result type for the codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fails with [`Error::TruncatedBuffer`] if `buf` is shorter than `needed`.
#[inline]
pub(crate) fn ensure_len(buf: &[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        Err(Error::truncated(needed, buf.len()))
    } else {
        Ok(())
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::InvalidIdentifier(0x800);
        assert_eq!("Invalid CAN identifier: 0x00000800", err.to_string());

        let err = Error::out_of_range("priority", 8u8, 7u8);
        assert_eq!(
            "Value 0x8 for 'priority' is out of range (max 0x7)",
            err.to_string()
        );

        let err = Error::TypeMismatch {
            expected: FrameKind::Classic,
            found: FrameKind::Fd,
        };
        assert_eq!(
            "Incompatible frame type: expected classic, found FD",
            err.to_string()
        );
    }

    #[test]
    fn test_ensure_len() {
        assert!(ensure_len(&[0u8; 4], 4).is_ok());
        assert_eq!(
            Err(Error::truncated(16, 4)),
            ensure_len(&[0u8; 4], 16)
        );
    }
}
