// socketcan-codec/src/frame.rs
//
// Wire codecs for CANbus 2.0 and FD frames.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN bus frames.
//!
//! The frames here encode to, and decode from, the exact byte layout of
//! the kernel structs that a raw CAN socket reads and writes:
//! - [can_frame](https://docs.rs/libc/latest/libc/struct.can_frame.html)
//!   The Classic CAN 2.0 frame with up to 8 bytes of data (16 bytes).
//! - [canfd_frame](https://docs.rs/libc/latest/libc/struct.canfd_frame.html)
//!   The CAN Flexible Data Rate frame with up to 64 bytes of data (72 bytes).
//!
//! ```text
//! can_frame:    | can_id (4) | len | __pad | __res0 | len8_dlc | data[8]  |
//! canfd_frame:  | can_id (4) | len | flags | __res0 | __res1   | data[64] |
//! ```
//!
//! All multi-byte fields are little-endian. Data bytes beyond `len` are
//! always zero in an encoded frame.
//!
//! The CAN XL frame lives in the [xl](crate::xl) module.

use crate::{
    errors::ensure_len,
    id::{
        self, canfd_len_to_dlc, canfd_padded_len, canid_t_to_id, id_to_canid_t,
        FdFlags, IdFlags, CANFD_MAX_DLEN, CAN_MAX_DLEN, CAN_RTR_FLAG,
    },
    util::{get_u32, put_u32, slice_to_array},
    xl::{XlFrame, CANXL_HDR_SIZE, CANXL_MTU, CANXL_XLF},
    Error, Result,
};
use embedded_can::{Frame as EmbeddedFrame, Id, StandardId};
use itertools::Itertools;
use libc::canid_t;
use std::fmt;

pub use libc::{CANFD_MTU, CAN_MTU};

/// The kind of a frame, as seen by containers that accept one kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// A classic CAN 2.0 frame
    Classic,
    /// A CAN FD frame
    Fd,
    /// A CAN XL frame
    Xl,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FrameKind::*;
        let s = match *self {
            Classic => "classic",
            Fd => "FD",
            Xl => "XL",
        };
        f.write_str(s)
    }
}

// ===== Frame trait =====

/// Shared trait for the classic and FD frames.
#[allow(clippy::len_without_is_empty)]
pub trait Frame: EmbeddedFrame {
    /// The kind of frame
    const KIND: FrameKind;

    /// The size of the encoded frame
    const ENCODED_LEN: usize;

    /// Get the composite SocketCAN ID word, with EFF/RTR/ERR flags
    fn id_word(&self) -> canid_t;

    /// Sets the composite ID word.
    ///
    /// The word is validated exactly as it is on construction.
    fn set_id_word(&mut self, word: canid_t) -> Result<()>;

    /// Return the actual raw CAN ID (without EFF/RTR/ERR flags)
    fn raw_id(&self) -> canid_t {
        id::raw_id(self.id_word())
    }

    /// Returns the EFF/RTR/ERR flags from the ID word
    fn id_flags(&self) -> IdFlags {
        IdFlags::from_bits_truncate(self.id_word())
    }

    /// Return the CAN ID as the embedded HAL Id type.
    fn hal_id(&self) -> Id {
        // The ID word is validated on every path in, so this can't fail.
        canid_t_to_id(self.id_word()).unwrap_or(Id::Standard(StandardId::ZERO))
    }

    /// Get the data length
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Check if frame is an error message
    fn is_error_frame(&self) -> bool {
        self.id_flags().contains(IdFlags::ERR)
    }

    /// Sets the CAN ID for the frame from an embedded_can Id.
    fn set_id(&mut self, id: impl Into<Id>) -> Result<()> {
        self.set_id_word(id_to_canid_t(id))
    }

    /// Sets the data payload of the frame.
    fn set_data(&mut self, data: &[u8]) -> Result<()>;

    /// Encodes the frame into a new buffer of `ENCODED_LEN` bytes
    fn encode(&self) -> Vec<u8>;

    /// Writes the frame into the front of `buf`, returning the number of
    /// bytes written.
    fn encode_into(&self, buf: &mut [u8]) -> Result<usize> {
        ensure_len(buf, Self::ENCODED_LEN)?;
        buf[..Self::ENCODED_LEN].copy_from_slice(&self.encode());
        Ok(Self::ENCODED_LEN)
    }

    /// Decodes a frame from the bytes a transport supplied.
    ///
    /// `buf` must hold only the bytes actually received.
    fn decode(buf: &[u8]) -> Result<Self>
    where
        Self: Sized;
}

// ===== ClassicFrame =====

/// The classic CAN 2.0 frame with up to 8-bytes of data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassicFrame {
    can_id: canid_t,
    len: u8,
    len8_dlc: u8,
    data: [u8; CAN_MAX_DLEN],
}

impl ClassicFrame {
    /// Initializes a CAN data frame from raw parts.
    ///
    /// The ID word may carry any of the EFF/RTR/ERR flags, but must be
    /// valid for its format.
    pub fn init(can_id: canid_t, data: &[u8]) -> Result<Self> {
        id::validate(can_id)?;
        if data.len() > CAN_MAX_DLEN {
            return Err(Error::PayloadTooLong {
                len: data.len(),
                max: CAN_MAX_DLEN,
            });
        }
        Ok(Self {
            can_id,
            len: data.len() as u8,
            len8_dlc: 0,
            data: slice_to_array(data),
        })
    }

    /// Creates a data frame using a raw, integer CAN ID.
    ///
    /// IDs above 0x7FF get the extended format.
    pub fn from_raw_id(raw_id: u32, data: &[u8]) -> Result<Self> {
        Self::init(id::id_word_auto(raw_id)?, data)
    }

    /// Creates a remote frame requesting `dlc` bytes.
    pub fn remote(can_id: canid_t, dlc: usize) -> Result<Self> {
        id::validate(can_id)?;
        let len = id::can_len_to_dlc(dlc)?;
        Ok(Self {
            can_id: can_id | CAN_RTR_FLAG,
            len,
            len8_dlc: 0,
            data: [0; CAN_MAX_DLEN],
        })
    }

    /// The raw DLC (9..=15) sent for an 8-byte payload, if any.
    ///
    /// This is only meaningful on interfaces in `CC_LEN8_DLC` mode.
    pub fn len8_dlc(&self) -> Option<u8> {
        (self.len8_dlc != 0).then_some(self.len8_dlc)
    }

    /// Sets the raw DLC for an 8-byte payload.
    ///
    /// The frame must carry 8 bytes and the DLC must be in 9..=15.
    pub fn set_len8_dlc(&mut self, dlc: u8) -> Result<()> {
        if self.len as usize != CAN_MAX_DLEN || !(9..=id::CAN_MAX_RAW_DLC).contains(&dlc) {
            return Err(Error::InvalidLength(dlc as usize));
        }
        self.len8_dlc = dlc;
        Ok(())
    }
}

impl EmbeddedFrame for ClassicFrame {
    /// Create a new CAN 2.0 data frame
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::init(id_to_canid_t(id), data).ok()
    }

    /// Create a new remote transmission request frame.
    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        Self::remote(id_to_canid_t(id), dlc).ok()
    }

    /// Check if frame uses 29-bit extended ID format.
    fn is_extended(&self) -> bool {
        self.id_flags().contains(IdFlags::EFF)
    }

    /// Check if frame is a remote transmission request.
    fn is_remote_frame(&self) -> bool {
        self.id_flags().contains(IdFlags::RTR)
    }

    /// Return the frame identifier.
    fn id(&self) -> Id {
        self.hal_id()
    }

    /// Data length code
    ///
    /// This reports the raw DLC of a frame sent with `len8_dlc`.
    fn dlc(&self) -> usize {
        match self.len8_dlc() {
            Some(dlc) => dlc as usize,
            None => self.len as usize,
        }
    }

    /// A slice into the actual data. Slice will always be <= 8 bytes in length
    fn data(&self) -> &[u8] {
        if self.is_remote_frame() {
            &[]
        } else {
            &self.data[..(self.len as usize)]
        }
    }
}

impl Frame for ClassicFrame {
    const KIND: FrameKind = FrameKind::Classic;
    const ENCODED_LEN: usize = CAN_MTU;

    fn id_word(&self) -> canid_t {
        self.can_id
    }

    fn set_id_word(&mut self, word: canid_t) -> Result<()> {
        id::validate(word)?;
        self.can_id = word;
        Ok(())
    }

    fn len(&self) -> usize {
        self.len as usize
    }

    fn set_data(&mut self, data: &[u8]) -> Result<()> {
        match data.len() {
            n if n <= CAN_MAX_DLEN => {
                self.len = n as u8;
                self.data = slice_to_array(data);
                if n != CAN_MAX_DLEN {
                    self.len8_dlc = 0;
                }
                Ok(())
            }
            n => Err(Error::PayloadTooLong {
                len: n,
                max: CAN_MAX_DLEN,
            }),
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CAN_MTU];
        put_u32(&mut buf, 0, self.can_id);
        buf[4] = self.len;
        buf[7] = self.len8_dlc;
        buf[8..].copy_from_slice(&self.data);
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, CAN_MTU)?;
        let can_id = get_u32(buf, 0);
        id::validate(can_id)?;

        let len = buf[4];
        if len as usize > CAN_MAX_DLEN {
            return Err(Error::InvalidLength(len as usize));
        }
        let len8_dlc = match buf[7] {
            dlc @ 9..=15 if len as usize == CAN_MAX_DLEN => dlc,
            _ => 0,
        };

        let n = len as usize;
        Ok(Self {
            can_id,
            len,
            len8_dlc,
            data: slice_to_array(&buf[8..8 + n]),
        })
    }
}

impl Default for ClassicFrame {
    /// The default frame has all fields and data set to zero, and all flags off.
    fn default() -> Self {
        Self {
            can_id: 0,
            len: 0,
            len8_dlc: 0,
            data: [0; CAN_MAX_DLEN],
        }
    }
}

impl fmt::Debug for ClassicFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ClassicFrame {{ ")?;
        fmt::UpperHex::fmt(self, f)?;
        write!(f, " }}")
    }
}

impl fmt::UpperHex for ClassicFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:X}#", self.can_id)?;
        if self.is_remote_frame() {
            return write!(f, "R{}", self.len);
        }
        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

impl TryFrom<FdFrame> for ClassicFrame {
    type Error = Error;

    /// Try to convert a CAN FD frame into a classic CAN 2.0 frame.
    ///
    /// This works if the FD frame has 8 or fewer data bytes.
    fn try_from(frame: FdFrame) -> Result<Self> {
        if frame.len() > CAN_MAX_DLEN {
            return Err(Error::PayloadTooLong {
                len: frame.len(),
                max: CAN_MAX_DLEN,
            });
        }
        ClassicFrame::init(frame.id_word(), frame.data())
    }
}

// ===== FdFrame =====

/// The CAN flexible data rate frame with up to 64-bytes of data.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FdFrame {
    can_id: canid_t,
    len: u8,
    flags: FdFlags,
    data: [u8; CANFD_MAX_DLEN],
}

impl FdFrame {
    /// Create a new FD frame with FD flags
    pub fn with_flags(id: impl Into<Id>, data: &[u8], flags: FdFlags) -> Option<Self> {
        Self::init(id_to_canid_t(id), data, flags).ok()
    }

    /// Initialize a FD frame from the raw components.
    ///
    /// A payload whose length is not one of the FD data lengths is padded
    /// with zeros up to the next one.
    pub fn init(can_id: canid_t, data: &[u8], flags: FdFlags) -> Result<Self> {
        id::validate(can_id)?;
        let mut frame = Self {
            can_id,
            len: 0,
            flags,
            data: [0; CANFD_MAX_DLEN],
        };
        frame.set_data(data)?;
        Ok(frame)
    }

    /// Creates an FD frame using a raw, integer CAN ID.
    ///
    /// IDs above 0x7FF get the extended format.
    pub fn from_raw_id(raw_id: u32, data: &[u8]) -> Result<Self> {
        Self::init(id::id_word_auto(raw_id)?, data, FdFlags::empty())
    }

    /// Gets the flags for the FD frame.
    ///
    /// These are the bits from the separate FD frame flags, not the flags
    /// in the composite ID word.
    pub fn flags(&self) -> FdFlags {
        self.flags
    }

    /// Replaces the FD flags.
    pub fn set_flags(&mut self, flags: FdFlags) {
        self.flags = flags;
    }

    /// Whether the frame uses a bit rate switch (second bit rate for
    /// payload data).
    pub fn is_brs(&self) -> bool {
        self.flags.contains(FdFlags::BRS)
    }

    /// Sets whether the frame uses a bit rate switch.
    pub fn set_brs(&mut self, on: bool) {
        self.flags.set(FdFlags::BRS, on);
    }

    /// Gets the error state indicator of the transmitting node
    pub fn is_esi(&self) -> bool {
        self.flags.contains(FdFlags::ESI)
    }

    /// Sets the error state indicator of the transmitting node
    pub fn set_esi(&mut self, on: bool) {
        self.flags.set(FdFlags::ESI, on);
    }
}

impl EmbeddedFrame for FdFrame {
    /// Create a new FD frame
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        Self::init(id_to_canid_t(id), data, FdFlags::empty()).ok()
    }

    /// CAN FD frames don't support remote
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        self.id_flags().contains(IdFlags::EFF)
    }

    /// The FD frames don't support remote request
    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        self.hal_id()
    }

    /// Data length code
    fn dlc(&self) -> usize {
        // The length is always one of the table values.
        canfd_len_to_dlc(self.len as usize).unwrap_or(0) as usize
    }

    fn data(&self) -> &[u8] {
        &self.data[..(self.len as usize)]
    }
}

impl Frame for FdFrame {
    const KIND: FrameKind = FrameKind::Fd;
    const ENCODED_LEN: usize = CANFD_MTU;

    fn id_word(&self) -> canid_t {
        self.can_id
    }

    fn set_id_word(&mut self, word: canid_t) -> Result<()> {
        id::validate(word)?;
        self.can_id = word;
        Ok(())
    }

    fn len(&self) -> usize {
        self.len as usize
    }

    fn set_data(&mut self, data: &[u8]) -> Result<()> {
        let len = canfd_padded_len(data.len()).ok_or(Error::PayloadTooLong {
            len: data.len(),
            max: CANFD_MAX_DLEN,
        })?;
        self.len = len as u8;
        self.data = slice_to_array(data);
        Ok(())
    }

    fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; CANFD_MTU];
        put_u32(&mut buf, 0, self.can_id);
        buf[4] = self.len;
        buf[5] = self.flags.bits();
        buf[8..].copy_from_slice(&self.data);
        buf
    }

    fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, CANFD_MTU)?;
        let can_id = get_u32(buf, 0);
        id::validate(can_id)?;

        let len = buf[4] as usize;
        canfd_len_to_dlc(len).map_err(|_| Error::InvalidLength(len))?;

        Ok(Self {
            can_id,
            len: len as u8,
            flags: FdFlags::from_bits_retain(buf[5]),
            data: slice_to_array(&buf[8..8 + len]),
        })
    }
}

impl Default for FdFrame {
    /// The default FD frame has all fields and data set to zero, and all flags off.
    fn default() -> Self {
        Self {
            can_id: 0,
            len: 0,
            flags: FdFlags::empty(),
            data: [0; CANFD_MAX_DLEN],
        }
    }
}

impl fmt::Debug for FdFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FdFrame {{ ")?;
        fmt::UpperHex::fmt(self, f)?;
        write!(f, " }}")
    }
}

impl fmt::UpperHex for FdFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:X}##", self.can_id)?;
        write!(f, "{:X} ", self.flags.bits())?;
        let mut parts = self.data().iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

impl From<ClassicFrame> for FdFrame {
    fn from(frame: ClassicFrame) -> Self {
        Self {
            can_id: frame.can_id & !CAN_RTR_FLAG,
            len: frame.len,
            flags: FdFlags::empty(),
            data: slice_to_array(&frame.data),
        }
    }
}

// ===== CanAnyFrame =====

/// Any frame type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanAnyFrame {
    /// A classic CAN 2.0 frame, with up to 8-bytes of data
    Classic(ClassicFrame),
    /// A flexible data rate frame, with up to 64-bytes of data
    Fd(FdFrame),
    /// An XL frame, with up to 2048 bytes of data
    Xl(XlFrame),
}

impl CanAnyFrame {
    /// Decodes whatever frame a CAN FD/XL capable raw socket returned.
    ///
    /// An XL frame is recognized by the XLF bit in its flags byte, which
    /// sits where the classic and FD frames keep their (small) length.
    /// Otherwise the byte count selects the format: 72 bytes or more is an
    /// FD frame, 16 or more is a classic frame.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() >= CANXL_HDR_SIZE && buf[4] & CANXL_XLF != 0 {
            return XlFrame::decode(buf).map(Self::Xl);
        }
        match buf.len() {
            n if n >= CANFD_MTU => FdFrame::decode(buf).map(Self::Fd),
            n if n >= CAN_MTU => ClassicFrame::decode(buf).map(Self::Classic),
            n => Err(Error::truncated(CAN_MTU, n)),
        }
    }

    /// Encodes the frame into a new buffer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        use CanAnyFrame::*;
        match self {
            Classic(frame) => Ok(frame.encode()),
            Fd(frame) => Ok(frame.encode()),
            Xl(frame) => frame.encode(CANXL_MTU),
        }
    }

    /// The kind of frame held
    pub fn kind(&self) -> FrameKind {
        use CanAnyFrame::*;
        match self {
            Classic(_) => FrameKind::Classic,
            Fd(_) => FrameKind::Fd,
            Xl(_) => FrameKind::Xl,
        }
    }

    /// The frame payload
    pub fn data(&self) -> &[u8] {
        use CanAnyFrame::*;
        match self {
            Classic(frame) => frame.data(),
            Fd(frame) => frame.data(),
            Xl(frame) => frame.data(),
        }
    }
}

/// Decodes whatever frame a CAN FD/XL capable raw socket returned.
///
/// See [`CanAnyFrame::decode`].
pub fn decode_any(buf: &[u8]) -> Result<CanAnyFrame> {
    CanAnyFrame::decode(buf)
}

impl fmt::UpperHex for CanAnyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classic(frame) => frame.fmt(f),
            Self::Fd(frame) => frame.fmt(f),
            Self::Xl(frame) => frame.fmt(f),
        }
    }
}

impl From<ClassicFrame> for CanAnyFrame {
    fn from(frame: ClassicFrame) -> Self {
        Self::Classic(frame)
    }
}

impl From<FdFrame> for CanAnyFrame {
    fn from(frame: FdFrame) -> Self {
        Self::Fd(frame)
    }
}

impl From<XlFrame> for CanAnyFrame {
    fn from(frame: XlFrame) -> Self {
        Self::Xl(frame)
    }
}

// ===== CanFilter =====

/// The size of an encoded `struct can_filter`
pub const CAN_FILTER_LEN: usize = 8;

/// A receive filter, as `struct can_filter`.
///
/// A received frame matches when `<received_id> & mask == id & mask`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanFilter {
    /// The ID word to match against
    pub id: canid_t,
    /// The bits of the ID word that are compared
    pub mask: canid_t,
}

impl CanFilter {
    /// Construct a new CAN filter.
    pub fn new(id: canid_t, mask: canid_t) -> Self {
        Self { id, mask }
    }

    /// Whether a frame with the given ID word passes the filter.
    pub fn matches(&self, id_word: canid_t) -> bool {
        id_word & self.mask == self.id & self.mask
    }

    /// Encodes the filter
    pub fn encode(&self) -> [u8; CAN_FILTER_LEN] {
        let mut buf = [0u8; CAN_FILTER_LEN];
        put_u32(&mut buf, 0, self.id);
        put_u32(&mut buf, 4, self.mask);
        buf
    }

    /// Decodes a filter
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, CAN_FILTER_LEN)?;
        Ok(Self::new(get_u32(buf, 0), get_u32(buf, 4)))
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{CAN_EFF_FLAG, CAN_ERR_FLAG};
    use embedded_can::ExtendedId;

    const STD_ID: Id = Id::Standard(StandardId::MAX);
    const EXT_ID: Id = Id::Extended(ExtendedId::MAX);

    const DATA: &[u8] = &[0, 1, 2, 3];

    const EXT_DATA: &[u8] = &[0xAB; 32];
    const EXT_DATA_DLC: usize = 0x0D;

    const EXT_DATA_INVALID_DLEN: &[u8] =
        &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA];
    const EXT_DATA_PADDED: &[u8] = &[
        0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0x00, 0x00,
    ];
    const EXT_DATA_PADDED_DLC: usize = 0x09;

    #[test]
    fn test_defaults() {
        let frame = ClassicFrame::default();

        assert_eq!(0, frame.id_word());
        assert_eq!(0, frame.raw_id());
        assert!(frame.id_flags().is_empty());
        assert_eq!(0, frame.dlc());
        assert_eq!(0, frame.len());
        assert!(frame.data().is_empty());
    }

    #[test]
    fn test_classic_frame() {
        let frame = ClassicFrame::new(STD_ID, DATA).unwrap();
        assert_eq!(STD_ID, frame.id());
        assert_eq!(0x7FF, frame.raw_id());
        assert!(frame.is_standard());
        assert!(frame.is_data_frame());
        assert!(!frame.is_error_frame());
        assert_eq!(DATA, frame.data());

        let frame = ClassicFrame::new(EXT_ID, DATA).unwrap();
        assert_eq!(EXT_ID, frame.id());
        assert!(frame.is_extended());
        assert_eq!(0x1FFF_FFFF | CAN_EFF_FLAG, frame.id_word());

        let frame = ClassicFrame::from_raw_id(0x18DB_33F1, DATA).unwrap();
        assert!(frame.is_extended());
        assert_eq!(0x18DB_33F1, frame.raw_id());
    }

    #[test]
    fn test_classic_validation() {
        assert_eq!(
            Err(Error::PayloadTooLong { len: 9, max: 8 }),
            ClassicFrame::init(0x100, &[0u8; 9])
        );
        assert_eq!(
            Err(Error::InvalidIdentifier(0x800)),
            ClassicFrame::init(0x800, DATA)
        );

        // Mutation is checked the same way as construction
        let mut frame = ClassicFrame::init(0x100, DATA).unwrap();
        assert!(frame.set_id_word(0x1234).is_err());
        assert_eq!(0x100, frame.id_word());
        assert!(frame.set_id_word(0x1234 | CAN_EFF_FLAG).is_ok());
        assert!(frame.set_data(&[0u8; 9]).is_err());
        assert_eq!(DATA, frame.data());
    }

    #[test]
    fn test_set_data_clears_tail() {
        let mut frame = ClassicFrame::init(0x100, &[0xFF; 8]).unwrap();
        frame.set_data(&[1, 2]).unwrap();
        let bytes = frame.encode();
        assert_eq!(&bytes[8..], &[1, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame, ClassicFrame::init(0x100, &[1, 2]).unwrap());
    }

    #[test]
    fn test_classic_layout() {
        let frame = ClassicFrame::init(0x123, &[0xDE, 0xAD]).unwrap();
        let bytes = frame.encode();
        assert_eq!(CAN_MTU, bytes.len());
        assert_eq!(
            bytes,
            &[0x23, 0x01, 0x00, 0x00, 2, 0, 0, 0, 0xDE, 0xAD, 0, 0, 0, 0, 0, 0]
        );
        assert_eq!(frame, ClassicFrame::decode(&bytes).unwrap());

        let mut buf = [0xFFu8; 20];
        assert_eq!(Ok(CAN_MTU), frame.encode_into(&mut buf));
        assert_eq!(&bytes[..], &buf[..CAN_MTU]);
        assert_eq!(&[0xFF; 4], &buf[CAN_MTU..]);
        assert_eq!(
            Err(Error::TruncatedBuffer {
                needed: CAN_MTU,
                available: 15
            }),
            frame.encode_into(&mut buf[..15])
        );
    }

    #[test]
    fn test_classic_decode() {
        assert_eq!(
            Err(Error::TruncatedBuffer {
                needed: 16,
                available: 15
            }),
            ClassicFrame::decode(&[0u8; 15])
        );

        let mut bytes = [0u8; CAN_MTU];
        bytes[4] = 9;
        assert_eq!(Err(Error::InvalidLength(9)), ClassicFrame::decode(&bytes));

        // Bytes past the length are ignored on decode
        let mut bytes = [0xEEu8; CAN_MTU];
        bytes[..4].copy_from_slice(&0x42u32.to_le_bytes());
        bytes[4] = 1;
        let frame = ClassicFrame::decode(&bytes).unwrap();
        assert_eq!(&[0xEE], frame.data());
        assert_eq!(frame.encode()[9..], [0u8; 7]);
    }

    #[test]
    fn test_len8_dlc() {
        let mut frame = ClassicFrame::init(0x100, &[0u8; 8]).unwrap();
        assert_eq!(8, frame.dlc());
        frame.set_len8_dlc(0x0F).unwrap();
        assert_eq!(15, frame.dlc());
        assert_eq!(8, frame.len());

        let bytes = frame.encode();
        assert_eq!(0x0F, bytes[7]);
        assert_eq!(frame, ClassicFrame::decode(&bytes).unwrap());

        assert!(frame.set_len8_dlc(8).is_err());
        let mut frame = ClassicFrame::init(0x100, &[0u8; 4]).unwrap();
        assert!(frame.set_len8_dlc(0x0F).is_err());
    }

    #[test]
    fn test_remote_frame() {
        let frame = ClassicFrame::new_remote(STD_ID, 4).unwrap();
        assert!(frame.is_remote_frame());
        assert!(frame.id_flags().contains(IdFlags::RTR));
        assert_eq!(4, frame.dlc());
        assert!(frame.data().is_empty());
        assert_eq!(frame, ClassicFrame::decode(&frame.encode()).unwrap());

        assert!(ClassicFrame::new_remote(STD_ID, CAN_MAX_DLEN + 1).is_none());
    }

    #[test]
    fn test_error_frame_id() {
        let frame = ClassicFrame::init(CAN_ERR_FLAG | 0x0010, &[0u8; 8]).unwrap();
        assert!(frame.is_error_frame());
        assert_eq!(frame, ClassicFrame::decode(&frame.encode()).unwrap());
    }

    #[test]
    fn test_fd_frame() {
        let frame = FdFrame::new(STD_ID, DATA).unwrap();
        assert_eq!(STD_ID, frame.id());
        assert!(frame.is_standard());
        assert!(!frame.is_remote_frame());
        assert_eq!(DATA, frame.data());

        let mut frame = FdFrame::new(STD_ID, EXT_DATA).unwrap();
        assert_eq!(frame.dlc(), EXT_DATA_DLC);
        assert_eq!(frame.data(), EXT_DATA);
        frame.set_data(EXT_DATA_INVALID_DLEN).unwrap();
        assert_eq!(frame.data(), EXT_DATA_PADDED);
        assert_eq!(frame.dlc(), EXT_DATA_PADDED_DLC);

        let frame = FdFrame::new(STD_ID, EXT_DATA_INVALID_DLEN).unwrap();
        assert_eq!(frame.data(), EXT_DATA_PADDED);

        assert_eq!(
            Err(Error::PayloadTooLong { len: 65, max: 64 }),
            FdFrame::init(0x100, &[0u8; 65], FdFlags::empty())
        );
    }

    #[test]
    fn test_fd_flags() {
        let mut frame = FdFrame::with_flags(EXT_ID, DATA, FdFlags::BRS).unwrap();
        assert!(frame.is_brs());
        assert!(!frame.is_esi());

        frame.set_esi(true);
        frame.set_brs(false);
        assert_eq!(FdFlags::ESI, frame.flags());
    }

    #[test]
    fn test_fd_layout() {
        let frame = FdFrame::init(
            0x18DB_33F1 | CAN_EFF_FLAG,
            &[0x55; 12],
            FdFlags::BRS | FdFlags::FDF,
        )
        .unwrap();
        let bytes = frame.encode();
        assert_eq!(CANFD_MTU, bytes.len());
        assert_eq!(&bytes[..8], &[0xF1, 0x33, 0xDB, 0x98, 12, 0x05, 0, 0]);
        assert_eq!(&bytes[8..20], &[0x55; 12]);
        assert!(bytes[20..].iter().all(|&b| b == 0));

        assert_eq!(frame, FdFrame::decode(&bytes).unwrap());
    }

    #[test]
    fn test_fd_decode() {
        assert!(matches!(
            FdFrame::decode(&[0u8; CAN_MTU]),
            Err(Error::TruncatedBuffer { needed: 72, .. })
        ));

        let mut bytes = [0u8; CANFD_MTU];
        bytes[4] = 9;
        assert_eq!(Err(Error::InvalidLength(9)), FdFrame::decode(&bytes));
    }

    #[test]
    fn test_frame_conv() {
        let frame = ClassicFrame::new(STD_ID, DATA).unwrap();

        let fdframe = FdFrame::from(frame);
        assert_eq!(STD_ID, fdframe.id());
        assert_eq!(DATA, fdframe.data());

        let frame2 = ClassicFrame::try_from(fdframe).unwrap();
        assert_eq!(frame, frame2);

        let fdframe = FdFrame::new(STD_ID, EXT_DATA).unwrap();
        assert!(ClassicFrame::try_from(fdframe).is_err());
    }

    #[test]
    fn test_any_frame_decode() {
        let frame = ClassicFrame::init(0x100, DATA).unwrap();
        let any = CanAnyFrame::decode(&frame.encode()).unwrap();
        assert_eq!(CanAnyFrame::Classic(frame), any);

        let frame = FdFrame::init(0x100, DATA, FdFlags::BRS).unwrap();
        let any = CanAnyFrame::decode(&frame.encode()).unwrap();
        assert_eq!(FrameKind::Fd, any.kind());
        assert_eq!(DATA, any.data());

        assert!(CanAnyFrame::decode(&[0u8; 8]).is_err());
    }

    #[test]
    fn test_hex_fmt() {
        let frame = ClassicFrame::init(0x123, &[0x11, 0x22]).unwrap();
        assert_eq!("123#11 22", format!("{:X}", frame));

        let frame = FdFrame::init(0x123, &[0x11], FdFlags::BRS).unwrap();
        assert_eq!("123##1 11", format!("{:X}", frame));
    }

    #[test]
    fn test_filter() {
        let filter = CanFilter::new(0x100, 0x7F0);
        assert!(filter.matches(0x10F));
        assert!(!filter.matches(0x200));

        let bytes = filter.encode();
        assert_eq!(bytes, [0x00, 0x01, 0, 0, 0xF0, 0x07, 0, 0]);
        assert_eq!(filter, CanFilter::decode(&bytes).unwrap());
        assert!(CanFilter::decode(&bytes[..7]).is_err());
    }
}
