// socketcan-codec/src/xl.rs
//
// Wire codec for CAN XL frames.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN XL frames.
//!
//! A CAN XL frame has a fixed 12-byte header followed by 1 to 2048 bytes
//! of data. Only the header plus the actual data is written to, or read
//! from, a socket:
//!
//! ```text
//! canxl_frame:  | prio (4) | flags | sdt | len (2) | af (4) | data[len] |
//! ```
//!
//! The `prio` word is a compound field. Bits 0-10 hold the 11-bit
//! priority (the XL equivalent of a standard CAN ID) and bits 16-23 hold
//! the virtual CAN network ID (VCID). Bits 11-15 are reserved.

use crate::{
    errors::ensure_len,
    frame::{FrameKind, CANFD_MTU, CAN_MTU},
    util::{get_u16, get_u32, put_u16, put_u32},
    Error, Result,
};
use bitflags::bitflags;
use itertools::Itertools;
use std::fmt;

/// The size of the CAN XL frame header
pub const CANXL_HDR_SIZE: usize = 12;

/// The maximum CAN XL payload
pub const CANXL_MAX_DLEN: usize = 2048;

/// The MTU of a CAN XL frame with a full payload
pub const CANXL_MTU: usize = CANXL_HDR_SIZE + CANXL_MAX_DLEN;

/// The smallest MTU a CAN XL interface may report
pub const CANXL_MIN_MTU: usize = CANXL_HDR_SIZE + 64;

/// Number of bits in the XL priority
pub const CANXL_PRIO_BITS: u32 = 11;

/// Mask for the XL priority
pub const CANXL_PRIO_MASK: u32 = 0x7FF;

/// Bit offset of the VCID in the priority word
pub const CANXL_VCID_OFFSET: u32 = 16;

/// Mask for a VCID value
pub const CANXL_VCID_VAL_MASK: u32 = 0xFF;

/// Mask for the VCID in the priority word
pub const CANXL_VCID_MASK: u32 = CANXL_VCID_VAL_MASK << CANXL_VCID_OFFSET;

/// Marks a CAN XL frame (must always be set)
pub const CANXL_XLF: u8 = 0x80;

/// Simple extended content (security/segmentation)
pub const CANXL_SEC: u8 = 0x01;

/// Remote request substitution
pub const CANXL_RRS: u8 = 0x02;

// ===== Priority/VCID word =====

/// Gets the 11-bit priority from the compound priority word.
#[inline]
pub fn priority(word: u32) -> u16 {
    (word & CANXL_PRIO_MASK) as u16
}

/// Gets the virtual CAN network ID from the compound priority word.
#[inline]
pub fn vcid(word: u32) -> u8 {
    ((word & CANXL_VCID_MASK) >> CANXL_VCID_OFFSET) as u8
}

/// Replaces the priority in the compound word.
///
/// The reserved bits 11-15 are cleared. The VCID and everything above it
/// are kept.
pub fn set_priority(word: u32, prio: u32) -> Result<u32> {
    if prio > CANXL_PRIO_MASK {
        return Err(Error::out_of_range("priority", prio, CANXL_PRIO_MASK));
    }
    Ok((word & !0xFFFF) | prio)
}

/// Replaces the VCID in the compound word, keeping all the other bits.
pub fn set_vcid(word: u32, vcid: u8) -> u32 {
    (word & !CANXL_VCID_MASK) | ((vcid as u32) << CANXL_VCID_OFFSET)
}

// ===== Flags and SDU type =====

bitflags! {
    /// Bit flags for the XL frame `flags` byte.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct XlFlags: u8 {
        /// Marks a CAN XL frame
        const XLF = CANXL_XLF;
        /// Simple extended content
        const SEC = CANXL_SEC;
        /// Remote request substitution
        const RRS = CANXL_RRS;
    }
}

/// The SDU (service data unit) type carried in an XL frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SduType {
    /// Content-based addressing
    ContentBased,
    /// Classical CAN/CAN FD mapped tunneling
    ClassicFdMapped,
    /// IEEE 802.3 (MAC frame) tunneling
    Ieee8023Mac,
    /// IEEE 802.3 (MAC frame) mapped tunneling
    Ieee8023Mapped,
    /// Classical CAN mapped tunneling
    ClassicMapped,
    /// CAN FD mapped tunneling
    FdMapped,
    /// A value without a known meaning
    Unknown(u8),
}

impl From<u8> for SduType {
    fn from(val: u8) -> Self {
        use SduType::*;
        match val {
            0x01 => ContentBased,
            0x03 => ClassicFdMapped,
            0x04 => Ieee8023Mac,
            0x05 => Ieee8023Mapped,
            0x06 => ClassicMapped,
            0x07 => FdMapped,
            n => Unknown(n),
        }
    }
}

impl From<SduType> for u8 {
    fn from(sdt: SduType) -> Self {
        use SduType::*;
        match sdt {
            ContentBased => 0x01,
            ClassicFdMapped => 0x03,
            Ieee8023Mac => 0x04,
            Ieee8023Mapped => 0x05,
            ClassicMapped => 0x06,
            FdMapped => 0x07,
            Unknown(n) => n,
        }
    }
}

// ===== Mtu =====

/// The MTU of a CAN interface, which determines the frames it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mtu {
    /// Standard CAN frame, 8-byte data (16-byte total)
    Standard,
    /// FD CAN frame, 64-byte data (72-byte total)
    Fd,
    /// XL CAN frame, with the interface MTU in 76..=2060
    Xl(u16),
}

impl Mtu {
    /// The MTU in bytes
    pub fn bytes(&self) -> usize {
        match *self {
            Mtu::Standard => CAN_MTU,
            Mtu::Fd => CANFD_MTU,
            Mtu::Xl(n) => n as usize,
        }
    }
}

impl TryFrom<u32> for Mtu {
    type Error = Error;

    fn try_from(val: u32) -> Result<Self> {
        match val as usize {
            CAN_MTU => Ok(Mtu::Standard),
            CANFD_MTU => Ok(Mtu::Fd),
            n if (CANXL_MIN_MTU..=CANXL_MTU).contains(&n) => Ok(Mtu::Xl(n as u16)),
            _ => Err(Error::InvalidLength(val as usize)),
        }
    }
}

impl From<Mtu> for usize {
    fn from(mtu: Mtu) -> Self {
        mtu.bytes()
    }
}

// ===== XlFrame =====

/// Checks a CAN XL write length against the header size and the MTU.
pub fn check_write_len(len: usize, mtu: usize) -> Result<()> {
    if len < CANXL_HDR_SIZE {
        Err(Error::FrameTooShort {
            len,
            min: CANXL_HDR_SIZE,
        })
    } else if len > mtu {
        Err(Error::FrameTooLong { len, mtu })
    } else {
        Ok(())
    }
}

/// A CAN XL frame, with up to 2048 bytes of data.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct XlFrame {
    prio: u32,
    flags: XlFlags,
    sdt: SduType,
    af: u32,
    data: Vec<u8>,
}

impl XlFrame {
    /// Creates a new XL frame.
    ///
    /// The XLF flag is always set.
    pub fn new(prio: u32, sdt: SduType, af: u32, data: &[u8]) -> Result<Self> {
        let mut frame = Self {
            prio: set_priority(0, prio)?,
            flags: XlFlags::XLF,
            sdt,
            af,
            data: Vec::new(),
        };
        frame.set_data(data)?;
        Ok(frame)
    }

    /// The compound priority/VCID word
    pub fn prio_word(&self) -> u32 {
        self.prio
    }

    /// The 11-bit priority
    pub fn priority(&self) -> u16 {
        priority(self.prio)
    }

    /// Sets the 11-bit priority.
    pub fn set_priority(&mut self, prio: u32) -> Result<()> {
        self.prio = set_priority(self.prio, prio)?;
        Ok(())
    }

    /// The virtual CAN network ID
    pub fn vcid(&self) -> u8 {
        vcid(self.prio)
    }

    /// Sets the virtual CAN network ID
    pub fn set_vcid(&mut self, vcid: u8) {
        self.prio = set_vcid(self.prio, vcid);
    }

    /// The frame flags
    pub fn flags(&self) -> XlFlags {
        self.flags
    }

    /// Sets the SEC flag
    pub fn set_sec(&mut self, on: bool) {
        self.flags.set(XlFlags::SEC, on);
    }

    /// Sets the RRS flag
    pub fn set_rrs(&mut self, on: bool) {
        self.flags.set(XlFlags::RRS, on);
    }

    /// The SDU type
    pub fn sdu_type(&self) -> SduType {
        self.sdt
    }

    /// Sets the SDU type
    pub fn set_sdu_type(&mut self, sdt: SduType) {
        self.sdt = sdt;
    }

    /// The acceptance field
    pub fn acceptance_field(&self) -> u32 {
        self.af
    }

    /// Sets the acceptance field
    pub fn set_acceptance_field(&mut self, af: u32) {
        self.af = af;
    }

    /// The data length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame has no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The frame payload
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the payload
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > CANXL_MAX_DLEN {
            return Err(Error::PayloadTooLong {
                len: data.len(),
                max: CANXL_MAX_DLEN,
            });
        }
        self.data = data.to_vec();
        Ok(())
    }

    /// The number of bytes written for this frame: header plus data
    pub fn encoded_len(&self) -> usize {
        CANXL_HDR_SIZE + self.data.len()
    }

    /// Encodes the frame for an interface with the given MTU.
    pub fn encode(&self, mtu: usize) -> Result<Vec<u8>> {
        let len = self.encoded_len();
        check_write_len(len, mtu)?;

        let mut buf = vec![0u8; len];
        put_u32(&mut buf, 0, self.prio);
        buf[4] = self.flags.bits();
        buf[5] = self.sdt.into();
        put_u16(&mut buf, 6, self.data.len() as u16);
        put_u32(&mut buf, 8, self.af);
        buf[CANXL_HDR_SIZE..].copy_from_slice(&self.data);
        Ok(buf)
    }

    /// Decodes a frame from the bytes a transport supplied.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, CANXL_HDR_SIZE)?;

        let flags = XlFlags::from_bits_retain(buf[4]);
        if !flags.contains(XlFlags::XLF) {
            let found = if buf.len() >= CANFD_MTU {
                FrameKind::Fd
            } else {
                FrameKind::Classic
            };
            return Err(Error::TypeMismatch {
                expected: FrameKind::Xl,
                found,
            });
        }

        let len = get_u16(buf, 6) as usize;
        if len > CANXL_MAX_DLEN {
            return Err(Error::InvalidLength(len));
        }
        ensure_len(buf, CANXL_HDR_SIZE + len)?;

        Ok(Self {
            prio: get_u32(buf, 0),
            flags,
            sdt: SduType::from(buf[5]),
            af: get_u32(buf, 8),
            data: buf[CANXL_HDR_SIZE..CANXL_HDR_SIZE + len].to_vec(),
        })
    }
}

impl fmt::Debug for XlFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "XlFrame {{ ")?;
        fmt::UpperHex::fmt(self, f)?;
        write!(f, " }}")
    }
}

impl fmt::UpperHex for XlFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:03X}###{:02X}{:02X}{:08X}#",
            self.priority(),
            self.flags.bits(),
            u8::from(self.sdt),
            self.af
        )?;
        let mut parts = self.data.iter().map(|v| format!("{:02X}", v));
        write!(f, "{}", parts.join(" "))
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prio_word() {
        assert_eq!(0x222, priority(0x4B0222));
        assert_eq!(0x4B, vcid(0x4B0222));

        assert_eq!(Ok(0x4B0222), set_priority(0x4B0F0F, 0x222));
        assert!(matches!(
            set_priority(0x4B0F0F, 0x800),
            Err(Error::OutOfRange { value: 0x800, .. })
        ));

        assert_eq!(0x120123, set_vcid(0x4B0123, 0x12));
        assert_eq!(0xFF00_0123, set_vcid(0xFF4B_0123, 0));
    }

    #[test]
    fn test_sdu_type() {
        assert_eq!(SduType::ContentBased, SduType::from(0x01));
        assert_eq!(SduType::FdMapped, SduType::from(0x07));
        assert_eq!(SduType::Unknown(0x02), SduType::from(0x02));
        assert_eq!(0x02u8, SduType::Unknown(0x02).into());
        assert_eq!(0x05u8, SduType::Ieee8023Mapped.into());
    }

    #[test]
    fn test_mtu() {
        assert_eq!(Ok(Mtu::Standard), Mtu::try_from(16));
        assert_eq!(Ok(Mtu::Fd), Mtu::try_from(72));
        assert_eq!(Ok(Mtu::Xl(2060)), Mtu::try_from(2060));
        assert_eq!(Ok(Mtu::Xl(76)), Mtu::try_from(76));
        assert!(Mtu::try_from(74).is_err());
        assert!(Mtu::try_from(2061).is_err());
        assert_eq!(2060, Mtu::Xl(2060).bytes());
    }

    #[test]
    fn test_new() {
        let mut frame = XlFrame::new(0x123, SduType::ContentBased, 0xDEAD_BEEF, &[1, 2, 3]).unwrap();
        assert_eq!(0x123, frame.priority());
        assert_eq!(0, frame.vcid());
        assert_eq!(XlFlags::XLF, frame.flags());
        assert_eq!(3, frame.len());

        frame.set_vcid(0x4B);
        assert_eq!(0x4B0123, frame.prio_word());
        assert!(frame.set_priority(0x800).is_err());
        assert_eq!(0x123, frame.priority());

        assert_eq!(
            Err(Error::PayloadTooLong {
                len: 2049,
                max: 2048
            }),
            XlFrame::new(0, SduType::ContentBased, 0, &[0u8; 2049])
        );
        assert!(XlFrame::new(0x800, SduType::ContentBased, 0, &[0]).is_err());
    }

    #[test]
    fn test_layout() {
        let mut frame = XlFrame::new(0x222, SduType::ClassicMapped, 0x0102_0304, &[0xAA, 0xBB]).unwrap();
        frame.set_vcid(0x4B);
        frame.set_sec(true);

        let bytes = frame.encode(CANXL_MTU).unwrap();
        assert_eq!(14, bytes.len());
        assert_eq!(
            bytes,
            &[0x22, 0x02, 0x4B, 0x00, 0x81, 0x06, 0x02, 0x00, 0x04, 0x03, 0x02, 0x01, 0xAA, 0xBB]
        );
        assert_eq!(frame, XlFrame::decode(&bytes).unwrap());
    }

    #[test]
    fn test_write_len() {
        assert_eq!(
            Err(Error::FrameTooShort { len: 8, min: 12 }),
            check_write_len(8, CANXL_MTU)
        );
        assert_eq!(
            Err(Error::FrameTooLong { len: 100, mtu: 76 }),
            check_write_len(100, CANXL_MIN_MTU)
        );
        assert!(check_write_len(76, CANXL_MIN_MTU).is_ok());

        let frame = XlFrame::new(0x10, SduType::ContentBased, 0, &[0u8; 100]).unwrap();
        assert!(matches!(
            frame.encode(CANXL_MIN_MTU),
            Err(Error::FrameTooLong { len: 112, mtu: 76 })
        ));
        assert!(frame.encode(CANXL_MTU).is_ok());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            XlFrame::decode(&[0x80u8; 8]),
            Err(Error::TruncatedBuffer { needed: 12, .. })
        ));

        // Missing XLF
        let mut bytes = [0u8; 16];
        bytes[4] = 0x01;
        assert!(matches!(
            XlFrame::decode(&bytes),
            Err(Error::TypeMismatch {
                expected: FrameKind::Xl,
                ..
            })
        ));

        // Declared length runs past the buffer
        let frame = XlFrame::new(0x10, SduType::ContentBased, 0, &[7u8; 20]).unwrap();
        let bytes = frame.encode(CANXL_MTU).unwrap();
        assert_eq!(
            Err(Error::TruncatedBuffer {
                needed: 32,
                available: 31
            }),
            XlFrame::decode(&bytes[..31])
        );
    }

    #[test]
    fn test_hex_fmt() {
        let frame = XlFrame::new(0x242, SduType::ContentBased, 0x1234, &[0x11, 0x22]).unwrap();
        assert_eq!("242###800100001234#11 22", format!("{:X}", frame));
    }
}
