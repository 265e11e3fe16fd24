// socketcan-codec/src/id.rs
//
// CANbus identifiers and data length codes.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Implementation of CANbus standard and extended identifiers.
//!
//! SocketCAN carries the identifier of a frame in a single 32-bit word,
//! the `canid_t`, laid out as:
//!
//! ```text
//! bit 31    : EFF - extended (29-bit) frame format
//! bit 30    : RTR - remote transmission request
//! bit 29    : ERR - error frame
//! bits 0-28 : the raw identifier (11 or 29 significant bits)
//! ```
//!
//! The functions here build and check these words. A standard-format word
//! whose raw identifier does not fit into 11 bits is rejected, never
//! truncated.
//!
//! This module also holds the data length code (DLC) tables for classic
//! and FD frames.

use crate::{Error, Result};
use bitflags::bitflags;
use embedded_can::{ExtendedId, Id, StandardId};
use libc::canid_t;

pub use libc::{
    CANFD_BRS, CANFD_ESI, CANFD_MAX_DLEN, CAN_EFF_FLAG, CAN_EFF_MASK, CAN_ERR_FLAG, CAN_ERR_MASK,
    CAN_MAX_DLEN, CAN_RTR_FLAG, CAN_SFF_MASK,
};

/// Mark CAN FD for dual use of struct canfd_frame (Linux v5.14)
pub const CANFD_FDF: u8 = 0x04;

/// The three flag bits at the top of the ID word.
pub const CAN_ID_FLAGS_MASK: canid_t = CAN_EFF_FLAG | CAN_RTR_FLAG | CAN_ERR_FLAG;

/// The largest classic CAN DLC
pub const CAN_MAX_RAW_DLC: u8 = 15;

/// The largest CAN FD DLC
pub const CANFD_MAX_DLC: u8 = 15;

bitflags! {
    /// Bit flags in the composite SocketCAN ID word.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct IdFlags: canid_t {
        /// Indicates frame uses a 29-bit extended ID
        const EFF = CAN_EFF_FLAG;
        /// Indicates a remote request frame.
        const RTR = CAN_RTR_FLAG;
        /// Indicates an error frame.
        const ERR = CAN_ERR_FLAG;
    }

    /// Bit flags for the Flexible Data (FD) frames.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
    pub struct FdFlags: u8 {
        /// Bit rate switch (second bit rate for payload data)
        const BRS = CANFD_BRS as u8;
        /// Error state indicator of the transmitting node
        const ESI = CANFD_ESI as u8;
        /// Mark CAN FD for dual use of struct canfd_frame
        const FDF = CANFD_FDF;
    }
}

// ===== ID word codec =====

/// Gets the raw identifier out of an ID word.
///
/// This is the low 29 bits for an extended-format word, or the low 11
/// bits otherwise.
#[inline]
pub fn raw_id(word: canid_t) -> u32 {
    if word & CAN_EFF_FLAG != 0 {
        word & CAN_EFF_MASK
    } else {
        word & CAN_SFF_MASK
    }
}

/// Checks an ID word.
///
/// A word without the EFF flag must have a raw identifier that fits into
/// the 11 bits of a standard ID.
pub fn validate(word: canid_t) -> Result<()> {
    if word & CAN_EFF_FLAG == 0 && (word & CAN_EFF_MASK) > CAN_SFF_MASK {
        Err(Error::InvalidIdentifier(word))
    } else {
        Ok(())
    }
}

/// Builds an ID word from a raw identifier and an explicit set of flags.
///
/// Fails if a standard-format ID is requested for an identifier larger
/// than 11 bits, or if the identifier does not fit into 29 bits.
pub fn id_word_with_flags(raw_id: u32, extended: bool, rtr: bool, err: bool) -> Result<canid_t> {
    let max = if extended { CAN_EFF_MASK } else { CAN_SFF_MASK };
    if raw_id > max {
        return Err(Error::InvalidIdentifier(raw_id));
    }

    let mut flags = IdFlags::empty();
    flags.set(IdFlags::EFF, extended);
    flags.set(IdFlags::RTR, rtr);
    flags.set(IdFlags::ERR, err);
    Ok(raw_id | flags.bits())
}

/// Builds an ID word from a raw identifier, picking the format by value.
///
/// Identifiers above 0x7FF get the EFF flag, smaller ones are left as
/// standard IDs. The input must be a "clean" identifier: if any of the
/// EFF/RTR/ERR bits is already set, this fails.
pub fn id_word_auto(raw_id: u32) -> Result<canid_t> {
    if raw_id & CAN_ID_FLAGS_MASK != 0 {
        return Err(Error::InvalidIdentifier(raw_id));
    }
    if raw_id > CAN_SFF_MASK {
        Ok(raw_id | CAN_EFF_FLAG)
    } else {
        Ok(raw_id)
    }
}

/// Gets the canid_t value from an Id
/// If it's an extended ID, the CAN_EFF_FLAG bit is also set.
pub fn id_to_canid_t(id: impl Into<Id>) -> canid_t {
    use Id::*;
    match id.into() {
        Standard(id) => id.as_raw() as canid_t,
        Extended(id) => id.as_raw() | CAN_EFF_FLAG,
    }
}

/// Gets the embedded_can `Id` for an ID word.
///
/// The flags other than EFF are dropped.
pub fn canid_t_to_id(word: canid_t) -> Option<Id> {
    if word & CAN_EFF_FLAG != 0 {
        ExtendedId::new(word & CAN_EFF_MASK).map(Id::Extended)
    } else if word & CAN_EFF_MASK <= CAN_SFF_MASK {
        StandardId::new(word as u16 & CAN_SFF_MASK as u16).map(Id::Standard)
    } else {
        None
    }
}

/// Creates a CAN ID from a raw integer value.
///
/// If the `id` is <= 0x7FF, it's assumed to be a standard ID, otherwise
/// it is created as an Extened ID. If you require an Extended ID <= 0x7FF,
/// create it explicitly.
pub fn id_from_raw(id: u32) -> Option<Id> {
    let id = match id {
        n if n <= CAN_SFF_MASK => StandardId::new(n as u16)?.into(),
        n => ExtendedId::new(n)?.into(),
    };
    Some(id)
}

// ===== DLC tables =====

/// The payload lengths for the CAN FD data length codes.
const CANFD_DLC_TO_LEN: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];

/// Gets the payload length for a classic CAN data length code.
///
/// DLC values 9-15 are legal on the wire for classic CAN, but still mean
/// 8 bytes of data. They are clamped rather than rejected, as the kernel
/// does. Anything above 15 does not fit in the 4-bit field.
pub fn can_dlc_to_len(dlc: u8) -> Result<u8> {
    match dlc {
        0..=8 => Ok(dlc),
        9..=CAN_MAX_RAW_DLC => Ok(CAN_MAX_DLEN as u8),
        _ => Err(Error::InvalidLength(dlc as usize)),
    }
}

/// Gets the classic CAN data length code for a payload length.
pub fn can_len_to_dlc(len: usize) -> Result<u8> {
    if len <= CAN_MAX_DLEN {
        Ok(len as u8)
    } else {
        Err(Error::InvalidLength(len))
    }
}

/// Gets the payload length for a CAN FD data length code.
pub fn canfd_dlc_to_len(dlc: u8) -> Result<u8> {
    CANFD_DLC_TO_LEN
        .get(dlc as usize)
        .copied()
        .ok_or(Error::InvalidLength(dlc as usize))
}

/// Gets the CAN FD data length code for a payload length.
///
/// Only the lengths in the FD table are accepted: `0..=8`, `12`, `16`,
/// `20`, `24`, `32`, `48` or `64`.
pub fn canfd_len_to_dlc(len: usize) -> Result<u8> {
    CANFD_DLC_TO_LEN
        .iter()
        .position(|&n| n as usize == len)
        .map(|dlc| dlc as u8)
        .ok_or_else(|| Error::out_of_range("FD data length", len as u64, CANFD_MAX_DLEN as u64))
}

/// Checks whether a given length is a valid CAN FD data length.
#[inline]
pub fn is_valid_canfd_len(len: usize) -> bool {
    canfd_len_to_dlc(len).is_ok()
}

/// Gets the smallest valid CAN FD data length that can hold `len` bytes.
///
/// Lengths above 64 return `None`.
pub fn canfd_padded_len(len: usize) -> Option<usize> {
    CANFD_DLC_TO_LEN
        .iter()
        .map(|&n| n as usize)
        .find(|&n| n >= len)
}

/////////////////////////////////////////////////////////////////////////////
/// A CAN identifier that can be standard or extended.
///
/// This is similar to and generally interchangeable with
/// [embedded_can::Id](https://docs.rs/embedded-can/latest/embedded_can/enum.Id.html)
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CanId {
    /// Standard 11-bit Identifier (`0..=0x7FF`).
    Standard(StandardId),
    /// Extended 29-bit Identifier (`0..=0x1FFF_FFFF`).
    Extended(ExtendedId),
}

impl CanId {
    /// Creates a standard, 11-bit, ID
    pub fn standard(id: u16) -> Option<Self> {
        let id = StandardId::new(id)?;
        Some(Self::Standard(id))
    }

    /// Creates an extended, 29-bit, ID
    pub fn extended(id: u32) -> Option<Self> {
        let id = ExtendedId::new(id)?;
        Some(Self::Extended(id))
    }

    /// Gets the embedded_can::Id representation of the value.
    pub fn as_id(&self) -> Id {
        use CanId::*;
        match self {
            Standard(id) => Id::Standard(*id),
            Extended(id) => Id::Extended(*id),
        }
    }

    /// Gets the raw numeric value of the ID
    pub fn as_raw(&self) -> u32 {
        use CanId::*;
        match self {
            Standard(id) => id.as_raw() as u32,
            Extended(id) => id.as_raw(),
        }
    }

    /// Gets the SocketCAN ID word, with the EFF flag for extended IDs.
    pub fn as_id_word(&self) -> canid_t {
        id_to_canid_t(*self)
    }

    /// Determines if the ID is a standard, 11-bit, ID.
    #[inline]
    pub fn is_standard(&self) -> bool {
        matches!(self, CanId::Standard(_))
    }

    /// Determines if the ID is an extended, 29-bit, ID.
    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self, CanId::Extended(_))
    }
}

/// Implement `Ord` according to the CAN arbitration rules
///
/// This defers to the `Ord` implementation in the embedded_can crate.
impl Ord for CanId {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.as_id().cmp(&other.as_id())
    }
}

impl PartialOrd for CanId {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<StandardId> for CanId {
    #[inline]
    fn from(id: StandardId) -> Self {
        Self::Standard(id)
    }
}

impl From<ExtendedId> for CanId {
    #[inline]
    fn from(id: ExtendedId) -> Self {
        Self::Extended(id)
    }
}

impl From<Id> for CanId {
    fn from(id: Id) -> Self {
        use Id::*;
        match id {
            Standard(id) => Self::Standard(id),
            Extended(id) => Self::Extended(id),
        }
    }
}

impl From<CanId> for Id {
    #[inline]
    fn from(id: CanId) -> Self {
        id.as_id()
    }
}

/// Creates a CAN ID from a raw integer value.
///
/// If the `id` is <= 0x7FF, it's assumed to be a standard ID, otherwise
/// it is created as an Extened ID. If you require an Extended ID <= 0x7FF,
/// create it explicitly.
impl TryFrom<u32> for CanId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        id_from_raw(id)
            .map(CanId::from)
            .ok_or(Error::InvalidIdentifier(id))
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_flags() {
        let mut flags = IdFlags::RTR;
        assert_eq!(CAN_RTR_FLAG, flags.bits());

        flags.set(IdFlags::EFF, true);
        assert_eq!(CAN_EFF_FLAG | CAN_RTR_FLAG, flags.bits());

        flags.set(IdFlags::EFF, false);
        assert_eq!(CAN_RTR_FLAG, flags.bits());

        assert_eq!(0x07, FdFlags::all().bits());
    }

    #[test]
    fn test_raw_id() {
        assert_eq!(0x123, raw_id(0x123));
        assert_eq!(0x7FF, raw_id(0x1234_5FFF));
        assert_eq!(0x18DB_33F1, raw_id(0x18DB_33F1 | CAN_EFF_FLAG));
        assert_eq!(0x123, raw_id(0x123 | CAN_RTR_FLAG));
    }

    #[test]
    fn test_validate() {
        assert!(validate(0x7FF).is_ok());
        assert!(validate(0x7FF | CAN_RTR_FLAG).is_ok());
        assert!(validate(0x1FFF_FFFF | CAN_EFF_FLAG).is_ok());
        assert_eq!(Err(Error::InvalidIdentifier(0x800)), validate(0x800));
        assert!(validate(0x800 | CAN_ERR_FLAG).is_err());
    }

    #[test]
    fn test_id_word_with_flags() {
        for raw in [0u32, 0x001, 0x123, 0x7FF] {
            assert_eq!(Ok(raw), id_word_with_flags(raw, false, false, false));
            assert_eq!(
                Ok(raw | CAN_EFF_FLAG),
                id_word_with_flags(raw, true, false, false)
            );
        }

        for raw in [0x800u32, 0x1234, 0x1FFF_FFFF] {
            assert_eq!(
                Err(Error::InvalidIdentifier(raw)),
                id_word_with_flags(raw, false, false, false)
            );
            assert!(id_word_with_flags(raw, true, false, false).is_ok());
        }

        assert_eq!(
            Ok(0x100 | CAN_RTR_FLAG | CAN_ERR_FLAG),
            id_word_with_flags(0x100, false, true, true)
        );
        assert!(id_word_with_flags(0x2000_0000, true, false, false).is_err());
    }

    #[test]
    fn test_id_word_auto() {
        assert_eq!(Ok(0x123), id_word_auto(0x123));
        assert_eq!(Ok(0x18DB_33F1 | CAN_EFF_FLAG), id_word_auto(0x18DB_33F1));
        assert_eq!(
            Err(Error::InvalidIdentifier(0x10 | CAN_EFF_FLAG)),
            id_word_auto(0x10 | CAN_EFF_FLAG)
        );
        assert!(id_word_auto(0x10 | CAN_RTR_FLAG).is_err());
    }

    #[test]
    fn test_hal_id_conv() {
        let id = StandardId::new(0x123).unwrap();
        assert_eq!(0x123, id_to_canid_t(id));
        assert_eq!(Some(Id::Standard(id)), canid_t_to_id(0x123));

        let id = ExtendedId::new(0x123).unwrap();
        assert_eq!(0x123 | CAN_EFF_FLAG, id_to_canid_t(id));
        assert_eq!(Some(Id::Extended(id)), canid_t_to_id(0x123 | CAN_EFF_FLAG));

        assert!(canid_t_to_id(0x800).is_none());
    }

    // DLC 9..=15 clamp to 8 bytes on classic CAN, as in the kernel.
    #[test]
    fn test_classic_dlc_clamps() {
        for dlc in 0..=8u8 {
            assert_eq!(Ok(dlc), can_dlc_to_len(dlc));
        }
        for dlc in 9..=15u8 {
            assert_eq!(Ok(8), can_dlc_to_len(dlc));
        }
        assert_eq!(Err(Error::InvalidLength(16)), can_dlc_to_len(16));
        assert_eq!(Err(Error::InvalidLength(9)), can_len_to_dlc(9));
    }

    #[test]
    fn test_fd_dlc_table() {
        for dlc in 0..=CANFD_MAX_DLC {
            let len = canfd_dlc_to_len(dlc).unwrap();
            assert_eq!(Ok(dlc), canfd_len_to_dlc(len as usize));
        }
        assert_eq!(Ok(12), canfd_dlc_to_len(9));
        assert_eq!(Ok(64), canfd_dlc_to_len(15));
        assert!(canfd_dlc_to_len(16).is_err());

        let shoulders = [0usize, 1, 2, 3, 4, 5, 6, 7, 8, 12, 16, 20, 24, 32, 48, 64];
        for len in 0..=80usize {
            let res = canfd_len_to_dlc(len);
            if shoulders.contains(&len) {
                assert!(res.is_ok());
            } else {
                assert!(matches!(res, Err(Error::OutOfRange { .. })));
            }
        }
    }

    #[test]
    fn test_fd_padded_len() {
        assert_eq!(Some(8), canfd_padded_len(8));
        assert_eq!(Some(12), canfd_padded_len(9));
        assert_eq!(Some(32), canfd_padded_len(25));
        assert_eq!(Some(64), canfd_padded_len(64));
        assert_eq!(None, canfd_padded_len(65));
    }

    #[test]
    fn test_id_raw() {
        let id = CanId::try_from(0x100).unwrap();
        assert!(matches!(id, CanId::Standard(_)));
        assert_eq!(id.as_raw(), 0x100);

        let id = CanId::try_from(0x1000).unwrap();
        assert!(id.is_extended());
        assert_eq!(0x1000 | CAN_EFF_FLAG, id.as_id_word());

        assert!(CanId::try_from(0x2000_0000).is_err());
    }

    #[test]
    fn test_id_conv() {
        let sid = StandardId::MAX;
        let id = CanId::from(sid);
        assert!(id.is_standard());
        assert_eq!(id.as_raw(), sid.as_raw() as u32);

        let eid = ExtendedId::MAX;
        let id = CanId::from(eid);
        assert!(id.is_extended());
        assert_eq!(Id::Extended(eid), Id::from(id));
    }
}
