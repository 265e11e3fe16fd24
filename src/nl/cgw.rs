// socketcan-codec/src/nl/cgw.rs
//
// CAN gateway (can-gw) rules over Netlink.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN gateway rule codec.
//!
//! The kernel `can-gw` module routes frames from one CAN interface to
//! another, optionally filtering them and modifying them on the way. Its
//! rules are added, removed and listed with `RTM_NEWROUTE`,
//! `RTM_DELROUTE` and `RTM_GETROUTE` netlink messages, each carrying a
//! 4-byte `struct rtcanmsg` family header and a list of `CGW_*`
//! attributes.
//!
//! A rule is typed as classic or CAN FD when it is created. The frame
//! modifiers it carries must be of the same kind, which is checked when a
//! modifier is assigned.
//!
//! The definitions are in the Linux sources here:
//!
//! <https://github.com/torvalds/linux/blob/master/include/uapi/linux/can/gw.h?ts=4>
//!
//! and the user-space `cangw` tool from can-utils shows how they are used.

use super::{
    attributes, messages,
    rt::{
        NLMSG_DONE, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, RTM_DELROUTE, RTM_GETROUTE,
        RTM_NEWROUTE,
    },
    AttrWriter, MessageBuilder,
};
use crate::{
    errors::ensure_len,
    frame::{CanFilter, ClassicFrame, FdFrame, Frame, FrameKind, CANFD_MTU, CAN_MTU},
    id::{CANFD_MAX_DLEN, CAN_EFF_MASK, CAN_MAX_DLEN},
    util::{get_u16, get_u32, put_u16, put_u32, slice_to_array},
    Error, Result,
};
use bitflags::bitflags;
use embedded_can::Frame as EmbeddedFrame;
use itertools::Itertools;
use libc::canid_t;
use log::debug;
use std::fmt;

/// The CAN address family
pub const AF_CAN: u8 = libc::AF_CAN as u8;

/// Unspecified gateway type
pub const CGW_TYPE_UNSPEC: u8 = 0;
/// CAN to CAN gateway
pub const CGW_TYPE_CAN_CAN: u8 = 1;

/// The size of an encoded `struct rtcanmsg`
pub const RTCANMSG_LEN: usize = 4;

/// CGW attribute: classic AND modifier
pub const CGW_MOD_AND: u16 = 1;
/// CGW attribute: classic OR modifier
pub const CGW_MOD_OR: u16 = 2;
/// CGW attribute: classic XOR modifier
pub const CGW_MOD_XOR: u16 = 3;
/// CGW attribute: classic SET modifier
pub const CGW_MOD_SET: u16 = 4;
/// CGW attribute: XOR checksum
pub const CGW_CS_XOR: u16 = 5;
/// CGW attribute: CRC8 checksum
pub const CGW_CS_CRC8: u16 = 6;
/// CGW attribute: number of handled frames
pub const CGW_HANDLED: u16 = 7;
/// CGW attribute: number of dropped frames
pub const CGW_DROPPED: u16 = 8;
/// CGW attribute: source interface index
pub const CGW_SRC_IF: u16 = 9;
/// CGW attribute: destination interface index
pub const CGW_DST_IF: u16 = 10;
/// CGW attribute: receive filter
pub const CGW_FILTER: u16 = 11;
/// CGW attribute: number of frames deleted by a modifier
pub const CGW_DELETED: u16 = 12;
/// CGW attribute: hop limit
pub const CGW_LIM_HOPS: u16 = 13;
/// CGW attribute: user defined identifier of the modification
pub const CGW_MOD_UID: u16 = 14;
/// CGW attribute: FD AND modifier
pub const CGW_FDMOD_AND: u16 = 15;
/// CGW attribute: FD OR modifier
pub const CGW_FDMOD_OR: u16 = 16;
/// CGW attribute: FD XOR modifier
pub const CGW_FDMOD_XOR: u16 = 17;
/// CGW attribute: FD SET modifier
pub const CGW_FDMOD_SET: u16 = 18;

/// The size of a classic modifier, `struct cgw_frame_mod`
pub const CGW_FRAME_MOD_LEN: usize = CAN_MTU + 1;
/// The size of an FD modifier, `struct cgw_fdframe_mod`
pub const CGW_FDFRAME_MOD_LEN: usize = CANFD_MTU + 1;
/// The size of `struct cgw_csum_xor`
pub const CGW_CS_XOR_LEN: usize = 4;
/// The size of `struct cgw_csum_crc8`
pub const CGW_CS_CRC8_LEN: usize = 5 + 256 + 1 + CGW_CRC8PRF_DATA_LEN;
/// The size of the CRC8 profile data
pub const CGW_CRC8PRF_DATA_LEN: usize = 20;

/// The fewest hops a rule may be limited to
pub const CGW_MIN_HOPS: u8 = 1;
/// The most hops a rule may be limited to
pub const CGW_MAX_HOPS: u8 = 6;

bitflags! {
    /// The flags of a gateway rule, in `struct rtcanmsg`.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CgwFlags: u16 {
        /// Echo the routed frames back to the source (loopback)
        const ECHO = 0x01;
        /// Keep the timestamp of the source frame
        const SRC_TSTAMP = 0x02;
        /// Allow routing back to the receiving interface
        const IIF_TX_OK = 0x04;
        /// The rule handles CAN FD frames
        const CAN_FD = 0x08;
    }
}

bitflags! {
    /// The parts of a frame a modifier applies to.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModTargets: u8 {
        /// The CAN ID
        const ID = 0x01;
        /// The length (DLC)
        const LEN = 0x02;
        /// The data bytes
        const DATA = 0x04;
        /// The FD flags (FD only)
        const FLAGS = 0x08;
    }
}

impl ModTargets {
    /// The same as `LEN`
    pub const DLC: Self = Self::LEN;
}

/// Decodes modifier targets, rejecting unknown bits.
fn mod_targets(bits: u8) -> Result<ModTargets> {
    ModTargets::from_bits(bits)
        .ok_or_else(|| Error::out_of_range("modifier targets", bits, ModTargets::all().bits()))
}

// ===== Rtcanmsg =====

/// The family header of a gateway message, as `struct rtcanmsg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rtcanmsg {
    /// Address family (AF_CAN)
    pub family: u8,
    /// The gateway type (CGW_TYPE_*)
    pub gwtype: u8,
    /// Rule flags
    pub flags: CgwFlags,
}

impl Rtcanmsg {
    /// A CAN-to-CAN header with the given flags.
    pub fn can_can(flags: CgwFlags) -> Self {
        Self {
            family: AF_CAN,
            gwtype: CGW_TYPE_CAN_CAN,
            flags,
        }
    }

    /// Encodes the header
    pub fn encode(&self) -> [u8; RTCANMSG_LEN] {
        let mut buf = [self.family, self.gwtype, 0, 0];
        put_u16(&mut buf, 2, self.flags.bits());
        buf
    }

    /// Decodes the header from the front of a message payload.
    ///
    /// Unknown flag bits are kept.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, RTCANMSG_LEN)?;
        Ok(Self {
            family: buf[0],
            gwtype: buf[1],
            flags: CgwFlags::from_bits_retain(get_u16(buf, 2)),
        })
    }
}

// ===== Modifiers =====

/// The operation of a frame modifier.
///
/// The kernel applies them in this order: AND, OR, XOR, SET.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModOp {
    /// Bitwise AND with the modifier frame
    And,
    /// Bitwise OR with the modifier frame
    Or,
    /// Bitwise XOR with the modifier frame
    Xor,
    /// Replace with the modifier frame
    Set,
}

impl ModOp {
    /// All the operations, in the order the kernel applies them
    pub const ALL: [ModOp; 4] = [ModOp::And, ModOp::Or, ModOp::Xor, ModOp::Set];

    /// The attribute type for a modifier of this operation and frame kind
    pub fn attr_type(&self, kind: FrameKind) -> u16 {
        match kind {
            FrameKind::Fd => CGW_FDMOD_AND + *self as u16,
            _ => CGW_MOD_AND + *self as u16,
        }
    }

    /// Gets the operation and frame kind of a modifier attribute type
    pub fn from_attr_type(attr_type: u16) -> Option<(Self, FrameKind)> {
        match attr_type {
            CGW_MOD_AND..=CGW_MOD_SET => {
                Some((Self::ALL[(attr_type - CGW_MOD_AND) as usize], FrameKind::Classic))
            }
            CGW_FDMOD_AND..=CGW_FDMOD_SET => {
                Some((Self::ALL[(attr_type - CGW_FDMOD_AND) as usize], FrameKind::Fd))
            }
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match *self {
            ModOp::And => "AND",
            ModOp::Or => "OR",
            ModOp::Xor => "XOR",
            ModOp::Set => "SET",
        }
    }
}

/// The frame values of a modifier, as the `struct can_frame` or
/// `struct canfd_frame` inside a `struct cgw_frame_mod`.
///
/// These are masks and values applied to the routed frame, not frames on
/// the bus, so the ID word and length are kept exactly as given and never
/// validated. An AND mask of `0x1FFFFFFF`, or a length of `0x0F`, is
/// perfectly ordinary here. `N` is the size of the data field.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModFrame<const N: usize> {
    can_id: canid_t,
    len: u8,
    hdr: [u8; 3],
    data: [u8; N],
}

/// The frame values of a classic modifier
pub type ClassicModFrame = ModFrame<CAN_MAX_DLEN>;
/// The frame values of an FD modifier
pub type FdModFrame = ModFrame<CANFD_MAX_DLEN>;

impl<const N: usize> ModFrame<N> {
    /// The size of the encoded frame
    pub const ENCODED_LEN: usize = 8 + N;

    /// Creates modifier values from the raw ID word, length and data.
    ///
    /// The data is zero-filled to the full size of the data field.
    pub fn new(can_id: canid_t, len: u8, data: &[u8]) -> Result<Self> {
        if data.len() > N {
            return Err(Error::PayloadTooLong {
                len: data.len(),
                max: N,
            });
        }
        Ok(Self {
            can_id,
            len,
            hdr: [0; 3],
            data: slice_to_array(data),
        })
    }

    /// The raw ID word, flags included
    pub fn id_word(&self) -> canid_t {
        self.can_id
    }

    /// The ID bits of the ID word, without the flags
    pub fn raw_id(&self) -> u32 {
        self.can_id & CAN_EFF_MASK
    }

    /// The length value
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the length value is zero
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The FD flags byte. This is padding in a classic frame.
    pub fn flags(&self) -> u8 {
        self.hdr[0]
    }

    /// Sets the FD flags byte
    pub fn set_flags(&mut self, flags: u8) {
        self.hdr[0] = flags;
    }

    /// The whole data field.
    ///
    /// The kernel applies the data of a modifier to every byte of the
    /// routed frame, whatever the length value.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encodes the values in the kernel frame layout
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; Self::ENCODED_LEN];
        put_u32(&mut buf, 0, self.can_id);
        buf[4] = self.len;
        buf[5..8].copy_from_slice(&self.hdr);
        buf[8..].copy_from_slice(&self.data);
        buf
    }

    /// Decodes the values, field by field, with no checks beyond the
    /// buffer size.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, Self::ENCODED_LEN)?;
        Ok(Self {
            can_id: get_u32(buf, 0),
            len: buf[4],
            hdr: [buf[5], buf[6], buf[7]],
            data: slice_to_array(&buf[8..Self::ENCODED_LEN]),
        })
    }
}

impl<const N: usize> Default for ModFrame<N> {
    fn default() -> Self {
        Self {
            can_id: 0,
            len: 0,
            hdr: [0; 3],
            data: [0; N],
        }
    }
}

impl<const N: usize> fmt::Debug for ModFrame<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ModFrame")
            .field("can_id", &format_args!("{:#X}", self.can_id))
            .field("len", &self.len)
            .field("flags", &format_args!("{:#X}", self.flags()))
            .field("data", &hex::encode_upper(self.data))
            .finish()
    }
}

impl From<ClassicFrame> for ClassicModFrame {
    fn from(frame: ClassicFrame) -> Self {
        let mut data = [0u8; CAN_MAX_DLEN];
        let payload = frame.data();
        data[..payload.len()].copy_from_slice(payload);
        Self {
            can_id: frame.id_word(),
            len: frame.len() as u8,
            hdr: [0, 0, frame.len8_dlc().unwrap_or(0)],
            data,
        }
    }
}

impl From<FdFrame> for FdModFrame {
    fn from(frame: FdFrame) -> Self {
        let mut data = [0u8; CANFD_MAX_DLEN];
        let payload = frame.data();
        data[..payload.len()].copy_from_slice(payload);
        Self {
            can_id: frame.id_word(),
            len: frame.len() as u8,
            hdr: [frame.flags().bits(), 0, 0],
            data,
        }
    }
}

/// The frame values carried by a modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierPayload {
    /// Values for a classic CAN frame
    Classic(ClassicModFrame),
    /// Values for a CAN FD frame
    Fd(FdModFrame),
}

impl ModifierPayload {
    /// The kind of frame
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Classic(_) => FrameKind::Classic,
            Self::Fd(_) => FrameKind::Fd,
        }
    }
}

/// A frame modifier of a gateway rule.
///
/// The modifier applies its operation, with the values in its frame, to
/// the parts of the routed frame selected by its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CgwModifier {
    op: ModOp,
    targets: ModTargets,
    payload: ModifierPayload,
}

impl CgwModifier {
    /// Creates a modifier for a classic rule.
    ///
    /// Classic frames have no flags, so the `FLAGS` target is rejected
    /// with a type mismatch.
    pub fn classic<F>(op: ModOp, frame: F, targets: ModTargets) -> Result<Self>
    where
        F: Into<ClassicModFrame>,
    {
        if targets.contains(ModTargets::FLAGS) {
            return Err(Error::TypeMismatch {
                expected: FrameKind::Fd,
                found: FrameKind::Classic,
            });
        }
        Ok(Self {
            op,
            targets,
            payload: ModifierPayload::Classic(frame.into()),
        })
    }

    /// Creates a modifier for an FD rule.
    pub fn fd<F: Into<FdModFrame>>(op: ModOp, frame: F, targets: ModTargets) -> Self {
        Self {
            op,
            targets,
            payload: ModifierPayload::Fd(frame.into()),
        }
    }

    /// The operation
    pub fn op(&self) -> ModOp {
        self.op
    }

    /// The parts of the frame that are modified
    pub fn targets(&self) -> ModTargets {
        self.targets
    }

    /// The modifier frame
    pub fn payload(&self) -> &ModifierPayload {
        &self.payload
    }

    /// The kind of frame this modifier applies to
    pub fn kind(&self) -> FrameKind {
        self.payload.kind()
    }

    /// The attribute type that carries this modifier
    pub fn attr_type(&self) -> u16 {
        self.op.attr_type(self.kind())
    }

    /// Encodes the modifier as `struct cgw_frame_mod` or
    /// `struct cgw_fdframe_mod`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = match &self.payload {
            ModifierPayload::Classic(frame) => frame.encode(),
            ModifierPayload::Fd(frame) => frame.encode(),
        };
        buf.push(self.targets.bits());
        buf
    }

    /// Decodes a modifier from attribute data.
    ///
    /// The frame values are taken as they are. Only the targets are
    /// checked.
    pub fn decode(op: ModOp, kind: FrameKind, buf: &[u8]) -> Result<Self> {
        match kind {
            FrameKind::Fd => {
                ensure_len(buf, CGW_FDFRAME_MOD_LEN)?;
                let frame = FdModFrame::decode(buf)?;
                let targets = mod_targets(buf[CANFD_MTU])?;
                Ok(Self::fd(op, frame, targets))
            }
            _ => {
                ensure_len(buf, CGW_FRAME_MOD_LEN)?;
                let frame = ClassicModFrame::decode(buf)?;
                let targets = mod_targets(buf[CAN_MTU])?;
                Self::classic(op, frame, targets)
            }
        }
    }
}

impl fmt::Display for CgwModifier {
    /// Formats the modifier the way the `cangw` tool takes it,
    /// like `AND:IL:123.8.1122334455667788`
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let targets: String = [
            (ModTargets::ID, 'I'),
            (ModTargets::LEN, 'L'),
            (ModTargets::DATA, 'D'),
            (ModTargets::FLAGS, 'F'),
        ]
        .iter()
        .filter(|(t, _)| self.targets.contains(*t))
        .map(|(_, c)| *c)
        .collect();

        write!(f, "{}:{}:", self.op.name(), targets)?;
        match &self.payload {
            ModifierPayload::Classic(frame) => write!(
                f,
                "{:03X}.{}.{}",
                frame.id_word(),
                frame.len(),
                hex::encode_upper(frame.data())
            ),
            ModifierPayload::Fd(frame) => write!(
                f,
                "{:03X}.{:X}.{}.{}",
                frame.id_word(),
                frame.flags(),
                frame.len(),
                hex::encode_upper(frame.data())
            ),
        }
    }
}

// ===== Checksums =====

/// XOR checksum configuration, as `struct cgw_csum_xor`.
///
/// The indices are into the frame data. Negative values are relative to
/// the end of the received data, so -1 is the last byte.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CsumXor {
    /// The first byte in the checksum
    pub from_idx: i8,
    /// The last byte in the checksum
    pub to_idx: i8,
    /// Where the result goes
    pub result_idx: i8,
    /// The initial value
    pub init_xor_val: u8,
}

impl CsumXor {
    /// Encodes the configuration
    pub fn encode(&self) -> [u8; CGW_CS_XOR_LEN] {
        [
            self.from_idx as u8,
            self.to_idx as u8,
            self.result_idx as u8,
            self.init_xor_val,
        ]
    }

    /// Decodes the configuration
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, CGW_CS_XOR_LEN)?;
        Ok(Self {
            from_idx: buf[0] as i8,
            to_idx: buf[1] as i8,
            result_idx: buf[2] as i8,
            init_xor_val: buf[3],
        })
    }
}

/// The profile of a CRC8 checksum.
///
/// The profile adds a value that depends on the frame to the checksum
/// calculation, as some automotive protocols require.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crc8Profile {
    /// No profile
    #[default]
    Unspecified = 0,
    /// One fixed byte, from the profile data
    OneU8 = 1,
    /// One of 16 bytes, selected by the low nibble of data[1]
    SixteenU8 = 2,
    /// The XOR of the bytes of a standard frame ID
    SffIdXor = 3,
}

impl TryFrom<u8> for Crc8Profile {
    type Error = Error;

    fn try_from(val: u8) -> Result<Self> {
        use Crc8Profile::*;

        match val {
            0 => Ok(Unspecified),
            1 => Ok(OneU8),
            2 => Ok(SixteenU8),
            3 => Ok(SffIdXor),
            _ => Err(Error::out_of_range("CRC8 profile", val, SffIdXor as u8)),
        }
    }
}

/// Computes the lookup table for an MSB-first CRC8 with the polynomial.
pub fn crc8_table(poly: u8) -> [u8; 256] {
    let mut tab = [0u8; 256];
    for (i, entry) in tab.iter_mut().enumerate() {
        let mut crc = i as u8;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ poly
            } else {
                crc << 1
            };
        }
        *entry = crc;
    }
    tab
}

/// CRC8 checksum configuration, as `struct cgw_csum_crc8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsumCrc8 {
    /// The first byte in the checksum
    pub from_idx: i8,
    /// The last byte in the checksum
    pub to_idx: i8,
    /// Where the result goes
    pub result_idx: i8,
    /// The initial CRC value
    pub init_crc_val: u8,
    /// The value XOR'ed into the final CRC
    pub final_xor_val: u8,
    /// The CRC lookup table
    pub crctab: [u8; 256],
    /// The profile
    pub profile: Crc8Profile,
    /// The data for the profile
    pub profile_data: [u8; CGW_CRC8PRF_DATA_LEN],
}

impl Default for CsumCrc8 {
    fn default() -> Self {
        Self {
            from_idx: 0,
            to_idx: 0,
            result_idx: 0,
            init_crc_val: 0,
            final_xor_val: 0,
            crctab: [0; 256],
            profile: Crc8Profile::Unspecified,
            profile_data: [0; CGW_CRC8PRF_DATA_LEN],
        }
    }
}

impl CsumCrc8 {
    /// Creates a configuration over a byte range, with the table for the
    /// given polynomial.
    pub fn new(from_idx: i8, to_idx: i8, result_idx: i8, poly: u8) -> Self {
        Self {
            from_idx,
            to_idx,
            result_idx,
            crctab: crc8_table(poly),
            ..Self::default()
        }
    }

    /// Encodes the configuration
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CGW_CS_CRC8_LEN);
        buf.extend_from_slice(&[
            self.from_idx as u8,
            self.to_idx as u8,
            self.result_idx as u8,
            self.init_crc_val,
            self.final_xor_val,
        ]);
        buf.extend_from_slice(&self.crctab);
        buf.push(self.profile as u8);
        buf.extend_from_slice(&self.profile_data);
        buf
    }

    /// Decodes the configuration
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, CGW_CS_CRC8_LEN)?;
        let mut crctab = [0u8; 256];
        crctab.copy_from_slice(&buf[5..261]);
        let mut profile_data = [0u8; CGW_CRC8PRF_DATA_LEN];
        profile_data.copy_from_slice(&buf[262..CGW_CS_CRC8_LEN]);

        Ok(Self {
            from_idx: buf[0] as i8,
            to_idx: buf[1] as i8,
            result_idx: buf[2] as i8,
            init_crc_val: buf[3],
            final_xor_val: buf[4],
            crctab,
            profile: Crc8Profile::try_from(buf[261])?,
            profile_data,
        })
    }
}

// ===== CgwCanToCanRule =====

/// A CAN-to-CAN gateway rule.
///
/// The counters are only reported by the kernel when rules are listed.
/// They are never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgwCanToCanRule {
    kind: FrameKind,
    flags: CgwFlags,
    src_index: u32,
    dst_index: u32,
    filter: Option<CanFilter>,
    modifiers: [Option<CgwModifier>; 4],
    csum_xor: Option<CsumXor>,
    csum_crc8: Option<CsumCrc8>,
    lim_hops: Option<u8>,
    mod_uid: Option<u32>,
    handled: u32,
    dropped: u32,
    deleted: u32,
}

impl CgwCanToCanRule {
    fn new(kind: FrameKind, src_index: u32, dst_index: u32) -> Self {
        let flags = match kind {
            FrameKind::Fd => CgwFlags::CAN_FD,
            _ => CgwFlags::empty(),
        };
        Self {
            kind,
            flags,
            src_index,
            dst_index,
            filter: None,
            modifiers: Default::default(),
            csum_xor: None,
            csum_crc8: None,
            lim_hops: None,
            mod_uid: None,
            handled: 0,
            dropped: 0,
            deleted: 0,
        }
    }

    /// Creates a rule routing classic frames between two interfaces.
    pub fn classic(src_index: u32, dst_index: u32) -> Self {
        Self::new(FrameKind::Classic, src_index, dst_index)
    }

    /// Creates a rule routing CAN FD frames between two interfaces.
    pub fn fd(src_index: u32, dst_index: u32) -> Self {
        Self::new(FrameKind::Fd, src_index, dst_index)
    }

    /// The kind of frames the rule routes
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Whether this is a CAN FD rule
    pub fn is_fd(&self) -> bool {
        self.kind == FrameKind::Fd
    }

    /// The rule flags
    pub fn flags(&self) -> CgwFlags {
        self.flags
    }

    /// Sets the rule flags.
    ///
    /// The `CAN_FD` flag always follows the kind of the rule.
    pub fn set_flags(&mut self, flags: CgwFlags) {
        self.flags = flags - CgwFlags::CAN_FD;
        if self.is_fd() {
            self.flags |= CgwFlags::CAN_FD;
        }
    }

    /// The index of the source interface
    pub fn src_index(&self) -> u32 {
        self.src_index
    }

    /// The index of the destination interface
    pub fn dst_index(&self) -> u32 {
        self.dst_index
    }

    /// The receive filter, if any
    pub fn filter(&self) -> Option<CanFilter> {
        self.filter
    }

    /// Sets or clears the receive filter
    pub fn set_filter<F: Into<Option<CanFilter>>>(&mut self, filter: F) {
        self.filter = filter.into();
    }

    /// Sets a modifier, in the slot for its operation.
    ///
    /// The modifier must be of the same frame kind as the rule.
    pub fn set_modifier(&mut self, modifier: CgwModifier) -> Result<()> {
        if modifier.kind() != self.kind {
            return Err(Error::TypeMismatch {
                expected: self.kind,
                found: modifier.kind(),
            });
        }
        self.modifiers[modifier.op() as usize] = Some(modifier);
        Ok(())
    }

    /// Gets the modifier for an operation
    pub fn modifier(&self, op: ModOp) -> Option<&CgwModifier> {
        self.modifiers[op as usize].as_ref()
    }

    /// Removes the modifier for an operation
    pub fn clear_modifier(&mut self, op: ModOp) -> Option<CgwModifier> {
        self.modifiers[op as usize].take()
    }

    /// The modifiers that are set, in the order they are applied
    pub fn modifiers(&self) -> impl Iterator<Item = &CgwModifier> {
        self.modifiers.iter().flatten()
    }

    fn check_csum_index(&self, idx: i8) -> Result<()> {
        let dlen = match self.kind {
            FrameKind::Fd => CANFD_MAX_DLEN,
            _ => CAN_MAX_DLEN,
        } as i16;
        let idx16 = idx as i16;
        if idx16 < -dlen || idx16 >= dlen {
            return Err(Error::out_of_range(
                "checksum index",
                idx as u8 as u64,
                (dlen - 1) as u64,
            ));
        }
        Ok(())
    }

    fn check_csum_indices(&self, from_idx: i8, to_idx: i8, result_idx: i8) -> Result<()> {
        self.check_csum_index(from_idx)?;
        self.check_csum_index(to_idx)?;
        self.check_csum_index(result_idx)
    }

    /// The XOR checksum configuration, if any
    pub fn csum_xor(&self) -> Option<&CsumXor> {
        self.csum_xor.as_ref()
    }

    /// Sets or clears the XOR checksum.
    ///
    /// The indices must lie within the data of the rule's frame kind,
    /// counting back from the end for negative values.
    pub fn set_csum_xor<C: Into<Option<CsumXor>>>(&mut self, csum: C) -> Result<()> {
        let csum = csum.into();
        if let Some(cs) = &csum {
            self.check_csum_indices(cs.from_idx, cs.to_idx, cs.result_idx)?;
        }
        self.csum_xor = csum;
        Ok(())
    }

    /// The CRC8 checksum configuration, if any
    pub fn csum_crc8(&self) -> Option<&CsumCrc8> {
        self.csum_crc8.as_ref()
    }

    /// Sets or clears the CRC8 checksum.
    ///
    /// The indices are checked like those of the XOR checksum.
    pub fn set_csum_crc8<C: Into<Option<CsumCrc8>>>(&mut self, csum: C) -> Result<()> {
        let csum = csum.into();
        if let Some(cs) = &csum {
            self.check_csum_indices(cs.from_idx, cs.to_idx, cs.result_idx)?;
        }
        self.csum_crc8 = csum;
        Ok(())
    }

    /// The hop limit, if any
    pub fn lim_hops(&self) -> Option<u8> {
        self.lim_hops
    }

    /// Sets or clears the limit on the number of times a frame is routed.
    pub fn set_lim_hops<H: Into<Option<u8>>>(&mut self, hops: H) -> Result<()> {
        let hops = hops.into();
        if let Some(n) = hops {
            if !(CGW_MIN_HOPS..=CGW_MAX_HOPS).contains(&n) {
                return Err(Error::out_of_range("hop limit", n, CGW_MAX_HOPS));
            }
        }
        self.lim_hops = hops;
        Ok(())
    }

    /// The user defined identifier of the rule, if any
    pub fn mod_uid(&self) -> Option<u32> {
        self.mod_uid
    }

    /// Sets or clears the user defined identifier.
    ///
    /// A rule with an identifier can be updated in place, or removed,
    /// by that identifier.
    pub fn set_mod_uid<U: Into<Option<u32>>>(&mut self, uid: U) {
        self.mod_uid = uid.into();
    }

    /// The number of frames handled by the rule
    pub fn handled(&self) -> u32 {
        self.handled
    }

    /// The number of frames dropped by the rule
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// The number of frames deleted by a modifier of the rule
    pub fn deleted(&self) -> u32 {
        self.deleted
    }

    /// Writes the attributes of the rule.
    pub fn encode_attrs(&self, attrs: &mut AttrWriter) -> Result<()> {
        attrs.put_u32(CGW_SRC_IF, self.src_index)?;
        attrs.put_u32(CGW_DST_IF, self.dst_index)?;
        if let Some(filter) = &self.filter {
            attrs.put(CGW_FILTER, &filter.encode())?;
        }
        for modifier in self.modifiers() {
            attrs.put(modifier.attr_type(), &modifier.encode())?;
        }
        if let Some(cs) = &self.csum_xor {
            attrs.put(CGW_CS_XOR, &cs.encode())?;
        }
        if let Some(cs) = &self.csum_crc8 {
            attrs.put(CGW_CS_CRC8, &cs.encode())?;
        }
        if let Some(hops) = self.lim_hops {
            attrs.put_u8(CGW_LIM_HOPS, hops)?;
        }
        if let Some(uid) = self.mod_uid {
            attrs.put_u32(CGW_MOD_UID, uid)?;
        }
        Ok(())
    }

    /// Encodes the rule as a message payload: the family header and the
    /// attributes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut attrs = AttrWriter::new();
        self.encode_attrs(&mut attrs)?;
        let mut buf = Rtcanmsg::can_can(self.flags).encode().to_vec();
        buf.extend_from_slice(attrs.as_bytes());
        Ok(buf)
    }

    fn request(&self, msg_type: u16) -> Result<Vec<u8>> {
        let mut builder = MessageBuilder::new(msg_type, NLM_F_REQUEST | NLM_F_ACK)
            .family_header(&Rtcanmsg::can_can(self.flags).encode());
        self.encode_attrs(builder.attrs())?;
        builder.build()
    }

    /// A request to add the rule, or to update the rule with the same
    /// identifier.
    pub fn add_request(&self) -> Result<Vec<u8>> {
        self.request(RTM_NEWROUTE)
    }

    /// A request to remove the rule.
    pub fn remove_request(&self) -> Result<Vec<u8>> {
        self.request(RTM_DELROUTE)
    }

    /// A request to remove all of the gateway rules.
    pub fn remove_all_request() -> Result<Vec<u8>> {
        Self::classic(0, 0).remove_request()
    }

    /// A request to list all of the gateway rules.
    ///
    /// The multipart reply is decoded with [`parse_rules`].
    pub fn dump_request() -> Result<Vec<u8>> {
        let hdr = Rtcanmsg {
            family: AF_CAN,
            gwtype: CGW_TYPE_UNSPEC,
            flags: CgwFlags::empty(),
        };
        MessageBuilder::new(RTM_GETROUTE, NLM_F_REQUEST | NLM_F_DUMP)
            .family_header(&hdr.encode())
            .build()
    }

    /// Decodes a rule from the payload of an `RTM_NEWROUTE` message.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let hdr = Rtcanmsg::decode(payload)?;
        if hdr.gwtype != CGW_TYPE_CAN_CAN {
            return Err(Error::out_of_range(
                "gateway type",
                hdr.gwtype,
                CGW_TYPE_CAN_CAN,
            ));
        }

        let mut rule = if hdr.flags.contains(CgwFlags::CAN_FD) {
            Self::fd(0, 0)
        } else {
            Self::classic(0, 0)
        };
        rule.flags = hdr.flags;

        for attr in attributes(&payload[RTCANMSG_LEN..]) {
            let attr = attr?;
            let attr_type = attr.attr_type();

            if let Some((op, kind)) = ModOp::from_attr_type(attr_type) {
                let modifier = CgwModifier::decode(op, kind, attr.data)?;
                rule.set_modifier(modifier)?;
                continue;
            }

            match attr_type {
                CGW_SRC_IF => rule.src_index = attr.get()?,
                CGW_DST_IF => rule.dst_index = attr.get()?,
                CGW_FILTER => rule.filter = Some(CanFilter::decode(attr.data)?),
                CGW_CS_XOR => rule.set_csum_xor(CsumXor::decode(attr.data)?)?,
                CGW_CS_CRC8 => rule.set_csum_crc8(CsumCrc8::decode(attr.data)?)?,
                CGW_LIM_HOPS => rule.set_lim_hops(attr.get::<u8>()?)?,
                CGW_MOD_UID => rule.mod_uid = Some(attr.get()?),
                CGW_HANDLED => rule.handled = attr.get()?,
                CGW_DROPPED => rule.dropped = attr.get()?,
                CGW_DELETED => rule.deleted = attr.get()?,
                _ => debug!("Skipping unknown CGW attribute type {}", attr_type),
            }
        }
        Ok(rule)
    }
}

impl fmt::Display for CgwCanToCanRule {
    /// Formats the rule the way `cangw -L` lists it
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "-A -s {} -d {}", self.src_index, self.dst_index)?;
        if self.flags.contains(CgwFlags::ECHO) {
            write!(f, " -e")?;
        }
        if self.flags.contains(CgwFlags::SRC_TSTAMP) {
            write!(f, " -t")?;
        }
        if self.flags.contains(CgwFlags::IIF_TX_OK) {
            write!(f, " -i")?;
        }
        if self.is_fd() {
            write!(f, " -X")?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " -f {:03X}:{:X}", filter.id, filter.mask)?;
        }
        if let Some(hops) = self.lim_hops {
            write!(f, " -l {}", hops)?;
        }
        if let Some(uid) = self.mod_uid {
            write!(f, " -u {:X}", uid)?;
        }
        let mods = self.modifiers().map(|m| format!(" -m {}", m)).join("");
        write!(f, "{}", mods)?;
        if let Some(cs) = &self.csum_xor {
            write!(
                f,
                " -x {}:{}:{}:{:02X}",
                cs.from_idx, cs.to_idx, cs.result_idx, cs.init_xor_val
            )?;
        }
        if let Some(cs) = &self.csum_crc8 {
            write!(
                f,
                " -c {}:{}:{}:{:02X}:{:02X}",
                cs.from_idx, cs.to_idx, cs.result_idx, cs.init_crc_val, cs.final_xor_val
            )?;
        }
        write!(
            f,
            " # {} handled {} dropped {} deleted",
            self.handled, self.dropped, self.deleted
        )
    }
}

// ===== parse_rules =====

/// The rules found in one receive buffer of a rule listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CgwRuleBatch {
    /// The rules, in the order they appeared
    pub rules: Vec<CgwCanToCanRule>,
    /// The buffer ended in a partial message, so another read is needed
    pub has_more: bool,
    /// An `NLMSG_DONE` message ended the listing
    pub done: bool,
}

/// Parses all of the gateway rules in a receive buffer.
///
/// Messages that are not CAN-to-CAN rules are skipped. The walk stops at
/// an `NLMSG_DONE` message. Error replies should be checked for before
/// calling this, with [`NetlinkErrorMessage`](super::NetlinkErrorMessage).
pub fn parse_rules(buf: &[u8]) -> Result<CgwRuleBatch> {
    let mut batch = CgwRuleBatch::default();
    let mut iter = messages(buf);

    for msg in iter.by_ref() {
        let (hdr, payload) = msg?;
        match hdr.msg_type {
            NLMSG_DONE => {
                batch.done = true;
                break;
            }
            RTM_NEWROUTE => {
                if Rtcanmsg::decode(payload)?.gwtype != CGW_TYPE_CAN_CAN {
                    debug!("Skipping gateway rule of unknown type");
                    continue;
                }
                batch.rules.push(CgwCanToCanRule::decode(payload)?);
            }
            msg_type => debug!("Skipping netlink message of type {}", msg_type),
        }
    }

    batch.has_more = iter.is_incomplete();
    if batch.has_more {
        debug!(
            "Rule listing continues past {} rules at offset {}",
            batch.rules.len(),
            iter.offset()
        );
    }
    Ok(batch)
}

/////////////////////////////////////////////////////////////////////////////
