// socketcan-codec/src/nl/rt.rs
//
// Low-level Netlink SocketCAN data structs and constants.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Low-level Netlink SocketCAN data structs and constants.
//!
//! These are missing from the `libc` crate, so they are added here as a
//! stand-in, from `linux/netlink.h`, `linux/rtnetlink.h`, `linux/if_link.h`
//! and `linux/can/netlink.h`. Each struct has an explicit little-endian
//! codec through the [`AttrPayload`] trait.

#![allow(non_camel_case_types)]

use super::AttrPayload;
use crate::{
    errors::ensure_len,
    util::{get_u16, get_u32, put_u16, put_u32},
    Error, Result,
};

// ===== linux/netlink.h =====

/// Nothing
pub const NLMSG_NOOP: u16 = 0x1;
/// Error (or ACK)
pub const NLMSG_ERROR: u16 = 0x2;
/// End of a multipart message
pub const NLMSG_DONE: u16 = 0x3;
/// Data lost
pub const NLMSG_OVERRUN: u16 = 0x4;

/// It is a request message
pub const NLM_F_REQUEST: u16 = 0x01;
/// Multipart message, terminated by NLMSG_DONE
pub const NLM_F_MULTI: u16 = 0x02;
/// Reply with ACK, with zero or error code
pub const NLM_F_ACK: u16 = 0x04;
/// Echo this request
pub const NLM_F_ECHO: u16 = 0x08;
/// Dump was inconsistent due to sequence change
pub const NLM_F_DUMP_INTR: u16 = 0x10;

/// GET request: specify tree root
pub const NLM_F_ROOT: u16 = 0x100;
/// GET request: return all matching
pub const NLM_F_MATCH: u16 = 0x200;
/// GET request: return the whole table
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

/// NEW request: override existing
pub const NLM_F_REPLACE: u16 = 0x100;
/// NEW request: do not touch, if it exists
pub const NLM_F_EXCL: u16 = 0x200;
/// NEW request: create, if it does not exist
pub const NLM_F_CREATE: u16 = 0x400;

/// Attribute carries nested attributes
pub const NLA_F_NESTED: u16 = 0x8000;
/// Attribute payload is in network byte order
pub const NLA_F_NET_BYTEORDER: u16 = 0x4000;
/// Mask for the attribute type, without the flag bits
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

// ===== linux/rtnetlink.h =====

/// Create a link
pub const RTM_NEWLINK: u16 = 16;
/// Delete a link
pub const RTM_DELLINK: u16 = 17;
/// Query a link
pub const RTM_GETLINK: u16 = 18;
/// Create a route (CAN gateway rule)
pub const RTM_NEWROUTE: u16 = 24;
/// Delete a route (CAN gateway rule)
pub const RTM_DELROUTE: u16 = 25;
/// Query routes (CAN gateway rules)
pub const RTM_GETROUTE: u16 = 26;

/// Interface is up
pub const IFF_UP: u32 = 0x1;

// ===== linux/if_link.h =====

/// Interface name
pub const IFLA_IFNAME: u16 = 3;
/// Interface MTU
pub const IFLA_MTU: u16 = 4;
/// Link info (nested)
pub const IFLA_LINKINFO: u16 = 18;
/// Extended info filter mask
pub const IFLA_EXT_MASK: u16 = 29;

/// Link kind, as a string
pub const IFLA_INFO_KIND: u16 = 1;
/// Link kind specific data (nested)
pub const IFLA_INFO_DATA: u16 = 2;

/// Extended info filter: VF info
pub const EXT_FILTER_VF: u32 = 1 << 0;

// ===== linux/can/netlink.h =====

/// CAN netlink interface attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IflaCan {
    Unspec = 0,
    BitTiming = 1,
    BitTimingConst = 2,
    Clock = 3,
    State = 4,
    CtrlMode = 5,
    RestartMs = 6,
    Restart = 7,
    BerrCounter = 8,
    DataBitTiming = 9,
    DataBitTimingConst = 10,
    Termination = 11,
    TerminationConst = 12,
    BitRateConst = 13,
    DataBitRateConst = 14,
    BitRateMax = 15,
    Tdc = 16,
    CtrlModeExt = 17,
}

impl From<u16> for IflaCan {
    fn from(val: u16) -> Self {
        use IflaCan::*;

        match val {
            1 => BitTiming,
            2 => BitTimingConst,
            3 => Clock,
            4 => State,
            5 => CtrlMode,
            6 => RestartMs,
            7 => Restart,
            8 => BerrCounter,
            9 => DataBitTiming,
            10 => DataBitTimingConst,
            11 => Termination,
            12 => TerminationConst,
            13 => BitRateConst,
            14 => DataBitRateConst,
            15 => BitRateMax,
            16 => Tdc,
            17 => CtrlModeExt,
            _ => Unspec,
        }
    }
}

/// CAN bit-timing parameters
///
/// For further information, please read chapter "8 BIT TIMING
/// REQUIREMENTS" of the "Bosch CAN Specification version 2.0"
/// at http://www.semiconductors.bosch.de/pdf/can2spec.pdf.
///
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct can_bittiming {
    pub bitrate: u32,      // Bit-rate in bits/second
    pub sample_point: u32, // Sample point in one-tenth of a percent
    pub tq: u32,           // Time quanta (TQ) in nanoseconds
    pub prop_seg: u32,     // Propagation segment in TQs
    pub phase_seg1: u32,   // Phase buffer segment 1 in TQs
    pub phase_seg2: u32,   // Phase buffer segment 2 in TQs
    pub sjw: u32,          // Synchronisation jump width in TQs
    pub brp: u32,          // Bit-rate prescaler
}

impl AttrPayload for can_bittiming {
    fn to_bytes(&self) -> Vec<u8> {
        [
            self.bitrate,
            self.sample_point,
            self.tq,
            self.prop_seg,
            self.phase_seg1,
            self.phase_seg2,
            self.sjw,
            self.brp,
        ]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect()
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 32)?;
        Ok(Self {
            bitrate: get_u32(buf, 0),
            sample_point: get_u32(buf, 4),
            tq: get_u32(buf, 8),
            prop_seg: get_u32(buf, 12),
            phase_seg1: get_u32(buf, 16),
            phase_seg2: get_u32(buf, 20),
            sjw: get_u32(buf, 24),
            brp: get_u32(buf, 28),
        })
    }
}

/// CAN hardware-dependent bit-timing constant
///
/// Used for calculating and checking bit-timing parameters
///
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct can_bittiming_const {
    pub name: [u8; 16], // Name of the CAN controller hardware
    pub tseg1_min: u32, // Time segment 1 = prop_seg + phase_seg1
    pub tseg1_max: u32,
    pub tseg2_min: u32, // Time segment 2 = phase_seg2
    pub tseg2_max: u32,
    pub sjw_max: u32, // Synchronisation jump width
    pub brp_min: u32, // Bit-rate prescaler
    pub brp_max: u32,
    pub brp_inc: u32,
}

impl can_bittiming_const {
    /// The controller name, up to the first NUL
    pub fn name(&self) -> String {
        let n = self.name.iter().position(|&c| c == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..n]).into_owned()
    }
}

impl AttrPayload for can_bittiming_const {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.name.to_vec();
        for v in [
            self.tseg1_min,
            self.tseg1_max,
            self.tseg2_min,
            self.tseg2_max,
            self.sjw_max,
            self.brp_min,
            self.brp_max,
            self.brp_inc,
        ] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 48)?;
        let mut name = [0u8; 16];
        name.copy_from_slice(&buf[..16]);
        Ok(Self {
            name,
            tseg1_min: get_u32(buf, 16),
            tseg1_max: get_u32(buf, 20),
            tseg2_min: get_u32(buf, 24),
            tseg2_max: get_u32(buf, 28),
            sjw_max: get_u32(buf, 32),
            brp_min: get_u32(buf, 36),
            brp_max: get_u32(buf, 40),
            brp_inc: get_u32(buf, 44),
        })
    }
}

/// CAN clock parameters
///
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct can_clock {
    pub freq: u32, // CAN system clock frequency in Hz
}

impl AttrPayload for can_clock {
    fn to_bytes(&self) -> Vec<u8> {
        self.freq.to_le_bytes().to_vec()
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        u32::from_bytes(buf).map(|freq| Self { freq })
    }
}

/// CAN operational and error states
///
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanState {
    ErrorActive,  // RX/TX error count < 96
    ErrorWarning, // RX/TX error count < 128
    ErrorPassive, // RX/TX error count < 256
    BusOff,       // RX/TX error count >= 256
    Stopped,      // Device is stopped
    Sleeping,     // Device is sleeping
}

impl TryFrom<u32> for CanState {
    type Error = Error;

    fn try_from(val: u32) -> Result<Self> {
        use CanState::*;

        match val {
            0 => Ok(ErrorActive),
            1 => Ok(ErrorWarning),
            2 => Ok(ErrorPassive),
            3 => Ok(BusOff),
            4 => Ok(Stopped),
            5 => Ok(Sleeping),
            _ => Err(Error::out_of_range("CAN state", val, 5u32)),
        }
    }
}

/// CAN bus error counters
///
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct can_berr_counter {
    pub txerr: u16,
    pub rxerr: u16,
}

impl AttrPayload for can_berr_counter {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 4];
        put_u16(&mut buf, 0, self.txerr);
        put_u16(&mut buf, 2, self.rxerr);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 4)?;
        Ok(Self {
            txerr: get_u16(buf, 0),
            rxerr: get_u16(buf, 2),
        })
    }
}

/// CAN controller mode
///
/// To set or clear a bit, set the `mask` for that bit, then set or clear
/// the bit in the `flags`.
///
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct can_ctrlmode {
    pub mask: u32,
    pub flags: u32,
}

impl AttrPayload for can_ctrlmode {
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        put_u32(&mut buf, 0, self.mask);
        put_u32(&mut buf, 4, self.flags);
        buf
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 8)?;
        Ok(Self {
            mask: get_u32(buf, 0),
            flags: get_u32(buf, 4),
        })
    }
}

/// Loopback mode
pub const CAN_CTRLMODE_LOOPBACK: u32 = 0x01;
/// Listen-only mode
pub const CAN_CTRLMODE_LISTENONLY: u32 = 0x02;
/// Triple sampling mode
pub const CAN_CTRLMODE_3_SAMPLES: u32 = 0x04;
/// One-Shot mode
pub const CAN_CTRLMODE_ONE_SHOT: u32 = 0x08;
/// Bus-error reporting
pub const CAN_CTRLMODE_BERR_REPORTING: u32 = 0x10;
/// CAN FD mode
pub const CAN_CTRLMODE_FD: u32 = 0x20;
/// Ignore missing CAN ACKs
pub const CAN_CTRLMODE_PRESUME_ACK: u32 = 0x40;
/// CAN FD in non-ISO mode
pub const CAN_CTRLMODE_FD_NON_ISO: u32 = 0x80;
/// Classic CAN DLC option
pub const CAN_CTRLMODE_CC_LEN8_DLC: u32 = 0x100;

/// u16 termination range: 1..65535 Ohms
pub const CAN_TERMINATION_DISABLED: u16 = 0;

/////////////////////////////////////////////////////////////////////////////
