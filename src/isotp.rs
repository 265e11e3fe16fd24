// socketcan-codec/src/isotp.rs
//
// ISO-TP (ISO 15765-2) socket option records.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! ISO-TP socket options.
//!
//! The kernel ISO-TP protocol does all the segmentation and flow control
//! itself. A socket is only configured, through three small records
//! passed at the `SOL_CAN_ISOTP` level:
//!
//! - [`IsoTpOptions`]: `struct can_isotp_options` (12 bytes)
//! - [`FcOptions`]: `struct can_isotp_fc_options` (3 bytes)
//! - [`LlOptions`]: `struct can_isotp_ll_options` (3 bytes)

use crate::{
    errors::ensure_len,
    frame::{CANFD_MTU, CAN_MTU},
    id::{canfd_len_to_dlc, FdFlags, CAN_MAX_DLEN},
    util::{get_u32, put_u32},
    xl::Mtu,
    Error, Result,
};
use bitflags::bitflags;
use std::time::Duration;

/// Socket option level for ISO-TP (`SOL_CAN_BASE + CAN_ISOTP`)
pub const SOL_CAN_ISOTP: i32 = 106;

/// Socket option: `struct can_isotp_options`
pub const CAN_ISOTP_OPTS: i32 = 1;
/// Socket option: `struct can_isotp_fc_options`
pub const CAN_ISOTP_RECV_FC: i32 = 2;
/// Socket option: forced TX separation time, u32 in nanoseconds
pub const CAN_ISOTP_TX_STMIN: i32 = 3;
/// Socket option: forced RX separation time, u32 in nanoseconds
pub const CAN_ISOTP_RX_STMIN: i32 = 4;
/// Socket option: `struct can_isotp_ll_options`
pub const CAN_ISOTP_LL_OPTS: i32 = 5;

/// Default padding byte
pub const CAN_ISOTP_DEFAULT_PAD_CONTENT: u8 = 0xCC;
/// Default frame transmission time, in nanoseconds
pub const CAN_ISOTP_DEFAULT_FRAME_TXTIME: u32 = 50_000;
/// Value of `frame_txtime` that requests a real zero gap
pub const CAN_ISOTP_FRAME_TXTIME_ZERO: u32 = 0xFFFF_FFFF;

/// Size of an encoded `struct can_isotp_options`
pub const ISOTP_OPTIONS_LEN: usize = 12;
/// Size of an encoded `struct can_isotp_fc_options`
pub const ISOTP_FC_OPTIONS_LEN: usize = 3;
/// Size of an encoded `struct can_isotp_ll_options`
pub const ISOTP_LL_OPTIONS_LEN: usize = 3;

bitflags! {
    /// Flags for `can_isotp_options.flags`
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IsoTpFlags: u32 {
        /// Listen only (do not send FC)
        const LISTEN_MODE = 0x0001;
        /// Enable extended addressing
        const EXTEND_ADDR = 0x0002;
        /// Enable CAN frame padding tx path
        const TX_PADDING = 0x0004;
        /// Enable CAN frame padding rx path
        const RX_PADDING = 0x0008;
        /// Check received CAN frame padding
        const CHK_PAD_LEN = 0x0010;
        /// Check received CAN frame padding
        const CHK_PAD_DATA = 0x0020;
        /// Half duplex error state handling
        const HALF_DUPLEX = 0x0040;
        /// Ignore stmin from received FC
        const FORCE_TXSTMIN = 0x0080;
        /// Ignore CFs depending on rx stmin
        const FORCE_RXSTMIN = 0x0100;
        /// Different rx extended addressing
        const RX_EXT_ADDR = 0x0200;
        /// Wait for tx completion
        const WAIT_TX_DONE = 0x0400;
        /// 1-to-N functional addressing
        const SF_BROADCAST = 0x0800;
        /// 1-to-N transmission without FC
        const CF_BROADCAST = 0x1000;
        /// Dynamic FC parameters BS/STmin
        const DYN_FC_PARMS = 0x2000;
    }
}

// ===== IsoTpOptions =====

/// General ISO-TP options, as `struct can_isotp_options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IsoTpOptions {
    /// Option flags
    pub flags: IsoTpFlags,
    /// Frame transmission time (N_As/N_Ar) in nanoseconds
    pub frame_txtime: u32,
    /// Extended addressing byte, for TX (and RX unless `rx_ext_address`)
    pub ext_address: u8,
    /// Padding byte for transmitted frames
    pub txpad: u8,
    /// Padding byte expected in received frames
    pub rxpad: u8,
    /// Extended addressing byte for RX
    pub rx_ext_address: u8,
}

impl Default for IsoTpOptions {
    fn default() -> Self {
        Self {
            flags: IsoTpFlags::empty(),
            frame_txtime: CAN_ISOTP_DEFAULT_FRAME_TXTIME,
            ext_address: 0,
            txpad: CAN_ISOTP_DEFAULT_PAD_CONTENT,
            rxpad: CAN_ISOTP_DEFAULT_PAD_CONTENT,
            rx_ext_address: 0,
        }
    }
}

impl IsoTpOptions {
    /// Uses extended addressing with the given address byte.
    pub fn with_ext_address(mut self, addr: u8) -> Self {
        self.flags |= IsoTpFlags::EXTEND_ADDR;
        self.ext_address = addr;
        self
    }

    /// Uses a separate extended address byte for reception.
    pub fn with_rx_ext_address(mut self, addr: u8) -> Self {
        self.flags |= IsoTpFlags::EXTEND_ADDR | IsoTpFlags::RX_EXT_ADDR;
        self.rx_ext_address = addr;
        self
    }

    /// Pads transmitted frames with the given byte.
    pub fn with_tx_padding(mut self, pad: u8) -> Self {
        self.flags |= IsoTpFlags::TX_PADDING;
        self.txpad = pad;
        self
    }

    /// Expects received frames padded with the given byte.
    pub fn with_rx_padding(mut self, pad: u8) -> Self {
        self.flags |= IsoTpFlags::RX_PADDING;
        self.rxpad = pad;
        self
    }

    /// Sets the frame transmission time.
    ///
    /// A zero duration is sent as [`CAN_ISOTP_FRAME_TXTIME_ZERO`], since
    /// the kernel reads a zero field as "use the default".
    pub fn with_frame_txtime(mut self, txtime: Duration) -> Result<Self> {
        let nanos = txtime.as_nanos();
        self.frame_txtime = match nanos {
            0 => CAN_ISOTP_FRAME_TXTIME_ZERO,
            n if n < CAN_ISOTP_FRAME_TXTIME_ZERO as u128 => n as u32,
            n => {
                return Err(Error::out_of_range(
                    "frame_txtime",
                    n.min(u64::MAX as u128) as u64,
                    (CAN_ISOTP_FRAME_TXTIME_ZERO - 1) as u64,
                ))
            }
        };
        Ok(self)
    }

    /// Encodes the options
    pub fn encode(&self) -> [u8; ISOTP_OPTIONS_LEN] {
        let mut buf = [0u8; ISOTP_OPTIONS_LEN];
        put_u32(&mut buf, 0, self.flags.bits());
        put_u32(&mut buf, 4, self.frame_txtime);
        buf[8] = self.ext_address;
        buf[9] = self.txpad;
        buf[10] = self.rxpad;
        buf[11] = self.rx_ext_address;
        buf
    }

    /// Decodes the options
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, ISOTP_OPTIONS_LEN)?;
        Ok(Self {
            flags: IsoTpFlags::from_bits_retain(get_u32(buf, 0)),
            frame_txtime: get_u32(buf, 4),
            ext_address: buf[8],
            txpad: buf[9],
            rxpad: buf[10],
            rx_ext_address: buf[11],
        })
    }
}

// ===== Separation time =====

/// An encoded ISO-TP separation time (STmin).
///
/// - `0x00..=0x7F`: 0-127 ms
/// - `0xF1..=0xF9`: 100-900 us
///
/// Everything else is reserved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StMin(pub u8);

impl StMin {
    /// The separation time, or `None` for a reserved value.
    pub fn duration(&self) -> Option<Duration> {
        match self.0 {
            n @ 0x00..=0x7F => Some(Duration::from_millis(n as u64)),
            n @ 0xF1..=0xF9 => Some(Duration::from_micros((n as u64 - 0xF0) * 100)),
            _ => None,
        }
    }
}

impl TryFrom<Duration> for StMin {
    type Error = Error;

    /// Encodes a separation time, which must be exactly representable.
    fn try_from(dur: Duration) -> Result<Self> {
        let micros = dur.as_micros();
        match micros {
            n if n % 1000 == 0 && n / 1000 <= 0x7F => Ok(StMin((n / 1000) as u8)),
            n if (100..=900).contains(&n) && n % 100 == 0 => Ok(StMin(0xF0 + (n / 100) as u8)),
            n => Err(Error::out_of_range(
                "STmin (us)",
                n.min(u64::MAX as u128) as u64,
                127_000u64,
            )),
        }
    }
}

// ===== FcOptions =====

/// Flow control options, as `struct can_isotp_fc_options`.
///
/// These are the values the socket sends in its own FC frames.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FcOptions {
    /// Block size. 0 means no further FC frames.
    pub bs: u8,
    /// Separation time
    pub stmin: StMin,
    /// Max number of wait frames. 0 means wait frames are off.
    pub wftmax: u8,
}

impl FcOptions {
    /// Creates a set of flow control options
    pub fn new(bs: u8, stmin: StMin, wftmax: u8) -> Self {
        Self { bs, stmin, wftmax }
    }

    /// Encodes the options
    pub fn encode(&self) -> [u8; ISOTP_FC_OPTIONS_LEN] {
        [self.bs, self.stmin.0, self.wftmax]
    }

    /// Decodes the options
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, ISOTP_FC_OPTIONS_LEN)?;
        Ok(Self::new(buf[0], StMin(buf[1]), buf[2]))
    }
}

// ===== LlOptions =====

/// Link layer options, as `struct can_isotp_ll_options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LlOptions {
    mtu: u8,
    tx_dl: u8,
    tx_flags: FdFlags,
}

impl Default for LlOptions {
    fn default() -> Self {
        Self {
            mtu: CAN_MTU as u8,
            tx_dl: CAN_MAX_DLEN as u8,
            tx_flags: FdFlags::empty(),
        }
    }
}

impl LlOptions {
    /// Creates a set of link layer options.
    ///
    /// The MTU must be that of a classic or FD interface. The TX data
    /// length must be 8 or one of the larger FD lengths. A classic MTU
    /// can only send 8-byte frames, without FD flags.
    pub fn new(mtu: Mtu, tx_dl: u8, tx_flags: FdFlags) -> Result<Self> {
        let mtu = match mtu {
            Mtu::Standard | Mtu::Fd => mtu.bytes() as u8,
            Mtu::Xl(n) => return Err(Error::InvalidLength(n as usize)),
        };
        let opts = Self {
            mtu,
            tx_dl,
            tx_flags,
        };
        opts.validate()?;
        Ok(opts)
    }

    /// Options for a CAN FD link.
    pub fn fd(tx_dl: u8, tx_flags: FdFlags) -> Result<Self> {
        Self::new(Mtu::Fd, tx_dl, tx_flags)
    }

    fn validate(&self) -> Result<()> {
        let mtu = self.mtu as usize;
        if mtu != CAN_MTU && mtu != CANFD_MTU {
            return Err(Error::InvalidLength(mtu));
        }

        let tx_dl = self.tx_dl as usize;
        if tx_dl < CAN_MAX_DLEN || canfd_len_to_dlc(tx_dl).is_err() {
            return Err(Error::InvalidLength(tx_dl));
        }

        if mtu == CAN_MTU {
            if tx_dl != CAN_MAX_DLEN {
                return Err(Error::out_of_range("tx_dl", self.tx_dl, CAN_MAX_DLEN as u8));
            }
            if !self.tx_flags.is_empty() {
                return Err(Error::out_of_range("tx_flags", self.tx_flags.bits(), 0u8));
            }
        }
        Ok(())
    }

    /// The link MTU
    pub fn mtu(&self) -> Mtu {
        if self.mtu as usize == CANFD_MTU {
            Mtu::Fd
        } else {
            Mtu::Standard
        }
    }

    /// The data length of transmitted frames
    pub fn tx_dl(&self) -> u8 {
        self.tx_dl
    }

    /// The FD flags of transmitted frames
    pub fn tx_flags(&self) -> FdFlags {
        self.tx_flags
    }

    /// Encodes the options
    pub fn encode(&self) -> [u8; ISOTP_LL_OPTIONS_LEN] {
        [self.mtu, self.tx_dl, self.tx_flags.bits()]
    }

    /// Decodes and validates the options
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, ISOTP_LL_OPTIONS_LEN)?;
        let opts = Self {
            mtu: buf[0],
            tx_dl: buf[1],
            tx_flags: FdFlags::from_bits_retain(buf[2]),
        };
        opts.validate()?;
        Ok(opts)
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = IsoTpOptions::default();
        assert_eq!(
            opts.encode(),
            [0, 0, 0, 0, 0x50, 0xC3, 0, 0, 0, 0xCC, 0xCC, 0]
        );

        let ll = LlOptions::default();
        assert_eq!(Mtu::Standard, ll.mtu());
        assert_eq!([16, 8, 0], ll.encode());

        assert_eq!([0, 0, 0], FcOptions::default().encode());
    }

    #[test]
    fn test_options_layout() {
        let opts = IsoTpOptions::default()
            .with_ext_address(0xF1)
            .with_tx_padding(0xAA)
            .with_rx_padding(0x55)
            .with_frame_txtime(Duration::from_micros(100))
            .unwrap();

        let flags = IsoTpFlags::EXTEND_ADDR | IsoTpFlags::TX_PADDING | IsoTpFlags::RX_PADDING;
        assert_eq!(flags, opts.flags);

        let bytes = opts.encode();
        assert_eq!(bytes, [0x0E, 0, 0, 0, 0xA0, 0x86, 0x01, 0, 0xF1, 0xAA, 0x55, 0]);
        assert_eq!(opts, IsoTpOptions::decode(&bytes).unwrap());
        assert!(IsoTpOptions::decode(&bytes[..11]).is_err());

        let opts = IsoTpOptions::default().with_rx_ext_address(0x22);
        assert!(opts.flags.contains(IsoTpFlags::RX_EXT_ADDR));
        assert_eq!(0x22, opts.encode()[11]);
    }

    #[test]
    fn test_frame_txtime() {
        let opts = IsoTpOptions::default().with_frame_txtime(Duration::ZERO).unwrap();
        assert_eq!(CAN_ISOTP_FRAME_TXTIME_ZERO, opts.frame_txtime);

        assert!(IsoTpOptions::default()
            .with_frame_txtime(Duration::from_secs(5))
            .is_err());
    }

    #[test]
    fn test_stmin() {
        assert_eq!(Some(Duration::from_millis(0x7F)), StMin(0x7F).duration());
        assert_eq!(Some(Duration::from_micros(100)), StMin(0xF1).duration());
        assert_eq!(Some(Duration::from_micros(900)), StMin(0xF9).duration());
        assert_eq!(None, StMin(0x80).duration());
        assert_eq!(None, StMin(0xF0).duration());
        assert_eq!(None, StMin(0xFA).duration());

        assert_eq!(Ok(StMin(0x0A)), StMin::try_from(Duration::from_millis(10)));
        assert_eq!(Ok(StMin(0xF5)), StMin::try_from(Duration::from_micros(500)));
        assert_eq!(Ok(StMin(0)), StMin::try_from(Duration::ZERO));
        assert!(StMin::try_from(Duration::from_micros(150)).is_err());
        assert!(StMin::try_from(Duration::from_millis(128)).is_err());
        assert!(matches!(
            StMin::try_from(Duration::from_secs(1)),
            Err(Error::OutOfRange {
                field: "STmin (us)",
                value: 1_000_000,
                ..
            })
        ));
    }

    #[test]
    fn test_fc_options() {
        let fc = FcOptions::new(8, StMin(0xF3), 2);
        assert_eq!([8, 0xF3, 2], fc.encode());
        assert_eq!(fc, FcOptions::decode(&fc.encode()).unwrap());
        assert!(FcOptions::decode(&[1, 2]).is_err());
    }

    #[test]
    fn test_ll_options() {
        let ll = LlOptions::fd(64, FdFlags::BRS).unwrap();
        assert_eq!([72, 64, 0x01], ll.encode());
        assert_eq!(ll, LlOptions::decode(&ll.encode()).unwrap());
        assert_eq!(Mtu::Fd, ll.mtu());

        // Classic links only carry 8-byte frames without FD flags
        assert!(LlOptions::new(Mtu::Standard, 8, FdFlags::empty()).is_ok());
        assert!(matches!(
            LlOptions::new(Mtu::Standard, 12, FdFlags::empty()),
            Err(Error::OutOfRange { field: "tx_dl", .. })
        ));
        assert!(matches!(
            LlOptions::new(Mtu::Standard, 8, FdFlags::BRS),
            Err(Error::OutOfRange {
                field: "tx_flags",
                ..
            })
        ));

        // Not an FD length, or shorter than a classic frame
        assert_eq!(Err(Error::InvalidLength(10)), LlOptions::fd(10, FdFlags::empty()));
        assert_eq!(Err(Error::InvalidLength(4)), LlOptions::fd(4, FdFlags::empty()));

        assert!(LlOptions::new(Mtu::Xl(2060), 64, FdFlags::empty()).is_err());
        assert_eq!(Err(Error::InvalidLength(32)), LlOptions::decode(&[32, 8, 0]));
    }
}
