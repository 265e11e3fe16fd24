// socketcan-codec/src/nl/link.rs
//
// Netlink link (interface) requests and replies for CAN interfaces.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN interface link codec.
//!
//! The requests here are the ones a user-space tool like _iproute2_ sends
//! to query or configure a CAN interface. Each one is returned as a
//! complete netlink message, ready to be sent down an `AF_NETLINK`,
//! `NETLINK_ROUTE` socket. The kernel answers a request carrying the ACK
//! flag with an `NLMSG_ERROR` message, which can be checked with
//! [`NetlinkErrorMessage`](super::NetlinkErrorMessage).
//!
//! A query is answered with an `RTM_NEWLINK` message, which is decoded into
//! [`InterfaceDetails`]. The CAN-specific parameters are nested two levels
//! deep in the reply:
//!
//! ```text
//! IFLA_LINKINFO
//!   IFLA_INFO_KIND   "can"
//!   IFLA_INFO_DATA
//!     IFLA_CAN_BITTIMING  ...
//!     IFLA_CAN_CTRLMODE   ...
//! ```
//!
//! The kernel code that receives and processes these messages is useful
//! to help figure out what the kernel expects. It's here:
//!
//! <https://github.com/torvalds/linux/blob/master/drivers/net/can/dev/netlink.c?ts=4>
//!
//! and the CAN-specific code for _iproute2_ is here:
//!
//! <https://github.com/iproute2/iproute2/blob/main/ip/iplink_can.c?ts=4>

use super::{
    attributes, messages,
    rt::{
        self, can_ctrlmode, CanState, IflaCan, EXT_FILTER_VF, IFF_UP, IFLA_EXT_MASK,
        IFLA_IFNAME, IFLA_INFO_DATA, IFLA_INFO_KIND, IFLA_LINKINFO, IFLA_MTU, NLM_F_ACK,
        NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, RTM_DELLINK, RTM_GETLINK, RTM_NEWLINK,
    },
    AttrPayload, AttrWriter, MessageBuilder, RoutingAttribute,
};
use crate::{
    errors::ensure_len,
    util::{get_i32, get_u16, get_u32, put_u16, put_u32},
    xl::Mtu,
    Error, Result,
};
use log::debug;

/// CAN bit-timing parameters
pub type CanBitTiming = rt::can_bittiming;
/// CAN bit-timing const parameters
pub type CanBitTimingConst = rt::can_bittiming_const;
/// CAN clock parameter
pub type CanClock = rt::can_clock;
/// CAN bus error counters
pub type CanBerrCounter = rt::can_berr_counter;

/// The size of an encoded `struct ifinfomsg`
pub const IFINFOMSG_LEN: usize = 16;

/// The largest interface name, including the NUL terminator
pub const IFNAMSIZ: usize = libc::IFNAMSIZ;

/// The highest nominal bitrate accepted for a classic CAN interface
pub const CAN_MAX_BITRATE: u32 = 1_000_000;

// ===== IfInfoMsg =====

/// The link family header, as `struct ifinfomsg`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IfInfoMsg {
    /// Address family (AF_UNSPEC)
    pub family: u8,
    /// Device type (ARPHRD_*)
    pub if_type: u16,
    /// Interface index
    pub index: i32,
    /// Device flags (IFF_*)
    pub flags: u32,
    /// The flags that are being changed
    pub change: u32,
}

impl IfInfoMsg {
    /// A header addressing the interface with the given index.
    pub fn new(index: u32) -> Self {
        Self {
            index: index as i32,
            ..Self::default()
        }
    }

    /// A header that sets the interface up.
    pub fn up(index: u32) -> Self {
        Self {
            flags: IFF_UP,
            change: IFF_UP,
            ..Self::new(index)
        }
    }

    /// A header that sets the interface down.
    pub fn down(index: u32) -> Self {
        Self {
            change: IFF_UP,
            ..Self::new(index)
        }
    }

    /// Encodes the header
    pub fn encode(&self) -> [u8; IFINFOMSG_LEN] {
        let mut buf = [0u8; IFINFOMSG_LEN];
        buf[0] = self.family;
        put_u16(&mut buf, 2, self.if_type);
        put_u32(&mut buf, 4, self.index as u32);
        put_u32(&mut buf, 8, self.flags);
        put_u32(&mut buf, 12, self.change);
        buf
    }

    /// Decodes the header from the front of a message payload
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, IFINFOMSG_LEN)?;
        Ok(Self {
            family: buf[0],
            if_type: get_u16(buf, 2),
            index: get_i32(buf, 4),
            flags: get_u32(buf, 8),
            change: get_u32(buf, 12),
        })
    }
}

// ===== InterfaceDetails =====

/// The details of the interface which can be obtained from the reply to
/// a [`CanInterface::details_request()`].
#[allow(missing_copy_implementations)]
#[derive(Debug, Default, Clone)]
pub struct InterfaceDetails {
    /// The name of the interface
    pub name: Option<String>,
    /// The index of the interface
    pub index: u32,
    /// Whether the interface is currently up
    pub is_up: bool,
    /// The MTU size of the interface (Standard, FD or XL frames support)
    pub mtu: Option<Mtu>,
    /// The CAN-specific parameters for the interface
    pub can: InterfaceCanParams,
}

impl InterfaceDetails {
    /// Creates a new set of interface details with the specified `index`.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Decodes the payload of an `RTM_NEWLINK` message.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let ifi = IfInfoMsg::decode(payload)?;
        let mut info = Self::new(ifi.index as u32);
        info.is_up = ifi.flags & IFF_UP != 0;

        for attr in attributes(&payload[IFINFOMSG_LEN..]) {
            let attr = attr?;
            match attr.attr_type() {
                IFLA_IFNAME => {
                    info.name = Some(attr.get_str());
                }
                IFLA_MTU => {
                    info.mtu = attr
                        .get::<u32>()
                        .ok()
                        .and_then(|mtu| Mtu::try_from(mtu).ok());
                }
                IFLA_LINKINFO => {
                    info.can = InterfaceCanParams::try_from(&attr)?;
                }
                _ => (),
            }
        }
        Ok(info)
    }
}

/// Finds and decodes the first `RTM_NEWLINK` message in a reply buffer.
pub fn parse_details(buf: &[u8]) -> Result<Option<InterfaceDetails>> {
    for msg in messages(buf) {
        let (hdr, payload) = msg?;
        if hdr.msg_type == RTM_NEWLINK {
            return InterfaceDetails::decode(payload).map(Some);
        }
        debug!("Skipping netlink message of type {} in link reply", hdr.msg_type);
    }
    Ok(None)
}

/// The CAN-specific parameters for the interface.
#[allow(missing_copy_implementations)]
#[derive(Debug, Default, Clone)]
pub struct InterfaceCanParams {
    /// The CAN bit timing parameters
    pub bit_timing: Option<CanBitTiming>,
    /// The bit timing const parameters
    pub bit_timing_const: Option<CanBitTimingConst>,
    /// The CAN clock parameters
    pub clock: Option<CanClock>,
    /// The CAN bus state
    pub state: Option<CanState>,
    /// The automatic restart time (in millisec)
    /// Zero means auto-restart is disabled.
    pub restart_ms: u32,
    /// The bit error counter
    pub berr_counter: Option<CanBerrCounter>,
    /// The control mode bits
    pub ctrl_mode: CanCtrlModes,
    /// The FD data bit timing
    pub data_bit_timing: Option<CanBitTiming>,
    /// The FD data bit timing const parameters
    pub data_bit_timing_const: Option<CanBitTimingConst>,
    /// The CANbus termination resistance
    pub termination: u16,
}

impl TryFrom<&RoutingAttribute<'_>> for InterfaceCanParams {
    type Error = Error;

    /// Try to parse the CAN parameters out of a Linkinfo attribute
    fn try_from(link_info: &RoutingAttribute<'_>) -> Result<Self> {
        let mut params = Self::default();

        for info in link_info.nested() {
            let info = info?;
            if info.attr_type() != IFLA_INFO_DATA {
                continue;
            }
            for attr in info.nested() {
                let attr = attr?;
                match IflaCan::from(attr.attr_type()) {
                    IflaCan::BitTiming => {
                        params.bit_timing = Some(attr.get::<CanBitTiming>()?);
                    }
                    IflaCan::BitTimingConst => {
                        params.bit_timing_const = Some(attr.get::<CanBitTimingConst>()?);
                    }
                    IflaCan::Clock => {
                        params.clock = Some(attr.get::<CanClock>()?);
                    }
                    IflaCan::State => {
                        params.state = CanState::try_from(attr.get::<u32>()?).ok();
                    }
                    IflaCan::CtrlMode => {
                        params.ctrl_mode = CanCtrlModes(attr.get::<can_ctrlmode>()?);
                    }
                    IflaCan::RestartMs => {
                        params.restart_ms = attr.get::<u32>()?;
                    }
                    IflaCan::BerrCounter => {
                        params.berr_counter = Some(attr.get::<CanBerrCounter>()?);
                    }
                    IflaCan::DataBitTiming => {
                        params.data_bit_timing = Some(attr.get::<CanBitTiming>()?);
                    }
                    IflaCan::DataBitTimingConst => {
                        params.data_bit_timing_const = Some(attr.get::<CanBitTimingConst>()?);
                    }
                    IflaCan::Termination => {
                        params.termination = attr.get::<u16>()?;
                    }
                    _ => (),
                }
            }
        }
        Ok(params)
    }
}

/// Finds a single CAN parameter in the reply to a details request.
pub fn find_can_param<P: AttrPayload>(buf: &[u8], param: IflaCan) -> Result<Option<P>> {
    for msg in messages(buf) {
        let (hdr, payload) = msg?;
        if hdr.msg_type != RTM_NEWLINK {
            continue;
        }
        ensure_len(payload, IFINFOMSG_LEN)?;
        for top_attr in attributes(&payload[IFINFOMSG_LEN..]) {
            let top_attr = top_attr?;
            if top_attr.attr_type() != IFLA_LINKINFO {
                continue;
            }
            for info in top_attr.nested() {
                let info = info?;
                if info.attr_type() != IFLA_INFO_DATA {
                    continue;
                }
                for attr in info.nested() {
                    let attr = attr?;
                    if attr.attr_type() == param as u16 {
                        return attr.get::<P>().map(Some);
                    }
                }
            }
        }
    }
    Ok(None)
}

// ===== CanCtrlMode(s) =====

///
/// CAN control modes
///
/// Note that these correspond to the bit _numbers_ for the control mode bits.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CanCtrlMode {
    /// Loopback mode
    Loopback,
    /// Listen-only mode
    ListenOnly,
    /// Triple sampling mode
    TripleSampling,
    /// One-Shot mode
    OneShot,
    /// Bus-error reporting
    BerrReporting,
    /// CAN FD mode
    Fd,
    /// Ignore missing CAN ACKs
    PresumeAck,
    /// CAN FD in non-ISO mode
    NonIso,
    /// Classic CAN DLC option
    CcLen8Dlc,
}

impl CanCtrlMode {
    /// Get the mask for the specific control mode
    pub fn mask(&self) -> u32 {
        1u32 << (*self as u32)
    }
}

/// The collection of control modes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CanCtrlModes(can_ctrlmode);

impl CanCtrlModes {
    /// Create a set of CAN control modes from a mask and set of flags.
    pub fn new(mask: u32, flags: u32) -> Self {
        Self(can_ctrlmode { mask, flags })
    }

    /// Create the set of mode flags for a single mode
    pub fn from_mode(mode: CanCtrlMode, on: bool) -> Self {
        let mask = mode.mask();
        let flags = if on { mask } else { 0 };
        Self::new(mask, flags)
    }

    /// Adds a mode flag to the existing set of modes.
    pub fn add(&mut self, mode: CanCtrlMode, on: bool) {
        let mask = mode.mask();
        self.0.mask |= mask;
        if on {
            self.0.flags |= mask;
        }
    }

    /// Whether the mode is reported as on
    pub fn has_mode(&self, mode: CanCtrlMode) -> bool {
        self.0.flags & mode.mask() != 0
    }

    /// Clears all of the mode flags in the collection
    pub fn clear(&mut self) {
        self.0 = can_ctrlmode::default();
    }
}

impl From<can_ctrlmode> for CanCtrlModes {
    fn from(mode: can_ctrlmode) -> Self {
        Self(mode)
    }
}

impl From<CanCtrlModes> for can_ctrlmode {
    fn from(mode: CanCtrlModes) -> Self {
        mode.0
    }
}

impl From<CanCtrlMode> for CanCtrlModes {
    fn from(mode: CanCtrlMode) -> Self {
        Self::from_mode(mode, true)
    }
}

// ===== CanInterface =====

/// SocketCAN Netlink CanInterface
///
/// Builds the netlink requests that bring a CAN device up or down, or
/// configure or query it through the kernel's Netlink interface.
///
/// Note that no check is made that an interface with the index exists.
/// The kernel rejects a request for a missing interface with `ENODEV`.
///
/// Some requests require the sending process/user to have the
/// `CAP_NET_ADMIN` capability, like the root user does. This is indicated
/// by their documentation starting with "PRIVILEGED:".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanInterface {
    if_index: u32,
}

impl CanInterface {
    /// Open a CAN interface.
    ///
    /// Creates a new `CanInterface` instance for the interface index.
    pub fn open_iface(if_index: u32) -> Self {
        Self { if_index }
    }

    /// The interface index
    pub fn index(&self) -> u32 {
        self.if_index
    }

    /// Builds an `RTM_NEWLINK` request with ACK for this interface.
    fn info_msg(
        ifi: IfInfoMsg,
        extra_flags: u16,
        attrs: impl FnOnce(&mut AttrWriter) -> Result<()>,
    ) -> Result<Vec<u8>> {
        Self::link_msg(RTM_NEWLINK, ifi, NLM_F_ACK | extra_flags, attrs)
    }

    fn link_msg(
        msg_type: u16,
        ifi: IfInfoMsg,
        flags: u16,
        attrs: impl FnOnce(&mut AttrWriter) -> Result<()>,
    ) -> Result<Vec<u8>> {
        let mut builder =
            MessageBuilder::new(msg_type, NLM_F_REQUEST | flags).family_header(&ifi.encode());
        attrs(builder.attrs())?;
        builder.build()
    }

    /// A query for the details of the interface.
    ///
    /// The reply is decoded with [`parse_details`] or [`find_can_param`].
    pub fn details_request(&self) -> Result<Vec<u8>> {
        Self::link_msg(RTM_GETLINK, IfInfoMsg::new(self.if_index), 0, |attrs| {
            attrs.put_u32(IFLA_EXT_MASK, EXT_FILTER_VF)
        })
    }

    /// Bring down this interface.
    pub fn bring_down_request(&self) -> Result<Vec<u8>> {
        Self::info_msg(IfInfoMsg::down(self.if_index), 0, |_| Ok(()))
    }

    /// Bring up this interface
    pub fn bring_up_request(&self) -> Result<Vec<u8>> {
        Self::info_msg(IfInfoMsg::up(self.if_index), 0, |_| Ok(()))
    }

    /// Create a virtual CAN (VCAN) interface.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn create_vcan_request(name: &str, index: Option<u32>) -> Result<Vec<u8>> {
        Self::create_request(name, index, "vcan")
    }

    /// Create an interface of the given kind.
    ///
    /// Note that the length of the name is capped by `IFNAMSIZ`, including
    /// the terminating NUL.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn create_request<I>(name: &str, index: I, kind: &str) -> Result<Vec<u8>>
    where
        I: Into<Option<u32>>,
    {
        if name.len() >= IFNAMSIZ {
            return Err(Error::out_of_range(
                "interface name length",
                name.len() as u64,
                (IFNAMSIZ - 1) as u64,
            ));
        }
        let index = index.into().unwrap_or(0);

        Self::info_msg(IfInfoMsg::new(index), NLM_F_CREATE | NLM_F_EXCL, |attrs| {
            attrs.put_str(IFLA_IFNAME, name)?;
            let linkinfo = attrs.begin_nested(IFLA_LINKINFO);
            attrs.put_str(IFLA_INFO_KIND, kind)?;
            attrs.end_nested(linkinfo)
        })
    }

    /// Delete the interface.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn delete_request(&self) -> Result<Vec<u8>> {
        Self::link_msg(
            RTM_DELLINK,
            IfInfoMsg::new(self.if_index),
            NLM_F_ACK,
            |_| Ok(()),
        )
    }

    /// Set the MTU of this interface.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_mtu_request(&self, mtu: Mtu) -> Result<Vec<u8>> {
        Self::info_msg(IfInfoMsg::new(self.if_index), 0, |attrs| {
            attrs.put_u32(IFLA_MTU, mtu.bytes() as u32)
        })
    }

    /// Set a CAN-specific parameter.
    ///
    /// This sets an attribute in the link info, such as bitrate, control
    /// modes, etc.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_can_param_request<P>(&self, param_type: IflaCan, param: &P) -> Result<Vec<u8>>
    where
        P: AttrPayload,
    {
        Self::info_msg(IfInfoMsg::new(self.if_index), 0, |attrs| {
            let link_info = attrs.begin_nested(IFLA_LINKINFO);
            attrs.put_str(IFLA_INFO_KIND, "can")?;
            let data = attrs.begin_nested(IFLA_INFO_DATA);
            attrs.put_payload(param_type as u16, param)?;
            attrs.end_nested(data)?;
            attrs.end_nested(link_info)
        })
    }

    /// Set the bitrate and, optionally, sample point of this interface.
    ///
    /// The bitrate can *not* be changed if the interface is UP. It is
    /// specified in Hz (bps) while the sample point is given in tenths
    /// of a percent.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_bitrate_request<P>(&self, bitrate: u32, sample_point: P) -> Result<Vec<u8>>
    where
        P: Into<Option<u32>>,
    {
        if bitrate == 0 || bitrate > CAN_MAX_BITRATE {
            return Err(Error::out_of_range("bitrate", bitrate, CAN_MAX_BITRATE));
        }
        let sample_point = check_sample_point(sample_point.into())?;

        self.set_bit_timing_request(CanBitTiming {
            bitrate,
            sample_point,
            ..CanBitTiming::default()
        })
    }

    /// Sets the bit timing params for the interface
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_bit_timing_request(&self, timing: CanBitTiming) -> Result<Vec<u8>> {
        self.set_can_param_request(IflaCan::BitTiming, &timing)
    }

    /// Set the full control mode (bit) collection.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_ctrlmodes_request<M>(&self, ctrlmode: M) -> Result<Vec<u8>>
    where
        M: Into<CanCtrlModes>,
    {
        let modes: can_ctrlmode = ctrlmode.into().into();
        self.set_can_param_request(IflaCan::CtrlMode, &modes)
    }

    /// Set or clear an individual control mode parameter.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_ctrlmode_request(&self, mode: CanCtrlMode, on: bool) -> Result<Vec<u8>> {
        self.set_ctrlmodes_request(CanCtrlModes::from_mode(mode, on))
    }

    /// Set the automatic restart milliseconds of the interface
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_restart_ms_request(&self, restart_ms: u32) -> Result<Vec<u8>> {
        self.set_can_param_request(IflaCan::RestartMs, &restart_ms)
    }

    /// Manually restart the interface.
    ///
    /// Note that a manual restart if only permitted if automatic restart is
    /// disabled and the device is in the bus-off state.
    ///
    /// PRIVILEGED: This requires root privilege.
    ///
    /// Common Errors:
    ///     EINVAL - The interface is down or automatic restarts are enabled
    ///     EBUSY - The interface is not in a bus-off state
    pub fn restart_request(&self) -> Result<Vec<u8>> {
        // The kernel never reads the value. iproute2 sends a 1.
        self.set_can_param_request(IflaCan::Restart, &1u32)
    }

    /// Sets the data bit timing params for the interface
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_data_bit_timing_request(&self, timing: CanBitTiming) -> Result<Vec<u8>> {
        self.set_can_param_request(IflaCan::DataBitTiming, &timing)
    }

    /// Set the data bitrate and, optionally, data sample point of this
    /// interface.
    ///
    /// This only applies to interfaces in FD mode.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_data_bitrate_request<P>(&self, bitrate: u32, sample_point: P) -> Result<Vec<u8>>
    where
        P: Into<Option<u32>>,
    {
        if bitrate == 0 {
            return Err(Error::out_of_range("data bitrate", 0u32, u32::MAX));
        }
        let sample_point = check_sample_point(sample_point.into())?;

        self.set_data_bit_timing_request(CanBitTiming {
            bitrate,
            sample_point,
            ..CanBitTiming::default()
        })
    }

    /// Sets the CANbus termination, in Ohms, for the interface.
    ///
    /// PRIVILEGED: This requires root privilege.
    pub fn set_termination_request(&self, termination: u16) -> Result<Vec<u8>> {
        self.set_can_param_request(IflaCan::Termination, &termination)
    }
}

fn check_sample_point(sample_point: Option<u32>) -> Result<u32> {
    match sample_point.unwrap_or(0) {
        sp if sp < 1000 => Ok(sp),
        sp => Err(Error::out_of_range("sample point", sp, 999u32)),
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nl::{NetlinkMessageHeader, NLA_HDRLEN, NLMSG_HDRLEN};

    fn payload(req: &[u8]) -> (NetlinkMessageHeader, &[u8]) {
        messages(req).next().unwrap().unwrap()
    }

    #[test]
    fn test_ifinfomsg() {
        let ifi = IfInfoMsg::up(5);
        let bytes = ifi.encode();
        assert_eq!(bytes, [0, 0, 0, 0, 5, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(ifi, IfInfoMsg::decode(&bytes).unwrap());

        let ifi = IfInfoMsg::down(5);
        assert_eq!(0, ifi.flags);
        assert_eq!(IFF_UP, ifi.change);
    }

    #[test]
    fn test_ctrlmodes() {
        assert_eq!(rt::CAN_CTRLMODE_FD, CanCtrlMode::Fd.mask());
        assert_eq!(rt::CAN_CTRLMODE_CC_LEN8_DLC, CanCtrlMode::CcLen8Dlc.mask());

        let mut modes = CanCtrlModes::from_mode(CanCtrlMode::Loopback, true);
        modes.add(CanCtrlMode::ListenOnly, false);
        let raw: can_ctrlmode = modes.into();
        assert_eq!(0x03, raw.mask);
        assert_eq!(0x01, raw.flags);
        assert!(modes.has_mode(CanCtrlMode::Loopback));
        assert!(!modes.has_mode(CanCtrlMode::ListenOnly));

        modes.clear();
        assert_eq!(CanCtrlModes::default(), modes);
    }

    #[test]
    fn test_up_down_request() {
        let iface = CanInterface::open_iface(3);
        let req = iface.bring_up_request().unwrap();
        assert_eq!(NLMSG_HDRLEN + IFINFOMSG_LEN, req.len());

        let (hdr, payload) = payload(&req);
        assert_eq!(RTM_NEWLINK, hdr.msg_type);
        assert_eq!(NLM_F_REQUEST | NLM_F_ACK, hdr.flags);
        let ifi = IfInfoMsg::decode(payload).unwrap();
        assert_eq!(3, ifi.index);
        assert_eq!(IFF_UP, ifi.flags);
    }

    #[test]
    fn test_details_request() {
        let req = CanInterface::open_iface(7).details_request().unwrap();
        let (hdr, payload) = payload(&req);
        assert_eq!(RTM_GETLINK, hdr.msg_type);
        assert_eq!(NLM_F_REQUEST, hdr.flags);

        let attr = attributes(&payload[IFINFOMSG_LEN..]).next().unwrap().unwrap();
        assert_eq!(IFLA_EXT_MASK, attr.attr_type());
        assert_eq!(EXT_FILTER_VF, attr.get::<u32>().unwrap());
    }

    #[test]
    fn test_create_request() {
        let req = CanInterface::create_vcan_request("vcan0", None).unwrap();
        let (hdr, payload) = payload(&req);
        assert_eq!(NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL, hdr.flags);

        let attrs: Vec<_> = attributes(&payload[IFINFOMSG_LEN..])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(2, attrs.len());
        assert_eq!("vcan0", attrs[0].get_str());
        let kind = attrs[1].nested().next().unwrap().unwrap();
        assert_eq!(IFLA_INFO_KIND, kind.attr_type());
        assert_eq!("vcan", kind.get_str());

        let name = "a_name_that_is_too_long";
        assert!(matches!(
            CanInterface::create_request(name, 4u32, "vcan"),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_set_bitrate_request() {
        let iface = CanInterface::open_iface(2);
        let req = iface.set_bitrate_request(500_000, 875u32).unwrap();

        let timing: CanBitTiming = {
            let (_, payload) = payload(&req);
            let link_info = attributes(&payload[IFINFOMSG_LEN..])
                .next()
                .unwrap()
                .unwrap();
            assert_eq!(IFLA_LINKINFO, link_info.attr_type());
            let inner: Vec<_> = link_info.nested().collect::<Result<_>>().unwrap();
            assert_eq!("can", inner[0].get_str());
            let param = inner[1].nested().next().unwrap().unwrap();
            assert_eq!(IflaCan::BitTiming as u16, param.attr_type());
            assert_eq!((NLA_HDRLEN + 32) as u16, param.len);
            param.get().unwrap()
        };
        assert_eq!(500_000, timing.bitrate);
        assert_eq!(875, timing.sample_point);

        assert!(iface.set_bitrate_request(0, None).is_err());
        assert!(iface.set_bitrate_request(2_000_000, None).is_err());
        assert!(iface.set_bitrate_request(250_000, 1000u32).is_err());
        assert!(iface.set_data_bitrate_request(2_000_000, None).is_ok());
    }

    #[test]
    fn test_set_ctrlmode_request() {
        let iface = CanInterface::open_iface(2);
        let req = iface.set_ctrlmode_request(CanCtrlMode::Fd, true).unwrap();
        let raw = CanInterface::open_iface(2)
            .set_can_param_request(
                IflaCan::CtrlMode,
                &can_ctrlmode {
                    mask: rt::CAN_CTRLMODE_FD,
                    flags: rt::CAN_CTRLMODE_FD,
                },
            )
            .unwrap();
        assert_eq!(raw, req);
    }

    #[test]
    fn test_restart_request() {
        let req = CanInterface::open_iface(9).restart_request().unwrap();
        let (_, payload) = payload(&req);
        let link_info = attributes(&payload[IFINFOMSG_LEN..])
            .next()
            .unwrap()
            .unwrap();
        let data = link_info.nested().nth(1).unwrap().unwrap();
        let restart = data.nested().next().unwrap().unwrap();
        assert_eq!(IflaCan::Restart as u16, restart.attr_type());
        assert_eq!(1, restart.get::<u32>().unwrap());
    }
}
