// socketcan-codec/src/nl/mod.rs
//
// Netlink message and attribute codec for SocketCAN.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! CAN Netlink codec
//!
//! For SocketCAN, netlink is the primary way for a user-space application to
//! query or set the parameters of a CAN interface, such as the bitrate, the
//! control mode bits, and so forth. It is also how the rules of the CAN
//! gateway (`can-gw`) are added, removed and listed.
//!
//! This module only deals with the bytes. A netlink socket is opened and
//! read by the caller, which hands the received buffer to the walkers here,
//! and sends the requests built here.
//!
//! A netlink buffer is a sequence of messages, each a 16-byte header and a
//! payload, with every message starting on a 4-byte boundary:
//!
//! ```text
//! | len (4) | type (2) | flags (2) | seq (4) | pid (4) | payload ... | pad |
//! ```
//!
//! A payload is usually a fixed family header followed by a list of
//! attributes, each a 4-byte header and its data, padded to 4 bytes:
//!
//! ```text
//! | len (2) | type (2) | data ... | pad |
//! ```
//!
//! The length fields always hold the unpadded size. The padded size is only
//! used to find the start of the next record. The same [`align4`] rounding
//! is used when writing and when walking.
//!
//! The CAN netlink header file for the Linux kernel has the definition of
//! the constants and data structures that are sent back and forth to the
//! kernel over netlink. It can be found in the Linux sources here:
//!
//! <https://github.com/torvalds/linux/blob/master/include/uapi/linux/can/netlink.h?ts=4>
//!
//! and the CAN gateway definitions here:
//!
//! <https://github.com/torvalds/linux/blob/master/include/uapi/linux/can/gw.h?ts=4>

use crate::{
    errors::ensure_len,
    util::{get_i32, get_u16, get_u32, get_u64, put_u16, put_u32},
    Error, Result,
};
use log::{debug, trace};
use std::fmt;

/// Low-level Netlink CAN struct bindings.
pub mod rt;

/// CAN gateway rules.
pub mod cgw;

/// CAN interface (link) requests and details.
pub mod link;

pub use cgw::{
    parse_rules, CgwCanToCanRule, CgwFlags, CgwModifier, CgwRuleBatch, ClassicModFrame,
    Crc8Profile, CsumCrc8, CsumXor, FdModFrame, ModFrame, ModOp, ModTargets, ModifierPayload,
};
pub use link::{CanCtrlMode, CanCtrlModes, CanInterface, InterfaceCanParams, InterfaceDetails};
pub use rt::*;

/// The size of a netlink message header
pub const NLMSG_HDRLEN: usize = 16;

/// The size of an attribute header
pub const NLA_HDRLEN: usize = 4;

/// The size of an encoded `struct nlmsgerr`, with the echoed header
pub const NLMSGERR_LEN: usize = 4 + NLMSG_HDRLEN;

/// Rounds a length up to the next 4-byte boundary.
#[inline]
pub const fn align4(n: usize) -> usize {
    (n + 3) & !3
}

// ===== AttrPayload =====

/// A fixed-layout value that can be carried as attribute data.
pub trait AttrPayload: Sized {
    /// Encodes the value as attribute data, without padding
    fn to_bytes(&self) -> Vec<u8>;

    /// Decodes the value from attribute data
    fn from_bytes(buf: &[u8]) -> Result<Self>;
}

impl AttrPayload for u8 {
    fn to_bytes(&self) -> Vec<u8> {
        vec![*self]
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 1)?;
        Ok(buf[0])
    }
}

impl AttrPayload for u16 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 2)?;
        Ok(get_u16(buf, 0))
    }
}

impl AttrPayload for u32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 4)?;
        Ok(get_u32(buf, 0))
    }
}

impl AttrPayload for u64 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_le_bytes().to_vec()
    }

    fn from_bytes(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, 8)?;
        Ok(get_u64(buf, 0))
    }
}

// ===== NetlinkMessageHeader =====

/// A netlink message header, as `struct nlmsghdr`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetlinkMessageHeader {
    /// Length of the message, including the header
    pub len: u32,
    /// Message type
    pub msg_type: u16,
    /// Flags (`NLM_F_*`)
    pub flags: u16,
    /// Sequence number
    pub seq: u32,
    /// Sending process port ID
    pub pid: u32,
}

impl NetlinkMessageHeader {
    /// Creates a header for a message of the given type, without a length.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            msg_type,
            flags,
            ..Self::default()
        }
    }

    /// Decodes a header from the front of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, NLMSG_HDRLEN)?;
        Ok(Self {
            len: get_u32(buf, 0),
            msg_type: get_u16(buf, 4),
            flags: get_u16(buf, 6),
            seq: get_u32(buf, 8),
            pid: get_u32(buf, 12),
        })
    }

    /// Encodes the header
    pub fn encode(&self) -> [u8; NLMSG_HDRLEN] {
        let mut buf = [0u8; NLMSG_HDRLEN];
        put_u32(&mut buf, 0, self.len);
        put_u16(&mut buf, 4, self.msg_type);
        put_u16(&mut buf, 6, self.flags);
        put_u32(&mut buf, 8, self.seq);
        put_u32(&mut buf, 12, self.pid);
        buf
    }

    /// Whether the message is part of a multipart reply
    pub fn is_multi(&self) -> bool {
        self.flags & NLM_F_MULTI != 0
    }

    /// Whether the message terminates a multipart reply
    pub fn is_done(&self) -> bool {
        self.msg_type == NLMSG_DONE
    }

    /// Whether the message is an error (or ACK) reply
    pub fn is_error(&self) -> bool {
        self.msg_type == NLMSG_ERROR
    }
}

// ===== Message walker =====

/// Walks the netlink messages packed into a receive buffer.
///
/// Each item is a message header and its payload. The payload excludes the
/// header and the alignment padding of the message.
///
/// The walk stops, without an error, at a tail too short to hold a header,
/// or at a message that claims more bytes than are left. The latter means
/// the reply continues in the next read, which is reported by
/// [`is_incomplete`](MessageIter::is_incomplete). A message whose length is
/// smaller than its own header is malformed. It is reported once as an
/// error, and ends the walk.
///
/// The iterator is cheap to clone, so a walk can be restarted from any point.
#[derive(Debug, Clone)]
pub struct MessageIter<'a> {
    buf: &'a [u8],
    offset: usize,
    incomplete: bool,
    finished: bool,
}

/// Walks the netlink messages packed into a receive buffer.
pub fn messages(buf: &[u8]) -> MessageIter<'_> {
    MessageIter {
        buf,
        offset: 0,
        incomplete: false,
        finished: false,
    }
}

impl<'a> MessageIter<'a> {
    /// The offset of the next message in the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether the walk stopped at a message cut off by the end of the buffer
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }
}

impl<'a> Iterator for MessageIter<'a> {
    type Item = Result<(NetlinkMessageHeader, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let remaining = self.buf.len().saturating_sub(self.offset);
        if remaining < NLMSG_HDRLEN {
            if remaining > 0 {
                debug!("Netlink walk ended with {} trailing bytes", remaining);
            }
            self.finished = true;
            return None;
        }

        let hdr = match NetlinkMessageHeader::decode(&self.buf[self.offset..]) {
            Ok(hdr) => hdr,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };
        let len = hdr.len as usize;
        trace!(
            "Netlink message at {}: len={}, type={}, flags={:#06X}",
            self.offset,
            len,
            hdr.msg_type,
            hdr.flags
        );

        if len < NLMSG_HDRLEN {
            self.finished = true;
            return Some(Err(Error::MalformedMessage {
                offset: self.offset,
                len,
            }));
        }
        if len > remaining {
            debug!(
                "Netlink message at {} needs {} bytes, only {} left",
                self.offset, len, remaining
            );
            self.incomplete = true;
            self.finished = true;
            return None;
        }

        let payload = &self.buf[self.offset + NLMSG_HDRLEN..self.offset + len];
        self.offset = (self.offset + align4(len)).min(self.buf.len());
        Some(Ok((hdr, payload)))
    }
}

// ===== Attributes =====

/// A routing attribute (`struct rtattr` / `struct nlattr`) and its data.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RoutingAttribute<'a> {
    /// The length from the header: the size of header plus data, unpadded
    pub len: u16,
    /// The type from the header, including any flag bits
    pub raw_type: u16,
    /// The data, without padding
    pub data: &'a [u8],
}

impl<'a> RoutingAttribute<'a> {
    /// The attribute type, without the nested/byte-order flag bits
    pub fn attr_type(&self) -> u16 {
        self.raw_type & NLA_TYPE_MASK
    }

    /// Whether the nested flag is set
    pub fn is_nested(&self) -> bool {
        self.raw_type & NLA_F_NESTED != 0
    }

    /// Walks the attributes nested in this one's data.
    pub fn nested(&self) -> AttrIter<'a> {
        attributes(self.data)
    }

    /// Decodes the data as a fixed-layout value
    pub fn get<P: AttrPayload>(&self) -> Result<P> {
        P::from_bytes(self.data)
    }

    /// Gets the data as a string, up to the first NUL.
    pub fn get_str(&self) -> String {
        let n = self
            .data
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.data.len());
        String::from_utf8_lossy(&self.data[..n]).into_owned()
    }
}

impl fmt::Debug for RoutingAttribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RoutingAttribute")
            .field("len", &self.len)
            .field("type", &self.attr_type())
            .field("data", &hex::encode(self.data))
            .finish()
    }
}

/// Walks a flat list of attributes.
///
/// The walk follows the same rules as [`MessageIter`]. It ends silently on
/// fewer than 4 bytes, or on an attribute running past the data, and reports
/// an attribute shorter than its header as malformed.
#[derive(Debug, Clone)]
pub struct AttrIter<'a> {
    buf: &'a [u8],
    offset: usize,
    finished: bool,
}

/// Walks the attributes in a buffer, such as a message payload after its
/// family header.
pub fn attributes(buf: &[u8]) -> AttrIter<'_> {
    AttrIter {
        buf,
        offset: 0,
        finished: false,
    }
}

impl AttrIter<'_> {
    /// The offset of the next attribute
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<RoutingAttribute<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let remaining = self.buf.len().saturating_sub(self.offset);
        if remaining < NLA_HDRLEN {
            self.finished = true;
            return None;
        }

        let len = get_u16(self.buf, self.offset) as usize;
        let raw_type = get_u16(self.buf, self.offset + 2);
        trace!(
            "Attribute at {}: len={}, type={}",
            self.offset,
            len,
            raw_type & NLA_TYPE_MASK
        );

        if len < NLA_HDRLEN {
            self.finished = true;
            return Some(Err(Error::MalformedMessage {
                offset: self.offset,
                len,
            }));
        }
        if len > remaining {
            debug!(
                "Attribute at {} needs {} bytes, only {} left",
                self.offset, len, remaining
            );
            self.finished = true;
            return None;
        }

        let attr = RoutingAttribute {
            len: len as u16,
            raw_type,
            data: &self.buf[self.offset + NLA_HDRLEN..self.offset + len],
        };
        self.offset = (self.offset + align4(len)).min(self.buf.len());
        Some(Ok(attr))
    }
}

// ===== AttrWriter =====

/// The position of an open nested attribute in an [`AttrWriter`].
#[derive(Debug)]
#[must_use = "a nested attribute must be closed with end_nested()"]
pub struct NestedAttr(usize);

/// Writes a list of attributes, each padded to a 4-byte boundary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttrWriter {
    buf: Vec<u8>,
}

impl AttrWriter {
    /// Creates an empty attribute list
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes an attribute with the given data.
    pub fn put(&mut self, attr_type: u16, data: &[u8]) -> Result<()> {
        let len = NLA_HDRLEN + data.len();
        if len > u16::MAX as usize {
            return Err(Error::out_of_range("attribute length", len as u64, u16::MAX));
        }
        self.put_header(len as u16, attr_type);
        self.buf.extend_from_slice(data);
        self.pad();
        Ok(())
    }

    /// Writes an attribute holding a fixed-layout value.
    pub fn put_payload<P: AttrPayload>(&mut self, attr_type: u16, val: &P) -> Result<()> {
        self.put(attr_type, &val.to_bytes())
    }

    /// Writes a u8 attribute
    pub fn put_u8(&mut self, attr_type: u16, val: u8) -> Result<()> {
        self.put(attr_type, &[val])
    }

    /// Writes a u16 attribute
    pub fn put_u16(&mut self, attr_type: u16, val: u16) -> Result<()> {
        self.put(attr_type, &val.to_le_bytes())
    }

    /// Writes a u32 attribute
    pub fn put_u32(&mut self, attr_type: u16, val: u32) -> Result<()> {
        self.put(attr_type, &val.to_le_bytes())
    }

    /// Writes a NUL-terminated string attribute
    pub fn put_str(&mut self, attr_type: u16, s: &str) -> Result<()> {
        let mut data = Vec::with_capacity(s.len() + 1);
        data.extend_from_slice(s.as_bytes());
        data.push(0);
        self.put(attr_type, &data)
    }

    /// Opens a nested attribute.
    ///
    /// Everything written until the matching [`end_nested`](Self::end_nested)
    /// becomes the data of this attribute. The type is written as given,
    /// so OR in `NLA_F_NESTED` where the receiver requires it.
    pub fn begin_nested(&mut self, attr_type: u16) -> NestedAttr {
        let start = self.buf.len();
        self.put_header(0, attr_type);
        NestedAttr(start)
    }

    /// Closes a nested attribute, filling in its length.
    pub fn end_nested(&mut self, nested: NestedAttr) -> Result<()> {
        let len = self.buf.len() - nested.0;
        if len > u16::MAX as usize {
            return Err(Error::out_of_range("attribute length", len as u64, u16::MAX));
        }
        put_u16(&mut self.buf, nested.0, len as u16);
        Ok(())
    }

    /// The number of bytes written, including padding
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no attributes have been written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The encoded attributes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Takes the encoded attributes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn put_header(&mut self, len: u16, attr_type: u16) {
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(&attr_type.to_le_bytes());
    }

    fn pad(&mut self) {
        let n = align4(self.buf.len());
        self.buf.resize(n, 0);
    }
}

// ===== MessageBuilder =====

/// Builds a single netlink message: header, family header and attributes.
///
/// The message length is filled in by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    hdr: NetlinkMessageHeader,
    family_hdr: Vec<u8>,
    attrs: AttrWriter,
}

impl MessageBuilder {
    /// Starts a message of the given type and flags.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            hdr: NetlinkMessageHeader::new(msg_type, flags),
            family_hdr: Vec::new(),
            attrs: AttrWriter::new(),
        }
    }

    /// Sets the sequence number
    pub fn seq(mut self, seq: u32) -> Self {
        self.hdr.seq = seq;
        self
    }

    /// Sets the port ID
    pub fn pid(mut self, pid: u32) -> Self {
        self.hdr.pid = pid;
        self
    }

    /// Sets the fixed family header that precedes the attributes.
    pub fn family_header(mut self, bytes: &[u8]) -> Self {
        self.family_hdr = bytes.to_vec();
        self.family_hdr.resize(align4(bytes.len()), 0);
        self
    }

    /// The attribute list of the message
    pub fn attrs(&mut self) -> &mut AttrWriter {
        &mut self.attrs
    }

    /// Finishes the message
    pub fn build(mut self) -> Result<Vec<u8>> {
        let len = NLMSG_HDRLEN + self.family_hdr.len() + self.attrs.len();
        self.hdr.len = u32::try_from(len)
            .map_err(|_| Error::out_of_range("message length", len as u64, u32::MAX))?;

        let mut buf = Vec::with_capacity(len);
        buf.extend_from_slice(&self.hdr.encode());
        buf.extend_from_slice(&self.family_hdr);
        buf.extend_from_slice(self.attrs.as_bytes());
        Ok(buf)
    }
}

// ===== NetlinkErrorMessage =====

/// The payload of an `NLMSG_ERROR` reply, as `struct nlmsgerr`.
///
/// An error code of zero is an ACK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetlinkErrorMessage {
    /// Zero, or a negative errno
    pub error: i32,
    /// The header of the request this replies to
    pub request: NetlinkMessageHeader,
}

impl NetlinkErrorMessage {
    /// Decodes the payload of an `NLMSG_ERROR` message
    pub fn decode(payload: &[u8]) -> Result<Self> {
        ensure_len(payload, NLMSGERR_LEN)?;
        Ok(Self {
            error: get_i32(payload, 0),
            request: NetlinkMessageHeader::decode(&payload[4..])?,
        })
    }

    /// Whether this is a positive acknowledgement
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }

    /// The (positive) OS error number, if this is an error.
    ///
    /// An error code of `i32::MIN` saturates to `i32::MAX`.
    pub fn errno(&self) -> Option<i32> {
        (self.error != 0).then(|| self.error.saturating_neg())
    }

    /// Finds the first error or ACK reply in a receive buffer.
    pub fn find(buf: &[u8]) -> Result<Option<Self>> {
        for msg in messages(buf) {
            let (hdr, payload) = msg?;
            if hdr.is_error() {
                return Self::decode(payload).map(Some);
            }
        }
        Ok(None)
    }
}

/////////////////////////////////////////////////////////////////////////////
