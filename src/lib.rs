// socketcan-codec/src/lib.rs
//
// The main lib file for the Rust SocketCAN codec library.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! SocketCAN wire formats.
//!
//! The Linux kernel supports using CAN-devices through a network-like API
//! (see <https://www.kernel.org/doc/Documentation/networking/can.txt>). The
//! data exchanged with the kernel over that API, and over the netlink API
//! that configures it, is made of fixed-layout C structs and of
//! length-prefixed attribute streams. This crate encodes and decodes those
//! bytes, bit-for-bit as the kernel lays them out.
//!
//! No sockets are opened here. A transport reads a buffer from a CAN or
//! netlink socket and hands it to a decoder, or takes the bytes produced
//! by an encoder and writes them out.
//!
//! # An introduction to CAN
//!
//! The CAN bus was originally designed to allow microcontrollers inside a
//! vehicle to communicate over a single shared bus. Messages called
//! *frames* are multicast to all devices on the bus.
//!
//! Every frame consists of an ID and a payload of up to 8 bytes. If two
//! devices attempt to send a frame at the same time, the device with the
//! higher ID will notice the conflict, stop sending and reattempt to sent its
//! frame in the next time slot. This means that the lower the ID, the higher
//! the priority.
//!
//! CAN FD frames carry up to 64 bytes, with the data possibly sent at a
//! higher bit rate, and CAN XL frames carry up to 2048 bytes behind an
//! 11-bit priority.
//!
//! # What is covered
//!
//! - [`id`]: The flagged 32-bit CAN ID word, and the DLC tables.
//! - [`frame`]: Classic CAN and CAN FD frames, as read from a raw socket.
//! - [`xl`]: CAN XL frames, and the priority/VCID word.
//! - [`j1939`]: SAE J1939 PGNs, 29-bit IDs, NAMEs and socket filters.
//! - [`isotp`]: The ISO-TP socket option records.
//! - [`nl`]: Netlink messages and attributes, CAN link configuration and
//!   CAN gateway rules. Requires the `netlink` feature (on by default).
//!
//! # Errors
//!
//! Every fallible operation returns the crate [`Result`], failing with one
//! of the variants of [`Error`]. Identifiers and lengths are checked when a
//! record is built or changed, so a record that exists is always valid to
//! encode.

// Re-export the embedded_can crate so that applications can rely on
// finding the same version we use.
pub use embedded_can::{
    self, ExtendedId, Frame as EmbeddedFrame, Id, StandardId,
};

pub mod errors;
pub use errors::{Error, Result};

mod util;

pub mod id;
pub use id::{
    can_dlc_to_len, can_len_to_dlc, canfd_dlc_to_len, canfd_len_to_dlc, id_word_auto,
    id_word_with_flags, CanId, FdFlags, IdFlags,
};

pub mod frame;
pub use frame::{decode_any, CanAnyFrame, CanFilter, ClassicFrame, FdFrame, Frame, FrameKind};

pub mod xl;
pub use xl::{Mtu, SduType, XlFlags, XlFrame};

pub mod j1939;
pub use j1939::{J1939CanIdentifier, J1939Filter, J1939Name, J1939NameBuilder, Pgn};

pub mod isotp;
pub use isotp::{FcOptions, IsoTpFlags, IsoTpOptions, LlOptions, StMin};

#[cfg(feature = "netlink")]
pub mod nl;

#[cfg(feature = "netlink")]
pub use nl::{parse_rules, CanInterface, CgwCanToCanRule, InterfaceDetails};
