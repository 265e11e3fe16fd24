// socketcan-codec/src/j1939.rs
//
// SAE J1939 identifiers, NAMEs and receive filters.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! SAE J1939 identifiers.
//!
//! J1939 carries its addressing in the 29-bit extended CAN identifier:
//!
//! ```text
//! Bits 26-28 ( 3 bits) : Priority
//! Bit  25    ( 1 bit ) : Reserved (extended data page)
//! Bit  24    ( 1 bit ) : Data page
//! Bits 16-23 ( 8 bits) : PDU format (PF)
//! Bits  8-15 ( 8 bits) : PDU specific (PS): destination or group extension
//! Bits  0-7  ( 8 bits) : Source address
//! ```
//!
//! Bits 8-25 make up the 18-bit Parameter Group Number (PGN). When the
//! PDU format is below 0xF0 the message is PDU1 (destination specific)
//! and the PS byte is the destination address. Otherwise it is PDU2
//! (broadcast) and the PS byte is a group extension of the PGN.
//!
//! The kernel J1939 socket also uses a 64-bit NAME to identify an ECU
//! during address claiming, and an array of [`J1939Filter`] records to
//! filter received messages.

use crate::{
    errors::ensure_len,
    id::{CAN_EFF_FLAG, CAN_EFF_MASK, CAN_ERR_FLAG, CAN_RTR_FLAG},
    util::{get_u32, get_u64, put_u32, put_u64},
    Error, Result,
};
use libc::canid_t;
use std::fmt;

/// No address, or the address is unknown
pub const J1939_NO_ADDR: u8 = 0xFF;

/// The address used by an ECU that has not claimed one
pub const J1939_IDLE_ADDR: u8 = 0xFE;

/// The largest unicast address
pub const J1939_MAX_UNICAST_ADDR: u8 = 0xFD;

/// No NAME
pub const J1939_NO_NAME: u64 = 0;

/// Request PGN
pub const J1939_PGN_REQUEST: u32 = 0x0EA00;

/// Address Claimed PGN
pub const J1939_PGN_ADDRESS_CLAIMED: u32 = 0x0EE00;

/// Commanded Address PGN
pub const J1939_PGN_ADDRESS_COMMANDED: u32 = 0x0FED8;

/// The largest PDU1 PGN
pub const J1939_PGN_PDU1_MAX: u32 = 0x3FF00;

/// The largest PGN
pub const J1939_PGN_MAX: u32 = 0x3FFFF;

/// No PGN
pub const J1939_NO_PGN: u32 = 0x40000;

/// The largest number of filters the kernel accepts on a socket
pub const J1939_FILTER_MAX: usize = 512;

/// The lowest PDU format value of a PDU2 (broadcast) message
pub const J1939_PDU2_MIN_PF: u8 = 0xF0;

/// The largest J1939 priority
pub const J1939_MAX_PRIORITY: u8 = 7;

// ===== Parameter Group Number =====

/// The type of a J1939 message, from the PDU format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PduType {
    /// Destination specific. The PS byte is the destination address.
    Pdu1,
    /// Broadcast. The PS byte is a group extension.
    Pdu2,
}

/// A J1939 Parameter Group Number
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pgn(u32);

impl Pgn {
    /// Creates a PGN from the raw 18-bit value.
    pub fn new(raw: u32) -> Result<Self> {
        if raw > J1939_PGN_MAX {
            return Err(Error::out_of_range("PGN", raw, J1939_PGN_MAX));
        }
        Ok(Self(raw))
    }

    /// Creates a PGN from its component fields.
    pub fn from_parts(reserved: bool, data_page: bool, pdu_format: u8, pdu_specific: u8) -> Self {
        Self(
            ((reserved as u32) << 17)
                | ((data_page as u32) << 16)
                | ((pdu_format as u32) << 8)
                | pdu_specific as u32,
        )
    }

    /// The raw PGN value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The PDU specific byte (bits 0-7)
    pub fn pdu_specific(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// The PDU format byte (bits 8-15)
    pub fn pdu_format(&self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// The data page bit (bit 16)
    pub fn data_page(&self) -> u8 {
        ((self.0 >> 16) & 0x01) as u8
    }

    /// The reserved, or extended data page, bit (bit 17)
    pub fn reserved(&self) -> u8 {
        ((self.0 >> 17) & 0x01) as u8
    }

    /// The message type, from the PDU format
    pub fn pdu_type(&self) -> PduType {
        if self.pdu_format() < J1939_PDU2_MIN_PF {
            PduType::Pdu1
        } else {
            PduType::Pdu2
        }
    }

    /// Whether this is a destination-specific PGN
    pub fn is_pdu1(&self) -> bool {
        self.pdu_type() == PduType::Pdu1
    }

    /// Whether this is a broadcast PGN
    pub fn is_pdu2(&self) -> bool {
        self.pdu_type() == PduType::Pdu2
    }

    /// The group extension of a PDU2 PGN
    pub fn group_extension(&self) -> Option<u8> {
        self.is_pdu2().then(|| self.pdu_specific())
    }

    /// The PGN with the destination address of a PDU1 message cleared.
    ///
    /// A PDU2 PGN is returned unchanged.
    pub fn pdu1_normalized(&self) -> Self {
        if self.is_pdu1() {
            Self(self.0 & !0xFF)
        } else {
            *self
        }
    }
}

impl TryFrom<u32> for Pgn {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<Pgn> for u32 {
    fn from(pgn: Pgn) -> Self {
        pgn.0
    }
}

impl fmt::Display for Pgn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:05X}", self.0)
    }
}

// ===== J1939CanIdentifier =====

/// A J1939 message identifier, as carried in an extended CAN ID.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct J1939CanIdentifier {
    priority: u8,
    pgn: Pgn,
    source_address: u8,
}

/// A priority above 7 overflows the 29-bit identifier.
fn check_priority(priority: u8, pgn: Pgn, source_address: u8) -> Result<()> {
    if priority > J1939_MAX_PRIORITY {
        // Capped to the six bits above the PGN and address
        let prio = priority.min(0x3F) as u32;
        let raw = (prio << 26) | (pgn.raw() << 8) | source_address as u32;
        return Err(Error::InvalidIdentifier(raw));
    }
    Ok(())
}

impl J1939CanIdentifier {
    /// Creates an identifier from its parts.
    ///
    /// For a PDU1 PGN, the PS byte of `pgn` is sent as the destination.
    pub fn new(priority: u8, pgn: Pgn, source_address: u8) -> Result<Self> {
        check_priority(priority, pgn, source_address)?;
        Ok(Self {
            priority,
            pgn,
            source_address,
        })
    }

    /// Creates a destination-specific identifier.
    ///
    /// The PGN must be PDU1. Its PS byte is replaced by `destination`.
    pub fn addressed(priority: u8, pgn: Pgn, destination: u8, source_address: u8) -> Result<Self> {
        if !pgn.is_pdu1() {
            return Err(Error::InvalidIdentifier(pgn.raw()));
        }
        let pgn = Pgn(pgn.pdu1_normalized().raw() | destination as u32);
        Self::new(priority, pgn, source_address)
    }

    /// Decomposes a raw 29-bit identifier.
    pub fn from_raw(raw: u32) -> Result<Self> {
        if raw > CAN_EFF_MASK {
            return Err(Error::InvalidIdentifier(raw));
        }
        Ok(Self {
            priority: ((raw >> 26) & 0x07) as u8,
            pgn: Pgn((raw >> 8) & J1939_PGN_MAX),
            source_address: (raw & 0xFF) as u8,
        })
    }

    /// The raw 29-bit identifier
    pub fn raw(&self) -> u32 {
        ((self.priority as u32) << 26) | (self.pgn.raw() << 8) | self.source_address as u32
    }

    /// The ID word for a CAN frame carrying this identifier (with EFF set).
    pub fn id_word(&self) -> canid_t {
        self.raw() | CAN_EFF_FLAG
    }

    /// The message priority (0-7, 0 is highest)
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Sets the message priority
    pub fn set_priority(&mut self, priority: u8) -> Result<()> {
        check_priority(priority, self.pgn, self.source_address)?;
        self.priority = priority;
        Ok(())
    }

    /// The PGN as carried on the wire.
    ///
    /// For a PDU1 message this includes the destination address in the PS
    /// byte. See [`Pgn::pdu1_normalized`].
    pub fn pgn(&self) -> Pgn {
        self.pgn
    }

    /// The source address
    pub fn source_address(&self) -> u8 {
        self.source_address
    }

    /// The destination address of a PDU1 message
    pub fn destination_address(&self) -> Option<u8> {
        self.pgn.is_pdu1().then(|| self.pgn.pdu_specific())
    }
}

impl TryFrom<canid_t> for J1939CanIdentifier {
    type Error = Error;

    /// Gets the J1939 identifier from a CAN ID word.
    ///
    /// The word must be a data frame in the extended format.
    fn try_from(word: canid_t) -> Result<Self> {
        if word & CAN_EFF_FLAG == 0 || word & (CAN_RTR_FLAG | CAN_ERR_FLAG) != 0 {
            return Err(Error::InvalidIdentifier(word));
        }
        Self::from_raw(word & CAN_EFF_MASK)
    }
}

// ===== J1939Name =====

// The position of a sub-field in the NAME.
#[derive(Clone, Copy)]
struct NameField {
    name: &'static str,
    shift: u32,
    width: u32,
}

impl NameField {
    const fn new(name: &'static str, shift: u32, width: u32) -> Self {
        Self { name, shift, width }
    }

    const fn max(&self) -> u64 {
        (1u64 << self.width) - 1
    }

    fn get(&self, name: u64) -> u64 {
        (name >> self.shift) & self.max()
    }

    fn set(&self, name: u64, val: u64) -> Result<u64> {
        if val > self.max() {
            return Err(Error::out_of_range(self.name, val, self.max()));
        }
        Ok((name & !(self.max() << self.shift)) | (val << self.shift))
    }
}

const IDENTITY_NUMBER: NameField = NameField::new("identity number", 0, 21);
const MANUFACTURER_CODE: NameField = NameField::new("manufacturer code", 21, 11);
const ECU_INSTANCE: NameField = NameField::new("ECU instance", 32, 3);
const FUNCTION_INSTANCE: NameField = NameField::new("function instance", 35, 5);
const FUNCTION: NameField = NameField::new("function", 40, 8);
const RESERVED: NameField = NameField::new("reserved", 48, 1);
const VEHICLE_SYSTEM: NameField = NameField::new("vehicle system", 49, 7);
const VEHICLE_SYSTEM_INSTANCE: NameField = NameField::new("vehicle system instance", 56, 4);
const INDUSTRY_GROUP: NameField = NameField::new("industry group", 60, 3);
const ARBITRARY_ADDRESS: NameField = NameField::new("arbitrary address capable", 63, 1);

/// The 64-bit J1939 NAME of an ECU.
///
/// ```text
/// Bits  0-20 (21 bits) : Identity number
/// Bits 21-31 (11 bits) : Manufacturer code
/// Bits 32-34 ( 3 bits) : ECU instance
/// Bits 35-39 ( 5 bits) : Function instance
/// Bits 40-47 ( 8 bits) : Function
/// Bit  48    ( 1 bit ) : Reserved
/// Bits 49-55 ( 7 bits) : Vehicle system
/// Bits 56-59 ( 4 bits) : Vehicle system instance
/// Bits 60-62 ( 3 bits) : Industry group
/// Bit  63    ( 1 bit ) : Arbitrary address capable
/// ```
///
/// Each setter fails with [`Error::OutOfRange`] if the value does not fit
/// into the width of its sub-field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct J1939Name(u64);

macro_rules! name_field {
    ($get:ident, $set:ident, $field:ident, $ty:ty, $doc:literal) => {
        #[doc = $doc]
        pub fn $get(&self) -> $ty {
            $field.get(self.0) as $ty
        }

        #[doc = concat!("Sets the ", $doc)]
        pub fn $set(&mut self, val: $ty) -> Result<()> {
            self.0 = $field.set(self.0, val as u64)?;
            Ok(())
        }
    };
}

impl J1939Name {
    /// Creates a NAME from its raw value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw NAME value
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Creates a builder for a NAME
    pub fn builder() -> J1939NameBuilder {
        J1939NameBuilder::default()
    }

    name_field!(identity_number, set_identity_number, IDENTITY_NUMBER, u32, "identity number (21 bits)");
    name_field!(manufacturer_code, set_manufacturer_code, MANUFACTURER_CODE, u16, "manufacturer code (11 bits)");
    name_field!(ecu_instance, set_ecu_instance, ECU_INSTANCE, u8, "ECU instance (3 bits)");
    name_field!(function_instance, set_function_instance, FUNCTION_INSTANCE, u8, "function instance (5 bits)");
    name_field!(function, set_function, FUNCTION, u8, "function (8 bits)");
    name_field!(reserved, set_reserved, RESERVED, u8, "reserved bit");
    name_field!(vehicle_system, set_vehicle_system, VEHICLE_SYSTEM, u8, "vehicle system (7 bits)");
    name_field!(
        vehicle_system_instance,
        set_vehicle_system_instance,
        VEHICLE_SYSTEM_INSTANCE,
        u8,
        "vehicle system instance (4 bits)"
    );
    name_field!(industry_group, set_industry_group, INDUSTRY_GROUP, u8, "industry group (3 bits)");

    /// Whether the ECU may claim an arbitrary address
    pub fn is_arbitrary_address_capable(&self) -> bool {
        ARBITRARY_ADDRESS.get(self.0) != 0
    }

    /// Sets whether the ECU may claim an arbitrary address
    pub fn set_arbitrary_address_capable(&mut self, on: bool) {
        self.0 = (self.0 & !(1u64 << ARBITRARY_ADDRESS.shift)) | ((on as u64) << ARBITRARY_ADDRESS.shift);
    }
}

impl From<u64> for J1939Name {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<J1939Name> for u64 {
    fn from(name: J1939Name) -> Self {
        name.0
    }
}

/// Builder for a [`J1939Name`].
///
/// The widths are checked once, by [`build`](J1939NameBuilder::build).
#[derive(Debug, Default, Clone)]
pub struct J1939NameBuilder {
    fields: Vec<(NameFieldId, u64)>,
}

// Index into the NAME field table, to keep the builder `Debug`.
#[derive(Debug, Clone, Copy)]
enum NameFieldId {
    IdentityNumber,
    ManufacturerCode,
    EcuInstance,
    FunctionInstance,
    Function,
    VehicleSystem,
    VehicleSystemInstance,
    IndustryGroup,
    ArbitraryAddress,
}

impl NameFieldId {
    fn field(&self) -> NameField {
        use NameFieldId::*;
        match *self {
            IdentityNumber => IDENTITY_NUMBER,
            ManufacturerCode => MANUFACTURER_CODE,
            EcuInstance => ECU_INSTANCE,
            FunctionInstance => FUNCTION_INSTANCE,
            Function => FUNCTION,
            VehicleSystem => VEHICLE_SYSTEM,
            VehicleSystemInstance => VEHICLE_SYSTEM_INSTANCE,
            IndustryGroup => INDUSTRY_GROUP,
            ArbitraryAddress => ARBITRARY_ADDRESS,
        }
    }
}

impl J1939NameBuilder {
    fn with(mut self, id: NameFieldId, val: u64) -> Self {
        self.fields.push((id, val));
        self
    }

    /// Sets the identity number (21 bits)
    pub fn identity_number(self, val: u32) -> Self {
        self.with(NameFieldId::IdentityNumber, val as u64)
    }

    /// Sets the manufacturer code (11 bits)
    pub fn manufacturer_code(self, val: u16) -> Self {
        self.with(NameFieldId::ManufacturerCode, val as u64)
    }

    /// Sets the ECU instance (3 bits)
    pub fn ecu_instance(self, val: u8) -> Self {
        self.with(NameFieldId::EcuInstance, val as u64)
    }

    /// Sets the function instance (5 bits)
    pub fn function_instance(self, val: u8) -> Self {
        self.with(NameFieldId::FunctionInstance, val as u64)
    }

    /// Sets the function (8 bits)
    pub fn function(self, val: u8) -> Self {
        self.with(NameFieldId::Function, val as u64)
    }

    /// Sets the vehicle system (7 bits)
    pub fn vehicle_system(self, val: u8) -> Self {
        self.with(NameFieldId::VehicleSystem, val as u64)
    }

    /// Sets the vehicle system instance (4 bits)
    pub fn vehicle_system_instance(self, val: u8) -> Self {
        self.with(NameFieldId::VehicleSystemInstance, val as u64)
    }

    /// Sets the industry group (3 bits)
    pub fn industry_group(self, val: u8) -> Self {
        self.with(NameFieldId::IndustryGroup, val as u64)
    }

    /// Sets the arbitrary address capable bit
    pub fn arbitrary_address_capable(self, on: bool) -> Self {
        self.with(NameFieldId::ArbitraryAddress, on as u64)
    }

    /// Builds the NAME, failing on the first field that overflows.
    pub fn build(self) -> Result<J1939Name> {
        let raw = self
            .fields
            .iter()
            .try_fold(0u64, |name, (id, val)| id.field().set(name, *val))?;
        Ok(J1939Name(raw))
    }
}

// ===== J1939Filter =====

/// The size of an encoded `struct j1939_filter`
pub const J1939_FILTER_LEN: usize = 32;

/// A receive filter for a J1939 socket, as `struct j1939_filter`.
///
/// A message passes if each of its NAME, PGN and address, masked, matches
/// the filter value, masked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct J1939Filter {
    /// The NAME to match
    pub name: u64,
    /// The bits of the NAME to compare
    pub name_mask: u64,
    /// The PGN to match
    pub pgn: u32,
    /// The bits of the PGN to compare
    pub pgn_mask: u32,
    /// The address to match
    pub addr: u8,
    /// The bits of the address to compare
    pub addr_mask: u8,
}

impl J1939Filter {
    /// A filter that passes a single PGN, from anyone.
    pub fn for_pgn(pgn: Pgn) -> Self {
        Self {
            pgn: pgn.raw(),
            pgn_mask: J1939_PGN_MAX,
            ..Self::default()
        }
    }

    /// A filter that passes everything from a single source address.
    pub fn for_addr(addr: u8) -> Self {
        Self {
            addr,
            addr_mask: 0xFF,
            ..Self::default()
        }
    }

    /// Whether a message with the given properties passes the filter.
    pub fn matches(&self, name: u64, pgn: Pgn, addr: u8) -> bool {
        (name & self.name_mask) == (self.name & self.name_mask)
            && (pgn.raw() & self.pgn_mask) == (self.pgn & self.pgn_mask)
            && (addr & self.addr_mask) == (self.addr & self.addr_mask)
    }

    /// Encodes the filter, including the trailing struct padding.
    pub fn encode(&self) -> [u8; J1939_FILTER_LEN] {
        let mut buf = [0u8; J1939_FILTER_LEN];
        put_u64(&mut buf, 0, self.name);
        put_u64(&mut buf, 8, self.name_mask);
        put_u32(&mut buf, 16, self.pgn);
        put_u32(&mut buf, 20, self.pgn_mask);
        buf[24] = self.addr;
        buf[25] = self.addr_mask;
        buf
    }

    /// Decodes a filter
    pub fn decode(buf: &[u8]) -> Result<Self> {
        ensure_len(buf, J1939_FILTER_LEN)?;
        Ok(Self {
            name: get_u64(buf, 0),
            name_mask: get_u64(buf, 8),
            pgn: get_u32(buf, 16),
            pgn_mask: get_u32(buf, 20),
            addr: buf[24],
            addr_mask: buf[25],
        })
    }

    /// Encodes a set of filters as the contiguous array a socket option takes.
    pub fn encode_all(filters: &[J1939Filter]) -> Result<Vec<u8>> {
        if filters.len() > J1939_FILTER_MAX {
            return Err(Error::out_of_range(
                "filter count",
                filters.len() as u64,
                J1939_FILTER_MAX as u64,
            ));
        }
        Ok(filters.iter().flat_map(|f| f.encode()).collect())
    }
}

/////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pgn_parts() {
        let pgn = Pgn::new(0x1100A).unwrap();
        assert_eq!(0x0A, pgn.pdu_specific());
        assert_eq!(0x10, pgn.pdu_format());
        assert_eq!(0x01, pgn.data_page());
        assert_eq!(0x00, pgn.reserved());
        assert_eq!(PduType::Pdu1, pgn.pdu_type());
        assert_eq!(None, pgn.group_extension());
        assert_eq!(0x11000, pgn.pdu1_normalized().raw());

        assert_eq!(pgn, Pgn::from_parts(false, true, 0x10, 0x0A));
    }

    #[test]
    fn test_pgn_pdu2() {
        let pgn = Pgn::new(0xFEF1).unwrap();
        assert!(pgn.is_pdu2());
        assert_eq!(Some(0xF1), pgn.group_extension());
        assert_eq!(pgn, pgn.pdu1_normalized());

        // The boundary
        assert!(Pgn::new(0xEF00).unwrap().is_pdu1());
        assert!(Pgn::new(0xF000).unwrap().is_pdu2());
    }

    #[test]
    fn test_pgn_range() {
        assert!(Pgn::new(J1939_PGN_MAX).is_ok());
        assert_eq!(
            Err(Error::out_of_range("PGN", J1939_NO_PGN, J1939_PGN_MAX)),
            Pgn::new(J1939_NO_PGN)
        );
        assert!(Pgn::try_from(0x40000).is_err());
        assert_eq!("0EA00", Pgn::new(J1939_PGN_REQUEST).unwrap().to_string());
    }

    #[test]
    fn test_can_identifier() {
        // Priority 6, PGN 0xFEF1 (PDU2), SA 0x80
        let id = J1939CanIdentifier::from_raw(0x18FEF180).unwrap();
        assert_eq!(6, id.priority());
        assert_eq!(0xFEF1, id.pgn().raw());
        assert_eq!(0x80, id.source_address());
        assert_eq!(None, id.destination_address());
        assert_eq!(0x18FEF180, id.raw());
        assert_eq!(0x98FEF180, id.id_word());

        // Request to address 0x25 from 0xF9
        let pgn = Pgn::new(J1939_PGN_REQUEST).unwrap();
        let id = J1939CanIdentifier::addressed(6, pgn, 0x25, 0xF9).unwrap();
        assert_eq!(0x18EA25F9, id.raw());
        assert_eq!(Some(0x25), id.destination_address());
        assert_eq!(J1939_PGN_REQUEST, id.pgn().pdu1_normalized().raw());

        let pgn = Pgn::new(0xFEF1).unwrap();
        assert!(J1939CanIdentifier::addressed(6, pgn, 0x25, 0xF9).is_err());
    }

    #[test]
    fn test_can_identifier_checks() {
        let pgn = Pgn::new(0xFEF1).unwrap();
        assert!(J1939CanIdentifier::new(8, pgn, 0).is_err());

        let mut id = J1939CanIdentifier::new(3, pgn, 0).unwrap();
        assert!(matches!(
            id.set_priority(8),
            Err(Error::InvalidIdentifier(raw)) if raw > CAN_EFF_MASK
        ));
        assert_eq!(3, id.priority());

        assert!(J1939CanIdentifier::from_raw(0x2000_0000).is_err());

        // Must be an extended data frame
        assert!(J1939CanIdentifier::try_from(0x18FEF180u32).is_err());
        assert!(J1939CanIdentifier::try_from(0x18FEF180 | CAN_EFF_FLAG | CAN_RTR_FLAG).is_err());
        let id = J1939CanIdentifier::try_from(0x18FEF180 | CAN_EFF_FLAG).unwrap();
        assert_eq!(0x80, id.source_address());
    }

    #[test]
    fn test_name_fields() {
        let mut name = J1939Name::default();
        name.set_identity_number(0x1F_FFFF).unwrap();
        name.set_manufacturer_code(0x7FF).unwrap();
        assert_eq!(0xFFFF_FFFF, name.raw());

        assert!(matches!(
            name.set_identity_number(0x20_0000),
            Err(Error::OutOfRange {
                field: "identity number",
                ..
            })
        ));
        assert!(name.set_ecu_instance(8).is_err());
        assert!(name.set_vehicle_system(0x80).is_err());
        assert!(name.set_reserved(2).is_err());
        assert_eq!(0xFFFF_FFFF, name.raw());

        name.set_arbitrary_address_capable(true);
        assert!(name.is_arbitrary_address_capable());
        assert_eq!(0x8000_0000_FFFF_FFFF, name.raw());
    }

    #[test]
    fn test_name_builder() {
        let name = J1939Name::builder()
            .identity_number(123_456)
            .manufacturer_code(275)
            .ecu_instance(1)
            .function_instance(2)
            .function(130)
            .vehicle_system(25)
            .vehicle_system_instance(3)
            .industry_group(4)
            .arbitrary_address_capable(true)
            .build()
            .unwrap();

        assert_eq!(123_456, name.identity_number());
        assert_eq!(275, name.manufacturer_code());
        assert_eq!(1, name.ecu_instance());
        assert_eq!(2, name.function_instance());
        assert_eq!(130, name.function());
        assert_eq!(0, name.reserved());
        assert_eq!(25, name.vehicle_system());
        assert_eq!(3, name.vehicle_system_instance());
        assert_eq!(4, name.industry_group());
        assert!(name.is_arbitrary_address_capable());

        assert_eq!(name, J1939Name::from_raw(name.raw()));

        let res = J1939Name::builder().industry_group(8).build();
        assert!(matches!(
            res,
            Err(Error::OutOfRange {
                field: "industry group",
                value: 8,
                max: 7
            })
        ));
    }

    #[test]
    fn test_filter() {
        let filter = J1939Filter::for_pgn(Pgn::new(J1939_PGN_ADDRESS_CLAIMED).unwrap());
        assert!(filter.matches(0x1234, Pgn::new(0xEE00).unwrap(), 0x10));
        assert!(!filter.matches(0x1234, Pgn::new(0xEA00).unwrap(), 0x10));

        let filter = J1939Filter {
            name: 0x0102_0304_0506_0708,
            name_mask: u64::MAX,
            pgn: 0xEE00,
            pgn_mask: 0x3FF00,
            addr: 0x80,
            addr_mask: 0xF0,
        };
        let bytes = filter.encode();
        assert_eq!(J1939_FILTER_LEN, bytes.len());
        assert_eq!(&bytes[..8], &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(&bytes[16..20], &[0x00, 0xEE, 0x00, 0x00]);
        assert_eq!(&bytes[24..], &[0x80, 0xF0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(filter, J1939Filter::decode(&bytes).unwrap());
        assert!(J1939Filter::decode(&bytes[..26]).is_err());

        let all = J1939Filter::encode_all(&[filter, J1939Filter::for_addr(0x25)]).unwrap();
        assert_eq!(64, all.len());
        assert_eq!(0x25, all[32 + 24]);
    }
}
