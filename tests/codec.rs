// socketcan-codec/tests/codec.rs
//
// Integration tests for the identifier and frame codecs.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

use socketcan_codec::{
    can_dlc_to_len, canfd_dlc_to_len, canfd_len_to_dlc, decode_any, id_word_auto,
    id_word_with_flags, j1939::PduType, xl, CanAnyFrame, ClassicFrame, EmbeddedFrame, Error,
    FdFlags, FdFrame, Frame, FrameKind, J1939CanIdentifier, Pgn, SduType, XlFrame,
};

const CAN_EFF_FLAG: u32 = 0x8000_0000;
const CAN_RTR_FLAG: u32 = 0x4000_0000;
const CANXL_MTU: usize = 12 + 2048;

#[test]
fn test_id_word_auto() {
    assert_eq!(Ok(0x123), id_word_auto(0x123));
    assert_eq!(Ok(0x7FF), id_word_auto(0x7FF));
    assert_eq!(Ok(0x800 | CAN_EFF_FLAG), id_word_auto(0x800));
    assert_eq!(Ok(0x18DB_33F1 | CAN_EFF_FLAG), id_word_auto(0x18DB_33F1));

    assert_eq!(
        Err(Error::InvalidIdentifier(0x10 | CAN_EFF_FLAG)),
        id_word_auto(0x10 | CAN_EFF_FLAG)
    );
}

#[test]
fn test_id_word_with_flags() {
    assert_eq!(Ok(0x7FF), id_word_with_flags(0x7FF, false, false, false));
    assert_eq!(
        Err(Error::InvalidIdentifier(0x800)),
        id_word_with_flags(0x800, false, false, false)
    );
    assert_eq!(
        Ok(0x800 | CAN_EFF_FLAG | CAN_RTR_FLAG),
        id_word_with_flags(0x800, true, true, false)
    );
    assert!(id_word_with_flags(0x2000_0000, true, false, false).is_err());
}

#[test]
fn test_canfd_dlc_table() {
    for dlc in 0..=15 {
        let len = canfd_dlc_to_len(dlc).unwrap();
        assert_eq!(Ok(dlc), canfd_len_to_dlc(len as usize));
    }
    assert_eq!(Ok(64), canfd_dlc_to_len(15));

    for len in [9, 13, 25, 33, 63, 65] {
        assert!(matches!(
            canfd_len_to_dlc(len),
            Err(Error::OutOfRange { .. })
        ));
    }
}

#[test]
fn test_classic_dlc_clamp() {
    for dlc in 9..=15 {
        assert_eq!(Ok(8), can_dlc_to_len(dlc));
    }
    assert_eq!(Err(Error::InvalidLength(16)), can_dlc_to_len(16));
}

#[test]
fn test_pgn_fields() {
    let pgn = Pgn::new(0x1100A).unwrap();
    assert_eq!(0x0A, pgn.pdu_specific());
    assert_eq!(0x10, pgn.pdu_format());
    assert_eq!(1, pgn.data_page());
    assert_eq!(0, pgn.reserved());
    assert_eq!(PduType::Pdu1, pgn.pdu_type());

    let pgn = Pgn::new(0xFEF1).unwrap();
    assert_eq!(PduType::Pdu2, pgn.pdu_type());

    assert!(Pgn::new(0x40000).is_err());
}

#[test]
fn test_j1939_identifier() {
    // EEC1 from engine #1
    let id = J1939CanIdentifier::from_raw(0x0CF0_0400).unwrap();
    assert_eq!(3, id.priority());
    assert_eq!(0xF004, id.pgn().raw());
    assert_eq!(0x00, id.source_address());
    assert_eq!(None, id.destination_address());
    assert_eq!(0x0CF0_0400 | CAN_EFF_FLAG, id.id_word());

    let pgn = Pgn::new(0xEA00).unwrap();
    let id = J1939CanIdentifier::addressed(6, pgn, 0x17, 0xF9).unwrap();
    assert_eq!(Some(0x17), id.destination_address());
    assert_eq!(0x18EA_17F9, id.raw());
}

#[test]
fn test_xl_priority() {
    assert_eq!(Ok(0x4B_0222), xl::set_priority(0x4B_0F0F, 0x222));
    assert!(matches!(
        xl::set_priority(0x4B_0F0F, 0x800),
        Err(Error::OutOfRange { .. })
    ));

    let word = xl::set_vcid(0x0000_0123, 0x4B);
    assert_eq!(0x4B, xl::vcid(word));
    assert_eq!(0x123, xl::priority(word));
}

#[test]
fn test_classic_frame_codec() {
    let frame = ClassicFrame::from_raw_id(0x123, &[0x11, 0x22, 0x33]).unwrap();
    let buf = frame.encode();

    assert_eq!(16, buf.len());
    assert_eq!(&[0x23, 0x01, 0x00, 0x00, 3], &buf[..5]);
    assert_eq!(&[0x11, 0x22, 0x33, 0, 0, 0, 0, 0], &buf[8..]);

    let decoded = ClassicFrame::decode(&buf).unwrap();
    assert_eq!(frame, decoded);
    assert!(decoded.is_standard());
    assert_eq!(&[0x11, 0x22, 0x33], decoded.data());
}

#[test]
fn test_fd_frame_codec() {
    let data: Vec<u8> = (0..12).collect();
    let frame = FdFrame::init(0x1234_5678 | CAN_EFF_FLAG, &data, FdFlags::BRS).unwrap();
    let buf = frame.encode();

    assert_eq!(72, buf.len());
    // Padded to the next valid FD length
    assert_eq!(12, buf[4]);

    let decoded = FdFrame::decode(&buf).unwrap();
    assert_eq!(frame, decoded);
    assert!(decoded.is_brs());
    assert!(decoded.is_extended());
    assert_eq!(0x1234_5678, decoded.raw_id());
}

#[test]
fn test_xl_frame_codec() {
    let data = vec![0xA5; 100];
    let frame = XlFrame::new(0x42, SduType::ClassicFdMapped, 0xDEAD_BEEF, &data).unwrap();

    let buf = frame.encode(CANXL_MTU).unwrap();
    assert_eq!(112, buf.len());

    let decoded = XlFrame::decode(&buf).unwrap();
    assert_eq!(frame, decoded);
    assert_eq!(0x42, decoded.priority());
    assert_eq!(0xDEAD_BEEF, decoded.acceptance_field());

    assert!(frame.encode(64).is_err());
}

#[test]
fn test_decode_any() {
    let classic = ClassicFrame::from_raw_id(0x100, &[1, 2]).unwrap();
    let any = decode_any(&classic.encode()).unwrap();
    assert_eq!(FrameKind::Classic, any.kind());

    let fd = FdFrame::from_raw_id(0x100, &[0; 20]).unwrap();
    let any = decode_any(&fd.encode()).unwrap();
    assert_eq!(FrameKind::Fd, any.kind());

    let xl = XlFrame::new(0x100, SduType::ContentBased, 0, &[7; 3]).unwrap();
    let any = decode_any(&xl.encode(CANXL_MTU).unwrap()).unwrap();
    assert!(matches!(any, CanAnyFrame::Xl(_)));
    assert_eq!(&[7, 7, 7], any.data());

    assert!(decode_any(&[0u8; 8]).is_err());
}
