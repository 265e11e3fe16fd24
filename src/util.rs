// socketcan-codec/src/util.rs
//
// Little-endian field access for the fixed-layout kernel records.
//
// This file is part of the Rust 'socketcan-codec' library.
//
// Licensed under the MIT license:
//   <LICENSE or http://opensource.org/licenses/MIT>
// This file may not be copied, modified, or distributed except according
// to those terms.

//! Byte-offset readers and writers.
//!
//! Callers check the buffer length once, up front, then use these to pull
//! the individual fields out at their ABI offsets.

#[inline]
pub(crate) fn get_u16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

#[inline]
pub(crate) fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

#[inline]
pub(crate) fn get_i32(buf: &[u8], off: usize) -> i32 {
    get_u32(buf, off) as i32
}

#[inline]
pub(crate) fn get_u64(buf: &[u8], off: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(b)
}

#[inline]
pub(crate) fn put_u16(buf: &mut [u8], off: usize, val: u16) {
    buf[off..off + 2].copy_from_slice(&val.to_le_bytes());
}

#[inline]
pub(crate) fn put_u32(buf: &mut [u8], off: usize, val: u32) {
    buf[off..off + 4].copy_from_slice(&val.to_le_bytes());
}

#[inline]
pub(crate) fn put_u64(buf: &mut [u8], off: usize, val: u64) {
    buf[off..off + 8].copy_from_slice(&val.to_le_bytes());
}

/// Copies a slice into a zero-filled, fixed-size array.
pub(crate) fn slice_to_array<const S: usize>(data: &[u8]) -> [u8; S] {
    let mut array = [0; S];
    let n = data.len().min(S);
    array[..n].copy_from_slice(&data[..n]);
    array
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_fields() {
        let mut buf = [0u8; 14];
        put_u16(&mut buf, 0, 0x1234);
        put_u32(&mut buf, 2, 0xDEAD_BEEF);
        put_u64(&mut buf, 6, 0x0102_0304_0506_0708);

        assert_eq!(&buf[..2], &[0x34, 0x12]);
        assert_eq!(&buf[2..6], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(0x1234, get_u16(&buf, 0));
        assert_eq!(0xDEAD_BEEF, get_u32(&buf, 2));
        assert_eq!(-559_038_737, get_i32(&buf, 2));
        assert_eq!(0x0102_0304_0506_0708, get_u64(&buf, 6));
    }

    #[test]
    fn test_slice_to_array() {
        let arr: [u8; 4] = slice_to_array(&[1, 2]);
        assert_eq!([1, 2, 0, 0], arr);
    }
}
