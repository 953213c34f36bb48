//! Endianness helpers for the two footguns spec [9] calls out: a 24-bit
//! address and a 16-bit wrapping checksum, both big-endian on the wire.
//!
//! `byteorder` already covers 16/32-bit reads and writes; there is no
//! built-in `u24`, so the odd-width case gets its own tiny helpers here
//! rather than a one-off shift expression at every call site.

/// Read a big-endian 24-bit unsigned integer from the first three bytes of `buf`.
pub fn read_u24(buf: &[u8]) -> u32 {
    (u32::from(buf[0]) << 16) | (u32::from(buf[1]) << 8) | u32::from(buf[2])
}

/// Append a big-endian 24-bit unsigned integer to `buf`. Only the low 24
/// bits of `value` are written; the caller is responsible for keeping
/// addresses within range.
pub fn push_u24(buf: &mut Vec<u8>, value: u32) {
    buf.push((value >> 16) as u8);
    buf.push((value >> 8) as u8);
    buf.push(value as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_u24() {
        let mut buf = Vec::new();
        push_u24(&mut buf, 0xFF_913E);
        assert_eq!(buf, vec![0xFF, 0x91, 0x3E]);
        assert_eq!(read_u24(&buf), 0xFF_913E);
    }
}
