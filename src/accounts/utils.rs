//! Byte-level helpers shared by the account decoders
//!
//! Offset readers return `None` when the slice is too short, so decoders can
//! chain them with `?` and convert the failure into a `DecodeError` once.

use solana_sdk::pubkey::Pubkey;

/// Read a little-endian u64 at `offset`
#[inline]
pub fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// Read a little-endian i64 at `offset`
#[inline]
pub fn read_i64_le(data: &[u8], offset: usize) -> Option<i64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(i64::from_le_bytes(bytes))
}

#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes: [u8; 2] = data.get(offset..offset + 2)?.try_into().ok()?;
    Some(u16::from_le_bytes(bytes))
}

#[inline]
pub fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Any non-zero byte is `true`
#[inline]
pub fn read_bool(data: &[u8], offset: usize) -> Option<bool> {
    read_u8(data, offset).map(|b| b != 0)
}

#[inline]
pub fn read_pubkey(data: &[u8], offset: usize) -> Option<Pubkey> {
    let bytes: [u8; 32] = data.get(offset..offset + 32)?.try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

/// Read an unsigned integer stored in `width` bytes (1, 2, 4 or 8)
///
/// Used by records whose numeric width is chosen per account.
pub fn read_uint_of_width(data: &[u8], offset: usize, width: usize) -> Option<u64> {
    match width {
        1 => read_u8(data, offset).map(u64::from),
        2 => read_u16_le(data, offset).map(u64::from),
        4 => read_u32_le(data, offset).map(u64::from),
        8 => read_u64_le(data, offset),
        _ => None,
    }
}

/// Strip the trailing NUL padding that fixed-width on-chain string slots carry
pub fn trim_nul(s: &str) -> String {
    s.trim_end_matches('\0').to_string()
}

/// Check whether bit `index` is set, counting from the most significant bit of
/// `bytes[0]`
#[inline]
pub fn msb_bit_is_set(bytes: &[u8], index: usize) -> Option<bool> {
    let byte = bytes.get(index / 8)?;
    Some(byte & (1u8 << (7 - index % 8)) != 0)
}

/// Base58 rendering used in log fields
#[inline]
pub fn short_address(key: &Pubkey) -> String {
    let s = bs58::encode(key.as_ref()).into_string();
    if s.len() > 8 {
        format!("{}..{}", &s[..4], &s[s.len() - 4..])
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readers_reject_short_input() {
        let data = [1u8, 0, 0];
        assert_eq!(read_u16_le(&data, 0), Some(1));
        assert_eq!(read_u32_le(&data, 0), None);
        assert_eq!(read_u64_le(&data, 2), None);
        assert_eq!(read_pubkey(&data, 0), None);
    }

    #[test]
    fn test_read_uint_of_width() {
        let data = [0x34, 0x12, 0, 0, 0, 0, 0, 0];
        assert_eq!(read_uint_of_width(&data, 0, 1), Some(0x34));
        assert_eq!(read_uint_of_width(&data, 0, 2), Some(0x1234));
        assert_eq!(read_uint_of_width(&data, 0, 8), Some(0x1234));
        assert_eq!(read_uint_of_width(&data, 0, 3), None);
    }

    #[test]
    fn test_trim_nul() {
        assert_eq!(trim_nul("Degen Ape\0\0\0\0"), "Degen Ape");
        assert_eq!(trim_nul("plain"), "plain");
    }

    #[test]
    fn test_msb_bit_order() {
        let bytes = [0b1000_0000u8, 0b0000_1000];
        assert_eq!(msb_bit_is_set(&bytes, 0), Some(true));
        assert_eq!(msb_bit_is_set(&bytes, 1), Some(false));
        assert_eq!(msb_bit_is_set(&bytes, 12), Some(true));
        assert_eq!(msb_bit_is_set(&bytes, 16), None);
    }
}
