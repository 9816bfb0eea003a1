use crate::base32::Base32Error;

/// Crockford alphabet. Characters are in ascending ASCII order, so encoded
/// strings of equal length sort the same way as the values they encode.
const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const NO_VALUE: u8 = 255;
const BITS_PER_CHAR: usize = 5;

/// Lookup table for Crockford base32 decoding
const LOOKUP: [u8; 256] = {
    let mut lut = [NO_VALUE; 256];
    let mut i = 0_u8;
    // Main alphabet, allow lower-case
    while i < 32 {
        let c = ALPHABET[i as usize];
        lut[c as usize] = i;
        if c.is_ascii_uppercase() {
            lut[(c + 32) as usize] = i; // lowercase letter
        }
        i += 1;
    }
    // Crockford-specific aliases
    lut[b'O' as usize] = 0;
    lut[b'o' as usize] = 0;
    lut[b'I' as usize] = 1;
    lut[b'i' as usize] = 1;
    lut[b'L' as usize] = 1;
    lut[b'l' as usize] = 1;
    lut
};

/// Encodes a big-endian byte slice into Crockford base32, writing output to
/// `buf`.
///
/// `buf` must hold at least `ceil(input.len() * 8 / 5)` characters. Any extra
/// leading bits in the output are zero-padded, which keeps the encoding
/// fixed-width and sortable.
pub(crate) fn encode_base32(input: &[u8], buf: &mut [u8]) {
    let input_bits = input.len() * 8;
    let total_bits = buf.len() * BITS_PER_CHAR;
    debug_assert!(total_bits >= input_bits);
    let mut bits = total_bits - input_bits;
    let mut acc = 0_u16;
    let mask = 0x1F;

    let mut out = 0;
    for &b in input {
        acc = (acc << 8) | u16::from(b);
        bits += 8;
        while bits >= BITS_PER_CHAR {
            bits -= BITS_PER_CHAR;
            buf[out] = ALPHABET[((acc >> bits) & mask) as usize];
            out += 1;
        }
    }
}

/// Decodes a Crockford base32 string into an integer no wider than
/// `value_bits`.
///
/// The caller is responsible for checking the input length; at most 25
/// characters fit into the accumulator.
pub(crate) fn decode_base32(encoded: &str, value_bits: u32) -> Result<u128, Base32Error> {
    debug_assert!(encoded.len() * BITS_PER_CHAR <= u128::BITS as usize);
    let mut acc = 0_u128;
    for (index, byte) in encoded.bytes().enumerate() {
        let val = LOOKUP[byte as usize];
        if val == NO_VALUE {
            return Err(Base32Error::DecodeInvalidAscii { byte, index });
        }
        acc = (acc << BITS_PER_CHAR) | u128::from(val);
    }

    if value_bits < u128::BITS && acc >> value_bits != 0 {
        return Err(Base32Error::DecodeOverflow { value: acc });
    }
    Ok(acc)
}
