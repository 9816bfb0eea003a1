/// Errors produced while decoding a Crockford base32 identifier.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Base32Error {
    /// The input is not exactly [`ENCODED_LEN`] characters long.
    ///
    /// [`ENCODED_LEN`]: crate::NamespaceId::ENCODED_LEN
    #[error("invalid length: {len}")]
    DecodeInvalidLen { len: usize },

    /// The input contains a byte outside the Crockford alphabet.
    #[error("invalid ascii byte {byte:#04x} at index {index}")]
    DecodeInvalidAscii { byte: u8, index: usize },

    /// The decoded value does not fit in the identifier's bit width.
    #[error("decode overflow: {value:#x}")]
    DecodeOverflow { value: u128 },
}
