use crate::base32::{Base32Error, decode_base32, encode_base32};
use core::{fmt, str::FromStr};

/// A 96-bit, coordination-free identifier for a namespace.
///
/// The fields are laid out from **most significant bit (MSB)** to **least
/// significant bit (LSB)**:
///
/// ```text
///  Bit Index:  95            64 63         40 39         24 23          0
///              +----------------+-------------+-------------+-------------+
///  Field:      | timestamp (32) | machine (24)| process (16)| counter (24)|
///              +----------------+-------------+-------------+-------------+
///              |<----------------- MSB -- 96 bits -- LSB --------------->|
/// ```
///
/// - `timestamp`: seconds since the Unix epoch
/// - `machine`: a discriminator derived from the host
/// - `process`: a discriminator derived from the process id
/// - `counter`: a per-process counter seeded with a random value
///
/// The textual form is a fixed-width, 20 character Crockford base32 string.
/// Because the alphabet is in ascending ASCII order and the timestamp occupies
/// the high bits, identifiers sort lexically by creation second.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct NamespaceId {
    id: u128,
}

impl NamespaceId {
    pub const TIMESTAMP_BITS: u32 = 32;
    pub const MACHINE_BITS: u32 = 24;
    pub const PROCESS_BITS: u32 = 16;
    pub const COUNTER_BITS: u32 = 24;

    /// Total number of significant bits.
    pub const BITS: u32 =
        Self::TIMESTAMP_BITS + Self::MACHINE_BITS + Self::PROCESS_BITS + Self::COUNTER_BITS;

    pub const COUNTER_SHIFT: u32 = 0;
    pub const PROCESS_SHIFT: u32 = Self::COUNTER_SHIFT + Self::COUNTER_BITS;
    pub const MACHINE_SHIFT: u32 = Self::PROCESS_SHIFT + Self::PROCESS_BITS;
    pub const TIMESTAMP_SHIFT: u32 = Self::MACHINE_SHIFT + Self::MACHINE_BITS;

    pub const TIMESTAMP_MASK: u128 = (1 << Self::TIMESTAMP_BITS) - 1;
    pub const MACHINE_MASK: u128 = (1 << Self::MACHINE_BITS) - 1;
    pub const PROCESS_MASK: u128 = (1 << Self::PROCESS_BITS) - 1;
    pub const COUNTER_MASK: u128 = (1 << Self::COUNTER_BITS) - 1;

    /// Length of the Crockford base32 form: `ceil(96 / 5)`.
    pub const ENCODED_LEN: usize = (Self::BITS as usize).div_ceil(5);

    const BYTES: usize = Self::BITS as usize / 8;

    /// Packs the four components into an identifier. Components wider than
    /// their field are truncated.
    #[must_use]
    pub const fn from_components(timestamp: u32, machine: u32, process: u16, counter: u32) -> Self {
        let t = (timestamp as u128 & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let m = (machine as u128 & Self::MACHINE_MASK) << Self::MACHINE_SHIFT;
        let p = (process as u128 & Self::PROCESS_MASK) << Self::PROCESS_SHIFT;
        let c = (counter as u128 & Self::COUNTER_MASK) << Self::COUNTER_SHIFT;
        Self { id: t | m | p | c }
    }

    /// Extracts the timestamp (seconds since the Unix epoch).
    #[must_use]
    pub const fn timestamp(&self) -> u32 {
        ((self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK) as u32
    }

    /// Extracts the machine discriminator.
    #[must_use]
    pub const fn machine(&self) -> u32 {
        ((self.id >> Self::MACHINE_SHIFT) & Self::MACHINE_MASK) as u32
    }

    /// Extracts the process discriminator.
    #[must_use]
    pub const fn process(&self) -> u16 {
        ((self.id >> Self::PROCESS_SHIFT) & Self::PROCESS_MASK) as u16
    }

    /// Extracts the counter.
    #[must_use]
    pub const fn counter(&self) -> u32 {
        ((self.id >> Self::COUNTER_SHIFT) & Self::COUNTER_MASK) as u32
    }

    /// Converts this type into its raw type representation
    #[must_use]
    pub const fn to_raw(&self) -> u128 {
        self.id
    }

    /// Converts a raw type into this type. Bits above [`Self::BITS`] are
    /// cleared.
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self {
            id: raw & ((1 << Self::BITS) - 1),
        }
    }

    /// Returns this identifier's timestamp as a [`std::time::SystemTime`].
    #[must_use]
    pub fn datetime(&self) -> std::time::SystemTime {
        std::time::SystemTime::UNIX_EPOCH
            + std::time::Duration::from_secs(u64::from(self.timestamp()))
    }

    /// Encodes the identifier as a fixed-width Crockford base32 byte array.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let bytes = self.id.to_be_bytes();
        let mut buf = [0_u8; Self::ENCODED_LEN];
        encode_base32(&bytes[bytes.len() - Self::BYTES..], &mut buf);
        buf
    }

    /// Decodes a Crockford base32 string produced by [`Self::encode`].
    ///
    /// # Errors
    /// - [`Base32Error::DecodeInvalidLen`] if the input is not
    ///   [`Self::ENCODED_LEN`] characters
    /// - [`Base32Error::DecodeInvalidAscii`] for characters outside the
    ///   alphabet
    /// - [`Base32Error::DecodeOverflow`] if the value is wider than 96 bits
    pub fn decode(encoded: &str) -> Result<Self, Base32Error> {
        if encoded.len() != Self::ENCODED_LEN {
            return Err(Base32Error::DecodeInvalidLen {
                len: encoded.len(),
            });
        }
        decode_base32(encoded, Self::BITS).map(|id| Self { id })
    }
}

impl fmt::Display for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buf = self.encode();
        // The alphabet is ASCII.
        f.write_str(core::str::from_utf8(&buf).map_err(|_| fmt::Error)?)
    }
}

impl fmt::Debug for NamespaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceId")
            .field("id", &format_args!("{self}"))
            .field("timestamp", &self.timestamp())
            .field("machine", &self.machine())
            .field("process", &self.process())
            .field("counter", &self.counter())
            .finish()
    }
}

impl FromStr for NamespaceId {
    type Err = Base32Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_covers_96_bits() {
        assert_eq!(NamespaceId::BITS, 96);
        assert_eq!(NamespaceId::ENCODED_LEN, 20);
        assert_eq!(NamespaceId::TIMESTAMP_SHIFT, 64);
    }

    #[test]
    fn components_are_recoverable() {
        let id = NamespaceId::from_components(1_700_000_000, 0xAB_CDEF, 0x1234, 0x00_0042);
        assert_eq!(id.timestamp(), 1_700_000_000);
        assert_eq!(id.machine(), 0xAB_CDEF);
        assert_eq!(id.process(), 0x1234);
        assert_eq!(id.counter(), 0x42);
    }

    #[test]
    fn components_wider_than_their_field_are_truncated() {
        let id = NamespaceId::from_components(0, 0xFFFF_FFFF, 0, 0x0100_0001);
        assert_eq!(id.machine(), 0xFF_FFFF);
        assert_eq!(id.counter(), 1);
        assert_eq!(id.timestamp(), 0);
    }

    #[test]
    fn display_round_trips_through_from_str() {
        let id = NamespaceId::from_components(u32::MAX, 1, 2, 3);
        let text = id.to_string();
        assert_eq!(text.len(), NamespaceId::ENCODED_LEN);
        assert_eq!(text.parse::<NamespaceId>().unwrap(), id);
        assert_eq!(text.to_ascii_lowercase().parse::<NamespaceId>().unwrap(), id);
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let earlier = NamespaceId::from_components(100, 0xFF_FFFF, u16::MAX, 0xFF_FFFF);
        let later = NamespaceId::from_components(101, 0, 0, 0);
        assert!(earlier < later);
        assert!(earlier.to_string() < later.to_string());
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            "0123".parse::<NamespaceId>().unwrap_err(),
            Base32Error::DecodeInvalidLen { len: 4 }
        );
    }

    #[test]
    fn from_raw_clears_bits_above_the_layout() {
        let id = NamespaceId::from_raw(u128::MAX);
        assert_eq!(id.to_raw(), (1 << 96) - 1);
    }
}
