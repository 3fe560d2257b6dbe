//! Network-wide constants: which chain we're on, and the curated genesis
//! headers and magic bytes that go with it.
//!
//! The knobs here are fixed by the Bitcoin wire protocol rather than
//! user-tunable, so there is no builder: a `Net` is looked up, not
//! assembled.

/// Which Bitcoin network we are speaking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Net {
    Main,
    Test,
}

impl Net {
    /// Base58Check version byte prepended to a `HASH160` payload.
    pub const fn address_version(self) -> u8 {
        match self {
            Net::Main => 0x00,
            Net::Test => 0x6f,
        }
    }

    /// 4-byte magic that opens every `NetworkEnvelope` on this net.
    pub const fn magic(self) -> [u8; 4] {
        match self {
            Net::Main => [0xf9, 0xbe, 0xb4, 0xd9],
            Net::Test => [0x0b, 0x11, 0x09, 0x07],
        }
    }

    /// The fixed 80-byte genesis block header for this net.
    pub const fn genesis_header(self) -> [u8; 80] {
        match self {
            Net::Main => GENESIS_MAIN,
            Net::Test => GENESIS_TEST,
        }
    }
}

/// Mainnet genesis block header, raw wire bytes.
/// Reference: <https://en.bitcoin.it/wiki/Genesis_block>
pub const GENESIS_MAIN: [u8; 80] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x3b, 0xa3, 0xed, 0xfd, 0x7a, 0x7b, 0x12, 0xb2, 0x7a, 0xc7, 0x2c, 0x3e,
    0x67, 0x76, 0x8f, 0x61, 0x7f, 0xc8, 0x1b, 0xc3, 0x88, 0x8a, 0x51, 0x32, 0x3a, 0x9f, 0xb8, 0xaa,
    0x4b, 0x1e, 0x5e, 0x4a, 0x29, 0xab, 0x5f, 0x49, 0xff, 0xff, 0x00, 0x1d, 0x1d, 0xac, 0x2b, 0x7c,
];

/// Testnet3 genesis block header, raw wire bytes.
pub const GENESIS_TEST: [u8; 80] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x3b, 0xa3, 0xed, 0xfd, 0x7a, 0x7b, 0x12, 0xb2, 0x7a, 0xc7, 0x2c, 0x3e,
    0x67, 0x76, 0x8f, 0x61, 0x7f, 0xc8, 0x1b, 0xc3, 0x88, 0x8a, 0x51, 0x32, 0x3a, 0x9f, 0xb8, 0xaa,
    0x4b, 0x1e, 0x5e, 0x4a, 0xda, 0xe5, 0x49, 0x4d, 0xff, 0xff, 0x00, 0x1d, 0x1a, 0xa4, 0xae, 0x18,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockHeader;

    #[test]
    fn mainnet_genesis_hashes_to_known_id() {
        let header = BlockHeader::decode(&Net::Main.genesis_header()).unwrap();
        assert_eq!(
            header.id(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
        assert!(header.validate_pow());
    }

    #[test]
    fn testnet_genesis_hashes_to_known_id() {
        let header = BlockHeader::decode(&Net::Test.genesis_header()).unwrap();
        assert_eq!(
            header.id(),
            "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943"
        );
        assert!(header.validate_pow());
    }
}
