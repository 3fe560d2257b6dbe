//! Hash primitives: SHA-256, RIPEMD-160, and the two Bitcoin-specific
//! composites built from them.

mod ripemd160;
mod sha256;

pub use ripemd160::ripemd160;
pub use sha256::sha256;

/// `RIPEMD160(SHA256(x))`, used to turn a public key (or a redeem script)
/// into the 20-byte payload committed to by a P2PKH address.
pub fn hash160(x: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(x))
}

/// `SHA256(SHA256(x))`, Bitcoin's double-SHA256, used for transaction and
/// block identifiers and for the signature hash.
pub fn hash256(x: &[u8]) -> [u8; 32] {
    sha256(&sha256(x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_matches_ripemd_of_sha256() {
        let x = b"hello";
        assert_eq!(hash160(x), ripemd160(&sha256(x)));
    }

    #[test]
    fn hash256_matches_double_sha256() {
        let x = b"hello";
        assert_eq!(hash256(x), sha256(&sha256(x)));
    }

    #[test]
    fn hash256_of_empty_is_known() {
        assert_eq!(
            hex::encode(hash256(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
