//! Secret/public key pairs and Bitcoin addresses.
//!
//! `SecretKey` and `PublicKey` are distinct types rather than one type
//! subclassing the other: secret-key generation by rejection sampling, SEC
//! point encoding/decoding, and Base58Check address derivation each live on
//! the type they apply to.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::curve::Point;
use crate::field::U256;
use crate::hash::{hash160, hash256};
use crate::params::Net;
use crate::{curve, Error, Result};

/// A secret scalar in `[1, n)`. Never `Debug`/`Display`-printed in full.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecretKey(U256);

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"..").finish()
    }
}

impl SecretKey {
    /// Draws a fresh secret key from the OS CSPRNG, rejection-sampling
    /// until the 32 big-endian bytes land in `[1, n)`.
    pub fn generate() -> SecretKey {
        loop {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            let candidate = U256::from_be_bytes(&bytes);
            if !candidate.is_zero() && candidate < curve::N {
                return SecretKey(candidate);
            }
        }
    }

    /// Builds a secret key from 32 big-endian bytes, for test fixtures and
    /// documentation examples. Rejects `0` and values `>= n`.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<SecretKey> {
        let value = U256::from_be_bytes(bytes);
        if value.is_zero() || value >= curve::N {
            return Err(Error::OutOfRangeScalar);
        }
        Ok(SecretKey(value))
    }

    /// Builds a secret key from a hex string of up to 64 characters,
    /// left-padded with zeros. For test fixtures and CLI input.
    pub fn from_hex(s: &str) -> Result<SecretKey> {
        let decoded = hex::decode(s)
            .map_err(|e| Error::MalformedEncoding(format!("secret key hex: {e}")))?;
        if decoded.len() > 32 {
            return Err(Error::MalformedEncoding("secret key longer than 32 bytes".into()));
        }
        let mut bytes = [0u8; 32];
        bytes[32 - decoded.len()..].copy_from_slice(&decoded);
        SecretKey::from_bytes(&bytes)
    }

    pub fn to_bytes(self) -> [u8; 32] {
        self.0.to_be_bytes()
    }

    pub(crate) fn scalar(&self) -> &U256 {
        &self.0
    }
}

/// A public key: a point on secp256k1, with Bitcoin-specific SEC encoding
/// and address derivation layered on top.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PublicKey(Point);

impl PublicKey {
    pub fn from_secret_key(sk: &SecretKey) -> PublicKey {
        PublicKey(Point::generator().scalar_mul(sk.scalar()))
    }

    pub fn point(&self) -> Point {
        self.0
    }

    /// Decodes a SEC-encoded point: `0x04 || x || y` (uncompressed) or
    /// `0x02/0x03 || x` (compressed, sign byte selects the `y` parity).
    /// Rejects points that do not satisfy the curve equation.
    pub fn decode(b: &[u8]) -> Result<PublicKey> {
        let point = match b.first() {
            Some(0x04) if b.len() == 65 => {
                let mut xb = [0u8; 32];
                let mut yb = [0u8; 32];
                xb.copy_from_slice(&b[1..33]);
                yb.copy_from_slice(&b[33..65]);
                Point::Affine {
                    x: U256::from_be_bytes(&xb),
                    y: U256::from_be_bytes(&yb),
                }
            }
            Some(tag @ (0x02 | 0x03)) if b.len() == 33 => {
                let is_even = *tag == 0x02;
                let mut xb = [0u8; 32];
                xb.copy_from_slice(&b[1..33]);
                let x = U256::from_be_bytes(&xb);
                let y2 = crate::field::add_mod(
                    &crate::field::mul_mod(&crate::field::mul_mod(&x, &x, &curve::P), &x, &curve::P),
                    &curve::B,
                    &curve::P,
                );
                // secp256k1's p ≡ 3 (mod 4), so a square root of y2 (if one
                // exists) is y2^((p+1)/4) mod p.
                let p_plus_one = curve::P.adc(&U256::ONE).0;
                let exp = div_by_four(&p_plus_one);
                let mut y = crate::field::pow_mod(&y2, &exp, &curve::P);
                let y_is_even = y.to_be_bytes()[31] % 2 == 0;
                if y_is_even != is_even {
                    y = crate::field::sub_mod(&U256::ZERO, &y, &curve::P);
                }
                Point::Affine { x, y }
            }
            _ => return Err(Error::MalformedEncoding("unrecognized SEC tag/length".into())),
        };
        if !point.is_on_curve() {
            return Err(Error::InvalidCurvePoint);
        }
        Ok(PublicKey(point))
    }

    /// Encodes this key in SEC format, compressed or uncompressed.
    pub fn encode(&self, compressed: bool) -> Vec<u8> {
        match self.0 {
            Point::Infinity => unreachable!("a PublicKey is never the point at infinity"),
            Point::Affine { x, y } => {
                if compressed {
                    let prefix = if y.to_be_bytes()[31] % 2 == 0 { 0x02 } else { 0x03 };
                    let mut out = Vec::with_capacity(33);
                    out.push(prefix);
                    out.extend_from_slice(&x.to_be_bytes());
                    out
                } else {
                    let mut out = Vec::with_capacity(65);
                    out.push(0x04);
                    out.extend_from_slice(&x.to_be_bytes());
                    out.extend_from_slice(&y.to_be_bytes());
                    out
                }
            }
        }
    }

    /// `HASH160` of the SEC encoding. The payload committed to by a P2PKH
    /// address and script.
    pub fn pkhash(&self, compressed: bool) -> [u8; 20] {
        hash160(&self.encode(compressed))
    }

    /// The Base58Check address for this key on `net`.
    pub fn address(&self, net: Net, compressed: bool) -> String {
        let mut payload = vec![net.address_version()];
        payload.extend_from_slice(&self.pkhash(compressed));
        let checksum = hash256(&payload);
        payload.extend_from_slice(&checksum[..4]);
        base58::encode(&payload)
    }
}

/// Recovers the 20-byte public-key hash committed to by a Base58Check
/// address, after validating its checksum and network version byte.
pub fn address_to_pkhash(net: Net, address: &str) -> Result<[u8; 20]> {
    let decoded = base58::decode(address)?;
    let (body, checksum) = decoded.split_at(21);
    let expected = hash256(body);
    if checksum != &expected[..4] {
        return Err(Error::ChecksumMismatch);
    }
    if body[0] != net.address_version() {
        return Err(Error::MalformedEncoding("address version byte mismatch".into()));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&body[1..]);
    Ok(out)
}

/// Divides a `U256` known to be a multiple of 4 by 4 via two right shifts.
/// Used only for the `(p + 1) / 4` exponent in SEC decompression.
fn div_by_four(x: &U256) -> U256 {
    x.shr1().0.shr1().0
}

/// Base58Check encoding, restricted to this crate's fixed 25-byte payload
/// (1-byte version + 20-byte hash + 4-byte checksum).
pub mod base58 {
    use crate::{Error, Result};

    const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

    /// Encodes a 25-byte Base58Check payload to its string form.
    pub fn encode(payload: &[u8]) -> String {
        debug_assert_eq!(payload.len(), 25);
        let mut digits: Vec<u8> = vec![0];
        for &byte in payload {
            let mut carry = byte as u32;
            for digit in digits.iter_mut() {
                carry += (*digit as u32) << 8;
                *digit = (carry % 58) as u8;
                carry /= 58;
            }
            while carry > 0 {
                digits.push((carry % 58) as u8);
                carry /= 58;
            }
        }
        let leading_zeros = payload.iter().take_while(|&&b| b == 0).count();
        let mut out: Vec<u8> = std::iter::repeat(ALPHABET[0])
            .take(leading_zeros)
            .chain(digits.iter().rev().map(|&d| ALPHABET[d as usize]))
            .collect();
        if out.len() == leading_zeros {
            out.push(ALPHABET[0]);
        }
        String::from_utf8(out).expect("alphabet is ASCII")
    }

    /// Decodes a Base58 string to its fixed 25-byte payload. Does not
    /// itself check the checksum; callers (`address_to_pkhash`) do.
    pub fn decode(s: &str) -> Result<Vec<u8>> {
        let mut bytes: Vec<u8> = vec![0];
        for c in s.chars() {
            let digit = ALPHABET
                .iter()
                .position(|&a| a as char == c)
                .ok_or_else(|| Error::MalformedEncoding(format!("invalid base58 character {c:?}")))?;
            let mut carry = digit as u32;
            for byte in bytes.iter_mut() {
                carry += (*byte as u32) * 58;
                *byte = carry as u8;
                carry >>= 8;
            }
            while carry > 0 {
                bytes.push(carry as u8);
                carry >>= 8;
            }
        }
        let leading_ones = s.chars().take_while(|&c| c == '1').count();
        bytes.extend(std::iter::repeat(0).take(leading_ones));
        bytes.reverse();
        if bytes.len() < 25 {
            let pad = 25 - bytes.len();
            let mut padded = vec![0u8; pad];
            padded.extend_from_slice(&bytes);
            bytes = padded;
        }
        if bytes.len() != 25 {
            return Err(Error::MalformedEncoding(format!(
                "base58check payload decoded to {} bytes, expected 25",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sk_from_hex(s: &str) -> SecretKey {
        let decoded = hex::decode(s).unwrap();
        let mut bytes = [0u8; 32];
        bytes[32 - decoded.len()..].copy_from_slice(&decoded);
        SecretKey::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn address_compressed_mainnet() {
        let sk = sk_from_hex("3aba4162c7251c891207b747840551a71939b0de081f85c4e44cf7c13e41daa6");
        let pk = PublicKey::from_secret_key(&sk);
        assert_eq!(pk.address(Net::Main, true), "14cxpo3MBCYYWCgF74SWTdcmxipnGUsPw3");
    }

    #[test]
    fn address_small_secret_mainnet_compressed() {
        let sk = sk_from_hex("12345deadbeef");
        let pk = PublicKey::from_secret_key(&sk);
        assert_eq!(pk.address(Net::Main, true), "1F1Pn2y6pDb68E5nYJJeba4TLg2U7B6KF1");
    }

    #[test]
    fn address_testnet_compressed() {
        // k = 2020^5
        let k: u64 = 2020u64.pow(5);
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&k.to_be_bytes());
        let sk = SecretKey::from_bytes(&bytes).unwrap();
        let pk = PublicKey::from_secret_key(&sk);
        assert_eq!(pk.address(Net::Test, true), "mopVkxp8UhXqRYbCYJsbeE1h1fiF64jcoH");
    }

    #[test]
    fn address_testnet_uncompressed() {
        let sk = sk_from_hex("138a"); // 5002
        let pk = PublicKey::from_secret_key(&sk);
        assert_eq!(pk.address(Net::Test, false), "mmTPbXQFxboEtNRkwfh6K51jvdtHLxGeMA");
    }

    #[test]
    fn sec_round_trip_compressed_and_uncompressed() {
        let sk = SecretKey::generate();
        let pk = PublicKey::from_secret_key(&sk);
        let compressed = pk.encode(true);
        let uncompressed = pk.encode(false);
        assert_eq!(PublicKey::decode(&compressed).unwrap(), pk);
        assert_eq!(PublicKey::decode(&uncompressed).unwrap(), pk);
    }

    #[test]
    fn address_to_pkhash_round_trips_with_address() {
        let sk = sk_from_hex("3aba4162c7251c891207b747840551a71939b0de081f85c4e44cf7c13e41daa6");
        let pk = PublicKey::from_secret_key(&sk);
        let addr = pk.address(Net::Main, true);
        let recovered = address_to_pkhash(Net::Main, &addr).unwrap();
        assert_eq!(recovered, pk.pkhash(true));
    }

    #[test]
    fn address_to_pkhash_rejects_bad_checksum() {
        let sk = sk_from_hex("3aba4162c7251c891207b747840551a71939b0de081f85c4e44cf7c13e41daa6");
        let pk = PublicKey::from_secret_key(&sk);
        let mut addr = pk.address(Net::Main, true).into_bytes();
        let last = addr.len() - 1;
        addr[last] = if addr[last] == b'1' { b'2' } else { b'1' };
        let addr = String::from_utf8(addr).unwrap();
        assert!(address_to_pkhash(Net::Main, &addr).is_err());
    }

    #[test]
    fn secret_key_from_bytes_rejects_zero_and_order() {
        assert!(SecretKey::from_bytes(&[0u8; 32]).is_err());
        assert!(SecretKey::from_bytes(&curve::N.to_be_bytes()).is_err());
    }
}
