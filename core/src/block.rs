//! Block headers: the 80-byte wire layout, target/bits conversion,
//! difficulty, proof-of-work validation, and the 2016-block retarget rule.
//!
//! Fixture-verified against the real mainnet header at height 497,368 and
//! the genesis block on both networks.

use std::io::Read;

use crate::field::U256;
use crate::hash::hash256;
use crate::varint;
use crate::{Error, Result};

const TWO_WEEKS_SECS: i64 = 14 * 24 * 3600;

/// A Bitcoin block header: the fixed 80-byte structure that commits to a
/// block's transactions and carries its proof of work.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    pub version: i32,
    /// Display order (big-endian-looking hex), matching `TxIn::prev_tx`.
    pub prev_block: [u8; 32],
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub bits: [u8; 4],
    pub nonce: [u8; 4],
}

impl BlockHeader {
    /// Decodes an 80-byte wire-format header.
    pub fn decode(bytes: &[u8]) -> Result<BlockHeader> {
        if bytes.len() != 80 {
            return Err(Error::MalformedEncoding(format!(
                "block header is {} bytes, expected 80",
                bytes.len()
            )));
        }
        let mut r = varint::cursor(bytes);
        let version = varint::read_i32_le(&mut r)?;
        let prev_block = reversed32(&mut r)?;
        let merkle_root = reversed32(&mut r)?;
        let timestamp = varint::read_u32_le(&mut r)?;
        let bits = fixed4(&mut r)?;
        let nonce = fixed4(&mut r)?;
        Ok(BlockHeader { version, prev_block, merkle_root, timestamp, bits, nonce })
    }

    /// Encodes back to the 80-byte wire layout.
    pub fn encode(&self) -> [u8; 80] {
        let mut out = [0u8; 80];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&reversed(&self.prev_block));
        out[36..68].copy_from_slice(&reversed(&self.merkle_root));
        out[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits);
        out[76..80].copy_from_slice(&self.nonce);
        out
    }

    /// `hash256` of the encoded header, byte-reversed, hex: the block id.
    pub fn id(&self) -> String {
        let mut digest = hash256(&self.encode());
        digest.reverse();
        hex::encode(digest)
    }

    /// The proof-of-work target this header's `bits` compact-encode.
    pub fn target(&self) -> U256 {
        bits_to_target(&self.bits)
    }

    /// `(0xFFFF · 256^(0x1D − 3)) / target`, the genesis block's target
    /// divided by this header's, a ratio >= 1 as difficulty rises.
    pub fn difficulty(&self) -> f64 {
        to_f64(&max_target()) / to_f64(&self.target())
    }

    /// `true` if this header's id, read as a big integer, is less than its
    /// target, i.e. the proof of work is valid.
    pub fn validate_pow(&self) -> bool {
        let mut digest = hash256(&self.encode());
        digest.reverse();
        U256::from_be_bytes(&digest) < self.target()
    }
}

/// `coeff · 256^(exponent − 3)`, decoded from 4 raw `bits` bytes.
pub fn bits_to_target(bits: &[u8; 4]) -> U256 {
    let exponent = bits[3] as i32;
    let coeff = u32::from_le_bytes([bits[0], bits[1], bits[2], 0]);
    shl_bytes(&U256::from_u64(coeff as u64), exponent - 3)
}

/// Big-endian-encodes `target`, strips leading zeros, and re-derives the
/// compact `bits` encoding (prepending a guard `0x00` and bumping the
/// exponent if the remaining high bit is set).
pub fn target_to_bits(target: &U256) -> [u8; 4] {
    let bytes = target.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0);
    let Some(first_nonzero) = first_nonzero else {
        return [0, 0, 0, 0];
    };
    let significant = &bytes[first_nonzero..];

    let (exponent, coeff): (u8, [u8; 3]) = if significant[0] > 0x7f {
        let mut c = [0u8; 3];
        c[1] = significant[0];
        if significant.len() > 1 {
            c[2] = significant[1];
        }
        ((significant.len() + 1) as u8, c)
    } else {
        let mut c = [0u8; 3];
        for (i, &b) in significant.iter().take(3).enumerate() {
            c[i] = b;
        }
        (significant.len() as u8, c)
    };
    [coeff[2], coeff[1], coeff[0], exponent]
}

/// Given the previous 2016-block epoch's `bits` and observed elapsed time
/// `dt` (seconds), computes the next epoch's `bits`.
pub fn calculate_new_bits(prev_bits: &[u8; 4], dt_seconds: i64) -> [u8; 4] {
    let clamped = dt_seconds.clamp(TWO_WEEKS_SECS / 4, TWO_WEEKS_SECS * 4);
    let prev_target = bits_to_target(prev_bits);
    let new_target = scale_target(&prev_target, clamped as u64, TWO_WEEKS_SECS as u64);
    let capped = if new_target > max_target() { max_target() } else { new_target };
    target_to_bits(&capped)
}

/// `0xFFFF · 256^(0x1D − 3)`, the maximum (easiest) permitted target.
fn max_target() -> U256 {
    bits_to_target(&[0xff, 0xff, 0x00, 0x1d])
}

/// Shifts `x` left by `n` bytes (i.e. multiplies by `256^n`); negative `n`
/// shifts right. Valid `bits` encodings never produce an `n` outside what
/// 32 bytes can hold.
fn shl_bytes(x: &U256, n: i32) -> U256 {
    let mut result = *x;
    if n >= 0 {
        for _ in 0..(n as u32) * 8 {
            result = result.shl1(false).0;
        }
    } else {
        for _ in 0..(-n) as u32 * 8 {
            result = result.shr1().0;
        }
    }
    result
}

/// `target * num / den` via base-256 long multiplication and division.
/// `num`/`den` are always small (bounded by the retarget clamp), so the
/// intermediate product comfortably fits an extra few bytes beyond
/// `target`'s own 32.
fn scale_target(target: &U256, num: u64, den: u64) -> U256 {
    let bytes = target.to_be_bytes();
    let mut product = [0u8; 40];
    let mut carry: u128 = 0;
    for i in (0..32).rev() {
        let v = bytes[i] as u128 * num as u128 + carry;
        product[8 + i] = (v % 256) as u8;
        carry = v / 256;
    }
    for slot in product[..8].iter_mut().rev() {
        *slot = (carry % 256) as u8;
        carry /= 256;
    }

    let mut quotient = [0u8; 40];
    let mut remainder: u128 = 0;
    for i in 0..40 {
        remainder = remainder * 256 + product[i] as u128;
        quotient[i] = (remainder / den as u128) as u8;
        remainder %= den as u128;
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&quotient[8..40]);
    U256::from_be_bytes(&out)
}

fn to_f64(x: &U256) -> f64 {
    let mut acc = 0f64;
    for &byte in x.to_be_bytes().iter() {
        acc = acc * 256.0 + byte as f64;
    }
    acc
}

fn reversed(bytes: &[u8; 32]) -> [u8; 32] {
    let mut out = *bytes;
    out.reverse();
    out
}

fn reversed32(r: &mut impl Read) -> Result<[u8; 32]> {
    let bytes = varint::read_reversed(r, 32)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn fixed4(r: &mut impl Read) -> Result<[u8; 4]> {
    let bytes = varint::read_bytes(r, 4)?;
    let mut out = [0u8; 4];
    out.copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_from_hex(s: &str) -> BlockHeader {
        BlockHeader::decode(&hex::decode(s).unwrap()).unwrap()
    }

    const MAINNET_BLOCK_497368: &str = "020000208ec39428b17323fa0ddec8e887b4a7c53b8c0a0a220cfd0000000000000000005b0750fce0a889502d40508d39576821155e9c9e3f5c3157f961db38fd8b25be1e77a759e93c0118a4ffd71d";
    const GENESIS_MAIN_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c";

    #[test]
    fn decodes_known_mainnet_header() {
        let header = header_from_hex(MAINNET_BLOCK_497368);
        assert_eq!(header.version, 0x20000002u32 as i32);
        assert_eq!(hex::encode(header.timestamp.to_be_bytes()), "59a7771e");
        assert_eq!(hex::encode(header.bits), "e93c0118");
        assert_eq!(header.id(), "0000000000000000007e9e4c586439b0cdbe13b1370bdd9435d76a644d047523");
    }

    #[test]
    fn encode_decode_round_trips() {
        let header = header_from_hex(MAINNET_BLOCK_497368);
        assert_eq!(hex::encode(header.encode()), MAINNET_BLOCK_497368);
    }

    #[test]
    fn difficulty_matches_known_vector() {
        let header = header_from_hex(MAINNET_BLOCK_497368);
        assert_eq!(header.difficulty().trunc() as u64, 888_171_856_257);
    }

    #[test]
    fn bits_to_target_and_back_round_trips() {
        for bits_hex in ["e93c0118", "54d80118", "00157617", "ffff001d"] {
            let bits: [u8; 4] = hex::decode(bits_hex).unwrap().try_into().unwrap();
            let target = bits_to_target(&bits);
            assert_eq!(target_to_bits(&target), bits, "failed for {bits_hex}");
        }
    }

    #[test]
    fn retarget_matches_known_vector() {
        let prev_bits: [u8; 4] = hex::decode("54d80118").unwrap().try_into().unwrap();
        let next = calculate_new_bits(&prev_bits, 302_400);
        assert_eq!(hex::encode(next), "00157617");
    }

    #[test]
    fn genesis_header_validates() {
        let header = header_from_hex(GENESIS_MAIN_HEX);
        assert_eq!(header.id(), "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f");
        assert!(header.validate_pow());
    }

    #[test]
    fn tampered_header_fails_pow() {
        let mut header = header_from_hex(GENESIS_MAIN_HEX);
        header.nonce[0] ^= 0xff;
        assert!(!header.validate_pow());
    }
}
