//! ECDSA signing and verification over secp256k1, plus the DER encoding
//! Bitcoin wraps signatures in on the wire.
//!
//! The message digest is always this crate's `hash256` (double SHA-256) of
//! the caller-supplied bytes. Callers pass whatever preimage they've built
//! (the transaction sighash preimage, typically), not a raw message.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::curve::{self, Point};
use crate::field::{self, U256};
use crate::hash::hash256;
use crate::keys::{PublicKey, SecretKey};
use crate::{Error, Result};

/// An ECDSA signature: a pair of scalars, each in `[1, n)` once produced by
/// `sign`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Signature {
    pub r: U256,
    pub s: U256,
}

fn digest_to_scalar(message: &[u8]) -> U256 {
    U256::from_be_bytes(&hash256(message))
}

/// Half of the curve order, used for low-S canonicalization.
fn half_n() -> U256 {
    curve::N.shr1().0
}

/// Signs `message` (hashed with `hash256` internally) with `sk`.
///
/// A fresh ephemeral scalar `k` is drawn from the OS CSPRNG for every call
/// and retried if it happens to produce `r == 0` or `s == 0` (negligible
/// probability, but the degenerate signature would leak nothing useful
/// anyway). The result is canonicalized to the low-S form required by
/// standard Bitcoin relay policy.
pub fn sign(sk: &SecretKey, message: &[u8]) -> Signature {
    let z = digest_to_scalar(message);
    loop {
        let mut k_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut k_bytes);
        let k = U256::from_be_bytes(&k_bytes);
        if k.is_zero() || k >= curve::N {
            continue;
        }

        let r = match Point::generator().scalar_mul(&k) {
            Point::Affine { x, .. } => x,
            Point::Infinity => continue,
        };
        if r.is_zero() {
            continue;
        }

        let k_inv = field::inv_mod(&k, &curve::N);
        let sk_r = field::mul_mod(sk.scalar(), &r, &curve::N);
        let z_plus_skr = field::add_mod(&z, &sk_r, &curve::N);
        let mut s = field::mul_mod(&k_inv, &z_plus_skr, &curve::N);
        if s.is_zero() {
            continue;
        }
        if s > half_n() {
            s = field::sub_mod(&curve::N, &s, &curve::N);
        }
        return Signature { r, s };
    }
}

/// Verifies `sig` against `message` (hashed with `hash256` internally) and
/// `pk`. Returns `false` (never panics) for an out-of-range `r`/`s`.
pub fn verify(pk: &PublicKey, message: &[u8], sig: &Signature) -> bool {
    if sig.r.is_zero() || sig.r >= curve::N || sig.s.is_zero() || sig.s >= curve::N {
        return false;
    }
    let z = digest_to_scalar(message);
    let w = field::inv_mod(&sig.s, &curve::N);
    let u1 = field::mul_mod(&z, &w, &curve::N);
    let u2 = field::mul_mod(&sig.r, &w, &curve::N);
    let point = Point::generator()
        .scalar_mul(&u1)
        .add(&pk.point().scalar_mul(&u2));
    match point {
        Point::Affine { x, .. } => x == sig.r,
        Point::Infinity => false,
    }
}

impl Signature {
    /// DER-encodes this signature per BIP-62: `0x30 len 0x02 rlen r 0x02
    /// slen s`. The sighash-type trailer byte used in `script_sig` is not
    /// part of this encoding; callers append/strip it themselves.
    pub fn encode(&self) -> Vec<u8> {
        let rb = der_int(&self.r);
        let sb = der_int(&self.s);
        let mut content = Vec::with_capacity(4 + rb.len() + sb.len());
        content.push(0x02);
        content.push(rb.len() as u8);
        content.extend_from_slice(&rb);
        content.push(0x02);
        content.push(sb.len() as u8);
        content.extend_from_slice(&sb);

        let mut out = Vec::with_capacity(2 + content.len());
        out.push(0x30);
        out.push(content.len() as u8);
        out.extend_from_slice(&content);
        out
    }

    /// Decodes a DER-encoded signature, validating the tag bytes and the
    /// `total == 6 + r_len + s_len` length relation.
    pub fn decode(der: &[u8]) -> Result<Signature> {
        if der.len() < 8 || der[0] != 0x30 {
            return Err(Error::MalformedEncoding("DER signature missing 0x30 tag".into()));
        }
        let total_len = der[1] as usize;
        if total_len != der.len() - 2 {
            return Err(Error::MalformedEncoding("DER total length mismatch".into()));
        }
        if der[2] != 0x02 {
            return Err(Error::MalformedEncoding("DER signature missing r tag".into()));
        }
        let r_len = der[3] as usize;
        let r_start = 4;
        let r_end = r_start + r_len;
        if r_end + 2 > der.len() {
            return Err(Error::MalformedEncoding("DER r field overruns buffer".into()));
        }
        let r = U256::from_be_bytes(&left_pad32(&der[r_start..r_end])?);

        if der[r_end] != 0x02 {
            return Err(Error::MalformedEncoding("DER signature missing s tag".into()));
        }
        let s_len = der[r_end + 1] as usize;
        let s_start = r_end + 2;
        let s_end = s_start + s_len;
        if s_end != der.len() {
            return Err(Error::MalformedEncoding("DER s field length mismatch".into()));
        }
        let s = U256::from_be_bytes(&left_pad32(&der[s_start..s_end])?);

        if der.len() != 6 + r_len + s_len {
            return Err(Error::MalformedEncoding("DER encoding length relation violated".into()));
        }

        Ok(Signature { r, s })
    }
}

/// Encodes a scalar as a DER INTEGER body: big-endian, minimal, leading
/// zero stripped, with a guard `0x00` re-inserted if the high bit of the
/// first remaining byte would otherwise make the value look negative.
fn der_int(n: &U256) -> Vec<u8> {
    let full = n.to_be_bytes();
    let mut start = 0;
    while start < 31 && full[start] == 0 {
        start += 1;
    }
    let mut out = Vec::with_capacity(33);
    if full[start] >= 0x80 {
        out.push(0x00);
    }
    out.extend_from_slice(&full[start..]);
    out
}

/// Left-pads a DER INTEGER body (already guard-stripped to <= 33 bytes) out
/// to 32 bytes, as required by `U256::from_be_bytes`.
fn left_pad32(body: &[u8]) -> Result<[u8; 32]> {
    if body.is_empty() || body.len() > 33 {
        return Err(Error::MalformedEncoding(format!(
            "DER integer body has invalid length {}",
            body.len()
        )));
    }
    let trimmed = if body.len() == 33 {
        if body[0] != 0x00 {
            return Err(Error::MalformedEncoding("DER integer has disallowed 33rd byte".into()));
        }
        &body[1..]
    } else {
        body
    };
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let sk = SecretKey::generate();
        let pk = PublicKey::from_secret_key(&sk);
        let message = b"a message worth signing";
        let sig = sign(&sk, message);
        assert!(verify(&pk, message, &sig));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let sk = SecretKey::generate();
        let other_sk = SecretKey::generate();
        let other_pk = PublicKey::from_secret_key(&other_sk);
        let message = b"a message worth signing";
        let sig = sign(&sk, message);
        assert!(!verify(&other_pk, message, &sig));
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let sk = SecretKey::generate();
        let pk = PublicKey::from_secret_key(&sk);
        let sig = sign(&sk, b"original message");
        assert!(!verify(&pk, b"tampered message", &sig));
    }

    #[test]
    fn signatures_are_low_s() {
        let sk = SecretKey::generate();
        for i in 0..10 {
            let msg = format!("message {i}");
            let sig = sign(&sk, msg.as_bytes());
            assert!(sig.s <= half_n());
        }
    }

    #[test]
    fn der_round_trips() {
        let sk = SecretKey::generate();
        let sig = sign(&sk, b"der round trip");
        let der = sig.encode();
        let decoded = Signature::decode(&der).unwrap();
        assert_eq!(decoded, sig);
    }

    #[test]
    fn der_decode_rejects_truncated_input() {
        let sk = SecretKey::generate();
        let sig = sign(&sk, b"der round trip");
        let mut der = sig.encode();
        der.pop();
        assert!(Signature::decode(&der).is_err());
    }

    #[test]
    fn der_decode_rejects_bad_tag() {
        let sk = SecretKey::generate();
        let sig = sign(&sk, b"der round trip");
        let mut der = sig.encode();
        der[0] = 0x31;
        assert!(Signature::decode(&der).is_err());
    }
}
