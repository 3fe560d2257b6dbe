//! Bitcoin Script: the varint-framed command stream used by
//! `script_sig`/`script_pubkey`, and evaluation restricted to the
//! canonical P2PKH pattern.
//!
//! Only the P2PKH command shape is evaluated; every other script decodes
//! fine (scripts are just data until `evaluate` is called) but fails
//! evaluation with `Error::ScriptUnsupported`.

use std::fmt;
use std::io::Read;

use crate::ecdsa::{self, Signature};
use crate::hash::hash160;
use crate::keys::PublicKey;
use crate::varint;
use crate::{Error, Result};

pub const OP_DUP: u8 = 118;
pub const OP_HASH160: u8 = 169;
pub const OP_EQUALVERIFY: u8 = 136;
pub const OP_CHECKSIG: u8 = 172;

const OP_PUSHDATA1: u8 = 76;
const OP_PUSHDATA2: u8 = 77;

/// SIGHASH_ALL: the only sighash type this crate's `evaluate` accepts.
pub const SIGHASH_ALL: u8 = 0x01;

/// A single Script command: either a raw opcode, or a pushed data element.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    Op(u8),
    Element(Vec<u8>),
}

/// A Script: an ordered list of commands.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Script(pub Vec<Command>);

impl Script {
    pub fn new(cmds: Vec<Command>) -> Script {
        Script(cmds)
    }

    /// Concatenates two scripts, used to splice `script_sig` onto
    /// `script_pubkey` before evaluation.
    pub fn concat(mut self, other: Script) -> Script {
        self.0.extend(other.0);
        self
    }

    /// The canonical P2PKH locking script for a 20-byte public-key hash:
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn p2pkh(pubkey_hash: [u8; 20]) -> Script {
        Script(vec![
            Command::Op(OP_DUP),
            Command::Op(OP_HASH160),
            Command::Element(pubkey_hash.to_vec()),
            Command::Op(OP_EQUALVERIFY),
            Command::Op(OP_CHECKSIG),
        ])
    }

    /// Decodes a varint-length-prefixed script body from `r`.
    pub fn decode(r: &mut impl Read) -> Result<Script> {
        let length = varint::read(r)? as usize;
        let mut cmds = Vec::new();
        let mut count = 0usize;
        while count < length {
            let mut tag_buf = [0u8; 1];
            r.read_exact(&mut tag_buf)
                .map_err(|e| Error::MalformedEncoding(format!("script tag: {e}")))?;
            let tag = tag_buf[0];
            count += 1;
            match tag {
                1..=75 => {
                    let data = varint::read_bytes(r, tag as usize)?;
                    count += tag as usize;
                    cmds.push(Command::Element(data));
                }
                OP_PUSHDATA1 => {
                    let len = varint::read_bytes(r, 1)?[0] as usize;
                    let data = varint::read_bytes(r, len)?;
                    count += 1 + len;
                    cmds.push(Command::Element(data));
                }
                OP_PUSHDATA2 => {
                    let len_bytes = varint::read_bytes(r, 2)?;
                    let len = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
                    let data = varint::read_bytes(r, len)?;
                    count += 2 + len;
                    cmds.push(Command::Element(data));
                }
                op => cmds.push(Command::Op(op)),
            }
        }
        if count != length {
            return Err(Error::MalformedEncoding(
                "script body length did not match varint prefix".into(),
            ));
        }
        Ok(Script(cmds))
    }

    /// Encodes this script with its varint length prefix, re-encoding every
    /// push in its tightest form. Rejects any element over 520 bytes, the
    /// largest push Bitcoin's script interpreter allows.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        for cmd in &self.0 {
            match cmd {
                Command::Op(op) => body.push(*op),
                Command::Element(data) => {
                    let len = data.len();
                    if len > 520 {
                        return Err(Error::MalformedEncoding(format!(
                            "script element is {len} bytes, over the 520-byte limit"
                        )));
                    }
                    if len <= 75 {
                        body.push(len as u8);
                    } else if (76..=255).contains(&len) {
                        body.push(OP_PUSHDATA1);
                        body.push(len as u8);
                    } else {
                        body.push(OP_PUSHDATA2);
                        body.extend_from_slice(&(len as u16).to_le_bytes());
                    }
                    body.extend_from_slice(data);
                }
            }
        }
        let mut out = varint::write(body.len() as u64);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Evaluates this script against `modified_tx_bytes` (the sighash
    /// preimage for the input this script authorizes), supporting only the
    /// canonical 7-command P2PKH shape.
    pub fn evaluate(&self, modified_tx_bytes: &[u8]) -> Result<bool> {
        let cmds = &self.0;
        let matches_p2pkh = cmds.len() == 7
            && matches!(cmds[0], Command::Element(_))
            && matches!(cmds[1], Command::Element(_))
            && cmds[2] == Command::Op(OP_DUP)
            && cmds[3] == Command::Op(OP_HASH160)
            && matches!(cmds[4], Command::Element(_))
            && cmds[5] == Command::Op(OP_EQUALVERIFY)
            && cmds[6] == Command::Op(OP_CHECKSIG);

        if !matches_p2pkh {
            return Err(Error::ScriptUnsupported);
        }

        let (sig_with_type, pubkey_bytes, expected_hash) = match (&cmds[0], &cmds[1], &cmds[4]) {
            (Command::Element(a), Command::Element(b), Command::Element(c)) => (a, b, c),
            _ => unreachable!("shape already checked above"),
        };

        if hash160(pubkey_bytes).as_slice() != expected_hash.as_slice() {
            return Ok(false);
        }

        let (der, sighash_type) = match sig_with_type.split_last() {
            Some((&t, rest)) => (rest, t),
            None => return Ok(false),
        };
        if sighash_type != SIGHASH_ALL {
            return Err(Error::SigHashUnsupported(sighash_type));
        }

        let signature = Signature::decode(der)?;
        let pubkey = PublicKey::decode(pubkey_bytes)?;
        Ok(ecdsa::verify(&pubkey, modified_tx_bytes, &signature))
    }
}

fn op_name(op: u8) -> &'static str {
    match op {
        0 => "OP_0",
        76 => "OP_PUSHDATA1",
        77 => "OP_PUSHDATA2",
        78 => "OP_PUSHDATA4",
        79 => "OP_1NEGATE",
        97 => "OP_NOP",
        105 => "OP_VERIFY",
        106 => "OP_RETURN",
        117 => "OP_DROP",
        118 => "OP_DUP",
        135 => "OP_EQUAL",
        136 => "OP_EQUALVERIFY",
        147 => "OP_ADD",
        148 => "OP_SUB",
        166 => "OP_RIPEMD160",
        168 => "OP_SHA256",
        169 => "OP_HASH160",
        170 => "OP_HASH256",
        172 => "OP_CHECKSIG",
        173 => "OP_CHECKSIGVERIFY",
        174 => "OP_CHECKMULTISIG",
        _ => "OP_UNKNOWN",
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|cmd| match cmd {
                Command::Op(op) => {
                    let name = op_name(*op);
                    if name == "OP_UNKNOWN" {
                        format!("OP_[{op}]")
                    } else {
                        name.to_string()
                    }
                }
                Command::Element(data) => hex::encode(data),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdsa::sign;
    use crate::keys::SecretKey;

    #[test]
    fn p2pkh_round_trips_through_encode_decode() {
        let script = Script::p2pkh([0x11; 20]);
        let encoded = script.encode().unwrap();
        let decoded = Script::decode(&mut varint::cursor(&encoded)).unwrap();
        assert_eq!(decoded, script);
    }

    #[test]
    fn encode_rejects_oversized_element() {
        let script = Script(vec![Command::Element(vec![0u8; 521])]);
        assert!(matches!(script.encode(), Err(Error::MalformedEncoding(_))));
    }

    #[test]
    fn encode_accepts_element_at_the_cap() {
        let script = Script(vec![Command::Element(vec![0u8; 520])]);
        assert!(script.encode().is_ok());
    }

    #[test]
    fn evaluate_accepts_valid_p2pkh_spend() {
        let sk = SecretKey::generate();
        let pk = PublicKey::from_secret_key(&sk);
        let message = b"pretend sighash preimage";
        let sig = sign(&sk, message);
        let mut sig_bytes = sig.encode();
        sig_bytes.push(SIGHASH_ALL);

        let script_sig = Script(vec![
            Command::Element(sig_bytes),
            Command::Element(pk.encode(true)),
        ]);
        let script_pubkey = Script::p2pkh(pk.pkhash(true));
        let combined = script_sig.concat(script_pubkey);

        assert!(combined.evaluate(message).unwrap());
    }

    #[test]
    fn evaluate_rejects_wrong_pubkey_hash() {
        let sk = SecretKey::generate();
        let pk = PublicKey::from_secret_key(&sk);
        let message = b"pretend sighash preimage";
        let sig = sign(&sk, message);
        let mut sig_bytes = sig.encode();
        sig_bytes.push(SIGHASH_ALL);

        let script_sig = Script(vec![
            Command::Element(sig_bytes),
            Command::Element(pk.encode(true)),
        ]);
        let script_pubkey = Script::p2pkh([0xff; 20]);
        let combined = script_sig.concat(script_pubkey);

        assert!(!combined.evaluate(message).unwrap());
    }

    #[test]
    fn evaluate_rejects_non_p2pkh_shape() {
        let script = Script(vec![Command::Op(OP_DUP)]);
        assert!(matches!(script.evaluate(b""), Err(Error::ScriptUnsupported)));
    }

    #[test]
    fn display_renders_known_opcodes_by_name() {
        let script = Script::p2pkh([0u8; 20]);
        let rendered = script.to_string();
        assert!(rendered.contains("OP_DUP"));
        assert!(rendered.contains("OP_HASH160"));
        assert!(rendered.contains("OP_EQUALVERIFY"));
        assert!(rendered.contains("OP_CHECKSIG"));
    }

}
