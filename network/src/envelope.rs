//! The Bitcoin P2P wire envelope: `magic | command | payload_len | checksum
//! | payload`, shared by every message this crate knows how to speak.
//!
//! The checksum reuses `core::hash::hash256`, and the magic bytes come from
//! `core::params::Net`, the same way `core::block` ties headers to a
//! network.

use std::io::{Read, Write};

use satoshi_core::hash::hash256;
use satoshi_core::Net;

use crate::error::{Error, Result};

/// One framed P2P message: a fixed 4-byte magic, a zero-padded 12-byte ASCII
/// command token, and an opaque payload.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NetworkEnvelope {
    pub magic: [u8; 4],
    pub command: [u8; 12],
    pub payload: Vec<u8>,
}

impl NetworkEnvelope {
    pub fn new(net: Net, command: [u8; 12], payload: Vec<u8>) -> NetworkEnvelope {
        NetworkEnvelope { magic: net.magic(), command, payload }
    }

    /// `magic | command | payload_len (4 LE) | checksum (4) | payload`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24 + self.payload.len());
        out.extend_from_slice(&self.magic);
        out.extend_from_slice(&self.command);
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&checksum(&self.payload));
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decodes a complete envelope already in memory, validating magic,
    /// checksum, and payload length together.
    pub fn decode(bytes: &[u8], net: Net) -> Result<NetworkEnvelope> {
        read(&mut std::io::Cursor::new(bytes), net)
    }

    /// The command token with trailing zero padding stripped, as a display
    /// string (lossy if the peer sent non-ASCII, which is itself malformed).
    pub fn command_name(&self) -> String {
        let end = self.command.iter().position(|&b| b == 0).unwrap_or(12);
        String::from_utf8_lossy(&self.command[..end]).into_owned()
    }
}

/// Reads one envelope from `r`, blocking until the header and the declared
/// payload length are both available.
pub fn read(r: &mut impl Read, net: Net) -> Result<NetworkEnvelope> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != net.magic() {
        return Err(Error::MalformedEncoding(format!(
            "envelope magic {} does not match expected {}",
            hex::encode(magic),
            hex::encode(net.magic())
        )));
    }

    let mut command = [0u8; 12];
    r.read_exact(&mut command)?;

    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let payload_len = u32::from_le_bytes(len_buf) as usize;

    let mut expected_checksum = [0u8; 4];
    r.read_exact(&mut expected_checksum)?;

    let mut payload = vec![0u8; payload_len];
    r.read_exact(&mut payload)?;

    if checksum(&payload) != expected_checksum {
        return Err(Error::ChecksumMismatch);
    }

    Ok(NetworkEnvelope { magic, command, payload })
}

/// Writes the encoded envelope to `w`.
pub fn write(envelope: &NetworkEnvelope, w: &mut impl Write) -> Result<()> {
    w.write_all(&envelope.encode())?;
    Ok(())
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = hash256(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Zero-pads an ASCII command name out to the fixed 12-byte command field.
pub fn command_token(name: &str) -> [u8; 12] {
    let bytes = name.as_bytes();
    debug_assert!(bytes.len() <= 12, "command name longer than 12 bytes");
    let mut out = [0u8; 12];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERACK_HEX: &str = "f9beb4d976657261636b000000000000000000005df6e0e2";

    #[test]
    fn decodes_known_verack_envelope() {
        let bytes = hex::decode(VERACK_HEX).unwrap();
        let envelope = NetworkEnvelope::decode(&bytes, Net::Main).unwrap();
        assert_eq!(envelope.command_name(), "verack");
        assert!(envelope.payload.is_empty());
    }

    #[test]
    fn encode_decode_round_trips() {
        let bytes = hex::decode(VERACK_HEX).unwrap();
        let envelope = NetworkEnvelope::decode(&bytes, Net::Main).unwrap();
        assert_eq!(hex::encode(envelope.encode()), VERACK_HEX);
    }

    #[test]
    fn rejects_wrong_net_magic() {
        let bytes = hex::decode(VERACK_HEX).unwrap();
        assert!(NetworkEnvelope::decode(&bytes, Net::Test).is_err());
    }

    #[test]
    fn rejects_tampered_checksum() {
        let mut bytes = hex::decode(VERACK_HEX).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(NetworkEnvelope::decode(&bytes, Net::Main).is_err());
    }

    #[test]
    fn command_token_pads_with_zeros() {
        let token = command_token("verack");
        assert_eq!(&token[..6], b"verack");
        assert_eq!(&token[6..], &[0u8; 6]);
    }
}
