//! The six P2P message payloads this crate speaks, each paired with the
//! fixed command token `NetworkEnvelope` frames it under.
//!
//! Wire integers follow the same little-endian convention `core::tx`/
//! `core::block` use; the net-addr port field is the one big-endian
//! exception, per the wire protocol.

use std::io::Read;

use satoshi_core::block::BlockHeader;
use satoshi_core::varint;

use crate::error::{Error, Result};

/// A message payload with a fixed command token, encodable/decodable on its
/// own (the envelope and checksum live one layer up).
pub trait Message: Sized {
    const COMMAND: &'static [u8; 12];
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Result<Self>;
}

fn read_exact_bytes(r: &mut impl Read, n: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)
        .map_err(|e| Error::MalformedEncoding(format!("expected {n} bytes: {e}")))?;
    Ok(buf)
}

/// One of `version`'s two embedded 26-byte net-addr structs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NetAddr {
    pub services: u64,
    /// 16-byte IPv6-mapped IPv4 address (`::ffff:a.b.c.d`).
    pub ip: [u8; 16],
    /// Big-endian on the wire, unlike every other integer field here.
    pub port: u16,
}

impl NetAddr {
    pub fn ipv4_mapped(octets: [u8; 4], port: u16) -> NetAddr {
        let mut ip = [0u8; 16];
        ip[10] = 0xff;
        ip[11] = 0xff;
        ip[12..16].copy_from_slice(&octets);
        NetAddr { services: 0, ip, port }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.services.to_le_bytes());
        out.extend_from_slice(&self.ip);
        out.extend_from_slice(&self.port.to_be_bytes());
    }

    fn decode(r: &mut impl Read) -> Result<NetAddr> {
        let services = u64::from_le_bytes(read_exact_bytes(r, 8)?.try_into().unwrap());
        let ip: [u8; 16] = read_exact_bytes(r, 16)?.try_into().unwrap();
        let port = u16::from_be_bytes(read_exact_bytes(r, 2)?.try_into().unwrap());
        Ok(NetAddr { services, ip, port })
    }
}

fn write_varstr(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&varint::write(s.len() as u64));
    out.extend_from_slice(s.as_bytes());
}

fn read_varstr(r: &mut impl Read) -> Result<String> {
    let len = varint::read(r).map_err(|_| Error::MalformedEncoding("varstr length".into()))? as usize;
    let bytes = read_exact_bytes(r, len)?;
    String::from_utf8(bytes).map_err(|e| Error::MalformedEncoding(format!("varstr is not UTF-8: {e}")))
}

/// A peer's self-introduction: protocol version, services, timestamp, the
/// two net-addr structs, a nonce, a free-form user agent, the sender's best
/// known block height, and a relay flag.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VersionMessage {
    pub version: i32,
    pub services: u64,
    pub timestamp: i64,
    pub receiver: NetAddr,
    pub sender: NetAddr,
    pub nonce: u64,
    pub user_agent: String,
    pub latest_block: u32,
    pub relay: bool,
}

impl VersionMessage {
    /// A version announcement for an outbound connection with no particular
    /// peer address known yet (both net-addrs zeroed), the way a node
    /// reaching out cold announces itself.
    pub fn new(timestamp: i64, nonce: u64) -> VersionMessage {
        VersionMessage {
            version: 70015,
            services: 0,
            timestamp,
            receiver: NetAddr::ipv4_mapped([0, 0, 0, 0], 8333),
            sender: NetAddr::ipv4_mapped([0, 0, 0, 0], 8333),
            nonce,
            user_agent: "/satoshi-rs:0.1.0/".to_string(),
            latest_block: 0,
            relay: false,
        }
    }
}

impl Message for VersionMessage {
    const COMMAND: &'static [u8; 12] = &COMMAND_VERSION;

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.services.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        self.receiver.encode(&mut out);
        self.sender.encode(&mut out);
        out.extend_from_slice(&self.nonce.to_le_bytes());
        write_varstr(&mut out, &self.user_agent);
        out.extend_from_slice(&self.latest_block.to_le_bytes());
        out.push(self.relay as u8);
        out
    }

    fn decode(bytes: &[u8]) -> Result<VersionMessage> {
        let mut r = std::io::Cursor::new(bytes);
        let version = i32::from_le_bytes(read_exact_bytes(&mut r, 4)?.try_into().unwrap());
        let services = u64::from_le_bytes(read_exact_bytes(&mut r, 8)?.try_into().unwrap());
        let timestamp = i64::from_le_bytes(read_exact_bytes(&mut r, 8)?.try_into().unwrap());
        let receiver = NetAddr::decode(&mut r)?;
        let sender = NetAddr::decode(&mut r)?;
        let nonce = u64::from_le_bytes(read_exact_bytes(&mut r, 8)?.try_into().unwrap());
        let user_agent = read_varstr(&mut r)?;
        let latest_block = u32::from_le_bytes(read_exact_bytes(&mut r, 4)?.try_into().unwrap());
        let relay = read_exact_bytes(&mut r, 1)?[0] != 0;
        Ok(VersionMessage {
            version,
            services,
            timestamp,
            receiver,
            sender,
            nonce,
            user_agent,
            latest_block,
            relay,
        })
    }
}

/// `verack`: an empty acknowledgement of a peer's `version`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct VerAckMessage;

impl Message for VerAckMessage {
    const COMMAND: &'static [u8; 12] = &COMMAND_VERACK;
    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }
    fn decode(bytes: &[u8]) -> Result<VerAckMessage> {
        if !bytes.is_empty() {
            return Err(Error::MalformedEncoding("verack payload must be empty".into()));
        }
        Ok(VerAckMessage)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PingMessage {
    pub nonce: u64,
}

impl Message for PingMessage {
    const COMMAND: &'static [u8; 12] = &COMMAND_PING;
    fn encode(&self) -> Vec<u8> {
        self.nonce.to_le_bytes().to_vec()
    }
    fn decode(bytes: &[u8]) -> Result<PingMessage> {
        if bytes.len() != 8 {
            return Err(Error::MalformedEncoding("ping payload must be 8 bytes".into()));
        }
        Ok(PingMessage { nonce: u64::from_le_bytes(bytes.try_into().unwrap()) })
    }
}

/// `pong`: echoes the nonce of the `ping` it answers.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PongMessage {
    pub nonce: u64,
}

impl Message for PongMessage {
    const COMMAND: &'static [u8; 12] = &COMMAND_PONG;
    fn encode(&self) -> Vec<u8> {
        self.nonce.to_le_bytes().to_vec()
    }
    fn decode(bytes: &[u8]) -> Result<PongMessage> {
        if bytes.len() != 8 {
            return Err(Error::MalformedEncoding("pong payload must be 8 bytes".into()));
        }
        Ok(PongMessage { nonce: u64::from_le_bytes(bytes.try_into().unwrap()) })
    }
}

/// A request for block headers: a block locator (usually one hash, the
/// caller's current tip) plus a stop hash (`[0; 32]` meaning "as many as the
/// peer will send").
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GetHeadersMessage {
    pub version: u32,
    pub locator_hashes: Vec<[u8; 32]>,
    pub stop_hash: [u8; 32],
}

impl GetHeadersMessage {
    pub fn new(start_hash: [u8; 32]) -> GetHeadersMessage {
        GetHeadersMessage { version: 70015, locator_hashes: vec![start_hash], stop_hash: [0u8; 32] }
    }
}

impl Message for GetHeadersMessage {
    const COMMAND: &'static [u8; 12] = &COMMAND_GETHEADERS;

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&varint::write(self.locator_hashes.len() as u64));
        for hash in &self.locator_hashes {
            let mut wire = *hash;
            wire.reverse();
            out.extend_from_slice(&wire);
        }
        let mut stop_wire = self.stop_hash;
        stop_wire.reverse();
        out.extend_from_slice(&stop_wire);
        out
    }

    fn decode(bytes: &[u8]) -> Result<GetHeadersMessage> {
        let mut r = std::io::Cursor::new(bytes);
        let version = u32::from_le_bytes(read_exact_bytes(&mut r, 4)?.try_into().unwrap());
        let count = varint::read(&mut r).map_err(|_| Error::MalformedEncoding("locator count".into()))?;
        let mut locator_hashes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut hash: [u8; 32] = read_exact_bytes(&mut r, 32)?.try_into().unwrap();
            hash.reverse();
            locator_hashes.push(hash);
        }
        let mut stop_hash: [u8; 32] = read_exact_bytes(&mut r, 32)?.try_into().unwrap();
        stop_hash.reverse();
        Ok(GetHeadersMessage { version, locator_hashes, stop_hash })
    }
}

/// A batch of block headers, each wire entry padded with a mandatory
/// zero transaction count (headers never carry the transactions themselves).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HeadersMessage {
    pub headers: Vec<BlockHeader>,
}

impl Message for HeadersMessage {
    const COMMAND: &'static [u8; 12] = &COMMAND_HEADERS;

    fn encode(&self) -> Vec<u8> {
        let mut out = varint::write(self.headers.len() as u64);
        for header in &self.headers {
            out.extend_from_slice(&header.encode());
            out.extend_from_slice(&varint::write(0));
        }
        out
    }

    fn decode(bytes: &[u8]) -> Result<HeadersMessage> {
        let mut r = std::io::Cursor::new(bytes);
        let count = varint::read(&mut r).map_err(|_| Error::MalformedEncoding("header count".into()))?;
        let mut headers = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let raw = read_exact_bytes(&mut r, 80)?;
            let header = BlockHeader::decode(&raw)?;
            let num_txs = varint::read(&mut r).map_err(|_| Error::MalformedEncoding("tx count".into()))?;
            if num_txs != 0 {
                return Err(Error::MalformedEncoding("headers message carried a non-zero tx count".into()));
            }
            headers.push(header);
        }
        Ok(HeadersMessage { headers })
    }
}

const COMMAND_VERSION: [u8; 12] = *b"version\0\0\0\0\0";
const COMMAND_VERACK: [u8; 12] = *b"verack\0\0\0\0\0\0";
const COMMAND_PING: [u8; 12] = *b"ping\0\0\0\0\0\0\0\0";
const COMMAND_PONG: [u8; 12] = *b"pong\0\0\0\0\0\0\0\0";
const COMMAND_GETHEADERS: [u8; 12] = *b"getheaders\0\0";
const COMMAND_HEADERS: [u8; 12] = *b"headers\0\0\0\0\0";
