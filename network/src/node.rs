//! `SimpleNode`: a blocking, single-connection P2P peer, driving the
//! version/verack handshake over one owned `TcpStream`.

use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};

use satoshi_core::Net;

use crate::envelope::{self, NetworkEnvelope};
use crate::error::Result;
use crate::messages::{Message, PingMessage, PongMessage, VerAckMessage, VersionMessage};

/// Where a `SimpleNode` sits in the version/verack handshake.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandshakeState {
    Connected,
    VersionSent,
    PeerVersionReceived,
    PeerVerAckReceived,
    Ready,
}

/// A single blocking connection to one peer. Not `Sync`: a `SimpleNode` owns
/// its socket outright, and callers serialize access externally if they need
/// to share it.
pub struct SimpleNode {
    stream: TcpStream,
    net: Net,
    state: HandshakeState,
}

impl SimpleNode {
    /// Opens a TCP connection to `addr`. The handshake is not performed
    /// automatically; call `handshake()` once connected.
    pub fn connect(addr: impl ToSocketAddrs, net: Net) -> Result<SimpleNode> {
        let stream = TcpStream::connect(addr)?;
        log::debug!("connected to peer");
        Ok(SimpleNode { stream, net, state: HandshakeState::Connected })
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Sends one message, framed in a `NetworkEnvelope` under `M::COMMAND`.
    pub fn send<M: Message>(&mut self, message: &M) -> Result<()> {
        let envelope = NetworkEnvelope::new(self.net, *M::COMMAND, message.encode());
        envelope::write(&envelope, &mut self.stream)?;
        log::debug!("sent {}", envelope.command_name());
        Ok(())
    }

    /// Reads the next envelope off the wire.
    pub fn read_envelope(&mut self) -> Result<NetworkEnvelope> {
        envelope::read(&mut self.stream, self.net)
    }

    /// Reads envelopes until one whose command matches an entry in
    /// `commands`. Any `ping` seen along the way is transparently answered
    /// with a `pong`; any `version` is transparently answered with a
    /// `verack` (so a caller explicitly waiting for `version` still gets it
    /// returned, after the automatic reply goes out). Every other command is
    /// silently ignored.
    pub fn wait_for(&mut self, commands: &[&[u8; 12]]) -> Result<NetworkEnvelope> {
        loop {
            let envelope = self.read_envelope()?;
            if envelope.command == *PingMessage::COMMAND {
                let ping = PingMessage::decode(&envelope.payload)?;
                log::debug!("replying to ping with pong");
                self.send(&PongMessage { nonce: ping.nonce })?;
                if !commands.contains(&PingMessage::COMMAND) {
                    continue;
                }
            }
            if envelope.command == *VersionMessage::COMMAND {
                log::debug!("peer sent version, replying with verack");
                self.send(&VerAckMessage)?;
                if self.state == HandshakeState::VersionSent {
                    self.state = HandshakeState::PeerVersionReceived;
                }
            }
            if envelope.command == *VerAckMessage::COMMAND
                && self.state == HandshakeState::PeerVersionReceived
            {
                self.state = HandshakeState::PeerVerAckReceived;
            }
            if commands.iter().any(|wanted| **wanted == envelope.command) {
                return Ok(envelope);
            }
        }
    }

    /// Drives `Connected -> VersionSent -> PeerVersionReceived ->
    /// PeerVerAckReceived -> Ready`: sends our own `version`, waits for the
    /// peer's `version` (auto-acking it with our `verack`), then waits for
    /// the peer's own `verack`.
    pub fn handshake(&mut self, timestamp: i64, nonce: u64) -> Result<()> {
        self.send(&VersionMessage::new(timestamp, nonce))?;
        self.state = HandshakeState::VersionSent;
        self.wait_for(&[VersionMessage::COMMAND])?;
        self.wait_for(&[VerAckMessage::COMMAND])?;
        self.state = HandshakeState::Ready;
        log::info!("handshake complete");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.stream.flush()?;
        Ok(())
    }
}
