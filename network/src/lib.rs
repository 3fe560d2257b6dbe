//! satoshi-network: the Bitcoin P2P wire envelope, the handful of messages
//! needed for a handshake and a headers sync, and a blocking single-peer
//! connection driving them.

pub mod envelope;
pub mod error;
pub mod messages;
pub mod node;

pub use envelope::NetworkEnvelope;
pub use error::{Error, Result};
pub use messages::Message;
pub use node::SimpleNode;
