//! satoshi-core: Bitcoin's cryptography and wire formats, built up from
//! first principles: big-integer field arithmetic, secp256k1, SHA-256 and
//! RIPEMD-160, ECDSA, Script, transactions, and block headers.
//!
//! Modules are layered bottom-up: [`field`] and [`hash`] have no crate
//! dependencies; [`curve`] builds on [`field`]; [`keys`] and [`ecdsa`] build
//! on [`curve`] and [`hash`]; [`script`], [`tx`], and [`block`] build on
//! everything below them. [`params`] sits to the side, naming which network
//! the rest of the crate is speaking to.
//!
//! The `serde` feature (off by default) derives `Serialize`/`Deserialize`
//! on the wire-level value types, for callers who want to log or persist
//! them as JSON without pulling that dependency into every build.

pub mod block;
pub mod curve;
pub mod ecdsa;
pub mod error;
pub mod field;
pub mod hash;
pub mod keys;
pub mod params;
pub mod script;
pub mod tx;
pub mod varint;

pub use error::{Error, Result};
pub use params::Net;
