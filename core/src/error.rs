//! Error types for the **satoshi-core** crate.
//!
//! All fallible operations return [`crate::Result`], an alias for
//! `core::result::Result<T, Error>`. Codec errors are raised at the decode
//! boundary; semantic validation failures are surfaced as `bool` from
//! `validate()` rather than through this type, so callers may cheaply
//! inspect many candidate transactions.
//!
//! # Examples
//!
//! ```
//! use satoshi_core::{Error, Result};
//!
//! fn demo_fn(fail: bool) -> Result<()> {
//!     if fail {
//!         Err(Error::ChecksumMismatch)
//!     } else {
//!         Ok(())
//!     }
//! }
//! ```

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A wire byte-stream violated a documented framing rule (bad DER tag,
    /// wrong script body length, wrong envelope magic, wrong header size, ...).
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    /// A decoded point does not satisfy the curve equation.
    #[error("point is not on the curve")]
    InvalidCurvePoint,

    /// A signature or secret-key scalar fell outside `[1, n)`.
    #[error("scalar out of range")]
    OutOfRangeScalar,

    /// A Base58Check address or network envelope checksum did not match.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// A script did not match the canonical P2PKH command shape.
    #[error("script does not match a supported pattern")]
    ScriptUnsupported,

    /// The sighash-type byte was something other than `0x01` (SIGHASH_ALL).
    #[error("unsupported sighash type: {0:#x}")]
    SigHashUnsupported(u8),

    /// The `TxFetcher` collaborator could not retrieve or authenticate a
    /// previous transaction.
    #[error("failed to fetch transaction {txid}: {reason}")]
    FetchError { txid: String, reason: String },
}

/// Convenient result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
