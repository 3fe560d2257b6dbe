//! Error type for the **satoshi-network** crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("envelope checksum mismatch")]
    ChecksumMismatch,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] satoshi_core::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
