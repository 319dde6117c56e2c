//! A streaming implementation of OCB authenticated encryption, specified in
//! [RFC 7253][1], generic over any 128-bit block cipher.
//!
//! The core type is [`OcbSession`]: a mutable session that absorbs
//! associated data and message bytes in arbitrary chunkings, buffers partial
//! blocks across calls, and finalizes into an authentication tag (appended
//! when encrypting, verified in constant time when decrypting). A session
//! can be re-initialized per message, keeping the key-dependent offset
//! ladder and the nonce `Ktop` cache warm across an incrementing-nonce
//! sequence.
//!
//! [`Ocb`] layers the conventional one-shot [`aead::AeadInPlace`] interface
//! on top, with the 96-bit-nonce, 128-bit-tag parameters used by the RFC's
//! test vectors.
//!
//! [1]: https://datatracker.ietf.org/doc/rfc7253/

pub mod aead_impl;
pub mod session;
mod util;

pub use aead_impl::{Aes128Ocb, Ocb};
pub use session::{Direction, OcbSession};

use core::fmt;

/// Failure modes surfaced by a session.
///
/// A session is left in an unspecified state by any error and must be
/// re-initialized or reset before further use.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error {
    /// Tag length outside 32..=128 bits, or not a whole number of bytes.
    InvalidTagLength,
    /// Nonce empty, or 16 bytes and longer.
    InvalidNonce,
    /// Caller-provided output buffer shorter than the promised size.
    BufferTooSmall,
    /// Decryption finalized with fewer buffered bytes than the tag length.
    DataTooShort,
    /// Tag mismatch; all plaintext produced by the session must be discarded.
    AuthenticationFailed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidTagLength => write!(f, "invalid tag length"),
            Error::InvalidNonce => write!(f, "invalid nonce length"),
            Error::BufferTooSmall => write!(f, "output buffer too small"),
            Error::DataTooShort => write!(f, "input too short to hold a tag"),
            Error::AuthenticationFailed => write!(f, "authentication failed"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
