// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type.
//!
//! `iris-core` hand-rolls its error enum rather than pulling in a derive
//! crate: every variant is a distinct failure a caller may want to match on,
//! grouped by the taxonomy the protocol defines (transport, protocol,
//! crypto, auth, integrity, timeout, state).

use std::fmt;

/// Unified error type returned by every fallible `iris-core` operation.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Transport errors
    // ========================================================================
    /// Underlying I/O failure (socket read/write/accept/connect).
    Io(std::io::Error),
    /// The peer closed the connection mid-operation.
    ConnectionClosed,

    // ========================================================================
    // Protocol errors
    // ========================================================================
    /// Peer's protocol version does not match ours.
    VersionMismatch { ours: String, theirs: String },
    /// A frame could not be decoded into the expected shape.
    Malformed(String),
    /// A handshake message arrived out of order for the current state.
    UnexpectedMessage(&'static str),

    // ========================================================================
    // Crypto errors
    // ========================================================================
    /// A Diffie-Hellman value failed range or subgroup validation.
    InvalidGroupElement,
    /// Key derivation failed (short input, bad parameters).
    KeyDerivationFailed(String),
    /// Signature or cipher construction failed at the primitive layer.
    CryptoBackend(String),

    // ========================================================================
    // Auth errors
    // ========================================================================
    /// RSA signature verification failed.
    SignatureInvalid,
    /// Transcript hash computed locally does not match the peer's.
    TranscriptMismatch,

    // ========================================================================
    // Integrity errors
    // ========================================================================
    /// HMAC tag verification failed on a received frame.
    TagInvalid,

    // ========================================================================
    // Timeout errors
    // ========================================================================
    /// An operation exceeded its configured deadline.
    Timeout(&'static str),

    // ========================================================================
    // State errors
    // ========================================================================
    /// An operation was requested in a state that forbids it
    /// (double `Start`, `Ping` on an unmonitored entity, etc).
    InvalidState(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Transport
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::ConnectionClosed => write!(f, "connection closed by peer"),
            // Protocol
            Error::VersionMismatch { ours, theirs } => {
                write!(f, "protocol version mismatch: ours={ours} theirs={theirs}")
            }
            Error::Malformed(msg) => write!(f, "malformed frame: {msg}"),
            Error::UnexpectedMessage(what) => write!(f, "unexpected message: {what}"),
            // Crypto
            Error::InvalidGroupElement => write!(f, "DH value failed range or subgroup check"),
            Error::KeyDerivationFailed(msg) => write!(f, "key derivation failed: {msg}"),
            Error::CryptoBackend(msg) => write!(f, "crypto backend error: {msg}"),
            // Auth
            Error::SignatureInvalid => write!(f, "signature verification failed"),
            Error::TranscriptMismatch => write!(f, "handshake transcript hash mismatch"),
            // Integrity
            Error::TagInvalid => write!(f, "MAC tag verification failed"),
            // Timeout
            Error::Timeout(what) => write!(f, "timed out waiting for {what}"),
            // State
            Error::InvalidState(msg) => write!(f, "invalid state: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for `iris-core` results.
pub type Result<T> = core::result::Result<T, Error>;
