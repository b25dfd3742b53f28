// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cryptographic primitives backing the STS handshake and session link.
//!
//! Each submodule wraps one primitive family behind a small, spec-shaped
//! API: [`cyclic`] for the Diffie-Hellman group, [`signature`] for RSA
//! transcript signing, [`cipher`] for AES-CTR, [`mac`] for HMAC, and
//! [`hkdf`] for session key derivation.

pub mod cipher;
pub mod cyclic;
pub mod hkdf;
pub mod mac;
pub mod signature;

use digest::Digest;

/// Selects the hash used by a given primitive (signature, HKDF, or HMAC).
///
/// Modeled as a runtime enum rather than a generic type parameter so
/// [`crate::config::Config`] can swap the pinned MD5 default for a stronger
/// hash without forcing every call site to become generic. MD5 remains the
/// default for wire compatibility with the reference protocol; callers who
/// want a different hash must set it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// MD5, pinned by the reference protocol. Cryptographically broken for
    /// collision resistance but retained here only for wire compatibility,
    /// per `spec.md`'s explicit note that hash agility must stay swappable
    /// rather than silently substituted.
    Md5,
    /// SHA-256, offered as the non-pinned alternative.
    Sha256,
}

impl HashAlgorithm {
    /// Output size of this hash, in bytes.
    pub fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Sha256 => 32,
        }
    }

    /// Computes the digest of `data` using this hash.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5 => md5::Md5::digest(data).to_vec(),
            HashAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_sizes() {
        assert_eq!(HashAlgorithm::Md5.output_size(), 16);
        assert_eq!(HashAlgorithm::Sha256.output_size(), 32);
    }

    #[test]
    fn digest_matches_output_size() {
        assert_eq!(HashAlgorithm::Md5.digest(b"iris").len(), 16);
        assert_eq!(HashAlgorithm::Sha256.digest(b"iris").len(), 32);
    }
}
