// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RSA-PKCS1-v1.5 signing and verification over a pluggable hash.
//!
//! Used to authenticate the handshake transcript in flights 2 and 3 of the
//! STS exchange: each party signs a hash of the DH values it has seen so
//! far with its long-term RSA key.

use crate::crypto::HashAlgorithm;
use crate::error::{Error, Result};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::signature::SignatureEncoding;
use rsa::{RsaPrivateKey, RsaPublicKey};

/// Signs `transcript_hash` (already hashed by `hash`) with `key`, returning
/// the raw PKCS1-v1.5 signature bytes.
pub fn sign(
    key: &RsaPrivateKey,
    hash: HashAlgorithm,
    transcript_hash: &[u8],
) -> Result<Vec<u8>> {
    match hash {
        HashAlgorithm::Md5 => {
            let signing_key = SigningKey::<md5::Md5>::new(key.clone());
            let sig: Signature = signing_key
                .sign_prehash(transcript_hash)
                .map_err(|e| Error::CryptoBackend(e.to_string()))?;
            Ok(sig.to_bytes().to_vec())
        }
        HashAlgorithm::Sha256 => {
            let signing_key = SigningKey::<sha2::Sha256>::new(key.clone());
            let sig: Signature = signing_key
                .sign_prehash(transcript_hash)
                .map_err(|e| Error::CryptoBackend(e.to_string()))?;
            Ok(sig.to_bytes().to_vec())
        }
    }
}

/// Verifies `signature` over `transcript_hash` against `key`, returning
/// [`Error::SignatureInvalid`] on any mismatch.
pub fn verify(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    transcript_hash: &[u8],
    signature: &[u8],
) -> Result<()> {
    let sig = Signature::try_from(signature).map_err(|_| Error::SignatureInvalid)?;
    match hash {
        HashAlgorithm::Md5 => {
            let verifying_key = VerifyingKey::<md5::Md5>::new(key.clone());
            verifying_key
                .verify_prehash(transcript_hash, &sig)
                .map_err(|_| Error::SignatureInvalid)
        }
        HashAlgorithm::Sha256 => {
            let verifying_key = VerifyingKey::<sha2::Sha256>::new(key.clone());
            verifying_key
                .verify_prehash(transcript_hash, &sig)
                .map_err(|_| Error::SignatureInvalid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn test_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        let mut rng = thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 1024).expect("generate test RSA key");
        let public = key.to_public_key();
        (key, public)
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let (private, public) = test_keypair();
        let hash = HashAlgorithm::Md5.digest(b"handshake transcript");
        let sig = sign(&private, HashAlgorithm::Md5, &hash).unwrap();
        assert!(verify(&public, HashAlgorithm::Md5, &hash, &sig).is_ok());
    }

    #[test]
    fn tampered_hash_fails_verification() {
        let (private, public) = test_keypair();
        let hash = HashAlgorithm::Md5.digest(b"handshake transcript");
        let sig = sign(&private, HashAlgorithm::Md5, &hash).unwrap();
        let mut tampered_hash = hash.clone();
        tampered_hash[0] ^= 0xff;
        assert!(verify(&public, HashAlgorithm::Md5, &tampered_hash, &sig).is_err());
    }

    #[test]
    fn wrong_key_fails_verification() {
        let (private, _) = test_keypair();
        let (_, other_public) = test_keypair();
        let hash = HashAlgorithm::Md5.digest(b"handshake transcript");
        let sig = sign(&private, HashAlgorithm::Md5, &hash).unwrap();
        assert!(verify(&other_public, HashAlgorithm::Md5, &hash, &sig).is_err());
    }

    #[test]
    fn sha256_variant_round_trips() {
        let (private, public) = test_keypair();
        let hash = HashAlgorithm::Sha256.digest(b"handshake transcript");
        let sig = sign(&private, HashAlgorithm::Sha256, &hash).unwrap();
        assert!(verify(&public, HashAlgorithm::Sha256, &hash, &sig).is_ok());
    }
}
