// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AES-CTR stream cipher used for the handshake payload cipher and the
//! per-direction session link cipher. CTR mode needs no padding and is
//! symmetric: the same function encrypts and decrypts.

use crate::error::{Error, Result};
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

/// CTR-mode AES with a 128-bit key, matching `StsCipherBits` /
/// `SessionCipherBits` pinned at 128 in [`crate::config`].
type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Width of an AES-128 key, in bytes.
pub const KEY_LEN: usize = 16;
/// Width of the CTR initial counter block, in bytes.
pub const IV_LEN: usize = 16;

/// Encrypts or decrypts `data` in place under `key` and `iv`.
///
/// CTR mode is its own inverse: calling this twice with the same key/iv
/// recovers the original plaintext.
pub fn apply_keystream(key: &[u8], iv: &[u8], data: &mut [u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(Error::CryptoBackend(format!(
            "AES-128 key must be {KEY_LEN} bytes, got {}",
            key.len()
        )));
    }
    if iv.len() != IV_LEN {
        return Err(Error::CryptoBackend(format!(
            "AES-CTR IV must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }
    let mut cipher = Aes128Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(data);
    Ok(())
}

/// Encrypts `plaintext` under `key` and `iv`, returning a new buffer.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buf = plaintext.to_vec();
    apply_keystream(key, iv, &mut buf)?;
    Ok(buf)
}

/// Decrypts `ciphertext` under `key` and `iv`, returning a new buffer.
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    encrypt(key, iv, ciphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = [0x42u8; KEY_LEN];
        let iv = [0x01u8; IV_LEN];
        let plaintext = b"sts handshake payload";
        let ciphertext = encrypt(&key, &iv, plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let recovered = decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn rejects_wrong_key_length() {
        let key = [0u8; 8];
        let iv = [0u8; IV_LEN];
        assert!(encrypt(&key, &iv, b"data").is_err());
    }

    #[test]
    fn rejects_wrong_iv_length() {
        let key = [0u8; KEY_LEN];
        let iv = [0u8; 4];
        assert!(encrypt(&key, &iv, b"data").is_err());
    }

    #[test]
    fn different_ivs_produce_different_ciphertexts() {
        let key = [0x7eu8; KEY_LEN];
        let plaintext = b"same plaintext bytes";
        let c1 = encrypt(&key, &[0u8; IV_LEN], plaintext).unwrap();
        let c2 = encrypt(&key, &[1u8; IV_LEN], plaintext).unwrap();
        assert_ne!(c1, c2);
    }
}
