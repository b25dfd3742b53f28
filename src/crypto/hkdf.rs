// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HKDF extract-then-expand over the STS shared secret, producing the four
//! directional session keys in the fixed order the wire format expects:
//! `K_enc_I→R, K_enc_R→I, K_mac_I→R, K_mac_R→I`.

use crate::config::{HKDF_INFO, HKDF_SALT};
use crate::crypto::{cipher, HashAlgorithm};
use crate::error::{Error, Result};
use hkdf::Hkdf;
use zeroize::Zeroize;

/// The four session keys derived from one STS handshake, in wire order.
pub struct SessionKeys {
    pub enc_initiator_to_responder: Vec<u8>,
    pub enc_responder_to_initiator: Vec<u8>,
    pub mac_initiator_to_responder: Vec<u8>,
    pub mac_responder_to_initiator: Vec<u8>,
}

/// Derives a [`SessionKeys`] block from the raw DH shared secret.
///
/// `mac_key_len` is the output size of the configured HMAC hash (16 bytes
/// for MD5, 32 for SHA-256); each encryption key is always
/// [`cipher::KEY_LEN`] bytes (128-bit AES, pinned by `spec.md`).
pub fn derive_session_keys(
    mut shared_secret: Vec<u8>,
    hash: HashAlgorithm,
    mac_key_len: usize,
) -> Result<SessionKeys> {
    let total_len = 2 * cipher::KEY_LEN + 2 * mac_key_len;

    let mut okm = vec![0u8; total_len];
    match hash {
        HashAlgorithm::Md5 => {
            let hk = Hkdf::<md5::Md5>::new(Some(HKDF_SALT), &shared_secret);
            hk.expand(HKDF_INFO, &mut okm)
                .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;
        }
        HashAlgorithm::Sha256 => {
            let hk = Hkdf::<sha2::Sha256>::new(Some(HKDF_SALT), &shared_secret);
            hk.expand(HKDF_INFO, &mut okm)
                .map_err(|e| Error::KeyDerivationFailed(e.to_string()))?;
        }
    }

    shared_secret.zeroize();

    let mut offset = 0;
    let enc_i2r = okm[offset..offset + cipher::KEY_LEN].to_vec();
    offset += cipher::KEY_LEN;
    let enc_r2i = okm[offset..offset + cipher::KEY_LEN].to_vec();
    offset += cipher::KEY_LEN;
    let mac_i2r = okm[offset..offset + mac_key_len].to_vec();
    offset += mac_key_len;
    let mac_r2i = okm[offset..offset + mac_key_len].to_vec();

    okm.zeroize();

    Ok(SessionKeys {
        enc_initiator_to_responder: enc_i2r,
        enc_responder_to_initiator: enc_r2i,
        mac_initiator_to_responder: mac_i2r,
        mac_responder_to_initiator: mac_r2i,
    })
}
