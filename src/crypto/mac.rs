// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HMAC tag computation and constant-time verification for the session
//! link's encrypt-then-MAC framing.

use crate::crypto::HashAlgorithm;
use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use subtle::ConstantTimeEq;

/// Computes `HMAC_hash(key, data)`.
pub fn tag(key: &[u8], hash: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::Md5 => {
            let mut mac = Hmac::<md5::Md5>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
        HashAlgorithm::Sha256 => {
            let mut mac =
                Hmac::<sha2::Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Verifies `expected_tag` against `HMAC_hash(key, data)` in constant time.
///
/// Returns [`Error::TagInvalid`] on mismatch; never leaks timing
/// information about which byte differed.
pub fn verify(key: &[u8], hash: HashAlgorithm, data: &[u8], expected_tag: &[u8]) -> Result<()> {
    let computed = tag(key, hash, data);
    if computed.len() != expected_tag.len() {
        return Err(Error::TagInvalid);
    }
    if computed.ct_eq(expected_tag).into() {
        Ok(())
    } else {
        Err(Error::TagInvalid)
    }
}
