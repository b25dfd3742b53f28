// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide configuration for the STS handshake and session link.
//!
//! There is no CLI, no environment variable parsing, and no persisted state
//! here: the embedding application constructs a [`Config`] (or uses
//! [`Config::pinned`]) and passes it to [`crate::session`] and
//! [`crate::heart`] explicitly.

use crate::crypto::HashAlgorithm;
use std::time::Duration;

/// The STS cyclic group modulus (2248-bit safe prime), big-endian.
///
/// Pinned so wire traces stay byte-compatible with the reference protocol
/// this crate reproduces; regenerating a fresh group is a development-time
/// operation, see [`crate::crypto::cyclic::Group::generate`].
pub const STS_GROUP_MODULUS: [u8; 281] = [
    0xdc, 0x28, 0x29, 0xab, 0xca, 0xc5, 0x7d, 0x0d, 0xf7, 0x44, 0xa4, 0x9a, 0x42, 0x7e, 0x5b, 0xe9,
    0xa7, 0xf8, 0xd3, 0x3f, 0x87, 0x01, 0xfa, 0x37, 0x3d, 0xfe, 0x1b, 0x31, 0xec, 0x03, 0x48, 0x9f,
    0x77, 0xe3, 0x2f, 0xc1, 0x8b, 0xc2, 0x3a, 0xa5, 0x95, 0x2f, 0x19, 0x04, 0x76, 0xba, 0xe7, 0xef,
    0xeb, 0x80, 0xd7, 0xf8, 0x72, 0xca, 0x34, 0xfe, 0x88, 0xb5, 0x28, 0x0e, 0x41, 0x33, 0x16, 0x8d,
    0xee, 0x27, 0x4b, 0x0a, 0xf1, 0x9e, 0xfa, 0xe4, 0xf0, 0xed, 0x86, 0x22, 0x8d, 0xd8, 0xa3, 0x9f,
    0x61, 0xd8, 0xaf, 0x77, 0xb1, 0x9d, 0xf8, 0x2d, 0x3b, 0x5d, 0x3f, 0x49, 0xb4, 0xe3, 0x9c, 0xb8,
    0xeb, 0xa5, 0x32, 0xf4, 0xa8, 0xf9, 0x48, 0x5b, 0x6d, 0xac, 0xee, 0x4e, 0xd5, 0xe6, 0x81, 0x1e,
    0xfd, 0x60, 0x43, 0x28, 0xd3, 0x4b, 0xd8, 0xca, 0x52, 0xf7, 0x3f, 0x5e, 0xfc, 0x80, 0x11, 0x9d,
    0x74, 0x58, 0x8c, 0x83, 0x1f, 0x0f, 0x1e, 0x0e, 0xd6, 0x0e, 0xe8, 0xc5, 0x72, 0x1d, 0x8f, 0x0e,
    0x4e, 0x14, 0x45, 0xfa, 0x46, 0x1e, 0xa9, 0xf8, 0x67, 0xd8, 0x02, 0xfa, 0x88, 0x35, 0xe5, 0x39,
    0xf9, 0xa6, 0x09, 0xba, 0xda, 0x7f, 0x78, 0x72, 0x0b, 0x14, 0xd1, 0xef, 0xff, 0x70, 0xfd, 0x05,
    0x62, 0x7c, 0x93, 0xde, 0x22, 0x17, 0x8f, 0xe1, 0xab, 0x37, 0x9c, 0xc5, 0xa4, 0xab, 0x10, 0x4c,
    0x1d, 0xf0, 0xc3, 0xa7, 0xd3, 0xad, 0x9f, 0x97, 0xd9, 0xea, 0xd9, 0xe4, 0x1a, 0xbd, 0xfe, 0x84,
    0x9b, 0x72, 0xec, 0x27, 0xf3, 0xd5, 0x83, 0x39, 0x70, 0x19, 0x23, 0xcc, 0xd9, 0x51, 0x1e, 0xb2,
    0x9d, 0x3f, 0x38, 0x64, 0x04, 0x36, 0x13, 0xcc, 0xbc, 0xb8, 0x62, 0xcb, 0x1e, 0xbf, 0x30, 0x08,
    0x2f, 0xe5, 0xca, 0xdc, 0x8a, 0xb5, 0xd7, 0x91, 0x0f, 0x60, 0x99, 0x1d, 0x0b, 0x3a, 0x70, 0x16,
    0x59, 0x42, 0x4a, 0x5d, 0xde, 0x5d, 0x10, 0x5b, 0xbc, 0x30, 0x60, 0xb9, 0x59, 0x37, 0xf2, 0xe8,
    0x50, 0xa3, 0x68, 0x02, 0x15, 0x27, 0xc4, 0xee, 0x53,
];

/// The STS cyclic group generator (order-`q` subgroup element), big-endian.
pub const STS_GROUP_GENERATOR: [u8; 281] = [
    0x09, 0x50, 0x1e, 0x53, 0xeb, 0xce, 0xd4, 0xc8, 0x05, 0x0d, 0x76, 0x90, 0xee, 0xf5, 0x48, 0x06,
    0x18, 0xca, 0xd2, 0x9e, 0x75, 0x37, 0x9d, 0x0b, 0x7f, 0x6f, 0x47, 0xe0, 0xe9, 0xe8, 0xd1, 0xd0,
    0x16, 0xbd, 0xf1, 0xa8, 0xc2, 0x73, 0x19, 0x93, 0xa4, 0xf3, 0x42, 0x58, 0x8c, 0x4e, 0x7b, 0x8b,
    0x62, 0xa5, 0x23, 0xc1, 0xe6, 0xec, 0x89, 0xa5, 0xdc, 0x49, 0xa4, 0xcd, 0xb7, 0x54, 0xfc, 0xba,
    0x32, 0xef, 0x14, 0x16, 0xc3, 0x3b, 0xb0, 0xcc, 0xfc, 0xe4, 0x81, 0xd2, 0x3d, 0x16, 0x79, 0x3a,
    0x46, 0xaf, 0x1e, 0xd3, 0x2a, 0x97, 0x7a, 0xb4, 0xfa, 0x91, 0x0f, 0x64, 0x8b, 0x56, 0x65, 0xce,
    0xe0, 0x97, 0x09, 0xf6, 0xf0, 0x91, 0x26, 0x63, 0xa2, 0x27, 0xd0, 0x15, 0xf2, 0xd0, 0x56, 0x4b,
    0x08, 0xcc, 0xeb, 0x4e, 0x84, 0xba, 0xdb, 0x33, 0x17, 0x2b, 0xe9, 0xbb, 0xfa, 0xa4, 0x50, 0xb7,
    0x80, 0x9d, 0xd6, 0x96, 0xb2, 0xfc, 0xcb, 0x5c, 0x35, 0xee, 0xa7, 0x3a, 0x2a, 0xd5, 0x0d, 0xeb,
    0x3d, 0xbb, 0xde, 0x21, 0x2a, 0x39, 0xfa, 0x2a, 0x55, 0x4b, 0xf4, 0x8e, 0x8e, 0x99, 0xca, 0xae,
    0x44, 0x72, 0x55, 0x90, 0xb9, 0xe4, 0xc6, 0x8b, 0x14, 0x2d, 0xf7, 0x3e, 0x77, 0xf3, 0x7b, 0x2f,
    0xcc, 0x69, 0xb1, 0x2c, 0xb6, 0x2c, 0xba, 0x46, 0x47, 0xa7, 0xc3, 0x2f, 0xbf, 0x37, 0xe7, 0x80,
    0x4d, 0xe9, 0x0e, 0x92, 0xc9, 0x57, 0x08, 0x8a, 0x0a, 0x37, 0x6f, 0xde, 0xf8, 0xa7, 0xf9, 0xa3,
    0x3a, 0xdf, 0x45, 0x0d, 0x3c, 0xde, 0xbe, 0x3a, 0x14, 0x8e, 0xd2, 0x3b, 0xfc, 0x20, 0xfd, 0xf9,
    0xe6, 0x3d, 0x43, 0x5a, 0xb8, 0x4d, 0xef, 0xf4, 0x23, 0x02, 0x77, 0x9d, 0x3a, 0xfa, 0xba, 0xee,
    0x97, 0xbe, 0x15, 0x94, 0xcc, 0xa3, 0x69, 0x0b, 0x6c, 0x95, 0xcc, 0x5c, 0xb2, 0x40, 0x40, 0x1d,
    0x7e, 0xa7, 0x9a, 0xe5, 0x4e, 0x76, 0x92, 0xd1, 0x3d, 0x91, 0x9e, 0x24, 0xde, 0xbb, 0x03, 0x8d,
    0x71, 0x7f, 0x1d, 0xbb, 0xe5, 0xd9, 0x78, 0xbb, 0x96,
];

/// Salt for the session HKDF key-extract step.
pub const HKDF_SALT: &[u8] = b"iris.proto.session.hkdf.salt";

/// Info string for the session HKDF key-expand step.
pub const HKDF_INFO: &[u8] = b"iris.proto.session.hkdf.info";

/// Protocol version string exchanged as the first field of flight 1.
pub const PROTOCOL_VERSION: &str = "v0.1-pre";

/// Bootstrap UDP port set. Pinned for the (unimplemented) discovery layer.
pub const BOOT_PORTS: [u16; 6] = [14142, 27182, 31415, 45654, 22222, 33333];

/// Heartbeat period used by the (unimplemented) Pastry overlay layer, ms.
pub const OVERLAY_BEAT_PERIOD_MS: u64 = 10_000;

/// Heartbeat period used by the (unimplemented) Scribe/Carrier layer, ms.
pub const CARRIER_BEAT_PERIOD_MS: u64 = 500;

/// Miss count used by the (unimplemented) Scribe/Carrier layer.
pub const CARRIER_KILL_COUNT: u32 = 3;

/// Send/receive window used by the (unimplemented) Iris tunnel layer.
pub const IRIS_TUNNEL_WINDOW: u32 = 256;

/// Ack timeout used by the (unimplemented) Iris tunnel layer, ms.
pub const IRIS_TUNNEL_TIMEOUT_MS: u64 = 3000;

/// Handshake and session timeouts, cipher/hash selection, and protocol
/// version. Grouped the way `transport::tcp::config::TcpConfig` groups its
/// fields, with an `impl Default` mirroring the pinned reference values.
#[derive(Debug, Clone)]
pub struct Config {
    // === Cryptographic primitives ===
    /// Hash used for the RSA signature over the handshake transcript.
    pub sts_sig_hash: HashAlgorithm,
    /// Hash used inside HKDF for session key derivation.
    pub hkdf_hash: HashAlgorithm,
    /// Hash used for the session link HMAC.
    pub session_hash: HashAlgorithm,
    /// AES key size in bits for both the handshake payload cipher and the
    /// session link cipher.
    pub cipher_bits: u32,

    // === Protocol ===
    /// Version string exchanged in flight 1; mismatches are a `ProtocolError`.
    pub protocol_version: String,

    // === Timeouts ===
    /// Deadline for establishing the TCP connection as the dialer.
    pub session_dial_timeout: Duration,
    /// Deadline for accepting a pending connection as the listener.
    pub session_accept_timeout: Duration,
    /// Deadline for the full 4-flight handshake to complete.
    pub session_shake_timeout: Duration,
    /// Per-frame read/write deadline on an established session link.
    pub session_link_timeout: Duration,
    /// Deadline to wait for the peer's close acknowledgement.
    pub session_grace_timeout: Duration,
}

impl Config {
    /// The exact configuration of the reference implementation this crate
    /// reproduces: MD5 signature/HMAC hash, 128-bit AES, protocol `v0.1-pre`.
    ///
    /// Kept distinct from [`Config::default`] so callers who want a stronger
    /// hash must opt in explicitly rather than silently downgrading wire
    /// compatibility.
    pub fn pinned() -> Self {
        Self {
            sts_sig_hash: HashAlgorithm::Md5,
            hkdf_hash: HashAlgorithm::Md5,
            session_hash: HashAlgorithm::Md5,
            cipher_bits: 128,
            protocol_version: PROTOCOL_VERSION.to_string(),
            session_dial_timeout: Duration::from_secs(1),
            session_accept_timeout: Duration::from_secs(1),
            session_shake_timeout: Duration::from_secs(3),
            session_link_timeout: Duration::from_secs(30),
            session_grace_timeout: Duration::from_secs(3),
        }
    }

    /// Returns the pinned STS cyclic group.
    pub fn sts_group(&self) -> crate::crypto::cyclic::Group {
        crate::crypto::cyclic::Group::pinned()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::pinned()
    }
}
