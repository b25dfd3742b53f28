// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `iris-core` — the session handshake and heartbeat liveness core of the
//! Iris decentralized messaging substrate.
//!
//! Iris lets applications publish, subscribe, request, and tunnel across a
//! self-organizing peer-to-peer overlay without central brokers. This crate
//! implements the two hardest, tightly coupled subsystems the rest of that
//! stack (Pastry overlay routing, Scribe/Carrier topic multicast, the Iris
//! application/tunnel API, UDP bootstrap discovery) is built on top of:
//!
//! ```text
//! crypto    --> stream --> session::handshake --> session::link
//!                                                       ^
//!                               session::listener/dialer|
//! heart (independent timekeeping primitive, used by session and overlay)
//! ```
//!
//! - [`crypto`]: cyclic-group Diffie-Hellman, RSA signatures, AES-CTR, HMAC,
//!   HKDF — the primitive building blocks.
//! - [`stream`]: length-prefixed framed transport with typed send/recv.
//! - [`session`]: the STS handshake (mutual RSA authentication, forward
//!   secrecy) and the post-handshake encrypted+MAC'd link, plus the
//!   Listener/Dialer TCP bindings that produce [`session::link::Session`]s.
//! - [`heart`]: a periodic liveness monitor shared by the overlay and
//!   carrier layers (out of scope here) for failure detection.
//! - [`config`]: process-wide, programmatically-supplied configuration —
//!   no CLI, no environment variables, no persisted state.
//! - [`error`]: the crate-wide error taxonomy.

pub mod config;
pub mod crypto;
pub mod error;
pub mod heart;
pub mod session;
pub mod stream;

pub use config::Config;
pub use error::{Error, Result};
pub use heart::{Heartbeat, HeartbeatCallback};
pub use session::link::Session;
pub use session::{dialer::dial, listener::Listener};

/// Crate version, re-exported for diagnostics/handshake banners.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
