// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::unreadable_literal)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

//! End-to-end STS handshake scenarios (spec invariants 1, 4, 5 and
//! scenarios S1, S2).

use iris_core::config::Config;
use iris_core::crypto::cyclic::Group;
use iris_core::session::dialer::dial;
use iris_core::session::listener::Listener;
use num_bigint::BigUint;
use rand::thread_rng;
use rsa::RsaPrivateKey;
use std::time::Duration;

fn fresh_rsa_keypair() -> (RsaPrivateKey, rsa::RsaPublicKey) {
    let key = RsaPrivateKey::new(&mut thread_rng(), 2048).expect("generate RSA-2048 key");
    let public = key.to_public_key();
    (key, public)
}

/// S1: three dial/accept round trips over the same listener, each pair of
/// Sessions closing cleanly.
#[test]
fn three_dial_accept_round_trips_close_cleanly() {
    let (key, public) = fresh_rsa_keypair();
    let config = Config::pinned();

    let listener = Listener::bind("localhost:0", key.clone(), public.clone(), config.clone())
        .expect("bind listener");
    let port = listener.local_addr().unwrap().port();
    listener.accept(Duration::from_millis(5));

    for _ in 0..3 {
        let mut client = dial("localhost", port, &key, &public, &config).expect("dial");
        let mut server = listener
            .sink()
            .recv_timeout(Duration::from_millis(500))
            .expect("accepted session");

        // Invariant 1: both sides derive usable, matching session keys —
        // exercised indirectly by a successful round trip in both directions.
        client.send(b"ping").unwrap();
        assert_eq!(server.recv().unwrap(), b"ping");
        server.send(b"pong").unwrap();
        assert_eq!(client.recv().unwrap(), b"pong");

        client.close().expect("client close");
        server.close().expect("server close");
    }

    listener.close().unwrap();
}

/// S2: a protocol version mismatch fails the handshake on both sides and
/// produces no Session.
#[test]
fn version_mismatch_rejects_the_handshake() {
    let (key, public) = fresh_rsa_keypair();

    let mut responder_config = Config::pinned();
    responder_config.protocol_version = "v0.1-pre".to_string();
    let mut initiator_config = Config::pinned();
    initiator_config.protocol_version = "v0.2".to_string();

    let listener = Listener::bind(
        "localhost:0",
        key.clone(),
        public.clone(),
        responder_config,
    )
    .expect("bind listener");
    let port = listener.local_addr().unwrap().port();
    listener.accept(Duration::from_millis(5));

    let result = dial("localhost", port, &key, &public, &initiator_config);
    assert!(result.is_err(), "mismatched version must fail the dial");

    let accepted = listener.sink().recv_timeout(Duration::from_millis(300));
    assert!(
        accepted.is_err(),
        "no session should reach the sink after a version mismatch"
    );

    listener.close().unwrap();
}

/// Invariant 5: DH public values outside `[2, P-2]` are rejected by the
/// cyclic group's validation, independent of the wire handshake.
#[test]
fn out_of_range_dh_values_are_rejected() {
    let group = Group::pinned();
    let keypair = group.generate_keypair(&mut thread_rng());

    for bad in [
        BigUint::from(0u32),
        BigUint::from(1u32),
        group.modulus().clone(),
        group.modulus().clone() - BigUint::from(1u32),
    ] {
        assert!(group.validate(&bad).is_err(), "{bad} should be rejected");
        assert!(group.shared_secret(&keypair, &bad).is_err());
    }
}
