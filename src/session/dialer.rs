// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Dial` — the initiator side of establishing a [`Session`].
//!
//! Unlike [`crate::session::listener::Listener`], which runs a dedicated
//! accept thread and delivers completed sessions asynchronously, `Dial` runs
//! the initiator state machine inline on the caller's thread: there is no
//! concurrent fan-in to manage on the dialing side, so no extra thread is
//! warranted (spec.md §4.6, §5).

use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::handshake;
use crate::session::link::{Role, Session};
use crate::stream::Stream;
use log::debug;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::net::{TcpStream, ToSocketAddrs};

/// Opens a TCP connection to `host:port` within `config.session_dial_timeout`,
/// then runs the STS handshake as initiator against the peer's known public
/// key `peer_public_key`, authenticating with `own_key`. Returns the
/// established [`Session`] or an error; any failure closes the underlying
/// socket.
pub fn dial(
    host: &str,
    port: u16,
    own_key: &RsaPrivateKey,
    peer_public_key: &RsaPublicKey,
    config: &Config,
) -> Result<Session> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::Malformed(format!("could not resolve {host}:{port}")))?;

    let socket = TcpStream::connect_timeout(&addr, config.session_dial_timeout)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                Error::Timeout("dial")
            } else {
                Error::Io(e)
            }
        })?;
    debug!("dialed {host}:{port}, starting STS handshake as initiator");

    let mut stream = Stream::from_socket(socket)?;
    let keys = match handshake::run_initiator(&mut stream, config, own_key, peer_public_key) {
        Ok(keys) => keys,
        Err(e) => {
            let _ = stream.close();
            return Err(e);
        }
    };

    debug!("handshake established with {host}:{port}");
    Ok(Session::new(stream, Role::Initiator, &keys, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::listener::Listener;
    use rand::thread_rng;

    #[test]
    fn dial_fails_fast_against_a_closed_port() {
        let config = Config::pinned();
        let key = RsaPrivateKey::new(&mut thread_rng(), 1024).unwrap();
        let public = key.to_public_key();
        // Port 0 on connect resolves to an invalid target; a closed port in
        // the ephemeral range is a more realistic "connection refused" test.
        let result = dial("localhost", 1, &key, &public, &config);
        assert!(result.is_err());
    }

    #[test]
    fn dial_against_a_listener_establishes_a_session() {
        let key = RsaPrivateKey::new(&mut thread_rng(), 1024).unwrap();
        let public = key.to_public_key();
        let config = Config::pinned();

        let listener = Listener::bind("localhost:0", key.clone(), public.clone(), config.clone())
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        listener.accept(std::time::Duration::from_millis(10));

        let mut client = dial("localhost", port, &key, &public, &config).unwrap();
        let mut server = listener
            .sink()
            .recv_timeout(std::time::Duration::from_millis(200))
            .unwrap();

        client.send(b"ping").unwrap();
        assert_eq!(server.recv().unwrap(), b"ping");

        client.close().unwrap();
        server.close().unwrap();
        listener.close().unwrap();
    }
}
