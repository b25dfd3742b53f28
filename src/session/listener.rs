// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `Listen`/`Accept` — the responder side of establishing [`Session`]s.
//!
//! Grounded on `transport::tcp::io_thread`'s dedicated-I/O-thread pattern,
//! simplified from `mio`'s non-blocking poll loop to a blocking
//! `TcpListener::incoming()` loop: each in-progress handshake gets its own
//! thread rather than being multiplexed onto one reactor, matching spec.md
//! §5's "dispatcher per Listener plus an independent task per in-progress
//! handshake." Completed sessions are delivered on a bounded
//! `crossbeam_channel` `Sink`; when it is full, a newly completed handshake
//! blocks up to `SessionAcceptTimeout` and is then dropped with its socket
//! closed (spec.md §5 back-pressure contract).

use crate::config::Config;
use crate::error::Result;
use crate::session::handshake;
use crate::session::link::{Role, Session};
use crate::stream::Stream;
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Depth of the bounded channel completed sessions are delivered on.
const SINK_CAPACITY: usize = 16;

/// Owns a TCP accept socket and a bounded FIFO of completed [`Session`]s.
/// Sessions delivered on [`Listener::sink`] have already completed the STS
/// handshake and are ready for application use.
pub struct Listener {
    local_addr: SocketAddr,
    sink_tx: Sender<Session>,
    sink_rx: Receiver<Session>,
    quit: Arc<AtomicBool>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
    own_key: RsaPrivateKey,
    peer_public_key: RsaPublicKey,
    config: Config,
    tcp: Option<TcpListener>,
}

impl Listener {
    /// Binds a TCP accept socket on `addr`. The accept loop does not start
    /// until [`Listener::accept`] is called.
    pub fn bind<A: ToSocketAddrs>(
        addr: A,
        own_key: RsaPrivateKey,
        peer_public_key: RsaPublicKey,
        config: Config,
    ) -> Result<Self> {
        let tcp = TcpListener::bind(addr)?;
        let local_addr = tcp.local_addr()?;
        let (sink_tx, sink_rx) = channel::bounded(SINK_CAPACITY);
        Ok(Self {
            local_addr,
            sink_tx,
            sink_rx,
            quit: Arc::new(AtomicBool::new(false)),
            accept_thread: Mutex::new(None),
            own_key,
            peer_public_key,
            config,
            tcp: Some(tcp),
        })
    }

    /// The bound local address (useful to recover an ephemeral port).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.local_addr)
    }

    /// The channel completed, handshaken [`Session`]s are delivered on.
    pub fn sink(&self) -> &Receiver<Session> {
        &self.sink_rx
    }

    /// Begins the background accept loop, polling for new connections every
    /// `quantum`. One-shot: calling this twice has no additional effect
    /// beyond the first call.
    pub fn accept(&self, quantum: Duration) {
        let Some(tcp) = self.tcp_clone() else {
            return;
        };
        let _ = tcp.set_nonblocking(true);
        let quit = Arc::clone(&self.quit);
        let sink_tx = self.sink_tx.clone();
        let own_key = self.own_key.clone();
        let peer_public_key = self.peer_public_key.clone();
        let config = self.config.clone();

        let handle = thread::Builder::new()
            .name("iris-session-accept".into())
            .spawn(move || accept_loop(tcp, quit, sink_tx, own_key, peer_public_key, config, quantum))
            .expect("failed to spawn session accept thread");
        *self.accept_thread.lock() = Some(handle);
    }

    fn tcp_clone(&self) -> Option<TcpListener> {
        self.tcp.as_ref().and_then(|l| l.try_clone().ok())
    }

    /// Stops accepting new connections and waits for the accept thread to
    /// exit. In-flight handshakes are left to run out their own
    /// `SessionShakeTimeout` rather than being forcibly cancelled (this
    /// listener has no per-handshake cancellation handle); any that do
    /// complete afterward simply find the sink's channel closed on the next
    /// send and their socket is dropped. Idempotent.
    pub fn close(&self) -> Result<()> {
        self.quit.store(true, Ordering::Release);
        if let Some(handle) = self.accept_thread.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.quit.store(true, Ordering::Release);
        if let Some(handle) = self.accept_thread.lock().take() {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn accept_loop(
    tcp: TcpListener,
    quit: Arc<AtomicBool>,
    sink_tx: Sender<Session>,
    own_key: RsaPrivateKey,
    peer_public_key: RsaPublicKey,
    config: Config,
    quantum: Duration,
) {
    debug!("session listener accepting on {:?}", tcp.local_addr());
    while !quit.load(Ordering::Acquire) {
        match tcp.accept() {
            Ok((socket, peer_addr)) => {
                debug!("accepted connection from {peer_addr}");
                let sink_tx = sink_tx.clone();
                let own_key = own_key.clone();
                let peer_public_key = peer_public_key.clone();
                let config = config.clone();
                let accept_timeout = config.session_accept_timeout;
                thread::spawn(move || {
                    handle_inbound(socket, own_key, peer_public_key, config, sink_tx, accept_timeout)
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(quantum);
            }
            Err(e) => {
                warn!("session listener accept error: {e}");
                thread::sleep(quantum);
            }
        }
    }
    debug!("session listener accept loop stopped");
}

fn handle_inbound(
    socket: std::net::TcpStream,
    own_key: RsaPrivateKey,
    peer_public_key: RsaPublicKey,
    config: Config,
    sink_tx: Sender<Session>,
    accept_timeout: Duration,
) {
    let mut stream = match Stream::from_socket(socket) {
        Ok(s) => s,
        Err(e) => {
            warn!("failed to wrap inbound socket: {e}");
            return;
        }
    };

    let keys = match handshake::run_responder(&mut stream, &config, &own_key, &peer_public_key) {
        Ok(keys) => keys,
        Err(e) => {
            warn!("inbound handshake failed: {e}");
            let _ = stream.close();
            return;
        }
    };

    let session = Session::new(stream, Role::Responder, &keys, &config);
    if sink_tx.send_timeout(session, accept_timeout).is_err() {
        warn!("session sink full or closed, dropping completed handshake");
    }
}
