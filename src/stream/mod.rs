// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Framed, typed transport over a reliable byte stream.
//!
//! A raw [`TcpStream`] has no message boundaries; [`Stream`] adds one via
//! [`frame_codec`] and layers a self-describing, field-tolerant encoding on
//! top so a `send` on one side maps to exactly one `recv` on the other, and
//! a `recv` into a struct that dropped or gained fields since the sender was
//! compiled still succeeds (spec.md §4.2, scenario S6).
//!
//! ```text
//! +----------------+-------------------+
//! | Length (4B BE) | serde_json payload |
//! +----------------+-------------------+
//! ```

pub mod frame_codec;

use crate::error::{Error, Result};
use frame_codec::FrameCodec;
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// A framed, typed duplex channel over a [`TcpStream`].
///
/// One `send` maps to exactly one `recv` on the peer; partial frames are
/// never observable. `recv` tolerates struct fields that are missing or
/// extra relative to what the sender encoded, at field granularity.
pub struct Stream {
    socket: TcpStream,
    codec: FrameCodec,
}

impl Stream {
    /// Wraps an already-connected socket.
    pub fn from_socket(socket: TcpStream) -> Result<Self> {
        socket.set_nodelay(true)?;
        Ok(Self {
            socket,
            codec: FrameCodec::with_default_max(),
        })
    }

    /// Opens a TCP connection to `host:port`.
    pub fn dial(host: &str, port: u16) -> Result<Self> {
        let socket = TcpStream::connect((host, port))?;
        Self::from_socket(socket)
    }

    /// Opens a TCP listener on `port`; `accept` yields one [`Stream`] per
    /// inbound connection.
    pub fn listen(port: u16) -> Result<TcpListener> {
        Ok(TcpListener::bind(("0.0.0.0", port))?)
    }

    /// Binds on any address resolvable by `addr` (used by tests to bind an
    /// ephemeral port via `"localhost:0"`).
    pub fn listen_addr<A: ToSocketAddrs>(addr: A) -> Result<TcpListener> {
        Ok(TcpListener::bind(addr)?)
    }

    /// Sets the read/write deadline for subsequent frame operations.
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket.set_read_timeout(timeout)?;
        self.socket.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Serializes `value` with a self-describing encoding, length-prefixes
    /// it, and writes it atomically.
    pub fn send<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| Error::Malformed(format!("encode failed: {e}")))?;
        let frame = FrameCodec::encode(&payload);
        self.socket.write_all(&frame)?;
        self.socket.flush()?;
        Ok(())
    }

    /// Sends a raw byte payload, used for frames whose encoding is already
    /// fixed by the wire format (handshake flights, post-handshake frames)
    /// rather than the self-describing struct encoding.
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<()> {
        let frame = FrameCodec::encode(payload);
        self.socket.write_all(&frame)?;
        self.socket.flush()?;
        Ok(())
    }

    /// Blocks for one complete frame and decodes it into `T`, tolerating
    /// missing or extra fields relative to the sender's shape.
    pub fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        let payload = self.recv_raw()?;
        serde_json::from_slice(&payload).map_err(|e| Error::Malformed(format!("decode failed: {e}")))
    }

    /// Blocks for one complete frame and returns its raw bytes.
    pub fn recv_raw(&mut self) -> Result<Vec<u8>> {
        match self.codec.decode(&mut self.socket) {
            Ok(Some(payload)) => Ok(payload),
            Ok(None) => Err(Error::Timeout("frame read")),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::Timeout("frame read")),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::ConnectionClosed),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(Error::Timeout("frame read")),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Releases the underlying socket.
    pub fn close(&mut self) -> Result<()> {
        let _ = self.socket.shutdown(std::net::Shutdown::Both);
        Ok(())
    }

    /// Borrows the underlying socket, e.g. to clone it for a reader/writer
    /// split or to inspect peer/local addresses.
    pub fn socket(&self) -> &TcpStream {
        &self.socket
    }

    /// Consumes the `Stream`, returning the underlying socket.
    pub fn into_socket(self) -> TcpStream {
        self.socket
    }
}
