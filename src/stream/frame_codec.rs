// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefix framing codec for the Stream transport.
//!
//! A TCP byte stream has no message boundaries; this codec adds one:
//!
//! ```text
//! +----------------+-------------------+
//! | Length (4B BE) | Payload           |
//! +----------------+-------------------+
//! ```
//!
//! One `encode` maps to exactly one `decode`, and no partial frame is ever
//! observable by a caller — `decode` only returns once a complete frame has
//! arrived.

use std::io::{self, Read};

/// Frame header size (4 bytes for length).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Default maximum message size (16 MB), an anti-OOM bound against a
/// corrupt or hostile length prefix.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Incremental length-prefix codec for a single stream direction.
#[derive(Debug)]
pub struct FrameCodec {
    state: ReadState,
    buffer: Vec<u8>,
    max_size: usize,
    frames_decoded: u64,
    bytes_decoded: u64,
    frames_rejected: u64,
}

#[derive(Debug, Clone, Copy)]
enum ReadState {
    ReadingLength { bytes_read: usize },
    ReadingBody { expected_len: usize, bytes_read: usize },
}

impl Default for ReadState {
    fn default() -> Self {
        ReadState::ReadingLength { bytes_read: 0 }
    }
}

impl FrameCodec {
    /// Creates a codec with the given maximum frame size.
    pub fn new(max_size: usize) -> Self {
        Self {
            state: ReadState::default(),
            buffer: vec![0u8; FRAME_HEADER_SIZE],
            max_size,
            frames_decoded: 0,
            bytes_decoded: 0,
            frames_rejected: 0,
        }
    }

    /// Creates a codec with [`DEFAULT_MAX_MESSAGE_SIZE`].
    pub fn with_default_max() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    pub fn bytes_decoded(&self) -> u64 {
        self.bytes_decoded
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    /// Resets read state, e.g. after a connection reset.
    pub fn reset(&mut self) {
        self.state = ReadState::default();
        self.buffer.resize(FRAME_HEADER_SIZE, 0);
    }

    /// Encodes `payload` as `[length: u32 BE][payload]`.
    pub fn encode(payload: &[u8]) -> Vec<u8> {
        let len = payload.len() as u32;
        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Appends an encoded frame for `payload` to `buf`.
    pub fn encode_into(payload: &[u8], buf: &mut Vec<u8>) {
        let len = payload.len() as u32;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(payload);
    }

    /// Blocks on `reader` until one complete frame has been read.
    ///
    /// Returns `Ok(None)` only for a non-blocking reader reporting
    /// `WouldBlock` mid-header with no bytes read yet; a blocking
    /// `TcpStream` never observes this path.
    pub fn decode<R: Read + ?Sized>(&mut self, reader: &mut R) -> io::Result<Option<Vec<u8>>> {
        loop {
            match self.state {
                ReadState::ReadingLength { bytes_read } => {
                    match reader.read(&mut self.buffer[bytes_read..FRAME_HEADER_SIZE]) {
                        Ok(0) => {
                            return Err(io::Error::new(
                                io::ErrorKind::UnexpectedEof,
                                "connection closed mid-frame",
                            ));
                        }
                        Ok(n) => {
                            let total = bytes_read + n;
                            if total < FRAME_HEADER_SIZE {
                                self.state = ReadState::ReadingLength { bytes_read: total };
                                continue;
                            }
                            let len = u32::from_be_bytes([
                                self.buffer[0],
                                self.buffer[1],
                                self.buffer[2],
                                self.buffer[3],
                            ]) as usize;

                            if len > self.max_size {
                                self.frames_rejected += 1;
                                self.state = ReadState::default();
                                return Err(io::Error::new(
                                    io::ErrorKind::InvalidData,
                                    format!("frame too large: {len} bytes (max {})", self.max_size),
                                ));
                            }

                            if len == 0 {
                                self.frames_decoded += 1;
                                self.state = ReadState::default();
                                return Ok(Some(Vec::new()));
                            }

                            self.buffer.resize(len, 0);
                            self.state = ReadState::ReadingBody {
                                expected_len: len,
                                bytes_read: 0,
                            };
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                            self.state = ReadState::ReadingLength { bytes_read };
                            return Ok(None);
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => return Err(e),
                    }
                }
                ReadState::ReadingBody {
                    expected_len,
                    bytes_read,
                } => match reader.read(&mut self.buffer[bytes_read..expected_len]) {
                    Ok(0) => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "connection closed mid-frame",
                        ));
                    }
                    Ok(n) => {
                        let total = bytes_read + n;
                        if total < expected_len {
                            self.state = ReadState::ReadingBody {
                                expected_len,
                                bytes_read: total,
                            };
                            continue;
                        }
                        let message = self.buffer[..expected_len].to_vec();
                        self.frames_decoded += 1;
                        self.bytes_decoded += expected_len as u64;
                        self.buffer.resize(FRAME_HEADER_SIZE, 0);
                        self.state = ReadState::default();
                        return Ok(Some(message));
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                        self.state = ReadState::ReadingBody {
                            expected_len,
                            bytes_read,
                        };
                        return Ok(None);
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                },
            }
        }
    }
}
