// Copyright (c) 2026 Originchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Length-framed byte pipe. Every application datagram is
//! `uint32_be(total_len_including_this_field) || payload`.
//!
//! A peer going away surfaces as `PipeError::Disconnected` from the
//! suspension points; sessions treat that as fatal and never retry.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default cap on inbound frames.
pub const DEFAULT_MAX_FRAME: usize = 1 << 20;

/// Pipe errors.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error("peer disconnected")]
    Disconnected,
    #[error("io")]
    Io,
    #[error("frame too large")]
    FrameTooLarge,
    #[error("malformed frame")]
    Malformed,
}

fn map_io(e: std::io::Error) -> PipeError {
    use std::io::ErrorKind;
    match e.kind() {
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe => PipeError::Disconnected,
        _ => PipeError::Io,
    }
}

/// A bidirectional framed byte stream driving one peer session.
#[allow(async_fn_in_trait)]
pub trait Pipe: Send {
    /// Send one message; with `await_response`, suspend until the peer's
    /// framed reply arrives and return it.
    async fn send(&mut self, bytes: &[u8], await_response: bool)
        -> Result<Option<Vec<u8>>, PipeError>;
    /// Receive one message.
    async fn recv(&mut self) -> Result<Vec<u8>, PipeError>;
    /// Close the pipe (best-effort flush + shutdown).
    async fn close(&mut self);
}

/// Framing over any tokio byte stream: `TcpStream` in the node,
/// `tokio::io::duplex` in tests.
pub struct FramedPipe<S> {
    stream: S,
    max_frame: usize,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> FramedPipe<S> {
    /// Wrap `stream` with the given inbound frame cap.
    pub fn new(stream: S, max_frame: usize) -> Self {
        Self { stream, max_frame }
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, PipeError> {
        let mut len_bytes = [0u8; 4];
        self.stream
            .read_exact(&mut len_bytes)
            .await
            .map_err(map_io)?;
        let total = u32::from_be_bytes(len_bytes) as usize;
        if total < 4 {
            return Err(PipeError::Malformed);
        }
        if total > self.max_frame {
            return Err(PipeError::FrameTooLarge);
        }
        let mut buf = vec![0u8; total - 4];
        self.stream.read_exact(&mut buf).await.map_err(map_io)?;
        Ok(buf)
    }

    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), PipeError> {
        let total = u32::try_from(bytes.len().saturating_add(4))
            .map_err(|_| PipeError::FrameTooLarge)?;
        self.stream
            .write_all(&total.to_be_bytes())
            .await
            .map_err(map_io)?;
        self.stream.write_all(bytes).await.map_err(map_io)?;
        self.stream.flush().await.map_err(map_io)?;
        Ok(())
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Pipe for FramedPipe<S> {
    async fn send(
        &mut self,
        bytes: &[u8],
        await_response: bool,
    ) -> Result<Option<Vec<u8>>, PipeError> {
        self.write_frame(bytes).await?;
        if await_response {
            Ok(Some(self.read_frame().await?))
        } else {
            Ok(None)
        }
    }

    async fn recv(&mut self) -> Result<Vec<u8>, PipeError> {
        self.read_frame().await
    }

    async fn close(&mut self) {
        let _ = self.stream.shutdown().await;
    }
}
