// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Duplex socket transport.
//!
//! The stream is split on connect: the writer half stays behind a lock for concurrent
//! senders, the reader half is handed to the read loop. Each connect bumps a generation
//! counter, and so does every local close, which lets the read loop tell a server-side
//! close (reader generation still current) from one it caused itself. A local close also
//! fires the connection's close token, so a read blocked on a silent peer ends at once.

use std::{
    fmt::Debug,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config,
    tungstenite::{
        Message,
        protocol::{CloseFrame, WebSocketConfig, frame::coding::CloseCode},
    },
};
use tokio_util::sync::CancellationToken;

use super::error::{PnwWsError, PnwWsResult};
use crate::common::consts::MUTEX_POISONED;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsWriter = SplitSink<WsStream, Message>;
pub type WsReader = SplitStream<WsStream>;

/// Reader half of one connection.
pub struct ConnectionReader {
    pub generation: u64,
    pub stream: WsReader,
    /// Fires when the connection is closed locally.
    pub closed: CancellationToken,
}

impl Debug for ConnectionReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ConnectionReader))
            .field("generation", &self.generation)
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// The push socket transport.
#[derive(Default)]
pub struct Transport {
    writer: Mutex<Option<WsWriter>>,
    reader: Mutex<Option<ConnectionReader>>,
    closed: std::sync::Mutex<CancellationToken>,
    generation: AtomicU64,
    open: AtomicBool,
}

impl Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Transport))
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Transport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` between a successful connect and the next close.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns `true` if `generation` still identifies the current connection.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }

    /// Opens a new connection, replacing any previous one.
    ///
    /// Message and frame sizes are unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable, the handshake fails, or `timeout`
    /// elapses first.
    pub async fn connect(&self, url: &str, timeout: Duration) -> PnwWsResult<()> {
        let config = WebSocketConfig::default()
            .max_message_size(None)
            .max_frame_size(None);

        let (stream, _response) =
            tokio::time::timeout(timeout, connect_async_with_config(url, Some(config), false))
                .await
                .map_err(|_| PnwWsError::Timeout(format!("Connecting to {url} after {timeout:?}")))?
                .map_err(|e| PnwWsError::Transport(e.to_string()))?;

        let (writer, stream) = stream.split();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        let closed = CancellationToken::new();
        let previous = std::mem::replace(
            &mut *self.closed.lock().expect(MUTEX_POISONED),
            closed.clone(),
        );
        previous.cancel();

        *self.writer.lock().await = Some(writer);
        *self.reader.lock().await = Some(ConnectionReader {
            generation,
            stream,
            closed,
        });
        self.open.store(true, Ordering::Release);

        tracing::debug!("Transport connected (generation {generation})");
        Ok(())
    }

    /// Takes the reader half of the current connection.
    pub async fn take_reader(&self) -> Option<ConnectionReader> {
        self.reader.lock().await.take()
    }

    /// Sends a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`PnwWsError::NotConnected`] if there is no open connection, or the send
    /// error (reset-by-peer maps to [`PnwWsError::ConnectionReset`]).
    pub async fn send_text(&self, text: String) -> PnwWsResult<()> {
        let mut writer = self.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(PnwWsError::NotConnected);
        };

        tracing::trace!("Sending: {text}");
        sink.send(Message::text(text)).await.map_err(PnwWsError::from)
    }

    /// Closes the current connection with `code` and `reason`.
    ///
    /// Idempotent: a no-op if already closed. A reset-by-peer while closing is ignored.
    ///
    /// # Errors
    ///
    /// Returns any other error raised while sending the close frame.
    pub async fn close(&self, code: u16, reason: &str) -> PnwWsResult<()> {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.closed.lock().expect(MUTEX_POISONED).cancel();

        if !self.open.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        // Unclaimed reader belongs to the connection being closed
        self.reader.lock().await.take();

        let Some(mut sink) = self.writer.lock().await.take() else {
            return Ok(());
        };

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };

        match sink.send(Message::Close(Some(frame))).await.map_err(PnwWsError::from) {
            Err(e) if e.is_connection_reset() => {
                tracing::debug!("Connection already reset while closing: {e}");
                Ok(())
            }
            other => other,
        }
    }
}
