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

//! Read loop and message dispatch for the push socket.
//!
//! The loop waits for a connection, then reads frames in arrival order until the
//! reader ends. Protocol frames are handled inline; channel events are handed to the
//! listener callback as independent tasks so a slow callback never stalls the loop.
//! A close the client did not initiate goes through the close-code back-off and a
//! reconnect.

use std::{sync::Arc, time::Duration};

use futures_util::StreamExt;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::{
    client::ClientCore,
    messages::{PnwConnectionEstablished, PnwWsFrame, pong_frame},
};
use crate::common::{
    consts::HEARTBEAT_IDLE_TICK_MS,
    enums::{CloseCodeBand, PnwWsEvent},
};

/// Dispatches inbound frames for one client.
pub(crate) struct PnwWsFeedHandler {
    core: Arc<ClientCore>,
}

impl PnwWsFeedHandler {
    pub(crate) fn new(core: Arc<ClientCore>) -> Self {
        Self { core }
    }

    /// Runs the read loop until `cancel` fires.
    pub(crate) async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = self.core.state.wait_connected() => {}
            }

            let mut reader = match self.core.transport.take_reader().await {
                Some(reader) => reader,
                None => {
                    // Connection replaced between the wake-up and the take
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(Duration::from_millis(HEARTBEAT_IDLE_TICK_MS)) => {}
                    }
                    continue;
                }
            };

            let generation = reader.generation;
            tracing::debug!("Reading connection generation {generation}");

            let close_code = loop {
                let message = tokio::select! {
                    () = cancel.cancelled() => return,
                    () = reader.closed.cancelled() => {
                        tracing::debug!("Connection generation {generation} closed locally");
                        break None;
                    }
                    message = reader.stream.next() => message,
                };

                match message {
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!("Received close frame: {frame:?}");
                        break frame.map(|frame| u16::from(frame.code));
                    }
                    Some(Ok(message)) => self.handle_message(message).await,
                    Some(Err(e)) => {
                        tracing::warn!("Socket read error: {e}");
                        break None;
                    }
                    None => break None,
                }
            };

            if self.core.transport.is_current(generation) && !self.core.state.is_closing() {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = self.handle_closed_socket(close_code) => {}
                }
            }
        }

        tracing::debug!("Read loop stopped");
    }

    /// Applies the close-code back-off, then reconnects.
    async fn handle_closed_socket(&self, close_code: Option<u16>) {
        self.core.state.mark_disconnected();

        let band = CloseCodeBand::from_code(close_code);
        let backoff = band.backoff(self.core.config.ban_backoff(), self.core.config.retry_backoff());

        if backoff.is_zero() {
            tracing::warn!("Socket closed by server (code {close_code:?})");
        } else {
            tracing::warn!(
                "Socket closed by server (code {close_code:?}, {band}), reconnecting in {backoff:?}"
            );
            tokio::select! {
                () = tokio::time::sleep(backoff) => {}
                () = self.core.state.wait_closing() => return,
            }
        }

        self.core.reconnect_socket("Socket closed").await;
    }

    async fn handle_message(&self, message: Message) {
        match message {
            Message::Text(text) => {
                self.core.clock.record_message(Instant::now());

                match PnwWsFrame::parse(text.as_str()) {
                    Ok(frame) => self.handle_frame(frame).await,
                    Err(e) => tracing::warn!("Failed to parse frame: {e}: {}", text.as_str()),
                }
            }
            Message::Ping(_) | Message::Pong(_) => {
                self.core.clock.record_message(Instant::now());
            }
            other => tracing::warn!("Unexpected non-text message: {other:?}"),
        }
    }

    async fn handle_frame(&self, frame: PnwWsFrame) {
        match frame.event() {
            PnwWsEvent::ConnectionEstablished => self.handle_connection_established(&frame),
            PnwWsEvent::SubscriptionSucceeded => {
                let Some(channel) = frame.channel.as_deref() else {
                    tracing::warn!("Subscription confirmation without channel");
                    return;
                };

                let listener = self.core.listeners.get(channel).map(|entry| entry.value().clone());
                match listener {
                    Some(listener) => {
                        tracing::debug!("Subscription confirmed for {channel}");
                        listener.set_active(true);
                    }
                    None => self.unsubscribe_unknown(channel).await,
                }
            }
            PnwWsEvent::Pong => self.core.clock.record_pong(Instant::now()),
            PnwWsEvent::Ping => {
                if let Err(e) = self.core.send(pong_frame()).await {
                    tracing::warn!("Failed to send pong: {e}");
                }
            }
            PnwWsEvent::Error => {
                tracing::warn!("Server error: {:?}", frame.decode_data().ok());
            }
            PnwWsEvent::Subscribe | PnwWsEvent::Unsubscribe => {
                tracing::warn!("Unexpected inbound {} frame", frame.event);
            }
            PnwWsEvent::Channel(event) => self.dispatch(&event, &frame).await,
        }
    }

    fn handle_connection_established(&self, frame: &PnwWsFrame) {
        let established = frame
            .decode_data()
            .and_then(|data| Ok(serde_json::from_value::<PnwConnectionEstablished>(data)?));

        match established {
            Ok(established) => {
                let timeout = self.core.state.set_session(
                    established.socket_id.clone(),
                    Duration::from_secs(established.activity_timeout),
                );
                tracing::info!(
                    "Connection established (socket_id={}, idle_timeout={timeout:?})",
                    established.socket_id
                );
            }
            Err(e) => tracing::error!("Invalid connection_established payload: {e}"),
        }
    }

    async fn dispatch(&self, event: &str, frame: &PnwWsFrame) {
        let Some(channel) = frame.channel.as_deref() else {
            tracing::warn!("Event {event} without channel");
            return;
        };

        let listener = self.core.listeners.get(channel).map(|entry| entry.value().clone());
        let Some(listener) = listener else {
            self.unsubscribe_unknown(channel).await;
            return;
        };

        match frame.decode_data() {
            Ok(payload) => {
                tracing::debug!("Dispatching {event} on {channel}");
                self.core.tasks.spawn(listener.invoke(payload));
            }
            Err(e) => tracing::warn!("Failed to decode {event} payload on {channel}: {e}"),
        }
    }

    async fn unsubscribe_unknown(&self, channel: &str) {
        tracing::warn!("Received frame for unknown channel {channel}, unsubscribing");

        if let Err(e) = self.core.unsubscribe_channel(channel).await {
            tracing::warn!("Failed to unsubscribe {channel}: {e}");
        }
    }
}
