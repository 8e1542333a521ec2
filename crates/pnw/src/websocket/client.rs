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

//! WebSocket client for the Politics and War subscription socket.
//!
//! The [`PnwWebSocketClient`] keeps one push-socket connection alive for any number of
//! listeners. `run` connects and starts two long-lived tasks: the read loop (see
//! [`super::handler`]) and the heartbeat (see [`super::heartbeat`]). Listener callbacks
//! and re-subscribes run as short-lived tasks tracked for shutdown.
//!
//! Channel names and authorization tokens are bound to a specific connection, so every
//! registered listener is re-subscribed after each reconnect.

use std::{
    fmt::Debug,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;

use super::{
    error::{PnwWsError, PnwWsResult},
    handler::PnwWsFeedHandler,
    heartbeat::{HeartbeatTarget, run_heartbeat},
    listener::{Listener, ListenerCallback, ListenerHandle},
    messages::{ping_frame, subscribe_frame, unsubscribe_frame},
    state::{ConnectionState, HeartbeatClock},
    tasks::TaskSet,
    transport::Transport,
};
use crate::{
    common::consts::{CLOSE_CODE_NORMAL, CLOSE_CODE_PROTOCOL_ERROR},
    config::PnwClientConfig,
    http::{client::PnwHttpClient, error::PnwHttpError},
};

/// Time allowed for the read loop and heartbeat to exit after cancellation.
const LOOP_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// State shared by the client handle, the read loop, the heartbeat and spawned tasks.
pub(crate) struct ClientCore {
    pub(crate) url: String,
    pub(crate) config: PnwClientConfig,
    pub(crate) http: PnwHttpClient,
    pub(crate) transport: Transport,
    pub(crate) state: ConnectionState,
    pub(crate) clock: HeartbeatClock,
    pub(crate) listeners: DashMap<String, Arc<Listener>>,
    pub(crate) tasks: TaskSet,
}

impl ClientCore {
    async fn connect(&self) -> PnwWsResult<()> {
        self.transport
            .connect(&self.url, self.config.ws_connect_timeout())
            .await?;
        self.state.set_connected(true);
        tracing::info!("Connected to {}", self.url);
        Ok(())
    }

    /// Clears the connection flags, then closes the transport.
    pub(crate) async fn close_socket(&self, code: u16, reason: &str) {
        self.state.mark_disconnected();

        if let Err(e) = self.transport.close(code, reason).await {
            tracing::warn!("Error closing socket: {e}");
        }
    }

    pub(crate) async fn send(&self, text: String) -> PnwWsResult<()> {
        self.transport.send_text(text).await
    }

    /// Closes and reopens the connection, then re-subscribes every registered listener.
    ///
    /// Concurrent calls are no-ops while a reconnect is in flight. Failed connects are
    /// retried until one succeeds or the client shuts down.
    pub(crate) async fn reconnect_socket(self: &Arc<Self>, reason: &str) {
        let Some(_guard) = self.state.try_begin_reconnect() else {
            tracing::debug!("Reconnect already in progress, ignoring: {reason}");
            return;
        };

        if self.state.is_closing() || !self.state.is_running() {
            return;
        }

        tracing::info!("Reconnecting: {reason}");
        self.close_socket(CLOSE_CODE_PROTOCOL_ERROR, reason).await;
        self.clock.reset(Instant::now());

        let delay = self.config.reconnect_retry_delay();
        while let Err(e) = self.connect().await {
            tracing::warn!("Reconnect failed: {e}, retrying in {delay:?}");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.state.wait_closing() => return,
            }
        }

        self.clock.reset(Instant::now());
        self.resubscribe_all();
    }

    fn resubscribe_all(self: &Arc<Self>) {
        let mut listeners: Vec<Arc<Listener>> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        listeners.sort_by_key(|listener| listener.id());
        listeners.dedup_by_key(|listener| listener.id());

        if !listeners.is_empty() {
            tracing::info!("Re-subscribing {} listeners", listeners.len());
        }

        for listener in listeners {
            listener.set_active(false);
            let core = self.clone();

            self.tasks.spawn(async move {
                tokio::select! {
                    () = core.state.wait_listening() => {}
                    () = core.state.wait_closing() => return,
                }

                if let Err(e) = core.subscribe_listener(&listener).await {
                    tracing::error!(
                        "Failed to re-subscribe {}/{}: {e}",
                        listener.model(),
                        listener.event()
                    );
                }
            });
        }
    }

    /// Subscribes `listener`, waiting for the connection handshake first.
    pub(crate) async fn subscribe(self: &Arc<Self>, listener: Arc<Listener>) -> PnwWsResult<()> {
        if self.state.is_closing() {
            return Err(PnwWsError::State("Client is closing".to_string()));
        }

        if self.state.is_running() && !self.transport.is_open() {
            self.reconnect_socket("Socket found closed on subscribe").await;
        }

        if !self.state.is_listening() {
            tokio::select! {
                () = self.state.wait_listening() => {}
                () = self.state.wait_closing() => {
                    return Err(PnwWsError::State(
                        "Client closed while waiting for the connection".to_string(),
                    ));
                }
            }
        }

        self.subscribe_listener(&listener).await
    }

    /// Runs the subscribe handshake; on failure the listener leaves the registry.
    async fn subscribe_listener(self: &Arc<Self>, listener: &Arc<Listener>) -> PnwWsResult<()> {
        listener.set_active(false);

        let result = self.handshake(listener).await;

        if result.is_err()
            && let Some(channel) = listener.channel()
        {
            self.remove_listener(&channel, listener);
        }

        result
    }

    async fn handshake(&self, listener: &Arc<Listener>) -> PnwWsResult<()> {
        let socket_id = self.state.socket_id().ok_or(PnwWsError::NotConnected)?;

        let mut channel = match listener.channel() {
            Some(channel) => channel,
            None => self.request_channel(listener).await?,
        };

        let auth = match self.http.authorize_channel(&socket_id, &channel).await {
            Ok(auth) => auth,
            Err(PnwHttpError::AuthorizeFailed { status, .. }) => {
                tracing::warn!(
                    "Authorization of {channel} failed (HTTP {status}), requesting a new channel"
                );
                channel = self.request_channel(listener).await?;
                self.http.authorize_channel(&socket_id, &channel).await?
            }
            Err(e) => return Err(e.into()),
        };

        self.listeners.insert(channel.clone(), listener.clone());
        self.send(subscribe_frame(&auth, &channel)).await?;

        let timeout = self.config.subscribe_timeout();
        if !listener.wait_active(timeout).await {
            return Err(PnwWsError::SubscribeFailed(format!(
                "No confirmation for {channel} within {timeout:?}"
            )));
        }

        tracing::info!(
            "Subscribed {}/{} on {channel}",
            listener.model(),
            listener.event()
        );
        Ok(())
    }

    /// Requests a channel for `listener`, dropping any registry entry under its old channel.
    async fn request_channel(&self, listener: &Arc<Listener>) -> PnwWsResult<String> {
        let channel = self
            .http
            .request_channel(listener.model(), listener.event())
            .await?;

        if let Some(previous) = listener.set_channel(channel.clone())
            && previous != channel
        {
            self.remove_listener(&previous, listener);
        }

        Ok(channel)
    }

    /// Removes the registry entry for `channel` if it still belongs to `listener`.
    fn remove_listener(&self, channel: &str, listener: &Arc<Listener>) -> bool {
        self.listeners
            .remove_if(channel, |_, registered| Arc::ptr_eq(registered, listener))
            .is_some()
    }

    /// Drops `channel` from the registry and tells the server to stop sending it.
    pub(crate) async fn unsubscribe_channel(&self, channel: &str) -> PnwWsResult<()> {
        self.listeners.remove(channel);
        self.send(unsubscribe_frame(channel)).await
    }
}

#[async_trait]
impl HeartbeatTarget for Arc<ClientCore> {
    fn clock(&self) -> &HeartbeatClock {
        &self.clock
    }

    fn idle_timeout(&self) -> Duration {
        self.state.idle_timeout()
    }

    fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    async fn send_ping(&self) -> PnwWsResult<()> {
        self.send(ping_frame()).await
    }

    async fn reconnect(&self, reason: &str) {
        self.reconnect_socket(reason).await;
    }
}

struct LoopHandles {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

/// WebSocket client for the Politics and War subscription socket.
///
/// Cheap to clone: clones drive the same connection.
#[derive(Clone)]
pub struct PnwWebSocketClient {
    core: Arc<ClientCore>,
    loops: Arc<Mutex<Option<LoopHandles>>>,
}

impl Debug for PnwWebSocketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(PnwWebSocketClient))
            .field("url", &self.core.url)
            .field("running", &self.core.state.is_running())
            .field("listening", &self.core.state.is_listening())
            .field("listeners", &self.core.listeners.len())
            .field("credential", self.core.http.credential())
            .finish_non_exhaustive()
    }
}

impl PnwWebSocketClient {
    /// Creates a new [`PnwWebSocketClient`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key can be resolved.
    pub fn new(config: PnwClientConfig) -> PnwWsResult<Self> {
        let http = PnwHttpClient::new(&config)?;

        let core = ClientCore {
            url: config.ws_url(),
            state: ConnectionState::new(config.idle_timeout()),
            clock: HeartbeatClock::default(),
            transport: Transport::new(),
            listeners: DashMap::new(),
            tasks: TaskSet::new(),
            http,
            config,
        };

        Ok(Self {
            core: Arc::new(core),
            loops: Arc::new(Mutex::new(None)),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.core.url
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.core.state.is_running()
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.core.state.is_closing()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.core.state.is_connected()
    }

    /// Returns `true` once the server has acknowledged the connection.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.core.state.is_listening()
    }

    #[must_use]
    pub fn socket_id(&self) -> Option<String> {
        self.core.state.socket_id()
    }

    /// Returns the idle timeout negotiated with the server.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.core.state.idle_timeout()
    }

    /// Returns the number of registered channels.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.core.listeners.len()
    }

    /// Returns the number of callback and re-subscribe tasks still running.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.core.tasks.len()
    }

    /// Waits until the server has acknowledged the connection.
    pub async fn wait_until_listening(&self) {
        self.core.state.wait_listening().await;
    }

    /// Connects and starts the read loop and heartbeat.
    ///
    /// Waits for an in-progress `stop` to finish first. Listeners still registered from a
    /// previous run are re-subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`PnwWsError::State`] if already running, or the connect error.
    pub async fn run(&self) -> PnwWsResult<()> {
        if self.core.state.is_closing() {
            self.core.state.wait_not_closing().await;
        }

        let mut loops = self.loops.lock().await;

        if self.core.state.is_running() {
            return Err(PnwWsError::State("Client is already running".to_string()));
        }

        self.core.clock.reset(Instant::now());
        self.core.connect().await?;
        self.core.state.set_running(true);

        let cancel = CancellationToken::new();

        let handler = PnwWsFeedHandler::new(self.core.clone());
        let reader = tokio::spawn(handler.run(cancel.clone()));

        let core = self.core.clone();
        let token = cancel.clone();
        let heartbeat = tokio::spawn(async move { run_heartbeat(&core, token).await });

        *loops = Some(LoopHandles {
            cancel,
            reader,
            heartbeat,
        });

        self.core.resubscribe_all();
        tracing::info!("Running");
        Ok(())
    }

    /// Stops the client.
    ///
    /// Cancels the read loop and heartbeat, closes the socket, then waits up to the
    /// shutdown grace period for callback tasks before aborting the rest. Registered
    /// listeners are kept for a later `run`.
    ///
    /// # Errors
    ///
    /// Returns [`PnwWsError::State`] if not running or already stopping.
    pub async fn stop(&self) -> PnwWsResult<()> {
        if self.core.state.is_closing() {
            return Err(PnwWsError::State("Client is already closing".to_string()));
        }

        if !self.core.state.is_running() {
            return Err(PnwWsError::State("Client is not running".to_string()));
        }

        self.core.state.set_running(false);
        self.core.state.set_closing(true);
        tracing::info!("Stopping");

        if let Some(loops) = self.loops.lock().await.take() {
            loops.cancel.cancel();

            for mut handle in [loops.reader, loops.heartbeat] {
                if tokio::time::timeout(LOOP_STOP_TIMEOUT, &mut handle)
                    .await
                    .is_err()
                {
                    handle.abort();
                }
            }
        }

        self.core
            .close_socket(CLOSE_CODE_NORMAL, "Client stopped")
            .await;

        self.core
            .tasks
            .shutdown(self.core.config.shutdown_grace())
            .await;

        for entry in &self.core.listeners {
            entry.value().set_active(false);
        }

        self.core.state.set_closing(false);
        tracing::info!("Stopped");
        Ok(())
    }

    /// Forces a reconnect; every registered listener is re-subscribed afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`PnwWsError::State`] if the client is not running.
    pub async fn reconnect(&self) -> PnwWsResult<()> {
        if !self.core.state.is_running() {
            return Err(PnwWsError::State("Client is not running".to_string()));
        }

        self.core.reconnect_socket("Requested by client").await;
        Ok(())
    }

    /// Registers a listener and subscribes it in the background.
    ///
    /// Failures are logged; use [`Self::listen`] to observe them.
    pub fn register(
        &self,
        model: impl Into<String>,
        event: impl Into<String>,
        callback: ListenerCallback,
    ) -> ListenerHandle {
        let listener = Arc::new(Listener::new(model, event, callback));
        let core = self.core.clone();
        let subscribing = listener.clone();

        self.core.tasks.spawn(async move {
            if let Err(e) = core.subscribe(subscribing.clone()).await {
                tracing::error!(
                    "Failed to subscribe {}/{}: {e}",
                    subscribing.model(),
                    subscribing.event()
                );
            }
        });

        ListenerHandle::new(listener, self.clone())
    }

    /// Registers a listener and waits for the subscription to be confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`PnwWsError::State`] while stopping, [`PnwWsError::SubscribeFailed`] or
    /// [`PnwWsError::AuthorizeFailed`] if the handshake fails.
    pub async fn listen(
        &self,
        model: impl Into<String>,
        event: impl Into<String>,
        callback: ListenerCallback,
    ) -> PnwWsResult<ListenerHandle> {
        let listener = Arc::new(Listener::new(model, event, callback));
        self.subscribe(listener.clone()).await?;
        Ok(ListenerHandle::new(listener, self.clone()))
    }

    /// Subscribes an existing listener.
    ///
    /// # Errors
    ///
    /// Returns [`PnwWsError::State`] while stopping, or the handshake error.
    pub async fn subscribe(&self, listener: Arc<Listener>) -> PnwWsResult<()> {
        self.core.subscribe(listener).await
    }

    /// Removes `listener` from dispatch and sends an unsubscribe frame.
    ///
    /// A no-op if the listener is not registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the unsubscribe frame cannot be sent on an open connection.
    pub async fn unsubscribe(&self, listener: &Arc<Listener>) -> PnwWsResult<()> {
        listener.set_active(false);

        let Some(channel) = listener.channel() else {
            return Ok(());
        };

        if !self.core.remove_listener(&channel, listener) {
            return Ok(());
        }

        tracing::info!(
            "Unsubscribing {}/{} from {channel}",
            listener.model(),
            listener.event()
        );

        match self.core.send(unsubscribe_frame(&channel)).await {
            // Server-side subscriptions die with the connection
            Err(PnwWsError::NotConnected) => Ok(()),
            other => other,
        }
    }

    /// Sends a raw JSON frame on the current connection.
    ///
    /// # Errors
    ///
    /// Returns an error if not connected or the send fails.
    pub async fn send_raw(&self, event: &str, data: Value) -> PnwWsResult<()> {
        let frame = serde_json::json!({"event": event, "data": data});
        self.core.send(frame.to_string()).await
    }
}
