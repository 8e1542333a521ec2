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

//! Connection lifecycle flags and heartbeat timestamps.
//!
//! Lifecycle: `disconnected -> connecting -> connected -> listening -> (disconnected | reconnecting)`.
//! Flags that other tasks wait on are `watch` channels; the rest are atomics.

use std::{
    sync::{
        Mutex, RwLock,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{sync::watch, time::Instant};

use crate::common::consts::MUTEX_POISONED;

/// Shared connection state for one client instance.
#[derive(Debug)]
pub struct ConnectionState {
    running: AtomicBool,
    reconnecting: AtomicBool,
    closing: watch::Sender<bool>,
    connected: watch::Sender<bool>,
    listening: watch::Sender<bool>,
    socket_id: RwLock<Option<String>>,
    configured_timeout: Duration,
    idle_timeout_ms: AtomicU64,
}

impl ConnectionState {
    /// Creates a disconnected state with `idle_timeout` as the upper bound for the
    /// negotiated timeout.
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            running: AtomicBool::new(false),
            reconnecting: AtomicBool::new(false),
            closing: watch::Sender::new(false),
            connected: watch::Sender::new(false),
            listening: watch::Sender::new(false),
            socket_id: RwLock::new(None),
            configured_timeout: idle_timeout,
            idle_timeout_ms: AtomicU64::new(duration_ms(idle_timeout)),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::Release);
    }

    #[must_use]
    pub fn is_closing(&self) -> bool {
        *self.closing.borrow()
    }

    pub fn set_closing(&self, value: bool) {
        self.closing.send_replace(value);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn set_connected(&self, value: bool) {
        self.connected.send_replace(value);
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        *self.listening.borrow()
    }

    pub fn set_listening(&self, value: bool) {
        self.listening.send_replace(value);
    }

    /// Clears the connected and listening flags together.
    pub fn mark_disconnected(&self) {
        self.set_connected(false);
        self.set_listening(false);
        *self.socket_id.write().expect(MUTEX_POISONED) = None;
    }

    /// Waits until the transport reports connected.
    pub async fn wait_connected(&self) {
        let mut rx = self.connected.subscribe();
        // The sender lives as long as `self`, so the wait cannot fail
        let _ = rx.wait_for(|connected| *connected).await;
    }

    /// Waits until the handshake has completed.
    pub async fn wait_listening(&self) {
        let mut rx = self.listening.subscribe();
        let _ = rx.wait_for(|listening| *listening).await;
    }

    /// Waits until shutdown begins.
    pub async fn wait_closing(&self) {
        let mut rx = self.closing.subscribe();
        let _ = rx.wait_for(|closing| *closing).await;
    }

    /// Waits until no shutdown is in progress.
    pub async fn wait_not_closing(&self) {
        let mut rx = self.closing.subscribe();
        let _ = rx.wait_for(|closing| !*closing).await;
    }

    /// Claims the reconnect slot; `None` when another reconnect is already in flight.
    #[must_use]
    pub fn try_begin_reconnect(&self) -> Option<ReconnectGuard<'_>> {
        if self.reconnecting.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(ReconnectGuard {
            flag: &self.reconnecting,
        })
    }

    #[must_use]
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn socket_id(&self) -> Option<String> {
        self.socket_id.read().expect(MUTEX_POISONED).clone()
    }

    /// Records a completed handshake and returns the negotiated idle timeout.
    pub fn set_session(&self, socket_id: String, activity_timeout: Duration) -> Duration {
        let timeout = activity_timeout.min(self.configured_timeout);
        self.idle_timeout_ms
            .store(duration_ms(timeout), Ordering::Release);
        *self.socket_id.write().expect(MUTEX_POISONED) = Some(socket_id);
        self.set_listening(true);
        timeout
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms.load(Ordering::Acquire))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Releases the reconnect slot on drop.
#[derive(Debug)]
pub struct ReconnectGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for ReconnectGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A point-in-time copy of the heartbeat timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatSnapshot {
    pub last_message: Instant,
    pub last_ping: Instant,
    pub last_pong: Instant,
}

impl HeartbeatSnapshot {
    /// Returns `true` if a ping has gone unanswered: nothing (pong or otherwise) has been
    /// received since it was sent.
    #[must_use]
    pub fn awaiting_pong(&self) -> bool {
        self.last_ping > self.last_pong.max(self.last_message)
    }
}

/// Last inbound message, last ping sent and last pong received.
#[derive(Debug)]
pub struct HeartbeatClock {
    inner: Mutex<HeartbeatSnapshot>,
}

impl Default for HeartbeatClock {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl HeartbeatClock {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            inner: Mutex::new(HeartbeatSnapshot {
                last_message: now,
                last_ping: now,
                last_pong: now,
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> HeartbeatSnapshot {
        *self.inner.lock().expect(MUTEX_POISONED)
    }

    pub fn record_message(&self, at: Instant) {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        inner.last_message = inner.last_message.max(at);
    }

    pub fn record_ping(&self, at: Instant) {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        inner.last_ping = inner.last_ping.max(at);
    }

    pub fn record_pong(&self, at: Instant) {
        let mut inner = self.inner.lock().expect(MUTEX_POISONED);
        inner.last_pong = inner.last_pong.max(at);
    }

    /// Resets all timestamps to `now` so a fresh connection is not considered to be
    /// awaiting a pong.
    pub fn reset(&self, now: Instant) {
        *self.inner.lock().expect(MUTEX_POISONED) = HeartbeatSnapshot {
            last_message: now,
            last_ping: now,
            last_pong: now,
        };
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_reconnect_guard_is_exclusive() {
        let state = ConnectionState::new(Duration::from_secs(120));

        let guard = state.try_begin_reconnect();
        assert!(guard.is_some());
        assert!(state.is_reconnecting());
        assert!(state.try_begin_reconnect().is_none());

        drop(guard);
        assert!(!state.is_reconnecting());
        assert!(state.try_begin_reconnect().is_some());
    }

    #[rstest]
    #[case(30, 30)]
    #[case(120, 120)]
    #[case(500, 120)]
    fn test_session_timeout_is_clamped(#[case] server_secs: u64, #[case] expected_secs: u64) {
        let state = ConnectionState::new(Duration::from_secs(120));
        let timeout = state.set_session("1.2".to_string(), Duration::from_secs(server_secs));

        assert_eq!(timeout, Duration::from_secs(expected_secs));
        assert_eq!(state.idle_timeout(), timeout);
        assert_eq!(state.socket_id().as_deref(), Some("1.2"));
        assert!(state.is_listening());
    }

    #[rstest]
    fn test_mark_disconnected_clears_session() {
        let state = ConnectionState::new(Duration::from_secs(120));
        state.set_connected(true);
        state.set_session("1.2".to_string(), Duration::from_secs(30));

        state.mark_disconnected();

        assert!(!state.is_connected());
        assert!(!state.is_listening());
        assert!(state.socket_id().is_none());
    }

    #[tokio::test]
    async fn test_wait_listening_wakes() {
        let state = std::sync::Arc::new(ConnectionState::new(Duration::from_secs(120)));
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait_listening().await })
        };

        state.set_session("9.9".to_string(), Duration::from_secs(10));
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[rstest]
    fn test_pong_is_never_before_ping() {
        let t0 = Instant::now();
        let clock = HeartbeatClock::new(t0);

        clock.record_ping(t0 + Duration::from_secs(5));
        assert!(clock.snapshot().awaiting_pong());

        clock.record_pong(t0 + Duration::from_secs(6));
        let snapshot = clock.snapshot();
        assert!(snapshot.last_pong >= snapshot.last_ping);
        assert!(!snapshot.awaiting_pong());
    }

    #[rstest]
    fn test_any_message_clears_awaiting_pong() {
        let t0 = Instant::now();
        let clock = HeartbeatClock::new(t0);

        clock.record_ping(t0 + Duration::from_secs(5));
        clock.record_message(t0 + Duration::from_secs(7));

        assert!(!clock.snapshot().awaiting_pong());
    }

    #[rstest]
    fn test_timestamps_are_monotonic() {
        let t0 = Instant::now();
        let clock = HeartbeatClock::new(t0 + Duration::from_secs(10));

        clock.record_message(t0);
        clock.record_pong(t0);

        let snapshot = clock.snapshot();
        assert_eq!(snapshot.last_message, t0 + Duration::from_secs(10));
        assert_eq!(snapshot.last_pong, t0 + Duration::from_secs(10));
    }

    #[rstest]
    fn test_reset_is_not_awaiting() {
        let t0 = Instant::now();
        let clock = HeartbeatClock::new(t0);
        clock.record_ping(t0 + Duration::from_secs(5));

        clock.reset(t0 + Duration::from_secs(10));

        assert!(!clock.snapshot().awaiting_pong());
    }
}
