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

//! Liveness monitor for the push socket.
//!
//! No ping is sent while traffic keeps arriving. Once the connection has been silent for
//! the idle timeout a ping goes out; if nothing at all arrives within another idle
//! timeout the connection is presumed dead and a reconnect is triggered. Silent death is
//! therefore detected within two idle-timeout windows.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{
    error::PnwWsResult,
    state::{HeartbeatClock, HeartbeatSnapshot},
};
use crate::common::consts::HEARTBEAT_IDLE_TICK_MS;

/// What the monitor should do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Nothing to do for this long.
    Wait(Duration),
    SendPing,
    Reconnect,
}

/// Decides the next heartbeat step at `now`.
#[must_use]
pub fn next_heartbeat_action(
    now: Instant,
    snapshot: &HeartbeatSnapshot,
    timeout: Duration,
) -> HeartbeatAction {
    let idle_deadline = snapshot.last_message + timeout;
    if idle_deadline > now {
        return HeartbeatAction::Wait(idle_deadline - now);
    }

    let ping_deadline = snapshot.last_ping + timeout;

    if snapshot.awaiting_pong() {
        return if now >= ping_deadline {
            HeartbeatAction::Reconnect
        } else {
            HeartbeatAction::Wait(ping_deadline - now)
        };
    }

    if ping_deadline > now {
        return HeartbeatAction::Wait(ping_deadline - now);
    }

    HeartbeatAction::SendPing
}

/// The connection the heartbeat supervises.
#[async_trait]
pub trait HeartbeatTarget: Send + Sync {
    fn clock(&self) -> &HeartbeatClock;

    /// The negotiated idle timeout.
    fn idle_timeout(&self) -> Duration;

    fn is_connected(&self) -> bool;

    /// Sends a ping frame.
    async fn send_ping(&self) -> PnwWsResult<()>;

    /// Tears the connection down and opens a new one.
    async fn reconnect(&self, reason: &str);
}

/// Runs the heartbeat until `cancel` fires.
pub async fn run_heartbeat<T>(target: &T, cancel: CancellationToken)
where
    T: HeartbeatTarget + ?Sized,
{
    let idle_tick = Duration::from_millis(HEARTBEAT_IDLE_TICK_MS);

    loop {
        let pause = if target.is_connected() {
            heartbeat_step(target).await
        } else {
            idle_tick
        };

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(pause) => {}
        }
    }

    tracing::debug!("Heartbeat stopped");
}

/// Performs one evaluation and returns how long to sleep before the next.
async fn heartbeat_step<T>(target: &T) -> Duration
where
    T: HeartbeatTarget + ?Sized,
{
    let timeout = target.idle_timeout();
    let now = Instant::now();

    match next_heartbeat_action(now, &target.clock().snapshot(), timeout) {
        HeartbeatAction::Wait(remaining) => remaining,
        HeartbeatAction::SendPing => match target.send_ping().await {
            Ok(()) => {
                target.clock().record_ping(Instant::now());
                tracing::debug!("Sent ping after {timeout:?} of silence");
                Duration::ZERO
            }
            Err(e) if e.is_connection_reset() => {
                tracing::warn!("Connection reset while pinging: {e}");
                target.reconnect("Connection reset").await;
                timeout
            }
            Err(e) => {
                tracing::warn!("Failed to send ping: {e}");
                Duration::from_millis(HEARTBEAT_IDLE_TICK_MS)
            }
        },
        HeartbeatAction::Reconnect => {
            tracing::warn!("No response to ping within {timeout:?}, reconnecting");
            target.reconnect("Heartbeat timeout").await;
            timeout
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    use rstest::rstest;

    use super::*;
    use crate::websocket::error::PnwWsError;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn snapshot(t0: Instant, message: u64, ping: u64, pong: u64) -> HeartbeatSnapshot {
        HeartbeatSnapshot {
            last_message: t0 + Duration::from_secs(message),
            last_ping: t0 + Duration::from_secs(ping),
            last_pong: t0 + Duration::from_secs(pong),
        }
    }

    #[rstest]
    fn test_waits_while_traffic_is_recent() {
        let t0 = Instant::now();
        let action = next_heartbeat_action(t0 + Duration::from_secs(2), &snapshot(t0, 0, 0, 0), TIMEOUT);

        assert_eq!(action, HeartbeatAction::Wait(Duration::from_secs(3)));
    }

    #[rstest]
    fn test_pings_after_idle_timeout() {
        let t0 = Instant::now();
        let action = next_heartbeat_action(t0 + TIMEOUT, &snapshot(t0, 0, 0, 0), TIMEOUT);

        assert_eq!(action, HeartbeatAction::SendPing);
    }

    #[rstest]
    fn test_waits_for_pong_within_grace() {
        let t0 = Instant::now();
        let action = next_heartbeat_action(t0 + Duration::from_secs(7), &snapshot(t0, 0, 5, 0), TIMEOUT);

        assert_eq!(action, HeartbeatAction::Wait(Duration::from_secs(3)));
    }

    #[rstest]
    fn test_reconnects_when_pong_overdue() {
        let t0 = Instant::now();
        let action = next_heartbeat_action(t0 + Duration::from_secs(10), &snapshot(t0, 0, 5, 0), TIMEOUT);

        assert_eq!(action, HeartbeatAction::Reconnect);
    }

    #[rstest]
    fn test_answered_ping_does_not_reconnect() {
        let t0 = Instant::now();
        // Ping at 5 answered at 6, then silence
        let action = next_heartbeat_action(t0 + Duration::from_secs(11), &snapshot(t0, 6, 5, 6), TIMEOUT);

        assert_eq!(action, HeartbeatAction::SendPing);
    }

    #[rstest]
    fn test_recent_ping_suppresses_another() {
        let t0 = Instant::now();
        // Ping at 5 answered by traffic at 5; the ping's own window is still open at 8
        let snapshot = snapshot(t0, 3, 5, 5);
        let action = next_heartbeat_action(t0 + Duration::from_secs(8), &snapshot, TIMEOUT);

        assert_eq!(action, HeartbeatAction::Wait(Duration::from_secs(2)));
    }

    #[derive(Debug)]
    struct MockTarget {
        clock: HeartbeatClock,
        connected: AtomicBool,
        pings: AtomicUsize,
        reconnects: AtomicUsize,
        reset_on_ping: AtomicBool,
    }

    impl MockTarget {
        fn new() -> Self {
            Self {
                clock: HeartbeatClock::new(Instant::now()),
                connected: AtomicBool::new(true),
                pings: AtomicUsize::new(0),
                reconnects: AtomicUsize::new(0),
                reset_on_ping: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl HeartbeatTarget for MockTarget {
        fn clock(&self) -> &HeartbeatClock {
            &self.clock
        }

        fn idle_timeout(&self) -> Duration {
            TIMEOUT
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn send_ping(&self) -> PnwWsResult<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.reset_on_ping.swap(false, Ordering::SeqCst) {
                return Err(PnwWsError::ConnectionReset("reset by peer".to_string()));
            }
            Ok(())
        }

        async fn reconnect(&self, _reason: &str) {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            self.clock.reset(Instant::now());
        }
    }

    fn spawn_heartbeat(target: &Arc<MockTarget>) -> CancellationToken {
        let cancel = CancellationToken::new();
        let target = target.clone();
        let token = cancel.clone();
        tokio::spawn(async move { run_heartbeat(target.as_ref(), token).await });
        cancel
    }

    /// Sleeps the test task until `ms` after `start`; paused time auto-advances through
    /// the heartbeat's own timers on the way.
    async fn at(start: Instant, ms: u64) {
        tokio::time::sleep_until(start + Duration::from_millis(ms)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_connection_reconnects_exactly_once_by_two_windows() {
        let target = Arc::new(MockTarget::new());
        let start = Instant::now();
        let cancel = spawn_heartbeat(&target);

        at(start, 4900).await;
        assert_eq!(target.pings.load(Ordering::SeqCst), 0);

        at(start, 5100).await;
        assert_eq!(target.pings.load(Ordering::SeqCst), 1);
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 0);

        at(start, 9900).await;
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 0);

        at(start, 10100).await;
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 1);

        // Stabilization sleep: nothing further within the next window
        at(start, 14900).await;
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 1);
        assert_eq!(target.pings.load(Ordering::SeqCst), 1);

        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_traffic_suppresses_pings() {
        let target = Arc::new(MockTarget::new());
        let start = Instant::now();
        let cancel = spawn_heartbeat(&target);

        for second in 1..=20 {
            at(start, second * 1_000).await;
            target.clock.record_message(Instant::now());
        }

        assert_eq!(target.pings.load(Ordering::SeqCst), 0);
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 0);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_keeps_connection() {
        let target = Arc::new(MockTarget::new());
        let start = Instant::now();
        let cancel = spawn_heartbeat(&target);

        at(start, 5100).await;
        assert_eq!(target.pings.load(Ordering::SeqCst), 1);

        let now = Instant::now();
        target.clock.record_message(now);
        target.clock.record_pong(now);

        at(start, 10200).await;
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 0);
        assert_eq!(target.pings.load(Ordering::SeqCst), 2);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_on_ping_reconnects() {
        let target = Arc::new(MockTarget::new());
        target.reset_on_ping.store(true, Ordering::SeqCst);
        let start = Instant::now();
        let cancel = spawn_heartbeat(&target);

        at(start, 5100).await;

        assert_eq!(target.pings.load(Ordering::SeqCst), 1);
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 1);
        cancel.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_while_disconnected() {
        let target = Arc::new(MockTarget::new());
        target.connected.store(false, Ordering::SeqCst);
        let start = Instant::now();
        let cancel = spawn_heartbeat(&target);

        at(start, 30000).await;

        assert_eq!(target.pings.load(Ordering::SeqCst), 0);
        assert_eq!(target.reconnects.load(Ordering::SeqCst), 0);
        cancel.cancel();
    }
}
