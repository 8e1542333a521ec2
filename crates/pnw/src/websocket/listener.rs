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

//! Subscription registrations.

use std::{
    fmt::Debug,
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::watch;

use super::{client::PnwWebSocketClient, error::PnwWsResult};
use crate::common::consts::MUTEX_POISONED;

/// Callback invoked with the listener and the decoded event payload.
pub type ListenerCallback = Arc<dyn Fn(Arc<Listener>, Value) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure into a [`ListenerCallback`].
pub fn callback<F, Fut>(f: F) -> ListenerCallback
where
    F: Fn(Arc<Listener>, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(
        move |listener: Arc<Listener>, payload: Value| -> BoxFuture<'static, ()> {
            Box::pin(f(listener, payload))
        },
    )
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// One subscription registration: a callback bound to a model/event topic.
///
/// The channel is assigned by the control plane on the first subscribe attempt and
/// may be replaced if a later authorization finds it stale. The active flag flips once
/// the server confirms the subscription.
pub struct Listener {
    id: u64,
    model: String,
    event: String,
    callback: ListenerCallback,
    channel: RwLock<Option<String>>,
    active: watch::Sender<bool>,
}

impl Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Listener))
            .field("id", &self.id)
            .field("model", &self.model)
            .field("event", &self.event)
            .field("channel", &self.channel())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Listener {
    #[must_use]
    pub fn new(model: impl Into<String>, event: impl Into<String>, callback: ListenerCallback) -> Self {
        Self {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            model: model.into(),
            event: event.into(),
            callback,
            channel: RwLock::new(None),
            active: watch::Sender::new(false),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    #[must_use]
    pub fn channel(&self) -> Option<String> {
        self.channel.read().expect(MUTEX_POISONED).clone()
    }

    /// Replaces the channel, returning the previous one.
    pub fn set_channel(&self, channel: String) -> Option<String> {
        self.channel.write().expect(MUTEX_POISONED).replace(channel)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    pub fn set_active(&self, value: bool) {
        self.active.send_replace(value);
    }

    /// Waits until the subscription is confirmed; `false` if `timeout` elapses first.
    pub async fn wait_active(&self, timeout: Duration) -> bool {
        let mut rx = self.active.subscribe();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|active| *active)).await,
            Ok(Ok(_))
        )
    }

    /// Invokes the callback.
    pub fn invoke(self: &Arc<Self>, payload: Value) -> BoxFuture<'static, ()> {
        (self.callback)(self.clone(), payload)
    }
}

/// Handle returned by registration; owns unsubscribe.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    listener: Arc<Listener>,
    client: PnwWebSocketClient,
}

impl ListenerHandle {
    pub(crate) fn new(listener: Arc<Listener>, client: PnwWebSocketClient) -> Self {
        Self { listener, client }
    }

    #[must_use]
    pub fn listener(&self) -> &Arc<Listener> {
        &self.listener
    }

    #[must_use]
    pub fn channel(&self) -> Option<String> {
        self.listener.channel()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.listener.is_active()
    }

    /// Waits until the subscription is confirmed; `false` if `timeout` elapses first.
    pub async fn wait_active(&self, timeout: Duration) -> bool {
        self.listener.wait_active(timeout).await
    }

    /// Removes the listener and tells the server to drop the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the unsubscribe frame cannot be sent.
    pub async fn unsubscribe(self) -> PnwWsResult<()> {
        self.client.unsubscribe(&self.listener).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn noop() -> ListenerCallback {
        callback(|_, _| async {})
    }

    #[rstest]
    fn test_ids_are_unique() {
        let a = Listener::new("nation", "update", noop());
        let b = Listener::new("nation", "update", noop());

        assert_ne!(a.id(), b.id());
    }

    #[rstest]
    fn test_set_channel_returns_previous() {
        let listener = Listener::new("nation", "update", noop());

        assert_eq!(listener.set_channel("a".to_string()), None);
        assert_eq!(listener.set_channel("b".to_string()).as_deref(), Some("a"));
        assert_eq!(listener.channel().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_invoke_passes_listener_and_payload() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let listener = Arc::new(Listener::new(
            "nation",
            "update",
            callback(move |listener, payload| {
                let seen = seen.clone();
                async move {
                    assert_eq!(listener.model(), "nation");
                    assert_eq!(payload, json!({"id": 1}));
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            }),
        ));

        listener.invoke(json!({"id": 1})).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_active() {
        let listener = Arc::new(Listener::new("nation", "update", noop()));
        assert!(!listener.wait_active(Duration::from_secs(1)).await);

        let waiter = {
            let listener = listener.clone();
            tokio::spawn(async move { listener.wait_active(Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;
        listener.set_active(true);

        assert!(waiter.await.unwrap());
    }
}
