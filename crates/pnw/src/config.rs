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

//! Configuration structures for the Politics and War clients.

use std::time::Duration;

use crate::common::{
    consts::{
        DEFAULT_BAN_BACKOFF_SECS, DEFAULT_BULK_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS,
        DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_RATE_LIMIT_RETRIES,
        DEFAULT_RECONNECT_RETRY_DELAY_MS, DEFAULT_RETRY_BACKOFF_SECS,
        DEFAULT_SHUTDOWN_GRACE_SECS, DEFAULT_SUBSCRIBE_TIMEOUT_SECS, PNW_CONTROL_URL,
        PNW_GRAPHQL_URL, PNW_WS_URL,
    },
    credential::Credential,
};

/// Configuration shared by the HTTP and WebSocket clients.
#[derive(Clone, Debug)]
pub struct PnwClientConfig {
    /// Optional API key; falls back to the `PNW_API_KEY` environment variable.
    pub api_key: Option<String>,
    /// Optional override for the GraphQL endpoint.
    pub base_url_graphql: Option<String>,
    /// Optional override for the subscription control plane base URL.
    pub base_url_control: Option<String>,
    /// Optional override for the push socket URL.
    pub base_url_ws: Option<String>,
    /// Optional REST timeout in seconds.
    pub http_timeout_secs: Option<u64>,
    /// Optional maximum number of retries after a rate limit response.
    pub max_rate_limit_retries: Option<u32>,
    /// Optional WebSocket connect timeout in seconds.
    pub ws_connect_timeout_secs: Option<u64>,
    /// Optional idle timeout (seconds) before the heartbeat pings; the server may lower it.
    pub idle_timeout_secs: Option<u64>,
    /// Optional timeout (seconds) waiting for a subscription to be confirmed.
    pub subscribe_timeout_secs: Option<u64>,
    /// Optional grace period (seconds) for outstanding tasks on shutdown.
    pub shutdown_grace_secs: Option<u64>,
    /// Optional back-off (seconds) after a ban-band close code.
    pub ban_backoff_secs: Option<u64>,
    /// Optional back-off (seconds) after a retry-band close code.
    pub retry_backoff_secs: Option<u64>,
    /// Optional delay (milliseconds) between failed reconnect attempts.
    pub reconnect_retry_delay_ms: Option<u64>,
    /// Optional number of queries per bulk request.
    pub bulk_chunk_size: Option<usize>,
}

impl Default for PnwClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url_graphql: None,
            base_url_control: None,
            base_url_ws: None,
            http_timeout_secs: Some(DEFAULT_HTTP_TIMEOUT_SECS),
            max_rate_limit_retries: Some(DEFAULT_RATE_LIMIT_RETRIES),
            ws_connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout_secs: Some(DEFAULT_IDLE_TIMEOUT_SECS),
            subscribe_timeout_secs: Some(DEFAULT_SUBSCRIBE_TIMEOUT_SECS),
            shutdown_grace_secs: Some(DEFAULT_SHUTDOWN_GRACE_SECS),
            ban_backoff_secs: Some(DEFAULT_BAN_BACKOFF_SECS),
            retry_backoff_secs: Some(DEFAULT_RETRY_BACKOFF_SECS),
            reconnect_retry_delay_ms: Some(DEFAULT_RECONNECT_RETRY_DELAY_MS),
            bulk_chunk_size: Some(DEFAULT_BULK_CHUNK_SIZE),
        }
    }
}

impl PnwClientConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with the given API key and default values.
    #[must_use]
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Resolves the credential from the configured key or the environment.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        Credential::resolve(self.api_key.clone())
    }

    /// Returns the GraphQL endpoint, considering overrides.
    #[must_use]
    pub fn graphql_url(&self) -> String {
        self.base_url_graphql
            .clone()
            .unwrap_or_else(|| PNW_GRAPHQL_URL.to_string())
    }

    /// Returns the control plane base URL, considering overrides.
    #[must_use]
    pub fn control_url(&self) -> String {
        self.base_url_control
            .clone()
            .unwrap_or_else(|| PNW_CONTROL_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    /// Returns the push socket URL, considering overrides.
    #[must_use]
    pub fn ws_url(&self) -> String {
        self.base_url_ws
            .clone()
            .unwrap_or_else(|| PNW_WS_URL.to_string())
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn ws_connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.ws_connect_timeout_secs
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.unwrap_or(DEFAULT_IDLE_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_secs(
            self.subscribe_timeout_secs
                .unwrap_or(DEFAULT_SUBSCRIBE_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(
            self.shutdown_grace_secs
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS),
        )
    }

    #[must_use]
    pub fn ban_backoff(&self) -> Duration {
        Duration::from_secs(self.ban_backoff_secs.unwrap_or(DEFAULT_BAN_BACKOFF_SECS))
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs.unwrap_or(DEFAULT_RETRY_BACKOFF_SECS))
    }

    #[must_use]
    pub fn reconnect_retry_delay(&self) -> Duration {
        Duration::from_millis(
            self.reconnect_retry_delay_ms
                .unwrap_or(DEFAULT_RECONNECT_RETRY_DELAY_MS),
        )
    }

    #[must_use]
    pub fn max_rate_limit_retries(&self) -> u32 {
        self.max_rate_limit_retries
            .unwrap_or(DEFAULT_RATE_LIMIT_RETRIES)
    }

    #[must_use]
    pub fn bulk_chunk_size(&self) -> usize {
        self.bulk_chunk_size.unwrap_or(DEFAULT_BULK_CHUNK_SIZE)
    }
}
