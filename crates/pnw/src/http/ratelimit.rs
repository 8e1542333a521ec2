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

//! Server-driven rate limiter for the GraphQL endpoint.
//!
//! The API reports its budget on every 429 through `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset` (unix seconds). The limiter stores the last reported pair and
//! [`RateLimiter::acquire`] sleeps until the reset instant when the budget is exhausted.

use std::{
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use reqwest::header::HeaderMap;

use crate::common::consts::{HEADER_RATELIMIT_REMAINING, HEADER_RATELIMIT_RESET};

const UNKNOWN: i64 = -1;

/// Holds the last reported `remaining`/`reset` pair.
#[derive(Debug)]
pub struct RateLimiter {
    remaining: AtomicI64,
    reset: AtomicI64,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Creates a limiter with no known budget; `acquire` never waits until updated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            remaining: AtomicI64::new(UNKNOWN),
            reset: AtomicI64::new(UNKNOWN),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Option<i64> {
        let value = self.remaining.load(Ordering::Acquire);
        (value != UNKNOWN).then_some(value)
    }

    #[must_use]
    pub fn reset(&self) -> Option<i64> {
        let value = self.reset.load(Ordering::Acquire);
        (value != UNKNOWN).then_some(value)
    }

    pub fn update(&self, remaining: i64, reset: i64) {
        self.reset.store(reset, Ordering::Release);
        self.remaining.store(remaining, Ordering::Release);
    }

    /// Updates the budget from response headers.
    ///
    /// Returns `false` (leaving state untouched) when either header is missing or malformed.
    pub fn update_from_headers(&self, headers: &HeaderMap) -> bool {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };

        match (parse(HEADER_RATELIMIT_REMAINING), parse(HEADER_RATELIMIT_RESET)) {
            (Some(remaining), Some(reset)) => {
                self.update(remaining, reset);
                true
            }
            _ => false,
        }
    }

    /// Returns how long a caller must wait at `now_ms` (unix milliseconds).
    #[must_use]
    pub fn wait_duration(&self, now_ms: i64) -> Option<Duration> {
        if self.remaining.load(Ordering::Acquire) != 0 {
            return None;
        }

        let reset = self.reset.load(Ordering::Acquire);
        if reset == UNKNOWN {
            return None;
        }

        let wait_ms = reset.saturating_mul(1_000).saturating_sub(now_ms);
        (wait_ms > 0).then(|| Duration::from_millis(wait_ms as u64))
    }

    /// Acquires permission to send, sleeping until the reset instant if the budget is spent.
    pub async fn acquire(&self) {
        let now_ms = chrono::Utc::now().timestamp_millis();

        if let Some(wait) = self.wait_duration(now_ms) {
            tracing::warn!("Rate limit exhausted, waiting {:.1}s for reset", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use rstest::rstest;
    use tracing_test::traced_test;

    use super::*;

    #[rstest]
    fn test_unknown_budget_never_waits() {
        let limiter = RateLimiter::new();

        assert_eq!(limiter.remaining(), None);
        assert_eq!(limiter.wait_duration(0), None);
    }

    #[rstest]
    fn test_exhausted_budget_waits_until_reset() {
        let limiter = RateLimiter::new();
        limiter.update(0, 1_000);

        assert_eq!(
            limiter.wait_duration(998_500),
            Some(Duration::from_millis(1_500))
        );
        assert_eq!(limiter.wait_duration(1_000_000), None);
        assert_eq!(limiter.wait_duration(1_200_000), None);
    }

    #[rstest]
    fn test_remaining_budget_does_not_wait() {
        let limiter = RateLimiter::new();
        limiter.update(5, 1_000);

        assert_eq!(limiter.wait_duration(0), None);
    }

    #[rstest]
    fn test_update_from_headers() {
        let limiter = RateLimiter::new();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_RATELIMIT_REMAINING, HeaderValue::from_static("0"));
        headers.insert(HEADER_RATELIMIT_RESET, HeaderValue::from_static("1700000000"));

        assert!(limiter.update_from_headers(&headers));
        assert_eq!(limiter.remaining(), Some(0));
        assert_eq!(limiter.reset(), Some(1_700_000_000));
    }

    #[rstest]
    fn test_update_from_headers_missing() {
        let limiter = RateLimiter::new();
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_RATELIMIT_REMAINING, HeaderValue::from_static("0"));

        assert!(!limiter.update_from_headers(&headers));
        assert_eq!(limiter.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_returns_immediately_with_budget() {
        let limiter = RateLimiter::new();
        limiter.update(10, i64::MAX / 2_000);

        let start = tokio::time::Instant::now();
        limiter.acquire().await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_acquire_sleeps_until_reset() {
        let limiter = RateLimiter::new();
        limiter.update(0, chrono::Utc::now().timestamp() + 2);

        let start = tokio::time::Instant::now();
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_secs(1));
        assert!(logs_contain("Rate limit exhausted"));
    }
}
