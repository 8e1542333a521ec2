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

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::{future::Future, time::Duration};

/// Polls `condition` until it returns `true`, panicking after `timeout`.
pub async fn wait_until_async<F, Fut>(mut condition: F, timeout: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if condition().await {
            return;
        }

        assert!(
            tokio::time::Instant::now() < deadline,
            "Condition not met within {timeout:?}"
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// API key used by every mock-server test.
pub const TEST_API_KEY: &str = "test-api-key-0123456789";
