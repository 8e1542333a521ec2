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

//! Core constants for the Politics and War clients.

use std::ops::Range;

// Production URLs
pub const PNW_GRAPHQL_URL: &str = "https://api.politicsandwar.com/graphql";
pub const PNW_CONTROL_URL: &str = "https://api.politicsandwar.com";
pub const PNW_WS_URL: &str =
    "wss://socket.politicsandwar.com/app/a22734a47847a64386c8?protocol=7";

// Control plane paths
pub const PNW_SUBSCRIBE_PATH: &str = "/subscriptions/v1/subscribe";
pub const PNW_AUTH_PATH: &str = "/subscriptions/v1/auth";

/// Environment variable holding the API key.
pub const PNW_API_KEY_ENV: &str = "PNW_API_KEY";

pub const PNW_USER_AGENT: &str = concat!("pnw-rs/", env!("CARGO_PKG_VERSION"));

// Rate limit headers
pub const HEADER_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";
pub const HEADER_RATELIMIT_RESET: &str = "x-ratelimit-reset";

// Default timings (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SUBSCRIBE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 120;
pub const DEFAULT_BAN_BACKOFF_SECS: u64 = 600;
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 1;
pub const DEFAULT_RECONNECT_RETRY_DELAY_MS: u64 = 5_000;

/// Re-evaluation tick for the heartbeat while no connection is established.
pub const HEARTBEAT_IDLE_TICK_MS: u64 = 1_000;

pub const DEFAULT_BULK_CHUNK_SIZE: usize = 10;
pub const DEFAULT_RATE_LIMIT_RETRIES: u32 = 3;

// Close code bands
pub const CLOSE_CODES_BAN: Range<u16> = 4000..4100;
pub const CLOSE_CODES_RETRY: Range<u16> = 4100..4200;

/// Close code sent when the client tears a connection down to reconnect.
pub const CLOSE_CODE_PROTOCOL_ERROR: u16 = 1002;
pub const CLOSE_CODE_NORMAL: u16 = 1000;

/// Cloudflare origin failures.
pub const CLOUDFLARE_STATUS_CODES: [u16; 3] = [520, 521, 522];

pub const MUTEX_POISONED: &str = "Mutex poisoned";
