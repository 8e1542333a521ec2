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

//! Async client for the [Politics and War](https://politicsandwar.com) API.
//!
//! The `pnw` crate provides two clients:
//!
//! - **HTTP** ([`http::client::PnwHttpClient`]): posts GraphQL queries (single or bulk),
//!   classifies API errors into typed variants and honours the server rate limit. It also
//!   talks to the subscription control plane which hands out channel names and
//!   per-connection authorization tokens.
//! - **WebSocket** ([`websocket::client::PnwWebSocketClient`]): a long-lived subscription
//!   client for the Pusher-protocol push socket. It keeps the connection alive with a
//!   heartbeat, reconnects (backing off on server close codes), re-subscribes every
//!   registered listener after each reconnect, and dispatches channel events to listener
//!   callbacks as independent tasks.
//!
//! # Configuration
//!
//! Both clients are built from a [`config::PnwClientConfig`]. The API key may be passed
//! explicitly or resolved from the `PNW_API_KEY` environment variable.
//!
//! # Documentation
//!
//! - API reference: <https://politicsandwar.com/api/>
//! - Crate docs: <https://docs.rs/pnw>

#![warn(rustc::all)]
#![deny(unsafe_code)]
#![deny(nonstandard_style)]
#![deny(missing_debug_implementations)]
#![deny(clippy::missing_errors_doc)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod common;
pub mod config;
pub mod error;
pub mod http;
pub mod websocket;
