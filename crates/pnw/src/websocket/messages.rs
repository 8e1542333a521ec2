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

//! Wire frames for the push socket.
//!
//! Every frame is a JSON object `{"event": ..., "data": ..., "channel": ...}`. Inbound
//! `data` is usually itself a JSON document encoded as a string; outbound `data` is a
//! plain object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::PnwWsResult;
use crate::common::enums::PnwWsEvent;

/// An inbound frame.
#[derive(Clone, Debug, Deserialize)]
pub struct PnwWsFrame {
    pub event: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl PnwWsFrame {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a frame envelope.
    pub fn parse(text: &str) -> PnwWsResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn event(&self) -> PnwWsEvent {
        PnwWsEvent::parse(&self.event)
    }

    /// Decodes the payload, unwrapping the string-encoded JSON document if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a string payload is not valid JSON.
    pub fn decode_data(&self) -> PnwWsResult<Value> {
        match &self.data {
            Some(Value::String(raw)) => Ok(serde_json::from_str(raw)?),
            Some(value) => Ok(value.clone()),
            None => Ok(Value::Null),
        }
    }
}

/// Payload of `pusher:connection_established`.
#[derive(Clone, Debug, Deserialize)]
pub struct PnwConnectionEstablished {
    pub socket_id: String,
    /// Server idle timeout in seconds.
    pub activity_timeout: u64,
}

#[derive(Debug, Serialize)]
struct PnwWsOutbound<'a, T: Serialize> {
    event: &'a str,
    data: T,
}

#[derive(Debug, Serialize)]
struct EmptyData {}

#[derive(Debug, Serialize)]
struct SubscribeData<'a> {
    auth: &'a str,
    channel: &'a str,
}

#[derive(Debug, Serialize)]
struct UnsubscribeData<'a> {
    channel: &'a str,
}

fn encode<T: Serialize>(event: &PnwWsEvent, data: T) -> String {
    let frame = PnwWsOutbound {
        event: event.as_str(),
        data,
    };
    // Infallible: all outbound payloads are plain string maps
    serde_json::to_string(&frame).unwrap_or_default()
}

#[must_use]
pub fn ping_frame() -> String {
    encode(&PnwWsEvent::Ping, EmptyData {})
}

#[must_use]
pub fn pong_frame() -> String {
    encode(&PnwWsEvent::Pong, EmptyData {})
}

#[must_use]
pub fn subscribe_frame(auth: &str, channel: &str) -> String {
    encode(&PnwWsEvent::Subscribe, SubscribeData { auth, channel })
}

#[must_use]
pub fn unsubscribe_frame(channel: &str) -> String {
    encode(&PnwWsEvent::Unsubscribe, UnsubscribeData { channel })
}
