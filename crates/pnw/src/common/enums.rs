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

//! Enumerations for the Politics and War push protocol.

use std::time::Duration;

use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::consts::{CLOSE_CODES_BAN, CLOSE_CODES_RETRY};

/// Push protocol event names.
///
/// Anything that is not a protocol event is an application event delivered on a
/// subscribed channel, captured by [`PnwWsEvent::Channel`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumString)]
pub enum PnwWsEvent {
    #[strum(serialize = "pusher:connection_established")]
    ConnectionEstablished,
    #[strum(serialize = "pusher_internal:subscription_succeeded")]
    SubscriptionSucceeded,
    #[strum(serialize = "pusher:ping")]
    Ping,
    #[strum(serialize = "pusher:pong")]
    Pong,
    #[strum(serialize = "pusher:subscribe")]
    Subscribe,
    #[strum(serialize = "pusher:unsubscribe")]
    Unsubscribe,
    #[strum(serialize = "pusher:error")]
    Error,
    #[strum(default)]
    Channel(String),
}

impl PnwWsEvent {
    /// Returns the wire name of the event.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ConnectionEstablished => "pusher:connection_established",
            Self::SubscriptionSucceeded => "pusher_internal:subscription_succeeded",
            Self::Ping => "pusher:ping",
            Self::Pong => "pusher:pong",
            Self::Subscribe => "pusher:subscribe",
            Self::Unsubscribe => "pusher:unsubscribe",
            Self::Error => "pusher:error",
            Self::Channel(name) => name,
        }
    }

    /// Parses an event name, never failing: unknown names become [`PnwWsEvent::Channel`].
    #[must_use]
    pub fn parse(event: &str) -> Self {
        event
            .parse()
            .unwrap_or_else(|_| Self::Channel(event.to_string()))
    }
}

impl std::fmt::Display for PnwWsEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a WebSocket close code into a reconnect back-off.
#[derive(
    Clone, Copy, Debug, Display, PartialEq, Eq, Hash, AsRefStr, EnumIter, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum CloseCodeBand {
    /// Server refused the connection and should not be retried soon (4000-4099).
    Ban,
    /// Server asked the client to reconnect after a short pause (4100-4199).
    Retry,
    /// Any other code: reconnect straight away.
    Immediate,
}

impl CloseCodeBand {
    /// Classifies a close code (`None` when the socket ended without a close frame).
    #[must_use]
    pub fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(code) if CLOSE_CODES_BAN.contains(&code) => Self::Ban,
            Some(code) if CLOSE_CODES_RETRY.contains(&code) => Self::Retry,
            _ => Self::Immediate,
        }
    }

    /// Returns the back-off to apply before reconnecting.
    #[must_use]
    pub fn backoff(self, ban: Duration, retry: Duration) -> Duration {
        match self {
            Self::Ban => ban,
            Self::Retry => retry,
            Self::Immediate => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("pusher:connection_established", PnwWsEvent::ConnectionEstablished)]
    #[case("pusher_internal:subscription_succeeded", PnwWsEvent::SubscriptionSucceeded)]
    #[case("pusher:ping", PnwWsEvent::Ping)]
    #[case("pusher:pong", PnwWsEvent::Pong)]
    #[case("pusher:error", PnwWsEvent::Error)]
    #[case("NATION_UPDATE", PnwWsEvent::Channel("NATION_UPDATE".to_string()))]
    fn test_event_parse(#[case] raw: &str, #[case] expected: PnwWsEvent) {
        let event = PnwWsEvent::parse(raw);
        assert_eq!(event, expected);
        assert_eq!(event.as_str(), raw);
    }

    #[rstest]
    #[case(Some(4000), CloseCodeBand::Ban)]
    #[case(Some(4099), CloseCodeBand::Ban)]
    #[case(Some(4100), CloseCodeBand::Retry)]
    #[case(Some(4199), CloseCodeBand::Retry)]
    #[case(Some(4200), CloseCodeBand::Immediate)]
    #[case(Some(1006), CloseCodeBand::Immediate)]
    #[case(None, CloseCodeBand::Immediate)]
    fn test_close_code_band(#[case] code: Option<u16>, #[case] expected: CloseCodeBand) {
        assert_eq!(CloseCodeBand::from_code(code), expected);
    }

    #[rstest]
    fn test_close_code_backoff() {
        let ban = Duration::from_secs(600);
        let retry = Duration::from_secs(1);

        assert_eq!(CloseCodeBand::Ban.backoff(ban, retry), ban);
        assert_eq!(CloseCodeBand::Retry.backoff(ban, retry), retry);
        assert_eq!(CloseCodeBand::Immediate.backoff(ban, retry), Duration::ZERO);
    }
}
