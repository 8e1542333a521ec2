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

//! Politics and War WebSocket client error types.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use crate::http::error::PnwHttpError;

/// Error types for the subscription socket client.
#[derive(Debug, Clone, Error)]
pub enum PnwWsError {
    /// Operation invoked in an incompatible lifecycle state (closing, already running, not running).
    #[error("State error: {0}")]
    State(String),
    /// The control plane refused to hand out a channel, or the confirmation never arrived.
    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),
    /// The control plane refused to authorize the channel for this connection.
    #[error("Authorize failed: HTTP {status}")]
    AuthorizeFailed { status: u16 },
    /// Client is not connected.
    #[error("Not connected")]
    NotConnected,
    /// The peer reset the connection.
    #[error("Connection reset: {0}")]
    ConnectionReset(String),
    /// Transport-level error during WebSocket communication.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Failed to send message over WebSocket.
    #[error("Send error: {0}")]
    Send(String),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),
    /// Control plane HTTP failure other than subscribe/authorize rejection.
    #[error("HTTP error: {0}")]
    Http(String),
    /// Request timeout.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// WebSocket transport error from tungstenite.
    #[error("Tungstenite error: {0}")]
    Tungstenite(String),
}

impl PnwWsError {
    /// Returns `true` when the error means the peer dropped the connection.
    #[must_use]
    pub fn is_connection_reset(&self) -> bool {
        matches!(self, Self::ConnectionReset(_))
    }
}

impl From<tungstenite::Error> for PnwWsError {
    fn from(error: tungstenite::Error) -> Self {
        match &error {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                Self::ConnectionReset(error.to_string())
            }
            tungstenite::Error::Io(io)
                if matches!(
                    io.kind(),
                    std::io::ErrorKind::ConnectionReset
                        | std::io::ErrorKind::ConnectionAborted
                        | std::io::ErrorKind::BrokenPipe
                ) =>
            {
                Self::ConnectionReset(error.to_string())
            }
            tungstenite::Error::Protocol(
                tungstenite::error::ProtocolError::ResetWithoutClosingHandshake,
            ) => Self::ConnectionReset(error.to_string()),
            _ => Self::Tungstenite(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for PnwWsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<PnwHttpError> for PnwWsError {
    fn from(error: PnwHttpError) -> Self {
        match error {
            PnwHttpError::ChannelRequestFailed(msg) => Self::SubscribeFailed(msg),
            PnwHttpError::AuthorizeFailed { status, .. } => Self::AuthorizeFailed { status },
            other => Self::Http(other.to_string()),
        }
    }
}

/// Result type alias for WebSocket operations.
pub type PnwWsResult<T> = Result<T, PnwWsError>;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_reset_classification() {
        let err = PnwWsError::from(tungstenite::Error::ConnectionClosed);
        assert!(err.is_connection_reset());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = PnwWsError::from(tungstenite::Error::Io(io));
        assert!(err.is_connection_reset());

        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = PnwWsError::from(tungstenite::Error::Io(io));
        assert!(!err.is_connection_reset());
    }

    #[rstest]
    fn test_http_error_mapping() {
        let err = PnwWsError::from(PnwHttpError::ChannelRequestFailed("bad model".to_string()));
        assert!(matches!(err, PnwWsError::SubscribeFailed(msg) if msg == "bad model"));

        let err = PnwWsError::from(PnwHttpError::AuthorizeFailed {
            status: 403,
            body: String::new(),
        });
        assert!(matches!(err, PnwWsError::AuthorizeFailed { status: 403 }));

        let err = PnwWsError::from(PnwHttpError::ServiceUnavailable);
        assert!(matches!(err, PnwWsError::Http(_)));
    }
}
