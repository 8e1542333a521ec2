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

//! Crate-level error type.

use std::fmt;

use crate::{http::error::PnwHttpError, websocket::error::PnwWsError};

/// Top-level error type covering both clients.
#[derive(Debug)]
pub enum PnwError {
    /// HTTP client error.
    Http(PnwHttpError),
    /// WebSocket client error.
    WebSocket(PnwWsError),
    /// Configuration error.
    Config(String),
}

impl fmt::Display for PnwError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::WebSocket(e) => write!(f, "WebSocket error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for PnwError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(e) => Some(e),
            Self::WebSocket(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

impl From<PnwHttpError> for PnwError {
    fn from(err: PnwHttpError) -> Self {
        Self::Http(err)
    }
}

impl From<PnwWsError> for PnwError {
    fn from(err: PnwWsError) -> Self {
        Self::WebSocket(err)
    }
}

/// Result type for crate operations.
pub type PnwResult<T> = Result<T, PnwError>;
