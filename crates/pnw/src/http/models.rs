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

//! Request and response payloads for the GraphQL endpoint and the subscription control plane.

use serde::{Deserialize, Serialize};

/// Body posted to the GraphQL endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct PnwGraphQlRequest<'a> {
    pub api_key: &'a str,
    pub query: String,
}

/// A single GraphQL error entry.
#[derive(Clone, Debug, Deserialize)]
pub struct PnwGraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

/// GraphQL response envelope: either `data`, `errors`, or (for malformed responses) neither.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PnwGraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<PnwGraphQlError>>,
}

/// Control plane reply to a channel request.
#[derive(Clone, Debug, Deserialize)]
pub struct PnwChannelResponse {
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Form body for channel authorization.
#[derive(Clone, Debug, Serialize)]
pub struct PnwAuthRequest<'a> {
    pub socket_id: &'a str,
    pub channel_name: &'a str,
}

/// Control plane reply to a channel authorization.
#[derive(Clone, Debug, Deserialize)]
pub struct PnwAuthResponse {
    pub auth: String,
}
