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

//! Error structures and enumerations for the Politics and War HTTP integration.

use reqwest::StatusCode;
use thiserror::Error;

use crate::common::consts::CLOUDFLARE_STATUS_CODES;

/// Build error for client-side query validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PnwBuildError {
    /// An object selection was built without any fields.
    #[error("Field `{0}` must have a sub selection")]
    MissingSubSelection(String),
    /// A query or bulk request was built without any root selection.
    #[error("Query has no selections")]
    EmptyQuery,
    /// Bulk chunk size must be at least one.
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(usize),
}

/// A typed error enumeration for the Politics and War HTTP client.
#[derive(Debug, Clone, Error)]
pub enum PnwHttpError {
    /// No API key configured and none found in the environment.
    #[error("Missing API key")]
    MissingCredentials,
    /// The GraphQL query failed to parse.
    #[error("Query syntax error: {0}")]
    QuerySyntax(String),
    /// The query asked for a field that does not exist or used it incorrectly.
    #[error("Query field error: {0}")]
    QueryField(String),
    /// The query passed an argument the field does not accept.
    #[error("Query argument invalid: {0}")]
    ArgumentInvalid(String),
    /// The server rejected the API key.
    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
    /// An object field was queried without a sub selection.
    #[error("Query missing sub selection: {0}")]
    MissingSubSelection(String),
    /// HTTP 503; usually a burst of too many parallel requests.
    #[error("Service unavailable")]
    ServiceUnavailable,
    /// Rate limit still exceeded after the configured retries.
    #[error("Rate limit hit, resets at {reset:?}")]
    RateLimited { reset: Option<i64> },
    /// Cloudflare interrupted the connection to the origin.
    #[error("Cloudflare error: HTTP {status}")]
    Cloudflare { status: u16 },
    /// The control plane reported an error instead of a channel name.
    #[error("Channel request failed: {0}")]
    ChannelRequestFailed(String),
    /// The control plane refused a channel authorization.
    #[error("Channel authorization failed: HTTP {status}: {body}")]
    AuthorizeFailed { status: u16, body: String },
    /// The API returned an error message with no specific mapping.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    /// The response body matched no expected shape.
    #[error("Response format error: {0}")]
    ResponseFormat(String),
    /// Any unknown HTTP status.
    #[error("Unexpected HTTP status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    /// Failure during JSON serialization/deserialization.
    #[error("JSON error: {0}")]
    JsonError(String),
    /// Transport level failure.
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Client-side query validation failure.
    #[error("Build error: {0}")]
    BuildError(#[from] PnwBuildError),
}

impl From<serde_json::Error> for PnwHttpError {
    fn from(error: serde_json::Error) -> Self {
        Self::JsonError(error.to_string())
    }
}

impl From<reqwest::Error> for PnwHttpError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::JsonError(error.to_string())
        } else {
            Self::NetworkError(error.to_string())
        }
    }
}

impl PnwHttpError {
    /// Classifies a non-success status that is not handled by the rate limiter.
    ///
    /// Returns `None` for statuses that should be read as a GraphQL body.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Option<Self> {
        let code = status.as_u16();

        if CLOUDFLARE_STATUS_CODES.contains(&code) {
            return Some(Self::Cloudflare { status: code });
        }

        match status {
            StatusCode::UNAUTHORIZED => Some(Self::InvalidApiKey(body.to_string())),
            StatusCode::SERVICE_UNAVAILABLE => Some(Self::ServiceUnavailable),
            // GraphQL reports query errors with 200 or 400 and an `errors` body
            StatusCode::OK | StatusCode::BAD_REQUEST => None,
            _ if status.is_success() => None,
            _ => Some(Self::UnexpectedStatus {
                status: code,
                body: body.to_string(),
            }),
        }
    }

    /// Classifies the first GraphQL error message.
    #[must_use]
    pub fn from_graphql_message(message: &str) -> Self {
        let lower = message.to_lowercase();

        if lower.contains("cannot query field") {
            Self::QueryField(message.to_string())
        } else if lower.contains("must have a sub selection")
            || lower.contains("must have a selection of subfields")
        {
            Self::MissingSubSelection(message.to_string())
        } else if lower.contains("syntax error") {
            Self::QuerySyntax(message.to_string())
        } else if lower.contains("unknown argument") {
            Self::ArgumentInvalid(message.to_string())
        } else if lower.contains("invalid api_key") || lower.contains("invalid api key") {
            Self::InvalidApiKey(message.to_string())
        } else {
            Self::UnexpectedResponse(message.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Cannot query field \"foo\" on type \"Nation\".", "QueryField")]
    #[case("Field \"nations\" of type \"NationPaginator\" must have a sub selection.", "MissingSubSelection")]
    #[case("Syntax Error: Expected Name, found <EOF>.", "QuerySyntax")]
    #[case("Unknown argument \"bogus\" on field \"nations\".", "ArgumentInvalid")]
    #[case("invalid api_key", "InvalidApiKey")]
    #[case("Something else broke", "UnexpectedResponse")]
    fn test_graphql_message_classification(#[case] message: &str, #[case] expected: &str) {
        let error = PnwHttpError::from_graphql_message(message);
        let variant = format!("{error:?}");
        assert!(variant.starts_with(expected), "{variant} != {expected}");
    }

    #[rstest]
    #[case(520)]
    #[case(521)]
    #[case(522)]
    fn test_cloudflare_status(#[case] code: u16) {
        let status = StatusCode::from_u16(code).unwrap();
        let error = PnwHttpError::from_status(status, "").unwrap();
        assert!(matches!(error, PnwHttpError::Cloudflare { status } if status == code));
    }

    #[rstest]
    fn test_status_classification() {
        assert!(matches!(
            PnwHttpError::from_status(StatusCode::UNAUTHORIZED, "nope"),
            Some(PnwHttpError::InvalidApiKey(_))
        ));
        assert!(matches!(
            PnwHttpError::from_status(StatusCode::SERVICE_UNAVAILABLE, ""),
            Some(PnwHttpError::ServiceUnavailable)
        ));
        assert!(PnwHttpError::from_status(StatusCode::OK, "").is_none());
        assert!(PnwHttpError::from_status(StatusCode::BAD_REQUEST, "").is_none());
        assert!(matches!(
            PnwHttpError::from_status(StatusCode::IM_A_TEAPOT, "tea"),
            Some(PnwHttpError::UnexpectedStatus { status: 418, .. })
        ));
    }

    #[rstest]
    fn test_build_error_display() {
        let error = PnwBuildError::MissingSubSelection("nations".to_string());
        assert_eq!(error.to_string(), "Field `nations` must have a sub selection");

        let error = PnwHttpError::from(PnwBuildError::InvalidChunkSize(0));
        assert_eq!(error.to_string(), "Build error: Invalid chunk size: 0");
    }

    #[rstest]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json")
            .expect_err("Should fail to parse");
        let http_err = PnwHttpError::from(json_err);

        assert!(matches!(http_err, PnwHttpError::JsonError(_)));
    }
}
