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

//! Provides the HTTP client for the GraphQL endpoint and the subscription control plane.

use std::{fmt::Debug, sync::Arc};

use reqwest::{StatusCode, Url, header::USER_AGENT};
use serde_json::Value;

use super::{
    bulk::BulkQuery,
    error::{PnwBuildError, PnwHttpError},
    models::{
        PnwAuthRequest, PnwAuthResponse, PnwChannelResponse, PnwGraphQlRequest,
        PnwGraphQlResponse,
    },
    query::{Selection, wrap_query},
    ratelimit::RateLimiter,
};
use crate::{
    common::{
        consts::{PNW_AUTH_PATH, PNW_SUBSCRIBE_PATH, PNW_USER_AGENT},
        credential::Credential,
    },
    config::PnwClientConfig,
};

/// HTTP client for Politics and War.
///
/// Cheap to clone: clones share the connection pool and the rate limiter.
#[derive(Clone)]
pub struct PnwHttpClient {
    client: reqwest::Client,
    credential: Credential,
    graphql_url: String,
    control_url: String,
    rate_limiter: Arc<RateLimiter>,
    max_rate_limit_retries: u32,
    bulk_chunk_size: usize,
}

impl Debug for PnwHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(PnwHttpClient))
            .field("graphql_url", &self.graphql_url)
            .field("control_url", &self.control_url)
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

impl PnwHttpClient {
    /// Creates a new [`PnwHttpClient`] from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key can be resolved or the underlying client cannot be built.
    pub fn new(config: &PnwClientConfig) -> Result<Self, PnwHttpError> {
        let credential = config
            .credential()
            .ok_or(PnwHttpError::MissingCredentials)?;

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| PnwHttpError::NetworkError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            credential,
            graphql_url: config.graphql_url(),
            control_url: config.control_url(),
            rate_limiter: Arc::new(RateLimiter::new()),
            max_rate_limit_retries: config.max_rate_limit_retries(),
            bulk_chunk_size: config.bulk_chunk_size(),
        })
    }

    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Posts a query built from a typed selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection is invalid or the request fails.
    pub async fn query(&self, selection: &Selection) -> Result<Value, PnwHttpError> {
        let rendered = selection.build()?;
        self.get_query(&rendered).await
    }

    /// Posts one or more root selections and returns the `data` object.
    ///
    /// A 429 updates the rate limiter from the response headers and retries after the
    /// reset instant, up to the configured number of retries.
    ///
    /// # Errors
    ///
    /// Returns the classified API error, [`PnwHttpError::RateLimited`] once retries are
    /// exhausted, or a network/format error.
    pub async fn get_query(&self, selections: &str) -> Result<Value, PnwHttpError> {
        if selections.trim().is_empty() {
            return Err(PnwBuildError::EmptyQuery.into());
        }

        let payload = PnwGraphQlRequest {
            api_key: self.credential.api_key(),
            query: wrap_query(selections),
        };
        let mut retries = 0;

        loop {
            self.rate_limiter.acquire().await;

            let response = self
                .client
                .post(&self.graphql_url)
                .header(USER_AGENT, PNW_USER_AGENT)
                .json(&payload)
                .send()
                .await?;

            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if !self.rate_limiter.update_from_headers(response.headers()) {
                    let reset = chrono::Utc::now().timestamp() + 1;
                    self.rate_limiter.update(0, reset);
                }

                if retries >= self.max_rate_limit_retries {
                    return Err(PnwHttpError::RateLimited {
                        reset: self.rate_limiter.reset(),
                    });
                }

                retries += 1;
                tracing::warn!(
                    "Rate limit hit (retry {retries}/{}), reset at {:?}",
                    self.max_rate_limit_retries,
                    self.rate_limiter.reset(),
                );
                continue;
            }

            let body = response.text().await?;

            if let Some(error) = PnwHttpError::from_status(status, &body) {
                return Err(error);
            }

            return parse_graphql_body(&body);
        }
    }

    /// Requests a channel name for the given model and event.
    ///
    /// # Errors
    ///
    /// Returns [`PnwHttpError::ChannelRequestFailed`] if the control plane reports an
    /// error or replies with an unexpected body.
    pub async fn request_channel(&self, model: &str, event: &str) -> Result<String, PnwHttpError> {
        let url = subscribe_url(&self.control_url, model, event)?;
        tracing::debug!(
            "Requesting channel for {model}/{event} (key {})",
            self.credential.masked_api_key()
        );

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, PNW_USER_AGENT)
            .query(&[("api_key", self.credential.api_key())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed: PnwChannelResponse = serde_json::from_str(&body).map_err(|_| {
            PnwHttpError::ChannelRequestFailed(format!("HTTP {}: {body}", status.as_u16()))
        })?;

        if let Some(error) = parsed.error {
            return Err(PnwHttpError::ChannelRequestFailed(error));
        }

        parsed.channel.ok_or_else(|| {
            PnwHttpError::ChannelRequestFailed(format!("No channel in response: {body}"))
        })
    }

    /// Authorizes `channel` for the connection identified by `socket_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PnwHttpError::AuthorizeFailed`] on any non-200 response.
    pub async fn authorize_channel(
        &self,
        socket_id: &str,
        channel: &str,
    ) -> Result<String, PnwHttpError> {
        let url = format!("{}{PNW_AUTH_PATH}", self.control_url);
        let form = PnwAuthRequest {
            socket_id,
            channel_name: channel,
        };

        let response = self
            .client
            .post(&url)
            .header(USER_AGENT, PNW_USER_AGENT)
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(PnwHttpError::AuthorizeFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PnwAuthResponse = serde_json::from_str(&body)
            .map_err(|e| PnwHttpError::ResponseFormat(format!("{e}: {body}")))?;

        Ok(parsed.auth)
    }

    /// Creates a bulk query using the configured chunk size.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured chunk size is zero.
    pub fn bulk_query(&self) -> Result<BulkQuery, PnwHttpError> {
        Ok(BulkQuery::new(self.clone(), self.bulk_chunk_size)?)
    }
}

fn parse_graphql_body(body: &str) -> Result<Value, PnwHttpError> {
    let parsed: PnwGraphQlResponse = serde_json::from_str(body)
        .map_err(|e| PnwHttpError::ResponseFormat(format!("{e}: {body}")))?;

    if let Some(errors) = parsed.errors
        && let Some(first) = errors.first()
    {
        return Err(PnwHttpError::from_graphql_message(&first.message));
    }

    match parsed.data {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(PnwHttpError::ResponseFormat(body.to_string())),
    }
}

/// Builds the channel request URL, encoding `model` and `event` as single path segments.
fn subscribe_url(control_url: &str, model: &str, event: &str) -> Result<Url, PnwHttpError> {
    let invalid = |reason: String| {
        PnwHttpError::ChannelRequestFailed(format!("Invalid control URL {control_url}: {reason}"))
    };

    let mut url = Url::parse(control_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| invalid("cannot be a base".to_string()))?
        .pop_if_empty()
        .extend(PNW_SUBSCRIBE_PATH.split('/').filter(|segment| !segment.is_empty()))
        .push(model)
        .push(event);

    Ok(url)
}
