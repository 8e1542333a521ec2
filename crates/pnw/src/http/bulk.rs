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

//! Chunked, concurrent GraphQL requests.

use futures_util::future::try_join_all;
use serde_json::{Map, Value};

use super::{
    client::PnwHttpClient,
    error::{PnwBuildError, PnwHttpError},
    query::Selection,
};

/// Accumulates root selections and posts them in concurrent chunks.
///
/// Paged selections inserted under a group are aliased `{group}_{n}` so they can share a
/// request, and their list results are concatenated back under `group` after fetching.
#[derive(Debug)]
pub struct BulkQuery {
    client: PnwHttpClient,
    chunk_size: usize,
    queries: Vec<String>,
    page_groups: Vec<(String, usize)>,
}

impl BulkQuery {
    /// Creates an empty bulk query.
    ///
    /// # Errors
    ///
    /// Returns [`PnwBuildError::InvalidChunkSize`] if `chunk_size` is zero.
    pub fn new(client: PnwHttpClient, chunk_size: usize) -> Result<Self, PnwBuildError> {
        if chunk_size == 0 {
            return Err(PnwBuildError::InvalidChunkSize(chunk_size));
        }

        Ok(Self {
            client,
            chunk_size,
            queries: Vec::new(),
            page_groups: Vec::new(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Adds a rendered root selection; duplicates collapse.
    pub fn insert_raw(&mut self, query: impl Into<String>) {
        let query = query.into();
        if !self.queries.contains(&query) {
            self.queries.push(query);
        }
    }

    /// Adds a typed root selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection fails to render.
    pub fn insert(&mut self, selection: &Selection) -> Result<(), PnwBuildError> {
        let rendered = selection.build()?;
        self.insert_raw(rendered);
        Ok(())
    }

    /// Adds one page of a paginated selection under `group`.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection fails to render.
    pub fn insert_paged(&mut self, group: &str, selection: Selection) -> Result<(), PnwBuildError> {
        let page = match self.page_groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                self.page_groups.push((group.to_string(), 1));
                1
            }
        };

        let rendered = selection.alias(format!("{group}_{page}")).build()?;
        self.queries.push(rendered);
        Ok(())
    }

    /// Returns the request payloads, one per chunk.
    #[must_use]
    pub fn chunks(&self) -> Vec<String> {
        self.queries
            .chunks(self.chunk_size)
            .map(|chunk| chunk.join("\n"))
            .collect()
    }

    /// Posts every chunk concurrently and merges the returned `data` objects.
    ///
    /// # Errors
    ///
    /// Returns [`PnwBuildError::EmptyQuery`] if nothing was inserted, otherwise the first
    /// error of any chunk.
    pub async fn get(&self) -> Result<Map<String, Value>, PnwHttpError> {
        if self.queries.is_empty() {
            return Err(PnwBuildError::EmptyQuery.into());
        }

        let chunks = self.chunks();
        tracing::debug!(
            "Posting {} queries in {} chunks",
            self.queries.len(),
            chunks.len()
        );

        let responses =
            try_join_all(chunks.iter().map(|chunk| self.client.get_query(chunk))).await?;

        let mut results = Map::new();
        for response in responses {
            match response {
                Value::Object(data) => results.extend(data),
                other => {
                    return Err(PnwHttpError::ResponseFormat(format!(
                        "Expected object data, received {other}"
                    )));
                }
            }
        }

        merge_pages(&mut results, &self.page_groups);
        Ok(results)
    }
}

/// Concatenates aliased page results back under their group key.
fn merge_pages(results: &mut Map<String, Value>, page_groups: &[(String, usize)]) {
    for (group, count) in page_groups {
        let mut combined = Vec::new();

        for page in 1..=*count {
            match results.remove(&format!("{group}_{page}")) {
                Some(Value::Array(items)) => combined.extend(items),
                Some(Value::Object(mut paginator)) => match paginator.remove("data") {
                    Some(Value::Array(items)) => combined.extend(items),
                    Some(other) => combined.push(other),
                    None => combined.push(Value::Object(paginator)),
                },
                Some(other) => combined.push(other),
                None => tracing::warn!("Missing page {page} of group {group}"),
            }
        }

        results.insert(group.clone(), Value::Array(combined));
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::config::PnwClientConfig;

    #[fixture]
    fn client() -> PnwHttpClient {
        PnwHttpClient::new(&PnwClientConfig::with_api_key("test-key-0000")).unwrap()
    }

    #[rstest]
    fn test_zero_chunk_size_rejected(client: PnwHttpClient) {
        let err = BulkQuery::new(client, 0).unwrap_err();
        assert_eq!(err, PnwBuildError::InvalidChunkSize(0));
    }

    #[rstest]
    fn test_chunks_split_and_dedupe(client: PnwHttpClient) {
        let mut bulk = BulkQuery::new(client, 2).unwrap();
        bulk.insert_raw("a {id}");
        bulk.insert_raw("b {id}");
        bulk.insert_raw("a {id}");
        bulk.insert_raw("c {id}");

        assert_eq!(bulk.len(), 3);
        assert_eq!(bulk.chunks(), vec!["a {id}\nb {id}", "c {id}"]);
    }

    #[rstest]
    fn test_insert_paged_aliases(client: PnwHttpClient) {
        let mut bulk = BulkQuery::new(client, 10).unwrap();
        for page in 1..=2 {
            let selection = Selection::new("nations")
                .arg("page", page)
                .sub(Selection::new("data").field("id"));
            bulk.insert_paged("nations", selection).unwrap();
        }

        assert_eq!(
            bulk.chunks(),
            vec![
                "nations_1: nations(page:1) {data {id}}\nnations_2: nations(page:2) {data {id}}"
            ]
        );
    }

    #[rstest]
    fn test_merge_pages() {
        let mut results = json!({
            "nations_1": {"data": [{"id": 1}, {"id": 2}]},
            "nations_2": {"data": [{"id": 3}]},
            "me": {"key": "x"},
        })
        .as_object()
        .cloned()
        .unwrap();

        merge_pages(&mut results, &[("nations".to_string(), 2)]);

        assert_eq!(results["nations"], json!([{"id": 1}, {"id": 2}, {"id": 3}]));
        assert!(!results.contains_key("nations_1"));
        assert_eq!(results["me"]["key"], "x");
    }

    #[tokio::test]
    async fn test_get_empty_is_build_error() {
        let client = PnwHttpClient::new(&PnwClientConfig::with_api_key("test-key-0000")).unwrap();
        let bulk = BulkQuery::new(client, 10).unwrap();

        let err = bulk.get().await.unwrap_err();
        assert!(matches!(err, PnwHttpError::BuildError(PnwBuildError::EmptyQuery)));
    }
}
