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

//! Example binary posting a GraphQL query to Politics and War.
//!
//! Without arguments, fetches the nation attached to the API key.
//!
//! # Environment Variables
//!
//! - `PNW_API_KEY`: Your Politics and War API key
//!
//! # Usage
//!
//! ```bash
//! cargo run -p pnw --bin pnw-http-query
//! cargo run -p pnw --bin pnw-http-query -- 'game_info {game_date}'
//! ```

use std::env;

use pnw::{
    config::PnwClientConfig,
    http::{client::PnwHttpClient, query::Selection},
};
use tracing::level_filters::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let client = PnwHttpClient::new(&PnwClientConfig::new())?;

    let data = match env::args().nth(1) {
        Some(raw) => client.get_query(&raw).await?,
        None => {
            let selection = Selection::new("me").sub(
                Selection::new("nation").fields(["id", "nation_name", "leader_name", "score"]),
            );
            client.query(&selection).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&data)?);
    tracing::info!(
        "Rate limit remaining: {:?}",
        client.rate_limiter().remaining()
    );
    Ok(())
}
