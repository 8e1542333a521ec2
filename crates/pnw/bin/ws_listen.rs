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

//! Example binary subscribing to a Politics and War push channel.
//!
//! Logs every payload received for the given model and event until interrupted.
//!
//! # Environment Variables
//!
//! - `PNW_API_KEY`: Your Politics and War API key
//!
//! # Usage
//!
//! ```bash
//! cargo run -p pnw --bin pnw-ws-listen -- nation update
//! ```

use std::env;

use pnw::{
    config::PnwClientConfig,
    websocket::{client::PnwWebSocketClient, listener::callback},
};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    let model = args.get(1).map_or("nation", String::as_str).to_string();
    let event = args.get(2).map_or("update", String::as_str).to_string();

    let client = PnwWebSocketClient::new(PnwClientConfig::new())?;
    client.run().await?;

    let handle = client.register(
        model.clone(),
        event.clone(),
        callback(|listener, payload| async move {
            tracing::info!("{}/{}: {payload}", listener.model(), listener.event());
        }),
    );

    tracing::info!("Listening for {model}/{event}... Press Ctrl+C to exit");
    signal::ctrl_c().await?;

    tracing::info!("Received SIGINT, stopping client...");
    handle.unsubscribe().await?;
    client.stop().await?;

    tracing::info!("Push socket example finished");
    Ok(())
}
