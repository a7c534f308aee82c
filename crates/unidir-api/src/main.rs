// Unidir
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unidir_api::{config::Config, server::ApiServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    info!("Starting university directory API");

    let config = Config::from_env();
    info!("Loaded configuration: bind_address={}", config.bind_address);

    let server = ApiServer::new(config).await.context("failed to initialise the API server")?;
    info!("API started on http://{}", server.bind_address());

    server.run().await.context("server terminated")?;

    Ok(())
}
