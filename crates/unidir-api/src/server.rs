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

//! HTTP server implementation using Hyper

use crate::config::Config;
use crate::directory::OrgDirectory;
use crate::error::{ApiError, ApiResult};
use crate::router::Router;
use crate::seed;
use crate::store::Stores;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{error, info};

/// API server using Hyper
pub struct ApiServer {
    bind_address: SocketAddr,
    router: Arc<Router>,
}

impl ApiServer {
    /// Create a new API server with the in-memory backend, seeded from the configuration
    pub async fn new(config: Config) -> ApiResult<Self> {
        let stores = Stores::in_memory();
        let directory = Arc::new(OrgDirectory::new());

        if let Some(path) = &config.seed_path {
            seed::load_directory_file(&directory, path)?;
        }
        if let Some(bootstrap) = &config.bootstrap_admin {
            seed::ensure_site_admin(&stores, bootstrap).await?;
        }

        Self::with_backend(config, stores, directory)
    }

    /// Create a server over an existing backend
    pub fn with_backend(config: Config, stores: Stores, directory: Arc<OrgDirectory>) -> ApiResult<Self> {
        let bind_address: SocketAddr = config.bind_address.parse().map_err(|e| ApiError::BadRequest {
            message: format!("Invalid bind address: {}", e),
        })?;

        let router = Arc::new(Router::new(config, stores, directory));

        info!("API server created successfully");

        Ok(Self { bind_address, router })
    }

    /// Get the bind address
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    pub fn router(&self) -> Arc<Router> {
        self.router.clone()
    }

    /// Start the server
    pub async fn run(self) -> ApiResult<()> {
        let listener = TcpListener::bind(self.bind_address).await?;
        self.serve(listener).await
    }

    /// Accept connections on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> ApiResult<()> {
        let local_addr = listener.local_addr()?;
        info!("University directory API listening on http://{}", local_addr);
        info!("OpenAPI document available at http://{}/openapi.json", local_addr);

        loop {
            let (stream, remote_addr) = match listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            };

            let io = TokioIo::new(stream);
            let router = self.router.clone();

            tokio::task::spawn(async move {
                let service = ServiceBuilder::new().service(service_fn(move |req: Request<Incoming>| {
                    let router = router.clone();
                    async move { Ok::<_, Infallible>(router.handle(req).await) }
                }));

                if let Err(err) = http1::Builder::new().serve_connection(io, service).with_upgrades().await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
