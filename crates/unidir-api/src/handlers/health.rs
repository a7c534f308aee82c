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

//! Health check handlers

use crate::directory::OrgDirectory;
use crate::error::ApiResult;
use crate::handlers::json_response;
use crate::models::{ApiVersion, DirectoryStats, HealthResponse};
use chrono::Utc;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use std::sync::Arc;
use tracing::info;

/// Health check handler
/// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(directory: Arc<OrgDirectory>) -> ApiResult<Response<Full<Bytes>>> {
    info!("Processing health check request");

    let (universities, colleges, departments) = directory.counts();

    let health_response = HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        directory: DirectoryStats {
            universities,
            colleges,
            departments,
        },
    };

    json_response(StatusCode::OK, &health_response)
}

/// Version information handler
/// GET /api/v1/version
#[utoipa::path(
    get,
    path = "/api/v1/version",
    responses(
        (status = 200, description = "API version information", body = ApiVersion)
    ),
    tag = "Health"
)]
pub async fn version_info() -> ApiResult<Response<Full<Bytes>>> {
    info!("Processing version info request");

    let version_info = ApiVersion {
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: format!("{}+{}", env!("CARGO_PKG_VERSION"), option_env!("GIT_HASH").unwrap_or("unknown")),
        features: vec![
            "scoped_admin_roles".to_string(),
            "admin_management".to_string(),
            "organizational_directory".to_string(),
            "role_permissions".to_string(),
            "messaging".to_string(),
            "jwt_authentication".to_string(),
            "openapi_docs".to_string(),
            "cors_support".to_string(),
        ],
    };

    json_response(StatusCode::OK, &version_info)
}
