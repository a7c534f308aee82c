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

//! HTTP handlers for administrator management

use crate::admin::manager::{AdminManager, ManageAdminRequest};
use crate::auth::SessionContext;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{json_response, parse_json};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

/// Privileged administrator management
/// POST /api/v1/manage-admin
#[utoipa::path(
    post,
    path = "/api/v1/manage-admin",
    request_body(content = Object, description = "CreateAdminRequest, ToggleActiveRequest or UpdatePasswordRequest, selected by the `action` field"),
    responses(
        (status = 200, description = "Action applied", body = crate::models::ManageAdminResponse),
        (status = 400, description = "Invalid action or fields"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller may not perform this action"),
        (status = 404, description = "Role not found"),
        (status = 500, description = "Backend failure")
    ),
    security(("bearer_auth" = [])),
    tag = "Administration"
)]
pub async fn manage_admin(body: Bytes, session: &SessionContext, manager: Arc<AdminManager>) -> ApiResult<Response<Full<Bytes>>> {
    let value: Value = parse_json(&body)?;

    match value.get("action").and_then(Value::as_str) {
        Some(action) if ManageAdminRequest::ACTIONS.contains(&action) => {}
        _ => return Err(ApiError::bad_request("Invalid action")),
    }

    let request: ManageAdminRequest = serde_json::from_value(value)?;
    info!("Processing manage-admin request: {} by {}", request.action(), session.user_id);

    let response = manager.handle(session, request).await?;
    json_response(StatusCode::OK, &response)
}

/// Administrators manageable by the caller
/// GET /api/v1/admins
#[utoipa::path(
    get,
    path = "/api/v1/admins",
    responses(
        (status = 200, description = "Administrators, newest first", body = [crate::models::AdminListEntry]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller has no management rights")
    ),
    security(("bearer_auth" = [])),
    tag = "Administration"
)]
pub async fn list_admins(session: &SessionContext, manager: Arc<AdminManager>) -> ApiResult<Response<Full<Bytes>>> {
    let admins = manager.list_admins(session).await?;
    json_response(StatusCode::OK, &admins)
}

/// All users with their roles
/// GET /api/v1/users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Users and aggregate counts", body = crate::models::UserListResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Site administrators only")
    ),
    security(("bearer_auth" = [])),
    tag = "Administration"
)]
pub async fn list_users(session: &SessionContext, manager: Arc<AdminManager>) -> ApiResult<Response<Full<Bytes>>> {
    let users = manager.list_users(session).await?;
    json_response(StatusCode::OK, &users)
}
