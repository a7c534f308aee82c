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

//! Role permission matrix handlers

use crate::auth::SessionContext;
use crate::error::ApiResult;
use crate::handlers::{json_response, parse_json};
use crate::models::{RolePermissionsUpdateRequest, RolePermissionsUpdateResponse};
use crate::rbac::{AuditLogger, RolePermissionMatrix};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use std::sync::Arc;
use tracing::info;

/// List the role permission matrix
/// GET /api/v1/role-permissions
#[utoipa::path(
    get,
    path = "/api/v1/role-permissions",
    responses(
        (status = 200, description = "Matrix ordered by role then permission", body = [crate::rbac::RolePermission]),
        (status = 403, description = "Site administrators only")
    ),
    security(("bearer_auth" = [])),
    tag = "Administration"
)]
pub async fn list_role_permissions(session: &SessionContext, matrix: Arc<RolePermissionMatrix>) -> ApiResult<Response<Full<Bytes>>> {
    session.require_site_admin()?;
    json_response(StatusCode::OK, &matrix.list())
}

/// Toggle role permissions
/// PUT /api/v1/role-permissions
#[utoipa::path(
    put,
    path = "/api/v1/role-permissions",
    request_body = RolePermissionsUpdateRequest,
    responses(
        (status = 200, description = "Changes applied", body = crate::models::RolePermissionsUpdateResponse),
        (status = 400, description = "Unknown key or locked role"),
        (status = 403, description = "Site administrators only")
    ),
    security(("bearer_auth" = [])),
    tag = "Administration"
)]
pub async fn update_role_permissions(body: Bytes, session: &SessionContext, matrix: Arc<RolePermissionMatrix>, audit: Arc<AuditLogger>) -> ApiResult<Response<Full<Bytes>>> {
    let caller = session.require_site_admin()?;
    let request: RolePermissionsUpdateRequest = parse_json(&body)?;

    let changed = matrix.apply(&request.updates)?;
    info!("Role permissions updated by {}: {} change(s)", caller.user_id, changed);
    audit.log_role_permissions_updated(caller.user_id, changed).await;

    json_response(StatusCode::OK, &RolePermissionsUpdateResponse { success: true, changed })
}
