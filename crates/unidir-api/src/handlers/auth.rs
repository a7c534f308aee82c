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

//! Authentication handlers

use crate::auth::{AuthService, SessionContext};
use crate::error::ApiResult;
use crate::handlers::{json_response, parse_json};
use crate::models::{LoginRequest, SignupRequest};
use crate::store::ProfileChanges;
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use std::sync::Arc;
use tracing::info;

/// Signup handler
/// POST /api/v1/auth/signup
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = crate::models::SignupResponse),
        (status = 400, description = "Invalid fields or email already registered")
    ),
    tag = "Authentication"
)]
pub async fn signup(body: Bytes, auth_service: Arc<AuthService>) -> ApiResult<Response<Full<Bytes>>> {
    info!("Processing signup request");

    let signup_request: SignupRequest = parse_json(&body)?;
    let created = auth_service.signup(signup_request).await?;

    json_response(StatusCode::CREATED, &created)
}

/// Login handler
/// POST /api/v1/auth/login
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::models::TokenResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is disabled"),
        (status = 400, description = "Bad request")
    ),
    tag = "Authentication"
)]
pub async fn login(body: Bytes, auth_service: Arc<AuthService>) -> ApiResult<Response<Full<Bytes>>> {
    info!("Processing login request");

    let login_request: LoginRequest = parse_json(&body)?;
    let token = auth_service.login(login_request).await?;

    info!("User authenticated successfully");
    json_response(StatusCode::OK, &token)
}

/// Current session
/// GET /api/v1/auth/session
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses(
        (status = 200, description = "Caller session", body = crate::models::SessionResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn session(session: &SessionContext) -> ApiResult<Response<Full<Bytes>>> {
    json_response(StatusCode::OK, &session.to_response())
}

/// Update own profile
/// PUT /api/v1/profile
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    request_body = ProfileChanges,
    responses(
        (status = 200, description = "Updated profile", body = crate::store::Profile),
        (status = 400, description = "Invalid fields"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Authentication"
)]
pub async fn update_profile(body: Bytes, session: &SessionContext, auth_service: Arc<AuthService>) -> ApiResult<Response<Full<Bytes>>> {
    let changes: ProfileChanges = parse_json(&body)?;
    let profile = auth_service.update_profile(session, changes).await?;

    info!("Profile updated for {}", session.user_id);
    json_response(StatusCode::OK, &profile)
}
