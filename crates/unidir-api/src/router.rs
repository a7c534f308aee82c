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

//! HTTP routing for the REST API

use crate::admin::{self, AdminManager, UnitManager};
use crate::auth::{AuthService, SessionContext};
use crate::config::Config;
use crate::directory::OrgDirectory;
use crate::error::{ApiError, ApiResult};
use crate::handlers::{auth, directory, health, messages, permissions};
use crate::messaging::MessageFeed;
use crate::rbac::{AuditLogger, RolePermissionMatrix};
use crate::store::Stores;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Headers browsers may send on cross-origin requests
pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const CORS_ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// WebSocket endpoint of the live message feed
const MESSAGE_STREAM_PATH: &str = "/api/v1/messages/stream";

/// HTTP router for the REST API
pub struct Router {
    config: Config,
    auth_service: Arc<AuthService>,
    admin_manager: Arc<AdminManager>,
    unit_manager: Arc<UnitManager>,
    directory: Arc<OrgDirectory>,
    role_permissions: Arc<RolePermissionMatrix>,
    message_feed: Arc<MessageFeed>,
    audit: Arc<AuditLogger>,
    openapi_spec: String,
}

impl Router {
    /// Create a new router over the given backend and directory
    pub fn new(config: Config, stores: Stores, directory: Arc<OrgDirectory>) -> Self {
        let audit = Arc::new(AuditLogger::new());
        let auth_service = Arc::new(AuthService::new(&config.jwt_secret, config.token_ttl_secs, stores.clone(), audit.clone()));
        let admin_manager = Arc::new(AdminManager::new(stores.clone(), directory.clone(), audit.clone()));
        let message_feed = Arc::new(MessageFeed::new(stores.profiles.clone()));
        let role_permissions = Arc::new(RolePermissionMatrix::with_defaults());
        let unit_manager = Arc::new(UnitManager::new(directory.clone(), role_permissions.clone(), audit.clone()));

        Self {
            config,
            auth_service,
            admin_manager,
            unit_manager,
            directory,
            role_permissions,
            message_feed,
            audit,
            openapi_spec: generate_openapi_spec(),
        }
    }

    /// Answer a request; errors become JSON error responses and every
    /// response carries the CORS headers
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let origin = req.headers().get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(str::to_string);

        let mut response = match self.route(req).await {
            Ok(response) => response,
            Err(e) => Response::from(e),
        };

        self.apply_cors(&mut response, origin.as_deref());
        response
    }

    /// Route a request to the appropriate handler
    pub async fn route<B>(&self, req: Request<B>) -> ApiResult<Response<Full<Bytes>>>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let method = parts.method.clone();
        let path = parts.uri.path().to_string();

        info!("Routing request: {} {}", method, path);

        if method == Method::OPTIONS {
            return Ok(Response::builder().status(StatusCode::OK).body(Full::new(Bytes::from_static(b"ok")))?);
        }

        let session = if is_public_path(&method, &path) {
            None
        } else {
            let auth_header = match parts.headers.get(header::AUTHORIZATION) {
                Some(value) => Some(value.to_str().map_err(|_| {
                    warn!("Authorization header contains invalid UTF-8");
                    ApiError::unauthorized("Invalid authorization header encoding")
                })?),
                None => None,
            };
            let bearer = match (auth_header, path.as_str()) {
                (None, MESSAGE_STREAM_PATH) => access_token_param(parts.uri.query()).map(|token| format!("Bearer {}", token)),
                (header, _) => header.map(str::to_string),
            };
            Some(self.auth_service.resolve_session(bearer.as_deref()).await?)
        };

        // The upgrade handshake keeps the original request parts
        if method == Method::GET && path == MESSAGE_STREAM_PATH {
            return messages::stream_messages(Request::from_parts(parts, ()), require(&session)?, self.message_feed.clone()).await;
        }

        let body = self.read_body(body).await?;
        let segments: Vec<&str> = path.split('/').collect();

        match (&method, segments.as_slice()) {
            // Health and documentation
            (&Method::GET, ["", "api", "v1", "health"]) => health::health_check(self.directory.clone()).await,
            (&Method::GET, ["", "api", "v1", "version"]) => health::version_info().await,
            (&Method::GET, ["", "openapi.json"]) => self.serve_openapi_spec(),

            // Auth endpoints
            (&Method::POST, ["", "api", "v1", "auth", "signup"]) => auth::signup(body, self.auth_service.clone()).await,
            (&Method::POST, ["", "api", "v1", "auth", "login"]) => auth::login(body, self.auth_service.clone()).await,
            (&Method::GET, ["", "api", "v1", "auth", "session"]) => auth::session(require(&session)?).await,
            (&Method::PUT, ["", "api", "v1", "profile"]) => auth::update_profile(body, require(&session)?, self.auth_service.clone()).await,

            // Directory
            (&Method::GET, ["", "api", "v1", "universities"]) => directory::list_universities(self.directory.clone()).await,
            (&Method::GET, ["", "api", "v1", "universities", id, "colleges"]) => directory::list_colleges(id, self.directory.clone()).await,
            (&Method::GET, ["", "api", "v1", "colleges", id, "departments"]) => directory::list_departments(id, self.directory.clone()).await,
            (&Method::POST, ["", "api", "v1", "universities"]) => directory::create_university(body, require(&session)?, self.unit_manager.clone()).await,
            (&Method::PUT, ["", "api", "v1", "universities", id]) => directory::update_university(id, body, require(&session)?, self.unit_manager.clone()).await,
            (&Method::DELETE, ["", "api", "v1", "universities", id]) => directory::delete_university(id, require(&session)?, self.unit_manager.clone()).await,
            (&Method::POST, ["", "api", "v1", "universities", id, "colleges"]) => directory::create_college(id, body, require(&session)?, self.unit_manager.clone()).await,
            (&Method::PUT, ["", "api", "v1", "colleges", id]) => directory::update_college(id, body, require(&session)?, self.unit_manager.clone()).await,
            (&Method::DELETE, ["", "api", "v1", "colleges", id]) => directory::delete_college(id, require(&session)?, self.unit_manager.clone()).await,
            (&Method::POST, ["", "api", "v1", "colleges", id, "departments"]) => directory::create_department(id, body, require(&session)?, self.unit_manager.clone()).await,
            (&Method::PUT, ["", "api", "v1", "departments", id]) => directory::update_department(id, body, require(&session)?, self.unit_manager.clone()).await,
            (&Method::DELETE, ["", "api", "v1", "departments", id]) => directory::delete_department(id, require(&session)?, self.unit_manager.clone()).await,

            // Administration
            (&Method::POST, ["", "api", "v1", "manage-admin"]) => admin::handlers::manage_admin(body, require(&session)?, self.admin_manager.clone()).await,
            (&Method::GET, ["", "api", "v1", "admins"]) => admin::handlers::list_admins(require(&session)?, self.admin_manager.clone()).await,
            (&Method::GET, ["", "api", "v1", "users"]) => admin::handlers::list_users(require(&session)?, self.admin_manager.clone()).await,
            (&Method::GET, ["", "api", "v1", "role-permissions"]) => permissions::list_role_permissions(require(&session)?, self.role_permissions.clone()).await,
            (&Method::PUT, ["", "api", "v1", "role-permissions"]) => {
                permissions::update_role_permissions(body, require(&session)?, self.role_permissions.clone(), self.audit.clone()).await
            }

            // Messaging
            (&Method::GET, ["", "api", "v1", "messages"]) => messages::list_messages(require(&session)?, self.message_feed.clone()).await,
            (&Method::POST, ["", "api", "v1", "messages"]) => messages::send_message(body, require(&session)?, self.message_feed.clone()).await,
            (&Method::POST, ["", "api", "v1", "messages", id, "read"]) => messages::mark_read(id, require(&session)?, self.message_feed.clone()).await,

            _ => {
                warn!("Route not found: {} {}", method, path);
                Err(ApiError::not_found(format!("Route not found: {} {}", method, path)))
            }
        }
    }

    async fn read_body<B>(&self, body: B) -> ApiResult<Bytes>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        match Limited::new(body, self.config.max_body_size).collect().await {
            Ok(collected) => Ok(collected.to_bytes()),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(ApiError::bad_request(format!("Request body exceeds {} bytes", self.config.max_body_size))),
            Err(e) => Err(ApiError::bad_request(format!("Failed to read request body: {}", e))),
        }
    }

    fn apply_cors(&self, response: &mut Response<Full<Bytes>>, origin: Option<&str>) {
        let headers = response.headers_mut();

        if let Some(allowed) = self.config.allowed_origin(origin).and_then(|o| HeaderValue::from_str(&o).ok()) {
            if allowed != "*" {
                headers.insert(header::VARY, HeaderValue::from_static("Origin"));
            }
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        }
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(CORS_ALLOW_HEADERS));
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(CORS_ALLOW_METHODS));
    }

    /// Serve OpenAPI specification
    fn serve_openapi_spec(&self) -> ApiResult<Response<Full<Bytes>>> {
        Ok(Response::builder()
            .status(StatusCode::OK)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(self.openapi_spec.clone())))?)
    }

    /// Get the OpenAPI specification
    pub fn openapi_spec(&self) -> &str {
        &self.openapi_spec
    }

    pub fn auth_service(&self) -> Arc<AuthService> {
        self.auth_service.clone()
    }

    pub fn message_feed(&self) -> Arc<MessageFeed> {
        self.message_feed.clone()
    }

    pub fn audit(&self) -> Arc<AuditLogger> {
        self.audit.clone()
    }
}

fn require(session: &Option<SessionContext>) -> ApiResult<&SessionContext> {
    session.as_ref().ok_or_else(|| ApiError::unauthorized("Unauthorized"))
}

/// Requests served without a bearer token. Directory paths are public for reads only.
fn is_public_path(method: &Method, path: &str) -> bool {
    const PUBLIC_PATHS: [&str; 5] = ["/api/v1/health", "/api/v1/version", "/api/v1/auth/login", "/api/v1/auth/signup", "/openapi.json"];

    let directory_read = *method == Method::GET && (path == "/api/v1/universities" || path.starts_with("/api/v1/universities/") || path.starts_with("/api/v1/colleges/"));
    PUBLIC_PATHS.contains(&path) || directory_read
}

/// Token passed as `access_token=` in a query string
fn access_token_param(query: Option<&str>) -> Option<&str> {
    query?.split('&').find_map(|pair| pair.strip_prefix("access_token=")).filter(|token| !token.is_empty())
}

/// Generate OpenAPI specification
fn generate_openapi_spec() -> String {
    #[derive(OpenApi)]
    #[openapi(
        paths(
            // Health endpoints
            health::health_check,
            health::version_info,

            // Auth endpoints
            auth::signup,
            auth::login,
            auth::session,
            auth::update_profile,

            // Directory endpoints
            directory::list_universities,
            directory::list_colleges,
            directory::list_departments,
            directory::create_university,
            directory::update_university,
            directory::delete_university,
            directory::create_college,
            directory::update_college,
            directory::delete_college,
            directory::create_department,
            directory::update_department,
            directory::delete_department,

            // Administration endpoints
            admin::handlers::manage_admin,
            admin::handlers::list_admins,
            admin::handlers::list_users,
            permissions::list_role_permissions,
            permissions::update_role_permissions,

            // Messaging endpoints
            messages::send_message,
            messages::list_messages,
            messages::mark_read,
            messages::stream_messages,
        ),
        components(
            schemas(
                crate::models::TokenResponse,
                crate::models::LoginRequest,
                crate::models::SignupRequest,
                crate::models::SignupResponse,
                crate::models::SessionResponse,
                crate::models::ManageAdminResponse,
                crate::models::AdminListEntry,
                crate::models::AdminProfileSummary,
                crate::models::UserListEntry,
                crate::models::UserCounts,
                crate::models::UserListResponse,
                crate::models::RolePermissionsUpdateRequest,
                crate::models::RolePermissionsUpdateResponse,
                crate::models::SendMessageRequest,
                crate::models::DirectoryStats,
                crate::models::HealthResponse,
                crate::models::ApiVersion,
                crate::admin::CreateAdminRequest,
                crate::admin::ToggleActiveRequest,
                crate::admin::UpdatePasswordRequest,
                crate::rbac::AdminRole,
                crate::rbac::ScopeFields,
                crate::rbac::RoleAssignmentView,
                crate::rbac::PermissionKey,
                crate::rbac::PermissionUpdate,
                crate::rbac::RolePermission,
                crate::store::Profile,
                crate::store::ProfileChanges,
                crate::directory::University,
                crate::directory::College,
                crate::directory::Department,
                crate::directory::UnitFields,
                crate::messaging::Message,
                crate::messaging::MessageEntry,
                crate::messaging::FeedEvent,
            )
        ),
        tags(
            (name = "Health", description = "Health check and version endpoints"),
            (name = "Authentication", description = "Sign-up, sign-in, session and profile"),
            (name = "Directory", description = "Universities, colleges and departments"),
            (name = "Administration", description = "Scoped administrator management"),
            (name = "Messaging", description = "Direct messages and their live feed")
        ),
        modifiers(&SecurityAddon)
    )]
    struct ApiDoc;

    struct SecurityAddon;

    impl Modify for SecurityAddon {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(components) = openapi.components.as_mut() {
                components.add_security_scheme("bearer_auth", SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()))
            }
        }
    }

    ApiDoc::openapi().to_pretty_json().unwrap_or_else(|_| "{}".to_string())
}
