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

//! Authentication and session resolution

use crate::config::MAX_TOKEN_TTL_SECS;
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginRequest, SessionResponse, SignupRequest, SignupResponse, TokenResponse};
use crate::rbac::{AuditLogger, RoleAssignment, RoleAssignmentView};
use crate::store::{NewIdentity, Profile, ProfileChanges, Stores, validate_password};
use base64::Engine as _;
use base64::engine::general_purpose;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use metrics::counter;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

const ISSUER: &str = "unidir-api";
const AUDIENCE: &str = "unidir";

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    pub email: String,
}

impl Claims {
    /// Create new claims for a user
    pub fn new(user_id: Uuid, email: &str, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            iss: ISSUER.to_string(),
            aud: AUDIENCE.to_string(),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            email: email.to_string(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    pub fn user_id(&self) -> ApiResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| ApiError::unauthorized("Unauthorized"))
    }
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    /// Create a new JWT manager with a secret key
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[AUDIENCE]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Generate a random secret key
    pub fn generate_secret() -> ApiResult<String> {
        let rng = SystemRandom::new();
        let mut secret = vec![0u8; 32];
        rng.fill(&mut secret).map_err(|_| ApiError::internal("Failed to generate random secret"))?;
        Ok(general_purpose::STANDARD.encode(&secret))
    }

    /// Create a JWT token
    pub fn create_token(&self, claims: &Claims) -> ApiResult<String> {
        let header = Header::new(Algorithm::HS256);
        Ok(encode(&header, claims, &self.encoding_key)?)
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> ApiResult<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.is_expired() {
            return Err(ApiError::unauthorized("Token has expired"));
        }

        Ok(claims)
    }
}

/// Extract JWT token from Authorization header
pub fn extract_token_from_header(auth_header: &str) -> ApiResult<&str> {
    match auth_header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(ApiError::unauthorized("Invalid authorization header format")),
    }
}

/// Identity of the caller, resolved once per request and passed to handlers
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Option<RoleAssignment>,
    pub profile: Option<Profile>,
}

impl SessionContext {
    /// The caller's role assignment; callers without one are forbidden
    pub fn admin_role(&self) -> ApiResult<&RoleAssignment> {
        self.role.as_ref().ok_or_else(|| ApiError::forbidden("No admin role"))
    }

    /// Require an active site administrator
    pub fn require_site_admin(&self) -> ApiResult<&RoleAssignment> {
        let role = self.admin_role()?;
        if !role.is_active {
            return Err(ApiError::forbidden("Admin role is inactive"));
        }
        if role.role() != crate::rbac::AdminRole::SuperAdmin {
            return Err(ApiError::forbidden("No permission"));
        }
        Ok(role)
    }

    pub fn to_response(&self) -> SessionResponse {
        SessionResponse {
            user_id: self.user_id,
            email: self.email.clone(),
            profile: self.profile.clone(),
            role: self.role.as_ref().map(RoleAssignmentView::from),
        }
    }
}

/// Authentication service
pub struct AuthService {
    jwt_manager: JwtManager,
    stores: Stores,
    audit: Arc<AuditLogger>,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(jwt_secret: &str, token_ttl_secs: i64, stores: Stores, audit: Arc<AuditLogger>) -> Self {
        Self {
            jwt_manager: JwtManager::new(jwt_secret),
            stores,
            audit,
            token_ttl: Duration::seconds(token_ttl_secs.clamp(1, MAX_TOKEN_TTL_SECS)),
        }
    }

    /// Register a plain user account with its profile
    pub async fn signup(&self, request: SignupRequest) -> ApiResult<SignupResponse> {
        validate_password(&request.password).map_err(ApiError::bad_request)?;
        let full_name = request.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ApiError::bad_request("full_name is required"));
        }

        let identity = self
            .stores
            .identities
            .create_identity(NewIdentity {
                email: request.email,
                password: request.password,
                email_confirmed: false,
            })
            .await?;

        if let Err(e) = self.stores.profiles.insert(Profile::new(identity.id, Some(full_name))).await {
            warn!("Profile creation failed for new user {}, removing identity: {}", identity.id, e);
            if let Err(rollback) = self.stores.identities.delete_identity(identity.id).await {
                error!(user_id = %identity.id, "Orphaned identity left behind after failed signup: {}", rollback);
            }
            return Err(e.into());
        }

        info!("User signed up: {}", identity.id);

        Ok(SignupResponse {
            user_id: identity.id,
            email: identity.email,
        })
    }

    /// Authenticate a user and return a JWT token
    pub async fn login(&self, request: LoginRequest) -> ApiResult<TokenResponse> {
        let Some(identity) = self.stores.identities.verify_credentials(&request.email, &request.password).await? else {
            counter!("unidir_logins_total", 1, "outcome" => "invalid_credentials");
            warn!("Failed login attempt");
            return Err(ApiError::unauthorized("Invalid email or password"));
        };

        if identity.is_banned() {
            counter!("unidir_logins_total", 1, "outcome" => "disabled");
            self.audit.log_login(identity.id, false).await;
            return Err(ApiError::forbidden("Account is disabled"));
        }

        let claims = Claims::new(identity.id, &identity.email, self.token_ttl);
        let token = self.jwt_manager.create_token(&claims)?;

        counter!("unidir_logins_total", 1, "outcome" => "success");
        self.audit.log_login(identity.id, true).await;

        Ok(TokenResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.num_seconds().max(0) as u64,
        })
    }

    /// Build the session context for an `Authorization` header value.
    ///
    /// The identity is re-read on every request, so deleted or suspended
    /// accounts lose access even with an unexpired token.
    pub async fn resolve_session(&self, auth_header: Option<&str>) -> ApiResult<SessionContext> {
        let header = auth_header.ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;
        let token = extract_token_from_header(header)?;
        let claims = self.jwt_manager.validate_token(token)?;
        let user_id = claims.user_id()?;

        let identity = self.stores.identities.get_identity(user_id).await?.ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

        if identity.is_banned() {
            warn!("Rejected token of suspended user {}", user_id);
            return Err(ApiError::unauthorized("Unauthorized"));
        }

        let role = self.stores.roles.for_user(user_id).await?;
        let profile = self.stores.profiles.get(user_id).await?;

        Ok(SessionContext {
            user_id,
            email: identity.email,
            role,
            profile,
        })
    }

    /// Update the caller's own profile
    pub async fn update_profile(&self, session: &SessionContext, changes: ProfileChanges) -> ApiResult<Profile> {
        if matches!(&changes.full_name, Some(name) if name.trim().is_empty()) {
            return Err(ApiError::bad_request("full_name cannot be empty"));
        }

        let profile = match self.stores.profiles.get(session.user_id).await? {
            Some(_) => self.stores.profiles.update(session.user_id, changes).await?,
            None => {
                let mut profile = Profile::new(session.user_id, changes.full_name);
                profile.avatar_url = changes.avatar_url;
                profile.phone = changes.phone;
                self.stores.profiles.insert(profile).await?
            }
        };

        Ok(profile)
    }

    pub fn jwt_manager(&self) -> &JwtManager {
        &self.jwt_manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::AdminScope;

    fn service() -> (AuthService, Stores) {
        let stores = Stores::in_memory();
        let service = AuthService::new("test-secret", 3600, stores.clone(), Arc::new(AuditLogger::new()));
        (service, stores)
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            email: email.to_string(),
            password: "password1".to_string(),
            full_name: "Omar".to_string(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_jwt_roundtrip_and_tamper() {
        let manager = JwtManager::new("secret");
        let claims = Claims::new(Uuid::new_v4(), "a@uni.edu", Duration::hours(1));
        let token = manager.create_token(&claims).unwrap();

        let decoded = manager.validate_token(&token).unwrap();
        assert_eq!(decoded.sub, claims.sub);

        let other = JwtManager::new("other-secret");
        let err = other.validate_token(&token).unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("secret");
        let claims = Claims::new(Uuid::new_v4(), "a@uni.edu", Duration::hours(-2));
        let token = manager.create_token(&claims).unwrap();
        assert_eq!(manager.validate_token(&token).unwrap_err().status_code(), hyper::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token_from_header("Bearer abc").unwrap(), "abc");
        assert!(extract_token_from_header("Basic abc").is_err());
        assert!(extract_token_from_header("Bearer ").is_err());
    }

    #[test]
    fn test_generate_secret() {
        let secret = JwtManager::generate_secret().unwrap();
        assert_eq!(general_purpose::STANDARD.decode(secret).unwrap().len(), 32);
    }

    #[tokio::test]
    async fn test_token_ttl_is_clamped() {
        for (ttl, expected) in [(i64::MAX, MAX_TOKEN_TTL_SECS as u64), (i64::MIN, 1), (0, 1), (900, 900)] {
            let stores = Stores::in_memory();
            let service = AuthService::new("test-secret", ttl, stores, Arc::new(AuditLogger::new()));
            service.signup(signup_request("ttl@uni.edu")).await.unwrap();

            let token = service.login(login_request("ttl@uni.edu", "password1")).await.unwrap();
            assert_eq!(token.expires_in, expected);
        }
    }

    #[tokio::test]
    async fn test_signup_login_session() {
        let (service, _) = service();
        let signed_up = service.signup(signup_request("Omar@Uni.edu")).await.unwrap();

        let token = service.login(login_request("omar@uni.edu", "password1")).await.unwrap();
        assert_eq!(token.token_type, "Bearer");

        let header = format!("Bearer {}", token.access_token);
        let session = service.resolve_session(Some(&header)).await.unwrap();
        assert_eq!(session.user_id, signed_up.user_id);
        assert_eq!(session.profile.and_then(|p| p.full_name).as_deref(), Some("Omar"));
        assert!(session.role.is_none());
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let (service, _) = service();
        let mut request = signup_request("a@uni.edu");
        request.password = "12345".to_string();
        assert_eq!(service.signup(request).await.unwrap_err().status_code(), hyper::StatusCode::BAD_REQUEST);

        service.signup(signup_request("b@uni.edu")).await.unwrap();
        assert_eq!(service.signup(signup_request("b@uni.edu")).await.unwrap_err().status_code(), hyper::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (service, stores) = service();
        let user = service.signup(signup_request("a@uni.edu")).await.unwrap();

        let err = service.login(login_request("a@uni.edu", "wrong-pass")).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);

        stores.identities.set_banned(user.user_id, true).await.unwrap();
        let err = service.login(login_request("a@uni.edu", "password1")).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Account is disabled");
    }

    #[tokio::test]
    async fn test_banned_token_rejected() {
        let (service, stores) = service();
        let user = service.signup(signup_request("a@uni.edu")).await.unwrap();
        let token = service.login(login_request("a@uni.edu", "password1")).await.unwrap();
        let header = format!("Bearer {}", token.access_token);

        stores.identities.set_banned(user.user_id, true).await.unwrap();
        let err = service.resolve_session(Some(&header)).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_header() {
        let (service, _) = service();
        let err = service.resolve_session(None).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_session_role_checks() {
        let (service, stores) = service();
        let user = service.signup(signup_request("a@uni.edu")).await.unwrap();
        let token = service.login(login_request("a@uni.edu", "password1")).await.unwrap();
        let header = format!("Bearer {}", token.access_token);

        let session = service.resolve_session(Some(&header)).await.unwrap();
        assert_eq!(session.admin_role().unwrap_err().message(), "No admin role");

        let mut assignment = RoleAssignment::new(user.user_id, AdminScope::Site);
        assignment.is_active = false;
        stores.roles.insert(assignment).await.unwrap();

        let session = service.resolve_session(Some(&header)).await.unwrap();
        assert_eq!(session.require_site_admin().unwrap_err().message(), "Admin role is inactive");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (service, _) = service();
        let user = service.signup(signup_request("a@uni.edu")).await.unwrap();
        let session = SessionContext {
            user_id: user.user_id,
            email: user.email,
            role: None,
            profile: None,
        };

        let profile = service
            .update_profile(
                &session,
                ProfileChanges {
                    full_name: Some("Omar Saleh".to_string()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Omar Saleh"));

        let err = service
            .update_profile(
                &session,
                ProfileChanges {
                    full_name: Some("  ".to_string()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
    }
}
