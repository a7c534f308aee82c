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

//! Data models for the REST API

use crate::rbac::roles::{AdminRole, RoleAssignmentView};
use crate::store::Profile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ====== Authentication Models ======

/// JWT token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Token expiration time in seconds
    pub expires_in: u64,
}

/// Login request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-service registration request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Registration result
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    pub user_id: Uuid,
    pub email: String,
}

/// Session of the authenticated caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    pub profile: Option<Profile>,
    pub role: Option<RoleAssignmentView>,
}

// ====== Admin Management Models ======

/// Result of a privileged admin management action
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ManageAdminResponse {
    pub success: bool,

    /// Identity created by a `create` action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,

    /// Role assignment created by a `create` action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_id: Option<Uuid>,
}

impl ManageAdminResponse {
    pub fn done() -> Self {
        Self {
            success: true,
            user_id: None,
            role_id: None,
        }
    }
}

/// Profile fields shown next to an administrator
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminProfileSummary {
    pub full_name: Option<String>,
}

/// Administrator row of the management listing
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AdminListEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: AdminRole,
    pub university_id: Option<Uuid>,
    pub college_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub profile: Option<AdminProfileSummary>,
}

impl AdminListEntry {
    pub fn new(view: RoleAssignmentView, profile: Option<AdminProfileSummary>) -> Self {
        Self {
            id: view.id,
            user_id: view.user_id,
            role: view.role,
            university_id: view.university_id,
            college_id: view.college_id,
            department_id: view.department_id,
            is_active: view.is_active,
            created_at: view.created_at,
            profile,
        }
    }
}

/// Row of the user management table
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserListEntry {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub role: Option<AdminRole>,

    /// Users without a role count as active
    pub is_active: bool,
}

/// Aggregates shown above the user table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserCounts {
    pub total: usize,
    pub active: usize,
    pub admins: usize,
    pub inactive: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserListEntry>,
    pub counts: UserCounts,
}

// ====== Role Permission Models ======

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RolePermissionsUpdateRequest {
    pub updates: Vec<crate::rbac::PermissionUpdate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RolePermissionsUpdateResponse {
    pub success: bool,

    /// Number of cells whose value changed
    pub changed: usize,
}

// ====== Messaging Models ======

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: String,

    /// Recipient; an omitted recipient leaves the message visible to its sender only
    #[serde(default)]
    pub receiver_id: Option<Uuid>,
}

// ====== Health Models ======

/// Size of the organizational directory
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DirectoryStats {
    pub universities: usize,
    pub colleges: usize,
    pub departments: usize,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Timestamp of the health check
    pub timestamp: DateTime<Utc>,

    /// Service version
    pub version: String,

    pub directory: DirectoryStats,
}

/// API version information
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiVersion {
    /// API version
    pub version: String,

    /// Build information
    pub build: String,

    /// Supported features
    pub features: Vec<String>,
}
