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

//! Administrator lifecycle operations

use crate::auth::SessionContext;
use crate::directory::OrgDirectory;
use crate::error::{ApiError, ApiResult};
use crate::models::{AdminListEntry, AdminProfileSummary, ManageAdminResponse, UserCounts, UserListEntry, UserListResponse};
use crate::rbac::{AdminAction, AdminRole, AdminScope, AuditLogger, Denial, RoleAssignment, RoleAssignmentView, RoleId, ScopeEvaluator, ScopeFields, scope_ancestors};
use crate::store::{NewIdentity, Profile, Stores, normalize_email, validate_password};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Body of the privileged management endpoint, dispatched on `action`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ManageAdminRequest {
    Create(CreateAdminRequest),
    ToggleActive(ToggleActiveRequest),
    UpdatePassword(UpdatePasswordRequest),
}

impl ManageAdminRequest {
    pub const ACTIONS: [&'static str; 3] = ["create", "toggle_active", "update_password"];

    pub fn action(&self) -> AdminAction {
        match self {
            ManageAdminRequest::Create(_) => AdminAction::Create,
            ManageAdminRequest::ToggleActive(_) => AdminAction::ToggleActive,
            ManageAdminRequest::UpdatePassword(_) => AdminAction::ResetPassword,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,

    /// Wire role name, e.g. `college_admin`
    pub role: String,

    #[serde(flatten)]
    pub scope: ScopeFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToggleActiveRequest {
    pub role_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    pub role_id: Uuid,
    pub new_password: String,
}

/// Administrator lifecycle manager
pub struct AdminManager {
    stores: Stores,
    directory: Arc<OrgDirectory>,
    audit: Arc<AuditLogger>,
}

impl AdminManager {
    pub fn new(stores: Stores, directory: Arc<OrgDirectory>, audit: Arc<AuditLogger>) -> Self {
        Self { stores, directory, audit }
    }

    /// Run one management action for the caller
    pub async fn handle(&self, session: &SessionContext, request: ManageAdminRequest) -> ApiResult<ManageAdminResponse> {
        let action = request.action();

        let result = match request {
            ManageAdminRequest::Create(create) => self.create(session, create).await,
            ManageAdminRequest::ToggleActive(toggle) => self.toggle_active(session, toggle).await.map(|_| ManageAdminResponse::done()),
            ManageAdminRequest::UpdatePassword(update) => self.update_password(session, update).await.map(|_| ManageAdminResponse::done()),
        };

        let outcome = match &result {
            Ok(_) => "success",
            Err(ApiError::Forbidden { .. }) => "denied",
            Err(e) if e.status_code().is_client_error() => "rejected",
            Err(_) => "failed",
        };
        counter!("unidir_admin_actions_total", 1, "action" => action.as_str(), "outcome" => outcome);

        result
    }

    /// Create an identity, its profile and an active role assignment.
    ///
    /// Steps after the identity exists are compensated on failure; an
    /// identity that cannot be removed again is reported as orphaned.
    pub async fn create(&self, session: &SessionContext, request: CreateAdminRequest) -> ApiResult<ManageAdminResponse> {
        let caller = session.admin_role()?;

        let email = normalize_email(&request.email).map_err(ApiError::bad_request)?;
        validate_password(&request.password).map_err(ApiError::bad_request)?;
        let role: AdminRole = request.role.parse().map_err(|_| ApiError::bad_request("Invalid role"))?;
        let scope = AdminScope::from_fields(role, &request.scope).map_err(ApiError::bad_request)?;

        self.authorize(caller, AdminAction::Create, &scope).await?;
        self.check_ancestors(&scope, &request.scope)?;

        let full_name = request.full_name.map(|name| name.trim().to_string()).filter(|name| !name.is_empty());

        let identity = self
            .stores
            .identities
            .create_identity(NewIdentity {
                email,
                password: request.password,
                email_confirmed: true,
            })
            .await?;

        if let Err(e) = self.stores.profiles.insert(Profile::new(identity.id, full_name)).await {
            error!("Profile insert failed for new admin {}: {}", identity.id, e);
            self.roll_back_create(caller.user_id, identity.id, false).await;
            return Err(e.into());
        }

        let assignment = match self.stores.roles.insert(RoleAssignment::new(identity.id, scope)).await {
            Ok(assignment) => assignment,
            Err(e) => {
                error!("Role insert failed for new admin {}: {}", identity.id, e);
                self.roll_back_create(caller.user_id, identity.id, true).await;
                return Err(e.into());
            }
        };

        info!(actor = %caller.user_id, user_id = %identity.id, role = %role, "Administrator created");
        self.audit.log_admin_created(caller.user_id, identity.id, role.as_str()).await;

        Ok(ManageAdminResponse {
            success: true,
            user_id: Some(identity.id),
            role_id: Some(assignment.id.0),
        })
    }

    /// Activate or deactivate an administrator.
    ///
    /// The credential is (un)banned first; the role flag only changes once
    /// that succeeded. A failed flag update reverts the ban.
    pub async fn toggle_active(&self, session: &SessionContext, request: ToggleActiveRequest) -> ApiResult<RoleAssignment> {
        let caller = session.admin_role()?;
        let target = self.target_role(RoleId(request.role_id)).await?;
        self.authorize(caller, AdminAction::ToggleActive, &target.scope).await?;

        self.stores.identities.set_banned(target.user_id, !request.is_active).await.map_err(|e| {
            error!("Failed to update ban state of {}: {}", target.user_id, e);
            ApiError::from(e)
        })?;

        let updated = match self.stores.roles.set_active(target.id, request.is_active).await {
            Ok(updated) => updated,
            Err(e) => {
                error!("Failed to update role {} after changing ban state: {}", target.id, e);
                let reverted = self.stores.identities.set_banned(target.user_id, !target.is_active).await;
                if let Err(revert) = &reverted {
                    error!(user_id = %target.user_id, "Ban state no longer matches role {}: {}", target.id, revert);
                }
                self.audit.log_rollback(caller.user_id, target.user_id, AdminAction::ToggleActive.as_str(), reverted.is_ok()).await;
                return Err(e.into());
            }
        };

        info!(actor = %caller.user_id, user_id = %target.user_id, is_active = request.is_active, "Administrator activation changed");
        self.audit.log_activation_changed(caller.user_id, target.user_id, request.is_active).await;

        Ok(updated)
    }

    /// Rotate the credential of an administrator
    pub async fn update_password(&self, session: &SessionContext, request: UpdatePasswordRequest) -> ApiResult<()> {
        validate_password(&request.new_password).map_err(ApiError::bad_request)?;

        let caller = session.admin_role()?;
        let target = self.target_role(RoleId(request.role_id)).await?;
        self.authorize(caller, AdminAction::ResetPassword, &target.scope).await?;

        self.stores.identities.update_password(target.user_id, &request.new_password).await?;

        info!(actor = %caller.user_id, user_id = %target.user_id, "Administrator password reset");
        self.audit.log_password_reset(caller.user_id, target.user_id).await;

        Ok(())
    }

    /// Administrators the caller may manage, newest first, with profile names
    pub async fn list_admins(&self, session: &SessionContext) -> ApiResult<Vec<AdminListEntry>> {
        let caller = session.admin_role()?;
        if !caller.is_active {
            return Err(Denial::InactiveCaller.into());
        }
        if caller.role().assignable_roles().is_empty() {
            return Err(Denial::NoPermission.into());
        }

        let evaluator = ScopeEvaluator::new(&self.directory);
        let visible: Vec<RoleAssignment> = self
            .stores
            .roles
            .list()
            .await?
            .into_iter()
            .filter(|assignment| assignment.user_id != caller.user_id)
            .filter(|assignment| caller.scope == AdminScope::Site || evaluator.can_manage(caller, &assignment.scope))
            .collect();

        let user_ids: Vec<Uuid> = visible.iter().map(|assignment| assignment.user_id).collect();
        let names: HashMap<Uuid, Option<String>> = self
            .stores
            .profiles
            .get_many(&user_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.user_id, profile.full_name))
            .collect();

        Ok(visible
            .iter()
            .map(|assignment| {
                let profile = names.get(&assignment.user_id).map(|full_name| AdminProfileSummary { full_name: full_name.clone() });
                AdminListEntry::new(RoleAssignmentView::from(assignment), profile)
            })
            .collect())
    }

    /// Every profile with its role, for the site administrator's user table
    pub async fn list_users(&self, session: &SessionContext) -> ApiResult<UserListResponse> {
        session.require_site_admin()?;

        let mut roles: HashMap<Uuid, RoleAssignment> = HashMap::new();
        // Oldest first so each user keeps their first assignment
        for assignment in self.stores.roles.list().await?.into_iter().rev() {
            roles.entry(assignment.user_id).or_insert(assignment);
        }

        let users: Vec<UserListEntry> = self
            .stores
            .profiles
            .list()
            .await?
            .into_iter()
            .map(|profile| {
                let role = roles.get(&profile.user_id);
                UserListEntry {
                    user_id: profile.user_id,
                    full_name: profile.full_name,
                    avatar_url: profile.avatar_url,
                    phone: profile.phone,
                    created_at: profile.created_at,
                    role: role.map(RoleAssignment::role),
                    is_active: role.map(|r| r.is_active).unwrap_or(true),
                }
            })
            .collect();

        let counts = UserCounts {
            total: users.len(),
            active: users.iter().filter(|u| u.is_active).count(),
            admins: users.iter().filter(|u| u.role.is_some()).count(),
            inactive: users.iter().filter(|u| !u.is_active).count(),
        };

        Ok(UserListResponse { users, counts })
    }

    async fn target_role(&self, id: RoleId) -> ApiResult<RoleAssignment> {
        self.stores.roles.get(id).await?.ok_or_else(|| ApiError::not_found("Role not found"))
    }

    async fn authorize(&self, caller: &RoleAssignment, action: AdminAction, target: &AdminScope) -> ApiResult<()> {
        let decision = ScopeEvaluator::new(&self.directory).authorize(caller, action, target);

        if let Err(denial) = decision {
            warn!(actor = %caller.user_id, action = %action, "Admin action rejected: {}", denial);
            self.audit.log_denied(caller.user_id, action.as_str(), &denial.to_string()).await;
            return Err(denial.into());
        }
        Ok(())
    }

    /// Ancestor ids sent along with a create request must agree with the tree
    fn check_ancestors(&self, scope: &AdminScope, fields: &ScopeFields) -> ApiResult<()> {
        let (university, college) = scope_ancestors(&self.directory, scope);

        let university_matches = match (fields.university_id, scope) {
            (Some(given), AdminScope::College(_) | AdminScope::Department(_)) => university.map(|u| u.0) == Some(given),
            _ => true,
        };
        let college_matches = match (fields.college_id, scope) {
            (Some(given), AdminScope::Department(_)) => college.map(|c| c.0) == Some(given),
            _ => true,
        };

        if university_matches && college_matches {
            Ok(())
        } else {
            Err(ApiError::bad_request("Scope ids do not match the organizational hierarchy"))
        }
    }

    async fn roll_back_create(&self, actor: Uuid, user_id: Uuid, profile_created: bool) {
        let mut succeeded = true;

        if profile_created {
            if let Err(e) = self.stores.profiles.delete(user_id).await {
                error!(user_id = %user_id, "Failed to remove profile during rollback: {}", e);
                succeeded = false;
            }
        }

        match self.stores.identities.delete_identity(user_id).await {
            Ok(()) => warn!(user_id = %user_id, "Rolled back partially created administrator"),
            Err(e) => {
                error!(user_id = %user_id, "Orphaned identity left behind by failed administrator creation: {}", e);
                succeeded = false;
            }
        }

        self.audit.log_rollback(actor, user_id, AdminAction::Create.as_str(), succeeded).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{CollegeId, DepartmentId, NewUnit, UniversityId};
    use crate::rbac::AuditEventType;
    use crate::store::identity::IdentityProvider;
    use crate::store::{InMemoryIdentityProvider, InMemoryProfileStore, InMemoryRoleStore, RoleStore, StoreError};
    use async_trait::async_trait;

    /// Role store whose writes always fail
    #[derive(Default)]
    struct BrokenRoleStore {
        inner: InMemoryRoleStore,
    }

    #[async_trait]
    impl RoleStore for BrokenRoleStore {
        async fn insert(&self, _assignment: RoleAssignment) -> Result<RoleAssignment, StoreError> {
            Err(StoreError::Backend { message: "insert failed".to_string() })
        }

        async fn get(&self, id: RoleId) -> Result<Option<RoleAssignment>, StoreError> {
            self.inner.get(id).await
        }

        async fn for_user(&self, user_id: Uuid) -> Result<Option<RoleAssignment>, StoreError> {
            self.inner.for_user(user_id).await
        }

        async fn list(&self) -> Result<Vec<RoleAssignment>, StoreError> {
            self.inner.list().await
        }

        async fn set_active(&self, _id: RoleId, _is_active: bool) -> Result<RoleAssignment, StoreError> {
            Err(StoreError::Backend { message: "update failed".to_string() })
        }

        async fn delete(&self, id: RoleId) -> Result<(), StoreError> {
            self.inner.delete(id).await
        }
    }

    struct Fixture {
        manager: AdminManager,
        stores: Stores,
        audit: Arc<AuditLogger>,
        uni_a: UniversityId,
        uni_b: UniversityId,
        col_a: CollegeId,
        col_b: CollegeId,
        dep_a: DepartmentId,
    }

    fn fixture_with(stores: Stores) -> Fixture {
        let directory = Arc::new(OrgDirectory::new());
        let uni_a = UniversityId(directory.add_university(NewUnit::named("أ", "A")).unwrap().id);
        let uni_b = UniversityId(directory.add_university(NewUnit::named("ب", "B")).unwrap().id);
        let col_a = CollegeId(directory.add_college(uni_a, NewUnit::named("أ1", "A1")).unwrap().id);
        let col_b = CollegeId(directory.add_college(uni_b, NewUnit::named("ب1", "B1")).unwrap().id);
        let dep_a = DepartmentId(directory.add_department(col_a, NewUnit::named("أ1-1", "A1-1")).unwrap().id);

        let audit = Arc::new(AuditLogger::new());
        Fixture {
            manager: AdminManager::new(stores.clone(), directory, audit.clone()),
            stores,
            audit,
            uni_a,
            uni_b,
            col_a,
            col_b,
            dep_a,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Stores::in_memory())
    }

    fn session(scope: AdminScope) -> SessionContext {
        let user_id = Uuid::new_v4();
        SessionContext {
            user_id,
            email: format!("{}@uni.edu", user_id.simple()),
            role: Some(RoleAssignment::new(user_id, scope)),
            profile: None,
        }
    }

    fn create_request(email: &str, role: &str, scope: ScopeFields) -> CreateAdminRequest {
        CreateAdminRequest {
            email: email.to_string(),
            password: "password1".to_string(),
            full_name: Some("Admin".to_string()),
            role: role.to_string(),
            scope,
        }
    }

    fn university_fields(id: UniversityId) -> ScopeFields {
        ScopeFields {
            university_id: Some(id.0),
            ..ScopeFields::default()
        }
    }

    fn college_fields(id: CollegeId) -> ScopeFields {
        ScopeFields {
            college_id: Some(id.0),
            ..ScopeFields::default()
        }
    }

    #[tokio::test]
    async fn test_site_admin_creates_university_admin() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let response = f.manager.create(&site, create_request("u@uni.edu", "university_admin", university_fields(f.uni_a))).await.unwrap();
        assert!(response.success);

        let user_id = response.user_id.unwrap();
        let assignment = f.stores.roles.for_user(user_id).await.unwrap().unwrap();
        assert_eq!(assignment.scope, AdminScope::University(f.uni_a));
        assert!(assignment.is_active);

        let identity = f.stores.identities.get_identity(user_id).await.unwrap().unwrap();
        assert!(identity.email_confirmed);
        assert_eq!(f.stores.profiles.get(user_id).await.unwrap().unwrap().full_name.as_deref(), Some("Admin"));
    }

    #[tokio::test]
    async fn test_college_admin_cannot_create_university_admin() {
        let f = fixture();
        let college = session(AdminScope::College(f.col_a));

        let err = f.manager.create(&college, create_request("u@uni.edu", "university_admin", university_fields(f.uni_a))).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Cannot assign this role");
        assert!(f.stores.identities.find_by_email("u@uni.edu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_university_admin_out_of_scope() {
        let f = fixture();
        let uni = session(AdminScope::University(f.uni_a));

        let err = f.manager.create(&uni, create_request("c@uni.edu", "college_admin", college_fields(f.col_b))).await.unwrap_err();
        assert_eq!(err.message(), "Out of scope");

        let denied = f.audit.get_events_by_type(AuditEventType::PermissionDenied).await;
        assert_eq!(denied.len(), 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let err = f.manager.create(&site, create_request("c@uni.edu", "dean", college_fields(f.col_a))).await.unwrap_err();
        assert_eq!(err.message(), "Invalid role");

        let mut weak = create_request("c@uni.edu", "college_admin", college_fields(f.col_a));
        weak.password = "abc".to_string();
        assert_eq!(f.manager.create(&site, weak).await.unwrap_err().status_code(), hyper::StatusCode::BAD_REQUEST);

        let err = f.manager.create(&site, create_request("c@uni.edu", "college_admin", ScopeFields::default())).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);

        let err = f.manager.create(&site, create_request("c@uni.edu", "college_admin", college_fields(CollegeId::new()))).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mismatched_ancestor_rejected() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let fields = ScopeFields {
            university_id: Some(f.uni_b.0),
            college_id: Some(f.col_a.0),
            department_id: None,
        };
        let err = f.manager.create(&site, create_request("c@uni.edu", "college_admin", fields)).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);

        let fields = ScopeFields {
            university_id: Some(f.uni_a.0),
            college_id: Some(f.col_a.0),
            department_id: Some(f.dep_a.0),
        };
        assert!(f.manager.create(&site, create_request("d@uni.edu", "department_admin", fields)).await.is_ok());
    }

    #[tokio::test]
    async fn test_caller_without_role() {
        let f = fixture();
        let mut plain = session(AdminScope::Site);
        plain.role = None;

        let err = f.manager.create(&plain, create_request("c@uni.edu", "college_admin", college_fields(f.col_a))).await.unwrap_err();
        assert_eq!(err.message(), "No admin role");
    }

    #[tokio::test]
    async fn test_failed_role_insert_rolls_back_identity() {
        let stores = Stores::new(Arc::new(InMemoryIdentityProvider::new()), Arc::new(BrokenRoleStore::default()), Arc::new(InMemoryProfileStore::new()));
        let f = fixture_with(stores);
        let site = session(AdminScope::Site);

        let err = f.manager.create(&site, create_request("c@uni.edu", "college_admin", college_fields(f.col_a))).await.unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::INTERNAL_SERVER_ERROR);

        assert!(f.stores.identities.find_by_email("c@uni.edu").await.unwrap().is_none());
        assert!(f.stores.profiles.list().await.unwrap().is_empty());

        let rollbacks = f.audit.get_events_by_type(AuditEventType::Rollback).await;
        assert_eq!(rollbacks.len(), 1);
        assert_eq!(rollbacks[0].result, crate::rbac::AuditResult::Success);
    }

    #[tokio::test]
    async fn test_toggle_bans_and_unbans() {
        let f = fixture();
        let site = session(AdminScope::Site);
        let created = f.manager.create(&site, create_request("c@uni.edu", "college_admin", college_fields(f.col_a))).await.unwrap();
        let role_id = created.role_id.unwrap();
        let user_id = created.user_id.unwrap();

        let updated = f.manager.toggle_active(&site, ToggleActiveRequest { role_id, is_active: false }).await.unwrap();
        assert!(!updated.is_active);
        assert!(f.stores.identities.get_identity(user_id).await.unwrap().unwrap().is_banned());

        f.manager.toggle_active(&site, ToggleActiveRequest { role_id, is_active: true }).await.unwrap();
        assert!(!f.stores.identities.get_identity(user_id).await.unwrap().unwrap().is_banned());
        assert!(f.stores.roles.get(RoleId(role_id)).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_toggle_unknown_role() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let err = f
            .manager
            .toggle_active(
                &site,
                ToggleActiveRequest {
                    role_id: Uuid::new_v4(),
                    is_active: false,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::NOT_FOUND);
        assert_eq!(err.message(), "Role not found");
    }

    #[tokio::test]
    async fn test_toggle_revert_when_flag_update_fails() {
        let identities = Arc::new(InMemoryIdentityProvider::new());
        let roles = Arc::new(BrokenRoleStore::default());
        let stores = Stores::new(identities.clone(), roles.clone(), Arc::new(InMemoryProfileStore::new()));
        let f = fixture_with(stores);
        let site = session(AdminScope::Site);

        let identity = identities
            .create_identity(NewIdentity {
                email: "c@uni.edu".to_string(),
                password: "password1".to_string(),
                email_confirmed: true,
            })
            .await
            .unwrap();
        let assignment = roles.inner.insert(RoleAssignment::new(identity.id, AdminScope::College(f.col_a))).await.unwrap();

        let err = f
            .manager
            .toggle_active(
                &site,
                ToggleActiveRequest {
                    role_id: assignment.id.0,
                    is_active: false,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::INTERNAL_SERVER_ERROR);

        // Ban was reverted and the role flag is untouched
        assert!(!identities.get_identity(identity.id).await.unwrap().unwrap().is_banned());
        assert!(roles.inner.get(assignment.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_update_password() {
        let f = fixture();
        let uni = session(AdminScope::University(f.uni_a));
        let site = session(AdminScope::Site);
        let created = f.manager.create(&site, create_request("d@uni.edu", "department_admin", ScopeFields { department_id: Some(f.dep_a.0), ..ScopeFields::default() })).await.unwrap();
        let role_id = created.role_id.unwrap();

        let err = f
            .manager
            .update_password(
                &uni,
                UpdatePasswordRequest {
                    role_id,
                    new_password: "12345".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::BAD_REQUEST);

        f.manager
            .update_password(
                &uni,
                UpdatePasswordRequest {
                    role_id,
                    new_password: "new-password".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(f.stores.identities.verify_credentials("d@uni.edu", "new-password").await.unwrap().is_some());

        let other_uni = session(AdminScope::University(f.uni_b));
        let err = f
            .manager
            .update_password(
                &other_uni,
                UpdatePasswordRequest {
                    role_id,
                    new_password: "another-password".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Out of scope");
    }

    #[tokio::test]
    async fn test_list_admins_filters_and_enriches() {
        let f = fixture();
        let site = session(AdminScope::Site);
        f.stores.roles.insert(site.role.clone().unwrap()).await.unwrap();

        f.manager.create(&site, create_request("ua@uni.edu", "university_admin", university_fields(f.uni_a))).await.unwrap();
        f.manager.create(&site, create_request("ca@uni.edu", "college_admin", college_fields(f.col_a))).await.unwrap();
        f.manager.create(&site, create_request("cb@uni.edu", "college_admin", college_fields(f.col_b))).await.unwrap();

        let all = f.manager.list_admins(&site).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|entry| entry.user_id != site.user_id));
        assert!(all.iter().all(|entry| entry.profile.as_ref().and_then(|p| p.full_name.as_deref()) == Some("Admin")));

        let uni = session(AdminScope::University(f.uni_a));
        let scoped = f.manager.list_admins(&uni).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].college_id, Some(f.col_a.0));

        let department = session(AdminScope::Department(f.dep_a));
        assert_eq!(f.manager.list_admins(&department).await.unwrap_err().status_code(), hyper::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_list_users_counts() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let created = f.manager.create(&site, create_request("ca@uni.edu", "college_admin", college_fields(f.col_a))).await.unwrap();
        f.stores.profiles.insert(Profile::new(Uuid::new_v4(), Some("Student".to_string()))).await.unwrap();
        f.manager
            .toggle_active(
                &site,
                ToggleActiveRequest {
                    role_id: created.role_id.unwrap(),
                    is_active: false,
                },
            )
            .await
            .unwrap();

        let listing = f.manager.list_users(&site).await.unwrap();
        assert_eq!(
            listing.counts,
            UserCounts {
                total: 2,
                active: 1,
                admins: 1,
                inactive: 1,
            }
        );

        let college = session(AdminScope::College(f.col_a));
        assert_eq!(f.manager.list_users(&college).await.unwrap_err().status_code(), hyper::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_handle_dispatch() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let request: ManageAdminRequest = serde_json::from_value(serde_json::json!({
            "action": "create",
            "email": "u@uni.edu",
            "password": "password1",
            "role": "university_admin",
            "university_id": f.uni_a.0,
        }))
        .unwrap();
        assert_eq!(request.action(), AdminAction::Create);

        let response = f.manager.handle(&site, request).await.unwrap();
        assert!(response.user_id.is_some());
    }
}
