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

//! Scoped writes to the organizational directory

use crate::auth::SessionContext;
use crate::directory::{College, CollegeId, Department, DepartmentId, OrgDirectory, UnitFields, University, UniversityId};
use crate::error::{ApiError, ApiResult};
use crate::rbac::{AuditLogger, Denial, RolePermissionMatrix, ScopeEvaluator, UnitTarget};
use crate::store::StoreError;
use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOperation {
    Create,
    Update,
    Remove,
}

impl UnitOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitOperation::Create => "create",
            UnitOperation::Update => "update",
            UnitOperation::Remove => "remove",
        }
    }
}

/// Creates, edits and removes directory units on behalf of administrators
pub struct UnitManager {
    directory: Arc<OrgDirectory>,
    permissions: Arc<RolePermissionMatrix>,
    audit: Arc<AuditLogger>,
}

impl UnitManager {
    pub fn new(directory: Arc<OrgDirectory>, permissions: Arc<RolePermissionMatrix>, audit: Arc<AuditLogger>) -> Self {
        Self { directory, permissions, audit }
    }

    pub async fn create_university(&self, session: &SessionContext, fields: UnitFields) -> ApiResult<University> {
        let fields = fields.normalized()?;
        self.write(session, UnitTarget::University, UnitOperation::Create, |d| d.add_university(fields.into()), |u: &University| u.id).await
    }

    pub async fn update_university(&self, session: &SessionContext, id: UniversityId, fields: UnitFields) -> ApiResult<University> {
        let fields = fields.normalized()?;
        self.existing_university(id)?;
        self.write(session, UnitTarget::University, UnitOperation::Update, |d| d.update_university(id, fields), |u: &University| u.id).await
    }

    pub async fn remove_university(&self, session: &SessionContext, id: UniversityId) -> ApiResult<University> {
        self.existing_university(id)?;
        self.write(session, UnitTarget::University, UnitOperation::Remove, |d| d.remove_university(id), |u: &University| u.id).await
    }

    pub async fn create_college(&self, session: &SessionContext, university_id: UniversityId, fields: UnitFields) -> ApiResult<College> {
        let fields = fields.normalized()?;
        self.existing_university(university_id)?;
        let target = UnitTarget::College(university_id);
        self.write(session, target, UnitOperation::Create, |d| d.add_college(university_id, fields.into()), |c: &College| c.id).await
    }

    pub async fn update_college(&self, session: &SessionContext, id: CollegeId, fields: UnitFields) -> ApiResult<College> {
        let fields = fields.normalized()?;
        let target = UnitTarget::College(self.parent_of_college(id)?);
        self.write(session, target, UnitOperation::Update, |d| d.update_college(id, fields), |c: &College| c.id).await
    }

    pub async fn remove_college(&self, session: &SessionContext, id: CollegeId) -> ApiResult<College> {
        let target = UnitTarget::College(self.parent_of_college(id)?);
        self.write(session, target, UnitOperation::Remove, |d| d.remove_college(id), |c: &College| c.id).await
    }

    pub async fn create_department(&self, session: &SessionContext, college_id: CollegeId, fields: UnitFields) -> ApiResult<Department> {
        let fields = fields.normalized()?;
        if self.directory.college(college_id).is_none() {
            return Err(not_found("College", college_id));
        }
        let target = UnitTarget::Department(college_id);
        self.write(session, target, UnitOperation::Create, |d| d.add_department(college_id, fields.into()), |d: &Department| d.id).await
    }

    pub async fn update_department(&self, session: &SessionContext, id: DepartmentId, fields: UnitFields) -> ApiResult<Department> {
        let fields = fields.normalized()?;
        let target = UnitTarget::Department(self.parent_of_department(id)?);
        self.write(session, target, UnitOperation::Update, |d| d.update_department(id, fields), |d: &Department| d.id).await
    }

    pub async fn remove_department(&self, session: &SessionContext, id: DepartmentId) -> ApiResult<Department> {
        let target = UnitTarget::Department(self.parent_of_department(id)?);
        self.write(session, target, UnitOperation::Remove, |d| d.remove_department(id), |d: &Department| d.id).await
    }

    /// Authorize the caller, apply the change and record it
    async fn write<T>(
        &self,
        session: &SessionContext,
        target: UnitTarget,
        operation: UnitOperation,
        apply: impl FnOnce(&OrgDirectory) -> Result<T, StoreError>,
        unit_id: impl FnOnce(&T) -> Uuid,
    ) -> ApiResult<T> {
        let caller = session.admin_role()?;

        let decision = ScopeEvaluator::new(&self.directory).authorize_unit(caller, target).and_then(|_| {
            if self.permissions.is_enabled(caller.role(), target.permission()) {
                Ok(())
            } else {
                Err(Denial::NoPermission)
            }
        });

        let action = format!("{}_{}", operation.as_str(), target.kind());
        if let Err(denial) = decision {
            warn!(actor = %caller.user_id, action = %action, "Directory write rejected: {}", denial);
            self.audit.log_denied(caller.user_id, &action, &denial.to_string()).await;
            counter!("unidir_directory_writes_total", 1, "unit" => target.kind(), "operation" => operation.as_str(), "outcome" => "denied");
            return Err(denial.into());
        }

        let result = apply(self.directory.as_ref()).map_err(ApiError::from);
        let outcome = match &result {
            Ok(_) => "success",
            Err(_) => "rejected",
        };
        counter!("unidir_directory_writes_total", 1, "unit" => target.kind(), "operation" => operation.as_str(), "outcome" => outcome);

        let unit = result?;
        let id = unit_id(&unit);
        info!(actor = %caller.user_id, unit_id = %id, "Directory {} applied", action);
        self.audit.log_directory_changed(caller.user_id, target.kind(), operation.as_str(), id).await;
        Ok(unit)
    }

    fn existing_university(&self, id: UniversityId) -> ApiResult<()> {
        match self.directory.university(id) {
            Some(_) => Ok(()),
            None => Err(not_found("University", id)),
        }
    }

    fn parent_of_college(&self, id: CollegeId) -> ApiResult<UniversityId> {
        self.directory.university_of_college(id).ok_or_else(|| not_found("College", id))
    }

    fn parent_of_department(&self, id: DepartmentId) -> ApiResult<CollegeId> {
        self.directory.college_of_department(id).ok_or_else(|| not_found("Department", id))
    }
}

fn not_found(entity: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::not_found(format!("{} not found: {}", entity, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::NewUnit;
    use crate::rbac::{AdminRole, AdminScope, AuditEventType, PermissionKey, PermissionUpdate, RoleAssignment};
    use hyper::StatusCode;

    struct Fixture {
        units: UnitManager,
        directory: Arc<OrgDirectory>,
        permissions: Arc<RolePermissionMatrix>,
        audit: Arc<AuditLogger>,
        uni_a: UniversityId,
        uni_b: UniversityId,
        col_a: CollegeId,
        col_b: CollegeId,
        dep_a: DepartmentId,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(OrgDirectory::new());
        let uni_a = UniversityId(directory.add_university(NewUnit::named("أ", "A")).unwrap().id);
        let uni_b = UniversityId(directory.add_university(NewUnit::named("ب", "B")).unwrap().id);
        let col_a = CollegeId(directory.add_college(uni_a, NewUnit::named("أ1", "A1")).unwrap().id);
        let col_b = CollegeId(directory.add_college(uni_b, NewUnit::named("ب1", "B1")).unwrap().id);
        let dep_a = DepartmentId(directory.add_department(col_a, NewUnit::named("أ1-1", "A1-1")).unwrap().id);

        let permissions = Arc::new(RolePermissionMatrix::with_defaults());
        let audit = Arc::new(AuditLogger::new());
        Fixture {
            units: UnitManager::new(directory.clone(), permissions.clone(), audit.clone()),
            directory,
            permissions,
            audit,
            uni_a,
            uni_b,
            col_a,
            col_b,
            dep_a,
        }
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

    fn fields(name_ar: &str) -> UnitFields {
        UnitFields {
            name_ar: name_ar.to_string(),
            name_en: Some("Unit".to_string()),
            ..UnitFields::default()
        }
    }

    #[tokio::test]
    async fn test_only_site_admin_writes_universities() {
        let f = fixture();

        let created = f.units.create_university(&session(AdminScope::Site), fields("جامعة جديدة")).await.unwrap();
        assert!(f.directory.university(UniversityId(created.id)).is_some());

        let err = f.units.create_university(&session(AdminScope::University(f.uni_a)), fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = f.units.update_university(&session(AdminScope::University(f.uni_a)), f.uni_a, fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let changed = f.audit.get_events_by_type(AuditEventType::DirectoryChanged).await;
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].details.get("unit").map(String::as_str), Some("university"));
    }

    #[tokio::test]
    async fn test_university_admin_writes_colleges_in_own_university() {
        let f = fixture();
        let uni = session(AdminScope::University(f.uni_a));

        let college = f.units.create_college(&uni, f.uni_a, fields("كلية الطب")).await.unwrap();
        assert_eq!(college.university_id, f.uni_a.0);

        let err = f.units.create_college(&uni, f.uni_b, fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "Out of scope");

        let err = f.units.update_college(&uni, f.col_b, fields("x")).await.unwrap_err();
        assert_eq!(err.message(), "Out of scope");

        let department = f.units.create_department(&uni, f.col_a, fields("قسم")).await.unwrap();
        assert_eq!(department.college_id, f.col_a.0);
        assert!(f.units.create_department(&uni, f.col_b, fields("x")).await.is_err());
    }

    #[tokio::test]
    async fn test_college_admin_writes_departments_only() {
        let f = fixture();
        let college = session(AdminScope::College(f.col_a));

        let updated = f.units.update_department(&college, f.dep_a, fields("قسم معدل")).await.unwrap();
        assert_eq!(updated.name_ar, "قسم معدل");

        let err = f.units.create_college(&college, f.uni_a, fields("x")).await.unwrap_err();
        assert_eq!(err.message(), "No permission");

        let err = f.units.create_department(&college, f.col_b, fields("x")).await.unwrap_err();
        assert_eq!(err.message(), "Out of scope");

        let department = session(AdminScope::Department(f.dep_a));
        let err = f.units.update_department(&department, f.dep_a, fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_disabled_permission_blocks_write() {
        let f = fixture();
        let uni = session(AdminScope::University(f.uni_a));

        f.permissions
            .apply(&[PermissionUpdate {
                role: AdminRole::UniversityAdmin,
                permission_key: PermissionKey::ManageColleges,
                is_enabled: false,
            }])
            .unwrap();

        let err = f.units.create_college(&uni, f.uni_a, fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.message(), "No permission");

        let denied = f.audit.get_events_by_type(AuditEventType::PermissionDenied).await;
        assert_eq!(denied[0].details.get("action").map(String::as_str), Some("create_college"));
    }

    #[tokio::test]
    async fn test_write_errors() {
        let f = fixture();
        let site = session(AdminScope::Site);

        let err = f.units.create_university(&site, fields("   ")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = f.units.update_college(&site, CollegeId::new(), fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err = f.units.remove_university(&site, f.uni_a).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let removed = f.units.remove_department(&site, f.dep_a).await.unwrap();
        assert_eq!(removed.id, f.dep_a.0);
        f.units.remove_college(&site, f.col_a).await.unwrap();
        f.units.remove_university(&site, f.uni_a).await.unwrap();
        assert_eq!(f.directory.counts(), (1, 1, 0));

        let user = SessionContext { role: None, ..session(AdminScope::Site) };
        let err = f.units.create_university(&user, fields("x")).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
