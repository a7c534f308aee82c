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

//! Administrator roles and their organizational scope

use crate::directory::{CollegeId, DepartmentId, UniversityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Administrator role, ordered from the widest to the narrowest scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    /// Site-wide administrator, no scope
    SuperAdmin,
    /// Administrator of one university
    UniversityAdmin,
    /// Administrator of one college
    CollegeAdmin,
    /// Administrator of one department
    DepartmentAdmin,
}

impl AdminRole {
    pub const ALL: [AdminRole; 4] = [AdminRole::SuperAdmin, AdminRole::UniversityAdmin, AdminRole::CollegeAdmin, AdminRole::DepartmentAdmin];

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::UniversityAdmin => "university_admin",
            AdminRole::CollegeAdmin => "college_admin",
            AdminRole::DepartmentAdmin => "department_admin",
        }
    }

    /// Roles an administrator with this role may create and manage
    pub fn assignable_roles(&self) -> &'static [AdminRole] {
        match self {
            AdminRole::SuperAdmin => &[AdminRole::UniversityAdmin, AdminRole::CollegeAdmin, AdminRole::DepartmentAdmin],
            AdminRole::UniversityAdmin => &[AdminRole::CollegeAdmin, AdminRole::DepartmentAdmin],
            AdminRole::CollegeAdmin => &[AdminRole::DepartmentAdmin],
            AdminRole::DepartmentAdmin => &[],
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AdminRole::ALL.into_iter().find(|role| role.as_str() == s).ok_or_else(|| format!("Unknown role: {}", s))
    }
}

/// Role together with the organizational unit it is confined to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminScope {
    Site,
    University(UniversityId),
    College(CollegeId),
    Department(DepartmentId),
}

/// Flat scope columns as they travel on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScopeFields {
    #[serde(default)]
    pub university_id: Option<Uuid>,
    #[serde(default)]
    pub college_id: Option<Uuid>,
    #[serde(default)]
    pub department_id: Option<Uuid>,
}

impl AdminScope {
    pub fn role(&self) -> AdminRole {
        match self {
            AdminScope::Site => AdminRole::SuperAdmin,
            AdminScope::University(_) => AdminRole::UniversityAdmin,
            AdminScope::College(_) => AdminRole::CollegeAdmin,
            AdminScope::Department(_) => AdminRole::DepartmentAdmin,
        }
    }

    /// Build a scope from a role and the flat id columns.
    ///
    /// The id matching the role is required. Ids of ancestor units are
    /// tolerated (the caller checks them against the hierarchy); ids of
    /// descendant units are rejected.
    pub fn from_fields(role: AdminRole, fields: &ScopeFields) -> Result<Self, String> {
        match role {
            AdminRole::SuperAdmin => {
                if fields.university_id.is_some() || fields.college_id.is_some() || fields.department_id.is_some() {
                    return Err("super_admin cannot be bound to a scope".to_string());
                }
                Ok(AdminScope::Site)
            }
            AdminRole::UniversityAdmin => {
                if fields.college_id.is_some() || fields.department_id.is_some() {
                    return Err("university_admin accepts only university_id".to_string());
                }
                fields
                    .university_id
                    .map(|id| AdminScope::University(UniversityId(id)))
                    .ok_or_else(|| "university_id is required for university_admin".to_string())
            }
            AdminRole::CollegeAdmin => {
                if fields.department_id.is_some() {
                    return Err("college_admin cannot be bound to a department".to_string());
                }
                fields
                    .college_id
                    .map(|id| AdminScope::College(CollegeId(id)))
                    .ok_or_else(|| "college_id is required for college_admin".to_string())
            }
            AdminRole::DepartmentAdmin => fields
                .department_id
                .map(|id| AdminScope::Department(DepartmentId(id)))
                .ok_or_else(|| "department_id is required for department_admin".to_string()),
        }
    }

    /// Flat id columns for this scope; exactly one is set except for `Site`
    pub fn fields(&self) -> ScopeFields {
        match self {
            AdminScope::Site => ScopeFields::default(),
            AdminScope::University(id) => ScopeFields {
                university_id: Some(id.0),
                ..ScopeFields::default()
            },
            AdminScope::College(id) => ScopeFields {
                college_id: Some(id.0),
                ..ScopeFields::default()
            },
            AdminScope::Department(id) => ScopeFields {
                department_id: Some(id.0),
                ..ScopeFields::default()
            },
        }
    }
}

/// Identifier of a role assignment row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub Uuid);

impl RoleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Binding of a user to an administrator role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub id: RoleId,
    pub user_id: Uuid,
    pub scope: AdminScope,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl RoleAssignment {
    /// New active assignment
    pub fn new(user_id: Uuid, scope: AdminScope) -> Self {
        Self {
            id: RoleId::new(),
            user_id,
            scope,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> AdminRole {
        self.scope.role()
    }
}

/// Wire representation of a role assignment
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleAssignmentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: AdminRole,
    pub university_id: Option<Uuid>,
    pub college_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&RoleAssignment> for RoleAssignmentView {
    fn from(assignment: &RoleAssignment) -> Self {
        let fields = assignment.scope.fields();
        Self {
            id: assignment.id.0,
            user_id: assignment.user_id,
            role: assignment.role(),
            university_id: fields.university_id,
            college_id: fields.college_id,
            department_id: fields.department_id,
            is_active: assignment.is_active,
            created_at: assignment.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&AdminRole::SuperAdmin).unwrap(), "\"super_admin\"");
        let role: AdminRole = serde_json::from_str("\"college_admin\"").unwrap();
        assert_eq!(role, AdminRole::CollegeAdmin);
        assert!(serde_json::from_str::<AdminRole>("\"root\"").is_err());

        assert_eq!("department_admin".parse::<AdminRole>(), Ok(AdminRole::DepartmentAdmin));
        assert!("Department_Admin".parse::<AdminRole>().is_err());
    }

    #[test]
    fn test_assignable_roles_table() {
        assert_eq!(AdminRole::SuperAdmin.assignable_roles().len(), 3);
        assert!(!AdminRole::SuperAdmin.assignable_roles().contains(&AdminRole::SuperAdmin));
        assert_eq!(AdminRole::UniversityAdmin.assignable_roles(), &[AdminRole::CollegeAdmin, AdminRole::DepartmentAdmin]);
        assert_eq!(AdminRole::CollegeAdmin.assignable_roles(), &[AdminRole::DepartmentAdmin]);
        assert!(AdminRole::DepartmentAdmin.assignable_roles().is_empty());
    }

    #[test]
    fn test_scope_requires_matching_id() {
        let err = AdminScope::from_fields(AdminRole::CollegeAdmin, &ScopeFields::default()).unwrap_err();
        assert!(err.contains("college_id"));

        let university_id = Uuid::new_v4();
        let scope = AdminScope::from_fields(
            AdminRole::UniversityAdmin,
            &ScopeFields {
                university_id: Some(university_id),
                ..ScopeFields::default()
            },
        )
        .unwrap();
        assert_eq!(scope, AdminScope::University(UniversityId(university_id)));
    }

    #[test]
    fn test_scope_tolerates_ancestors_rejects_descendants() {
        let fields = ScopeFields {
            university_id: Some(Uuid::new_v4()),
            college_id: Some(Uuid::new_v4()),
            department_id: Some(Uuid::new_v4()),
        };

        assert!(matches!(AdminScope::from_fields(AdminRole::DepartmentAdmin, &fields), Ok(AdminScope::Department(_))));
        assert!(AdminScope::from_fields(AdminRole::CollegeAdmin, &fields).is_err());
        assert!(AdminScope::from_fields(AdminRole::UniversityAdmin, &fields).is_err());
        assert!(AdminScope::from_fields(AdminRole::SuperAdmin, &fields).is_err());
    }

    #[test]
    fn test_fields_round_exactly_one_id() {
        let college_id = CollegeId::new();
        let fields = AdminScope::College(college_id).fields();
        assert_eq!(fields.college_id, Some(college_id.0));
        assert!(fields.university_id.is_none());
        assert!(fields.department_id.is_none());
        assert_eq!(AdminScope::Site.fields(), ScopeFields::default());
    }

    #[test]
    fn test_assignment_view() {
        let department_id = DepartmentId::new();
        let assignment = RoleAssignment::new(Uuid::new_v4(), AdminScope::Department(department_id));
        let view = RoleAssignmentView::from(&assignment);

        assert_eq!(view.role, AdminRole::DepartmentAdmin);
        assert_eq!(view.department_id, Some(department_id.0));
        assert!(view.is_active);
    }
}
