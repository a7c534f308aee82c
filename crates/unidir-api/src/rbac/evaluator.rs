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

//! Scope-aware permission evaluator for administrator management
//!
//! An administrator may only act one or more levels below its own role and
//! only inside its own organizational subtree. Containment is resolved
//! through the [`OrgDirectory`], never through ancestor ids supplied by the
//! client.

use crate::directory::{CollegeId, OrgDirectory, UniversityId};
use crate::error::ApiError;
use crate::rbac::permissions::PermissionKey;
use crate::rbac::roles::{AdminScope, RoleAssignment};
use std::fmt;

/// Administrative operation being authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Create,
    ToggleActive,
    ResetPassword,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Create => "create",
            AdminAction::ToggleActive => "toggle_active",
            AdminAction::ResetPassword => "update_password",
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory unit being written, identified by the parent it lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitTarget {
    University,
    College(UniversityId),
    Department(CollegeId),
}

impl UnitTarget {
    /// Feature key that must be enabled for the caller's role
    pub fn permission(&self) -> PermissionKey {
        match self {
            UnitTarget::University => PermissionKey::ManageUniversities,
            UnitTarget::College(_) => PermissionKey::ManageColleges,
            UnitTarget::Department(_) => PermissionKey::ManageDepartments,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UnitTarget::University => "university",
            UnitTarget::College(_) => "college",
            UnitTarget::Department(_) => "department",
        }
    }
}

/// Reason an action was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// Requested role is never assignable through management
    InvalidRole,
    /// Caller's role may not create the requested role
    CannotAssignRole,
    /// Target lies outside the caller's subtree
    OutOfScope,
    /// Caller has no management rights over the target
    NoPermission,
    /// Caller's own role assignment is deactivated
    InactiveCaller,
    /// Requested scope does not exist in the hierarchy
    UnknownScope(String),
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Denial::InvalidRole => f.write_str("Invalid role"),
            Denial::CannotAssignRole => f.write_str("Cannot assign this role"),
            Denial::OutOfScope => f.write_str("Out of scope"),
            Denial::NoPermission => f.write_str("No permission"),
            Denial::InactiveCaller => f.write_str("Admin role is inactive"),
            Denial::UnknownScope(message) => f.write_str(message),
        }
    }
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::UnknownScope(message) => ApiError::BadRequest { message },
            invalid @ Denial::InvalidRole => ApiError::BadRequest { message: invalid.to_string() },
            other => ApiError::Forbidden { message: other.to_string() },
        }
    }
}

/// Evaluates administrator actions against the organizational tree
pub struct ScopeEvaluator<'a> {
    directory: &'a OrgDirectory,
}

impl<'a> ScopeEvaluator<'a> {
    pub fn new(directory: &'a OrgDirectory) -> Self {
        Self { directory }
    }

    /// Decide whether `caller` may perform `action` on an administrator bound to `target`.
    ///
    /// For `Create`, `target` is the requested scope; for the other actions
    /// it is the scope of the existing role assignment.
    pub fn authorize(&self, caller: &RoleAssignment, action: AdminAction, target: &AdminScope) -> Result<(), Denial> {
        if !caller.is_active {
            return Err(Denial::InactiveCaller);
        }

        let role_denied = match action {
            AdminAction::Create => Denial::CannotAssignRole,
            AdminAction::ToggleActive | AdminAction::ResetPassword => Denial::NoPermission,
        };

        let decision = match (&caller.scope, target) {
            (AdminScope::Site, AdminScope::Site) if action == AdminAction::Create => Err(Denial::InvalidRole),
            (AdminScope::Site, AdminScope::Site) => Err(role_denied),
            (AdminScope::Site, AdminScope::University(_) | AdminScope::College(_) | AdminScope::Department(_)) => self.ensure_exists(target),

            (AdminScope::University(_), AdminScope::Site | AdminScope::University(_)) => Err(role_denied),
            (AdminScope::University(own), AdminScope::College(college_id)) => {
                let parent = self.directory.university_of_college(*college_id);
                Self::within(*own, parent, || format!("Unknown college: {}", college_id))
            }
            (AdminScope::University(own), AdminScope::Department(department_id)) => {
                let parent = self.directory.university_of_department(*department_id);
                Self::within(*own, parent, || format!("Unknown department: {}", department_id))
            }

            (AdminScope::College(_), AdminScope::Site | AdminScope::University(_) | AdminScope::College(_)) => Err(role_denied),
            (AdminScope::College(own), AdminScope::Department(department_id)) => {
                let parent = self.directory.college_of_department(*department_id);
                Self::within(*own, parent, || format!("Unknown department: {}", department_id))
            }

            (AdminScope::Department(_), _) => Err(Denial::NoPermission),
        };

        // An existing assignment whose unit vanished is never manageable.
        match decision {
            Err(Denial::UnknownScope(_)) if action != AdminAction::Create => Err(Denial::NoPermission),
            other => other,
        }
    }

    /// Decide whether `caller` may create, edit or remove a directory unit.
    ///
    /// Universities are site-level data. Colleges and departments may be
    /// written by any administrator whose subtree contains their parent.
    pub fn authorize_unit(&self, caller: &RoleAssignment, target: UnitTarget) -> Result<(), Denial> {
        if !caller.is_active {
            return Err(Denial::InactiveCaller);
        }

        match (&caller.scope, target) {
            (AdminScope::Site, UnitTarget::University) => Ok(()),
            (AdminScope::Site, UnitTarget::College(university_id)) => self.ensure_exists(&AdminScope::University(university_id)),
            (AdminScope::Site, UnitTarget::Department(college_id)) => self.ensure_exists(&AdminScope::College(college_id)),

            (AdminScope::University(own), UnitTarget::College(university_id)) => {
                self.ensure_exists(&AdminScope::University(university_id))?;
                if *own == university_id {
                    Ok(())
                } else {
                    Err(Denial::OutOfScope)
                }
            }
            (AdminScope::University(own), UnitTarget::Department(college_id)) => {
                let parent = self.directory.university_of_college(college_id);
                Self::within(*own, parent, || format!("Unknown college: {}", college_id))
            }

            (AdminScope::College(own), UnitTarget::Department(college_id)) => {
                self.ensure_exists(&AdminScope::College(college_id))?;
                if *own == college_id {
                    Ok(())
                } else {
                    Err(Denial::OutOfScope)
                }
            }

            (AdminScope::University(_), UnitTarget::University)
            | (AdminScope::College(_), UnitTarget::University | UnitTarget::College(_))
            | (AdminScope::Department(_), _) => Err(Denial::NoPermission),
        }
    }

    /// Whether `caller` may toggle or reset the administrator bound to `target`
    pub fn can_manage(&self, caller: &RoleAssignment, target: &AdminScope) -> bool {
        self.authorize(caller, AdminAction::ToggleActive, target).is_ok()
    }

    fn ensure_exists(&self, target: &AdminScope) -> Result<(), Denial> {
        let exists = match target {
            AdminScope::Site => true,
            AdminScope::University(id) => self.directory.university(*id).is_some(),
            AdminScope::College(id) => self.directory.college(*id).is_some(),
            AdminScope::Department(id) => self.directory.department(*id).is_some(),
        };

        if exists {
            Ok(())
        } else {
            let message = match target {
                AdminScope::Site => String::new(),
                AdminScope::University(id) => format!("Unknown university: {}", id),
                AdminScope::College(id) => format!("Unknown college: {}", id),
                AdminScope::Department(id) => format!("Unknown department: {}", id),
            };
            Err(Denial::UnknownScope(message))
        }
    }

    fn within<T: PartialEq>(own: T, parent: Option<T>, unknown: impl FnOnce() -> String) -> Result<(), Denial> {
        match parent {
            None => Err(Denial::UnknownScope(unknown())),
            Some(parent) if parent == own => Ok(()),
            Some(_) => Err(Denial::OutOfScope),
        }
    }
}

/// Ancestors of a scope, used to cross-check ancestor ids supplied with a create request
pub fn scope_ancestors(directory: &OrgDirectory, scope: &AdminScope) -> (Option<UniversityId>, Option<CollegeId>) {
    match scope {
        AdminScope::Site | AdminScope::University(_) => (None, None),
        AdminScope::College(college_id) => (directory.university_of_college(*college_id), None),
        AdminScope::Department(department_id) => (directory.university_of_department(*department_id), directory.college_of_department(*department_id)),
    }
}
