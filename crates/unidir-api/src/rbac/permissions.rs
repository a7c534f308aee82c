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

//! Per-role feature permissions shown on the administration dashboard

use crate::rbac::roles::AdminRole;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Dashboard feature a role may be granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    ManageUniversities,
    ManageColleges,
    ManageDepartments,
    ManageUsers,
    ManageAnnouncements,
    ManageJobs,
    ManageResearch,
    ManageGraduates,
    ManageFees,
    ViewReports,
    AdvancedSettings,
}

impl PermissionKey {
    pub const ALL: [PermissionKey; 11] = [
        PermissionKey::ManageUniversities,
        PermissionKey::ManageColleges,
        PermissionKey::ManageDepartments,
        PermissionKey::ManageUsers,
        PermissionKey::ManageAnnouncements,
        PermissionKey::ManageJobs,
        PermissionKey::ManageResearch,
        PermissionKey::ManageGraduates,
        PermissionKey::ManageFees,
        PermissionKey::ViewReports,
        PermissionKey::AdvancedSettings,
    ];

    fn enabled_by_default(&self, role: AdminRole) -> bool {
        use PermissionKey::*;

        match role {
            AdminRole::SuperAdmin => true,
            AdminRole::UniversityAdmin => !matches!(self, ManageUniversities | AdvancedSettings),
            AdminRole::CollegeAdmin => !matches!(self, ManageUniversities | ManageColleges | ManageUsers | AdvancedSettings),
            AdminRole::DepartmentAdmin => matches!(self, ManageResearch | ManageGraduates | ManageFees | ManageAnnouncements),
        }
    }
}

/// One cell of the role/permission matrix
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RolePermission {
    pub role: AdminRole,
    pub permission_key: PermissionKey,
    pub is_enabled: bool,
    pub updated_at: DateTime<Utc>,
}

/// Requested change of one matrix cell
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PermissionUpdate {
    pub role: AdminRole,
    pub permission_key: PermissionKey,
    pub is_enabled: bool,
}

/// Role/permission matrix. Site administrator rows are always enabled.
#[derive(Debug)]
pub struct RolePermissionMatrix {
    entries: RwLock<BTreeMap<(AdminRole, PermissionKey), RolePermission>>,
}

impl RolePermissionMatrix {
    /// Matrix populated with the default grants
    pub fn with_defaults() -> Self {
        let now = Utc::now();
        let mut entries = BTreeMap::new();

        for role in AdminRole::ALL {
            for key in PermissionKey::ALL {
                entries.insert(
                    (role, key),
                    RolePermission {
                        role,
                        permission_key: key,
                        is_enabled: key.enabled_by_default(role),
                        updated_at: now,
                    },
                );
            }
        }

        Self { entries: RwLock::new(entries) }
    }

    /// All cells ordered by role then permission
    pub fn list(&self) -> Vec<RolePermission> {
        self.entries.read().values().cloned().collect()
    }

    pub fn is_enabled(&self, role: AdminRole, key: PermissionKey) -> bool {
        self.entries.read().get(&(role, key)).map(|p| p.is_enabled).unwrap_or(false)
    }

    /// Apply a batch of toggles. The batch is validated as a whole before
    /// anything changes. Returns the number of cells whose value changed.
    pub fn apply(&self, updates: &[PermissionUpdate]) -> Result<usize, StoreError> {
        if let Some(update) = updates.iter().find(|u| u.role == AdminRole::SuperAdmin && !u.is_enabled) {
            return Err(StoreError::InvalidData {
                message: format!("Permissions of super_admin cannot be disabled ({:?})", update.permission_key),
            });
        }

        let now = Utc::now();
        let mut entries = self.entries.write();
        let mut changed = 0;

        for update in updates {
            if let Some(entry) = entries.get_mut(&(update.role, update.permission_key)) {
                if entry.is_enabled != update.is_enabled {
                    entry.is_enabled = update.is_enabled;
                    entry.updated_at = now;
                    changed += 1;
                }
            }
        }

        Ok(changed)
    }
}

impl Default for RolePermissionMatrix {
    fn default() -> Self {
        Self::with_defaults()
    }
}
