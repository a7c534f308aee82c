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

//! Organizational hierarchy: universities, colleges and departments
//!
//! The hierarchy is a strict tree. A college always belongs to an existing
//! university and a department to an existing college, so parent lookups
//! used by the permission evaluator never dangle.

use crate::store::StoreError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! unit_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

unit_id!(UniversityId);
unit_id!(CollegeId);
unit_id!(DepartmentId);

/// Data needed to add a node to the hierarchy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUnit {
    /// Fixed identifier, generated when absent
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
}

impl NewUnit {
    pub fn named(name_ar: &str, name_en: &str) -> Self {
        Self {
            name_ar: name_ar.to_string(),
            name_en: Some(name_en.to_string()),
            ..Self::default()
        }
    }
}

/// Names and descriptions of a unit, as sent by administrators
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UnitFields {
    pub name_ar: String,
    #[serde(default)]
    pub name_en: Option<String>,
    #[serde(default)]
    pub description_ar: Option<String>,
    #[serde(default)]
    pub description_en: Option<String>,
}

impl UnitFields {
    /// Trim every field, dropping blank optional ones. The Arabic name is required.
    pub fn normalized(self) -> Result<Self, StoreError> {
        let name_ar = self.name_ar.trim().to_string();
        if name_ar.is_empty() {
            return Err(StoreError::InvalidData {
                message: "Arabic name is required".to_string(),
            });
        }

        let clean = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Ok(Self {
            name_ar,
            name_en: clean(self.name_en),
            description_ar: clean(self.description_ar),
            description_en: clean(self.description_en),
        })
    }
}

impl From<UnitFields> for NewUnit {
    fn from(fields: UnitFields) -> Self {
        Self {
            id: None,
            name_ar: fields.name_ar,
            name_en: fields.name_en,
            description_ar: fields.description_ar,
            description_en: fields.description_en,
        }
    }
}

/// University
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct University {
    pub id: Uuid,
    pub name_ar: String,
    pub name_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// College inside a university
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct College {
    pub id: Uuid,
    pub university_id: Uuid,
    pub name_ar: String,
    pub name_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Department inside a college
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Department {
    pub id: Uuid,
    pub college_id: Uuid,
    pub name_ar: String,
    pub name_en: Option<String>,
    pub description_ar: Option<String>,
    pub description_en: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct DirectoryInner {
    universities: HashMap<UniversityId, University>,
    colleges: HashMap<CollegeId, College>,
    departments: HashMap<DepartmentId, Department>,
}

/// In-process view of the organizational tree
#[derive(Debug, Default)]
pub struct OrgDirectory {
    inner: RwLock<DirectoryInner>,
}

impl OrgDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a university
    pub fn add_university(&self, unit: NewUnit) -> Result<University, StoreError> {
        let id = UniversityId(unit.id.unwrap_or_else(Uuid::new_v4));
        let mut inner = self.inner.write();

        if inner.universities.contains_key(&id) {
            return Err(StoreError::InvalidData {
                message: format!("University {} already exists", id),
            });
        }

        let university = University {
            id: id.0,
            name_ar: unit.name_ar,
            name_en: unit.name_en,
            description_ar: unit.description_ar,
            description_en: unit.description_en,
            created_at: Utc::now(),
        };
        inner.universities.insert(id, university.clone());
        Ok(university)
    }

    /// Add a college under an existing university
    pub fn add_college(&self, university_id: UniversityId, unit: NewUnit) -> Result<College, StoreError> {
        let id = CollegeId(unit.id.unwrap_or_else(Uuid::new_v4));
        let mut inner = self.inner.write();

        if !inner.universities.contains_key(&university_id) {
            return Err(StoreError::NotFound {
                entity: "University",
                id: university_id.to_string(),
            });
        }
        if inner.colleges.contains_key(&id) {
            return Err(StoreError::InvalidData {
                message: format!("College {} already exists", id),
            });
        }

        let college = College {
            id: id.0,
            university_id: university_id.0,
            name_ar: unit.name_ar,
            name_en: unit.name_en,
            description_ar: unit.description_ar,
            description_en: unit.description_en,
            created_at: Utc::now(),
        };
        inner.colleges.insert(id, college.clone());
        Ok(college)
    }

    /// Add a department under an existing college
    pub fn add_department(&self, college_id: CollegeId, unit: NewUnit) -> Result<Department, StoreError> {
        let id = DepartmentId(unit.id.unwrap_or_else(Uuid::new_v4));
        let mut inner = self.inner.write();

        if !inner.colleges.contains_key(&college_id) {
            return Err(StoreError::NotFound {
                entity: "College",
                id: college_id.to_string(),
            });
        }
        if inner.departments.contains_key(&id) {
            return Err(StoreError::InvalidData {
                message: format!("Department {} already exists", id),
            });
        }

        let department = Department {
            id: id.0,
            college_id: college_id.0,
            name_ar: unit.name_ar,
            name_en: unit.name_en,
            description_ar: unit.description_ar,
            description_en: unit.description_en,
            created_at: Utc::now(),
        };
        inner.departments.insert(id, department.clone());
        Ok(department)
    }

    /// Replace the names and descriptions of a university
    pub fn update_university(&self, id: UniversityId, fields: UnitFields) -> Result<University, StoreError> {
        let mut inner = self.inner.write();
        let university = inner.universities.get_mut(&id).ok_or_else(|| not_found("University", id))?;

        university.name_ar = fields.name_ar;
        university.name_en = fields.name_en;
        university.description_ar = fields.description_ar;
        university.description_en = fields.description_en;
        Ok(university.clone())
    }

    /// Replace the names and descriptions of a college
    pub fn update_college(&self, id: CollegeId, fields: UnitFields) -> Result<College, StoreError> {
        let mut inner = self.inner.write();
        let college = inner.colleges.get_mut(&id).ok_or_else(|| not_found("College", id))?;

        college.name_ar = fields.name_ar;
        college.name_en = fields.name_en;
        college.description_ar = fields.description_ar;
        college.description_en = fields.description_en;
        Ok(college.clone())
    }

    /// Replace the names and descriptions of a department
    pub fn update_department(&self, id: DepartmentId, fields: UnitFields) -> Result<Department, StoreError> {
        let mut inner = self.inner.write();
        let department = inner.departments.get_mut(&id).ok_or_else(|| not_found("Department", id))?;

        department.name_ar = fields.name_ar;
        department.name_en = fields.name_en;
        department.description_ar = fields.description_ar;
        department.description_en = fields.description_en;
        Ok(department.clone())
    }

    /// Remove a university without colleges
    pub fn remove_university(&self, id: UniversityId) -> Result<University, StoreError> {
        let mut inner = self.inner.write();
        if !inner.universities.contains_key(&id) {
            return Err(not_found("University", id));
        }
        if inner.colleges.values().any(|c| c.university_id == id.0) {
            return Err(StoreError::InvalidData {
                message: "University still has colleges".to_string(),
            });
        }

        inner.universities.remove(&id).ok_or_else(|| not_found("University", id))
    }

    /// Remove a college without departments
    pub fn remove_college(&self, id: CollegeId) -> Result<College, StoreError> {
        let mut inner = self.inner.write();
        if !inner.colleges.contains_key(&id) {
            return Err(not_found("College", id));
        }
        if inner.departments.values().any(|d| d.college_id == id.0) {
            return Err(StoreError::InvalidData {
                message: "College still has departments".to_string(),
            });
        }

        inner.colleges.remove(&id).ok_or_else(|| not_found("College", id))
    }

    pub fn remove_department(&self, id: DepartmentId) -> Result<Department, StoreError> {
        self.inner.write().departments.remove(&id).ok_or_else(|| not_found("Department", id))
    }

    pub fn university(&self, id: UniversityId) -> Option<University> {
        self.inner.read().universities.get(&id).cloned()
    }

    pub fn college(&self, id: CollegeId) -> Option<College> {
        self.inner.read().colleges.get(&id).cloned()
    }

    pub fn department(&self, id: DepartmentId) -> Option<Department> {
        self.inner.read().departments.get(&id).cloned()
    }

    /// All universities, ordered by Arabic name
    pub fn universities(&self) -> Vec<University> {
        let mut list: Vec<_> = self.inner.read().universities.values().cloned().collect();
        list.sort_by(|a, b| a.name_ar.cmp(&b.name_ar));
        list
    }

    /// Colleges of a university, ordered by Arabic name
    pub fn colleges_of(&self, university_id: UniversityId) -> Vec<College> {
        let mut list: Vec<_> = self.inner.read().colleges.values().filter(|c| c.university_id == university_id.0).cloned().collect();
        list.sort_by(|a, b| a.name_ar.cmp(&b.name_ar));
        list
    }

    /// Departments of a college, ordered by Arabic name
    pub fn departments_of(&self, college_id: CollegeId) -> Vec<Department> {
        let mut list: Vec<_> = self.inner.read().departments.values().filter(|d| d.college_id == college_id.0).cloned().collect();
        list.sort_by(|a, b| a.name_ar.cmp(&b.name_ar));
        list
    }

    /// Parent university of a college
    pub fn university_of_college(&self, college_id: CollegeId) -> Option<UniversityId> {
        self.inner.read().colleges.get(&college_id).map(|c| UniversityId(c.university_id))
    }

    /// Parent college of a department
    pub fn college_of_department(&self, department_id: DepartmentId) -> Option<CollegeId> {
        self.inner.read().departments.get(&department_id).map(|d| CollegeId(d.college_id))
    }

    /// University a department ultimately belongs to
    pub fn university_of_department(&self, department_id: DepartmentId) -> Option<UniversityId> {
        let inner = self.inner.read();
        let college_id = inner.departments.get(&department_id).map(|d| CollegeId(d.college_id))?;
        inner.colleges.get(&college_id).map(|c| UniversityId(c.university_id))
    }

    /// Number of (universities, colleges, departments)
    pub fn counts(&self) -> (usize, usize, usize) {
        let inner = self.inner.read();
        (inner.universities.len(), inner.colleges.len(), inner.departments.len())
    }
}

fn not_found(entity: &'static str, id: impl fmt::Display) -> StoreError {
    StoreError::NotFound { entity, id: id.to_string() }
}
