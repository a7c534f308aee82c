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

//! Startup data: the organizational hierarchy and the first site administrator

use crate::config::BootstrapAdmin;
use crate::directory::{CollegeId, NewUnit, OrgDirectory, UniversityId};
use crate::error::ApiResult;
use crate::rbac::{AdminScope, RoleAssignment};
use crate::store::{NewIdentity, Profile, StoreError, Stores};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Seed file layout: universities with nested colleges and departments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub universities: Vec<UniversitySeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniversitySeed {
    #[serde(flatten)]
    pub unit: NewUnit,
    #[serde(default)]
    pub colleges: Vec<CollegeSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollegeSeed {
    #[serde(flatten)]
    pub unit: NewUnit,
    #[serde(default)]
    pub departments: Vec<NewUnit>,
}

/// Insert a seed into the directory, returning (universities, colleges, departments) added
pub fn load_directory(directory: &OrgDirectory, seed: DirectorySeed) -> Result<(usize, usize, usize), StoreError> {
    let mut counts = (0, 0, 0);

    for university in seed.universities {
        let university_id = UniversityId(directory.add_university(university.unit)?.id);
        counts.0 += 1;

        for college in university.colleges {
            let college_id = CollegeId(directory.add_college(university_id, college.unit)?.id);
            counts.1 += 1;

            for department in college.departments {
                directory.add_department(college_id, department)?;
                counts.2 += 1;
            }
        }
    }

    Ok(counts)
}

/// Load a JSON seed file into the directory
pub fn load_directory_file(directory: &OrgDirectory, path: &Path) -> ApiResult<(usize, usize, usize)> {
    let raw = std::fs::read_to_string(path)?;
    let seed: DirectorySeed = serde_json::from_str(&raw)?;
    let counts = load_directory(directory, seed)?;

    info!(
        universities = counts.0,
        colleges = counts.1,
        departments = counts.2,
        "Loaded organizational directory from {}",
        path.display()
    );
    Ok(counts)
}

/// Make sure a site administrator exists, creating the configured one if needed.
/// Returns the user id of the site administrator.
pub async fn ensure_site_admin(stores: &Stores, bootstrap: &BootstrapAdmin) -> ApiResult<Uuid> {
    if let Some(existing) = stores.roles.list().await?.into_iter().find(|role| role.scope == AdminScope::Site) {
        info!("Site administrator already present: {}", existing.user_id);
        return Ok(existing.user_id);
    }

    let user_id = match stores.identities.find_by_email(&bootstrap.email).await? {
        Some(identity) => {
            warn!("Promoting existing account {} to site administrator", identity.id);
            identity.id
        }
        None => {
            let identity = stores
                .identities
                .create_identity(NewIdentity {
                    email: bootstrap.email.clone(),
                    password: bootstrap.password.clone(),
                    email_confirmed: true,
                })
                .await?;
            identity.id
        }
    };

    if stores.profiles.get(user_id).await?.is_none() {
        stores.profiles.insert(Profile::new(user_id, Some(bootstrap.full_name.clone()))).await?;
    }
    stores.roles.insert(RoleAssignment::new(user_id, AdminScope::Site)).await?;

    info!("Created site administrator {}", user_id);
    Ok(user_id)
}
