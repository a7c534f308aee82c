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

//! User profile storage

use crate::store::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

/// Public profile of a user, keyed by the identity id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(user_id: Uuid, full_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            full_name,
            avatar_url: None,
            phone: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProfileChanges {
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
}

/// Profile table
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert(&self, profile: Profile) -> Result<Profile, StoreError>;

    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Profiles for the given users; missing users are skipped
    async fn get_many(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, StoreError>;

    /// All profiles, newest first
    async fn list(&self) -> Result<Vec<Profile>, StoreError>;

    async fn update(&self, user_id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError>;

    async fn delete(&self, user_id: Uuid) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<Uuid, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn insert(&self, profile: Profile) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.user_id) {
            return Err(StoreError::InvalidData {
                message: format!("Profile for user {} already exists", profile.user_id),
            });
        }
        profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn get_many(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, StoreError> {
        let profiles = self.profiles.read().await;
        Ok(user_ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }

    async fn list(&self) -> Result<Vec<Profile>, StoreError> {
        let mut profiles: Vec<Profile> = self.profiles.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn update(&self, user_id: Uuid, changes: ProfileChanges) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(&user_id).ok_or_else(|| StoreError::NotFound {
            entity: "Profile",
            id: user_id.to_string(),
        })?;

        if let Some(full_name) = changes.full_name {
            profile.full_name = Some(full_name);
        }
        if let Some(avatar_url) = changes.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        if let Some(phone) = changes.phone {
            profile.phone = Some(phone);
        }
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.profiles.write().await.remove(&user_id).map(|_| ()).ok_or_else(|| StoreError::NotFound {
            entity: "Profile",
            id: user_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let store = InMemoryProfileStore::new();
        let user_id = Uuid::new_v4();

        store.insert(Profile::new(user_id, Some("Layla".to_string()))).await.unwrap();
        assert!(store.insert(Profile::new(user_id, None)).await.is_err());

        let updated = store
            .update(
                user_id,
                ProfileChanges {
                    phone: Some("+966500000000".to_string()),
                    ..ProfileChanges::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Layla"));
        assert_eq!(updated.phone.as_deref(), Some("+966500000000"));

        store.delete(user_id).await.unwrap();
        assert!(store.get(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let store = InMemoryProfileStore::new();
        let present = Uuid::new_v4();
        store.insert(Profile::new(present, None)).await.unwrap();

        let found = store.get_many(&[present, Uuid::new_v4()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, present);
    }

    #[tokio::test]
    async fn test_update_missing_profile() {
        let store = InMemoryProfileStore::new();
        let result = store.update(Uuid::new_v4(), ProfileChanges::default()).await;
        assert!(matches!(result, Err(StoreError::NotFound { entity: "Profile", .. })));
    }
}
