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

//! Role assignment storage

use crate::rbac::roles::{RoleAssignment, RoleId};
use crate::store::StoreError;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Role assignment table
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn insert(&self, assignment: RoleAssignment) -> Result<RoleAssignment, StoreError>;

    async fn get(&self, id: RoleId) -> Result<Option<RoleAssignment>, StoreError>;

    /// The user's first role assignment, if any
    async fn for_user(&self, user_id: Uuid) -> Result<Option<RoleAssignment>, StoreError>;

    /// All assignments, newest first
    async fn list(&self) -> Result<Vec<RoleAssignment>, StoreError>;

    async fn set_active(&self, id: RoleId, is_active: bool) -> Result<RoleAssignment, StoreError>;

    async fn delete(&self, id: RoleId) -> Result<(), StoreError>;
}

/// Role table kept in process memory, in insertion order
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    assignments: RwLock<Vec<RoleAssignment>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn insert(&self, assignment: RoleAssignment) -> Result<RoleAssignment, StoreError> {
        let mut assignments = self.assignments.write().await;

        if assignments.iter().any(|existing| existing.id == assignment.id) {
            return Err(StoreError::InvalidData {
                message: format!("Role assignment {} already exists", assignment.id),
            });
        }
        if assignments.iter().any(|existing| existing.user_id == assignment.user_id) {
            return Err(StoreError::InvalidData {
                message: format!("User {} already has an administrator role", assignment.user_id),
            });
        }

        assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn get(&self, id: RoleId) -> Result<Option<RoleAssignment>, StoreError> {
        Ok(self.assignments.read().await.iter().find(|a| a.id == id).cloned())
    }

    async fn for_user(&self, user_id: Uuid) -> Result<Option<RoleAssignment>, StoreError> {
        Ok(self.assignments.read().await.iter().find(|a| a.user_id == user_id).cloned())
    }

    async fn list(&self) -> Result<Vec<RoleAssignment>, StoreError> {
        let mut assignments: Vec<RoleAssignment> = self.assignments.read().await.iter().rev().cloned().collect();
        // Stable sort keeps later inserts first when timestamps tie
        assignments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assignments)
    }

    async fn set_active(&self, id: RoleId, is_active: bool) -> Result<RoleAssignment, StoreError> {
        let mut assignments = self.assignments.write().await;
        let assignment = assignments.iter_mut().find(|a| a.id == id).ok_or_else(|| StoreError::NotFound {
            entity: "Role",
            id: id.to_string(),
        })?;

        assignment.is_active = is_active;
        Ok(assignment.clone())
    }

    async fn delete(&self, id: RoleId) -> Result<(), StoreError> {
        let mut assignments = self.assignments.write().await;
        let before = assignments.len();
        assignments.retain(|a| a.id != id);

        if assignments.len() == before {
            return Err(StoreError::NotFound {
                entity: "Role",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::CollegeId;
    use crate::rbac::roles::AdminScope;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let store = InMemoryRoleStore::new();
        let user_id = Uuid::new_v4();
        let assignment = store.insert(RoleAssignment::new(user_id, AdminScope::College(CollegeId::new()))).await.unwrap();

        assert_eq!(store.get(assignment.id).await.unwrap(), Some(assignment.clone()));
        assert_eq!(store.for_user(user_id).await.unwrap(), Some(assignment));
        assert!(store.for_user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_role_per_user() {
        let store = InMemoryRoleStore::new();
        let user_id = Uuid::new_v4();
        store.insert(RoleAssignment::new(user_id, AdminScope::Site)).await.unwrap();

        let result = store.insert(RoleAssignment::new(user_id, AdminScope::College(CollegeId::new()))).await;
        assert!(matches!(result, Err(StoreError::InvalidData { .. })));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryRoleStore::new();
        let first = store.insert(RoleAssignment::new(Uuid::new_v4(), AdminScope::Site)).await.unwrap();
        let second = store.insert(RoleAssignment::new(Uuid::new_v4(), AdminScope::Site)).await.unwrap();

        let list = store.list().await.unwrap();
        assert_eq!(list[0].id, second.id);
        assert_eq!(list[1].id, first.id);
    }

    #[tokio::test]
    async fn test_set_active_and_delete() {
        let store = InMemoryRoleStore::new();
        let assignment = store.insert(RoleAssignment::new(Uuid::new_v4(), AdminScope::Site)).await.unwrap();

        let updated = store.set_active(assignment.id, false).await.unwrap();
        assert!(!updated.is_active);

        store.delete(assignment.id).await.unwrap();
        assert!(matches!(store.set_active(assignment.id, true).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(store.delete(assignment.id).await, Err(StoreError::NotFound { .. })));
    }
}
