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

//! Storage seams for the managed backend
//!
//! The service talks to three backend facilities: the identity provider
//! (accounts and credentials), the role assignment table and the profile
//! table. Each is a trait so deployments can plug the hosted backend while
//! tests and single-node runs use the in-memory implementations here.

pub mod identity;
pub mod profiles;
pub mod roles;

pub use identity::*;
pub use profiles::*;
pub use roles::*;

use std::sync::Arc;
use thiserror::Error;

/// Handles to the three backend facilities
#[derive(Clone)]
pub struct Stores {
    pub identities: Arc<dyn IdentityProvider>,
    pub roles: Arc<dyn RoleStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Stores {
    pub fn new(identities: Arc<dyn IdentityProvider>, roles: Arc<dyn RoleStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { identities, roles, profiles }
    }

    /// Fresh, empty in-memory backend
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryIdentityProvider::new()), Arc::new(InMemoryRoleStore::new()), Arc::new(InMemoryProfileStore::new()))
    }
}

/// Errors reported by the storage backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Email already registered: {email}")]
    EmailExists { email: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Credential error: {message}")]
    Credential { message: String },

    #[error("Backend error: {message}")]
    Backend { message: String },
}
