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

//! Identity provider: accounts, credentials and suspension

use crate::store::StoreError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Shortest password accepted anywhere in the system
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Suspension applied when an administrator is deactivated (~100 years)
pub const BAN_DURATION_HOURS: i64 = 876_000;

/// Account record held by the identity provider
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
    pub banned_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_sign_in: Option<DateTime<Utc>>,
}

impl Identity {
    /// Whether the account is currently suspended
    pub fn is_banned(&self) -> bool {
        self.banned_until.map(|until| until > Utc::now()).unwrap_or(false)
    }
}

/// Data needed to register an account
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub password: String,
    pub email_confirmed: bool,
}

/// Account and credential operations of the backend's auth service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account; fails when the email is taken or the password is too weak
    async fn create_identity(&self, new_identity: NewIdentity) -> Result<Identity, StoreError>;

    /// Remove an account permanently
    async fn delete_identity(&self, id: Uuid) -> Result<(), StoreError>;

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Check a password; returns the identity when it matches.
    /// Suspended accounts are returned as well, the caller decides.
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<Identity>, StoreError>;

    /// Suspend (`true`) or reinstate (`false`) an account
    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<(), StoreError>;

    /// Replace the account's password
    async fn update_password(&self, id: Uuid, password: &str) -> Result<(), StoreError>;
}

/// Check a candidate password against the password policy
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Canonical form of an email address, or an error message when it is malformed
pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.') => Ok(email),
        _ => Err(format!("Invalid email address: {}", email)),
    }
}

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let mut salt_bytes = [0u8; 16];
    SystemRandom::new().fill(&mut salt_bytes).map_err(|_| StoreError::Credential {
        message: "Failed to generate password salt".to_string(),
    })?;

    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| StoreError::Credential {
        message: format!("Failed to encode password salt: {}", e),
    })?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Credential {
            message: format!("Password hashing failed: {}", e),
        })
}

/// Verify a password against a stored PHC hash string
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// Identity provider kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    identities: RwLock<HashMap<Uuid, Identity>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_identity(&self, new_identity: NewIdentity) -> Result<Identity, StoreError> {
        let email = normalize_email(&new_identity.email).map_err(|message| StoreError::InvalidData { message })?;
        validate_password(&new_identity.password).map_err(|message| StoreError::InvalidData { message })?;
        let password_hash = hash_password(&new_identity.password)?;

        let mut identities = self.identities.write().await;
        if identities.values().any(|identity| identity.email == email) {
            return Err(StoreError::EmailExists { email });
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            email,
            password_hash,
            email_confirmed: new_identity.email_confirmed,
            banned_until: None,
            created_at: Utc::now(),
            last_sign_in: None,
        };
        identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn delete_identity(&self, id: Uuid) -> Result<(), StoreError> {
        let mut identities = self.identities.write().await;
        identities.remove(&id).map(|_| ()).ok_or_else(|| StoreError::NotFound {
            entity: "Identity",
            id: id.to_string(),
        })
    }

    async fn get_identity(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(self.identities.read().await.values().find(|identity| identity.email == email).cloned())
    }

    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<Identity>, StoreError> {
        let email = email.trim().to_lowercase();
        let mut identities = self.identities.write().await;

        let Some(identity) = identities.values_mut().find(|identity| identity.email == email) else {
            return Ok(None);
        };

        if !verify_password(&identity.password_hash, password) {
            return Ok(None);
        }

        if !identity.is_banned() {
            identity.last_sign_in = Some(Utc::now());
        }
        Ok(Some(identity.clone()))
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<(), StoreError> {
        let mut identities = self.identities.write().await;
        let identity = identities.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "Identity",
            id: id.to_string(),
        })?;

        identity.banned_until = if banned { Some(Utc::now() + Duration::hours(BAN_DURATION_HOURS)) } else { None };
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password: &str) -> Result<(), StoreError> {
        validate_password(password).map_err(|message| StoreError::InvalidData { message })?;
        let password_hash = hash_password(password)?;

        let mut identities = self.identities.write().await;
        let identity = identities.get_mut(&id).ok_or_else(|| StoreError::NotFound {
            entity: "Identity",
            id: id.to_string(),
        })?;

        identity.password_hash = password_hash;
        Ok(())
    }
}
