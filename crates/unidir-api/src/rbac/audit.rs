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

//! Audit logging for administrator management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Audit event types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    AdminCreated,
    AdminActivated,
    AdminDeactivated,
    PasswordReset,
    PermissionDenied,
    /// A partially applied operation was compensated
    Rollback,
    Login,
    RolePermissionsUpdated,
    DirectoryChanged,
}

/// Audit event result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
    Denied,
}

/// Audit event entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: AuditEventType,
    pub timestamp: DateTime<Utc>,

    /// User who performed the action
    pub actor: Uuid,

    /// User the action was aimed at
    pub target_user: Option<Uuid>,

    pub result: AuditResult,
    pub details: HashMap<String, String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, actor: Uuid, result: AuditResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            actor,
            target_user: None,
            result,
            details: HashMap::new(),
        }
    }

    pub fn with_target_user(mut self, target_user: Uuid) -> Self {
        self.target_user = Some(target_user);
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<String>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Bounded in-memory audit trail mirrored to structured logs
#[derive(Debug)]
pub struct AuditLogger {
    events: RwLock<VecDeque<AuditEvent>>,
    max_events: usize,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self::with_max_events(10_000)
    }

    pub fn with_max_events(max_events: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            max_events,
        }
    }

    /// Record an event
    pub async fn log_event(&self, event: AuditEvent) {
        match event.result {
            AuditResult::Success => {
                info!(
                    event_type = ?event.event_type,
                    actor = %event.actor,
                    target_user = ?event.target_user,
                    details = ?event.details,
                    "Audit event: {:?}", event.event_type
                );
            }
            AuditResult::Failure | AuditResult::Denied => {
                warn!(
                    event_type = ?event.event_type,
                    actor = %event.actor,
                    target_user = ?event.target_user,
                    result = ?event.result,
                    details = ?event.details,
                    "Audit event: {:?} - {:?}", event.event_type, event.result
                );
            }
        }

        let mut events = self.events.write().await;
        events.push_back(event);
        while events.len() > self.max_events {
            events.pop_front();
        }
    }

    pub async fn log_admin_created(&self, actor: Uuid, target_user: Uuid, role: &str) {
        let event = AuditEvent::new(AuditEventType::AdminCreated, actor, AuditResult::Success)
            .with_target_user(target_user)
            .with_detail("role", role);
        self.log_event(event).await;
    }

    pub async fn log_activation_changed(&self, actor: Uuid, target_user: Uuid, is_active: bool) {
        let event_type = if is_active { AuditEventType::AdminActivated } else { AuditEventType::AdminDeactivated };
        let event = AuditEvent::new(event_type, actor, AuditResult::Success).with_target_user(target_user);
        self.log_event(event).await;
    }

    pub async fn log_password_reset(&self, actor: Uuid, target_user: Uuid) {
        let event = AuditEvent::new(AuditEventType::PasswordReset, actor, AuditResult::Success).with_target_user(target_user);
        self.log_event(event).await;
    }

    pub async fn log_denied(&self, actor: Uuid, action: &str, reason: &str) {
        let event = AuditEvent::new(AuditEventType::PermissionDenied, actor, AuditResult::Denied)
            .with_detail("action", action)
            .with_detail("reason", reason);
        self.log_event(event).await;
    }

    pub async fn log_rollback(&self, actor: Uuid, target_user: Uuid, operation: &str, succeeded: bool) {
        let result = if succeeded { AuditResult::Success } else { AuditResult::Failure };
        let event = AuditEvent::new(AuditEventType::Rollback, actor, result)
            .with_target_user(target_user)
            .with_detail("operation", operation);
        self.log_event(event).await;
    }

    pub async fn log_login(&self, user_id: Uuid, success: bool) {
        let result = if success { AuditResult::Success } else { AuditResult::Failure };
        self.log_event(AuditEvent::new(AuditEventType::Login, user_id, result)).await;
    }

    pub async fn log_role_permissions_updated(&self, actor: Uuid, changes: usize) {
        let event = AuditEvent::new(AuditEventType::RolePermissionsUpdated, actor, AuditResult::Success).with_detail("changes", changes.to_string());
        self.log_event(event).await;
    }

    pub async fn log_directory_changed(&self, actor: Uuid, unit: &str, operation: &str, unit_id: Uuid) {
        let event = AuditEvent::new(AuditEventType::DirectoryChanged, actor, AuditResult::Success)
            .with_detail("unit", unit)
            .with_detail("operation", operation)
            .with_detail("unit_id", unit_id.to_string());
        self.log_event(event).await;
    }

    /// Most recent events first
    pub async fn get_events(&self, limit: Option<usize>) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().take(limit.unwrap_or(usize::MAX)).cloned().collect()
    }

    /// Events of one type, most recent first
    pub async fn get_events_by_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        let events = self.events.read().await;
        events.iter().rev().filter(|event| event.event_type == event_type).cloned().collect()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}
