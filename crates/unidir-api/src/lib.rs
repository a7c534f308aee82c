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

//! University directory administration API
//!
//! Scoped administrator management for a university directory: site,
//! university, college and department administrators, an organizational
//! hierarchy, authentication and messaging, served over HTTP with hyper.

pub mod admin;
pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod messaging;
pub mod models;
pub mod rbac;
pub mod router;
pub mod seed;
pub mod server;
pub mod store;
