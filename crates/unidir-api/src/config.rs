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

//! Configuration management for the admin API

use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Upper bound for access token lifetime (30 days)
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Credentials of the site administrator created on first start
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Configuration for the admin API
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// JWT secret key for authentication
    pub jwt_secret: String,

    /// Lifetime of issued access tokens in seconds, within `1..=MAX_TOKEN_TTL_SECS`
    pub token_ttl_secs: i64,

    /// Allowed CORS origins (`*` allows any origin)
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// JSON file with universities, colleges and departments to load at startup
    pub seed_path: Option<PathBuf>,

    /// Site administrator to create when none exists
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            jwt_secret: "default-secret-change-in-production".to_string(),
            token_ttl_secs: 3600,
            cors_origins: vec!["*".to_string()],
            max_body_size: 1024 * 1024, // 1MB
            seed_path: None,
            bootstrap_admin: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bootstrap_admin = match (env::var("UNIDIR_BOOTSTRAP_ADMIN_EMAIL"), env::var("UNIDIR_BOOTSTRAP_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin {
                email,
                password,
                full_name: env::var("UNIDIR_BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|_| "Site Administrator".to_string()),
            }),
            _ => None,
        };

        Self {
            bind_address: env::var("UNIDIR_API_BIND_ADDRESS").unwrap_or(defaults.bind_address),

            jwt_secret: env::var("UNIDIR_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            token_ttl_secs: parse_token_ttl(env::var("UNIDIR_TOKEN_TTL_SECS").ok().as_deref(), defaults.token_ttl_secs),

            cors_origins: env::var("UNIDIR_CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
                .unwrap_or(defaults.cors_origins),

            max_body_size: env::var("UNIDIR_MAX_BODY_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.max_body_size),

            seed_path: env::var("UNIDIR_SEED_PATH").ok().map(PathBuf::from),

            bootstrap_admin,
        }
    }

    /// Value for the `Access-Control-Allow-Origin` header given the request origin
    pub fn allowed_origin(&self, request_origin: Option<&str>) -> Option<String> {
        if self.cors_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }

        request_origin.filter(|origin| self.cors_origins.iter().any(|o| o == origin)).map(str::to_string)
    }
}

/// Token lifetime from its raw setting; unparsable or out-of-range values fall back to `default`
fn parse_token_ttl(raw: Option<&str>, default: i64) -> i64 {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse::<i64>() {
        Ok(secs) if (1..=MAX_TOKEN_TTL_SECS).contains(&secs) => secs,
        _ => {
            warn!("Ignoring UNIDIR_TOKEN_TTL_SECS={:?}: expected 1..={} seconds", raw, MAX_TOKEN_TTL_SECS);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ttl_validation() {
        assert_eq!(parse_token_ttl(None, 3600), 3600);
        assert_eq!(parse_token_ttl(Some("900"), 3600), 900);
        assert_eq!(parse_token_ttl(Some(" 7200 "), 3600), 7200);
        assert_eq!(parse_token_ttl(Some("0"), 3600), 3600);
        assert_eq!(parse_token_ttl(Some("-5"), 3600), 3600);
        assert_eq!(parse_token_ttl(Some("9223372036854775807"), 3600), 3600);
        assert_eq!(parse_token_ttl(Some("hour"), 3600), 3600);
        assert_eq!(parse_token_ttl(Some(&MAX_TOKEN_TTL_SECS.to_string()), 3600), MAX_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_wildcard_origin() {
        let config = Config::default();
        assert_eq!(config.allowed_origin(Some("https://example.edu")), Some("*".to_string()));
        assert_eq!(config.allowed_origin(None), Some("*".to_string()));
    }

    #[test]
    fn test_listed_origin() {
        let config = Config {
            cors_origins: vec!["https://portal.example.edu".to_string()],
            ..Config::default()
        };

        assert_eq!(config.allowed_origin(Some("https://portal.example.edu")), Some("https://portal.example.edu".to_string()));
        assert_eq!(config.allowed_origin(Some("https://evil.example.com")), None);
        assert_eq!(config.allowed_origin(None), None);
    }
}
