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

//! HTTP request handlers

pub mod auth;
pub mod directory;
pub mod health;
pub mod messages;
pub mod permissions;

use crate::error::{ApiError, ApiResult};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Decode a JSON request body
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    if body.is_empty() {
        return Err(ApiError::bad_request("Request body is required"));
    }
    Ok(serde_json::from_slice(body)?)
}

/// JSON response with the given status
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> ApiResult<Response<Full<Bytes>>> {
    let response_json = serde_json::to_string(value)?;

    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(response_json)))?)
}
