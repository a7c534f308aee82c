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

//! Organizational directory handlers

use crate::admin::UnitManager;
use crate::auth::SessionContext;
use crate::directory::{CollegeId, DepartmentId, OrgDirectory, UnitFields, UniversityId};
use crate::error::{ApiError, ApiResult};
use crate::handlers::{json_response, parse_json};
use http_body_util::Full;
use hyper::{Response, StatusCode, body::Bytes};
use std::sync::Arc;
use uuid::Uuid;

fn parse_id(raw: &str, entity: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid {} id: {}", entity, raw)))
}

/// List universities
/// GET /api/v1/universities
#[utoipa::path(
    get,
    path = "/api/v1/universities",
    responses(
        (status = 200, description = "All universities", body = [crate::directory::University])
    ),
    tag = "Directory"
)]
pub async fn list_universities(directory: Arc<OrgDirectory>) -> ApiResult<Response<Full<Bytes>>> {
    json_response(StatusCode::OK, &directory.universities())
}

/// Colleges of a university
/// GET /api/v1/universities/{id}/colleges
#[utoipa::path(
    get,
    path = "/api/v1/universities/{id}/colleges",
    params(("id" = Uuid, Path, description = "University id")),
    responses(
        (status = 200, description = "Colleges of the university", body = [crate::directory::College]),
        (status = 404, description = "University not found")
    ),
    tag = "Directory"
)]
pub async fn list_colleges(id: &str, directory: Arc<OrgDirectory>) -> ApiResult<Response<Full<Bytes>>> {
    let university_id = UniversityId(parse_id(id, "university")?);
    if directory.university(university_id).is_none() {
        return Err(ApiError::not_found(format!("University not found: {}", university_id)));
    }

    json_response(StatusCode::OK, &directory.colleges_of(university_id))
}

/// Departments of a college
/// GET /api/v1/colleges/{id}/departments
#[utoipa::path(
    get,
    path = "/api/v1/colleges/{id}/departments",
    params(("id" = Uuid, Path, description = "College id")),
    responses(
        (status = 200, description = "Departments of the college", body = [crate::directory::Department]),
        (status = 404, description = "College not found")
    ),
    tag = "Directory"
)]
pub async fn list_departments(id: &str, directory: Arc<OrgDirectory>) -> ApiResult<Response<Full<Bytes>>> {
    let college_id = CollegeId(parse_id(id, "college")?);
    if directory.college(college_id).is_none() {
        return Err(ApiError::not_found(format!("College not found: {}", college_id)));
    }

    json_response(StatusCode::OK, &directory.departments_of(college_id))
}

/// Create a university
/// POST /api/v1/universities
#[utoipa::path(
    post,
    path = "/api/v1/universities",
    request_body = UnitFields,
    responses(
        (status = 201, description = "University created", body = crate::directory::University),
        (status = 400, description = "Missing Arabic name"),
        (status = 403, description = "Site administrators only")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn create_university(body: Bytes, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let fields: UnitFields = parse_json(&body)?;
    json_response(StatusCode::CREATED, &units.create_university(session, fields).await?)
}

/// Edit a university
/// PUT /api/v1/universities/{id}
#[utoipa::path(
    put,
    path = "/api/v1/universities/{id}",
    params(("id" = Uuid, Path, description = "University id")),
    request_body = UnitFields,
    responses(
        (status = 200, description = "University updated", body = crate::directory::University),
        (status = 403, description = "Site administrators only"),
        (status = 404, description = "University not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn update_university(id: &str, body: Bytes, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let university_id = UniversityId(parse_id(id, "university")?);
    let fields: UnitFields = parse_json(&body)?;
    json_response(StatusCode::OK, &units.update_university(session, university_id, fields).await?)
}

/// Remove a university without colleges
/// DELETE /api/v1/universities/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/universities/{id}",
    params(("id" = Uuid, Path, description = "University id")),
    responses(
        (status = 200, description = "Removed university", body = crate::directory::University),
        (status = 400, description = "University still has colleges"),
        (status = 403, description = "Site administrators only"),
        (status = 404, description = "University not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn delete_university(id: &str, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let university_id = UniversityId(parse_id(id, "university")?);
    json_response(StatusCode::OK, &units.remove_university(session, university_id).await?)
}

/// Create a college under a university
/// POST /api/v1/universities/{id}/colleges
#[utoipa::path(
    post,
    path = "/api/v1/universities/{id}/colleges",
    params(("id" = Uuid, Path, description = "University id")),
    request_body = UnitFields,
    responses(
        (status = 201, description = "College created", body = crate::directory::College),
        (status = 403, description = "Outside the caller's university or feature disabled"),
        (status = 404, description = "University not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn create_college(id: &str, body: Bytes, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let university_id = UniversityId(parse_id(id, "university")?);
    let fields: UnitFields = parse_json(&body)?;
    json_response(StatusCode::CREATED, &units.create_college(session, university_id, fields).await?)
}

/// Edit a college
/// PUT /api/v1/colleges/{id}
#[utoipa::path(
    put,
    path = "/api/v1/colleges/{id}",
    params(("id" = Uuid, Path, description = "College id")),
    request_body = UnitFields,
    responses(
        (status = 200, description = "College updated", body = crate::directory::College),
        (status = 403, description = "Outside the caller's university or feature disabled"),
        (status = 404, description = "College not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn update_college(id: &str, body: Bytes, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let college_id = CollegeId(parse_id(id, "college")?);
    let fields: UnitFields = parse_json(&body)?;
    json_response(StatusCode::OK, &units.update_college(session, college_id, fields).await?)
}

/// Remove a college without departments
/// DELETE /api/v1/colleges/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/colleges/{id}",
    params(("id" = Uuid, Path, description = "College id")),
    responses(
        (status = 200, description = "Removed college", body = crate::directory::College),
        (status = 400, description = "College still has departments"),
        (status = 403, description = "Outside the caller's university or feature disabled"),
        (status = 404, description = "College not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn delete_college(id: &str, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let college_id = CollegeId(parse_id(id, "college")?);
    json_response(StatusCode::OK, &units.remove_college(session, college_id).await?)
}

/// Create a department under a college
/// POST /api/v1/colleges/{id}/departments
#[utoipa::path(
    post,
    path = "/api/v1/colleges/{id}/departments",
    params(("id" = Uuid, Path, description = "College id")),
    request_body = UnitFields,
    responses(
        (status = 201, description = "Department created", body = crate::directory::Department),
        (status = 403, description = "Outside the caller's scope or feature disabled"),
        (status = 404, description = "College not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn create_department(id: &str, body: Bytes, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let college_id = CollegeId(parse_id(id, "college")?);
    let fields: UnitFields = parse_json(&body)?;
    json_response(StatusCode::CREATED, &units.create_department(session, college_id, fields).await?)
}

/// Edit a department
/// PUT /api/v1/departments/{id}
#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department id")),
    request_body = UnitFields,
    responses(
        (status = 200, description = "Department updated", body = crate::directory::Department),
        (status = 403, description = "Outside the caller's scope or feature disabled"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn update_department(id: &str, body: Bytes, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let department_id = DepartmentId(parse_id(id, "department")?);
    let fields: UnitFields = parse_json(&body)?;
    json_response(StatusCode::OK, &units.update_department(session, department_id, fields).await?)
}

/// Remove a department
/// DELETE /api/v1/departments/{id}
#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 200, description = "Removed department", body = crate::directory::Department),
        (status = 403, description = "Outside the caller's scope or feature disabled"),
        (status = 404, description = "Department not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Directory"
)]
pub async fn delete_department(id: &str, session: &SessionContext, units: Arc<UnitManager>) -> ApiResult<Response<Full<Bytes>>> {
    let department_id = DepartmentId(parse_id(id, "department")?);
    json_response(StatusCode::OK, &units.remove_department(session, department_id).await?)
}
