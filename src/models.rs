use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A registered account from the `users` table. The password hash is loaded for
/// credential checks but is never serialized into any response.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub display_name: String,
    // 'active' for every account created through registration.
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// NewUser
///
/// Insert payload for a user row. The password has already been hashed by the service.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

/// Role
///
/// A named permission grouping from the `roles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /api/auth/register`. Missing fields deserialize to empty
/// strings so the service can report them as a missing-parameter failure.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// AssignRoleRequest
///
/// Input payload for `POST /api/roles/assign`. The requester is never part of the body;
/// it is resolved from the session by the `AuthUser` extractor.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AssignRoleRequest {
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(rename = "rolId", default)]
    pub role_id: Option<i64>,
}

// --- Response Schemas (Output) ---

/// RegisteredUser
///
/// Output of a successful registration. Deliberately excludes every credential field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisteredUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// LoginResponse
///
/// Identity and role names of the user who just authenticated.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

/// ErrorResponse
///
/// Failure body of the `/api/auth` endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

/// SuccessMessage
///
/// Body of the `/api/roles` endpoints that only report an outcome, and of every
/// `/api/roles` failure (`success: false`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SuccessMessage {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserRolesResponse {
    pub success: bool,
    pub roles: Vec<Role>,
}
