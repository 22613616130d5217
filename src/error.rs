use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::SuccessMessage;

/// StoreError
///
/// Failures raised by the persistence layer. Uniqueness violations are surfaced as the
/// typed `AlreadyExists` variant so callers never need to pre-check before inserting.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique or primary-key constraint rejected the insert.
    #[error("record already exists")]
    AlreadyExists,

    /// A role the operation depends on is not present in the `roles` table.
    #[error("role \"{0}\" is not seeded")]
    MissingRole(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Maps Postgres unique violations (SQLSTATE 23505) onto `AlreadyExists`.
    pub fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::AlreadyExists,
            _ => StoreError::Database(err),
        }
    }
}

/// AppError
///
/// Every way a service operation can fail. Each variant carries a human-readable message
/// and maps to exactly one HTTP status through `status_code`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required parameters: {0}")]
    MissingParameter(&'static str),

    /// The request body or path could not be parsed into the expected shape.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email or username is already registered")]
    DuplicateUser,

    #[error("incorrect password")]
    InvalidCredentials,

    /// The requester's roles do not allow granting the requested role.
    #[error("{0}")]
    ForbiddenRole(String),

    /// The requester lacks a role needed to reach a restricted endpoint.
    #[error("{0}")]
    Forbidden(String),

    #[error("user already holds the role \"{0}\"")]
    DuplicateAssignment(String),

    /// A data-seeding precondition is not met (e.g. the default role is missing).
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("not authenticated")]
    Unauthenticated,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_)
            | AppError::InvalidRequest(_)
            | AppError::DuplicateUser
            | AppError::DuplicateAssignment(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenRole(_) | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Configuration(_)
            | AppError::Store(_)
            | AppError::PasswordHash(_)
            | AppError::Token(_)
            | AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message that is safe to show a client. Internal failures are logged and
    /// replaced with a generic text so driver or hashing details never leak.
    pub fn public_message(&self) -> String {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed with an internal error");
            "internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

/// Role endpoints and the authentication extractor answer with `{success: false, message}`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = SuccessMessage {
            success: false,
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
