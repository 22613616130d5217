use crate::{
    AppState,
    auth::{self, AuthUser},
    error::AppError,
    models::{
        AssignRoleRequest, ErrorResponse, LoginRequest, LoginResponse, MessageResponse,
        RegisterRequest, RegisteredUser, SuccessMessage, UserRolesResponse,
    },
    policy::SUPERADMIN,
    services::{accounts, roles},
};
use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderName, StatusCode, header},
};

/// Failure half of every `/api/auth` handler: a status plus `{error}`.
pub type AuthFailure = (StatusCode, Json<ErrorResponse>);

/// auth_failure
///
/// Builds the `/api/auth` error body. Client-side failures are reported with the status
/// the endpoint documents (`fallback`); unparseable bodies keep their 400 and internal
/// failures their 500.
fn auth_failure(err: AppError, fallback: StatusCode) -> AuthFailure {
    let status = if err.status_code().is_server_error()
        || matches!(err, AppError::InvalidRequest(_))
    {
        err.status_code()
    } else {
        fallback
    };
    (
        status,
        Json(ErrorResponse {
            error: err.public_message(),
        }),
    )
}

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates an account holding the default `cliente` role.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisteredUser),
        (status = 400, description = "Missing fields, malformed body or duplicate user", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisteredUser>), AuthFailure> {
    let Json(payload) = payload.map_err(|e| auth_failure(e.into(), StatusCode::BAD_REQUEST))?;
    let user = accounts::register(state.repo.as_ref(), payload, state.config.password_hash_cost)
        .await
        .map_err(|e| auth_failure(e, StatusCode::BAD_REQUEST))?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// login
///
/// [Public Route] Verifies credentials and establishes the session cookie.
///
/// *Note*: every client-side failure, including an unknown email, is a 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; sets the session cookie", body = LoginResponse),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Unknown email or wrong password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<([(HeaderName, String); 1], Json<LoginResponse>), AuthFailure> {
    let Json(payload) = payload.map_err(|e| auth_failure(e.into(), StatusCode::BAD_REQUEST))?;
    let user = accounts::login(state.repo.as_ref(), payload)
        .await
        .map_err(|e| auth_failure(e, StatusCode::UNAUTHORIZED))?;

    let token = auth::issue_session_token(&state.config, user.id)
        .map_err(|e| auth_failure(e, StatusCode::UNAUTHORIZED))?;
    let cookie = auth::session_cookie(&state.config, &token);

    Ok(([(header::SET_COOKIE, cookie)], Json(user)))
}

/// logout
///
/// [Public Route] Expires the session cookie. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout() -> ([(HeaderName, String); 1], Json<MessageResponse>) {
    (
        [(header::SET_COOKIE, auth::clear_session_cookie())],
        Json(MessageResponse {
            message: "logged out".to_string(),
        }),
    )
}

// --- Role Handlers ---

/// assign_role
///
/// [Authenticated Route] Grants a role to a user. The requester is the `AuthUser` the
/// authentication middleware resolved from the session and stored in the request
/// extensions; the body only names the target and the role.
#[utoipa::path(
    post,
    path = "/api/roles/assign",
    request_body = AssignRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = SuccessMessage),
        (status = 400, description = "Missing ids, malformed body or role already held", body = SuccessMessage),
        (status = 401, description = "Not authenticated", body = SuccessMessage),
        (status = 403, description = "Requester may not grant this role", body = SuccessMessage),
        (status = 404, description = "Requester, role or target user not found", body = SuccessMessage)
    )
)]
pub async fn assign_role(
    Extension(auth_user): Extension<AuthUser>,
    State(state): State<AppState>,
    payload: Result<Json<AssignRoleRequest>, JsonRejection>,
) -> Result<Json<SuccessMessage>, AppError> {
    let Json(payload) = payload?;
    let message = roles::assign_role(state.repo.as_ref(), auth_user.id, payload).await?;
    Ok(Json(SuccessMessage {
        success: true,
        message,
    }))
}

/// get_user_roles
///
/// [Public Route] Lists the roles a user currently holds.
#[utoipa::path(
    get,
    path = "/api/roles/usuario/{user_id}",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Roles held", body = UserRolesResponse),
        (status = 400, description = "User id is not a number", body = SuccessMessage),
        (status = 404, description = "User not found", body = SuccessMessage)
    )
)]
pub async fn get_user_roles(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserRolesResponse>, AppError> {
    let Path(user_id) = user_id?;
    let roles = roles::roles_for_user(state.repo.as_ref(), user_id).await?;
    Ok(Json(UserRolesResponse {
        success: true,
        roles,
    }))
}

/// superadmin_only
///
/// [Admin Route] Access check for superadmin-only areas.
///
/// *Authorization*: explicitly checks that the requester holds "superadmin".
#[utoipa::path(
    get,
    path = "/api/roles/solo-superadmin",
    responses(
        (status = 200, description = "Requester is a superadmin", body = SuccessMessage),
        (status = 401, description = "Not authenticated", body = SuccessMessage),
        (status = 403, description = "Requester is not a superadmin", body = SuccessMessage)
    )
)]
pub async fn superadmin_only(auth_user: AuthUser) -> Result<Json<SuccessMessage>, AppError> {
    if !auth_user.has_role(SUPERADMIN) {
        return Err(AppError::Forbidden(
            "access restricted to superadmins".to_string(),
        ));
    }
    Ok(Json(SuccessMessage {
        success: true,
        message: "welcome, superadmin: access granted".to_string(),
    }))
}
