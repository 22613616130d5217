use crate::{
    error::{AppError, StoreError},
    models::{LoginRequest, LoginResponse, NewUser, RegisterRequest, RegisteredUser},
    policy::DEFAULT_ROLE,
    repository::Repository,
};

/// bcrypt work factor used when the configuration does not override it.
pub const DEFAULT_HASH_COST: u32 = 10;

/// register
///
/// Creates an account and gives it the default `cliente` role.
///
/// *Flow*: validate required fields, reject an existing email/username, hash the password
/// off the async runtime, then persist user and role association in one unit of work.
/// A concurrent registration that slips past the pre-check is still caught by the unique
/// constraints and reported as `DuplicateUser`.
pub async fn register(
    repo: &dyn Repository,
    req: RegisterRequest,
    hash_cost: u32,
) -> Result<RegisteredUser, AppError> {
    if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::MissingParameter("username, email and password"));
    }

    if repo
        .find_user_by_email_or_username(&req.email, &req.username)
        .await?
        .is_some()
    {
        tracing::warn!(username = %req.username, "registration rejected: duplicate user");
        return Err(AppError::DuplicateUser);
    }

    let password = req.password;
    let password_hash =
        tokio::task::spawn_blocking(move || bcrypt::hash(password, hash_cost)).await??;

    let new_user = NewUser {
        username: req.username,
        email: req.email,
        password_hash,
        display_name: req.name.unwrap_or_default(),
    };

    let user = repo
        .create_user_with_role(new_user, DEFAULT_ROLE)
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists => AppError::DuplicateUser,
            StoreError::MissingRole(name) => {
                AppError::Configuration(format!("the default role \"{name}\" is not available"))
            }
            other => AppError::Store(other),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok(RegisteredUser {
        id: user.id,
        username: user.username,
        email: user.email,
    })
}

/// login
///
/// Verifies credentials and returns the user's identity with the names of every role
/// currently held. Read-only: a failed attempt changes nothing.
pub async fn login(repo: &dyn Repository, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let user = repo
        .find_user_by_email(&req.email)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let password = req.password;
    let stored_hash = user.password_hash.clone();
    let valid =
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored_hash)).await??;

    if !valid {
        tracing::warn!(user_id = user.id, "login rejected: incorrect password");
        return Err(AppError::InvalidCredentials);
    }

    let roles = repo
        .get_roles_for_user(user.id)
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect();

    tracing::info!(user_id = user.id, "user logged in");

    Ok(LoginResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        roles,
    })
}
