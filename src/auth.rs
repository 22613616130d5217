use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    repository::RepositoryState,
};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Header accepted in `Env::Local` to act as a user without logging in.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the session token issued on login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user id, as a decimal string.
    pub sub: String,
    /// Expiration Time (exp): the token is rejected after this Unix timestamp.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// issue_session_token
///
/// Signs an HS256 token for `user_id` that expires after `config.session_ttl_secs`.
pub fn issue_session_token(config: &AppConfig, user_id: i64) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.session_ttl_secs as usize,
    };
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    Ok(encode(&Header::default(), &claims, &key)?)
}

/// `Set-Cookie` value that establishes the session in the browser.
pub fn session_cookie(config: &AppConfig, token: &str) -> String {
    let secure = if config.env == Env::Production { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{secure}",
        config.session_ttl_secs
    )
}

/// `Set-Cookie` value that expires the session cookie immediately.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request, with the role names it currently
/// holds. Handlers use it as the requester of role operations.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}

/// Pulls the token from `Authorization: Bearer …`, falling back to the session cookie.
fn token_from_parts(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.to_string())
        .filter(|token| !token.is_empty())
}

/// AuthUser Extractor Implementation
///
/// 1. Local Bypass: in `Env::Local`, a valid user id in `x-user-id` is accepted.
/// 2. Token: Bearer header or `session` cookie, HS256, expiry enforced.
/// 3. DB Lookup: the user must still exist; roles are re-read on every request so a grant
///    takes effect without logging in again.
///
/// Rejection: `AppError::Unauthenticated` (401) on any authentication failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let dev_user_id = parts
                .headers
                .get(DEV_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<i64>().ok());
            if let Some(user_id) = dev_user_id {
                if repo.get_user(user_id).await?.is_some() {
                    let roles = role_names(&repo, user_id).await?;
                    return Ok(AuthUser { id: user_id, roles });
                }
            }
        }

        let token = token_from_parts(parts).ok_or(AppError::Unauthenticated)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(&token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            AppError::Unauthenticated
        })?;

        let user_id: i64 = token_data
            .claims
            .sub
            .parse()
            .map_err(|_| AppError::Unauthenticated)?;

        // The token may outlive the account it was issued for.
        let user = repo
            .get_user(user_id)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        let roles = role_names(&repo, user.id).await?;
        Ok(AuthUser { id: user.id, roles })
    }
}

async fn role_names(repo: &RepositoryState, user_id: i64) -> Result<Vec<String>, AppError> {
    Ok(repo
        .get_roles_for_user(user_id)
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect())
}
