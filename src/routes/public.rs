use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no session. Registration and login are the gateway into the
/// system; the role lookup is read-only.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates an account with the default `cliente` role.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Verifies credentials and sets the session cookie.
        .route("/api/auth/login", post(handlers::login))
        // POST /api/auth/logout
        // Expires the session cookie.
        .route("/api/auth/logout", post(handlers::logout))
        // GET /api/roles/usuario/{user_id}
        // Lists the roles a user holds.
        .route("/api/roles/usuario/{user_id}", get(handlers::get_user_roles))
}
