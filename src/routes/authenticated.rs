use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Authenticated Router Module
///
/// Every handler here receives a validated `AuthUser`. The router is wrapped by the
/// authentication middleware in `create_router`, so an anonymous request never reaches
/// the rule engine.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /api/roles/assign
        // Grants a role to a user, subject to the grant rules evaluated against the
        // requester's current roles.
        .route("/api/roles/assign", post(handlers::assign_role))
}
