use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Routes reserved for superadmins. The handler resolves `AuthUser` itself and checks for
/// the `superadmin` role, answering 401 without a session and 403 without the role.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/roles/solo-superadmin
        .route("/api/roles/solo-superadmin", get(handlers::superadmin_only))
}
