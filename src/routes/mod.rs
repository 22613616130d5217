/// Router Module Index
///
/// Splits routing into access-segregated modules so access control is applied explicitly
/// per module (via Axum layers) rather than per handler by convention.

/// Routes open to anonymous clients: registration, login, logout, role lookup, health.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a valid session; the session user is the requester of role grants.
pub mod authenticated;

/// Routes restricted to superadmins. The role check runs inside the handler.
pub mod admin;
