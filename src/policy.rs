use crate::error::AppError;

/// Reserved role names referenced by the grant rules and the registration flow.
pub const SUPERADMIN: &str = "superadmin";
pub const ADMIN: &str = "admin";
pub const MESERO: &str = "mesero";
pub const CLIENTE: &str = "cliente";

/// Roles created at process start. `superadmin` is not seeded; it is only ever granted
/// out of band.
pub const SEED_ROLES: [&str; 3] = [ADMIN, MESERO, CLIENTE];

/// Role every new account receives on registration.
pub const DEFAULT_ROLE: &str = CLIENTE;

/// GrantRule
///
/// What a requester needs before it may grant a given role to someone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantRule {
    /// Anyone may grant the role.
    Unrestricted,
    /// The requester must currently hold the named role.
    RequiresRole(&'static str),
    /// No one may grant the role through the assignment operation.
    Ungrantable,
}

/// GRANT_RULES
///
/// The closed rule table. Role names not listed here are `Unrestricted`.
pub const GRANT_RULES: &[(&str, GrantRule)] = &[
    (SUPERADMIN, GrantRule::Ungrantable),
    (ADMIN, GrantRule::RequiresRole(SUPERADMIN)),
    (MESERO, GrantRule::RequiresRole(ADMIN)),
];

/// Looks up the rule for `role_name` (exact match).
pub fn grant_rule(role_name: &str) -> GrantRule {
    GRANT_RULES
        .iter()
        .find(|(name, _)| *name == role_name)
        .map(|(_, rule)| *rule)
        .unwrap_or(GrantRule::Unrestricted)
}

/// authorize_grant
///
/// Evaluates the rule for `role_name` against the roles the requester currently holds.
///
/// # Errors
/// `AppError::ForbiddenRole` when the role is ungrantable or the requester lacks the
/// required role.
pub fn authorize_grant<S: AsRef<str>>(role_name: &str, requester_roles: &[S]) -> Result<(), AppError> {
    match grant_rule(role_name) {
        GrantRule::Unrestricted => Ok(()),
        GrantRule::Ungrantable => Err(AppError::ForbiddenRole(format!(
            "the {role_name} role cannot be assigned"
        ))),
        GrantRule::RequiresRole(required) => {
            if requester_roles.iter().any(|r| r.as_ref() == required) {
                Ok(())
            } else {
                Err(AppError::ForbiddenRole(format!(
                    "only a user with the {required} role can assign the {role_name} role"
                )))
            }
        }
    }
}
