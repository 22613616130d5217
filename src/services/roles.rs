use crate::{
    error::{AppError, StoreError},
    models::{AssignRoleRequest, Role},
    policy,
    repository::Repository,
};

/// assign_role
///
/// Grants the role `req.role_id` to the user `req.user_id` on behalf of `requester_id`.
///
/// The requester is the authenticated actor and is never read from the request body.
/// Checks run in order and stop at the first failure:
/// 1. both ids present (`MissingParameter`)
/// 2. requester and role exist (`NotFound`)
/// 3. the grant rule for the role's name (`ForbiddenRole`)
/// 4. the target user exists (`NotFound`)
/// 5. the conditional insert (`DuplicateAssignment` when the pair already exists)
///
/// Returns the confirmation message on success.
pub async fn assign_role(
    repo: &dyn Repository,
    requester_id: i64,
    req: AssignRoleRequest,
) -> Result<String, AppError> {
    let (Some(user_id), Some(role_id)) = (req.user_id, req.role_id) else {
        return Err(AppError::MissingParameter("userId and rolId"));
    };

    let requester = repo
        .get_user(requester_id)
        .await?
        .ok_or(AppError::NotFound("requesting user"))?;
    let requester_roles: Vec<String> = repo
        .get_roles_for_user(requester.id)
        .await?
        .into_iter()
        .map(|r| r.name)
        .collect();

    let role = repo
        .get_role(role_id)
        .await?
        .ok_or(AppError::NotFound("role"))?;

    if let Err(e) = policy::authorize_grant(&role.name, &requester_roles) {
        tracing::warn!(
            requester_id,
            target_user_id = user_id,
            role = %role.name,
            "role grant denied"
        );
        return Err(e);
    }

    if repo.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("target user"));
    }

    repo.assign_role(user_id, role.id).await.map_err(|e| match e {
        StoreError::AlreadyExists => AppError::DuplicateAssignment(role.name.clone()),
        other => AppError::Store(other),
    })?;

    tracing::info!(
        requester_id,
        target_user_id = user_id,
        role = %role.name,
        "role granted"
    );

    Ok(format!("role \"{}\" assigned to user {}", role.name, user_id))
}

/// Roles currently held by `user_id`. No ordering is promised.
pub async fn roles_for_user(repo: &dyn Repository, user_id: i64) -> Result<Vec<Role>, AppError> {
    if repo.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound("user"));
    }
    Ok(repo.get_roles_for_user(user_id).await?)
}
