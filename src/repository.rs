use crate::error::StoreError;
use crate::models::{NewUser, Role, User};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Repository Trait
///
/// The data-access context handed to every service operation. Handlers and services only
/// see this contract, so the Postgres store can be swapped for the in-memory one in tests.
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Roles ---
    /// Ensures every name in `names` exists. Returns only the roles created by this call.
    async fn seed_roles(&self, names: &[&str]) -> Result<Vec<Role>, StoreError>;
    async fn get_role(&self, id: i64) -> Result<Option<Role>, StoreError>;
    async fn get_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError>;

    /// Atomic conditional insert into the association table.
    /// Fails with `StoreError::AlreadyExists` when the pair is already present.
    async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<(), StoreError>;

    // --- Users ---
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Inserts the user and associates it with `role_name` as one unit of work.
    /// Nothing is persisted if the role is missing (`StoreError::MissingRole`) or the
    /// email/username is taken (`StoreError::AlreadyExists`).
    async fn create_user_with_role(&self, user: NewUser, role_name: &str) -> Result<User, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str = "id, username, email, password_hash, display_name, status, created_at";

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by PostgreSQL through sqlx.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations complete");
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn seed_roles(&self, names: &[&str]) -> Result<Vec<Role>, StoreError> {
        let mut created = Vec::new();
        for name in names {
            let role = sqlx::query_as::<_, Role>(
                "INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING RETURNING id, name",
            )
            .bind(*name)
            .fetch_optional(&self.pool)
            .await?;
            created.extend(role);
        }
        Ok(created)
    }

    async fn get_role(&self, id: i64) -> Result<Option<Role>, StoreError> {
        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn get_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError> {
        let roles = sqlx::query_as::<_, Role>(
            r#"SELECT r.id, r.name
               FROM roles r
               JOIN user_roles ur ON ur.role_id = r.id
               WHERE ur.user_id = $1
               ORDER BY r.id"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    /// assign_role
    ///
    /// Relies on the `(user_id, role_id)` primary key instead of a read-before-write check,
    /// so two concurrent grants of the same role cannot both succeed.
    async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 OR username = $2 LIMIT 1"
        ))
        .bind(email)
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user_with_role
    ///
    /// Runs inside a transaction: dropping `tx` on any early return rolls the user insert back.
    async fn create_user_with_role(&self, user: NewUser, role_name: &str) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, display_name)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_insert)?;

        let role = sqlx::query_as::<_, Role>("SELECT id, name FROM roles WHERE name = $1")
            .bind(role_name)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::MissingRole(role_name.to_string()))?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(created.id)
            .bind(role.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }
}

// --- In-Memory Implementation (For Tests) ---

#[derive(Default)]
struct MemoryState {
    users: Vec<User>,
    roles: Vec<Role>,
    user_roles: Vec<(i64, i64)>,
    next_user_id: i64,
    next_role_id: i64,
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory, used by the service, handler and HTTP
/// tests so they run without a database. Each operation takes the lock once, which gives
/// it the same all-or-nothing behaviour as the Postgres transaction and conditional insert.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn seed_roles(&self, names: &[&str]) -> Result<Vec<Role>, StoreError> {
        let mut state = self.lock();
        let mut created = Vec::new();
        for name in names {
            if state.roles.iter().any(|r| r.name == *name) {
                continue;
            }
            state.next_role_id += 1;
            let role = Role {
                id: state.next_role_id,
                name: name.to_string(),
            };
            state.roles.push(role.clone());
            created.push(role);
        }
        Ok(created)
    }

    async fn get_role(&self, id: i64) -> Result<Option<Role>, StoreError> {
        Ok(self.lock().roles.iter().find(|r| r.id == id).cloned())
    }

    async fn get_roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, StoreError> {
        let state = self.lock();
        let roles = state
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| state.roles.iter().find(|r| r.id == *rid).cloned())
            .collect();
        Ok(roles)
    }

    async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.user_roles.contains(&(user_id, role_id)) {
            return Err(StoreError::AlreadyExists);
        }
        state.user_roles.push((user_id, role_id));
        Ok(())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let state = self.lock();
        let user = state
            .users
            .iter()
            .find(|u| u.email == email || u.username == username)
            .cloned();
        Ok(user)
    }

    async fn create_user_with_role(&self, user: NewUser, role_name: &str) -> Result<User, StoreError> {
        let mut state = self.lock();

        if state
            .users
            .iter()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::AlreadyExists);
        }
        let role_id = state
            .roles
            .iter()
            .find(|r| r.name == role_name)
            .map(|r| r.id)
            .ok_or_else(|| StoreError::MissingRole(role_name.to_string()))?;

        state.next_user_id += 1;
        let created = User {
            id: state.next_user_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            display_name: user.display_name,
            status: "active".to_string(),
            created_at: Utc::now(),
        };
        state.users.push(created.clone());
        state.user_roles.push((created.id, role_id));
        Ok(created)
    }
}
