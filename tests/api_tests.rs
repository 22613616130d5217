use reqwest::{StatusCode, header};
use restaurant_auth::{
    AppConfig, AppState, InMemoryRepository, create_router,
    models::{LoginResponse, RegisteredUser, SuccessMessage, UserRolesResponse},
    repository::{Repository, RepositoryState},
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<InMemoryRepository>,
    pub client: reqwest::Client,
}

const SUPERADMIN_ROLE_ID: i64 = 1;
const ADMIN_ROLE_ID: i64 = 2;
const MESERO_ROLE_ID: i64 = 3;

async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed_roles(&["superadmin", "admin", "mesero", "cliente"])
        .await
        .unwrap();

    let config = AppConfig {
        password_hash_cost: 4,
        ..AppConfig::default()
    };
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config,
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        repo,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn register(&self, username: &str) -> RegisteredUser {
        let response = self
            .client
            .post(format!("{}/api/auth/register", self.address))
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "s3cret-pass",
                "name": username,
            }))
            .send()
            .await
            .expect("register request failed");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    /// Logs in and returns the `session=…` pair to send back as a Cookie header.
    async fn login(&self, username: &str) -> (LoginResponse, String) {
        let response = self
            .client
            .post(format!("{}/api/auth/login", self.address))
            .json(&json!({ "email": format!("{username}@example.com"), "password": "s3cret-pass" }))
            .send()
            .await
            .expect("login request failed");
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("login must set the session cookie")
            .to_string();
        (response.json().await.unwrap(), cookie)
    }

    async fn assign(&self, cookie: &str, user_id: i64, role_id: i64) -> reqwest::Response {
        self.client
            .post(format!("{}/api/roles/assign", self.address))
            .header(header::COOKIE, cookie)
            .json(&json!({ "userId": user_id, "rolId": role_id }))
            .send()
            .await
            .expect("assign request failed")
    }

    async fn role_names(&self, user_id: i64) -> Vec<String> {
        let response = self
            .client
            .get(format!("{}/api/roles/usuario/{}", self.address, user_id))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: UserRolesResponse = response.json().await.unwrap();
        let mut names: Vec<String> = body.roles.into_iter().map(|r| r.name).collect();
        names.sort();
        names
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc: serde_json::Value = response.json().await.unwrap();
    assert!(doc["paths"].get("/api/roles/assign").is_some());
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let app = spawn_app().await;
    let user = app.register("ana").await;
    assert_eq!(user.username, "ana");

    let response = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "username": "ana", "email": "new@example.com", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert_eq!(app.repo.user_count(), 1);
}

#[tokio::test]
async fn test_register_missing_fields() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({ "username": "ana" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = spawn_app().await;
    app.register("ana").await;

    let response = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "email": "ana@example.com", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_assign_requires_session() {
    let app = spawn_app().await;
    let user = app.register("ana").await;

    let response = app
        .client
        .post(format!("{}/api/roles/assign", app.address))
        .json(&json!({ "userId": user.id, "rolId": MESERO_ROLE_ID }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: SuccessMessage = response.json().await.unwrap();
    assert!(!body.success);
    assert_eq!(app.role_names(user.id).await, vec!["cliente"]);
}

#[tokio::test]
async fn test_role_hierarchy_over_http() {
    let app = spawn_app().await;
    let a = app.register("user-a").await;
    let b = app.register("user-b").await;
    let c = app.register("user-c").await;
    app.repo.assign_role(a.id, SUPERADMIN_ROLE_ID).await.unwrap();

    // A (superadmin) grants admin to B.
    let (login_a, cookie_a) = app.login("user-a").await;
    assert!(login_a.roles.contains(&"superadmin".to_string()));
    let response = app.assign(&cookie_a, b.id, ADMIN_ROLE_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: SuccessMessage = response.json().await.unwrap();
    assert!(body.success);
    assert_eq!(app.role_names(b.id).await, vec!["admin", "cliente"]);

    // C (cliente) cannot grant mesero to B.
    let (_, cookie_c) = app.login("user-c").await;
    let response = app.assign(&cookie_c, b.id, MESERO_ROLE_ID).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.role_names(b.id).await, vec!["admin", "cliente"]);

    // Nobody can grant superadmin.
    let response = app.assign(&cookie_a, c.id, SUPERADMIN_ROLE_ID).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Granting admin twice is a duplicate.
    let response = app.assign(&cookie_a, b.id, ADMIN_ROLE_ID).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // B's existing session sees the new admin role on the next request.
    let (_, cookie_b) = app.login("user-b").await;
    let response = app.assign(&cookie_b, c.id, MESERO_ROLE_ID).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.role_names(c.id).await, vec!["cliente", "mesero"]);
}

#[tokio::test]
async fn test_superadmin_gate() {
    let app = spawn_app().await;
    let boss = app.register("boss").await;
    app.register("plain").await;
    app.repo.assign_role(boss.id, SUPERADMIN_ROLE_ID).await.unwrap();

    let url = format!("{}/api/roles/solo-superadmin", app.address);

    let anonymous = app.client.get(&url).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let (_, plain_cookie) = app.login("plain").await;
    let denied = app
        .client
        .get(&url)
        .header(header::COOKIE, &plain_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let (_, boss_cookie) = app.login("boss").await;
    let allowed = app
        .client
        .get(&url)
        .header(header::COOKIE, &boss_cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_user_roles_is_not_found() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(format!("{}/api/roles/usuario/999", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = spawn_app().await;
    let response = app
        .client
        .post(format!("{}/api/auth/logout", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.contains("Max-Age=0"));
}
