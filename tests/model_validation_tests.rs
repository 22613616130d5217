use chrono::Utc;
use restaurant_auth::models::{
    AssignRoleRequest, LoginResponse, RegisterRequest, RegisteredUser, User,
};
use serde_json::json;

// --- Tests ---

#[test]
fn test_assign_role_request_wire_names() {
    // Clients send the ids as `userId` and `rolId`.
    let request: AssignRoleRequest =
        serde_json::from_value(json!({ "userId": 7, "rolId": 3 })).unwrap();

    assert_eq!(request.user_id, Some(7));
    assert_eq!(request.role_id, Some(3));
}

#[test]
fn test_assign_role_request_missing_ids() {
    let request: AssignRoleRequest = serde_json::from_value(json!({ "userId": 7 })).unwrap();
    assert_eq!(request.user_id, Some(7));
    assert_eq!(request.role_id, None);

    // snake_case keys are not the wire format.
    let request: AssignRoleRequest =
        serde_json::from_value(json!({ "user_id": 7, "role_id": 3 })).unwrap();
    assert!(request.user_id.is_none());
    assert!(request.role_id.is_none());
}

#[test]
fn test_user_never_serializes_password_hash() {
    let user = User {
        id: 1,
        username: "ana".to_string(),
        email: "ana@example.com".to_string(),
        password_hash: "$2b$10$abcdefghijklmnopqrstuv".to_string(),
        display_name: "Ana".to_string(),
        status: "active".to_string(),
        created_at: Utc::now(),
    };

    let value = serde_json::to_value(&user).unwrap();

    assert!(value.get("password_hash").is_none());
    assert_eq!(value["username"], "ana");
    assert!(!value.to_string().contains("$2b$"));
}

#[test]
fn test_register_request_missing_fields_default_to_empty() {
    let request: RegisterRequest = serde_json::from_value(json!({ "email": "a@b.c" })).unwrap();

    assert_eq!(request.email, "a@b.c");
    assert!(request.username.is_empty());
    assert!(request.password.is_empty());
    assert!(request.name.is_none());
}

#[test]
fn test_register_request_omits_absent_name() {
    let request = RegisterRequest {
        username: "ana".to_string(),
        email: "ana@example.com".to_string(),
        password: "pw".to_string(),
        name: None,
    };

    let value = serde_json::to_value(&request).unwrap();
    assert!(value.get("name").is_none());
}

#[test]
fn test_response_shapes_carry_no_credentials() {
    let registered = serde_json::to_value(RegisteredUser {
        id: 4,
        username: "ana".to_string(),
        email: "ana@example.com".to_string(),
    })
    .unwrap();
    assert_eq!(
        registered,
        json!({ "id": 4, "username": "ana", "email": "ana@example.com" })
    );

    let login = serde_json::to_value(LoginResponse {
        id: 4,
        username: "ana".to_string(),
        email: "ana@example.com".to_string(),
        roles: vec!["cliente".to_string()],
    })
    .unwrap();
    assert_eq!(login["roles"], json!(["cliente"]));
    assert!(login.get("password").is_none());
}
