use std::collections::HashMap;
use std::net::SocketAddr;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use nexgen_auth::{JwtClaims, SystemRole};
use nexgen_core::{RoleId, UserId};
use nexgen_infra::Settings;
use reqwest::StatusCode;
use serde_json::{json, Value};

const SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "root@nexgen.test";
const ADMIN_PASSWORD: &str = "root-password";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(&[]).await
    }

    async fn spawn_with(extra: &[(&'static str, &'static str)]) -> Self {
        nexgen_observability::init_for_tests();

        let mut env: HashMap<&str, &str> = HashMap::from([
            ("SECRET_KEY", SECRET),
            ("SUPERADMIN_EMAIL", ADMIN_EMAIL),
            ("SUPERADMIN_PASSWORD", ADMIN_PASSWORD),
            ("LOGIN_RATE_LIMIT", "5"),
            ("LOGIN_RATE_WINDOW_SECS", "60"),
        ]);
        env.extend(extra.iter().copied());
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).expect("test settings");

        // Same router as prod (in-memory stores), bound to an ephemeral port.
        let state = nexgen_api::app::build_state(&settings).await.expect("state");
        let app = nexgen_api::app::build_app(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login for {email}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    async fn create_user(&self, token: &str, email: &str, role: SystemRole) -> Value {
        let res = self
            .client
            .post(self.url("/api/v1/users"))
            .bearer_auth(token)
            .json(&json!({
                "email": email,
                "name": "Test User",
                "password": "pw-123456",
                "role_id": role.id(),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client.get(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn patch(&self, path: &str, token: &str) -> reqwest::Response {
        self.client.patch(self.url(path)).bearer_auth(token).send().await.unwrap()
    }

    async fn post_json(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn patch_json(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Six failed logins, each claiming a different client address.
    async fn failed_logins_with_forwarded_for(&self) -> Vec<StatusCode> {
        let mut statuses = Vec::new();
        for i in 0..6 {
            let res = self
                .client
                .post(self.url("/api/v1/auth/login"))
                .header("x-forwarded-for", format!("198.51.100.{i}"))
                .json(&json!({ "email": "nobody@nexgen.test", "password": "x" }))
                .send()
                .await
                .unwrap();
            statuses.push(res.status());
        }
        statuses
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, user_id: i64, issued_at: chrono::DateTime<Utc>) -> String {
    let claims = JwtClaims::new(
        UserId::new(user_id),
        RoleId::new(1),
        true,
        issued_at,
        ChronoDuration::minutes(10),
    );
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn root_and_health_are_public() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "NexGen ERP Backend");

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/api/v1/users")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()["www-authenticate"], "Bearer");

    // Expired token
    let expired = mint_jwt(SECRET, 1, Utc::now() - ChronoDuration::hours(2));
    assert_eq!(srv.get("/api/v1/auth/me", &expired).await.status(), StatusCode::UNAUTHORIZED);

    // Wrong signing secret
    let forged = mint_jwt("some-other-secret", 1, Utc::now());
    assert_eq!(srv.get("/api/v1/auth/me", &forged).await.status(), StatusCode::UNAUTHORIZED);

    // Valid signature, unknown subject
    let ghost = mint_jwt(SECRET, 424_242, Utc::now());
    assert_eq!(srv.get("/api/v1/auth/me", &ghost).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn superadmin_logs_in_and_sees_everything() {
    let srv = TestServer::spawn().await;

    // OAuth2 form flow
    let res = srv
        .client
        .post(srv.url("/api/v1/auth/token"))
        .form(&[("username", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["access_token"].as_str().unwrap().to_string();

    let me: Value = srv.get("/api/v1/auth/me", &token).await.json().await.unwrap();
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["is_superadmin"], true);
    assert_eq!(me["role_name"], "SUPER_ADMIN");
    assert!(me.get("hashed_password").is_none());
    assert!(me["accessible_paths"].as_array().unwrap().iter().any(|p| p == "/settings"));

    let roles: Value = srv.get("/api/v1/roles", &token).await.json().await.unwrap();
    assert_eq!(roles.as_array().unwrap().len(), SystemRole::ALL.len());
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/v1/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Incorrect username or password");
}

#[tokio::test]
async fn non_superadmin_cannot_use_admin_routes() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    srv.create_user(&admin, "plain@nexgen.test", SystemRole::User).await;

    let token = srv.login("plain@nexgen.test", "pw-123456").await;
    for path in ["/api/v1/users", "/api/v1/roles", "/api/v1/modules", "/api/v1/permissions/role/99"] {
        assert_eq!(srv.get(path, &token).await.status(), StatusCode::FORBIDDEN, "{path}");
    }
    assert_eq!(srv.get("/api/v1/auth/me", &token).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_admin_rules() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let user = srv.create_user(&admin, "dup@nexgen.test", SystemRole::User).await;
    let id = user["id"].as_i64().unwrap();

    // Duplicate email (case-insensitive)
    let res = srv
        .client
        .post(srv.url("/api/v1/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "DUP@nexgen.test", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Email already exists");

    // assign-role without a role
    let res = srv
        .client
        .patch(srv.url(&format!("/api/v1/users/{id}/assign-role")))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .patch(srv.url(&format!("/api/v1/users/{id}/assign-role")))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": SystemRole::Admin.id() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role_id"], SystemRole::Admin.id().get());

    let res = srv
        .client
        .patch(srv.url("/api/v1/users/999999/assign-role"))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Deactivated users are turned away even with a live token.
    let token = srv.login("dup@nexgen.test", "pw-123456").await;
    let res = srv
        .client
        .patch(srv.url(&format!("/api/v1/users/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(srv.get("/api/v1/auth/me", &token).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn permissions_update_checks_role_id() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv
        .client
        .put(srv.url("/api/v1/permissions/role/18"))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": 19, "permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "role_id mismatch");

    let res = srv
        .client
        .put(srv.url("/api/v1/permissions/role/777"))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": 777, "permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_access_follows_route_table() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    srv.create_user(&admin, "office@nexgen.test", SystemRole::Admin).await;
    srv.create_user(&admin, "floor@nexgen.test", SystemRole::User).await;

    let office = srv.login("office@nexgen.test", "pw-123456").await;
    assert_eq!(srv.get("/api/v1/settings/users", &office).await.status(), StatusCode::OK);

    // Admins manage users here but cannot mint superadmins.
    let res = srv
        .client
        .post(srv.url("/api/v1/settings/users"))
        .bearer_auth(&office)
        .json(&json!({ "email": "office@nexgen.test", "password": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let res = srv
        .client
        .post(srv.url("/api/v1/settings/users"))
        .bearer_auth(&office)
        .json(&json!({ "email": "boss@nexgen.test", "password": "x", "is_superadmin": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let floor = srv.login("floor@nexgen.test", "pw-123456").await;
    assert_eq!(srv.get("/api/v1/settings/users", &floor).await.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn requisition_lifecycle() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    srv.create_user(&admin, "buyer@nexgen.test", SystemRole::ProcurementManager).await;

    let modules: Value = srv.get("/api/v1/modules", &admin).await.json().await.unwrap();
    let procurement = modules
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "procurement")
        .expect("procurement module seeded");
    let module_id = procurement["id"].as_i64().unwrap();
    let role_id = SystemRole::ProcurementManager.id().get();

    let buyer = srv.login("buyer@nexgen.test", "pw-123456").await;
    // No permission row yet.
    assert_eq!(srv.get("/api/v1/pr", &buyer).await.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .put(srv.url(&format!("/api/v1/permissions/role/{role_id}")))
        .bearer_auth(&admin)
        .json(&json!({
            "role_id": role_id,
            "permissions": [
                { "role_id": role_id, "module_id": module_id, "can_view": true, "can_edit": true },
                { "role_id": role_id, "module_id": 987_654, "can_view": true }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Value = res.json().await.unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);

    let res = srv
        .client
        .post(srv.url("/api/v1/pr"))
        .bearer_auth(&buyer)
        .json(&json!({
            "dept": "Maintenance",
            "items": [
                { "name": "Bearing", "qty": 4, "price": 12.5 },
                { "name": "Grease", "qty": 2, "price": 7.25 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let pr: Value = res.json().await.unwrap();
    let year = Utc::now().date_naive().format("%Y").to_string();
    assert_eq!(pr["pr_number"], format!("PR-{year}-0001"));
    assert_eq!(pr["amount"], 64.5);
    assert_eq!(pr["items"], 2);
    assert_eq!(pr["status"], "pending");
    assert_eq!(pr["requested_by"], "Test User");
    let id = pr["id"].as_i64().unwrap();

    // Empty requisitions are rejected.
    let res = srv
        .client
        .post(srv.url("/api/v1/pr"))
        .bearer_auth(&buyer)
        .json(&json!({ "dept": "Maintenance", "items": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // View and edit granted, approve not.
    assert_eq!(srv.get(&format!("/api/v1/pr/{id}"), &buyer).await.status(), StatusCode::OK);
    assert_eq!(
        srv.patch(&format!("/api/v1/pr/{id}/approve"), &buyer).await.status(),
        StatusCode::FORBIDDEN
    );

    let res = srv.patch(&format!("/api/v1/pr/{id}/approve"), &admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "PR approved");
    assert_eq!(body["pr"]["status"], "approved");

    assert_eq!(
        srv.patch(&format!("/api/v1/pr/{id}/reject"), &admin).await.status(),
        StatusCode::CONFLICT
    );
    assert_eq!(srv.patch("/api/v1/pr/999999/reject", &admin).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_is_rate_limited_per_ip() {
    let srv = TestServer::spawn().await;

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let res = srv
            .client
            .post(srv.url("/api/v1/auth/login"))
            .json(&json!({ "email": "nobody@nexgen.test", "password": "x" }))
            .send()
            .await
            .unwrap();
        statuses.push(res.status());
    }

    assert!(statuses[..5].iter().all(|s| *s == StatusCode::UNAUTHORIZED));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forwarded_for_does_not_reset_the_login_limit() {
    let srv = TestServer::spawn().await;

    let statuses = srv.failed_logins_with_forwarded_for().await;
    assert!(statuses[..5].iter().all(|s| *s == StatusCode::UNAUTHORIZED), "{statuses:?}");
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn forwarded_for_is_honoured_from_trusted_proxy() {
    let srv = TestServer::spawn_with(&[("TRUSTED_PROXIES", "127.0.0.1")]).await;

    // Each request is its own client behind the proxy.
    let statuses = srv.failed_logins_with_forwarded_for().await;
    assert!(statuses.iter().all(|s| *s == StatusCode::UNAUTHORIZED), "{statuses:?}");
}

#[tokio::test]
async fn malformed_requests_get_json_errors() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    // Missing required field
    let res = srv
        .post_json("/api/v1/users", &admin, json!({ "email": "half@nexgen.test" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("password"));

    // Unparseable JSON
    let res = srv
        .client
        .post(srv.url("/api/v1/roles"))
        .bearer_auth(&admin)
        .header("content-type", "application/json")
        .body("{\"name\":")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    // Non-numeric path id
    let res = srv.get("/api/v1/pr/abc", &admin).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");

    let res = srv.get("/api/v1/users/abc", &admin).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Bad paging parameter
    let res = srv.get("/api/v1/users?limit=lots", &admin).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn token_endpoint_rejects_other_grant_types() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/v1/auth/token"))
        .form(&[
            ("grant_type", "client_credentials"),
            ("username", ADMIN_EMAIL),
            ("password", ADMIN_PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/api/v1/auth/token"))
        .form(&[
            ("grant_type", "password"),
            ("username", ADMIN_EMAIL),
            ("password", ADMIN_PASSWORD),
            ("scope", ""),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Missing password field
    let res = srv
        .client
        .post(srv.url("/api/v1/auth/token"))
        .form(&[("username", ADMIN_EMAIL)])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn role_and_module_names_are_unique() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let res = srv.post_json("/api/v1/roles", &admin, json!({ "name": "AUDITOR" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = srv.post_json("/api/v1/roles", &admin, json!({ "name": "AUDITOR" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Role already exists");

    let res = srv.post_json("/api/v1/modules", &admin, json!({ "name": "warehouse" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = srv.post_json("/api/v1/modules", &admin, json!({ "name": "warehouse" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Module already exists");
}

#[tokio::test]
async fn role_detail_includes_permissions() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;

    let role: Value = srv
        .post_json("/api/v1/roles", &admin, json!({ "name": "STOREKEEPER" }))
        .await
        .json()
        .await
        .unwrap();
    let role_id = role["id"].as_i64().unwrap();
    let module: Value = srv
        .post_json("/api/v1/modules", &admin, json!({ "name": "stores" }))
        .await
        .json()
        .await
        .unwrap();
    let module_id = module["id"].as_i64().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/api/v1/permissions/role/{role_id}")))
        .bearer_auth(&admin)
        .json(&json!({
            "role_id": role_id,
            "permissions": [{ "role_id": role_id, "module_id": module_id, "can_view": true }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get(&format!("/api/v1/roles/{role_id}"), &admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "STOREKEEPER");
    let perms = body["permissions"].as_array().unwrap();
    assert_eq!(perms.len(), 1);
    assert_eq!(perms[0]["module_id"], module_id);
    assert_eq!(perms[0]["can_view"], true);

    let res = srv.get("/api/v1/roles/999999", &admin).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_updates_report_conflicts_and_missing_records() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    srv.create_user(&admin, "first@nexgen.test", SystemRole::User).await;
    let second = srv.create_user(&admin, "second@nexgen.test", SystemRole::User).await;
    let id = second["id"].as_i64().unwrap();

    let res = srv
        .patch_json(&format!("/api/v1/users/{id}"), &admin, json!({ "email": "First@nexgen.test" }))
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Email already exists");

    let res = srv
        .patch_json(&format!("/api/v1/users/{id}"), &admin, json!({ "role_id": 999_999 }))
        .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Role not found");

    let res = srv.get("/api/v1/users/999999", &admin).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Nothing changed on the failed updates.
    let res = srv.get(&format!("/api/v1/users/{id}"), &admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["email"], "second@nexgen.test");
    assert_eq!(body["role_id"], SystemRole::User.id().get());
}

#[tokio::test]
async fn role_change_applies_to_existing_token() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let user = srv.create_user(&admin, "promoted@nexgen.test", SystemRole::User).await;
    let id = user["id"].as_i64().unwrap();

    let token = srv.login("promoted@nexgen.test", "pw-123456").await;
    // Loads the user into the cache.
    let me: Value = srv.get("/api/v1/auth/me", &token).await.json().await.unwrap();
    assert_eq!(me["role_id"], SystemRole::User.id().get());
    assert_eq!(srv.get("/api/v1/settings/users", &token).await.status(), StatusCode::FORBIDDEN);

    let res = srv
        .patch_json(
            &format!("/api/v1/users/{id}/assign-role"),
            &admin,
            json!({ "role_id": SystemRole::Admin.id() }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);

    let me: Value = srv.get("/api/v1/auth/me", &token).await.json().await.unwrap();
    assert_eq!(me["role_id"], SystemRole::Admin.id().get());
    assert_eq!(me["role_name"], "ADMIN");
    assert_eq!(srv.get("/api/v1/settings/users", &token).await.status(), StatusCode::OK);
}
