use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

use warden_api::ApiConfig;
use warden_core::UserId;
use warden_infra::InMemoryStore;

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "a@x.com";
const PASSWORD: &str = "Password123";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let app = warden_api::app::build_app_with_store(
            &ApiConfig::new(JWT_SECRET),
            Arc::new(InMemoryStore::new()),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .post("/users/login", None, json!({ "email": email, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Run first-user setup and return a super admin token.
    async fn bootstrap(&self) -> String {
        let (status, _) = self
            .post(
                "/users/register",
                None,
                json!({ "email": ADMIN_EMAIL, "password": PASSWORD, "first_name": "A", "last_name": "B" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        self.login(ADMIN_EMAIL, PASSWORD).await
    }

    async fn add_role(&self, token: &str, name: &str, permissions: &[&str]) -> String {
        let (status, body) = self
            .post("/roles/add", Some(token), json!({ "role_name": name, "permissions": permissions }))
            .await;
        assert_eq!(status, StatusCode::OK, "role add failed: {body}");
        body["data"]["_id"].as_str().unwrap().to_string()
    }

    async fn add_user(&self, token: &str, email: &str, roles: &[&str]) {
        let (status, body) = self
            .post(
                "/users/add",
                Some(token),
                json!({
                    "email": email,
                    "password": PASSWORD,
                    "first_name": "Ann",
                    "last_name": "Lee",
                    "roles": roles,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "user add failed: {body}");
    }

    async fn role_privileges(&self, token: &str, role_id: &str) -> Vec<String> {
        let (status, body) = self
            .get(&format!("/roles/role_privileges?role_id={role_id}"), Some(token))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["permission"].as_str().unwrap().to_string())
            .collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: &str, email: &str, issued_at: chrono::DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = json!({
        "id": user_id,
        "email": email,
        "iat": issued_at.timestamp(),
        "exp": (issued_at + ttl).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/users", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
    assert_eq!(body["error"]["message"], "Authentication failed.");

    let (status, _) = srv.get("/roles", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn initial_setup_runs_exactly_once() {
    let srv = TestServer::spawn().await;
    let payload = json!({ "email": ADMIN_EMAIL, "password": PASSWORD, "first_name": "A", "last_name": "B" });

    let (status, body) = srv.post("/users/register", None, payload.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    let (status, body) = srv.post("/users/register", None, payload).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Initial setup already completed.");

    // Different payload, same answer, still one user.
    let (status, _) = srv
        .post(
            "/users/register",
            None,
            json!({ "email": "other@x.com", "password": PASSWORD, "first_name": "O", "last_name": "P" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Incomplete or malformed bodies are not validated once setup is done.
    let (status, body) = srv.post("/users/register", None, json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Initial setup already completed.");

    let res = srv
        .client
        .post(srv.url("/users/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let token = srv.login(ADMIN_EMAIL, PASSWORD).await;
    let (_, stats) = srv.get("/stats", Some(&token)).await;
    assert_eq!(stats["data"]["users"], 1);
}

#[tokio::test]
async fn login_failures_share_one_message() {
    let srv = TestServer::spawn().await;
    srv.bootstrap().await;

    let (status, wrong_password) = srv
        .post("/users/login", None, json!({ "email": ADMIN_EMAIL, "password": "nope-nope" }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown_user) = srv
        .post("/users/login", None, json!({ "email": "ghost@x.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);

    let (status, body) = srv
        .post("/users/login", None, json!({ "email": ADMIN_EMAIL, "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
    assert!(body["data"]["user"]["id"].is_string());
    assert!(body["data"]["user"].get("_id").is_none());
    assert!(body["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn expired_and_orphaned_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let token = srv.bootstrap().await;

    let (_, me) = srv.get("/auth/me", Some(&token)).await;
    let admin_id = me["data"]["_id"].as_str().unwrap().to_string();

    let expired = mint_jwt(&admin_id, ADMIN_EMAIL, Utc::now() - ChronoDuration::hours(2), ChronoDuration::hours(1));
    let (status, _) = srv.get("/auth/me", Some(&expired)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let fresh = mint_jwt(&admin_id, ADMIN_EMAIL, Utc::now(), ChronoDuration::minutes(10));
    let (status, _) = srv.get("/auth/me", Some(&fresh)).await;
    assert_eq!(status, StatusCode::OK);

    let orphan = mint_jwt(&UserId::new().to_string(), "ghost@x.com", Utc::now(), ChronoDuration::minutes(10));
    let (status, _) = srv.get("/auth/me", Some(&orphan)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn missing_privilege_is_forbidden() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let role_id = srv.add_role(&admin, "Category Readers", &["category_view"]).await;
    srv.add_user(&admin, "reader@x.com", &[&role_id]).await;
    let reader = srv.login("reader@x.com", PASSWORD).await;

    let (status, _) = srv.get("/categories", Some(&reader)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv.get("/users", Some(&reader)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 403);

    let (status, _) = srv.post("/categories/add", Some(&reader), json!({ "name": "Books" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A user with no roles at all is refused too.
    srv.add_user(&admin, "nobody@x.com", &[]).await;
    let nobody = srv.login("nobody@x.com", PASSWORD).await;
    let (status, _) = srv.get("/categories", Some(&nobody)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn role_update_replaces_privileges() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let role_id = srv.add_role(&admin, "Editors", &["user_view"]).await;
    assert_eq!(srv.role_privileges(&admin, &role_id).await, vec!["user_view"]);

    let (status, body) = srv
        .post("/roles/update", Some(&admin), json!({ "_id": role_id, "permissions": ["user_add"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    assert_eq!(srv.role_privileges(&admin, &role_id).await, vec!["user_add"]);
}

#[tokio::test]
async fn role_privileges_requires_role_id() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let (status, body) = srv.get("/roles/role_privileges", Some(&admin)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn role_validation_and_conflicts() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let (status, _) = srv
        .post("/roles/add", Some(&admin), json!({ "role_name": "Ops", "permissions": ["launch_missiles"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = srv.post("/roles/add", Some(&admin), json!({ "role_name": "ab" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    srv.add_role(&admin, "Operators", &[]).await;
    let (status, _) = srv.post("/roles/add", Some(&admin), json!({ "role_name": "Operators" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = srv
        .post("/roles/update", Some(&admin), json!({ "_id": UserId::new().to_string(), "role_name": "Ghosts" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_role_revokes_its_privileges() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let role_id = srv.add_role(&admin, "Viewers", &["user_view", "role_view"]).await;
    srv.add_user(&admin, "viewer@x.com", &[&role_id]).await;
    let viewer = srv.login("viewer@x.com", PASSWORD).await;
    let (status, _) = srv.get("/users", Some(&viewer)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.post("/roles/delete", Some(&admin), json!({ "_id": role_id })).await;
    assert_eq!(status, StatusCode::OK);

    assert!(srv.role_privileges(&admin, &role_id).await.is_empty());
    let (status, _) = srv.get("/users", Some(&viewer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_user_is_rejected_with_a_live_token() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let role_id = srv.add_role(&admin, "Viewers", &["category_view"]).await;
    srv.add_user(&admin, "temp@x.com", &[&role_id]).await;
    let temp = srv.login("temp@x.com", PASSWORD).await;

    let (_, users) = srv.get("/users?email=temp", Some(&admin)).await;
    let temp_id = users["data"]["data"][0]["_id"].as_str().unwrap().to_string();

    let (status, _) = srv
        .post("/users/update", Some(&admin), json!({ "_id": temp_id, "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = srv.get("/categories", Some(&temp)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = srv
        .post("/users/login", None, json!({ "email": "temp@x.com", "password": PASSWORD }))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_listing_filters_and_paginates() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;
    let role_id = srv.add_role(&admin, "Staff", &["category_view"]).await;
    for i in 0..3 {
        srv.add_user(&admin, &format!("staff{i}@corp.com"), &[&role_id]).await;
    }

    let (status, body) = srv.get("/users?email=CORP&limit=2&page=2", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"];
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["totalPages"], 2);
    assert_eq!(page["data"].as_array().unwrap().len(), 1);
    assert_eq!(page["data"][0]["roles"][0]["role_name"], "Staff");
    assert!(page["data"][0].get("password_hash").is_none());

    let (status, _) = srv
        .post(
            "/users/add",
            Some(&admin),
            json!({ "email": "staff0@corp.com", "password": PASSWORD, "first_name": "Dup", "last_name": "Dup" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_lifecycle() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let (status, _) = srv.post("/categories/add", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = srv.post("/categories/add", Some(&admin), json!({ "name": "Books" })).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["is_active"], true);

    let (status, _) = srv
        .post("/categories/update", Some(&admin), json!({ "_id": id, "name": "Novels" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = srv.get("/categories", Some(&admin)).await;
    assert_eq!(list["data"][0]["name"], "Novels");

    let (status, _) = srv.post("/categories/delete", Some(&admin), json!({ "_id": id })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = srv.post("/categories/delete", Some(&admin), json!({ "_id": id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_bodies_are_validation_errors() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;

    let res = srv
        .client
        .post(srv.url("/roles/add"))
        .bearer_auth(&admin)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], 400);

    let (status, _) = srv.post("/users/delete", Some(&admin), json!({ "_id": "not-a-uuid" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn audit_log_records_logins_and_mutations() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;
    srv.add_role(&admin, "Auditors", &["auditlog_view"]).await;

    // Audit writes land asynchronously; poll briefly.
    let mut entries = Vec::new();
    for _ in 0..50 {
        let (status, body) = srv.post("/auditlogs", Some(&admin), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        entries = body["data"].as_array().unwrap().clone();
        if entries.len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let has = |location: &str, action: &str| {
        entries
            .iter()
            .any(|e| e["location"] == location && e["proc_type"] == action && e["level"] == "info")
    };
    assert!(has("Users", "Login"), "entries: {entries:?}");
    assert!(has("Roles", "Add"), "entries: {entries:?}");
}

#[tokio::test]
async fn audit_log_requires_privilege() {
    let srv = TestServer::spawn().await;
    let admin = srv.bootstrap().await;
    let role_id = srv.add_role(&admin, "Readers", &["category_view"]).await;
    srv.add_user(&admin, "reader@x.com", &[&role_id]).await;
    let reader = srv.login("reader@x.com", PASSWORD).await;

    let (status, _) = srv.post("/auditlogs", Some(&reader), json!({})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = srv.post("/auditlogs", None, json!({})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
