//! Integration tests for the lab portal backend.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::token::TokenKeys;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::search::SearchIndex;
use crate::{create_router, AppState};

const TEST_PSK: &str = "test-api-key";
const TEST_JWT_SECRET: &str = "test-jwt-secret-with-enough-length!";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    anon: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(TEST_PSK.to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let index_path = temp_dir.path().join("index");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            index_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            jwt_secret: Some(TEST_JWT_SECRET.to_string()),
            token_ttl_minutes: 60,
        };

        let state = AppState {
            repo,
            search,
            tokens: Arc::new(TokenKeys::new(TEST_JWT_SECRET, config.token_ttl_minutes)),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            anon: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> (u16, Value) {
        let resp = request.send().await.unwrap();
        let status = resp.status().as_u16();
        let body: Value = resp.json().await.unwrap();
        (status, body)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        self.send(self.client.get(self.url(path))).await
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(self.client.post(self.url(path)).json(&body)).await
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(self.client.put(self.url(path)).json(&body)).await
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        self.send(self.client.delete(self.url(path))).await
    }

    /// Submit a sign-up as an anonymous visitor.
    async fn signup(&self, body: Value) -> (u16, Value) {
        self.send(self.anon.post(self.url("/api/signup")).json(&body))
            .await
    }

    async fn login(&self, identifier: &str, password: &str) -> (u16, Value) {
        self.send(
            self.anon
                .post(self.url("/api/login"))
                .json(&json!({ "identifier": identifier, "password": password })),
        )
        .await
    }

    /// Log in as a member and return the bearer token.
    async fn token(&self, identifier: &str) -> String {
        let (status, body) = self.login(identifier, "secret1").await;
        assert_eq!(status, 200, "login failed: {}", body);
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    /// Send a request carrying a member token instead of the PSK.
    async fn as_member(
        &self,
        token: &str,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut request = self.anon.request(method, self.url(path)).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(request).await
    }

    async fn revision(&self) -> i64 {
        let (_, body) = self
            .send(self.anon.get(self.url("/api/revision")))
            .await;
        body["data"]["revisionId"].as_i64().unwrap()
    }

    /// Create an account directly through the admin API and return its id.
    async fn create_user(&self, user_name: &str, role: &str, rank: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users",
                json!({
                    "userName": user_name,
                    "email": format!("{}@lab.edu", user_name),
                    "password": "secret1",
                    "confirmPassword": "secret1",
                    "firstName": user_name,
                    "lastName": "Member",
                    "role": role,
                    "rank": rank,
                    "isActiveMember": true
                }),
            )
            .await;
        assert_eq!(status, 200, "create_user failed: {}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

fn signup_form(user_name: &str, email: &str, role: &str) -> Value {
    json!({
        "userName": user_name,
        "firstName": "Sara",
        "lastName": "Malik",
        "email": email,
        "role": role,
        "password": "secret1",
        "confirmPassword": "secret1",
        "description": "Interested in robotics"
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_admin_routes_require_psk() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .send(fixture.anon.get(fixture.url("/api/users")))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = fixture
        .send(
            fixture
                .anon
                .get(fixture.url("/api/admin/pending-users"))
                .header("x-api-key", "wrong-key"),
        )
        .await;
    assert_eq!(status, 401);

    let (status, _) = fixture
        .send(
            fixture
                .anon
                .get(fixture.url("/api/admin/pending-users"))
                .bearer_auth(TEST_PSK),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get("/api/users").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_public_routes_open_without_psk() {
    let fixture = TestFixture::new().await;

    for path in ["/api/public/projects", "/api/public/members", "/api/revision"] {
        let (status, body) = fixture.send(fixture.anon.get(fixture.url(path))).await;
        assert_eq!(status, 200, "{} should be public", path);
        assert_eq!(body["success"], true);
        assert!(body["revisionId"].is_number());
    }
}

#[tokio::test]
async fn test_auth_disabled_without_psk() {
    let fixture = TestFixture::with_psk(None).await;

    let (status, _) = fixture
        .send(fixture.anon.get(fixture.url("/api/users")))
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_signup_validation_messages() {
    let fixture = TestFixture::new().await;

    let mut form = signup_form("sara", "sara@lab.edu", "student");
    form["confirmPassword"] = json!("different");
    let (status, body) = fixture.signup(form).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Passwords do not match.");

    let mut form = signup_form("sara", "sara@lab.edu", "student");
    form["password"] = json!("abc");
    form["confirmPassword"] = json!("abc");
    let (status, body) = fixture.signup(form).await;
    assert_eq!(status, 400);
    assert_eq!(
        body["error"]["message"],
        "Password must be at least 6 characters long."
    );

    let (status, _) = fixture
        .signup(signup_form("sara", "sara@lab.edu", "admin"))
        .await;
    assert_eq!(status, 400);

    let mut form = signup_form("sara", "sara@lab.edu", "student");
    form["rank"] = json!("founder");
    let (status, _) = fixture.signup(form).await;
    assert_eq!(status, 400);

    // Nothing was recorded
    let (_, body) = fixture.get("/api/admin/pending-users").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_signup_creates_pending_user_and_notification() {
    let fixture = TestFixture::new().await;
    let before = fixture.revision().await;

    let (status, body) = fixture
        .signup(signup_form("sara", "Sara@Lab.edu", "student"))
        .await;
    assert_eq!(status, 200);
    let pending = &body["data"]["pendingUser"];
    assert_eq!(pending["email"], "sara@lab.edu");
    assert_eq!(pending["status"], "pending");
    assert!(pending.get("passwordHash").is_none());

    let notification = &body["data"]["notification"];
    assert_eq!(notification["type"], "user_signup_request");
    assert_eq!(notification["pendingUserId"], pending["id"]);
    assert_eq!(
        notification["message"],
        "New user Sara Malik (sara) has requested to join as student"
    );
    assert_eq!(notification["read"], false);
    assert_eq!(notification["status"], "pending");

    assert!(fixture.revision().await > before);
}

#[tokio::test]
async fn test_duplicate_identity_rejected_before_write() {
    let fixture = TestFixture::new().await;

    let (status, _) = fixture
        .signup(signup_form("sara", "sara@lab.edu", "student"))
        .await;
    assert_eq!(status, 200);
    let revision = fixture.revision().await;

    // Same email, different case and username
    let (status, body) = fixture
        .signup(signup_form("sara2", " SARA@lab.edu ", "student"))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "DUPLICATE");
    assert_eq!(body["error"]["message"], "Username or email already exists!");

    // Same username, different email
    let (status, _) = fixture
        .signup(signup_form("sara", "other@lab.edu", "mentor"))
        .await;
    assert_eq!(status, 409);

    // Username held by an approved user
    fixture.create_user("hamza", "mentor", "head").await;
    let revision_after_user = fixture.revision().await;
    assert!(revision_after_user > revision);
    let (status, _) = fixture
        .signup(signup_form("hamza", "new@lab.edu", "student"))
        .await;
    assert_eq!(status, 409);

    let (_, pending) = fixture.get("/api/admin/pending-users").await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 1);
    let (_, notifications) = fixture.get("/api/admin/notifications").await;
    assert_eq!(notifications["data"].as_array().unwrap().len(), 1);
    assert_eq!(fixture.revision().await, revision_after_user);
}

#[tokio::test]
async fn test_approve_creates_exactly_one_user() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture
        .signup(signup_form("sara", "sara@lab.edu", "student"))
        .await;
    let pending_id = body["data"]["pendingUser"]["id"].as_str().unwrap().to_string();

    // Login is refused while the request is pending
    let (status, body) = fixture.login("sara", "secret1").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["message"], "Invalid credentials. Please try again.");

    let (status, body) = fixture
        .post(
            &format!("/api/admin/pending-users/{}/approve", pending_id),
            json!({ "rank": "internee", "note": "Welcome aboard" }),
        )
        .await;
    assert_eq!(status, 200, "approve failed: {}", body);
    let user = &body["data"];
    assert_eq!(user["userName"], "sara");
    assert_eq!(user["role"], "student");
    assert_eq!(user["rank"], "internee");
    let user_id = user["id"].as_str().unwrap().to_string();

    let (_, users) = fixture.get("/api/users").await;
    let users = users["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], user_id.as_str());

    let (_, pending) = fixture.get("/api/admin/pending-users").await;
    assert!(pending["data"].as_array().unwrap().is_empty());

    let (_, notifications) = fixture.get("/api/admin/notifications").await;
    let notification = notifications["data"][0].clone();
    assert_eq!(notification["status"], "approved");
    assert_eq!(notification["read"], true);
    assert_eq!(notification["reviewNote"], "Welcome aboard");
    assert!(notification["reviewedAt"].is_string());

    // A second decision finds nothing and leaves the notification alone
    let (status, body) = fixture
        .post(
            &format!("/api/admin/pending-users/{}/approve", pending_id),
            json!({}),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    let (status, _) = fixture
        .post(
            &format!("/api/admin/pending-users/{}/reject", pending_id),
            json!({}),
        )
        .await;
    assert_eq!(status, 404);

    let (_, notifications) = fixture.get("/api/admin/notifications").await;
    assert_eq!(notifications["data"][0], notification);
    let (_, users) = fixture.get("/api/users").await;
    assert_eq!(users["data"].as_array().unwrap().len(), 1);

    // The stored password now works, by username or email
    let (status, body) = fixture.login("sara", "secret1").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["user"]["id"], user_id.as_str());
    assert_eq!(body["data"]["tokenType"], "Bearer");
    assert!(body["data"]["accessToken"].is_string());
    let (status, _) = fixture.login("SARA@lab.edu", "secret1").await;
    assert_eq!(status, 200);
    let (status, _) = fixture.login("sara", "wrong-password").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_approve_without_body_and_role_override() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture
        .signup(signup_form("nadia", "nadia@lab.edu", "student"))
        .await;
    let pending_id = body["data"]["pendingUser"]["id"].as_str().unwrap().to_string();

    // Mentor rank without switching the role is refused and nothing changes
    let (status, _) = fixture
        .post(
            &format!("/api/admin/pending-users/{}/approve", pending_id),
            json!({ "rank": "director" }),
        )
        .await;
    assert_eq!(status, 400);
    let (_, pending) = fixture.get("/api/admin/pending-users").await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 1);

    let (status, body) = fixture
        .post(
            &format!("/api/admin/pending-users/{}/approve", pending_id),
            json!({ "role": "mentor", "rank": "director" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["role"], "mentor");
    assert_eq!(body["data"]["rank"], "director");

    let (_, body) = fixture
        .signup(signup_form("omar", "omar@lab.edu", "student"))
        .await;
    let pending_id = body["data"]["pendingUser"]["id"].as_str().unwrap().to_string();
    let (status, body) = fixture
        .send(
            fixture
                .client
                .post(fixture.url(&format!("/api/admin/pending-users/{}/approve", pending_id))),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["role"], "student");
}

#[tokio::test]
async fn test_reject_creates_no_user() {
    let fixture = TestFixture::new().await;

    let (_, body) = fixture
        .signup(signup_form("sara", "sara@lab.edu", "mentor"))
        .await;
    let pending_id = body["data"]["pendingUser"]["id"].as_str().unwrap().to_string();

    let (status, body) = fixture
        .post(
            &format!("/api/admin/pending-users/{}/reject", pending_id),
            json!({ "note": "Not a lab member" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "rejected");

    let (_, users) = fixture.get("/api/users").await;
    assert!(users["data"].as_array().unwrap().is_empty());
    let (_, pending) = fixture.get("/api/admin/pending-users").await;
    assert!(pending["data"].as_array().unwrap().is_empty());

    let (_, notifications) = fixture.get("/api/admin/notifications?status=rejected").await;
    let notifications = notifications["data"].as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["reviewNote"], "Not a lab member");

    let (status, _) = fixture.login("sara", "secret1").await;
    assert_eq!(status, 401);

    // The identity is free again
    let (status, _) = fixture
        .signup(signup_form("sara", "sara@lab.edu", "mentor"))
        .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_notification_filter_and_mark_read() {
    let fixture = TestFixture::new().await;

    fixture
        .signup(signup_form("sara", "sara@lab.edu", "student"))
        .await;
    let (_, body) = fixture
        .signup(signup_form("ali", "ali@lab.edu", "mentor"))
        .await;
    let notification_id = body["data"]["notification"]["id"].as_str().unwrap().to_string();

    let (_, pending) = fixture.get("/api/admin/notifications?status=pending").await;
    assert_eq!(pending["data"].as_array().unwrap().len(), 2);
    let (_, approved) = fixture.get("/api/admin/notifications?status=approved").await;
    assert!(approved["data"].as_array().unwrap().is_empty());

    let (status, body) = fixture.get("/api/admin/notifications?status=archived").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = fixture
        .put(
            &format!("/api/admin/notifications/{}/read", notification_id),
            json!({}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["read"], true);
    assert_eq!(body["data"]["status"], "pending");

    let (status, _) = fixture
        .put("/api/admin/notifications/missing/read", json!({}))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_user_profile_update_rules() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_user("hamza", "mentor", "head").await;
    let path = format!("/api/users/{}", id);

    let (status, body) = fixture
        .put(&path, json!({ "email": "changed@lab.edu" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Email cannot be changed");

    let (status, body) = fixture.put(&path, json!({ "userName": "hamza2" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Username cannot be changed");

    // Resubmitting the stored identity is allowed
    let (status, body) = fixture
        .put(
            &path,
            json!({ "email": "HAMZA@lab.edu", "userName": "hamza", "description": "Vision lead", "expectedVersion": 1 }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["description"], "Vision lead");
    assert_eq!(body["data"]["version"], 2);

    let (status, body) = fixture
        .put(&path, json!({ "firstName": "Stale", "expectedVersion": 1 }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");

    // Student ranks do not fit a mentor
    let (status, _) = fixture.put(&path, json!({ "rank": "alumni" })).await;
    assert_eq!(status, 400);

    // Switching role drops the old rank
    let (status, body) = fixture.put(&path, json!({ "role": "student" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["role"], "student");
    assert!(body["data"].get("rank").is_none());

    let (status, _) = fixture.delete(&path).await;
    assert_eq!(status, 200);
    let (status, _) = fixture.get(&path).await;
    assert_eq!(status, 404);
    let (status, _) = fixture.login("hamza", "secret1").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_list_users_by_role() {
    let fixture = TestFixture::new().await;
    fixture.create_user("hamza", "mentor", "head").await;
    fixture.create_user("bilal", "student", "fypstudent").await;
    fixture.create_user("zara", "student", "alumni").await;

    let (_, body) = fixture.get("/api/users?role=student").await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["userName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["bilal", "zara"]);

    let (status, _) = fixture.get("/api/users?role=wizard").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_mentor_project_archive_rules() {
    let fixture = TestFixture::new().await;
    let mentor_id = fixture.create_user("hamza", "mentor", "head").await;
    let student_id = fixture.create_user("bilal", "student", "internee").await;

    let (status, _) = fixture
        .post(
            "/api/projects",
            json!({ "name": "Swarm", "description": "Drones", "mentorId": student_id }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/projects",
            json!({ "name": " ", "description": "Drones", "mentorId": mentor_id }),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post(
            "/api/projects",
            json!({ "name": "Swarm", "description": "Drones", "mentorId": mentor_id }),
        )
        .await;
    assert_eq!(status, 200);
    let project = &body["data"];
    assert_eq!(project["status"], "private");
    assert_eq!(project["image"], "/placeholder.svg");
    assert_eq!(project["isArchived"], false);
    let path = format!("/api/projects/{}", project["id"].as_str().unwrap());

    let (status, body) = fixture.post(&format!("{}/archive", path), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["isArchived"], true);

    let (status, body) = fixture.put(&path, json!({ "name": "Swarm v2" })).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    assert_eq!(body["error"]["message"], "Cannot edit archived projects.");

    let (status, _) = fixture.delete(&path).await;
    assert_eq!(status, 409);

    let (_, body) = fixture.post(&format!("{}/archive", path), json!({})).await;
    assert_eq!(body["data"]["isArchived"], false);

    let (status, body) = fixture.put(&path, json!({ "status": "public" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "public");

    let (status, body) = fixture.post(&format!("{}/archive", path), json!({})).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["message"], "Only private projects can be archived.");

    let (_, body) = fixture
        .get(&format!("/api/projects?mentorId={}", mentor_id))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = fixture.delete(&path).await;
    assert_eq!(status, 200);
    let (status, _) = fixture.get(&path).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_admin_project_students_and_roles() {
    let fixture = TestFixture::new().await;
    let mentor_id = fixture.create_user("hamza", "mentor", "head").await;
    let s1 = fixture.create_user("bilal", "student", "fypstudent").await;
    let s2 = fixture.create_user("zara", "student", "fypstudent").await;
    let s3 = fixture.create_user("omar", "student", "fypstudent").await;
    let s4 = fixture.create_user("hina", "student", "fypstudent").await;

    let project = |students: Vec<&str>, mentor: &str| {
        json!({
            "name": "Crop disease detection",
            "description": "Leaf imagery classifier",
            "mentorId": mentor,
            "studentIds": students,
            "type": "fyp"
        })
    };

    let (status, _) = fixture
        .post("/api/admin-projects", project(vec![], &mentor_id))
        .await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/admin-projects",
            project(vec![&s1, &s2, &s3, &s4], &mentor_id),
        )
        .await;
    assert_eq!(status, 400);

    // Mentor slot needs a mentor, student slots need students
    let (status, _) = fixture
        .post("/api/admin-projects", project(vec![&s1], &s2))
        .await;
    assert_eq!(status, 400);
    let (status, _) = fixture
        .post("/api/admin-projects", project(vec![&mentor_id], &mentor_id))
        .await;
    assert_eq!(status, 400);

    let (status, body) = fixture
        .post("/api/admin-projects", project(vec![&s1, &s2, &s3], &mentor_id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "private");
    assert_eq!(body["data"]["type"], "fyp");
    assert_eq!(body["data"]["studentIds"].as_array().unwrap().len(), 3);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let created_at = body["data"]["createdAt"].clone();
    let path = format!("/api/admin-projects/{}", id);

    let mut replacement = project(vec![&s4], &mentor_id);
    replacement["status"] = json!("public");
    replacement["expectedVersion"] = json!(1);
    let (status, body) = fixture.put(&path, replacement.clone()).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "public");
    assert_eq!(body["data"]["createdAt"], created_at);
    assert_eq!(body["data"]["studentIds"], json!([s4]));

    let (status, body) = fixture.put(&path, replacement).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");

    // Status falls back to private when omitted
    let (_, body) = fixture.put(&path, project(vec![&s1], &mentor_id)).await;
    assert_eq!(body["data"]["status"], "private");

    let (_, body) = fixture.get("/api/admin-projects?type=fyp").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = fixture.get("/api/admin-projects?type=research").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = fixture.delete(&path).await;
    assert_eq!(status, 200);
    let (status, _) = fixture.delete(&path).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_public_portfolio() {
    let fixture = TestFixture::new().await;
    let mentor_id = fixture.create_user("hamza", "mentor", "founder").await;
    fixture.create_user("bilal", "student", "fypstudent").await;

    let (status, _) = fixture
        .post(
            "/api/users",
            json!({
                "userName": "ghost",
                "email": "ghost@lab.edu",
                "password": "secret1",
                "confirmPassword": "secret1",
                "isActiveMember": false
            }),
        )
        .await;
    assert_eq!(status, 200);

    for (name, status) in [("Visible", "public"), ("Hidden", "private")] {
        let (code, _) = fixture
            .post(
                "/api/projects",
                json!({ "name": name, "description": "d", "mentorId": mentor_id, "status": status }),
            )
            .await;
        assert_eq!(code, 200);
    }

    let (_, body) = fixture
        .send(fixture.anon.get(fixture.url("/api/public/projects")))
        .await;
    let mentor_projects = body["data"]["mentorProjects"].as_array().unwrap();
    assert_eq!(mentor_projects.len(), 1);
    assert_eq!(mentor_projects[0]["name"], "Visible");
    assert!(body["data"]["adminProjects"].as_array().unwrap().is_empty());

    let (_, body) = fixture
        .send(fixture.anon.get(fixture.url("/api/public/members")))
        .await;
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["userName"], "hamza");
    assert_eq!(members[0]["rankLabel"], "Founder");
    assert_eq!(members[1]["rankLabel"], "FYP Student");
    assert!(members[0].get("email").is_none());
}

#[tokio::test]
async fn test_search_users() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_user("hamza", "mentor", "head").await;
    fixture.create_user("bilal", "student", "internee").await;

    fixture
        .put(
            &format!("/api/users/{}", id),
            json!({ "description": "Leads the robotics group" }),
        )
        .await;

    let (status, body) = fixture.get("/api/users/search?q=robotics").await;
    assert_eq!(status, 200);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["user"]["id"], id.as_str());

    let (_, body) = fixture.get("/api/users/search?q=bilal&role=mentor").await;
    assert_eq!(body["data"]["total"], 0);

    let (_, body) = fixture.get("/api/users/search?q=").await;
    assert_eq!(body["data"]["total"], 0);

    fixture.delete(&format!("/api/users/{}", id)).await;
    let (_, body) = fixture.get("/api/users/search?q=robotics").await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_search_paging_edges() {
    let fixture = TestFixture::new().await;
    fixture.create_user("hamza", "mentor", "head").await;

    let (status, body) = fixture.get("/api/users/search?q=hamza&limit=0").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["limit"], 1);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 1);

    let (status, body) = fixture
        .get(&format!(
            "/api/users/search?q=hamza&limit={}&offset={}",
            usize::MAX,
            usize::MAX
        ))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["limit"], 100);
    assert!(body["data"]["results"].as_array().unwrap().is_empty());
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_search_role_filter_counts_all_matches() {
    let fixture = TestFixture::new().await;
    let mut mentor_id = String::new();
    for (name, role, rank) in [
        ("bilal", "student", "fypstudent"),
        ("zara", "student", "fypstudent"),
        ("omar", "student", "internee"),
        ("hamza", "mentor", "head"),
    ] {
        let id = fixture.create_user(name, role, rank).await;
        fixture
            .put(
                &format!("/api/users/{}", id),
                json!({ "description": "Builds robotics kits" }),
            )
            .await;
        if role == "mentor" {
            mentor_id = id;
        }
    }

    let (status, body) = fixture
        .get("/api/users/search?q=robotics&role=mentor&limit=2")
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["total"], 1);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["user"]["id"], mentor_id.as_str());

    let (_, body) = fixture
        .get("/api/users/search?q=robotics&role=student&limit=2")
        .await;
    assert_eq!(body["data"]["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total"], 3);
}

#[tokio::test]
async fn test_profile_fields_and_public_profile() {
    let fixture = TestFixture::new().await;
    let mentor_id = fixture.create_user("hamza", "mentor", "founder").await;
    let student_id = fixture.create_user("bilal", "student", "fypstudent").await;

    let (status, body) = fixture
        .put(
            &format!("/api/users/{}", mentor_id),
            json!({
                "skills": ["Computer vision", "Rust", "Rust"],
                "social": { "github": "https://github.com/hamza", "linkedin": "" },
                "projects": [{ "name": "Drone swarm", "details": "Formation flight", "image": "" }]
            }),
        )
        .await;
    assert_eq!(status, 200, "profile update failed: {}", body);
    assert_eq!(body["data"]["skills"], json!(["Computer vision", "Rust"]));
    assert_eq!(body["data"]["social"], json!({ "github": "https://github.com/hamza" }));

    let (status, body) = fixture
        .put(
            &format!("/api/users/{}", mentor_id),
            json!({ "social": { "orkut": "https://orkut.com/hamza" } }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    for (name, status) in [("Visible", "public"), ("Hidden", "private")] {
        fixture
            .post(
                "/api/projects",
                json!({ "name": name, "description": "d", "mentorId": mentor_id, "status": status }),
            )
            .await;
    }

    let (status, body) = fixture
        .send(
            fixture
                .anon
                .get(fixture.url(&format!("/api/public/members/{}", mentor_id))),
        )
        .await;
    assert_eq!(status, 200);
    let profile = &body["data"];
    assert_eq!(profile["member"]["userName"], "hamza");
    assert_eq!(profile["member"]["skills"][1], "Rust");
    assert_eq!(profile["member"]["projects"][0]["name"], "Drone swarm");
    assert!(profile["member"].get("email").is_none());
    let mentor_projects = profile["mentorProjects"].as_array().unwrap();
    assert_eq!(mentor_projects.len(), 1);
    assert_eq!(mentor_projects[0]["name"], "Visible");

    // Skills are searchable
    let (_, body) = fixture.get("/api/users/search?q=vision").await;
    assert_eq!(body["data"]["results"][0]["user"]["id"], mentor_id.as_str());

    let (_, body) = fixture
        .send(
            fixture
                .anon
                .get(fixture.url(&format!("/api/public/members/{}", student_id))),
        )
        .await;
    assert!(body["data"]["mentorProjects"].as_array().unwrap().is_empty());

    fixture
        .put(
            &format!("/api/users/{}", student_id),
            json!({ "isActiveMember": false }),
        )
        .await;
    let (status, _) = fixture
        .send(
            fixture
                .anon
                .get(fixture.url(&format!("/api/public/members/{}", student_id))),
        )
        .await;
    assert_eq!(status, 404);
    let (status, _) = fixture
        .send(fixture.anon.get(fixture.url("/api/public/members/missing")))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_profile_picture_can_be_cleared() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_user("hamza", "mentor", "head").await;
    let path = format!("/api/users/{}", id);

    let (_, body) = fixture
        .put(&path, json!({ "profilePic": "https://cdn.lab.edu/hamza.png" }))
        .await;
    assert_eq!(body["data"]["profilePic"], "https://cdn.lab.edu/hamza.png");

    // Omitting the field keeps the picture
    let (_, body) = fixture.put(&path, json!({ "description": "Vision" })).await;
    assert_eq!(body["data"]["profilePic"], "https://cdn.lab.edu/hamza.png");

    let (status, body) = fixture.put(&path, json!({ "profilePic": "" })).await;
    assert_eq!(status, 200);
    assert!(body["data"].get("profilePic").is_none());

    let (_, body) = fixture.get(&path).await;
    assert!(body["data"].get("profilePic").is_none());
}

#[tokio::test]
async fn test_mentor_token_limited_to_own_projects() {
    let fixture = TestFixture::new().await;
    let hamza_id = fixture.create_user("hamza", "mentor", "head").await;
    let noor_id = fixture.create_user("noor", "mentor", "researcher").await;
    fixture.create_user("bilal", "student", "internee").await;

    let (_, body) = fixture
        .post(
            "/api/projects",
            json!({ "name": "Noor's lab", "description": "NLP", "mentorId": noor_id }),
        )
        .await;
    let noor_project = format!("/api/projects/{}", body["data"]["id"].as_str().unwrap());

    let hamza = fixture.token("hamza").await;

    // Creating without a mentor id assigns the caller
    let (status, body) = fixture
        .as_member(
            &hamza,
            reqwest::Method::POST,
            "/api/projects",
            Some(json!({ "name": "Swarm", "description": "Drones" })),
        )
        .await;
    assert_eq!(status, 200, "create failed: {}", body);
    assert_eq!(body["data"]["mentorId"], hamza_id.as_str());
    let own_project = format!("/api/projects/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = fixture
        .as_member(
            &hamza,
            reqwest::Method::PUT,
            &own_project,
            Some(json!({ "name": "Swarm v2" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Swarm v2");

    let (status, body) = fixture
        .as_member(
            &hamza,
            reqwest::Method::PUT,
            &noor_project,
            Some(json!({ "name": "Taken over" })),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    for (method, path) in [
        (reqwest::Method::DELETE, noor_project.clone()),
        (reqwest::Method::POST, format!("{}/archive", noor_project)),
        (reqwest::Method::GET, noor_project.clone()),
    ] {
        let (status, _) = fixture.as_member(&hamza, method, &path, None).await;
        assert_eq!(status, 403, "{}", path);
    }

    let (status, _) = fixture
        .as_member(
            &hamza,
            reqwest::Method::POST,
            "/api/projects",
            Some(json!({ "name": "Sneaky", "description": "d", "mentorId": noor_id })),
        )
        .await;
    assert_eq!(status, 403);

    let (_, body) = fixture
        .as_member(&hamza, reqwest::Method::GET, "/api/projects", None)
        .await;
    let projects = body["data"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["mentorId"], hamza_id.as_str());

    // Noor's project is untouched
    let (_, body) = fixture.get(&noor_project).await;
    assert_eq!(body["data"]["name"], "Noor's lab");

    // Students and admin routes
    let bilal = fixture.token("bilal").await;
    let (status, _) = fixture
        .as_member(&bilal, reqwest::Method::GET, "/api/projects", None)
        .await;
    assert_eq!(status, 403);
    let (status, body) = fixture
        .as_member(&hamza, reqwest::Method::GET, "/api/users", None)
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = fixture
        .as_member("not-a-token", reqwest::Method::GET, "/api/projects", None)
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_member_token_follows_role_changes_and_deletion() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_user("hamza", "mentor", "head").await;
    let token = fixture.token("hamza").await;

    fixture
        .put(&format!("/api/users/{}", id), json!({ "role": "admin" }))
        .await;
    let (status, _) = fixture
        .as_member(&token, reqwest::Method::GET, "/api/users", None)
        .await;
    assert_eq!(status, 200);

    fixture.delete(&format!("/api/users/{}", id)).await;
    let (status, _) = fixture
        .as_member(&token, reqwest::Method::GET, "/api/me", None)
        .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_member_edits_own_profile() {
    let fixture = TestFixture::new().await;
    let id = fixture.create_user("bilal", "student", "internee").await;
    let token = fixture.token("bilal").await;

    let (status, body) = fixture
        .as_member(&token, reqwest::Method::GET, "/api/me", None)
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = fixture
        .as_member(
            &token,
            reqwest::Method::PUT,
            "/api/me",
            Some(json!({ "skills": ["ROS"], "description": "Line followers" })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["skills"], json!(["ROS"]));

    let (status, body) = fixture
        .as_member(
            &token,
            reqwest::Method::PUT,
            "/api/me",
            Some(json!({ "role": "mentor", "rank": "founder" })),
        )
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // Resubmitting the current values is not a promotion
    let (status, _) = fixture
        .as_member(
            &token,
            reqwest::Method::PUT,
            "/api/me",
            Some(json!({ "role": "student", "rank": "internee", "isActiveMember": true })),
        )
        .await;
    assert_eq!(status, 200);

    // The operator key has no profile of its own
    let (status, _) = fixture.get("/api/me").await;
    assert_eq!(status, 403);
}

#[tokio::test]
async fn test_login_identifier_names_one_account() {
    let fixture = TestFixture::new().await;

    let mut form = signup_form("sara@lab.edu", "sara@lab.edu", "student");
    let (status, body) = fixture.signup(form.clone()).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "Username cannot contain @");

    form["userName"] = json!("sara");
    form["email"] = json!("sara");
    let (status, _) = fixture.signup(form).await;
    assert_eq!(status, 400);

    let (status, _) = fixture
        .post(
            "/api/users",
            json!({
                "userName": "bilal@lab.edu",
                "email": "bilal@lab.edu",
                "password": "secret1",
                "confirmPassword": "secret1"
            }),
        )
        .await;
    assert_eq!(status, 400);

    let hamza = fixture.create_user("hamza", "mentor", "head").await;
    let noor = fixture.create_user("noor", "mentor", "head").await;

    let (_, body) = fixture.login("hamza@lab.edu", "secret1").await;
    assert_eq!(body["data"]["user"]["id"], hamza.as_str());
    let (_, body) = fixture.login("noor", "secret1").await;
    assert_eq!(body["data"]["user"]["id"], noor.as_str());
    let (status, _) = fixture.login("hamza@lab.edu ", "wrong1").await;
    assert_eq!(status, 401);
}
