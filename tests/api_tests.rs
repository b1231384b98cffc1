use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use permitr::config::Config;
use tower::ServiceExt;

/// Default admin seeded by the initial migration.
const ADMIN_EMAIL: &str = "admin@permitr.local";
const ADMIN_PASSWORD: &str = "change-me";

const BOUNDARY: &str = "permitr-test-boundary";

async fn spawn_app() -> Router {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    // A single pooled connection keeps the in-memory database shared.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.general.uploads_path = std::env::temp_dir()
        .join(format!("permitr-test-uploads-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .to_string();
    config.server.secure_cookies = false;

    let state = permitr::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    permitr::api::router(state).await
}

fn json_request(
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Logs in and returns the session cookie.
async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            None,
            &serde_json::json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set a session cookie")
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn create_account(app: &Router, admin_cookie: &str, role: &str, email: &str, name: &str) {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/accounts",
            Some(admin_cookie),
            &serde_json::json!({
                "role": role,
                "email": email,
                "display_name": name,
                "password": "test-password",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

fn multipart_permit_body(title: &str) -> (String, Vec<u8>) {
    let mut body = String::new();
    for (name, value) in [
        ("title", title),
        ("work_description", "Replace the corroded pipe section"),
        ("terminal", "Terminal A"),
        ("window_start", "2026-03-02T08:00:00Z"),
        ("window_end", "2026-03-02T16:00:00Z"),
        ("risk_flags", "hot_work,confined_space"),
        ("risk_reasons", "Welding near fuel lines"),
    ] {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"method.txt\"\r\n\
         Content-Type: text/plain\r\n\r\nmethod statement\r\n"
    ));
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    (
        format!("multipart/form-data; boundary={BOUNDARY}"),
        body.into_bytes(),
    )
}

async fn submit_permit(app: &Router, cookie: &str, title: &str) -> i64 {
    let (content_type, body) = multipart_permit_body(title);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/permit")
                .header(header::CONTENT_TYPE, content_type)
                .header(header::COOKIE, cookie)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["data"]["status"], "pending");
    json["data"]["id"].as_i64().unwrap()
}

fn assert_permit_number_shape(number: &str) {
    // BHS-<DDMMYYYY>-<HHMMSS>-<NNN>
    let parts: Vec<&str> = number.split('-').collect();
    assert_eq!(parts.len(), 4, "unexpected permit number: {number}");
    assert_eq!(parts[0], "BHS");
    assert_eq!(parts[1].len(), 8);
    assert_eq!(parts[2].len(), 6);
    assert_eq!(parts[3].len(), 3);
    for segment in &parts[1..] {
        assert!(segment.chars().all(|c| c.is_ascii_digit()));
    }
}

#[tokio::test]
async fn test_protected_routes_require_authentication() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(get_request("/api/profile", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(get_request("/api/permit", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials_with_field_tag() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            None,
            &serde_json::json!({ "email": "ghost@nowhere.example", "password": "nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["field"], "email");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            None,
            &serde_json::json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["field"], "password");
}

#[tokio::test]
async fn test_profile_reports_user_and_session() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(get_request("/api/profile", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["data"]["user"]["email"], ADMIN_EMAIL);
    assert_eq!(json["data"]["user"]["role"], "admin");
    assert_eq!(json["data"]["session"]["role"], "admin");
    assert!(json["data"]["session"]["id"].is_string());
}

#[tokio::test]
async fn test_session_takeover_revokes_previous_session() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_account(&app, &admin_cookie, "requester", "u1@site.example", "U One").await;

    let cookie_a = login(&app, "u1@site.example", "test-password").await;

    // Device A works.
    let response = app
        .clone()
        .oneshot(get_request("/api/profile", Some(&cookie_a)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Second login on device B supersedes A.
    let cookie_b = login(&app, "u1@site.example", "test-password").await;

    let response = app
        .clone()
        .oneshot(get_request("/api/profile", Some(&cookie_a)))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 440);
    let json = response_json(response).await;
    assert_eq!(json["code"], "SESSION_REVOKED");

    // Device B stays valid.
    let response = app
        .clone()
        .oneshot(get_request("/api/profile", Some(&cookie_b)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/logout")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/profile", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_lifecycle_approval_path() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_account(&app, &admin_cookie, "requester", "req@site.example", "R. Hasan").await;
    create_account(&app, &admin_cookie, "pre_approver", "pre@site.example", "P. Salem").await;

    let requester_cookie = login(&app, "req@site.example", "test-password").await;
    let permit_id = submit_permit(&app, &requester_cookie, "Hot work at bay 3").await;

    // The permit shows up in the pre-approver queue.
    let reviewer_cookie = login(&app, "pre@site.example", "test-password").await;
    let response = app
        .clone()
        .oneshot(get_request("/api/permits", Some(&reviewer_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"][0]["id"], permit_id);

    // Pre-approve with a comment.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/approve/{permit_id}"),
            Some(&reviewer_cookie),
            &serde_json::json!({ "comments": "ok" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"]["status"], "in_progress");
    assert_eq!(json["data"]["pre_approval"]["comments"], "ok");
    assert!(json["data"]["permit_number"].is_null());

    // PDF is refused before approval.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/permit/{permit_id}/pdf"),
            Some(&requester_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Requester finalizes to approved; permit number is minted.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/permit/{permit_id}/status"),
            Some(&requester_cookie),
            &serde_json::json!({ "status": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"]["status"], "approved");
    let number = json["data"]["permit_number"].as_str().unwrap().to_string();
    assert_permit_number_shape(&number);

    // Approving again is an invalid transition and the number is unchanged.
    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/permit/{permit_id}/status"),
            Some(&requester_cookie),
            &serde_json::json!({ "status": "approved" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/permit/{permit_id}"),
            Some(&requester_cookie),
        ))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["data"]["permit_number"], number.as_str());

    // The artifact is available now.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/permit/{permit_id}/pdf"),
            Some(&requester_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.starts_with(b"%PDF"));
    assert!(!body.is_empty());

    // The requester got a permit_approved notification at pre-approval.
    let response = app
        .clone()
        .oneshot(get_request("/api/notifications", Some(&requester_cookie)))
        .await
        .unwrap();
    let json = response_json(response).await;
    let kinds: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"permit_approved"));

    // Read-sweep clears the unread counter.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/notifications/read-all",
            Some(&requester_cookie),
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/notifications/unread-count",
            Some(&requester_cookie),
        ))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["data"]["unread"], 0);
}

#[tokio::test]
async fn test_rejection_path_leaves_number_unset() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_account(&app, &admin_cookie, "requester", "req2@site.example", "R. Two").await;
    create_account(&app, &admin_cookie, "pre_approver", "pre2@site.example", "P. Two").await;

    let requester_cookie = login(&app, "req2@site.example", "test-password").await;
    let permit_id = submit_permit(&app, &requester_cookie, "Scaffolding erection").await;

    let reviewer_cookie = login(&app, "pre2@site.example", "test-password").await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/reject/{permit_id}"),
            Some(&reviewer_cookie),
            &serde_json::json!({ "comments": "missing HSE form" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["data"]["status"], "rejected");
    assert!(json["data"]["permit_number"].is_null());

    // Terminal: a second review attempt conflicts.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/approve/{permit_id}"),
            Some(&reviewer_cookie),
            &serde_json::json!({ "comments": "oops" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // No artifact for a rejected permit.
    let response = app
        .clone()
        .oneshot(get_request(
            &format!("/api/permit/{permit_id}/pdf"),
            Some(&requester_cookie),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The rejection produced a notification.
    let response = app
        .clone()
        .oneshot(get_request("/api/notifications", Some(&requester_cookie)))
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["data"][0]["kind"], "permit_rejected");
}

#[tokio::test]
async fn test_role_gates() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_account(&app, &admin_cookie, "requester", "req3@site.example", "R. Three").await;
    let requester_cookie = login(&app, "req3@site.example", "test-password").await;

    // Requesters cannot see the review queue or manage accounts.
    let response = app
        .clone()
        .oneshot(get_request("/api/permits", Some(&requester_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(get_request("/api/accounts", Some(&requester_cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admins cannot submit permits.
    let (content_type, body) = multipart_permit_body("Not a requester");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/permit")
                .header(header::CONTENT_TYPE, content_type)
                .header(header::COOKIE, &admin_cookie)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_inactive_account_cannot_login() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    create_account(&app, &admin_cookie, "requester", "req4@site.example", "R. Four").await;

    // Find the created account id.
    let response = app
        .clone()
        .oneshot(get_request("/api/accounts", Some(&admin_cookie)))
        .await
        .unwrap();
    let json = response_json(response).await;
    let id = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["email"] == "req4@site.example")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/accounts/requester/{id}/status"),
            Some(&admin_cookie),
            &serde_json::json!({ "status": "inactive" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/login",
            None,
            &serde_json::json!({ "email": "req4@site.example", "password": "test-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_password_is_non_enumerating() {
    let app = spawn_app().await;

    let known = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            None,
            &serde_json::json!({ "email": ADMIN_EMAIL }),
        ))
        .await
        .unwrap();
    let unknown = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/forgot-password",
            None,
            &serde_json::json!({ "email": "ghost@nowhere.example" }),
        ))
        .await
        .unwrap();

    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(unknown.status(), StatusCode::OK);

    let known_json = response_json(known).await;
    let unknown_json = response_json(unknown).await;
    assert_eq!(known_json, unknown_json);
}

#[tokio::test]
async fn test_update_password_requires_current() {
    let app = spawn_app().await;
    let admin_cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/update-password",
            Some(&admin_cookie),
            &serde_json::json!({
                "current_password": "definitely-wrong",
                "new_password": "a-new-password",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/update-password",
            Some(&admin_cookie),
            &serde_json::json!({
                "current_password": ADMIN_PASSWORD,
                "new_password": "a-new-password",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // New credential works.
    login(&app, ADMIN_EMAIL, "a-new-password").await;
}

#[tokio::test]
async fn test_session_extend_keepalive() {
    let app = spawn_app().await;
    let cookie = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/session/extend",
            Some(&cookie),
            &serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
