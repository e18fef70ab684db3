use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use healthcare_plus_backend::app::app::Services;
use healthcare_plus_backend::config::{AdminUserConfig, AppConfig, JwtConfig};
use healthcare_plus_backend::util::notifier::LogNotifier;

const ADMIN_EMAIL: &str = "admin@hospital.test";
const ADMIN_PASSWORD: &str = "Admin123!";

struct TestApp {
    _dir: TempDir,
    router: Router,
}

async fn setup_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig { data_dir: dir.path().to_path_buf(), ..AppConfig::default() };
    let services = Services::build(&config, JwtConfig::default(), Arc::new(LogNotifier))
        .await
        .unwrap();
    services
        .seed(Some(AdminUserConfig {
            name: "Admin".to_string(),
            email: ADMIN_EMAIL.to_string(),
            phone: "555".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        }))
        .await;
    TestApp { _dir: dir, router: services.router() }
}

impl TestApp {
    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send("POST", "/api/auth/login", None, Some(json!({"email": email, "password": password})))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({"name": "Pat", "email": email, "phone": "555", "password": "Secret1!"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn book(&self, token: Option<&str>, email: &str) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/appointments",
                token,
                Some(json!({
                    "patientName": "Jane Doe",
                    "patientEmail": email,
                    "patientPhone": "555-0100",
                    "department": "cardiology",
                    "message": "Chest pain"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["appointment"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_booking_returns_reference() {
    let app = setup_app().await;
    let (status, body) = app
        .send(
            "POST",
            "/api/appointments",
            None,
            Some(json!({
                "patientName": "Jane Doe",
                "patientEmail": "jane@x.com",
                "patientPhone": "555-0100",
                "department": "general"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["appointment"]["status"], json!("pending"));
    assert!(body["reference"].as_str().unwrap().starts_with("APPT"));
}

#[tokio::test]
async fn test_booking_validation_errors() {
    let app = setup_app().await;
    let (status, body) = app
        .send(
            "POST",
            "/api/appointments",
            None,
            Some(json!({
                "patientName": "Jane",
                "patientEmail": "jane@x.com",
                "patientPhone": "1",
                "department": "dentistry"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));

    let (status, _) = app
        .send(
            "POST",
            "/api/appointments",
            None,
            Some(json!({
                "patientName": "Jane",
                "patientEmail": "not-an-email",
                "patientPhone": "1",
                "department": "general"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_routes_reject_anonymous_and_patients() {
    let app = setup_app().await;
    let patient = app.register("pat@x.com").await;

    let (status, _) = app.send("GET", "/api/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/api/appointments", Some(&patient), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("GET", "/api/users", Some("garbage-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (status, body) = app.send("GET", "/api/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
}

#[tokio::test]
async fn test_appointment_lifecycle_over_http() {
    let app = setup_app().await;
    let patient = app.register("pat@x.com").await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let id = app.book(Some(&patient), "pat@x.com").await;

    let (status, body) = app.send("GET", "/api/appointments/my", Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));

    let uri = format!("/api/appointments/{}/status", id);
    let (status, body) = app
        .send("PUT", &uri, Some(&admin), Some(json!({"status": "confirmed", "notes": "Room 4"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["status"], json!("confirmed"));

    let (status, _) = app
        .send("PUT", &uri, Some(&admin), Some(json!({"status": "finished"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let cancel = format!("/api/appointments/{}/cancel", id);
    let (status, body) = app.send("PUT", &cancel, Some(&patient), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["appointment"]["cancellationReason"], json!("Cancelled by patient"));

    let (status, body) = app
        .send("PUT", &cancel, Some(&admin), Some(json!({"reason": "again"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_appointment_visibility() {
    let app = setup_app().await;
    let owner = app.register("owner@x.com").await;
    let other = app.register("other@x.com").await;
    let id = app.book(None, "owner@x.com").await;
    let uri = format!("/api/appointments/{}", id);

    let (status, _) = app.send("GET", &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("GET", &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send("GET", "/api/appointments/missing", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_listing_stats_and_search() {
    let app = setup_app().await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    for n in 0..3 {
        app.book(None, &format!("p{}@x.com", n)).await;
    }

    let (status, body) = app
        .send("GET", "/api/appointments?page=1&limit=2&department=cardiology", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["total"], json!(3));
    assert_eq!(body["pages"], json!(2));
    assert_eq!(body["currentPage"], json!(1));

    let (status, _) = app.send("GET", "/api/appointments?status=done", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.send("GET", "/api/appointments/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["total"]["appointments"], json!(3));
    assert_eq!(body["stats"]["byStatus"]["pending"], json!(3));
    assert_eq!(body["stats"]["today"]["pending"], json!(3));

    let (status, body) = app.send("GET", "/api/appointments/search?q=P1@X", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
}

#[tokio::test]
async fn test_bulk_update_and_delete() {
    let app = setup_app().await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let first = app.book(None, "a@x.com").await;
    let second = app.book(None, "b@x.com").await;

    let (status, body) = app
        .send(
            "PUT",
            "/api/appointments/bulk",
            Some(&admin),
            Some(json!({"ids": [first, second], "changes": {"status": "completed"}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], json!(2));

    let uri = format!("/api/appointments/{}", first);
    let (status, _) = app.send("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.send("DELETE", "/api/appointments/prune?days=30", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], json!(0));
}

#[tokio::test]
async fn test_account_endpoints() {
    let app = setup_app().await;
    let token = app.register("pat@x.com").await;

    let (status, body) = app
        .send("POST", "/api/auth/register", None, Some(json!({"name": "X", "email": "pat@x.com", "phone": "1", "password": "Secret1!"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let (status, _) = app.send("GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], json!("pat@x.com"));
    assert!(body["user"].get("password").is_none());

    let (status, _) = app
        .send("POST", "/api/auth/login", None, Some(json!({"email": "pat@x.com", "password": "nope"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/change-password",
            Some(&token),
            Some(json!({"currentPassword": "Secret1!", "newPassword": "short"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_str().is_some());

    let (status, _) = app
        .send("PUT", "/api/auth/update-profile", Some(&token), Some(json!({"name": "Patricia"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send("DELETE", "/api/auth/delete-account", Some(&token), Some(json!({"password": "Secret1!"})))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_tips_endpoints() {
    let app = setup_app().await;
    let admin = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = app.send("GET", "/api/healthtips/random", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["tip"]["content"].as_str().is_some());

    let (status, body) = app.send("GET", "/api/healthtips", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(5));

    let (status, body) = app
        .send("POST", "/api/healthtips", Some(&admin), Some(json!({"tip": "Stretch", "category": "exercise"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["tip"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.send("DELETE", &format!("/api/healthtips/{}", id), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send("DELETE", &format!("/api/healthtips/{}", id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}
