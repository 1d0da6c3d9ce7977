//! End-to-end tests of the HTTP API against an in-memory store.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use cornerstone::gallery::{AlbumPhoto, AlbumSource};
use cornerstone::model::{
    date_key, Collection, DailyStats, SiteSettings, OTHER_PATHS, SETTINGS_ID,
};
use cornerstone::server::{router, AppState};
use cornerstone::{Config, Result, Storage};

const PASSCODE: &str = "Summit2026!";

struct TestApp {
    state: AppState,
    upload_dir: PathBuf,
}

impl TestApp {
    fn new(name: &str) -> Self {
        Self::with_config(name, |_| {})
    }

    fn with_config(name: &str, configure: impl FnOnce(&mut Config)) -> Self {
        let upload_dir = std::env::temp_dir().join(format!(
            "cornerstone_api_{}_{}",
            name,
            std::process::id()
        ));
        let mut config = Config::default();
        config.uploads.directory = Some(upload_dir.clone());
        config.uploads.max_upload_bytes = 1024;
        configure(&mut config);

        let storage = Storage::open_in_memory().unwrap();
        storage
            .save(&SiteSettings {
                contact_email: "hello@example.com".to_string(),
                admin_passcode: PASSCODE.to_string(),
                ..SiteSettings::default()
            })
            .unwrap();

        Self {
            state: AppState::new(storage, config).unwrap(),
            upload_dir,
        }
    }

    fn app(&self) -> Router {
        router(self.state.clone()).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(&self) -> String {
        let (status, body) = self
            .json(post_json("/api/admin/login", &json!({ "passcode": PASSCODE })))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.upload_dir).ok();
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Option<&Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn multipart(uri: &str, token: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "cornerstone-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new("health");
    let (status, body) = app.json(get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_page_is_404_with_json_error() {
    let app = TestApp::new("missing");
    let (status, body) = app.json(get("/api/pages/about")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "pages/about not found");
}

#[tokio::test]
async fn test_login_rejects_wrong_passcode() {
    let app = TestApp::new("login_wrong");
    for wrong in ["", "summit2026!", "Summit2026! "] {
        let (status, body) = app
            .json(post_json("/api/admin/login", &json!({ "passcode": wrong })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "accepted {wrong:?}");
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_admin_routes_require_a_session() {
    let app = TestApp::new("admin_gate");
    let (status, _) = app.json(get("/api/admin/settings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(authed("GET", "/api/admin/settings", "forged", None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login().await;
    let (status, body) = app
        .json(authed("GET", "/api/admin/settings", &token, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["adminPasscode"], PASSCODE);
}

#[tokio::test]
async fn test_logout_revokes_the_token() {
    let app = TestApp::new("logout");
    let token = app.login().await;

    let (status, _) = app
        .send(authed("POST", "/api/admin/logout", &token, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .json(authed("GET", "/api/admin/pages", &token, None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_settings_hide_the_passcode() {
    let app = TestApp::new("public_settings");
    let (status, body) = app.json(get("/api/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["contactEmail"], "hello@example.com");
    assert!(body.get("adminPasscode").is_none());
}

#[tokio::test]
async fn test_put_then_get_page() {
    let app = TestApp::new("put_page");
    let token = app.login().await;

    let page = json!({
        "headline": "Lead with clarity",
        "body": ["We coach leaders."],
        "cta": { "label": "Book a call", "href": "/contact" }
    });
    let (status, body) = app
        .json(authed("PUT", "/api/admin/pages/home", &token, Some(&page)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "home");

    let (status, body) = app.json(get("/api/pages/home")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "home");
    assert_eq!(body["headline"], "Lead with clarity");
    assert_eq!(body["cta"]["href"], "/contact");

    let (status, _) = app
        .send(authed("DELETE", "/api/admin/pages/home", &token, None))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.json(get("/api/pages/home")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_with_mismatched_id_is_rejected() {
    let app = TestApp::new("mismatch");
    let token = app.login().await;

    let page = json!({ "id": "about", "headline": "About us" });
    let (status, body) = app
        .json(authed("PUT", "/api/admin/pages/home", &token, Some(&page)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not match"));

    let (status, _) = app.json(get("/api/pages/home")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_document_is_not_written() {
    let app = TestApp::new("invalid");
    let token = app.login().await;

    let program = json!({ "title": "", "summary": "Missing title" });
    let (status, body) = app
        .json(authed(
            "PUT",
            "/api/admin/programs/coaching",
            &token,
            Some(&program),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("title"));

    let (_, body) = app
        .json(authed("GET", "/api/admin/programs", &token, None))
        .await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_unpublished_programs_are_hidden_from_public() {
    let app = TestApp::new("programs");
    let token = app.login().await;

    for (id, order, published) in [("workshop", 2, true), ("coaching", 1, true), ("draft", 0, false)]
    {
        let program = json!({
            "title": id,
            "summary": "A program",
            "order": order,
            "published": published
        });
        let uri = format!("/api/admin/programs/{id}");
        let (status, _) = app
            .json(authed("PUT", &uri, &token, Some(&program)))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app.json(get("/api/programs")).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["coaching", "workshop"]);

    let (status, _) = app.json(get("/api/programs/draft")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = app
        .json(authed("GET", "/api/admin/programs", &token, None))
        .await;
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_events_are_ordered_and_filtered() {
    let app = TestApp::new("events");
    let token = app.login().await;

    let events = [
        ("past", "2000-01-01", None),
        ("later", "2999-06-01", Some("13:00")),
        ("sooner", "2999-06-01", Some("09:00")),
    ];
    for (id, date, start) in events {
        let mut event = json!({ "title": id, "date": date, "status": "limited" });
        if let Some(start) = start {
            event["startTime"] = json!(start);
        }
        let uri = format!("/api/admin/events/{id}");
        let (status, _) = app.json(authed("PUT", &uri, &token, Some(&event))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = app.json(get("/api/events")).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["past", "sooner", "later"]);

    let (_, body) = app.json(get("/api/events?upcoming=true")).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let bad = json!({ "title": "x", "date": "2999-01-01", "status": "sold_out" });
    let (status, _) = app
        .json(authed("PUT", "/api/admin/events/bad", &token, Some(&bad)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_event_times_must_be_zero_padded_and_sort_as_times() {
    let app = TestApp::new("event_times");
    let token = app.login().await;

    let unpadded = json!({ "title": "Breakfast", "date": "2030-01-01", "startTime": "9:00" });
    let (status, body) = app
        .json(authed("PUT", "/api/admin/events/breakfast", &token, Some(&unpadded)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("startTime"));

    for (id, start) in [("late", "10:00"), ("early", "09:00")] {
        let event = json!({ "title": id, "date": "2030-01-01", "startTime": start });
        let uri = format!("/api/admin/events/{id}");
        let (status, _) = app.json(authed("PUT", &uri, &token, Some(&event))).await;
        assert_eq!(status, StatusCode::OK);
    }

    // Written directly, as an older release could have stored it
    let legacy = json!({
        "id": "legacy",
        "title": "Legacy",
        "date": "2030-01-01",
        "startTime": "9:30"
    });
    app.state
        .storage()
        .unwrap()
        .put_document(Collection::Events, "legacy", &legacy)
        .unwrap();

    let (_, body) = app.json(get("/api/events")).await;
    let starts: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["startTime"].as_str().unwrap())
        .collect();
    assert_eq!(starts, vec!["09:00", "9:30", "10:00"]);
}

#[tokio::test]
async fn test_settings_put_keeps_passcode_when_blank() {
    let app = TestApp::new("settings_put");
    let token = app.login().await;

    let settings = json!({ "contactEmail": "new@example.com", "phone": "555-0100" });
    let (status, _) = app
        .json(authed("PUT", "/api/admin/settings", &token, Some(&settings)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let stored = app
        .state
        .storage()
        .unwrap()
        .load::<SiteSettings>(SETTINGS_ID)
        .unwrap()
        .unwrap();
    assert_eq!(stored.contact_email, "new@example.com");
    assert_eq!(stored.admin_passcode, PASSCODE);
}

#[tokio::test]
async fn test_track_then_analytics() {
    let app = TestApp::new("analytics");

    let visits = [
        json!({ "path": "/", "newVisitor": true, "newSession": true }),
        json!({ "path": "/programs?ref=mail", "newSession": true }),
        json!({ "path": "/programs/" }),
    ];
    for visit in &visits {
        let (status, bytes) = app.send(post_json("/api/track", visit)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(bytes.is_empty());
    }

    let token = app.login().await;
    let (status, body) = app
        .json(authed(
            "GET",
            "/api/admin/analytics?period=daily&top=1",
            &token,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "daily");
    assert_eq!(body["buckets"].as_array().unwrap().len(), 1);
    assert_eq!(body["summary"]["views"], 3);
    assert_eq!(body["summary"]["visitors"], 1);
    assert_eq!(body["summary"]["sessions"], 2);
    assert_eq!(
        body["summary"]["topPages"],
        json!([{ "path": "/programs", "views": 2 }])
    );

    let (status, body) = app
        .json(authed(
            "GET",
            "/api/admin/analytics?period=fortnightly",
            &token,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("period"));
}

#[tokio::test]
async fn test_track_caps_distinct_paths_per_day() {
    let app = TestApp::with_config("path_cap", |config| {
        config.analytics.max_paths_per_day = 3;
    });

    for i in 0..10 {
        let visit = json!({ "path": format!("/random-{i}") });
        let (status, _) = app.send(post_json("/api/track", &visit)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let stats: DailyStats = app
        .state
        .storage()
        .unwrap()
        .load(&date_key(chrono::Utc::now().date_naive()))
        .unwrap()
        .unwrap();
    assert_eq!(stats.views, 10);
    assert_eq!(stats.page_views.len(), 4);
    assert_eq!(stats.page_views.get(OTHER_PATHS), Some(&7));
}

#[tokio::test]
async fn test_analytics_chart_is_svg() {
    let app = TestApp::new("chart");
    let token = app.login().await;

    let response = app
        .app()
        .oneshot(authed("GET", "/api/admin/analytics/chart.svg", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "image/svg+xml"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let svg = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("No data"));
}

#[tokio::test]
async fn test_upload_then_serve() {
    let app = TestApp::new("upload");
    let token = app.login().await;

    let (status, body) = app
        .json(multipart(
            "/api/admin/uploads/logo",
            &token,
            "image/png",
            b"\x89PNG fake",
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target"], "logo");
    assert_eq!(body["url"], "/uploads/logo.png");
    assert_eq!(body["bytes"], 9);

    let (status, bytes) = app.send(get("/uploads/logo.png")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"\x89PNG fake");
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = TestApp::new("upload_reject");
    let token = app.login().await;

    let (status, body) = app
        .json(multipart(
            "/api/admin/uploads/brochure",
            &token,
            "image/png",
            b"png",
        ))
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["error"].as_str().is_some());

    let (status, _) = app
        .json(multipart(
            "/api/admin/uploads/hero",
            &token,
            "image/jpeg",
            &[0u8; 2048],
        ))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = app
        .json(multipart("/api/admin/uploads/hero", &token, "image/jpeg", b""))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(multipart("/api/admin/uploads/avatar", &token, "image/jpeg", b"x"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(!app.upload_dir.join("hero.jpg").exists());
}

#[tokio::test]
async fn test_gallery_sync_unconfigured_is_503() {
    let app = TestApp::new("gallery_off");
    let token = app.login().await;

    let request = json!({ "albumUrl": "https://photos.example.com/share/abc" });
    let (status, _) = app
        .json(authed(
            "POST",
            "/api/admin/gallery/sync",
            &token,
            Some(&request),
        ))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

struct FixedAlbum;

#[async_trait]
impl AlbumSource for FixedAlbum {
    async fn fetch(&self, _album_url: &str) -> Result<Vec<AlbumPhoto>> {
        Ok(vec![AlbumPhoto {
            id: "remote-1".to_string(),
            url: "https://cdn.example.com/1.jpg".to_string(),
            thumbnail_url: None,
            caption: Some("Retreat".to_string()),
            taken_at: None,
        }])
    }
}

#[tokio::test]
async fn test_gallery_sync_with_source() {
    let mut app = TestApp::new("gallery_on");
    app.state = app.state.clone().with_album_source(Arc::new(FixedAlbum));
    let token = app.login().await;

    let request = json!({ "albumUrl": "https://photos.example.com/share/abc" });
    let (status, body) = app
        .json(authed(
            "POST",
            "/api/admin/gallery/sync",
            &token,
            Some(&request),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 1);

    let (_, body) = app.json(get("/api/photos")).await;
    assert_eq!(body[0]["caption"], "Retreat");
}
