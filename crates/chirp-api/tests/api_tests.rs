//! HTTP-level tests driving the full router in-process.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use chirp_api::auth::AppStateInner;
use chirp_api::routes;
use chirp_api::token::TokenCodec;
use chirp_db::Database;
use chirp_types::api::TokenRole;

const POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";
const JWT_SECRET: &[u8] = b"api-test-secret";

struct TestApp {
    dir: TempDir,
    router: Router,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("database.json")).unwrap();
    let state = Arc::new(AppStateInner::new(db, JWT_SECRET, POLKA_KEY.into()));
    let router = routes::router(state, dir.path());
    TestApp { dir, router }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        let request = match body {
            Some(json_body) => builder
                .body(Body::from(serde_json::to_string(&json_body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn register(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/users",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    async fn login(&self, email: &str, password: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/api/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

fn bearer(token: &Value) -> String {
    format!("Bearer {}", token.as_str().unwrap())
}

#[tokio::test]
async fn test_register_login_and_post() {
    let app = test_app();

    let alice = app.register("alice@example.com", "123456").await;
    assert_eq!(alice, json!({ "id": 1, "email": "alice@example.com", "is_privileged": false }));

    let session = app.login("alice@example.com", "123456").await;
    assert_eq!(session["id"], 1);
    assert!(session["token"].is_string());
    assert!(session["refresh_token"].is_string());

    let (status, post) = app
        .send(
            "POST",
            "/api/posts",
            Some(bearer(&session["token"]).as_str()),
            Some(json!({ "body": "hello world" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post, json!({ "id": 1, "author_id": 1, "body": "hello world" }));

    let (status, fetched) = app.send("GET", "/api/posts/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, post);

    let (status, _) = app.send("GET", "/api/posts/2", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = test_app();
    app.register("alice@example.com", "123456").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "654321" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_post_body_rules() {
    let app = test_app();
    app.register("alice@example.com", "pw").await;
    let session = app.login("alice@example.com", "pw").await;
    let auth = bearer(&session["token"]);

    let (status, post) = app
        .send(
            "POST",
            "/api/posts",
            Some(auth.as_str()),
            Some(json!({ "body": "you are a kerfuffle" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(post["body"], "you are a ****");

    let (status, body) = app
        .send("POST", "/api/posts", Some(auth.as_str()), Some(json!({ "body": "a".repeat(141) })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app
        .send("POST", "/api/posts", Some(auth.as_str()), Some(json!({ "body": "a".repeat(140) })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_posting_requires_access_token() {
    let app = test_app();
    app.register("alice@example.com", "pw").await;
    let session = app.login("alice@example.com", "pw").await;

    let (status, _) = app
        .send("POST", "/api/posts", None, Some(json!({ "body": "hi" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "POST",
            "/api/posts",
            Some(bearer(&session["refresh_token"]).as_str()),
            Some(json!({ "body": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, posts) = app.send("GET", "/api/posts", None, None).await;
    assert_eq!(posts, json!([]));
}

#[tokio::test]
async fn test_token_for_unknown_user_cannot_post() {
    let app = test_app();
    // Signed with the server secret, but no user 42 was ever registered.
    let token = TokenCodec::new(JWT_SECRET).issue(42, TokenRole::Access).unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/posts",
            Some(format!("Bearer {token}").as_str()),
            Some(json!({ "body": "orphan" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, posts) = app.send("GET", "/api/posts", None, None).await;
    assert_eq!(posts, json!([]));
}

#[tokio::test]
async fn test_only_author_can_delete() {
    let app = test_app();
    app.register("a@example.com", "pw-a").await;
    app.register("b@example.com", "pw-b").await;
    let a = bearer(&app.login("a@example.com", "pw-a").await["token"]);
    let b = bearer(&app.login("b@example.com", "pw-b").await["token"]);

    let (_, post) = app
        .send("POST", "/api/posts", Some(a.as_str()), Some(json!({ "body": "from a" })))
        .await;
    let uri = format!("/api/posts/{}", post["id"]);

    let (status, _) = app.send("DELETE", &uri, Some(b.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &uri, Some(a.as_str()), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, posts) = app.send("GET", "/api/posts", None, None).await;
    assert_eq!(posts, json!([]));
}

#[tokio::test]
async fn test_list_posts_by_author_and_order() {
    let app = test_app();
    app.register("a@example.com", "pw").await;
    app.register("b@example.com", "pw").await;
    let a = bearer(&app.login("a@example.com", "pw").await["token"]);
    let b = bearer(&app.login("b@example.com", "pw").await["token"]);

    for (auth, body) in [(&a, "a1"), (&b, "b1"), (&a, "a2")] {
        let (status, _) = app
            .send("POST", "/api/posts", Some(auth.as_str()), Some(json!({ "body": body })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, posts) = app.send("GET", "/api/posts?sort=desc", None, None).await;
    let ids: Vec<_> = posts.as_array().unwrap().iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![json!(3), json!(2), json!(1)]);

    let (_, posts) = app.send("GET", "/api/posts?author_id=1", None, None).await;
    let bodies: Vec<_> = posts.as_array().unwrap().iter().map(|p| p["body"].clone()).collect();
    assert_eq!(bodies, vec![json!("a1"), json!("a2")]);
}

#[tokio::test]
async fn test_refresh_and_revoke() {
    let app = test_app();
    app.register("alice@example.com", "pw").await;
    let session = app.login("alice@example.com", "pw").await;
    let refresh = bearer(&session["refresh_token"]);

    let (status, body) = app.send("POST", "/api/refresh", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    // The minted access token works.
    let (status, _) = app
        .send(
            "POST",
            "/api/posts",
            Some(bearer(&body["token"]).as_str()),
            Some(json!({ "body": "refreshed" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.send("POST", "/api/revoke", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("POST", "/api/revoke", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("POST", "/api/refresh", Some(refresh.as_str()), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Garbage and missing headers are still "revoked" successfully.
    let (status, _) = app.send("POST", "/api/revoke", Some("Bearer junk"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send("POST", "/api/revoke", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_profile() {
    let app = test_app();
    app.register("old@example.com", "old").await;
    let session = app.login("old@example.com", "old").await;

    let (status, user) = app
        .send(
            "PUT",
            "/api/users",
            Some(bearer(&session["token"]).as_str()),
            Some(json!({ "email": "new@example.com", "password": "new" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user, json!({ "id": 1, "email": "new@example.com", "is_privileged": false }));

    app.login("new@example.com", "new").await;

    let (status, _) = app
        .send(
            "PUT",
            "/api/users",
            Some(bearer(&session["refresh_token"]).as_str()),
            Some(json!({ "email": "x@example.com", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_upgrade_webhook() {
    let app = test_app();
    app.register("alice@example.com", "pw").await;
    let key = format!("ApiKey {POLKA_KEY}");
    let upgrade = json!({ "event": "user.upgraded", "data": { "user_id": 1 } });

    let (status, _) = app
        .send("POST", "/api/polka/webhooks", Some("ApiKey wrong"), Some(upgrade.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "POST",
            "/api/polka/webhooks",
            Some(key.as_str()),
            Some(json!({ "event": "user.payment_failed", "data": { "user_id": 1 } })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.login("alice@example.com", "pw").await["is_privileged"], false);

    let (status, _) = app
        .send("POST", "/api/polka/webhooks", Some(key.as_str()), Some(upgrade))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.login("alice@example.com", "pw").await["is_privileged"], true);

    let (status, _) = app
        .send(
            "POST",
            "/api/polka/webhooks",
            Some(key.as_str()),
            Some(json!({ "event": "user.upgraded", "data": { "user_id": 99 } })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_hits_and_admin_metrics() {
    let app = test_app();
    std::fs::write(app.dir.path().join("index.html"), "<h1>chirp</h1>").unwrap();

    let (status, _) = app.send("GET", "/api/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);

    for _ in 0..2 {
        let (status, _) = app.send("GET", "/app/index.html", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, page) = app.send("GET", "/admin/metrics", None, None).await;
    assert!(page.as_str().unwrap().contains("visited 2 times"));

    let (status, _) = app.send("GET", "/api/reset", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = app.send("GET", "/admin/metrics", None, None).await;
    assert!(page.as_str().unwrap().contains("visited 0 times"));
}

#[tokio::test]
async fn test_index_page() {
    let app = test_app();

    let (status, page) = app.send("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.as_str().unwrap().contains("Welcome to Chirp"));

    // The landing page is not a static file hit.
    let (_, page) = app.send("GET", "/admin/metrics", None, None).await;
    assert!(page.as_str().unwrap().contains("visited 0 times"));
}
