use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::{self, AppState};
use crate::middleware::{optional_auth, require_auth};
use crate::{chat, connections, feeds, health, profile, push};

/// REST surface under `/api` plus `/health`. The gateway upgrade route is
/// mounted by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let optional_routes = Router::new()
        .route("/profile/{user_id}", get(profile::get_profile))
        .route("/connection/users", get(connections::list_users))
        .route("/connection/recommendations", get(connections::recommendations))
        .route("/connection/{user_id}/connections", get(connections::connections))
        .route("/connection-degree/{user_id}", get(connections::degree))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/profile/{user_id}", put(profile::update_profile))
        .route("/connection/{user_id}/request", post(connections::send_request))
        .route("/connection/requests", get(connections::pending_requests))
        .route("/connection/{user_id}/respond", post(connections::respond))
        .route("/connection/{user_id}", delete(connections::remove_connection))
        .route("/feed", get(feeds::list_feeds).post(feeds::create_feed))
        .route(
            "/feed/{feed_id}",
            get(feeds::get_feed).put(feeds::update_feed).delete(feeds::delete_feed),
        )
        .route("/chat/recents", get(chat::recent_chats))
        .route("/chat/{to_id}", get(chat::history).post(chat::send_chat))
        .route(
            "/push/subscription",
            post(push::save_subscription).delete(push::delete_subscription),
        )
        .route("/push/send-notification", post(push::send_notification))
        .route(
            "/push/send-notification-to-users",
            post(push::send_notification_to_users),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest(
            "/api",
            public_routes.merge(optional_routes).merge(protected_routes),
        )
        .route("/health", get(health::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use std::sync::Mutex;

    use futures_util::future::BoxFuture;
    use weave_db::Database;
    use weave_gateway::Hub;
    use weave_push::{LogSender, PushError, PushSender, SharedSender};
    use weave_types::events::GatewayEvent;
    use weave_types::models::{PushPayload, PushSubscription};

    use super::*;
    use crate::auth::AppStateInner;

    /// Keeps every delivery as `(user_id, payload)`.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(i64, PushPayload)>>,
    }

    impl PushSender for RecordingSender {
        fn send<'a>(
            &'a self,
            subscription: &'a PushSubscription,
            payload: &'a PushPayload,
        ) -> BoxFuture<'a, Result<(), PushError>> {
            Box::pin(async move {
                self.sent
                    .lock()
                    .unwrap()
                    .push((subscription.user_id, payload.clone()));
                Ok(())
            })
        }
    }

    fn test_state() -> AppState {
        test_state_with(Arc::new(LogSender))
    }

    fn test_state_with(push: SharedSender) -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Arc::new(AppStateInner {
            hub: Hub::new(db, push),
            jwt_secret: "test-secret".into(),
            token_ttl_secs: 3600,
            default_photo: "/static/default-profile.png".into(),
        })
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Registers `name` and returns (user_id, token).
    async fn register(app: &Router, name: &str) -> (i64, String) {
        let (status, body) = call(
            app,
            "POST",
            "/api/register",
            None,
            Some(json!({
                "username": name,
                "name": format!("{} Tester", name),
                "email": format!("{}@example.com", name),
                "password": "secret1",
                "confirm_password": "secret1",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["body"]["user_id"].as_i64().unwrap(),
            body["body"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn connect(app: &Router, a: (i64, &str), b: (i64, &str)) {
        let (status, _) = call(
            app,
            "POST",
            &format!("/api/connection/{}/request", b.0),
            Some(a.1),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(
            app,
            "POST",
            &format!("/api/connection/{}/respond", a.0),
            Some(b.1),
            Some(json!({"action": "accept"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn health_reports_success() {
        let app = router(test_state());
        let (status, body) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Health check success");
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let app = router(test_state());
        register(&app, "alice").await;

        let base = json!({
            "username": "alice2",
            "name": "Alice",
            "email": "alice@example.com",
            "password": "secret1",
            "confirm_password": "secret1",
        });

        let (status, body) = call(&app, "POST", "/api/register", None, Some(base.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Email already in use");

        let mut taken = base.clone();
        taken["email"] = json!("other@example.com");
        taken["username"] = json!("alice");
        let (status, body) = call(&app, "POST", "/api/register", None, Some(taken)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Username already in use");

        let mut mismatch = base.clone();
        mismatch["confirm_password"] = json!("other");
        let (status, body) = call(&app, "POST", "/api/register", None, Some(mismatch)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Passwords do not match");

        let mut short = base.clone();
        short["email"] = json!("new@example.com");
        short["password"] = json!("abc");
        short["confirm_password"] = json!("abc");
        let (status, _) = call(&app, "POST", "/api/register", None, Some(short)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut bad_email = base;
        bad_email["email"] = json!("not-an-email");
        let (status, _) = call(&app, "POST", "/api/register", None, Some(bad_email)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_accepts_email_or_username() {
        let app = router(test_state());
        let (id, _) = register(&app, "alice").await;

        for identifier in ["alice@example.com", "alice"] {
            let (status, body) = call(
                &app,
                "POST",
                "/api/login",
                None,
                Some(json!({"identifier": identifier, "password": "secret1"})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["body"]["user_id"], id);
        }

        let (status, _) = call(
            &app,
            "POST",
            "/api/login",
            None,
            Some(json!({"identifier": "alice", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_via_header_or_cookie() {
        let app = router(test_state());

        let (status, body) = call(&app, "GET", "/api/feed", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (_, token) = register(&app, "alice").await;
        let (status, _) = call(&app, "GET", "/api/feed", Some("not-a-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/api/feed")
            .header(header::COOKIE, format!("token={}", token))
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn register_sets_token_cookie() {
        let app = router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "username": "alice",
                    "name": "Alice",
                    "email": "alice@example.com",
                    "password": "secret1",
                    "confirm_password": "secret1",
                })
                .to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert!(cookie.starts_with("token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[tokio::test]
    async fn malformed_input_gets_error_envelope() {
        let app = router(test_state());
        let (_, token) = register(&app, "alice").await;

        let requests = [
            ("POST", "/api/feed", Some(json!({"text": "hi"}).to_string())),
            ("POST", "/api/feed", Some("{not json".to_string())),
            ("GET", "/api/feed?limit=lots", None),
            ("GET", "/api/chat/abc", None),
        ];
        for (method, uri, body) in requests {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.map(Body::from).unwrap_or_else(Body::empty))
                .unwrap();
            let resp = app.clone().oneshot(req).await.unwrap();

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
            let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
            assert!(content_type.starts_with("application/json"), "{}", content_type);
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Bad Request");
            assert!(!body["message"].as_str().unwrap().is_empty());
        }

        let (status, body) = call(&app, "GET", "/api/profile/abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn connection_lifecycle() {
        let app = router(test_state());
        let (a, ta) = register(&app, "alice").await;
        let (b, tb) = register(&app, "bob").await;
        let (c, tc) = register(&app, "carol").await;

        let (status, _) = call(&app, "POST", &format!("/api/connection/{}/request", a), Some(ta.as_str()), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/api/connection/9999/request", Some(ta.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        call(&app, "POST", &format!("/api/connection/{}/request", b), Some(ta.as_str()), None).await;
        let (status, body) = call(&app, "POST", &format!("/api/connection/{}/request", a), Some(tb.as_str()), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Connection request already sent");

        let (_, body) = call(&app, "GET", "/api/connection/requests", Some(tb.as_str()), None).await;
        assert_eq!(body["body"].as_array().unwrap().len(), 1);
        assert_eq!(body["body"][0]["from_user"]["id"], a);

        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/connection/{}/respond", a),
            Some(tb.as_str()),
            Some(json!({"action": "maybe"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/connection/{}/respond", a),
            Some(tb.as_str()),
            Some(json!({"action": "accept"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "POST", &format!("/api/connection/{}/request", a), Some(tb.as_str()), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Connection already exists");

        connect(&app, (b, tb.as_str()), (c, tc.as_str())).await;

        let (_, body) = call(&app, "GET", &format!("/api/connection-degree/{}", c), Some(ta.as_str()), None).await;
        assert_eq!(body["body"]["degree"], "2nd");
        let (_, body) = call(&app, "GET", &format!("/api/connection-degree/{}", c), None, None).await;
        assert_eq!(body["body"]["degree"], "");

        let (_, body) = call(&app, "GET", &format!("/api/connection/{}/connections", b), Some(ta.as_str()), None).await;
        let entries = body["body"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        let carol = entries.iter().find(|e| e["id"] == c).unwrap();
        assert_eq!(carol["is_second_degree"], true);
        let alice = entries.iter().find(|e| e["id"] == a).unwrap();
        assert_eq!(alice["is_owner"], true);

        let (status, _) = call(&app, "DELETE", &format!("/api/connection/{}", c), Some(ta.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", &format!("/api/connection/{}", b), Some(ta.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = call(&app, "GET", &format!("/api/connection-degree/{}", b), Some(ta.as_str()), None).await;
        assert_eq!(body["body"]["degree"], "");
    }

    #[tokio::test]
    async fn user_search_and_recommendations() {
        let app = router(test_state());
        let (a, ta) = register(&app, "alice").await;
        let (b, _) = register(&app, "bob").await;
        register(&app, "carol").await;

        let (_, body) = call(&app, "GET", "/api/connection/users?search=BOB", None, None).await;
        let users = body["body"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["id"], b);
        assert_eq!(users[0]["is_connected"], false);
        assert!(users[0].get("is_owner").is_none());

        let (_, body) = call(
            &app,
            "GET",
            &format!("/api/connection/recommendations?target_id={}", b),
            Some(ta.as_str()),
            None,
        )
        .await;
        let ids: Vec<i64> = body["body"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert!(!ids.contains(&a));
        assert!(!ids.contains(&b));
        assert_eq!(ids.len(), 1);

        let (_, body) = call(&app, "GET", "/api/connection/users?take=1", None, None).await;
        assert_eq!(body["body"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn profile_views_depend_on_viewer() {
        let app = router(test_state());
        let (a, ta) = register(&app, "alice").await;
        let (b, tb) = register(&app, "bob").await;
        let (_, tc) = register(&app, "carol").await;
        connect(&app, (a, ta.as_str()), (b, tb.as_str())).await;
        call(&app, "POST", "/api/feed", Some(tb.as_str()), Some(json!({"content": "hello"}))).await;

        let uri = format!("/api/profile/{}", b);

        let (_, body) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(body["body"]["connection_count"], 1);
        assert!(body["body"].get("relevant_posts").is_none());

        let (_, body) = call(&app, "GET", &uri, Some(tb.as_str()), None).await;
        assert_eq!(body["body"]["is_owner"], true);
        assert_eq!(body["body"]["relevant_posts"], json!(["hello"]));

        let (_, body) = call(&app, "GET", &uri, Some(ta.as_str()), None).await;
        assert_eq!(body["body"]["is_connected"], true);
        assert_eq!(body["body"]["relevant_posts"], json!(["hello"]));

        call(&app, "POST", &format!("/api/connection/{}/request", b), Some(tc.as_str()), None).await;
        let (_, body) = call(&app, "GET", &uri, Some(tc.as_str()), None).await;
        assert_eq!(body["body"]["is_connected"], false);
        assert_eq!(body["body"]["connection_status"], "sent");
        assert!(body["body"].get("relevant_posts").is_none());

        let (status, _) = call(&app, "GET", "/api/profile/9999", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn profile_update_is_owner_only() {
        let app = router(test_state());
        let (a, ta) = register(&app, "alice").await;
        let (_, tb) = register(&app, "bob").await;
        let uri = format!("/api/profile/{}", a);

        let (status, _) = call(&app, "PUT", &uri, Some(tb.as_str()), Some(json!({"skills": "Rust"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "PUT", &uri, Some(ta.as_str()), Some(json!({"username": "bob"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = call(&app, "PUT", &uri, Some(ta.as_str()), Some(json!({"username": "al"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Username must be 3 to 32 characters");

        let (status, body) = call(
            &app,
            "PUT",
            &uri,
            Some(ta.as_str()),
            Some(json!({"skills": "Rust", "name": "Alice L."})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["body"]["skills"], "Rust");
        assert_eq!(body["body"]["full_name"], "Alice L.");
        assert_eq!(body["body"]["username"], "alice");
    }

    #[tokio::test]
    async fn new_post_pushes_to_connections() {
        let recorder = Arc::new(RecordingSender::default());
        let state = test_state_with(recorder.clone());
        let app = router(state.clone());
        let (a, ta) = register(&app, "alice").await;
        let (b, tb) = register(&app, "bob").await;
        let (c, _) = register(&app, "carol").await;
        connect(&app, (a, ta.as_str()), (b, tb.as_str())).await;
        for (endpoint, user) in [("https://push/bob", b), ("https://push/carol", c)] {
            state
                .hub
                .db
                .save_subscription(endpoint, user, &json!({"p256dh": "k", "auth": "x"}))
                .unwrap();
        }

        let (status, body) = call(&app, "POST", "/api/feed", Some(ta.as_str()), Some(json!({"content": "hello"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let feed_id = body["body"]["id"].as_i64().unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, payload) = &sent[0];
        assert_eq!(*to, b);
        assert_eq!(payload.title, "New Feed Posted");
        assert_eq!(payload.body, "New post by user alice Tester!");
        assert_eq!(payload.url.as_deref(), Some(format!("/feed/{}", feed_id).as_str()));
    }

    #[tokio::test]
    async fn feed_visibility_and_pagination() {
        let app = router(test_state());
        let (a, ta) = register(&app, "alice").await;
        let (b, tb) = register(&app, "bob").await;
        let (_, tc) = register(&app, "carol").await;
        connect(&app, (a, ta.as_str()), (b, tb.as_str())).await;

        let mut ids = vec![];
        for i in 0..3 {
            let (status, body) = call(
                &app,
                "POST",
                "/api/feed",
                Some(ta.as_str()),
                Some(json!({"content": format!("post {}", i)})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
            ids.push(body["body"]["id"].as_i64().unwrap());
        }

        let (status, _) = call(&app, "POST", "/api/feed", Some(ta.as_str()), Some(json!({"content": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "GET", "/api/feed?limit=2", Some(tb.as_str()), None).await;
        let page = &body["body"];
        assert_eq!(page["feeds"].as_array().unwrap().len(), 2);
        assert_eq!(page["feeds"][0]["id"], ids[2]);
        assert_eq!(page["cursor"], ids[1]);

        let (_, body) = call(&app, "GET", &format!("/api/feed?limit=2&cursor={}", ids[1]), Some(tb.as_str()), None).await;
        assert_eq!(body["body"]["feeds"].as_array().unwrap().len(), 1);
        assert_eq!(body["body"]["cursor"], ids[0]);

        let (_, body) = call(&app, "GET", &format!("/api/feed?cursor={}", ids[0]), Some(tb.as_str()), None).await;
        assert!(body["body"]["feeds"].as_array().unwrap().is_empty());
        assert!(body["body"]["cursor"].is_null());

        let (_, body) = call(&app, "GET", "/api/feed", Some(tc.as_str()), None).await;
        assert!(body["body"]["feeds"].as_array().unwrap().is_empty());

        let one = format!("/api/feed/{}", ids[0]);
        let (status, _) = call(&app, "GET", &one, Some(tb.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "GET", &one, Some(tc.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "PUT", &one, Some(tb.as_str()), Some(json!({"content": "mine now"}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, body) = call(&app, "PUT", &one, Some(ta.as_str()), Some(json!({"content": "edited"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["body"]["content"], "edited");

        let (status, _) = call(&app, "DELETE", &one, Some(tb.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, "DELETE", &one, Some(ta.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "GET", &one, Some(ta.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn chat_requires_connection_and_reaches_gateway() {
        let state = test_state();
        let app = router(state.clone());
        let (a, ta) = register(&app, "alice").await;
        let (b, tb) = register(&app, "bob").await;

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/chat/{}", b),
            Some(ta.as_str()),
            Some(json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Cannot send message to non-connected user");

        connect(&app, (a, ta.as_str()), (b, tb.as_str())).await;
        let (_, mut room) = state.hub.dispatcher.join(b).await;

        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/chat/{}", b),
            Some(ta.as_str()),
            Some(json!({"message": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(matches!(room.try_recv().unwrap(), GatewayEvent::ReceiveMessage(m) if m.message == "hi"));

        let (status, _) = call(
            &app,
            "POST",
            &format!("/api/chat/{}", b),
            Some(ta.as_str()),
            Some(json!({"message": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = call(&app, "GET", &format!("/api/chat/{}", a), Some(tb.as_str()), None).await;
        assert_eq!(body["body"].as_array().unwrap().len(), 1);

        let (_, body) = call(&app, "GET", "/api/chat/recents", Some(tb.as_str()), None).await;
        assert_eq!(body["body"][0]["user_id"], a);
        assert_eq!(body["body"][0]["last_message"]["message"], "hi");
    }

    #[tokio::test]
    async fn push_subscription_lifecycle() {
        let app = router(test_state());
        let (a, ta) = register(&app, "alice").await;
        let (_, tb) = register(&app, "bob").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/push/subscription",
            Some(ta.as_str()),
            Some(json!({"endpoint": "https://push/a", "keys": {"p256dh": "k", "auth": "x"}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &app,
            "POST",
            "/api/push/send-notification",
            Some(tb.as_str()),
            Some(json!({"endpoint": "https://push/a", "data": {"title": "t", "body": "b"}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["body"]["success"], true);

        let (_, body) = call(
            &app,
            "POST",
            "/api/push/send-notification-to-users",
            Some(tb.as_str()),
            Some(json!({"user_ids": [a], "data": {"title": "t", "body": "b"}})),
        )
        .await;
        assert_eq!(body["body"].as_array().unwrap().len(), 1);

        let (status, _) = call(
            &app,
            "DELETE",
            "/api/push/subscription",
            Some(tb.as_str()),
            Some(json!({"endpoint": "https://push/a"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(
            &app,
            "DELETE",
            "/api/push/subscription",
            Some(ta.as_str()),
            Some(json!({"endpoint": "https://push/a"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(
            &app,
            "POST",
            "/api/push/send-notification",
            Some(tb.as_str()),
            Some(json!({"endpoint": "https://push/a", "data": {"title": "t", "body": "b"}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
