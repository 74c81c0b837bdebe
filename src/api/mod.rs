// API module - HTTP endpoints

use axum::{extract::DefaultBodyLimit, http::HeaderValue, Router};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub mod admin_auth;
pub mod analytics;
pub mod auth;
pub mod bookings;
pub mod catering;
pub mod courses;
pub mod equipment;
pub mod events;
pub mod health;
pub mod hero_sections;
pub mod marketplace;
pub mod media;
pub mod middleware;
pub mod plans;
pub mod uploads;
pub mod withdrawals;

use middleware::state::AppState;

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

/// Builds the full application router with its middleware stack
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    let cors = cors_layer(state.config.cors_origin.as_deref());
    let uploads_dir = ServeDir::new(state.uploads.root());

    Router::new()
        .merge(health::router())
        .merge(admin_auth::router(state.clone()))
        .merge(auth::router(state.clone()))
        .merge(courses::router())
        .merge(plans::router())
        .merge(marketplace::router())
        .merge(hero_sections::router())
        .merge(events::router())
        .merge(catering::router())
        .merge(equipment::router())
        .merge(bookings::router())
        .merge(media::router())
        .merge(analytics::router())
        .merge(withdrawals::router())
        .merge(uploads::router())
        .nest_service("/uploads", uploads_dir)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::{mailer::Mailer, token::Role};
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn state_with(config: Config) -> AppState {
        // Never connects unless a handler reaches the database
        let pool = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        AppState::new(pool, config, Mailer::memory().0).unwrap()
    }

    fn token(state: &AppState, role: Role) -> String {
        state
            .tokens
            .issue(Uuid::new_v4(), "someone@example.com", role)
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = app(state_with(Config::for_tests()));

        let response = app
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = app(state_with(Config::for_tests()));

        let response = app
            .oneshot(Request::builder().uri("/api/v1/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let app = app(state_with(Config::for_tests()));

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/withdrawals",
                Some("not-a-jwt"),
                json!({ "amount": 100, "method": "bank", "account_details": "x" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_token_cannot_reach_admin_routes() {
        let state = state_with(Config::for_tests());
        let user_token = token(&state, Role::User);
        let app = app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/withdrawals/all")
                    .header(header::AUTHORIZATION, format!("Bearer {}", user_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_token_cannot_use_user_routes() {
        let state = state_with(Config::for_tests());
        let admin_token = token(&state, Role::Admin);
        let app = app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/withdrawals")
                    .header(header::AUTHORIZATION, format!("Bearer {}", admin_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_course_create_reports_field_errors() {
        let state = state_with(Config::for_tests());
        let admin_token = token(&state, Role::Admin);
        let app = app(state);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&admin_token),
                json!({
                    "title": "",
                    "description": "Light and shadow",
                    "instructor": "Ana",
                    "price": -1,
                    "level": "expert",
                    "category": "portrait",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["field"].as_str())
            .collect();
        assert!(fields.contains(&"title"));
        assert!(fields.contains(&"price"));
        assert!(fields.contains(&"level"));
    }

    #[tokio::test]
    async fn test_withdrawal_amount_must_be_positive() {
        let state = state_with(Config::for_tests());
        let user_token = token(&state, Role::User);
        let app = app(state);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/withdrawals",
                Some(&user_token),
                json!({ "amount": 0, "method": "bank", "account_details": "NL00 BANK 0000" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_rejects_unknown_category() {
        let state = state_with(Config::for_tests());
        let user_token = token(&state, Role::User);
        let app = app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/uploads/secrets")
                    .header(header::AUTHORIZATION, format!("Bearer {}", user_token))
                    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from("--XBOUNDARY--\r\n"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited() {
        let mut config = Config::for_tests();
        config.auth_rate_limit_per_minute = 1;
        let app = app(state_with(config));

        let first = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/send-otp",
                None,
                json!({ "email": "not-an-email" }),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::BAD_REQUEST);

        let second = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/auth/send-otp",
                None,
                json!({ "email": "not-an-email" }),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_spoofed_forwarding_headers_do_not_reset_quota() {
        let mut config = Config::for_tests();
        config.auth_rate_limit_per_minute = 1;
        let app = app(state_with(config));

        let mut statuses = Vec::new();
        for i in 0..5 {
            let mut request = json_request(
                Method::POST,
                "/api/v1/auth/send-otp",
                None,
                json!({ "email": "not-an-email" }),
            );
            request.headers_mut().insert(
                "x-forwarded-for",
                HeaderValue::from_str(&format!("203.0.113.{}", i + 1)).unwrap(),
            );
            let response = app.clone().oneshot(request).await.unwrap();
            statuses.push(response.status());
        }

        assert_eq!(statuses[0], StatusCode::BAD_REQUEST);
        assert!(statuses[1..]
            .iter()
            .all(|status| *status == StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn test_trusted_proxy_keys_on_forwarded_address() {
        let mut config = Config::for_tests();
        config.auth_rate_limit_per_minute = 1;
        config.trust_proxy_headers = true;
        let app = app(state_with(config));

        for client in ["198.51.100.1", "198.51.100.2"] {
            let mut request = json_request(
                Method::POST,
                "/api/v1/auth/send-otp",
                None,
                json!({ "email": "not-an-email" }),
            );
            request
                .headers_mut()
                .insert("x-forwarded-for", HeaderValue::from_static(client));
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_course_create_returns_201() {
        let pool = crate::db::test_pool().await;
        let state = AppState::new(pool, Config::for_tests(), Mailer::memory().0).unwrap();
        let admin_token = token(&state, Role::Admin);
        let app = app(state);
        let slug = format!("golden-hour-{}", Uuid::new_v4());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/courses",
                Some(&admin_token),
                json!({
                    "title": "Golden Hour",
                    "slug": slug,
                    "description": "Shooting in warm light",
                    "instructor": "Ana",
                    "price": 4900,
                    "level": "beginner",
                    "category": "Portrait",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["slug"], slug.as_str());
        assert_eq!(body["price"], 4900);
        assert_eq!(body["is_published"], false);
    }
}
