use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{Deployment, routes};

pub mod auth;

pub fn router(deployment: Deployment) -> Router {
    let protected_routes = Router::new()
        .merge(routes::accounts::router())
        .merge(routes::projects::router())
        .merge(routes::contributors::router())
        .merge(routes::issues::router())
        .merge(routes::comments::router())
        .route_layer(from_fn_with_state(deployment.clone(), auth::require_auth));

    let api_routes = Router::new()
        .merge(routes::accounts::public_router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use chrono::{Datelike, NaiveDate, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::test_support::in_memory_deployment;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn birth_date_for_age(years: i32) -> String {
        let today = Utc::now().date_naive();
        NaiveDate::from_ymd_opt(today.year() - years, today.month(), today.day())
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(today.year() - years, 2, 28).unwrap())
            .to_string()
    }

    async fn register(app: &Router, username: &str, age: i32) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct-horse",
                "password_confirm": "correct-horse",
                "birth_date": birth_date_for_age(age),
                "can_be_contacted": true,
                "can_data_be_shared": false,
            })),
        )
        .await
    }

    /// Registers and logs in, returning `(user_id, access_token)`.
    async fn sign_up(app: &Router, username: &str, age: i32) -> (String, String) {
        let (status, json) = register(app, username, age).await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        let user_id = json["data"]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": username, "password": "correct-horse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{json}");
        let access = json["data"]["access"].as_str().unwrap().to_string();
        (user_id, access)
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = super::router(in_memory_deployment().await);
        let (status, json) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
    }

    #[tokio::test]
    async fn api_requires_a_bearer_token() {
        let app = super::router(in_memory_deployment().await);

        let (status, json) = send(&app, Method::GET, "/api/projects", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);

        let (status, _) = send(&app, Method::GET, "/api/projects", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let app = super::router(in_memory_deployment().await);
        register(&app, "ada", 30).await;
        let (_, json) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ada", "password": "correct-horse" })),
        )
        .await;
        let refresh = json["data"]["refresh"].as_str().unwrap().to_string();

        let (status, _) = send(&app, Method::GET, "/api/profile", Some(&refresh), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = json["data"]["access"].as_str().unwrap();
        let (status, json) = send(&app, Method::GET, "/api/profile", Some(access), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["username"], "ada");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = super::router(in_memory_deployment().await);
        register(&app, "ada", 30).await;
        let (status, json) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "ada", "password": "not-the-one" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn registration_rejects_minors_with_field_errors() {
        let app = super::router(in_memory_deployment().await);

        let (status, json) = register(&app, "young", 14).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error_data"]["birth_date"].is_array());

        let (status, json) = register(&app, "fifteen", 15).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["age"], 15);
        assert_eq!(json["data"]["can_be_contacted"], true);
        assert!(json["data"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn malformed_body_is_a_bad_request() {
        let app = super::router(in_memory_deployment().await);
        let (_, token) = sign_up(&app, "ada", 30).await;

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/projects",
            Some(&token),
            Some(json!({ "name": "Tracker", "type": "MAINFRAME" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn account_deletion_requires_confirmation() {
        let app = super::router(in_memory_deployment().await);
        let (_, token) = sign_up(&app, "ada", 30).await;

        let (status, json) = send(
            &app,
            Method::DELETE,
            "/api/delete-account",
            Some(&token),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error_data"]["confirm_deletion"].is_array());

        let (status, json) =
            send(&app, Method::DELETE, "/api/delete-account", Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error_data"]["confirm_deletion"].is_array());

        let (status, _) = send(&app, Method::GET, "/api/profile", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn profile_update_keeps_the_age_floor() {
        let app = super::router(in_memory_deployment().await);
        let (_, token) = sign_up(&app, "ada", 30).await;

        let (status, json) = send(
            &app,
            Method::PUT,
            "/api/profile",
            Some(&token),
            Some(json!({ "birth_date": birth_date_for_age(10) })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error_data"]["birth_date"].is_array());

        let (status, json) = send(
            &app,
            Method::PUT,
            "/api/profile",
            Some(&token),
            Some(json!({ "can_data_be_shared": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["can_data_be_shared"], true);
        assert_eq!(json["data"]["age"], 30);
    }

    #[tokio::test]
    async fn issue_and_comment_lifecycle_end_to_end() {
        let app = super::router(in_memory_deployment().await);
        let (_, ada) = sign_up(&app, "ada", 20).await;
        let (bob_id, bob) = sign_up(&app, "bob", 25).await;

        let (status, json) = send(
            &app,
            Method::POST,
            "/api/projects",
            Some(&ada),
            Some(json!({ "name": "Tracker", "type": "BACKEND" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["data"]["contributors_count"], 1);
        let project_id = json["data"]["id"].as_str().unwrap().to_string();
        let project_uri = format!("/api/projects/{project_id}");

        let (status, json) = send(
            &app,
            Method::GET,
            &format!("{project_uri}/contributors"),
            Some(&ada),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let contributors = json["data"].as_array().unwrap();
        assert_eq!(contributors.len(), 1);
        assert_eq!(contributors[0]["user"]["username"], "ada");

        let (status, json) = send(
            &app,
            Method::POST,
            &format!("{project_uri}/issues"),
            Some(&ada),
            Some(json!({ "name": "Crash on save", "tag": "BUG" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["data"]["status"], "TO_DO");
        assert_eq!(json["data"]["assignee_id"], Value::Null);
        assert_eq!(json["data"]["project_name"], "Tracker");
        let issue_id = json["data"]["id"].as_str().unwrap().to_string();
        let issue_uri = format!("{project_uri}/issues/{issue_id}");

        let (status, json) = send(
            &app,
            Method::PUT,
            &issue_uri,
            Some(&bob),
            Some(json!({ "status": "FINISHED" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_data"]["reason"], "NOT_CONTRIBUTOR");

        let (status, json) = send(
            &app,
            Method::PUT,
            &issue_uri,
            Some(&ada),
            Some(json!({ "status": "IN_PROGRESS" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "IN_PROGRESS");

        let (status, json) = send(
            &app,
            Method::POST,
            &format!("{project_uri}/contributors"),
            Some(&ada),
            Some(json!({ "user_id": bob_id })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");

        let (status, json) = send(
            &app,
            Method::POST,
            &format!("{project_uri}/contributors"),
            Some(&ada),
            Some(json!({ "user_id": bob_id })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error_data"]["user_id"].is_array());

        let (status, json) = send(&app, Method::GET, &issue_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "IN_PROGRESS");

        let (status, json) = send(
            &app,
            Method::POST,
            &format!("{issue_uri}/comments"),
            Some(&bob),
            Some(json!({ "description": "Reproduced on main" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        assert_eq!(json["data"]["issue_name"], "Crash on save");
        let comment_uri = format!(
            "{issue_uri}/comments/{}",
            json["data"]["id"].as_str().unwrap()
        );

        let (status, json) = send(&app, Method::DELETE, &issue_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_data"]["reason"], "NOT_RESOURCE_AUTHOR");

        let (status, json) = send(&app, Method::GET, &project_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["contributors_count"], 2);

        let (status, _) = send(
            &app,
            Method::DELETE,
            "/api/delete-account",
            Some(&ada),
            Some(json!({ "confirm_deletion": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/api/profile", Some(&ada), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, Method::GET, &project_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, &issue_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, Method::GET, &comment_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(&app, Method::GET, "/api/projects", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"].as_array().unwrap().is_empty());

        let (status, json) = send(&app, Method::GET, "/api/profile", Some(&bob), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["username"], "bob");
    }

    #[tokio::test]
    async fn project_author_cannot_be_removed_over_http() {
        let app = super::router(in_memory_deployment().await);
        let (_, ada) = sign_up(&app, "ada", 30).await;

        let (_, json) = send(
            &app,
            Method::POST,
            "/api/projects",
            Some(&ada),
            Some(json!({ "name": "Tracker", "type": "IOS" })),
        )
        .await;
        let project_uri = format!("/api/projects/{}", json["data"]["id"].as_str().unwrap());

        let (_, json) = send(
            &app,
            Method::GET,
            &format!("{project_uri}/contributors"),
            Some(&ada),
            None,
        )
        .await;
        let link_id = json["data"][0]["id"].as_str().unwrap().to_string();

        let (status, json) = send(
            &app,
            Method::DELETE,
            &format!("{project_uri}/contributors/{link_id}"),
            Some(&ada),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_data"]["reason"], "PROJECT_AUTHOR_REMOVAL");
    }

    #[tokio::test]
    async fn unparsable_resource_id_answers_with_the_error_envelope() {
        let app = super::router(in_memory_deployment().await);
        let (_, token) = sign_up(&app, "ada", 30).await;

        let (status, json) =
            send(&app, Method::GET, "/api/projects/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert!(json["message"].is_string());

        let (status, json) = send(
            &app,
            Method::GET,
            "/api/projects/not-a-uuid/issues/also-not-a-uuid/comments",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
    }
}
