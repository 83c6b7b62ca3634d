//! # HTTP API
//!
//! JSON REST surface under `/api`, static assets under `/static`, and the
//! single-page frontend for every other path.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Reminder completion endpoint
//! - 1.0.0: Initial creation with contacts, notes, activities, relationships

pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};
use std::path::Path;
use std::time::Instant;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
};

use crate::database::Database;
use handlers::{activities, contacts, notes, relationships, reminders, system};

pub use error::{ApiError, ApiResult};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            started_at: Instant::now(),
        }
    }
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(system::health))
        .route("/circles", get(system::list_circles))
        .route(
            "/contacts",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route(
            "/contacts/{id}",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .route(
            "/contacts/{id}/notes",
            get(notes::list_notes).post(notes::create_note),
        )
        .route(
            "/contacts/{id}/activities",
            get(activities::list_activities).post(activities::create_activity),
        )
        .route(
            "/contacts/{id}/relationships",
            get(relationships::list_relationships).post(relationships::create_relationship),
        )
        .route(
            "/contacts/{id}/reminders",
            get(reminders::list_reminders).post(reminders::create_reminder),
        )
        .route(
            "/notes/{id}",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route(
            "/activities/{id}",
            put(activities::update_activity).delete(activities::delete_activity),
        )
        .route(
            "/relationships/{id}",
            put(relationships::update_relationship).delete(relationships::delete_relationship),
        )
        .route(
            "/reminders/{id}",
            get(reminders::get_reminder)
                .put(reminders::update_reminder)
                .delete(reminders::delete_reminder),
        )
        .route("/reminders/{id}/complete", post(reminders::complete_reminder))
        .fallback(system::not_found)
}

/// Build the full application router.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let index = static_dir.join("index.html");

    Router::new()
        .nest("/api", api_routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback_service(ServeFile::new(index))
        .layer(from_fn(middleware::log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let database = Database::in_memory().await.unwrap();
        create_router(AppState::new(database), Path::new("does-not-exist"))
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn create_contact(router: &Router, body: Value) -> i64 {
        let (status, value) = send(router, Method::POST, "/api/contacts", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        value["contact"]["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_contact_lifecycle() {
        let router = test_router().await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/contacts",
            Some(json!({ "firstname": "Ada", "lastname": "Lovelace", "birthday": "1815-12-10" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Contact created successfully");
        let id = body["contact"]["id"].as_i64().unwrap();

        let (status, body) = send(&router, Method::GET, &format!("/api/contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["firstname"], "Ada");
        assert_eq!(body["birthday"], "1815-12-10");
        assert_eq!(body["notes"], json!([]));

        let (status, body) = send(
            &router,
            Method::PUT,
            &format!("/api/contacts/{id}"),
            Some(json!({ "nickname": "Countess" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["nickname"], "Countess");
        assert_eq!(body["lastname"], "Lovelace");

        let (status, body) = send(&router, Method::DELETE, &format!("/api/contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Contact deleted");

        let (status, body) = send(&router, Method::GET, &format!("/api/contacts/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Contact not found");
    }

    #[tokio::test]
    async fn test_create_contact_requires_firstname() {
        let router = test_router().await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/contacts",
            Some(json!({ "lastname": "Nobody" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("firstname"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let router = test_router().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/contacts")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_contacts_paging_and_fields() {
        let router = test_router().await;
        for name in ["Ada", "Grace", "Alan"] {
            create_contact(&router, json!({ "firstname": name, "circles": ["friends"] })).await;
        }

        let (status, body) = send(
            &router,
            Method::GET,
            "/api/contacts?page=1&limit=2&fields=firstname",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);
        assert_eq!(body["limit"], 2);
        let contacts = body["contacts"].as_array().unwrap();
        assert_eq!(contacts.len(), 2);
        assert!(contacts[0].get("id").is_some());
        assert!(contacts[0].get("lastname").is_none());

        let (_, body) = send(&router, Method::GET, "/api/contacts?search=gra", None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["contacts"][0]["firstname"], "Grace");

        let (_, body) = send(&router, Method::GET, "/api/circles", None).await;
        assert_eq!(body, json!(["friends"]));
    }

    #[tokio::test]
    async fn test_notes_for_missing_contact() {
        let router = test_router().await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/contacts/42/notes",
            Some(json!({ "content": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Contact not found");
    }

    #[tokio::test]
    async fn test_note_crud() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada" })).await;

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{id}/notes"),
            Some(json!({ "content": "Likes engines", "date": "2024-03-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Note created successfully");
        let note_id = body["note"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &router,
            Method::PUT,
            &format!("/api/notes/{note_id}"),
            Some(json!({ "content": "Loves engines" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "Loves engines");
        assert_eq!(body["date"], "2024-03-01");

        let (_, body) = send(&router, Method::GET, &format!("/api/contacts/{id}/notes"), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = send(&router, Method::DELETE, &format!("/api/notes/{note_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&router, Method::DELETE, &format!("/api/notes/{note_id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Note not found");
    }

    #[tokio::test]
    async fn test_activity_with_unknown_participant() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada" })).await;
        let (status, _) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{id}/activities"),
            Some(json!({ "title": "Dinner", "contact_ids": [999] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_shared_activity_visible_to_both_contacts() {
        let router = test_router().await;
        let ada = create_contact(&router, json!({ "firstname": "Ada" })).await;
        let charles = create_contact(&router, json!({ "firstname": "Charles" })).await;

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{ada}/activities"),
            Some(json!({ "title": "Engine demo", "date": "2024-05-01", "contact_ids": [charles] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activity"]["contact_ids"], json!([ada, charles]));

        let (_, body) = send(&router, Method::GET, &format!("/api/contacts/{charles}/activities"), None).await;
        assert_eq!(body[0]["title"], "Engine demo");
    }

    #[tokio::test]
    async fn test_relationship_to_missing_contact() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada" })).await;
        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{id}/relationships"),
            Some(json!({ "relationship_type": "friend", "related_contact_id": 999 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Related contact not found");
    }

    #[tokio::test]
    async fn test_reminder_complete_rolls_forward() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada" })).await;

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{id}/reminders"),
            Some(json!({
                "message": "Call Ada",
                "date": "2024-01-15T09:00:00Z",
                "recurrence": "monthly"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Reminder created successfully");
        let reminder_id = body["reminder"]["id"].as_i64().unwrap();

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/reminders/{reminder_id}/complete"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reminder"]["completed"], false);
        assert_eq!(body["reminder"]["date"], "2024-02-15T09:00:00Z");

        let (_, body) = send(&router, Method::GET, &format!("/api/contacts/{id}/reminders"), None).await;
        assert_eq!(body["reminders"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reminder_requires_date() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada" })).await;
        let (status, _) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{id}/reminders"),
            Some(json!({ "message": "Call Ada" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_json_400() {
        let router = test_router().await;
        for (method, uri) in [
            (Method::GET, "/api/contacts/abc"),
            (Method::DELETE, "/api/notes/1.5"),
            (Method::POST, "/api/reminders/x/complete"),
        ] {
            let (status, body) = send(&router, method, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(body["error"].is_string(), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_null_birthday_clears_it() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada", "birthday": "1990-04-12" })).await;

        let (_, body) = send(
            &router,
            Method::PUT,
            &format!("/api/contacts/{id}"),
            Some(json!({ "phone": "555" })),
        )
        .await;
        assert_eq!(body["birthday"], "1990-04-12");

        let (status, body) = send(
            &router,
            Method::PUT,
            &format!("/api/contacts/{id}"),
            Some(json!({ "birthday": null })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["birthday"], Value::Null);

        let (_, body) = send(&router, Method::GET, &format!("/api/contacts/{id}"), None).await;
        assert_eq!(body["birthday"], Value::Null);
        assert_eq!(body["phone"], "555");
    }

    #[tokio::test]
    async fn test_birthday_with_trailing_text_rejected() {
        let router = test_router().await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/api/contacts",
            Some(json!({ "firstname": "Ada", "birthday": "1990-04-12garbage" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_activity_update_matches_stored_order() {
        let router = test_router().await;
        let ada = create_contact(&router, json!({ "firstname": "Ada" })).await;
        let bob = create_contact(&router, json!({ "firstname": "Bob" })).await;
        let cy = create_contact(&router, json!({ "firstname": "Cy" })).await;

        let (_, body) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{ada}/activities"),
            Some(json!({ "title": "Lunch", "date": "2024-05-01" })),
        )
        .await;
        let activity_id = body["activity"]["id"].as_i64().unwrap();

        let (status, updated) = send(
            &router,
            Method::PUT,
            &format!("/api/activities/{activity_id}"),
            Some(json!({ "contact_ids": [cy, ada, bob] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["contact_ids"], json!([ada, bob, cy]));

        let (_, listed) = send(&router, Method::GET, &format!("/api/contacts/{bob}/activities"), None).await;
        assert_eq!(listed[0]["contact_ids"], updated["contact_ids"]);
    }

    #[tokio::test]
    async fn test_reminder_response_matches_stored_date() {
        let router = test_router().await;
        let id = create_contact(&router, json!({ "firstname": "Ada" })).await;
        let (_, body) = send(
            &router,
            Method::POST,
            &format!("/api/contacts/{id}/reminders"),
            Some(json!({ "message": "Call Ada", "date": "2024-01-15T09:00:00.750Z" })),
        )
        .await;
        assert_eq!(body["reminder"]["date"], "2024-01-15T09:00:00Z");
        let reminder_id = body["reminder"]["id"].as_i64().unwrap();

        let (_, stored) = send(&router, Method::GET, &format!("/api/reminders/{reminder_id}"), None).await;
        assert_eq!(stored["date"], body["reminder"]["date"]);
    }

    #[tokio::test]
    async fn test_unknown_api_path_is_json_404() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }
}
