//! Axum router construction and route mapping.
//!
//! The [`app`] function wires every endpoint to its handler and returns
//! a ready-to-serve [`axum::Router`].

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::errors::generate_request_id;
use crate::handlers;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::AppState;

// -- OpenAPI specification ----------------------------------------------------

/// OpenAPI documentation for the Curio API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Curio API",
        version = "0.1.0",
        description = "Object registry with blob storage and live change events"
    ),
    paths(
        health_check,
        crate::handlers::object::create_object,
        crate::handlers::object::list_objects,
        crate::handlers::object::get_object,
        crate::handlers::object::delete_object,
        crate::handlers::events::events,
    ),
    components(schemas(crate::metadata::store::ObjectRecord)),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Objects", description = "Object registry operations"),
        (name = "Events", description = "Live change event stream"),
    )
)]
struct ApiDoc;

/// Build the axum [`Router`] with all routes.
///
/// The returned router is ready to be passed to `axum::serve`.
pub fn app(state: Arc<AppState>) -> Router {
    let max_upload = state.config.server.max_upload_bytes as usize;

    Router::new()
        // Infrastructure endpoints.
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(openapi_spec))
        // Object registry.
        .route(
            "/objects",
            get(handlers::object::list_objects).post(handlers::object::create_object),
        )
        .route(
            "/objects/:id",
            get(handlers::object::get_object).delete(handlers::object::delete_object),
        )
        // Live change events.
        .route("/events", get(handlers::events::events))
        // Application state shared across all handlers.
        .with_state(state)
        // Layer ordering: inner layers run first, outer layers wrap them.
        .layer(middleware::from_fn(common_headers_middleware))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        // Browsers talk to this API directly; the event stream and upload
        // form are served from other origins.
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(max_upload))
}

// -- Common headers middleware -----------------------------------------------

/// Tower middleware that adds common response headers to every response:
/// - `x-request-id`: 16-character uppercase hex string
/// - `Date`: RFC 7231 formatted timestamp
/// - `Server`: `Curio`
async fn common_headers_middleware(req: Request<axum::body::Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    // Only set x-request-id if not already present (error handler may set it).
    if !headers.contains_key("x-request-id") {
        let request_id = generate_request_id();
        headers.insert("x-request-id", HeaderValue::from_str(&request_id).unwrap());
    }

    let date = httpdate::fmt_http_date(std::time::SystemTime::now());
    headers.insert("date", HeaderValue::from_str(&date).unwrap());
    headers.insert("server", HeaderValue::from_static("Curio"));

    response
}

// -- Infrastructure handlers --------------------------------------------------

/// `GET /health` -- Returns `{"status": "ok"}` with 200 OK.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "HealthCheck",
    responses(
        (status = 200, description = "Health check OK")
    )
)]
async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "application/json")],
        r#"{"status":"ok"}"#,
    )
}

/// `GET /openapi.json` -- Serve the OpenAPI document.
async fn openapi_spec() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metadata::memory::MemoryMetadataStore;
    use crate::notify::ChangeNotifier;
    use crate::repository::ObjectRepository;
    use crate::storage::memory::MemoryBlobStore;
    use axum::body::Body;
    use http::header::CONTENT_TYPE;
    use tower::util::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let blobs = Arc::new(MemoryBlobStore::new(
            "curio-objects".to_string(),
            "http://localhost:9000".to_string(),
        ));
        Arc::new(AppState {
            config: Config::default(),
            repository: ObjectRepository::new(Arc::new(MemoryMetadataStore::new()), blobs),
            notifier: ChangeNotifier::new(),
        })
    }

    const BOUNDARY: &str = "curio-test-boundary";

    /// Assemble a multipart create request body by hand.
    fn multipart_body(title: &str, description: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in [("title", title), ("description", description)] {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn create_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/objects")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app(test_state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()["server"], "Curio");
    }

    #[tokio::test]
    async fn test_create_list_get_delete_flow() {
        let state = test_state();
        let (_sub, mut events) = state.notifier.connect();

        // Create.
        let body = multipart_body("Vase", "Blue ceramic vase", "vase.jpg", &[0xFF; 200]);
        let response = app(state.clone()).oneshot(create_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = response_json(response).await;
        assert_eq!(created["title"], "Vase");
        assert_eq!(created["description"], "Blue ceramic vase");
        let image_url = created["imageUrl"].as_str().unwrap();
        assert!(image_url.ends_with(".jpg"));
        let id = created["id"].as_str().unwrap().to_string();

        // The connected subscriber saw exactly one created event.
        match events.try_recv().unwrap() {
            crate::notify::ChangeEvent::Created(record) => {
                assert_eq!(record.id.to_string(), id)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(events.try_recv().is_err());

        // List.
        let response = app(state.clone())
            .oneshot(Request::builder().uri("/objects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let listed = response_json(response).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        // Get.
        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/objects/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await["id"], id.as_str());

        // Delete.
        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/objects/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        match events.try_recv().unwrap() {
            crate::notify::ChangeEvent::Deleted { id: deleted } => {
                assert_eq!(deleted.to_string(), id)
            }
            other => panic!("unexpected event: {other:?}"),
        }

        // Gone.
        let response = app(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/objects/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_with_empty_title_is_rejected() {
        let state = test_state();
        let body = multipart_body("", "described", "vase.jpg", &[1, 2, 3]);
        let response = app(state.clone()).oneshot(create_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = response_json(response).await;
        assert_eq!(error["code"], "InvalidArgument");
        // Nothing was committed, so nothing was announced.
        assert_eq!(state.repository.find_all().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_object_is_not_found() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri(format!("/objects/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let error = response_json(response).await;
        assert_eq!(error["code"], "NotFound");
    }

    #[tokio::test]
    async fn test_delete_unknown_object_is_not_found() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/objects/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_object_paths() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = response_json(response).await;
        assert!(doc["paths"]["/objects"].is_object());
        assert!(doc["paths"]["/objects/{id}"].is_object());
        assert!(doc["paths"]["/events"].is_object());
    }

    #[test]
    fn test_object_record_schema_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components missing");
        assert!(components.schemas.contains_key("ObjectRecord"));
    }
}
