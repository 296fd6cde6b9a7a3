//! HTTP surface of the book catalog.
//!
//! **Books:**
//! - `GET    /api/books?search=term` — list books, optionally filtered
//! - `POST   /api/books` — create a book
//! - `GET    /api/books/{id}` — fetch one book
//! - `PATCH  /api/books/{id}` — merge fields into a book
//! - `DELETE /api/books/{id}` — delete a book
//!
//! **Labels:**
//! - `GET    /api/label` — list known labels
//! - `GET    /category/{label}` — books carrying a label (`/category/` lists all)
//!
//! **Images:**
//! - `GET    /image/{path}` — uploaded cover bytes
//!
//! `OPTIONS` on any path answers with CORS headers and an empty body. Anything
//! else is a 404.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::BookCatalog;
use crate::error::CatalogError;
use crate::model::{Book, FieldError};

/// Path prefix for the book resource.
pub const BOOKS_URI: &str = "/api/books";
/// Path of the label list.
pub const LABELS_URI: &str = "/api/label";

const ALLOWED_METHODS: &str = "GET, POST, PATCH, DELETE, OPTIONS";

// ── Server state ──────────────────────────────────────────────────────────

pub struct ServerState {
    catalog: BookCatalog,
}

impl ServerState {
    pub fn new(catalog: BookCatalog) -> Self {
        Self { catalog }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

/// Error returned by a handler, rendered as a JSON response.
#[derive(Debug)]
pub enum ApiError {
    /// 404 with `{message}`.
    NotFound(&'static str),
    /// 422 with `{errors: [{field, message}]}`.
    Validation(Vec<FieldError>),
    /// 500 with a generic body; the cause is only logged.
    Internal(CatalogError),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::BookNotFound { .. } => Self::NotFound("Books Not Found"),
            CatalogError::Validation { errors } => Self::Validation(errors),
            other => Self::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            Self::Internal(err) => {
                tracing::error!(error = %err, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Parse a request body as a JSON object.
fn parse_object(body: &Bytes) -> ApiResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::Internal(CatalogError::MalformedBody {
            message: format!("expected a JSON object, got {other}"),
        })),
        Err(e) => Err(ApiError::Internal(CatalogError::MalformedBody {
            message: e.to_string(),
        })),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct BookQuery {
    search: Option<String>,
}

async fn list_books(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<BookQuery>,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list(query.search.as_deref())?))
}

async fn create_book(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let data = parse_object(&body)?;
    let book = state.catalog.create(&data)?;
    let location = format!("{BOOKS_URI}/{}", book.id);
    Ok((
        StatusCode::CREATED,
        [
            (header::ACCESS_CONTROL_EXPOSE_HEADERS, "Location".to_string()),
            (header::LOCATION, location),
        ],
        Json(book),
    ))
}

async fn get_book(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Book>> {
    Ok(Json(state.catalog.get(&id)?))
}

async fn update_book(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Book>> {
    let patch = parse_object(&body)?;
    Ok(Json(state.catalog.update(&id, &patch)?))
}

async fn delete_book(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    match state.catalog.delete(&id) {
        Ok(()) => Ok(Json(json!({}))),
        Err(CatalogError::BookNotFound { .. }) => Err(ApiError::NotFound("Book Not Found")),
        Err(e) => Err(e.into()),
    }
}

async fn list_labels(State(state): State<Arc<ServerState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.catalog.labels()?))
}

async fn books_by_label(
    State(state): State<Arc<ServerState>>,
    Path(label): Path<String>,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list_by_label(Some(&label))?))
}

/// `/category/` with nothing after it lists every book.
async fn books_without_label(
    State(state): State<Arc<ServerState>>,
) -> ApiResult<Json<Vec<Book>>> {
    Ok(Json(state.catalog.list_by_label(None)?))
}

/// Cover bytes are always labelled `image/jpeg`, whatever the file holds.
async fn serve_image(
    State(state): State<Arc<ServerState>>,
    Path(path): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state
        .catalog
        .images()
        .read(&path)
        .await
        .ok_or(ApiError::NotFound("Not Found"))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found")
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the application router around an opened catalog.
pub fn router(catalog: BookCatalog) -> Router {
    let state = Arc::new(ServerState::new(catalog));

    // Allow-methods/allow-headers come from the header layers below, on
    // preflight and regular responses alike.
    let cors = CorsLayer::new().allow_origin(Any);

    Router::new()
        // Books.
        .route(BOOKS_URI, get(list_books).post(create_book))
        .route("/api/books/", get(list_books).post(create_book))
        // Static /category before wildcard /{id}.
        .route("/api/books/category/", get(books_without_label))
        .route("/api/books/category/{*label}", get(books_by_label))
        .route(
            "/api/books/{id}",
            get(get_book).patch(update_book).delete(delete_book),
        )
        // Labels.
        .route(LABELS_URI, get(list_labels))
        .route("/category/", get(books_without_label))
        .route("/category/{*label}", get(books_by_label))
        // Images.
        .route("/image/{*path}", get(serve_image))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        // Covers arrive inline as base64, so request bodies are not capped.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Log the endpoint overview shown at startup.
pub fn log_endpoints(addr: &str) {
    tracing::info!("book catalog listening on http://{addr}");
    tracing::info!("press CTRL+C to stop the server");
    tracing::info!("GET    {BOOKS_URI} - list books, `search` query parameter filters by title/description");
    tracing::info!(
        "POST   {BOOKS_URI} - create a book from {{title, description, author?, image?: data-URI, label?, rating?}}"
    );
    tracing::info!("GET    {BOOKS_URI}/{{id}} - fetch a book by ID");
    tracing::info!("PATCH  {BOOKS_URI}/{{id}} - update a book by ID");
    tracing::info!("DELETE {BOOKS_URI}/{{id}} - delete a book by ID");
    tracing::info!("GET    {LABELS_URI} - list labels");
    tracing::info!("GET    /category/{{label}} - list books with a label");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_generic_message() {
        let err = ApiError::from(CatalogError::BookNotFound { id: "1".into() });
        assert!(matches!(err, ApiError::NotFound("Books Not Found")));
    }

    #[test]
    fn io_errors_are_internal() {
        let err = ApiError::from(CatalogError::Io {
            path: "db.json".into(),
            source: std::io::Error::other("disk on fire"),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_is_unprocessable() {
        let err = ApiError::from(CatalogError::Validation {
            errors: vec![FieldError::new("title", "missing")],
        });
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(parse_object(&Bytes::from_static(b"{\"title\":\"x\"}")).is_ok());
        assert!(matches!(
            parse_object(&Bytes::from_static(b"[1,2]")),
            Err(ApiError::Internal(_))
        ));
        assert!(matches!(
            parse_object(&Bytes::from_static(b"not json")),
            Err(ApiError::Internal(_))
        ));
    }
}
