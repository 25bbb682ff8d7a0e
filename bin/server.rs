// Location Selector - Web Server
// REST API over saved city/township records, plus static reference docs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use location_selector::{
    delete_location, get_location, insert_location, list_locations, setup_database,
    update_location, Config, HttpReferenceSource, LocationRecord, MaterializeError, Materializer,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    materializer: Materializer<HttpReferenceSource>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Create/update request body. Missing fields land as empty strings so
/// the presence check (not serde) decides the 400.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationRequest {
    #[serde(default)]
    city_id: String,
    #[serde(default)]
    township_id: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/locations - Materialize and save a new record
async fn create_location(
    State(state): State<AppState>,
    Json(body): Json<LocationRequest>,
) -> impl IntoResponse {
    let payload = match state
        .materializer
        .materialize(&body.city_id, &body.township_id)
        .await
    {
        Ok(payload) => payload,
        Err(e) => return materialize_error_response(e),
    };

    let conn = state.db.lock().unwrap();
    match insert_location(&conn, &payload) {
        Ok(record) => (StatusCode::CREATED, Json(ApiResponse::ok(record))).into_response(),
        Err(e) => {
            eprintln!("Error saving location: {}", e);
            internal_error()
        }
    }
}

/// GET /api/locations - All records, newest first
async fn get_locations(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match list_locations(&conn) {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::ok(records))).into_response(),
        Err(e) => {
            eprintln!("Error listing locations: {}", e);
            internal_error()
        }
    }
}

/// GET /api/locations/:id - Single record
async fn get_location_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_location(&conn, &id) {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiResponse::ok(record))).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            eprintln!("Error fetching location {}: {}", id, e);
            internal_error()
        }
    }
}

/// PUT /api/locations/:id - Re-materialize and replace a record
async fn update_location_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LocationRequest>,
) -> impl IntoResponse {
    // Same resolution path as create: the new pair is fully re-resolved.
    let payload = match state
        .materializer
        .materialize(&body.city_id, &body.township_id)
        .await
    {
        Ok(payload) => payload,
        Err(e) => return materialize_error_response(e),
    };

    let conn = state.db.lock().unwrap();
    match update_location(&conn, &id, &payload) {
        Ok(Some(record)) => (StatusCode::OK, Json(ApiResponse::ok(record))).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            eprintln!("Error updating location {}: {}", id, e);
            internal_error()
        }
    }
}

/// DELETE /api/locations/:id - Remove a record
async fn delete_location_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match delete_location(&conn, &id) {
        Ok(true) => (
            StatusCode::OK,
            Json(ApiResponse::ok("Location deleted".to_string())),
        )
            .into_response(),
        Ok(false) => not_found(),
        Err(e) => {
            eprintln!("Error deleting location {}: {}", id, e);
            internal_error()
        }
    }
}

fn materialize_error_response(e: MaterializeError) -> axum::response::Response {
    match e {
        MaterializeError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::<LocationRecord>::err(msg)),
        )
            .into_response(),
        MaterializeError::Reference(e) => {
            eprintln!("Error resolving reference data: {}", e);
            internal_error()
        }
    }
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<LocationRecord>::err("Location not found")),
    )
        .into_response()
}

fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<LocationRecord>::err("Internal server error")),
    )
        .into_response()
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Location Selector - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::from_env();

    let conn = Connection::open(&config.database_path).expect("Failed to open database");
    setup_database(&conn).expect("Failed to set up database");
    println!("✓ Database ready: {:?}", config.database_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
        materializer: Materializer::new(HttpReferenceSource::new(
            config.reference_base_url.clone(),
        )),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/locations", get(get_locations).post(create_location))
        .route(
            "/locations/:id",
            get(get_location_by_id)
                .put(update_location_by_id)
                .delete(delete_location_by_id),
        )
        .with_state(state);

    // Build main router; the reference documents are served statically so
    // this process can stand in for the reference data source.
    let app = Router::new()
        .nest("/api", api_routes)
        .nest_service("/reference", ServeDir::new(&config.reference_dir))
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API:       http://{}/api/locations", config.bind_addr);
    println!("   Reference: http://{}/reference/city.json", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
