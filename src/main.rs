mod models;
mod services;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{delete, get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, fmt};

use models::{SessionSnapshot, Story, Viewport};
use services::generator::StoryClient;
use services::history::HistoryStore;
use services::session::{SessionController, SessionError};

#[derive(Clone)]
struct AppState {
    session: Arc<SessionController<StoryClient>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let history_path = std::env::var("FABULA_HISTORY_PATH")
        .unwrap_or_else(|_| "./data/stories.json".to_string());
    let store = HistoryStore::open(&history_path)?;
    let generator = StoryClient::new()?;

    // Create the application state
    let app_state = AppState {
        session: Arc::new(SessionController::new(generator, store)),
    };

    // Build our application with a route
    let app = Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/story/new", post(new_story))
        .route("/api/story/continue", post(continue_story))
        .route("/api/history", get(list_history))
        .route("/api/history/:id/select", post(select_story))
        .route("/api/history/:id", delete(delete_story))
        .route("/api/session", get(session_snapshot))
        .route("/api/session/viewport", post(set_viewport))
        .route("/api/session/page", post(set_page))
        .route("/api/session/view", post(set_view))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        );

    // Run our application
    let addr = std::env::var("FABULA_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> Html<String> {
    let html_content = r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Fabula Story Service</title>
        <meta charset="utf-8">
        <style>
            body { font-family: Georgia, serif; margin: 40px; }
            .info-box { background-color: #fdf6e3; padding: 20px; border-radius: 8px; margin: 20px 0; }
            .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
        </style>
    </head>
    <body>
        <h1>Fabula Story Service</h1>

        <div class="info-box">
            <h2>Service Information</h2>
            <p>Fabula generates short fiction with an AI storyteller, paginates it for comfortable reading, and keeps a history of past stories.</p>
        </div>

        <h2>Available Endpoints:</h2>
        <div class="endpoint">GET / - This information page</div>
        <div class="endpoint">GET /health - Health check</div>
        <div class="endpoint">POST /api/story/new - Generate a new story (optional "genre" field)</div>
        <div class="endpoint">POST /api/story/continue - Continue the current story</div>
        <div class="endpoint">GET /api/history - List saved stories, newest first</div>
        <div class="endpoint">POST /api/history/{id}/select - Load a saved story for reading</div>
        <div class="endpoint">DELETE /api/history/{id} - Delete a saved story</div>
        <div class="endpoint">GET /api/session - Current view, page, and page count</div>
        <div class="endpoint">POST /api/session/viewport - Report content-area metrics {"width", "height"}</div>
        <div class="endpoint">POST /api/session/page - Jump to a page {"index"}</div>
        <div class="endpoint">POST /api/session/view - Switch view {"view": "reading" | "history" | "new"}</div>

        <h2>Story Types:</h2>
        <p>fantasy, scifi, romance, mystery, adventure, random - anything else gets the default scenario.</p>
    </body>
    </html>
    "#.to_string();

    Html(html_content)
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
struct NewStoryRequest {
    genre: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageRequest {
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ViewRequest {
    view: ViewChange,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ViewChange {
    Reading,
    History,
    New,
}

fn error_status(err: SessionError) -> StatusCode {
    let status = match err {
        SessionError::Busy => StatusCode::CONFLICT,
        SessionError::NoStory => StatusCode::BAD_REQUEST,
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::Generation(_) => StatusCode::BAD_GATEWAY,
        SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(%err, %status, "session operation failed");
    status
}

async fn new_story(
    State(state): State<AppState>,
    Json(request): Json<NewStoryRequest>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    let snapshot = state
        .session
        .start_new(request.genre.as_deref())
        .await
        .map_err(error_status)?;
    Ok(Json(snapshot))
}

async fn continue_story(
    State(state): State<AppState>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    let snapshot = state
        .session
        .continue_current()
        .await
        .map_err(error_status)?;
    Ok(Json(snapshot))
}

async fn list_history(State(state): State<AppState>) -> Json<Vec<Story>> {
    Json(state.session.history().await)
}

async fn select_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, StatusCode> {
    let snapshot = state
        .session
        .select_from_history(&id)
        .await
        .map_err(error_status)?;
    Ok(Json(snapshot))
}

async fn delete_story(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state.session.delete_entry(&id).await.map_err(error_status)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn session_snapshot(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

async fn set_viewport(
    State(state): State<AppState>,
    Json(viewport): Json<Viewport>,
) -> Json<SessionSnapshot> {
    Json(state.session.set_viewport(viewport).await)
}

async fn set_page(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> Json<SessionSnapshot> {
    Json(state.session.set_page(request.index).await)
}

async fn set_view(
    State(state): State<AppState>,
    Json(request): Json<ViewRequest>,
) -> Json<SessionSnapshot> {
    let snapshot = match request.view {
        ViewChange::Reading => state.session.go_to_reading().await,
        ViewChange::History => state.session.go_to_history().await,
        ViewChange::New => state.session.go_to_new_story().await,
    };
    Json(snapshot)
}
