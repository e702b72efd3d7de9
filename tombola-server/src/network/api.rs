//! HTTP Request Surface
//!
//! Request/response endpoints for operators. Every mutation goes through
//! the hub, which also pushes the resulting event to all real-time sessions;
//! the HTTP response only confirms the outcome to the caller.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::game::engine::{CompletedGame, ErrorKind, GameError};
use crate::game::state::{GamePhase, MAX_NUMBER, MIN_NUMBER};
use crate::network::hub::SyncHub;
use crate::network::protocol::StateView;

/// Build the API router around a shared hub.
pub fn router(hub: Arc<SyncHub>) -> Router {
    Router::new()
        .route("/api/draw", post(draw_number))
        .route("/api/undo", post(undo_last))
        .route("/api/reset", post(reset_game))
        .route("/api/check", post(check_number))
        .route("/api/status", get(get_status))
        .route("/api/history", get(get_history))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(hub)
}

// =============================================================================
// ERRORS
// =============================================================================

/// Rejection of an API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The engine refused the operation.
    #[error(transparent)]
    Game(#[from] GameError),

    /// Body missing, not JSON, or `number` not an integer.
    #[error("Invalid number. Must be between {} and {}", MIN_NUMBER, MAX_NUMBER)]
    InvalidBody(#[from] JsonRejection),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Game(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::InvalidBody(rejection) = &self {
            debug!("Rejected request body: {}", rejection.body_text());
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// REQUEST / RESPONSE BODIES
// =============================================================================

/// Body of `draw` and `check`.
#[derive(Debug, Deserialize)]
pub struct NumberRequest {
    /// Board number.
    pub number: i64,
}

#[derive(Debug, Serialize)]
struct DrawResponse {
    success: bool,
    number: u8,
    drawn_numbers: Vec<u8>,
    total_drawn: usize,
    remaining: usize,
}

#[derive(Debug, Serialize)]
struct UndoResponse {
    success: bool,
    undone_number: u8,
    drawn_numbers: Vec<u8>,
    total_drawn: usize,
    remaining: usize,
}

#[derive(Debug, Serialize)]
struct ResetResponse {
    success: bool,
    message: String,
    #[serde(flatten)]
    state: StateView,
}

#[derive(Debug, Serialize)]
struct CheckResponse {
    number: u8,
    drawn: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    #[serde(flatten)]
    state: StateView,
    available_numbers: Vec<u8>,
    phase: GamePhase,
}

#[derive(Debug, Serialize)]
struct HistoryEntry {
    date: chrono::DateTime<chrono::Utc>,
    numbers_drawn: usize,
    numbers: Vec<u8>,
}

impl From<CompletedGame> for HistoryEntry {
    fn from(game: CompletedGame) -> Self {
        Self {
            date: game.timestamp,
            numbers_drawn: game.numbers_drawn(),
            numbers: game.numbers,
        }
    }
}

#[derive(Debug, Serialize)]
struct HistoryResponse {
    history: Vec<HistoryEntry>,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn draw_number(
    State(hub): State<Arc<SyncHub>>,
    body: Result<Json<NumberRequest>, JsonRejection>,
) -> Result<Json<DrawResponse>, ApiError> {
    let Json(req) = body?;
    let event = hub.draw(req.number).await?;
    let view = StateView::from_drawn(event.drawn());

    Ok(Json(DrawResponse {
        success: true,
        number: event.number().unwrap_or_default(),
        drawn_numbers: view.drawn_numbers,
        total_drawn: view.total_drawn,
        remaining: view.remaining,
    }))
}

async fn undo_last(State(hub): State<Arc<SyncHub>>) -> Result<Json<UndoResponse>, ApiError> {
    let event = hub.undo().await?;
    let view = StateView::from_drawn(event.drawn());

    Ok(Json(UndoResponse {
        success: true,
        undone_number: event.number().unwrap_or_default(),
        drawn_numbers: view.drawn_numbers,
        total_drawn: view.total_drawn,
        remaining: view.remaining,
    }))
}

async fn reset_game(State(hub): State<Arc<SyncHub>>) -> Json<ResetResponse> {
    let event = hub.reset().await;

    Json(ResetResponse {
        success: true,
        message: "Game reset successfully".to_string(),
        state: StateView::from_drawn(event.drawn()),
    })
}

async fn check_number(
    State(hub): State<Arc<SyncHub>>,
    body: Result<Json<NumberRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let Json(req) = body?;
    let result = hub.check(req.number).await?;

    Ok(Json(CheckResponse {
        number: result.number,
        drawn: result.drawn,
        message: result.message(),
    }))
}

async fn get_status(State(hub): State<Arc<SyncHub>>) -> Json<StatusResponse> {
    let state = hub.snapshot().await;

    Json(StatusResponse {
        state: StateView::from(&state),
        available_numbers: state.available(),
        phase: state.phase(),
    })
}

async fn get_history(State(hub): State<Arc<SyncHub>>) -> Json<HistoryResponse> {
    let history = hub.history().await.into_iter().map(HistoryEntry::from).collect();
    Json(HistoryResponse { history })
}
