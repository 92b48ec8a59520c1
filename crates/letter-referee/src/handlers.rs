//! HTTP API handlers.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use letter_core::protocol::{PlayerId, RoomId};
use letter_core::room::RoomView;
use letter_core::{GameError, RoomRegistry};
use secp256k1::PublicKey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::*;

pub type AppState = Arc<RoomRegistry>;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    Game(GameError),
    MissingPlayer,
    BadRequest(String),
}

impl From<GameError> for AppError {
    fn from(e: GameError) -> Self {
        AppError::Game(e)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::MissingPlayer => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Game(e) => match e {
                GameError::RoomNotFound(_) => StatusCode::NOT_FOUND,
                GameError::StaleState { .. } => StatusCode::CONFLICT,
                GameError::NotYourTurn(_) | GameError::NotHost | GameError::NotSeated(_) => {
                    StatusCode::FORBIDDEN
                }
                GameError::DeadlinePassed => StatusCode::GONE,
                GameError::Ledger(_) => StatusCode::PAYMENT_REQUIRED,
                GameError::NotInLobby
                | GameError::NotActive
                | GameError::RoomFull
                | GameError::AlreadyJoined(_)
                | GameError::ActionPending
                | GameError::NoPendingActionExpected => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Game(e) => e.to_string(),
            AppError::MissingPlayer => "Missing X-Player-Id header".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
        };
        (self.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}

// ============ Helpers ============

/// Identity comes from the fronting auth layer as a header
fn player_from_header(headers: &HeaderMap) -> Result<PlayerId, AppError> {
    headers
        .get("X-Player-Id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(PlayerId::from)
        .ok_or(AppError::MissingPlayer)
}

fn parse_key(hex_key: &str) -> Result<PublicKey, AppError> {
    PublicKey::from_str(hex_key)
        .map_err(|e| AppError::BadRequest(format!("Invalid viewing key: {}", e)))
}

// ============ Room handlers ============

pub async fn create_room(
    State(registry): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<RoomView>), AppError> {
    let host = player_from_header(&headers)?;
    let key = parse_key(&req.viewing_key)?;
    let view = registry.create_room(host, key, req.settings()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_rooms(State(registry): State<AppState>) -> Json<Vec<RoomView>> {
    Json(registry.list_rooms().await)
}

pub async fn get_room(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
) -> Result<Json<RoomView>, AppError> {
    Ok(Json(registry.room_view(id).await?))
}

pub async fn join_room(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    headers: HeaderMap,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<RoomView>, AppError> {
    let player = player_from_header(&headers)?;
    let key = parse_key(&req.viewing_key)?;
    let view = registry
        .join_room(id, player, key, req.expected_version)
        .await?;
    Ok(Json(view))
}

pub async fn leave_room(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    headers: HeaderMap,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<RoomView>, AppError> {
    let player = player_from_header(&headers)?;
    Ok(Json(
        registry.leave_room(id, &player, req.expected_version).await?,
    ))
}

pub async fn start_match(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    headers: HeaderMap,
    Json(req): Json<VersionedRequest>,
) -> Result<Json<RoomView>, AppError> {
    let player = player_from_header(&headers)?;
    Ok(Json(
        registry.start_match(id, &player, req.expected_version).await?,
    ))
}

// ============ Turn handlers ============

pub async fn play_card(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    headers: HeaderMap,
    Json(req): Json<PlayRequest>,
) -> Result<Json<RoomView>, AppError> {
    let player = player_from_header(&headers)?;
    debug!("Play from {} in room {}", player, id);
    Ok(Json(
        registry
            .play_card(id, &player, req.play, req.expected_version)
            .await?,
    ))
}

pub async fn respond(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    headers: HeaderMap,
    Json(req): Json<RespondRequest>,
) -> Result<Json<RoomView>, AppError> {
    let player = player_from_header(&headers)?;
    Ok(Json(
        registry
            .respond(id, &player, req.proof, req.expected_version)
            .await?,
    ))
}

pub async fn expire_room(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
) -> Result<Json<ExpireResponse>, AppError> {
    let changed = registry.expire(id).await?;
    Ok(Json(ExpireResponse { changed }))
}

// ============ Event surfaces ============

pub async fn get_events(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<EventsResponse>, AppError> {
    let events = registry.events_since(id, query.since).await?;
    Ok(Json(EventsResponse { events }))
}

/// Private notices; only the owning player may read them
pub async fn get_inbox(
    State(registry): State<AppState>,
    Path(id): Path<RoomId>,
    headers: HeaderMap,
    Query(query): Query<SinceQuery>,
) -> Result<Json<InboxResponse>, AppError> {
    let player = player_from_header(&headers)?;
    let notices = registry.inbox(id, &player, query.since).await?;
    Ok(Json(InboxResponse { notices }))
}

pub async fn get_leaderboard(
    State(registry): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Json<LeaderboardResponse> {
    let board = registry.leaderboard();
    Json(LeaderboardResponse {
        entries: board.top(query.limit),
        matches_recorded: board.matches_recorded(),
    })
}

// ============ System ============

/// Advance the simulated clock and sweep deadlines
pub async fn tick(
    State(registry): State<AppState>,
    Json(req): Json<TickRequest>,
) -> impl IntoResponse {
    registry.advance_time(req.seconds);
    let rooms_changed = registry.expire_all().await;
    info!(
        "Advanced time by {} seconds, {} rooms changed",
        req.seconds, rooms_changed
    );
    Json(TickResponse { rooms_changed })
}

pub async fn health() -> &'static str {
    "ok"
}
