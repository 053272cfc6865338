//! Web surface - a small JSON API over play history.
//!
//! The bot process serves this alongside the Discord gateway. Every route is
//! read only.

use crate::{
    config::Settings,
    core::{games, plays},
    entities::GameModel,
    errors::Error,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared state of the web routes.
#[derive(Clone)]
pub struct WebState {
    /// Database connection
    pub database: DatabaseConnection,
}

/// Failure of an API route.
#[derive(Debug)]
pub enum ApiError {
    /// The requested resource does not exist
    NotFound,
    /// Anything else
    Internal(Error),
}

impl From<Error> for ApiError {
    fn from(value: Error) -> Self {
        Self::Internal(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
            }
            Self::Internal(e) => {
                error!("API request failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

/// Page selection for record listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Zero based page number
    pub page: Option<u64>,
}

/// A post of a game as returned by the API.
#[derive(Debug, Serialize)]
pub struct PostView {
    /// Guild holding the post
    pub guild_xid: i64,
    /// Channel holding the post
    pub channel_xid: i64,
    /// Message id
    pub message_xid: i64,
    /// Discord link to the message
    pub jump_link: String,
}

/// A game as returned by the API.
#[derive(Debug, Serialize)]
pub struct GameView {
    /// The game row
    #[serde(flatten)]
    pub game: GameModel,
    /// Posts showing the game
    pub posts: Vec<PostView>,
}

/// Builds the router serving every API route.
pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/game/{id}", get(game))
        .route("/g/{guild}/c/{channel}", get(channel_records))
        .route("/g/{guild}/u/{user}", get(user_records))
        .route("/g/{guild}/analytics", get(guild_analytics))
        .with_state(state)
}

/// Serves the API until the listener fails.
pub async fn run_server(settings: &Settings, database: DatabaseConnection) -> crate::errors::Result<()> {
    let address = format!("{}:{}", settings.host, settings.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Web API listening on http://{address}");

    axum::serve(listener, router(WebState { database })).await?;
    Ok(())
}

async fn root() -> &'static str {
    "ok"
}

/// `GET /api/game/{id}`
pub async fn game(
    State(state): State<WebState>,
    Path(id): Path<i32>,
) -> Result<Json<GameView>, ApiError> {
    let db = &state.database;
    let game = games::select(db, id).await?.ok_or(ApiError::NotFound)?;
    let posts = games::posts(db, id)
        .await?
        .into_iter()
        .map(|p| PostView {
            jump_link: p.jump_link(),
            guild_xid: p.guild_xid,
            channel_xid: p.channel_xid,
            message_xid: p.message_xid,
        })
        .collect();
    Ok(Json(GameView { game, posts }))
}

/// `GET /g/{guild}/c/{channel}?page=N`
pub async fn channel_records(
    State(state): State<WebState>,
    Path((guild, channel)): Path<(i64, i64)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<plays::GameRecord>>, ApiError> {
    let page = query.page.unwrap_or(0);
    plays::channel_records(&state.database, guild, channel, page)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `GET /g/{guild}/u/{user}?page=N`
pub async fn user_records(
    State(state): State<WebState>,
    Path((guild, user)): Path<(i64, i64)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<plays::GameRecord>>, ApiError> {
    let page = query.page.unwrap_or(0);
    plays::user_records(&state.database, guild, user, page)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `GET /g/{guild}/analytics`
pub async fn guild_analytics(
    State(state): State<WebState>,
    Path(guild): Path<i64>,
) -> Result<Json<plays::GuildAnalytics>, ApiError> {
    plays::guild_analytics(&state.database, guild)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
