use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::seat_map_key;
use crate::entities::{matches, subscription_plan, team};
use crate::error::{AppError, AppResult};
use crate::services::matches::{get_published_match, list_open_matches, MatchFilter};
use crate::services::seats::{list_branch_seats, SectionSeats};
use crate::services::cafes;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub branch_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    #[serde(flatten)]
    pub game: matches::Model,
    pub home_team: String,
    pub away_team: String,
}

fn with_teams(game: matches::Model, teams: &HashMap<i32, String>) -> MatchResponse {
    let name = |id: i32| teams.get(&id).cloned().unwrap_or_default();
    MatchResponse {
        home_team: name(game.home_team_id),
        away_team: name(game.away_team_id),
        game,
    }
}

async fn team_names(state: &AppState) -> AppResult<HashMap<i32, String>> {
    Ok(cafes::list_teams(&state.db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect())
}

/// List matches open for booking
pub async fn list_matches(
    State(state): State<AppState>,
    Query(query): Query<MatchQuery>,
) -> AppResult<Json<Vec<MatchResponse>>> {
    let games = list_open_matches(
        &state.db,
        MatchFilter {
            branch_id: query.branch_id,
            from: query.from,
        },
    )
    .await?;
    let teams = team_names(&state).await?;

    Ok(Json(games.into_iter().map(|g| with_teams(g, &teams)).collect()))
}

/// Get match details
pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<MatchResponse>> {
    let game = get_published_match(&state.db, match_id).await?;
    let teams = team_names(&state).await?;
    Ok(Json(with_teams(game, &teams)))
}

#[derive(Debug, Serialize)]
pub struct SeatMapResponse {
    pub match_id: Uuid,
    pub seats_available: i32,
    pub sections: Vec<SectionSeats>,
}

/// Seat map of the branch showing a match
pub async fn match_seats(
    State(state): State<AppState>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<SeatMapResponse>> {
    let game = get_published_match(&state.db, match_id).await?;
    let key = seat_map_key(game.branch_id);

    let sections = match state.cache.get(&key).await {
        Some(cached) => serde_json::from_value(cached)
            .map_err(|e| AppError::Internal(format!("Failed to decode seat map: {}", e)))?,
        None => {
            let sections = list_branch_seats(&state.db, game.branch_id).await?;
            let body = serde_json::to_value(&sections)
                .map_err(|e| AppError::Internal(format!("Failed to encode seat map: {}", e)))?;
            state
                .cache
                .set(
                    &key,
                    body,
                    Duration::from_secs(state.config.occupancy_cache_ttl_secs),
                )
                .await;
            sections
        }
    };

    Ok(Json(SeatMapResponse {
        match_id: game.id,
        seats_available: game.seats_available,
        sections,
    }))
}

/// List teams
pub async fn list_teams(State(state): State<AppState>) -> AppResult<Json<Vec<team::Model>>> {
    Ok(Json(cafes::list_teams(&state.db).await?))
}

/// List subscription plans on sale
pub async fn list_plans(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<subscription_plan::Model>>> {
    Ok(Json(cafes::list_plans(&state.db).await?))
}
