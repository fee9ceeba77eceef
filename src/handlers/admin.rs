use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::matches::{self, MatchStatus};
use crate::entities::seating_section::SectionType;
use crate::entities::{
    branch, cafe, cafe_subscription, offer, seat, seating_section, staff_member,
    subscription_plan, team,
};
use crate::error::{AppError, AppResult};
use crate::handlers::{bust_branch_caches, cafe_of_branch, publish};
use crate::policy::{self, Action, Resource};
use crate::services::booking::expire_stale_payments;
use crate::services::cafes::{self, NewBranch, NewOffer, NewPlan};
use crate::services::events::DomainEvent;
use crate::services::matches::{self as fixtures, MatchCancellation, MatchTransition, NewMatch};
use crate::services::seats::{self, NewSection, ResizeOutcome, SectionChanges, SectionSeats};
use crate::utils::jwt::Claims;
use crate::AppState;

fn authorize_platform(claims: &Claims) -> AppResult<()> {
    policy::authorize(claims, Resource::Platform, Action::Create)
}

async fn authorize_branch(state: &AppState, claims: &Claims, branch_id: Uuid, action: Action) -> AppResult<()> {
    let cafe_id = cafe_of_branch(state, branch_id).await?;
    policy::authorize(claims, Resource::Cafe(cafe_id), action)
}

async fn section_branch(state: &AppState, section_id: Uuid) -> AppResult<Uuid> {
    seating_section::Entity::find_by_id(section_id)
        .one(&state.db)
        .await?
        .map(|s| s.branch_id)
        .ok_or_else(|| AppError::NotFound("Section not found".to_string()))
}

async fn seat_branch(state: &AppState, seat_id: Uuid) -> AppResult<Uuid> {
    let section_id = seat::Entity::find_by_id(seat_id)
        .one(&state.db)
        .await?
        .map(|s| s.section_id)
        .ok_or_else(|| AppError::NotFound("Seat not found".to_string()))?;
    section_branch(state, section_id).await
}

async fn load_match(state: &AppState, match_id: Uuid) -> AppResult<matches::Model> {
    matches::Entity::find_by_id(match_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Match not found".to_string()))
}

// ============ Platform catalogue ============

#[derive(Debug, Deserialize)]
pub struct CreateCafeRequest {
    pub name: String,
    pub owner_id: Uuid,
}

/// Register a café
pub async fn create_cafe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCafeRequest>,
) -> AppResult<(StatusCode, Json<cafe::Model>)> {
    authorize_platform(&claims)?;
    let created = cafes::create_cafe(&state.db, &payload.name, payload.owner_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    pub short_name: Option<String>,
}

/// Add a team to the fixture catalogue
pub async fn create_team(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTeamRequest>,
) -> AppResult<(StatusCode, Json<team::Model>)> {
    authorize_platform(&claims)?;
    let created = cafes::create_team(&state.db, &payload.name, payload.short_name).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub name: String,
    pub slug: String,
    pub price_monthly: f64,
    pub max_branches: Option<i32>,
    pub max_matches_per_month: Option<i32>,
    pub max_bookings_per_month: Option<i32>,
    pub max_staff: Option<i32>,
    pub max_offers: Option<i32>,
    #[serde(default)]
    pub has_analytics: bool,
    #[serde(default)]
    pub has_loyalty: bool,
    #[serde(default)]
    pub has_custom_branding: bool,
}

/// Create a subscription plan
pub async fn create_plan(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePlanRequest>,
) -> AppResult<(StatusCode, Json<subscription_plan::Model>)> {
    authorize_platform(&claims)?;
    let created = cafes::create_plan(
        &state.db,
        NewPlan {
            name: payload.name,
            slug: payload.slug,
            price_monthly: payload.price_monthly,
            max_branches: payload.max_branches,
            max_matches_per_month: payload.max_matches_per_month,
            max_bookings_per_month: payload.max_bookings_per_month,
            max_staff: payload.max_staff,
            max_offers: payload.max_offers,
            has_analytics: payload.has_analytics,
            has_loyalty: payload.has_loyalty,
            has_custom_branding: payload.has_custom_branding,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: Uuid,
    pub starts_at: Option<DateTime<Utc>>,
    pub months: Option<u32>,
}

/// Put a café on a plan
pub async fn subscribe_cafe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cafe_id): Path<Uuid>,
    Json(payload): Json<SubscribeRequest>,
) -> AppResult<(StatusCode, Json<cafe_subscription::Model>)> {
    authorize_platform(&claims)?;
    let created = cafes::subscribe_cafe(
        &state.db,
        cafe_id,
        payload.plan_id,
        payload.starts_at.unwrap_or_else(Utc::now),
        payload.months.unwrap_or(1),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Serialize)]
pub struct ExpiredPaymentsResponse {
    pub cancelled: Vec<Uuid>,
}

/// Cancel bookings left unpaid past the payment window
pub async fn expire_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ExpiredPaymentsResponse>> {
    authorize_platform(&claims)?;
    let now = Utc::now();
    let cutoff = now - Duration::minutes(state.config.payment_expiry_minutes);
    let outcome = expire_stale_payments(&state.db, state.gateway.as_ref(), cutoff, now).await?;

    for event in &outcome.events {
        if let DomainEvent::BookingCancelled { branch_id, .. } = event {
            bust_branch_caches(&state, *branch_id).await;
        }
    }
    publish(&state, outcome.events);

    Ok(Json(ExpiredPaymentsResponse {
        cancelled: outcome.cancelled,
    }))
}

// ============ Café administration ============

#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
    pub address: Option<String>,
    #[serde(default)]
    pub total_capacity: i32,
}

/// Open a branch
pub async fn create_branch(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cafe_id): Path<Uuid>,
    Json(payload): Json<CreateBranchRequest>,
) -> AppResult<(StatusCode, Json<branch::Model>)> {
    policy::authorize(&claims, Resource::Cafe(cafe_id), Action::Create)?;
    let created = cafes::create_branch(
        &state.db,
        cafe_id,
        NewBranch {
            name: payload.name,
            address: payload.address,
            total_capacity: payload.total_capacity,
        },
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct AddStaffRequest {
    pub user_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub role: String,
}

/// Add a staff member
pub async fn add_staff(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cafe_id): Path<Uuid>,
    Json(payload): Json<AddStaffRequest>,
) -> AppResult<(StatusCode, Json<staff_member::Model>)> {
    policy::authorize(&claims, Resource::Cafe(cafe_id), Action::Create)?;
    let created = cafes::add_staff_member(
        &state.db,
        cafe_id,
        payload.user_id,
        payload.branch_id,
        &payload.role,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct CreateOfferRequest {
    pub branch_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: f64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Publish a promotional offer
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(cafe_id): Path<Uuid>,
    Json(payload): Json<CreateOfferRequest>,
) -> AppResult<(StatusCode, Json<offer::Model>)> {
    policy::authorize(&claims, Resource::Cafe(cafe_id), Action::Create)?;
    let created = cafes::create_offer(
        &state.db,
        cafe_id,
        NewOffer {
            branch_id: payload.branch_id,
            title: payload.title,
            description: payload.description,
            discount_percent: payload.discount_percent,
            starts_at: payload.starts_at,
            ends_at: payload.ends_at,
        },
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

// ============ Seating ============

#[derive(Debug, Deserialize)]
pub struct CreateSectionRequest {
    pub name: String,
    pub section_type: SectionType,
    pub total_seats: i32,
    #[serde(default)]
    pub extra_cost: f64,
}

/// Add a seating section and generate its seats
pub async fn create_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(branch_id): Path<Uuid>,
    Json(payload): Json<CreateSectionRequest>,
) -> AppResult<(StatusCode, Json<SectionSeats>)> {
    authorize_branch(&state, &claims, branch_id, Action::Create).await?;
    let created = seats::create_section(
        &state.db,
        branch_id,
        NewSection {
            name: payload.name,
            section_type: payload.section_type,
            total_seats: payload.total_seats,
            extra_cost: payload.extra_cost,
        },
    )
    .await?;
    bust_branch_caches(&state, branch_id).await;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Seat map of a branch, including blocked seats
pub async fn branch_seats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<Vec<SectionSeats>>> {
    authorize_branch(&state, &claims, branch_id, Action::Read).await?;
    Ok(Json(seats::list_branch_seats(&state.db, branch_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    pub name: Option<String>,
    pub section_type: Option<SectionType>,
    pub extra_cost: Option<f64>,
}

/// Rename, retype or reprice a section
pub async fn update_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(section_id): Path<Uuid>,
    Json(payload): Json<UpdateSectionRequest>,
) -> AppResult<Json<SectionSeats>> {
    let branch_id = section_branch(&state, section_id).await?;
    authorize_branch(&state, &claims, branch_id, Action::Update).await?;
    let updated = seats::update_section(
        &state.db,
        section_id,
        SectionChanges {
            name: payload.name,
            section_type: payload.section_type,
            extra_cost: payload.extra_cost,
        },
    )
    .await?;
    bust_branch_caches(&state, branch_id).await;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ResizeSectionRequest {
    pub total_seats: i32,
}

/// Grow or shrink a section
pub async fn resize_section(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(section_id): Path<Uuid>,
    Json(payload): Json<ResizeSectionRequest>,
) -> AppResult<Json<ResizeOutcome>> {
    let branch_id = section_branch(&state, section_id).await?;
    authorize_branch(&state, &claims, branch_id, Action::Update).await?;
    let resized = seats::resize_section(&state.db, section_id, payload.total_seats).await?;
    bust_branch_caches(&state, branch_id).await;
    Ok(Json(resized))
}

#[derive(Debug, Deserialize)]
pub struct BlockSeatRequest {
    pub blocked: bool,
}

/// Block a seat or return it to service
pub async fn set_seat_blocked(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(seat_id): Path<Uuid>,
    Json(payload): Json<BlockSeatRequest>,
) -> AppResult<Json<seat::Model>> {
    let branch_id = seat_branch(&state, seat_id).await?;
    authorize_branch(&state, &claims, branch_id, Action::Update).await?;
    let seat = seats::set_seat_blocked(&state.db, seat_id, payload.blocked).await?;
    bust_branch_caches(&state, branch_id).await;
    Ok(Json(seat))
}

/// Remove a seat
pub async fn delete_seat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(seat_id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let branch_id = seat_branch(&state, seat_id).await?;
    authorize_branch(&state, &claims, branch_id, Action::Update).await?;
    seats::delete_seat(&state.db, seat_id).await?;
    bust_branch_caches(&state, branch_id).await;
    Ok(Json(serde_json::json!({ "message": "Seat deleted" })))
}

// ============ Matches ============

#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    pub branch_id: Uuid,
    pub home_team_id: i32,
    pub away_team_id: i32,
    pub match_date: NaiveDate,
    pub kick_off: NaiveTime,
    pub total_seats: Option<i32>,
    pub price_per_seat: f64,
    pub currency: Option<String>,
    pub duration_minutes: Option<i32>,
    pub booking_opens_at: Option<DateTime<Utc>>,
    pub booking_closes_at: Option<DateTime<Utc>>,
}

/// Schedule a match screening
pub async fn create_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateMatchRequest>,
) -> AppResult<(StatusCode, Json<matches::Model>)> {
    authorize_branch(&state, &claims, payload.branch_id, Action::Create).await?;
    let created = fixtures::create_match(
        &state.db,
        &state.config.booking,
        NewMatch {
            branch_id: payload.branch_id,
            home_team_id: payload.home_team_id,
            away_team_id: payload.away_team_id,
            match_date: payload.match_date,
            kick_off: payload.kick_off,
            total_seats: payload.total_seats,
            price_per_seat: payload.price_per_seat,
            currency: payload.currency,
            duration_minutes: payload.duration_minutes,
            booking_opens_at: payload.booking_opens_at,
            booking_closes_at: payload.booking_closes_at,
        },
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Open a draft match for booking
pub async fn publish_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<matches::Model>> {
    let game = load_match(&state, match_id).await?;
    authorize_branch(&state, &claims, game.branch_id, Action::Update).await?;
    let published = fixtures::publish_match(&state.db, match_id).await?;
    bust_branch_caches(&state, published.branch_id).await;
    Ok(Json(published))
}

#[derive(Debug, Deserialize)]
pub struct MatchStatusRequest {
    pub status: MatchStatus,
}

/// Move a match to its next status
pub async fn update_match_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(match_id): Path<Uuid>,
    Json(payload): Json<MatchStatusRequest>,
) -> AppResult<Json<MatchTransition>> {
    let game = load_match(&state, match_id).await?;
    authorize_branch(&state, &claims, game.branch_id, Action::Update).await?;
    let transition =
        fixtures::transition_match(&state.db, match_id, payload.status, Utc::now()).await?;
    bust_branch_caches(&state, game.branch_id).await;
    Ok(Json(transition))
}

/// Cancel a match and every booking on it
pub async fn cancel_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<MatchCancellation>> {
    let game = load_match(&state, match_id).await?;
    authorize_branch(&state, &claims, game.branch_id, Action::Cancel).await?;
    let mut outcome =
        fixtures::cancel_match(&state.db, state.gateway.as_ref(), match_id, Utc::now()).await?;
    bust_branch_caches(&state, game.branch_id).await;
    publish(&state, std::mem::take(&mut outcome.events));
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct SeatsAvailableRequest {
    pub seats_available: i32,
}

/// Correct the seat counter of a match by hand
pub async fn override_seats_available(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(match_id): Path<Uuid>,
    Json(payload): Json<SeatsAvailableRequest>,
) -> AppResult<Json<matches::Model>> {
    let game = load_match(&state, match_id).await?;
    authorize_branch(&state, &claims, game.branch_id, Action::Update).await?;
    let updated =
        fixtures::override_seats_available(&state.db, match_id, payload.seats_available).await?;
    bust_branch_caches(&state, game.branch_id).await;
    Ok(Json(updated))
}
