use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{booking, payment};
use crate::error::AppResult;
use crate::handlers::{bust_branch_caches, cafe_of_branch, publish};
use crate::policy::{self, Action, Resource};
use crate::services::booking::{
    self as bookings, BookingDetails, CancelActor, CostBreakdown, NewBooking,
};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub match_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub guests_count: Option<i32>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    #[serde(flatten)]
    pub details: BookingDetails,
    pub cost: CostBreakdown,
}

/// Book seats for a match
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<CreateBookingResponse>)> {
    let outcome = bookings::create_booking(
        &state.db,
        &state.config.booking,
        claims.sub,
        NewBooking {
            match_id: payload.match_id,
            seat_ids: payload.seat_ids,
            guests_count: payload.guests_count,
            special_requests: payload.special_requests,
        },
        Utc::now(),
    )
    .await?;

    let created = &outcome.details.booking;
    bust_branch_caches(&state, created.branch_id).await;
    publish(&state, outcome.events);

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            details: outcome.details,
            cost: outcome.cost,
        }),
    ))
}

/// The caller's bookings, newest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingDetails>>> {
    Ok(Json(bookings::list_user_bookings(&state.db, claims.sub).await?))
}

async fn booking_resource(state: &AppState, booking: &booking::Model) -> AppResult<Resource> {
    Ok(Resource::Booking {
        owner_id: booking.user_id,
        cafe_id: cafe_of_branch(state, booking.branch_id).await?,
    })
}

/// Get one booking
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingDetails>> {
    let details = bookings::get_booking_details(&state.db, booking_id).await?;
    let resource = booking_resource(&state, &details.booking).await?;
    policy::authorize(&claims, resource, Action::Read)?;
    Ok(Json(details))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelBookingResponse {
    pub booking: booking::Model,
    pub seats_released: usize,
    pub refunded: bool,
}

/// Cancel a booking. Owners cancel as customers; café owners and admins
/// cancel on behalf of the venue.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<CancelBookingRequest>>,
) -> AppResult<Json<CancelBookingResponse>> {
    let current = bookings::get_booking_details(&state.db, booking_id).await?.booking;
    let actor = if current.user_id == claims.sub {
        CancelActor::Customer(claims.sub)
    } else {
        let resource = booking_resource(&state, &current).await?;
        policy::authorize(&claims, resource, Action::Cancel)?;
        CancelActor::Venue
    };
    let reason = payload
        .and_then(|Json(body)| body.reason)
        .filter(|r| !r.trim().is_empty());

    let outcome = bookings::cancel_booking(
        &state.db,
        state.gateway.as_ref(),
        booking_id,
        actor,
        reason,
        Utc::now(),
    )
    .await?;

    bust_branch_caches(&state, outcome.booking.branch_id).await;
    publish(&state, outcome.events);

    Ok(Json(CancelBookingResponse {
        booking: outcome.booking,
        seats_released: outcome.seats_released,
        refunded: outcome.refunded,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PayBookingRequest {
    pub method: String,
}

/// Pay for a booking through the payment gateway
pub async fn pay_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<PayBookingRequest>,
) -> AppResult<Json<payment::Model>> {
    let outcome = bookings::capture_payment(
        &state.db,
        state.gateway.as_ref(),
        booking_id,
        claims.sub,
        &payload.method,
        Utc::now(),
    )
    .await?;

    publish(&state, outcome.events);
    Ok(Json(outcome.payment))
}
