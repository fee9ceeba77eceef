use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, bookings, public, staff};
use crate::middleware::auth::{auth_middleware, require_manager, require_staff};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let customer_governor = create_role_governor(RateLimitedRole::Customer);
    let staff_governor = create_role_governor(RateLimitedRole::Staff);
    let public_governor = create_public_governor();

    // Anonymous browsing, limited per IP
    let public_routes = Router::new()
        .route("/matches", get(public::list_matches))
        .route("/matches/{id}", get(public::get_match))
        .route("/matches/{id}/seats", get(public::match_seats))
        .route("/teams", get(public::list_teams))
        .route("/plans", get(public::list_plans))
        .layer(public_governor);

    // Any authenticated user can book; limited per user
    let booking_routes = Router::new()
        .route("/", post(bookings::create_booking).get(bookings::my_bookings))
        .route("/{id}", get(bookings::get_booking).delete(bookings::cancel_booking))
        .route("/{id}/pay", post(bookings::pay_booking))
        .layer(customer_governor)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Door staff: check-in and live occupancy
    let staff_routes = Router::new()
        .route("/scan", post(staff::scan_qr))
        .route("/scans", get(staff::scan_logs))
        .route("/branches/{id}/occupancy", get(staff::branch_occupancy))
        .route("/admission/{kind}", get(staff::check_admission))
        .layer(staff_governor)
        .layer(middleware::from_fn(require_staff))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Café owners and platform admins. Platform-wide endpoints are further
    // restricted to admins by policy.
    let admin_routes = Router::new()
        // Platform catalogue
        .route("/cafes", post(admin::create_cafe))
        .route("/teams", post(admin::create_team))
        .route("/plans", post(admin::create_plan))
        .route("/cafes/{id}/subscriptions", post(admin::subscribe_cafe))
        .route("/payments/expire", post(admin::expire_payments))
        // Café administration
        .route("/cafes/{id}/branches", post(admin::create_branch))
        .route("/cafes/{id}/staff", post(admin::add_staff))
        .route("/cafes/{id}/offers", post(admin::create_offer))
        // Seating
        .route("/branches/{id}/sections", post(admin::create_section))
        .route("/branches/{id}/seats", get(admin::branch_seats))
        .route("/sections/{id}", put(admin::update_section))
        .route("/sections/{id}/size", put(admin::resize_section))
        .route("/seats/{id}", delete(admin::delete_seat))
        .route("/seats/{id}/blocked", put(admin::set_seat_blocked))
        // Matches
        .route("/matches", post(admin::create_match))
        .route("/matches/{id}/publish", post(admin::publish_match))
        .route("/matches/{id}/status", put(admin::update_match_status))
        .route("/matches/{id}/cancel", post(admin::cancel_match))
        .route(
            "/matches/{id}/seats-available",
            put(admin::override_seats_available),
        )
        .layer(middleware::from_fn(require_manager))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", public_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/staff", staff_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
