use axum::http::Request;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
    GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::policy::UserRole;
use crate::utils::jwt::Claims;

/// Whose budget a request draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorKey {
    User(Uuid),
    /// Every scanner at a café shares one budget.
    Venue(Uuid),
}

impl ActorKey {
    pub fn for_claims(claims: &Claims) -> Self {
        match (claims.role, claims.cafe_id) {
            (UserRole::Staff | UserRole::CafeOwner, Some(cafe_id)) => ActorKey::Venue(cafe_id),
            _ => ActorKey::User(claims.sub),
        }
    }
}

/// Keys requests by the authenticated actor. Runs after `auth_middleware`.
#[derive(Debug, Clone, Copy)]
pub struct ActorKeyExtractor;

impl KeyExtractor for ActorKeyExtractor {
    type Key = ActorKey;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<Claims>()
            .map(ActorKey::for_claims)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    ActorKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Audiences with their own budget. Venue configuration routes are only
/// covered by the global concurrency limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedRole {
    /// Booking, cancelling and paying: 60 per minute per user.
    Customer,
    /// Door scanning bursts at kick-off: 600 per minute per café.
    Staff,
}

pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = match role {
        RateLimitedRole::Customer => (1000, 60),
        RateLimitedRole::Staff => (100, 600),
    };

    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(ActorKeyExtractor)
            .finish()
            .expect("role governor config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}
