pub mod admin;
pub mod bookings;
pub mod public;
pub mod staff;

use uuid::Uuid;

use crate::cache;
use crate::gateways::dispatch_events;
use crate::services::cafes;
use crate::services::events::DomainEvent;
use crate::AppResult;
use crate::AppState;

/// Hands events to the notifier without holding up the response.
pub(crate) fn publish(state: &AppState, events: Vec<DomainEvent>) {
    if events.is_empty() {
        return;
    }
    let sink = state.notifier.clone();
    tokio::spawn(async move {
        dispatch_events(&sink, &events).await;
    });
}

/// Drops cached views that depend on the bookings or seating of a branch.
pub(crate) async fn bust_branch_caches(state: &AppState, branch_id: Uuid) {
    let keys = cache::branch_cache_keys(branch_id);
    cache::invalidate_all(state.cache.as_ref(), &keys).await;
}

pub(crate) async fn cafe_of_branch(state: &AppState, branch_id: Uuid) -> AppResult<Uuid> {
    Ok(cafes::find_branch(&state.db, branch_id).await?.cafe_id)
}
