//! Authorization decisions keyed by (actor, resource, action).
//!
//! Handlers ask this module before touching the domain; entities and
//! services never inspect roles themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Staff,
    CafeOwner,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A booking owned by the given user, held at the given café.
    Booking { owner_id: Uuid, cafe_id: Uuid },
    /// Anything administered on behalf of a café (branches, seats, matches, staff, offers).
    Cafe(Uuid),
    /// Platform-wide catalogue data (plans, teams, cafés).
    Platform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Cancel,
    CheckIn,
}

pub fn is_allowed(actor: &Claims, resource: Resource, action: Action) -> bool {
    if actor.role == UserRole::Admin {
        return true;
    }

    match resource {
        Resource::Booking { owner_id, cafe_id } => match action {
            Action::Read => owner_id == actor.sub || works_for(actor, cafe_id),
            Action::Cancel => {
                owner_id == actor.sub
                    || (actor.role == UserRole::CafeOwner && actor.cafe_id == Some(cafe_id))
            }
            Action::CheckIn => works_for(actor, cafe_id),
            Action::Create | Action::Update => owner_id == actor.sub,
        },
        Resource::Cafe(cafe_id) => match action {
            Action::Read | Action::CheckIn => works_for(actor, cafe_id),
            Action::Create | Action::Update | Action::Cancel => {
                actor.role == UserRole::CafeOwner && actor.cafe_id == Some(cafe_id)
            }
        },
        Resource::Platform => action == Action::Read,
    }
}

pub fn authorize(actor: &Claims, resource: Resource, action: Action) -> AppResult<()> {
    if is_allowed(actor, resource, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "{:?} is not allowed to {:?} this resource",
            actor.role, action
        )))
    }
}

/// Café the actor acts for; staff and owners must carry one in their token.
pub fn acting_cafe(actor: &Claims) -> AppResult<Uuid> {
    actor
        .cafe_id
        .ok_or_else(|| AppError::Forbidden("Token is not scoped to a café".to_string()))
}

/// Café a staff request operates on. Admins name it explicitly; everyone
/// else is pinned to the café in their token.
pub fn cafe_scope(actor: &Claims, requested: Option<Uuid>) -> AppResult<Uuid> {
    if actor.role == UserRole::Admin {
        return requested
            .or(actor.cafe_id)
            .ok_or_else(|| AppError::BadRequest("cafe_id is required".to_string()));
    }
    let own = acting_cafe(actor)?;
    match requested {
        Some(cafe_id) if cafe_id != own => Err(AppError::Forbidden(
            "Token is scoped to a different café".to_string(),
        )),
        _ => Ok(own),
    }
}

fn works_for(actor: &Claims, cafe_id: Uuid) -> bool {
    matches!(actor.role, UserRole::Staff | UserRole::CafeOwner) && actor.cafe_id == Some(cafe_id)
}
