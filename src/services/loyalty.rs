//! Loyalty cards: points awarded per booking, reversed on cancellation.
//!
//! Balances move with the booking transaction that caused them, and every
//! change appends a ledger row.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::loyalty_card::{self, LoyaltyTier};
use crate::entities::loyalty_transaction::{self, TransactionKind};
use crate::error::{AppError, AppResult};

async fn card_for_update<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<Option<loyalty_card::Model>> {
    Ok(loyalty_card::Entity::find()
        .filter(loyalty_card::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(conn)
        .await?)
}

/// Loads and locks the user's card, opening an empty bronze card if none
/// exists. Two first bookings racing here both end up on the same card.
pub async fn get_or_create_card<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<loyalty_card::Model> {
    let now = Utc::now();
    let blank = loyalty_card::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        points: Set(0),
        total_points_earned: Set(0),
        tier: Set(LoyaltyTier::Bronze),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    loyalty_card::Entity::insert(blank)
        .on_conflict(
            OnConflict::column(loyalty_card::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    card_for_update(conn, user_id)
        .await?
        .ok_or_else(|| AppError::Internal("Loyalty card missing after insert".to_string()))
}

/// Credits `points` for a booking and returns the updated card.
pub async fn award_points<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    booking_id: Uuid,
    points: i32,
    description: &str,
) -> AppResult<loyalty_card::Model> {
    let card = get_or_create_card(conn, user_id).await?;
    if points <= 0 {
        return Ok(card);
    }

    let total_earned = card.total_points_earned + points;
    let balance = card.points + points;
    let card_id = card.id;

    let mut active: loyalty_card::ActiveModel = card.into();
    active.points = Set(balance);
    active.total_points_earned = Set(total_earned);
    active.tier = Set(LoyaltyTier::for_points(total_earned));
    active.updated_at = Set(Utc::now().into());
    let card = active.update(conn).await?;

    append_transaction(
        conn,
        card_id,
        Some(booking_id),
        points,
        TransactionKind::Earned,
        description,
    )
    .await?;

    Ok(card)
}

/// Takes back points previously awarded for a booking. The balance never
/// drops below zero; the ledger records what was actually deducted.
pub async fn reverse_points<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    booking_id: Uuid,
    points: i32,
    description: &str,
) -> AppResult<i32> {
    if points <= 0 {
        return Ok(0);
    }
    let Some(card) = card_for_update(conn, user_id).await? else {
        return Ok(0);
    };

    let deducted = points.min(card.points.max(0));
    let card_id = card.id;
    let balance = card.points - deducted;

    let mut active: loyalty_card::ActiveModel = card.into();
    active.points = Set(balance);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;

    append_transaction(
        conn,
        card_id,
        Some(booking_id),
        -deducted,
        TransactionKind::Reversed,
        description,
    )
    .await?;

    Ok(deducted)
}

async fn append_transaction<C: ConnectionTrait>(
    conn: &C,
    card_id: Uuid,
    booking_id: Option<Uuid>,
    points: i32,
    kind: TransactionKind,
    description: &str,
) -> AppResult<()> {
    loyalty_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        card_id: Set(card_id),
        booking_id: Set(booking_id),
        points: Set(points),
        kind: Set(kind),
        description: Set(description.to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await?;
    Ok(())
}
