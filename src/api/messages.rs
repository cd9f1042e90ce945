//! Message endpoints that go beyond the generic CRUD set.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use super::resource::fields_of;
use crate::errors::{AppError, AppJson};
use crate::logsink::LogKind;
use crate::models::{Message, MessageUpdate, Resource, UpdateAck, LIKES_FIELD};
use crate::AppState;

/// Upper bound for a single `$inc` directive.
pub const MAX_LIKES_PER_REQUEST: i64 = 100;

/// PUT /api/mensajes/:id - Edit a message or apply a `$inc` likes directive.
pub async fn update_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(update): AppJson<MessageUpdate>,
) -> Result<Json<UpdateAck>, AppError> {
    let ack = match update.increment {
        Some(increment) => {
            if update.fields.texto.is_some() {
                return Err(AppError::Validation(
                    "$inc cannot be combined with field updates".to_string(),
                ));
            }
            let matched = add_likes(&state, &id, increment.likes).await?;
            UpdateAck::new(matched, matched)
        }
        None => {
            let fields = fields_of(&update.fields)?;
            let outcome = state
                .store
                .update_by_id(Message::COLLECTION, &id, &fields)
                .await?;
            UpdateAck::new(outcome.matched, outcome.modified)
        }
    };

    Ok(Json(ack))
}

/// POST /api/mensajes/:id/like - Add one like.
pub async fn like_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UpdateAck>, AppError> {
    let matched = add_likes(&state, &id, 1).await?;
    Ok(Json(UpdateAck::new(matched, matched)))
}

async fn add_likes(state: &AppState, id: &str, amount: i64) -> Result<u64, AppError> {
    if !(1..=MAX_LIKES_PER_REQUEST).contains(&amount) {
        return Err(AppError::Validation(format!(
            "Likes can only be incremented by 1 to {}, got {}",
            MAX_LIKES_PER_REQUEST, amount
        )));
    }

    let matched = state
        .store
        .increment_by_id(Message::COLLECTION, id, LIKES_FIELD, amount)
        .await?;
    state.log(
        LogKind::Debug,
        "Message liked",
        json!({ "id": id, "amount": amount }),
    );

    Ok(matched)
}
