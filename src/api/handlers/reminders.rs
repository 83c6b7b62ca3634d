//! Reminder handlers
//!
//! Handles: create, list for contact, get, update, delete, complete

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use log::{debug, info};
use serde_json::{json, Value};

use super::{ensure_contact, Id};
use crate::api::error::{ApiError, ApiResult, OrInternal};
use crate::api::AppState;
use crate::core::{Reminder, ReminderInput};
use crate::features::reminders;

async fn load_reminder(state: &AppState, id: i64) -> ApiResult<Reminder> {
    state
        .database
        .get_reminder(id)
        .await
        .or_internal("Failed to retrieve reminder")?
        .ok_or_else(|| ApiError::not_found("Reminder"))
}

pub async fn create_reminder(
    State(state): State<AppState>,
    Id(contact_id): Id,
    payload: Result<Json<ReminderInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    ensure_contact(&state, contact_id).await?;
    let Json(input) = payload?;
    let reminder = input.into_new_reminder(contact_id)?;
    let stored = state
        .database
        .insert_reminder(&reminder)
        .await
        .or_internal("Failed to save reminder")?;

    info!(
        "Created {} reminder {} for contact {contact_id} due {}",
        stored.recurrence, stored.id, stored.date
    );
    Ok(Json(json!({
        "message": "Reminder created successfully",
        "reminder": stored,
    })))
}

pub async fn list_reminders(
    State(state): State<AppState>,
    Id(contact_id): Id,
) -> ApiResult<Json<Value>> {
    ensure_contact(&state, contact_id).await?;
    let reminders = state
        .database
        .reminders_for_contacts(&[contact_id])
        .await
        .or_internal("Failed to retrieve reminders")?
        .remove(&contact_id)
        .unwrap_or_default();
    Ok(Json(json!({ "reminders": reminders })))
}

pub async fn get_reminder(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Reminder>> {
    Ok(Json(load_reminder(&state, id).await?))
}

pub async fn update_reminder(
    State(state): State<AppState>,
    Id(id): Id,
    payload: Result<Json<ReminderInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let mut reminder = load_reminder(&state, id).await?;
    let Json(input) = payload?;
    input.apply_to(&mut reminder)?;
    state
        .database
        .update_reminder(&reminder)
        .await
        .or_internal("Failed to save reminder")?;
    Ok(Json(json!({
        "message": "Reminder updated successfully",
        "reminder": reminder,
    })))
}

pub async fn delete_reminder(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Value>> {
    if !state
        .database
        .delete_reminder(id)
        .await
        .or_internal("Failed to delete reminder")?
    {
        return Err(ApiError::not_found("Reminder"));
    }
    Ok(Json(json!({ "message": "Reminder deleted" })))
}

/// Close a one-off reminder or roll a recurring one forward.
pub async fn complete_reminder(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Value>> {
    let mut reminder = load_reminder(&state, id).await?;
    if reminder.completed {
        return Err(ApiError::BadRequest(
            "Reminder is already completed".to_string(),
        ));
    }
    reminders::complete(&mut reminder, Utc::now());
    state
        .database
        .update_reminder(&reminder)
        .await
        .or_internal("Failed to save reminder")?;

    debug!(
        "Reminder {id} completed (closed: {}, next: {})",
        reminder.completed, reminder.date
    );
    Ok(Json(json!({
        "message": "Reminder completed",
        "reminder": reminder,
    })))
}
