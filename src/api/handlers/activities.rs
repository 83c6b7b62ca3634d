use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::{ensure_contact, Id};
use crate::api::error::{ApiError, ApiResult, OrInternal};
use crate::api::AppState;
use crate::core::{Activity, ActivityInput};

/// 400 if any participant does not exist.
async fn ensure_participants(state: &AppState, activity: &Activity) -> ApiResult<()> {
    let missing = state
        .database
        .missing_contacts(&activity.contact_ids)
        .await
        .or_internal("Failed to look up contacts")?;
    if let Some(id) = missing.first() {
        return Err(ApiError::BadRequest(format!(
            "Related contact not found: {id}"
        )));
    }
    Ok(())
}

pub async fn list_activities(
    State(state): State<AppState>,
    Id(contact_id): Id,
) -> ApiResult<Json<Vec<Activity>>> {
    ensure_contact(&state, contact_id).await?;
    let activities = state
        .database
        .activities_for_contacts(&[contact_id])
        .await
        .or_internal("Failed to retrieve activities")?
        .remove(&contact_id)
        .unwrap_or_default();
    Ok(Json(activities))
}

pub async fn create_activity(
    State(state): State<AppState>,
    Id(contact_id): Id,
    payload: Result<Json<ActivityInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    ensure_contact(&state, contact_id).await?;
    let Json(input) = payload?;
    let activity = input.into_new_activity(contact_id, Utc::now().date_naive())?;
    ensure_participants(&state, &activity).await?;

    let stored = state
        .database
        .insert_activity(&activity)
        .await
        .or_internal("Failed to save activity")?;
    Ok(Json(json!({
        "message": "Activity created successfully",
        "activity": stored,
    })))
}

pub async fn update_activity(
    State(state): State<AppState>,
    Id(id): Id,
    payload: Result<Json<ActivityInput>, JsonRejection>,
) -> ApiResult<Json<Activity>> {
    let mut activity = state
        .database
        .get_activity(id)
        .await
        .or_internal("Failed to retrieve activity")?
        .ok_or_else(|| ApiError::not_found("Activity"))?;
    let Json(input) = payload?;
    input.apply_to(&mut activity)?;
    ensure_participants(&state, &activity).await?;

    state
        .database
        .update_activity(&activity)
        .await
        .or_internal("Failed to save activity")?;
    Ok(Json(activity))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Value>> {
    if !state
        .database
        .delete_activity(id)
        .await
        .or_internal("Failed to delete activity")?
    {
        return Err(ApiError::not_found("Activity"));
    }
    Ok(Json(json!({ "message": "Activity deleted" })))
}
