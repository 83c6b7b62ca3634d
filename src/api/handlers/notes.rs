use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::{ensure_contact, Id};
use crate::api::error::{ApiError, ApiResult, OrInternal};
use crate::api::AppState;
use crate::core::{Note, NoteInput};

pub async fn list_notes(
    State(state): State<AppState>,
    Id(contact_id): Id,
) -> ApiResult<Json<Vec<Note>>> {
    ensure_contact(&state, contact_id).await?;
    let notes = state
        .database
        .notes_for_contacts(&[contact_id])
        .await
        .or_internal("Failed to retrieve notes")?
        .remove(&contact_id)
        .unwrap_or_default();
    Ok(Json(notes))
}

pub async fn create_note(
    State(state): State<AppState>,
    Id(contact_id): Id,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    ensure_contact(&state, contact_id).await?;
    let Json(input) = payload?;
    let note = input.into_new_note(contact_id, Utc::now().date_naive())?;
    let stored = state
        .database
        .insert_note(&note)
        .await
        .or_internal("Failed to save note")?;
    Ok(Json(json!({
        "message": "Note created successfully",
        "note": stored,
    })))
}

pub async fn update_note(
    State(state): State<AppState>,
    Id(id): Id,
    payload: Result<Json<NoteInput>, JsonRejection>,
) -> ApiResult<Json<Note>> {
    let mut note = state
        .database
        .get_note(id)
        .await
        .or_internal("Failed to retrieve note")?
        .ok_or_else(|| ApiError::not_found("Note"))?;
    let Json(input) = payload?;
    input.apply_to(&mut note)?;
    state
        .database
        .update_note(&note)
        .await
        .or_internal("Failed to save note")?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Value>> {
    if !state
        .database
        .delete_note(id)
        .await
        .or_internal("Failed to delete note")?
    {
        return Err(ApiError::not_found("Note"));
    }
    Ok(Json(json!({ "message": "Note deleted" })))
}
