use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};

use super::{ensure_contact, Id};
use crate::api::error::{ApiError, ApiResult, OrInternal};
use crate::api::AppState;
use crate::core::{Relationship, RelationshipInput};

/// 400 if the relationship points at a contact that does not exist.
async fn ensure_related(state: &AppState, relationship: &Relationship) -> ApiResult<()> {
    let Some(related) = relationship.related_contact_id else {
        return Ok(());
    };
    if state
        .database
        .contact_exists(related)
        .await
        .or_internal("Failed to look up contact")?
    {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Related contact not found".to_string()))
    }
}

pub async fn list_relationships(
    State(state): State<AppState>,
    Id(contact_id): Id,
) -> ApiResult<Json<Vec<Relationship>>> {
    ensure_contact(&state, contact_id).await?;
    let relationships = state
        .database
        .relationships_for_contacts(&[contact_id])
        .await
        .or_internal("Failed to retrieve relationships")?
        .remove(&contact_id)
        .unwrap_or_default();
    Ok(Json(relationships))
}

pub async fn create_relationship(
    State(state): State<AppState>,
    Id(contact_id): Id,
    payload: Result<Json<RelationshipInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    ensure_contact(&state, contact_id).await?;
    let Json(input) = payload?;
    let relationship = input.into_new_relationship(contact_id)?;
    ensure_related(&state, &relationship).await?;

    let stored = state
        .database
        .insert_relationship(&relationship)
        .await
        .or_internal("Failed to save relationship")?;
    Ok(Json(json!({
        "message": "Relationship created successfully",
        "relationship": stored,
    })))
}

pub async fn update_relationship(
    State(state): State<AppState>,
    Id(id): Id,
    payload: Result<Json<RelationshipInput>, JsonRejection>,
) -> ApiResult<Json<Relationship>> {
    let mut relationship = state
        .database
        .get_relationship(id)
        .await
        .or_internal("Failed to retrieve relationship")?
        .ok_or_else(|| ApiError::not_found("Relationship"))?;
    let Json(input) = payload?;
    input.apply_to(&mut relationship)?;
    ensure_related(&state, &relationship).await?;

    state
        .database
        .update_relationship(&relationship)
        .await
        .or_internal("Failed to save relationship")?;
    Ok(Json(relationship))
}

pub async fn delete_relationship(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Value>> {
    if !state
        .database
        .delete_relationship(id)
        .await
        .or_internal("Failed to delete relationship")?
    {
        return Err(ApiError::not_found("Relationship"));
    }
    Ok(Json(json!({ "message": "Relationship deleted" })))
}
