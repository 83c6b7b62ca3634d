//! Contact handlers
//!
//! Handles: list, create, get, update, delete

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use log::info;
use serde_json::{json, Value};

use super::Id;
use crate::api::error::{ApiError, ApiResult, OrInternal};
use crate::api::AppState;
use crate::core::{Contact, ContactInput};
use crate::features::contacts::{self, ContactListing, ContactQuery, ListParams};

pub async fn list_contacts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ContactListing>> {
    let query = ContactQuery::from_params(&params);
    let listing = contacts::list_contacts(&state.database, &query)
        .await
        .or_internal("Failed to retrieve contacts")?;
    Ok(Json(listing))
}

pub async fn create_contact(
    State(state): State<AppState>,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(input) = payload?;
    let contact = input.into_new_contact()?;
    let stored = state
        .database
        .insert_contact(&contact)
        .await
        .or_internal("Failed to save contact")?;

    info!("Created contact {} ({})", stored.id, stored.full_name());
    Ok(Json(json!({
        "message": "Contact created successfully",
        "contact": stored,
    })))
}

pub async fn get_contact(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Contact>> {
    contacts::load_contact(&state.database, id)
        .await
        .or_internal("Failed to retrieve contact")?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact"))
}

pub async fn update_contact(
    State(state): State<AppState>,
    Id(id): Id,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult<Json<Contact>> {
    let mut contact = state
        .database
        .get_contact(id)
        .await
        .or_internal("Failed to retrieve contact")?
        .ok_or_else(|| ApiError::not_found("Contact"))?;

    let Json(input) = payload?;
    input.apply_to(&mut contact)?;

    if !state
        .database
        .update_contact(&contact)
        .await
        .or_internal("Failed to save contact")?
    {
        return Err(ApiError::not_found("Contact"));
    }
    Ok(Json(contact))
}

pub async fn delete_contact(
    State(state): State<AppState>,
    Id(id): Id,
) -> ApiResult<Json<Value>> {
    if !state
        .database
        .delete_contact(id)
        .await
        .or_internal("Failed to delete contact")?
    {
        return Err(ApiError::not_found("Contact"));
    }
    info!("Deleted contact {id}");
    Ok(Json(json!({ "message": "Contact deleted" })))
}
