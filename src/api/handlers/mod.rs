//! REST handlers, one module per resource
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0

pub mod activities;
pub mod contacts;
pub mod notes;
pub mod relationships;
pub mod reminders;
pub mod system;

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use super::error::{ApiError, ApiResult, OrInternal};
use super::AppState;

/// Numeric `{id}` path segment. Bad ids are rejected with the JSON error body.
pub struct Id(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for Id {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state).await?;
        Ok(Id(id))
    }
}

/// 404 unless contact `id` exists.
pub(crate) async fn ensure_contact(state: &AppState, id: i64) -> ApiResult<()> {
    if state
        .database
        .contact_exists(id)
        .await
        .or_internal("Failed to look up contact")?
    {
        Ok(())
    } else {
        Err(ApiError::not_found("Contact"))
    }
}
