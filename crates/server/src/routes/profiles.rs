//! Profile API routes
//!
//! Thin HTTP layer over `ProfileStore`:
//! - list every profile
//! - profile details (config, resolved dependencies, validation)
//! - validate a profile
//! - create a profile
//!
//! Store calls hit the file system, so they run on the blocking pool.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use pack_manager_services::services::profile_store::{
    ProfileDetails, ProfileListing, ValidationReport, check_name,
};
use pack_manager_utils::response::ApiResponse;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{AppState, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route("/profile/{profile_name}", get(get_profile_details))
        .route("/validate/{profile_name}", post(validate_profile))
        .route("/create", post(create_profile))
}

/// GET /pack_manager/api/profiles
async fn list_profiles(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProfileListing>>, ApiError> {
    let store = state.store.clone();
    let listing = tokio::task::spawn_blocking(move || store.list_profiles()).await?;

    tracing::debug!(
        "Listed {} profiles ({} diagnostics)",
        listing.profiles.len(),
        listing.diagnostics.len()
    );
    Ok(Json(ApiResponse::success(listing)))
}

/// GET /pack_manager/api/profile/{profile_name}
async fn get_profile_details(
    Path(profile_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProfileDetails>>, ApiError> {
    check_name(&profile_name)?;
    let _guard = state.locks.read(&profile_name).await;

    let store = state.store.clone();
    let details =
        tokio::task::spawn_blocking(move || store.profile_details(&profile_name)).await??;

    Ok(Json(ApiResponse::success(details)))
}

/// POST /pack_manager/api/validate/{profile_name}
///
/// An unusable name is a validation failure, not a request error, so it is
/// answered without taking a lock.
async fn validate_profile(
    Path(profile_name): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ValidationReport>>, ApiError> {
    if let Err(e) = check_name(&profile_name) {
        let report = ValidationReport::new(&profile_name, vec![e.to_string()]);
        return Ok(Json(ApiResponse::success(report)));
    }
    let _guard = state.locks.read(&profile_name).await;

    let store = state.store.clone();
    let report =
        tokio::task::spawn_blocking(move || store.validation_report(&profile_name)).await?;

    Ok(Json(ApiResponse::success(report)))
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileBody {
    name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    extends: Vec<String>,
}

/// `"extends": null` means no parents
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Serialize)]
pub struct CreateProfileResponse {
    pub profile_name: String,
    pub message: String,
}

/// POST /pack_manager/api/create
async fn create_profile(
    State(state): State<AppState>,
    Json(payload): Json<CreateProfileBody>,
) -> Result<Json<ApiResponse<CreateProfileResponse>>, ApiError> {
    let Some(profile_name) = payload.name.filter(|name| !name.trim().is_empty()) else {
        return Err(ApiError::BadRequest("Profile name is required".to_string()));
    };

    check_name(&profile_name)?;
    let _guard = state.locks.write(&profile_name).await;

    let store = state.store.clone();
    let name = profile_name.clone();
    let extends = payload.extends;
    tokio::task::spawn_blocking(move || store.try_create_profile(&name, &extends)).await??;

    tracing::info!("Profile '{}' created via API", profile_name);
    Ok(Json(ApiResponse::success(CreateProfileResponse {
        message: format!("Profile '{profile_name}' created successfully"),
        profile_name,
    })))
}
