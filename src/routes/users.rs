// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User profile routes.

use crate::db::AttendanceStore;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{User, UserUpdate};
use crate::services::UserProfile;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use std::sync::Arc;

pub fn routes<S: AttendanceStore + Clone>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/v1/users/mine", get(get_mine::<S>))
        .route("/v1/users/{id}", put(update_user::<S>))
}

/// The caller's profile plus today's attendance. Creates the profile on first call.
async fn get_mine<S: AttendanceStore + Clone>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .user_service
        .get_or_create_user(&user.user_id, Utc::now())
        .await?;

    Ok(Json(profile))
}

async fn update_user<S: AttendanceStore + Clone>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<User>> {
    // Other users' profiles are indistinguishable from missing ones
    if id != user.user_id {
        return Err(AppError::NotFound(format!("User {} not found", id)));
    }

    let updated = state
        .user_service
        .update_user(&user.user_id, update, Utc::now())
        .await?;

    tracing::info!(user_id = %updated.id, "User profile updated");
    Ok(Json(updated))
}
