// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance routes: punching and listing.

use crate::db::AttendanceStore;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    Attendance, AttendancePage, AttendanceTime, NewPunch, PageParams, DEFAULT_PER_PAGE,
    MONTHLY_PER_PAGE,
};
use crate::time_utils::parse_month_key;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attendance routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes<S: AttendanceStore + Clone>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route(
            "/v1/attendances",
            get(list_attendances::<S>).post(create_or_update_attendance::<S>),
        )
        .route("/v1/attendances/monthly", get(list_monthly_attendances::<S>))
        .route("/v1/attendances/{id}/times", get(attendance_times::<S>))
}

// ─── Punch ───────────────────────────────────────────────────

/// Request body for a punch.
#[derive(Debug, Deserialize)]
pub struct PunchRequest {
    #[serde(default)]
    pub remark: String,
    /// When the button was pressed. Defaults to the time the request arrives.
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Record a clock-in or clock-out for the caller.
///
/// An empty body or a JSON `null` carries no punch and is rejected by the
/// service.
async fn create_or_update_attendance<S: AttendanceStore + Clone>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<Attendance>> {
    let request: Option<PunchRequest> = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("Invalid punch body: {}", e)))?
    };
    let punch = request.map(|request| {
        NewPunch::new(
            request.remark,
            request.pushed_at.unwrap_or_else(Utc::now),
        )
    });

    let attendance = state
        .attendance_service
        .create_or_update_attendance(&user.user_id, punch)
        .await?;

    Ok(Json(attendance))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ListQuery {
    page: Option<u32>,
    per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MonthlyQuery {
    /// Month in `YYYY-MM` form; the current month when absent.
    month: Option<String>,
    page: Option<u32>,
    per_page: Option<u32>,
}

/// Response for attendance listings.
#[derive(Serialize)]
pub struct AttendancesResponse {
    pub attendances: Vec<Attendance>,
    pub has_next: bool,
}

impl From<AttendancePage> for AttendancesResponse {
    fn from(page: AttendancePage) -> Self {
        Self {
            attendances: page.items,
            has_next: page.has_next,
        }
    }
}

async fn list_attendances<S: AttendanceStore + Clone>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListQuery>,
) -> Result<Json<AttendancesResponse>> {
    let page = PageParams::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    );

    let page = state
        .attendance_service
        .list_attendances(&user.user_id, page)
        .await?;

    Ok(Json(page.into()))
}

async fn list_monthly_attendances<S: AttendanceStore + Clone>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<MonthlyQuery>,
) -> Result<Json<AttendancesResponse>> {
    let zone = state.attendance_service.zone();
    let month_of = match params.month.as_deref() {
        Some(key) => parse_month_key(key, zone)
            .ok_or_else(|| AppError::Validation(format!("Invalid month: {:?}", key)))?,
        None => Utc::now(),
    };
    let page = PageParams::new(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(MONTHLY_PER_PAGE),
    );

    let page = state
        .attendance_service
        .list_monthly_attendances(&user.user_id, month_of, page)
        .await?;

    Ok(Json(page.into()))
}

/// Full punch history of one attendance, superseded rows included.
async fn attendance_times<S: AttendanceStore + Clone>(
    State(state): State<Arc<AppState<S>>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AttendanceTime>>> {
    let times = state
        .attendance_service
        .attendance_history(&user.user_id, &id)
        .await?;

    Ok(Json(times))
}
