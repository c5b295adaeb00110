// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance service: the only entry point that writes punches.
//!
//! A punch runs as one unit of work:
//! 1. Compute the punch's day window in the configured zone
//! 2. Fetch the latest attendance inside that window
//! 3. Resolve the punch into a [`PunchEffect`]
//! 4. Apply the effect (create, or invalidate + insert)
//! 5. Commit, or roll back on any failure

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use validator::Validate;

use crate::db::{AttendanceStore, StoreTx};
use crate::error::{AppError, Result};
use crate::models::{Attendance, AttendanceKind, AttendancePage, AttendanceTime, NewPunch, PageParams};
use crate::services::resolver::{self, PunchEffect};
use crate::time_utils::{local_date, DayWindow};

/// Records punches and serves attendance listings.
#[derive(Clone)]
pub struct AttendanceService<S> {
    store: S,
    zone: Tz,
}

impl<S: AttendanceStore> AttendanceService<S> {
    pub fn new(store: S, zone: Tz) -> Self {
        Self { store, zone }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The process-wide zone that defines calendar days.
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Record a punch and return the resulting attendance.
    ///
    /// `punch` is `None` when the caller supplied no payload, which is rejected
    /// like an empty user id. Nothing touches the store until both checks and
    /// field validation pass.
    pub async fn create_or_update_attendance(
        &self,
        user_id: &str,
        punch: Option<NewPunch>,
    ) -> Result<Attendance> {
        if user_id.is_empty() {
            return Err(AppError::InvalidArgument("user id is empty".to_string()));
        }
        let punch = punch
            .ok_or_else(|| AppError::InvalidArgument("attendance time is empty".to_string()))?;
        punch.validate()?;

        let window = DayWindow::for_instant(punch.pushed_at, self.zone);
        let mut tx = self.store.begin(user_id).await?;

        match self.apply_punch(&mut tx, user_id, &punch, &window).await {
            Ok(attendance) => {
                tx.commit().await?;
                tracing::info!(
                    user_id,
                    attendance_id = %attendance.id,
                    date = %local_date(punch.pushed_at, self.zone),
                    clocked_out = attendance.is_clocked_out(),
                    "Punch recorded"
                );
                Ok(attendance)
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Punch failed, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(user_id, error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn apply_punch(
        &self,
        tx: &mut S::Tx,
        user_id: &str,
        punch: &NewPunch,
        window: &DayWindow,
    ) -> Result<Attendance> {
        let existing = tx.fetch_latest_attendance(user_id, window).await?;
        let effect = resolver::resolve(existing, punch, Utc::now());

        tracing::debug!(user_id, kind = %effect.kind(), "Resolved punch");

        match effect {
            PunchEffect::CreateAttendance { clock_in } => {
                tx.create_attendance(user_id, clock_in).await
            }
            PunchEffect::AppendClockOut {
                mut attendance,
                clock_out,
            } => {
                let recorded_at = clock_out.recorded_at;
                tx.invalidate_active_time(&attendance.id, AttendanceKind::ClockOut, recorded_at)
                    .await?;
                let time = tx
                    .insert_time(&attendance.id, AttendanceKind::ClockOut, clock_out)
                    .await?;
                attendance.clocked_out = Some(time);
                attendance.updated_at = recorded_at;
                Ok(attendance)
            }
        }
    }

    /// The user's attendance for the local day containing `at`, if any.
    pub async fn latest_attendance(
        &self,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<Attendance>> {
        if user_id.is_empty() {
            return Err(AppError::InvalidArgument("user id is empty".to_string()));
        }

        let window = DayWindow::for_instant(at, self.zone);
        let mut tx = self.store.begin(user_id).await?;
        let latest = tx.fetch_latest_attendance(user_id, &window).await;
        tx.rollback().await?;
        latest
    }

    /// All of a user's attendances, newest first.
    pub async fn list_attendances(&self, user_id: &str, page: PageParams) -> Result<AttendancePage> {
        self.list(user_id, None, page).await
    }

    /// Attendances created in the local calendar month containing `month_of`.
    pub async fn list_monthly_attendances(
        &self,
        user_id: &str,
        month_of: DateTime<Utc>,
        page: PageParams,
    ) -> Result<AttendancePage> {
        let month = DayWindow::month_of(month_of, self.zone);
        self.list(user_id, Some(month), page).await
    }

    async fn list(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
        page: PageParams,
    ) -> Result<AttendancePage> {
        if user_id.is_empty() {
            return Err(AppError::InvalidArgument("user id is empty".to_string()));
        }
        page.validate()?;

        let total = self.store.count_attendances(user_id, range).await?;
        let items = self.store.list_attendances(user_id, range, page).await?;

        tracing::debug!(
            user_id,
            total,
            page = page.page,
            returned = items.len(),
            "Listed attendances"
        );

        Ok(AttendancePage {
            items,
            has_next: page.has_next(total),
        })
    }

    /// Every punch recorded against one of the user's attendances, oldest first.
    pub async fn attendance_history(
        &self,
        user_id: &str,
        attendance_id: &str,
    ) -> Result<Vec<AttendanceTime>> {
        let not_found = || AppError::NotFound(format!("Attendance {} not found", attendance_id));

        let attendance = self
            .store
            .get_attendance(attendance_id)
            .await?
            .ok_or_else(not_found)?;
        if attendance.user_id != user_id {
            return Err(not_found());
        }

        self.store.attendance_times(attendance_id).await
    }
}
