// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence contract for attendances and users.
//!
//! Writes for one punch go through a [`StoreTx`] opened with
//! [`AttendanceStore::begin`]. A unit of work is serialized against every
//! other unit of work for the same user, and nothing it wrote is visible
//! until [`StoreTx::commit`] succeeds. Dropping a unit of work without
//! committing discards its writes.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{Attendance, AttendanceKind, AttendanceTime, PageParams, User};
use crate::time_utils::DayWindow;

/// Store operations, named for fault injection and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Begin,
    FetchLatest,
    CreateAttendance,
    InvalidateTime,
    InsertTime,
    Commit,
    Read,
    CreateUser,
    UpdateUser,
}

/// Fields of a punch row before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRecord {
    pub remark: String,
    pub pushed_at: DateTime<Utc>,
    /// Write timestamp for `created_at` / `updated_at`
    pub recorded_at: DateTime<Utc>,
}

/// One serialized unit of work for a single user.
pub trait StoreTx: Send {
    /// Latest attendance created inside `window`, with its active punches resolved.
    fn fetch_latest_attendance(
        &mut self,
        user_id: &str,
        window: &DayWindow,
    ) -> impl Future<Output = Result<Option<Attendance>, AppError>> + Send;

    /// Insert an attendance together with its active clock-in row.
    ///
    /// The attendance's `created_at` is the clock-in's `pushed_at`.
    fn create_attendance(
        &mut self,
        user_id: &str,
        clock_in: TimeRecord,
    ) -> impl Future<Output = Result<Attendance, AppError>> + Send;

    /// Retire the active row of `kind` for the attendance. No-op when none is active.
    fn invalidate_active_time(
        &mut self,
        attendance_id: &str,
        kind: AttendanceKind,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Insert a new active row of `kind`.
    fn insert_time(
        &mut self,
        attendance_id: &str,
        kind: AttendanceKind,
        record: TimeRecord,
    ) -> impl Future<Output = Result<AttendanceTime, AppError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn rollback(self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Backing store for attendances, their punch history, and users.
pub trait AttendanceStore: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Open a unit of work for `user_id`, waiting for any other one on that user.
    fn begin(&self, user_id: &str) -> impl Future<Output = Result<Self::Tx, AppError>> + Send;

    /// Count a user's attendances, optionally restricted to those created in `range`.
    fn count_attendances(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
    ) -> impl Future<Output = Result<u64, AppError>> + Send;

    /// A page of a user's attendances, newest first.
    fn list_attendances(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
        page: PageParams,
    ) -> impl Future<Output = Result<Vec<Attendance>, AppError>> + Send;

    /// One attendance by id, with active punches resolved.
    fn get_attendance(
        &self,
        attendance_id: &str,
    ) -> impl Future<Output = Result<Option<Attendance>, AppError>> + Send;

    /// Every punch row ever written for an attendance, oldest first.
    fn attendance_times(
        &self,
        attendance_id: &str,
    ) -> impl Future<Output = Result<Vec<AttendanceTime>, AppError>> + Send;

    fn get_user(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<User>, AppError>> + Send;

    /// Insert `user` unless its id is already stored. Returns the stored user,
    /// which is the existing one when another writer got there first.
    fn create_user(&self, user: &User) -> impl Future<Output = Result<User, AppError>> + Send;

    /// Overwrite an existing user. `NotFound` if the id was never stored.
    fn update_user(&self, user: &User) -> impl Future<Output = Result<(), AppError>> + Send;
}
