// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store for tests and local development.
//!
//! A unit of work takes the store-wide lock and edits a private copy of the
//! state. Commit swaps the copy in; rollback or drop throws it away, so a
//! failed punch never leaves a partial write behind.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::store::{AttendanceStore, StoreOp, StoreTx, TimeRecord};
use crate::error::AppError;
use crate::models::{Attendance, AttendanceKind, AttendanceTime, PageParams, User};
use crate::time_utils::DayWindow;

#[derive(Debug, Clone)]
struct AttendanceRow {
    id: String,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    attendances: Vec<AttendanceRow>,
    times: Vec<AttendanceTime>,
    users: HashMap<String, User>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn active_time(&self, attendance_id: &str, kind: AttendanceKind) -> Option<&AttendanceTime> {
        self.times
            .iter()
            .find(|t| t.attendance_id == attendance_id && t.kind == kind && t.is_active())
    }

    /// Join an attendance row with its active punches.
    fn resolve(&self, row: &AttendanceRow) -> Option<Attendance> {
        let clocked_in = self.active_time(&row.id, AttendanceKind::ClockIn)?.clone();
        let clocked_out = self.active_time(&row.id, AttendanceKind::ClockOut).cloned();
        Some(Attendance {
            id: row.id.clone(),
            user_id: row.user_id.clone(),
            clocked_in,
            clocked_out,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    /// A user's rows, newest `created_at` first.
    fn rows_for<'a>(
        &'a self,
        user_id: &'a str,
        range: Option<DayWindow>,
    ) -> impl Iterator<Item = &'a AttendanceRow> + 'a {
        self.attendances
            .iter()
            .rev()
            .filter(move |a| a.user_id == user_id)
            .filter(move |a| range.map_or(true, |w| w.contains(a.created_at)))
    }
}

/// Thread-safe in-memory [`AttendanceStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failures: Arc<DashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `op` fail with a persistence error.
    pub fn fail_on(&self, op: StoreOp) {
        self.failures.insert(op);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    fn check(&self, op: StoreOp) -> Result<(), AppError> {
        check(&self.failures, op)
    }
}

fn check(failures: &DashSet<StoreOp>, op: StoreOp) -> Result<(), AppError> {
    if failures.contains(&op) {
        return Err(AppError::Persistence(format!("injected failure on {:?}", op)));
    }
    Ok(())
}

/// Unit of work over [`MemoryStore`].
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    staged: MemoryState,
    failures: Arc<DashSet<StoreOp>>,
}

impl StoreTx for MemoryTx {
    async fn fetch_latest_attendance(
        &mut self,
        user_id: &str,
        window: &DayWindow,
    ) -> Result<Option<Attendance>, AppError> {
        check(&self.failures, StoreOp::FetchLatest)?;
        Ok(self
            .staged
            .rows_for(user_id, Some(*window))
            .next()
            .and_then(|row| self.staged.resolve(row)))
    }

    async fn create_attendance(
        &mut self,
        user_id: &str,
        clock_in: TimeRecord,
    ) -> Result<Attendance, AppError> {
        check(&self.failures, StoreOp::CreateAttendance)?;

        let attendance_id = self.staged.next_id("attendance");
        let time_id = self.staged.next_id("time");
        let row = AttendanceRow {
            id: attendance_id.clone(),
            user_id: user_id.to_string(),
            created_at: clock_in.pushed_at,
            updated_at: clock_in.recorded_at,
        };
        let time = AttendanceTime {
            id: time_id,
            attendance_id,
            kind: AttendanceKind::ClockIn,
            remark: clock_in.remark,
            pushed_at: clock_in.pushed_at,
            is_modified: false,
            created_at: clock_in.recorded_at,
            updated_at: clock_in.recorded_at,
        };

        let attendance = Attendance {
            id: row.id.clone(),
            user_id: row.user_id.clone(),
            clocked_in: time.clone(),
            clocked_out: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };
        // Rows stay ordered by created_at so reads can walk them newest first
        let pos = self
            .staged
            .attendances
            .partition_point(|a| a.created_at <= row.created_at);
        self.staged.attendances.insert(pos, row);
        self.staged.times.push(time);
        Ok(attendance)
    }

    async fn invalidate_active_time(
        &mut self,
        attendance_id: &str,
        kind: AttendanceKind,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        check(&self.failures, StoreOp::InvalidateTime)?;

        for time in self
            .staged
            .times
            .iter_mut()
            .filter(|t| t.attendance_id == attendance_id && t.kind == kind && t.is_active())
        {
            time.is_modified = true;
            time.updated_at = at;
        }
        Ok(())
    }

    async fn insert_time(
        &mut self,
        attendance_id: &str,
        kind: AttendanceKind,
        record: TimeRecord,
    ) -> Result<AttendanceTime, AppError> {
        check(&self.failures, StoreOp::InsertTime)?;

        let id = self.staged.next_id("time");
        let time = AttendanceTime {
            id,
            attendance_id: attendance_id.to_string(),
            kind,
            remark: record.remark,
            pushed_at: record.pushed_at,
            is_modified: false,
            created_at: record.recorded_at,
            updated_at: record.recorded_at,
        };
        self.staged.times.push(time.clone());

        if let Some(row) = self
            .staged
            .attendances
            .iter_mut()
            .find(|a| a.id == attendance_id)
        {
            row.updated_at = record.recorded_at;
        }
        Ok(time)
    }

    async fn commit(mut self) -> Result<(), AppError> {
        check(&self.failures, StoreOp::Commit)?;
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        Ok(())
    }
}

impl AttendanceStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self, _user_id: &str) -> Result<MemoryTx, AppError> {
        self.check(StoreOp::Begin)?;
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx {
            guard,
            staged,
            failures: self.failures.clone(),
        })
    }

    async fn count_attendances(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
    ) -> Result<u64, AppError> {
        self.check(StoreOp::Read)?;
        let state = self.state.lock().await;
        Ok(state.rows_for(user_id, range).count() as u64)
    }

    async fn list_attendances(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
        page: PageParams,
    ) -> Result<Vec<Attendance>, AppError> {
        self.check(StoreOp::Read)?;
        let offset = page.offset().unwrap_or(u32::MAX) as usize;
        let state = self.state.lock().await;
        Ok(state
            .rows_for(user_id, range)
            .skip(offset)
            .take(page.per_page as usize)
            .filter_map(|row| state.resolve(row))
            .collect())
    }

    async fn get_attendance(&self, attendance_id: &str) -> Result<Option<Attendance>, AppError> {
        self.check(StoreOp::Read)?;
        let state = self.state.lock().await;
        Ok(state
            .attendances
            .iter()
            .find(|a| a.id == attendance_id)
            .and_then(|row| state.resolve(row)))
    }

    async fn attendance_times(&self, attendance_id: &str) -> Result<Vec<AttendanceTime>, AppError> {
        self.check(StoreOp::Read)?;
        let state = self.state.lock().await;
        Ok(state
            .times
            .iter()
            .filter(|t| t.attendance_id == attendance_id)
            .cloned()
            .collect())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.check(StoreOp::Read)?;
        Ok(self.state.lock().await.users.get(user_id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<User, AppError> {
        self.check(StoreOp::CreateUser)?;
        let mut state = self.state.lock().await;
        Ok(state
            .users
            .entry(user.id.clone())
            .or_insert_with(|| user.clone())
            .clone())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        self.check(StoreOp::UpdateUser)?;
        let mut state = self.state.lock().await;
        match state.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", user.id))),
        }
    }
}
