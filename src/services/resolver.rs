// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Punch resolution: decide what a new punch does to today's attendance.
//!
//! The first punch of a local calendar day opens a new attendance with a
//! clock-in. Every later punch that day is a clock-out that supersedes the
//! previous clock-out, if any. Superseded rows are flagged, never removed.

use chrono::{DateTime, Utc};

use crate::db::TimeRecord;
use crate::models::{Attendance, AttendanceKind, NewPunch};

/// The writes a punch requires.
#[derive(Debug, Clone, PartialEq)]
pub enum PunchEffect {
    /// No attendance today: create one whose clock-in is this punch.
    CreateAttendance { clock_in: TimeRecord },
    /// Attendance exists: retire its active clock-out (if any) and insert this punch.
    AppendClockOut {
        attendance: Attendance,
        clock_out: TimeRecord,
    },
}

impl PunchEffect {
    /// Kind of the row this effect inserts.
    pub fn kind(&self) -> AttendanceKind {
        match self {
            PunchEffect::CreateAttendance { .. } => AttendanceKind::ClockIn,
            PunchEffect::AppendClockOut { .. } => AttendanceKind::ClockOut,
        }
    }
}

/// Pure decision logic. `existing` is the latest attendance in the punch's day window.
pub fn resolve(
    existing: Option<Attendance>,
    punch: &NewPunch,
    recorded_at: DateTime<Utc>,
) -> PunchEffect {
    let record = TimeRecord {
        remark: punch.remark.clone(),
        pushed_at: punch.pushed_at,
        recorded_at,
    };

    match existing {
        None => PunchEffect::CreateAttendance { clock_in: record },
        Some(attendance) => PunchEffect::AppendClockOut {
            attendance,
            clock_out: record,
        },
    }
}
