// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance and punch models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Maximum remark length, in characters.
pub const MAX_REMARK_CHARS: u64 = 1000;

/// Which side of the working day a punch records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceKind {
    ClockIn,
    ClockOut,
}

impl AttendanceKind {
    /// Stable numeric code used by persisted rows.
    pub fn code(self) -> u8 {
        match self {
            AttendanceKind::ClockIn => 1,
            AttendanceKind::ClockOut => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AttendanceKind::ClockIn),
            2 => Some(AttendanceKind::ClockOut),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttendanceKind::ClockIn => f.write_str("clock-in"),
            AttendanceKind::ClockOut => f.write_str("clock-out"),
        }
    }
}

/// One punch event.
///
/// Rows are never deleted. The only mutation is the `is_modified` flip that
/// retires the previously active row of the same kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceTime {
    pub id: String,
    /// Owning attendance
    pub attendance_id: String,
    pub kind: AttendanceKind,
    pub remark: String,
    /// When the punch happened, as supplied by the caller
    pub pushed_at: DateTime<Utc>,
    /// True once superseded by a later punch of the same kind
    pub is_modified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AttendanceTime {
    /// Whether this row is the currently visible punch of its kind.
    pub fn is_active(&self) -> bool {
        !self.is_modified
    }
}

/// One working day of one user, with its active punches resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: String,
    pub user_id: String,
    pub clocked_in: AttendanceTime,
    pub clocked_out: Option<AttendanceTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendance {
    pub fn is_clocked_out(&self) -> bool {
        self.clocked_out.is_some()
    }
}

/// A punch as submitted by a user.
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
pub struct NewPunch {
    #[serde(default)]
    #[validate(length(max = MAX_REMARK_CHARS))]
    pub remark: String,
    pub pushed_at: DateTime<Utc>,
}

impl NewPunch {
    pub fn new(remark: impl Into<String>, pushed_at: DateTime<Utc>) -> Self {
        Self {
            remark: remark.into(),
            pushed_at,
        }
    }
}
