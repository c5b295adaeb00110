// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod attendance;
pub mod pagination;
pub mod user;

pub use attendance::{Attendance, AttendanceKind, AttendanceTime, NewPunch};
pub use pagination::{AttendancePage, PageParams, DEFAULT_PER_PAGE, MAX_PER_PAGE, MONTHLY_PER_PAGE};
pub use user::{User, UserUpdate};
