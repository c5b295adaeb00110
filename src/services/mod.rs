// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod attendance;
pub mod resolver;
pub mod user;

pub use attendance::AttendanceService;
pub use resolver::PunchEffect;
pub use user::{UserProfile, UserService};
