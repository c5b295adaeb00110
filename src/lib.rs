// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Clockwork: attendance tracking with an auditable punch history
//!
//! This crate provides the backend API for recording when users clock in
//! and out. The first punch of a local calendar day opens an attendance;
//! later punches that day correct its clock-out while keeping every
//! superseded punch as history.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{AttendanceService, UserService};

/// Shared application state.
pub struct AppState<S> {
    pub config: Config,
    pub attendance_service: AttendanceService<S>,
    pub user_service: UserService<S>,
}

impl<S: db::AttendanceStore + Clone> AppState<S> {
    /// Wire both services onto one store, using the configured timezone.
    pub fn new(config: Config, store: S) -> Self {
        let attendance_service = AttendanceService::new(store, config.timezone);
        let user_service = UserService::new(attendance_service.clone());
        Self {
            config,
            attendance_service,
            user_service,
        }
    }
}
