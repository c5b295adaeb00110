// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{DateTime, Utc};
use clockwork::config::Config;
use clockwork::db::{FirestoreDb, MemoryStore};
use clockwork::routes::create_router;
use clockwork::services::AttendanceService;
use clockwork::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Parse an RFC 3339 timestamp.
#[allow(dead_code)]
pub fn at(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

/// Attendance service over a fresh in-memory store, Tokyo days.
#[allow(dead_code)]
pub fn memory_service() -> AttendanceService<MemoryStore> {
    AttendanceService::new(MemoryStore::new(), chrono_tz::Asia::Tokyo)
}

/// Create a test app backed by the in-memory store.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState<MemoryStore>>) {
    let state = Arc::new(AppState::new(Config::test_default(), MemoryStore::new()));
    (create_router(state.clone()), state)
}

/// Create a test JWT token for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    clockwork::middleware::auth::create_jwt(user_id, signing_key).expect("Failed to create JWT")
}
