//! User profile service.

use chrono::{DateTime, Utc};
use serde::Serialize;
use validator::Validate;

use crate::db::AttendanceStore;
use crate::error::{AppError, Result};
use crate::models::{Attendance, User, UserUpdate};
use crate::services::AttendanceService;

/// A user together with today's attendance.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user: User,
    pub attendance: Option<Attendance>,
}

#[derive(Clone)]
pub struct UserService<S> {
    attendances: AttendanceService<S>,
}

impl<S: AttendanceStore + Clone> UserService<S> {
    pub fn new(attendances: AttendanceService<S>) -> Self {
        Self { attendances }
    }

    /// Fetch the user, creating a blank profile on first sighting, plus the
    /// attendance for the local day containing `now`.
    pub async fn get_or_create_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<UserProfile> {
        if user_id.is_empty() {
            return Err(AppError::InvalidArgument("user id is empty".to_string()));
        }

        let store = self.attendances.store();
        let user = match store.get_user(user_id).await? {
            Some(user) => user,
            None => {
                let stored = store.create_user(&User::first_seen(user_id, now)).await?;
                tracing::info!(user_id, "Created user on first sighting");
                stored
            }
        };

        let attendance = self.attendances.latest_attendance(user_id, now).await?;

        Ok(UserProfile { user, attendance })
    }

    /// Apply a profile edit. `NotFound` if the user was never seen.
    pub async fn update_user(
        &self,
        user_id: &str,
        update: UserUpdate,
        now: DateTime<Utc>,
    ) -> Result<User> {
        if user_id.is_empty() {
            return Err(AppError::InvalidArgument("user id is empty".to_string()));
        }
        update.validate()?;

        let store = self.attendances.store();
        let mut user = store
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        user.name = update.name;
        user.email = update.email;
        user.image_url = update.image_url;
        user.updated_at = now;

        store.update_user(&user).await?;
        Ok(user)
    }
}
