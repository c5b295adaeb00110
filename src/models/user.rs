//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// User profile. The id comes from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Identity provider subject (also used as document ID)
    pub id: String,
    pub name: String,
    pub email: String,
    /// Profile picture URL
    pub image_url: String,
    /// When the user was first seen
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Blank profile for a first sighting.
    pub fn first_seen(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            email: String::new(),
            image_url: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile edit submitted by the user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 50), email)]
    pub email: String,
    #[serde(default)]
    pub image_url: String,
}
