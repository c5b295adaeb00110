// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Offset pagination for attendance listings.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Attendance;

pub const DEFAULT_PER_PAGE: u32 = 5;
pub const MONTHLY_PER_PAGE: u32 = 31;
pub const MAX_PER_PAGE: u32 = 100;

/// Page request (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageParams {
    pub page: u32,
    pub per_page: u32,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    /// Reject pages that would underflow or overflow the offset.
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 {
            return Err(AppError::Validation(
                "Page must be greater than 0".to_string(),
            ));
        }
        if self.per_page < 1 || self.per_page > MAX_PER_PAGE {
            return Err(AppError::Validation(format!(
                "per_page must be between 1 and {}",
                MAX_PER_PAGE
            )));
        }
        self.offset()
            .map(|_| ())
            .ok_or_else(|| AppError::Validation("Page number causes overflow".to_string()))
    }

    /// Number of items to skip, or `None` on overflow.
    pub fn offset(&self) -> Option<u32> {
        (self.page.checked_sub(1)?).checked_mul(self.per_page)
    }

    /// Whether items remain beyond this page given the total count.
    pub fn has_next(&self, total: u64) -> bool {
        u64::from(self.page) * u64::from(self.per_page) < total
    }
}

/// One page of attendances.
#[derive(Debug, Clone, Serialize)]
pub struct AttendancePage {
    pub items: Vec<Attendance>,
    pub has_next: bool,
}
