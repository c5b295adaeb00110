// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Punch behavior of the attendance service over the in-memory store.

use clockwork::db::{AttendanceStore, MemoryStore, StoreOp};
use clockwork::error::AppError;
use clockwork::models::{AttendanceKind, NewPunch, PageParams};
use clockwork::services::AttendanceService;

mod common;
use common::{at, memory_service};

async fn punch(
    svc: &AttendanceService<MemoryStore>,
    user_id: &str,
    remark: &str,
    pushed_at: &str,
) -> clockwork::models::Attendance {
    svc.create_or_update_attendance(user_id, Some(NewPunch::new(remark, at(pushed_at))))
        .await
        .expect("punch should succeed")
}

#[tokio::test]
async fn test_two_day_scenario() {
    let svc = memory_service();

    let a1 = punch(&svc, "U1", "morning", "2020-01-08T09:00:00+09:00").await;
    assert!(a1.clocked_out.is_none());
    assert_eq!(a1.clocked_in.kind, AttendanceKind::ClockIn);
    assert_eq!(a1.clocked_in.pushed_at, at("2020-01-08T09:00:00+09:00"));

    let a1_out = punch(&svc, "U1", "evening", "2020-01-08T18:00:00+09:00").await;
    assert_eq!(a1_out.id, a1.id);
    assert_eq!(a1_out.clocked_in, a1.clocked_in);
    let t2 = a1_out.clocked_out.clone().expect("clock-out recorded");
    assert!(!t2.is_modified);
    assert_eq!(t2.pushed_at, at("2020-01-08T18:00:00+09:00"));

    let a2 = punch(&svc, "U1", "next day", "2020-01-09T09:00:00+09:00").await;
    assert_ne!(a2.id, a1.id);
    assert!(a2.clocked_out.is_none());

    // A1 is untouched by the next day's punch
    let stored = svc.store().get_attendance(&a1.id).await.unwrap().unwrap();
    assert_eq!(stored, a1_out);
}

#[tokio::test]
async fn test_same_window_yields_same_attendance() {
    let svc = memory_service();
    // 00:00 and 23:59:59 local are the same Tokyo day
    let first = punch(&svc, "U1", "", "2020-01-08T00:00:00+09:00").await;
    let second = punch(&svc, "U1", "", "2020-01-08T23:59:59+09:00").await;
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn test_day_boundary_uses_configured_zone() {
    let svc = memory_service();
    // 14:59 UTC and 15:00 UTC fall on different Tokyo days
    let first = punch(&svc, "U1", "", "2020-01-08T14:59:59Z").await;
    let second = punch(&svc, "U1", "", "2020-01-08T15:00:00Z").await;
    assert_ne!(first.id, second.id);
    assert!(second.clocked_out.is_none());
}

#[tokio::test]
async fn test_users_do_not_share_attendances() {
    let svc = memory_service();
    let a = punch(&svc, "U1", "", "2020-01-08T09:00:00+09:00").await;
    let b = punch(&svc, "U2", "", "2020-01-08T09:05:00+09:00").await;
    assert_ne!(a.id, b.id);
    assert!(b.clocked_out.is_none());
}

#[tokio::test]
async fn test_corrections_keep_audit_trail() {
    let svc = memory_service();
    let times = [
        "2020-01-08T09:00:00+09:00",
        "2020-01-08T17:00:00+09:00",
        "2020-01-08T18:00:00+09:00",
        "2020-01-08T19:30:00+09:00",
        "2020-01-08T21:00:00+09:00",
    ];

    let mut last = None;
    for (i, t) in times.iter().enumerate() {
        last = Some(punch(&svc, "U1", &format!("punch {}", i + 1), t).await);
    }
    let attendance = last.unwrap();

    assert_eq!(attendance.clocked_in.remark, "punch 1");
    assert_eq!(attendance.clocked_out.as_ref().unwrap().remark, "punch 5");

    let history = svc
        .attendance_history("U1", &attendance.id)
        .await
        .unwrap();
    assert_eq!(history.len(), times.len());

    let clock_outs: Vec<_> = history
        .iter()
        .filter(|t| t.kind == AttendanceKind::ClockOut)
        .collect();
    assert_eq!(clock_outs.len(), 4);

    let active: Vec<_> = clock_outs.iter().filter(|t| !t.is_modified).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].remark, "punch 5");

    for superseded in clock_outs.iter().filter(|t| t.is_modified) {
        assert_ne!(superseded.remark, "punch 5");
    }

    let clock_ins: Vec<_> = history
        .iter()
        .filter(|t| t.kind == AttendanceKind::ClockIn)
        .collect();
    assert_eq!(clock_ins.len(), 1);
    assert!(!clock_ins[0].is_modified);
}

#[tokio::test]
async fn test_rejections() {
    let svc = memory_service();
    let ok = NewPunch::new("", at("2020-01-08T09:00:00+09:00"));

    let err = svc
        .create_or_update_attendance("", Some(ok.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = svc.create_or_update_attendance("U1", None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let long = NewPunch::new("x".repeat(1001), at("2020-01-08T09:00:00+09:00"));
    let err = svc
        .create_or_update_attendance("U1", Some(long))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(err.is_client_error());

    // Exactly 1000 characters is fine
    let max = NewPunch::new("x".repeat(1000), at("2020-01-08T09:00:00+09:00"));
    svc.create_or_update_attendance("U1", Some(max))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_clock_out_leaves_no_partial_write() {
    let svc = memory_service();
    let first = punch(&svc, "U1", "in", "2020-01-08T09:00:00+09:00").await;
    let second = punch(&svc, "U1", "out", "2020-01-08T18:00:00+09:00").await;

    // The invalidate step succeeds inside the unit of work, then the insert fails
    svc.store().fail_on(StoreOp::InsertTime);
    let err = svc
        .create_or_update_attendance(
            "U1",
            Some(NewPunch::new("late", at("2020-01-08T20:00:00+09:00"))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
    assert!(!err.is_client_error());
    svc.store().clear_failures();

    let stored = svc.store().get_attendance(&first.id).await.unwrap().unwrap();
    assert_eq!(stored, second);

    let history = svc.attendance_history("U1", &first.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|t| !t.is_modified));
}

#[tokio::test]
async fn test_failed_commit_discards_everything() {
    let svc = memory_service();
    svc.store().fail_on(StoreOp::Commit);

    let err = svc
        .create_or_update_attendance(
            "U1",
            Some(NewPunch::new("in", at("2020-01-08T09:00:00+09:00"))),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
    svc.store().clear_failures();

    let page = svc
        .list_attendances("U1", PageParams::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());

    // The store is usable again once the fault clears
    let a = punch(&svc, "U1", "in", "2020-01-08T09:00:00+09:00").await;
    assert!(a.clocked_out.is_none());
}

#[tokio::test]
async fn test_listing_newest_first_with_has_next() {
    let svc = memory_service();
    for day in 1..=7 {
        punch(&svc, "U1", "", &format!("2020-01-{:02}T09:00:00+09:00", day)).await;
    }

    let first = svc
        .list_attendances("U1", PageParams::new(1, 5))
        .await
        .unwrap();
    assert_eq!(first.items.len(), 5);
    assert!(first.has_next);
    assert_eq!(
        first.items[0].clocked_in.pushed_at,
        at("2020-01-07T09:00:00+09:00")
    );

    let second = svc
        .list_attendances("U1", PageParams::new(2, 5))
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert!(!second.has_next);
    assert_eq!(
        second.items[1].clocked_in.pushed_at,
        at("2020-01-01T09:00:00+09:00")
    );
}

#[tokio::test]
async fn test_listing_rejects_bad_page() {
    let svc = memory_service();
    let err = svc
        .list_attendances("U1", PageParams::new(0, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_monthly_listing_uses_local_month() {
    let svc = memory_service();
    // Local Feb 1 00:30 in Tokyo is still Jan 31 in UTC
    punch(&svc, "U1", "", "2020-01-31T09:00:00+09:00").await;
    punch(&svc, "U1", "", "2020-02-01T00:30:00+09:00").await;
    punch(&svc, "U1", "", "2020-02-29T23:00:00+09:00").await;
    punch(&svc, "U1", "", "2020-03-01T09:00:00+09:00").await;

    let feb = svc
        .list_monthly_attendances("U1", at("2020-02-15T12:00:00+09:00"), PageParams::new(1, 31))
        .await
        .unwrap();
    assert_eq!(feb.items.len(), 2);
    assert!(!feb.has_next);
    assert_eq!(
        feb.items[0].clocked_in.pushed_at,
        at("2020-02-29T23:00:00+09:00")
    );
}

#[tokio::test]
async fn test_history_of_other_users_attendance_is_not_found() {
    let svc = memory_service();
    let a = punch(&svc, "U1", "", "2020-01-08T09:00:00+09:00").await;

    let err = svc.attendance_history("U2", &a.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = svc.attendance_history("U1", "missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
