// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore emulator integration tests.
//!
//! Run with FIRESTORE_EMULATOR_HOST set, e.g.
//! `FIRESTORE_EMULATOR_HOST=localhost:8081 cargo test --test firestore_integration`

use chrono::Utc;
use clockwork::db::{AttendanceStore, FirestoreDb};
use clockwork::time_utils::DayWindow;
use clockwork::error::AppError;
use clockwork::models::{AttendanceKind, NewPunch, PageParams, User, UserUpdate};
use clockwork::services::{AttendanceService, UserService};

mod common;
use common::at;

fn unique_user() -> String {
    format!("it-{}", uuid::Uuid::new_v4())
}

async fn service() -> AttendanceService<FirestoreDb> {
    AttendanceService::new(common::test_db().await, chrono_tz::Asia::Tokyo)
}

#[tokio::test]
async fn test_punch_scenario() {
    require_emulator!();

    let svc = service().await;
    let user = unique_user();

    let a1 = svc
        .create_or_update_attendance(&user, Some(NewPunch::new("in", at("2020-01-08T09:00:00+09:00"))))
        .await
        .expect("clock-in");
    assert!(a1.clocked_out.is_none());

    let a1_out = svc
        .create_or_update_attendance(&user, Some(NewPunch::new("out", at("2020-01-08T18:00:00+09:00"))))
        .await
        .expect("clock-out");
    assert_eq!(a1_out.id, a1.id);
    assert_eq!(a1_out.clocked_in.id, a1.clocked_in.id);

    let a2 = svc
        .create_or_update_attendance(&user, Some(NewPunch::new("", at("2020-01-09T09:00:00+09:00"))))
        .await
        .expect("next day");
    assert_ne!(a2.id, a1.id);
    assert!(a2.clocked_out.is_none());

    let stored = svc.store().get_attendance(&a1.id).await.unwrap().unwrap();
    assert_eq!(stored.clocked_out.unwrap().id, a1_out.clocked_out.unwrap().id);
}

#[tokio::test]
async fn test_audit_trail() {
    require_emulator!();

    let svc = service().await;
    let user = unique_user();

    let mut id = String::new();
    for hour in [9, 12, 17, 19] {
        let pushed_at = at(&format!("2020-01-08T{:02}:00:00+09:00", hour));
        let a = svc
            .create_or_update_attendance(&user, Some(NewPunch::new(format!("h{}", hour), pushed_at)))
            .await
            .expect("punch");
        id = a.id;
    }

    let history = svc.attendance_history(&user, &id).await.unwrap();
    assert_eq!(history.len(), 4);

    let active: Vec<_> = history
        .iter()
        .filter(|t| t.kind == AttendanceKind::ClockOut && !t.is_modified)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].remark, "h19");
}

#[tokio::test]
async fn test_listing_and_monthly() {
    require_emulator!();

    let svc = service().await;
    let user = unique_user();

    for pushed_at in [
        "2020-01-30T09:00:00+09:00",
        "2020-02-01T00:30:00+09:00",
        "2020-02-03T09:00:00+09:00",
    ] {
        svc.create_or_update_attendance(&user, Some(NewPunch::new("", at(pushed_at))))
            .await
            .expect("punch");
    }

    let all = svc
        .list_attendances(&user, PageParams::new(1, 2))
        .await
        .unwrap();
    assert_eq!(all.items.len(), 2);
    assert!(all.has_next);
    assert_eq!(
        all.items[0].clocked_in.pushed_at,
        at("2020-02-03T09:00:00+09:00")
    );

    let feb = svc
        .list_monthly_attendances(&user, at("2020-02-10T12:00:00+09:00"), PageParams::new(1, 31))
        .await
        .unwrap();
    assert_eq!(feb.items.len(), 2);
    assert!(!feb.has_next);
}

#[tokio::test]
async fn test_user_profile() {
    require_emulator!();

    let users = UserService::new(service().await);
    let user_id = unique_user();
    let now = Utc::now();

    let profile = users.get_or_create_user(&user_id, now).await.unwrap();
    assert_eq!(profile.user.id, user_id);
    assert_eq!(profile.user.name, User::first_seen(&user_id, now).name);
    assert!(profile.attendance.is_none());

    let updated = users
        .update_user(
            &user_id,
            UserUpdate {
                name: "Integration".to_string(),
                email: "it@example.com".to_string(),
                image_url: String::new(),
            },
            now,
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Integration");

    let err = users
        .update_user(
            &unique_user(),
            UserUpdate {
                name: "Ghost".to_string(),
                email: "ghost@example.com".to_string(),
                image_url: String::new(),
            },
            now,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_instances_leave_one_active_clock_out() {
    require_emulator!();

    // Separate clients share no in-process locks, like two deployed instances
    let first = service().await;
    let second = service().await;
    let user = unique_user();

    let clock_in = first
        .create_or_update_attendance(&user, Some(NewPunch::new("in", at("2020-01-08T09:00:00+09:00"))))
        .await
        .expect("clock-in");

    let handles: Vec<_> = [first.clone(), second.clone(), first.clone(), second]
        .into_iter()
        .enumerate()
        .map(|(i, svc)| {
            let user = user.clone();
            tokio::spawn(async move {
                let pushed_at = at(&format!("2020-01-08T18:0{}:00+09:00", i));
                svc.create_or_update_attendance(&user, Some(NewPunch::new(format!("out{}", i), pushed_at)))
                    .await
            })
        })
        .collect();

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(attendance) => {
                assert_eq!(attendance.id, clock_in.id);
                committed += 1;
            }
            // A contended transaction aborts instead of interleaving
            Err(e) => assert!(matches!(e, AppError::Persistence(_)), "unexpected {e:?}"),
        }
    }
    assert!(committed >= 1);

    let history = first.attendance_history(&user, &clock_in.id).await.unwrap();
    let active_outs = history
        .iter()
        .filter(|t| t.kind == AttendanceKind::ClockOut && !t.is_modified)
        .count();
    assert_eq!(active_outs, 1);
    assert_eq!(
        history.iter().filter(|t| t.kind == AttendanceKind::ClockIn).count(),
        1
    );
    assert_eq!(history.len(), committed + 1);
}

#[tokio::test]
async fn test_count_matches_listing() {
    require_emulator!();

    let svc = service().await;
    let user = unique_user();

    for day in 1..=3 {
        let pushed_at = at(&format!("2020-03-0{}T09:00:00+09:00", day));
        svc.create_or_update_attendance(&user, Some(NewPunch::new("", pushed_at)))
            .await
            .expect("punch");
    }

    let store = svc.store();
    assert_eq!(store.count_attendances(&user, None).await.unwrap(), 3);

    let day = DayWindow::for_instant(at("2020-03-02T12:00:00+09:00"), chrono_tz::Asia::Tokyo);
    assert_eq!(store.count_attendances(&user, Some(day)).await.unwrap(), 1);
    assert_eq!(store.count_attendances(&unique_user(), None).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_user_keeps_existing_profile() {
    require_emulator!();

    let store = common::test_db().await;
    let now = Utc::now();
    let user_id = unique_user();

    let mut user = store.create_user(&User::first_seen(&user_id, now)).await.unwrap();
    user.name = "Edited".to_string();
    store.update_user(&user).await.unwrap();

    let stored = store
        .create_user(&User::first_seen(&user_id, now))
        .await
        .unwrap();
    assert_eq!(stored.name, "Edited");
}
