// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing [`AttendanceStore`].
//!
//! Collections:
//! - `users` (profile, keyed by identity-provider subject)
//! - `attendances` (one document per user per working day)
//! - `attendance_times` (every punch ever recorded, linked by attendance id)
//!
//! A unit of work opens a Firestore transaction in `begin`. Its reads go
//! through a client bound to that transaction and its writes are buffered
//! and committed on the same transaction, so a concurrent punch from another
//! instance either waits or aborts. Within one process a per-user async lock
//! queues units of work before they reach Firestore.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::{stream, StreamExt};
use firestore::select_filter_builder::FirestoreQueryFilterBuilder;
use firestore::{
    FirestoreConsistencySelector, FirestoreQueryFilter, FirestoreTransaction,
    FirestoreTransactionData,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::db::collections;
use crate::db::store::{AttendanceStore, StoreTx, TimeRecord};
use crate::error::AppError;
use crate::models::{Attendance, AttendanceKind, AttendanceTime, PageParams, User};
use crate::time_utils::{format_sortable_rfc3339, DayWindow};

const MAX_CONCURRENT_DB_OPS: usize = 50;

type UserLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

// ─── Stored Documents ────────────────────────────────────────────

/// Attendance document. Timestamps are fixed-width RFC3339 so range
/// filters on strings match time order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttendanceDoc {
    id: String,
    user_id: String,
    created_at: String,
    updated_at: String,
}

/// Punch document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AttendanceTimeDoc {
    id: String,
    attendance_id: String,
    kind: u8,
    remark: String,
    pushed_at: String,
    is_modified: bool,
    created_at: String,
    updated_at: String,
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Persistence(format!("Corrupt timestamp {:?}: {}", raw, e)))
}

impl AttendanceTimeDoc {
    fn new(id: String, attendance_id: &str, kind: AttendanceKind, record: TimeRecord) -> Self {
        let recorded_at = format_sortable_rfc3339(record.recorded_at);
        Self {
            id,
            attendance_id: attendance_id.to_string(),
            kind: kind.code(),
            remark: record.remark,
            pushed_at: format_sortable_rfc3339(record.pushed_at),
            is_modified: false,
            created_at: recorded_at.clone(),
            updated_at: recorded_at,
        }
    }

    fn kind(&self) -> Result<AttendanceKind, AppError> {
        AttendanceKind::from_code(self.kind).ok_or_else(|| {
            AppError::Persistence(format!("Unknown attendance kind {} on {}", self.kind, self.id))
        })
    }

    fn to_model(&self) -> Result<AttendanceTime, AppError> {
        Ok(AttendanceTime {
            id: self.id.clone(),
            attendance_id: self.attendance_id.clone(),
            kind: self.kind()?,
            remark: self.remark.clone(),
            pushed_at: parse_timestamp(&self.pushed_at)?,
            is_modified: self.is_modified,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Filter over one user's attendances, optionally bounded by a day window.
#[derive(Debug, Clone)]
struct AttendanceFilter {
    user_id: String,
    bounds: Option<(String, String)>,
}

impl AttendanceFilter {
    fn new(user_id: &str, range: Option<DayWindow>) -> Self {
        Self {
            user_id: user_id.to_string(),
            bounds: range.map(|window| {
                (
                    format_sortable_rfc3339(window.start),
                    format_sortable_rfc3339(window.end),
                )
            }),
        }
    }

    fn build(&self, q: FirestoreQueryFilterBuilder) -> Option<FirestoreQueryFilter> {
        match &self.bounds {
            Some((start, end)) => q.for_all([
                q.field("user_id").eq(self.user_id.clone()),
                q.field("created_at").greater_than_or_equal(start.clone()),
                q.field("created_at").less_than_or_equal(end.clone()),
            ]),
            None => q.field("user_id").eq(self.user_id.clone()),
        }
    }
}

/// Result row of a count aggregation.
#[derive(Debug, Deserialize)]
struct CountResult {
    count: u64,
}

/// A write buffered until commit.
#[derive(Debug, Clone)]
enum PendingWrite {
    Attendance(AttendanceDoc),
    Time(AttendanceTimeDoc),
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    user_locks: UserLocks,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self::with_client(Some(client)))
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self::with_client(Some(client)))
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self::with_client(None)
    }

    fn with_client(client: Option<firestore::FirestoreDb>) -> Self {
        Self {
            client,
            user_locks: Arc::new(DashMap::new()),
        }
    }

    /// Copy of this store whose reads run inside `transaction`.
    fn bound_to(
        &self,
        client: &firestore::FirestoreDb,
        transaction: &FirestoreTransactionData,
    ) -> Self {
        Self {
            client: Some(client.clone_with_consistency_selector(
                FirestoreConsistencySelector::Transaction(transaction.transaction_id().clone()),
            )),
            user_locks: self.user_locks.clone(),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Persistence("Database not connected (offline mode)".to_string())
        })
    }

    // ─── Attendance Reads ────────────────────────────────────────

    async fn get_attendance_doc(&self, attendance_id: &str) -> Result<Option<AttendanceDoc>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ATTENDANCES)
            .obj()
            .one(attendance_id)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Active (`is_modified = false`) punches of an attendance.
    async fn active_time_docs(&self, attendance_id: &str) -> Result<Vec<AttendanceTimeDoc>, AppError> {
        let attendance_id = attendance_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ATTENDANCE_TIMES)
            .filter(move |q| {
                q.for_all([
                    q.field("attendance_id").eq(attendance_id.clone()),
                    q.field("is_modified").eq(false),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    /// Join an attendance document with its active punches.
    ///
    /// Returns `None` for an attendance with no active clock-in, which only
    /// happens if a document was written outside this store.
    async fn resolve(&self, doc: AttendanceDoc) -> Result<Option<Attendance>, AppError> {
        let times = self.active_time_docs(&doc.id).await?;

        let mut clocked_in = None;
        let mut clocked_out = None;
        for time in &times {
            match time.kind()? {
                AttendanceKind::ClockIn => clocked_in = Some(time.to_model()?),
                AttendanceKind::ClockOut => clocked_out = Some(time.to_model()?),
            }
        }

        let Some(clocked_in) = clocked_in else {
            tracing::warn!(attendance_id = %doc.id, "Attendance has no active clock-in");
            return Ok(None);
        };

        Ok(Some(Attendance {
            id: doc.id,
            user_id: doc.user_id,
            clocked_in,
            clocked_out,
            created_at: parse_timestamp(&doc.created_at)?,
            updated_at: parse_timestamp(&doc.updated_at)?,
        }))
    }

    async fn resolve_all(&self, docs: Vec<AttendanceDoc>) -> Result<Vec<Attendance>, AppError> {
        let resolved = stream::iter(docs)
            .map(|doc| async move { self.resolve(doc).await })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Attendance>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Attendance>>, AppError>>()?;

        Ok(resolved.into_iter().flatten().collect())
    }

    async fn query_attendance_docs(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
        page: Option<PageParams>,
    ) -> Result<Vec<AttendanceDoc>, AppError> {
        let filter = AttendanceFilter::new(user_id, range);
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ATTENDANCES)
            .filter(move |q| filter.build(q))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)]);

        let query = match page {
            Some(page) => {
                let offset = page.offset().ok_or_else(|| {
                    AppError::Validation("Page number causes overflow".to_string())
                })?;
                query.limit(page.per_page).offset(offset)
            }
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }
}

// ─── Unit of Work ────────────────────────────────────────────────

/// Unit of work over [`FirestoreDb`], holding the user's lock until dropped.
pub struct FirestoreTx {
    client: firestore::FirestoreDb,
    /// Reads bound to `transaction`.
    db: FirestoreDb,
    transaction: FirestoreTransactionData,
    _guard: OwnedMutexGuard<()>,
    pending: Vec<PendingWrite>,
}

impl StoreTx for FirestoreTx {
    async fn fetch_latest_attendance(
        &mut self,
        user_id: &str,
        window: &DayWindow,
    ) -> Result<Option<Attendance>, AppError> {
        let mut docs = self
            .db
            .query_attendance_docs(user_id, Some(*window), Some(PageParams::new(1, 1)))
            .await?;

        match docs.pop() {
            Some(doc) => self.db.resolve(doc).await,
            None => Ok(None),
        }
    }

    async fn create_attendance(
        &mut self,
        user_id: &str,
        clock_in: TimeRecord,
    ) -> Result<Attendance, AppError> {
        let attendance_doc = AttendanceDoc {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: format_sortable_rfc3339(clock_in.pushed_at),
            updated_at: format_sortable_rfc3339(clock_in.recorded_at),
        };
        let time_doc = AttendanceTimeDoc::new(
            uuid::Uuid::new_v4().to_string(),
            &attendance_doc.id,
            AttendanceKind::ClockIn,
            clock_in.clone(),
        );

        let attendance = Attendance {
            id: attendance_doc.id.clone(),
            user_id: attendance_doc.user_id.clone(),
            clocked_in: time_doc.to_model()?,
            clocked_out: None,
            created_at: clock_in.pushed_at,
            updated_at: clock_in.recorded_at,
        };

        self.pending.push(PendingWrite::Attendance(attendance_doc));
        self.pending.push(PendingWrite::Time(time_doc));
        Ok(attendance)
    }

    async fn invalidate_active_time(
        &mut self,
        attendance_id: &str,
        kind: AttendanceKind,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let updated_at = format_sortable_rfc3339(at);

        // Rows already buffered by this unit of work
        for write in &mut self.pending {
            if let PendingWrite::Time(doc) = write {
                if doc.attendance_id == attendance_id && doc.kind == kind.code() && !doc.is_modified {
                    doc.is_modified = true;
                    doc.updated_at = updated_at.clone();
                }
            }
        }

        for mut doc in self.db.active_time_docs(attendance_id).await? {
            if doc.kind != kind.code() {
                continue;
            }
            tracing::debug!(attendance_id, time_id = %doc.id, %kind, "Superseding active punch");
            doc.is_modified = true;
            doc.updated_at = updated_at.clone();
            self.pending.push(PendingWrite::Time(doc));
        }
        Ok(())
    }

    async fn insert_time(
        &mut self,
        attendance_id: &str,
        kind: AttendanceKind,
        record: TimeRecord,
    ) -> Result<AttendanceTime, AppError> {
        let recorded_at = record.recorded_at;
        let doc = AttendanceTimeDoc::new(uuid::Uuid::new_v4().to_string(), attendance_id, kind, record);
        let time = doc.to_model()?;
        self.pending.push(PendingWrite::Time(doc));

        if let Some(mut attendance) = self.db.get_attendance_doc(attendance_id).await? {
            attendance.updated_at = format_sortable_rfc3339(recorded_at);
            self.pending.push(PendingWrite::Attendance(attendance));
        }
        Ok(time)
    }

    async fn commit(self) -> Result<(), AppError> {
        let FirestoreTx {
            client,
            mut transaction,
            pending,
            ..
        } = self;

        for write in &pending {
            let added = match write {
                PendingWrite::Attendance(doc) => client
                    .fluent()
                    .update()
                    .in_col(collections::ATTENDANCES)
                    .document_id(&doc.id)
                    .object(doc)
                    .add_to_transaction(&mut transaction),
                PendingWrite::Time(doc) => client
                    .fluent()
                    .update()
                    .in_col(collections::ATTENDANCE_TIMES)
                    .document_id(&doc.id)
                    .object(doc)
                    .add_to_transaction(&mut transaction),
            };
            added.map_err(|e| {
                AppError::Persistence(format!("Failed to add write to transaction: {}", e))
            })?;
        }

        // Aborts when another transaction touched what we read
        FirestoreTransaction::from_data(&client, transaction)
            .commit()
            .await
            .map_err(|e| AppError::Persistence(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(writes = pending.len(), "Committed attendance writes");
        Ok(())
    }

    async fn rollback(self) -> Result<(), AppError> {
        tracing::debug!(discarded = self.pending.len(), "Discarding buffered writes");
        FirestoreTransaction::from_data(&self.client, self.transaction)
            .rollback()
            .await
            .map_err(|e| AppError::Persistence(format!("Transaction rollback failed: {}", e)))
    }
}

impl AttendanceStore for FirestoreDb {
    type Tx = FirestoreTx;

    async fn begin(&self, user_id: &str) -> Result<FirestoreTx, AppError> {
        let client = self.get_client()?.clone();

        let lock = self
            .user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;

        let transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to begin transaction: {}", e)))?
            .into_data();

        Ok(FirestoreTx {
            db: self.bound_to(&client, &transaction),
            client,
            transaction,
            _guard: guard,
            pending: Vec::new(),
        })
    }

    async fn count_attendances(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
    ) -> Result<u64, AppError> {
        let filter = AttendanceFilter::new(user_id, range);
        let counts: Vec<CountResult> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ATTENDANCES)
            .filter(move |q| filter.build(q))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        Ok(counts.first().map_or(0, |c| c.count))
    }

    async fn list_attendances(
        &self,
        user_id: &str,
        range: Option<DayWindow>,
        page: PageParams,
    ) -> Result<Vec<Attendance>, AppError> {
        let docs = self.query_attendance_docs(user_id, range, Some(page)).await?;
        self.resolve_all(docs).await
    }

    async fn get_attendance(&self, attendance_id: &str) -> Result<Option<Attendance>, AppError> {
        match self.get_attendance_doc(attendance_id).await? {
            Some(doc) => self.resolve(doc).await,
            None => Ok(None),
        }
    }

    async fn attendance_times(&self, attendance_id: &str) -> Result<Vec<AttendanceTime>, AppError> {
        let attendance_id = attendance_id.to_string();
        let docs: Vec<AttendanceTimeDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ATTENDANCE_TIMES)
            .filter(move |q| q.field("attendance_id").eq(attendance_id.clone()))
            .order_by([("created_at", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;

        docs.iter().map(AttendanceTimeDoc::to_model).collect()
    }

    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    async fn create_user(&self, user: &User) -> Result<User, AppError> {
        let inserted: Result<User, _> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await;

        match inserted {
            Ok(created) => Ok(created),
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                tracing::debug!(user_id = %user.id, "User already exists, keeping stored profile");
                self.get_user(&user.id).await?.ok_or_else(|| {
                    AppError::Persistence(format!("User {} vanished after conflict", user.id))
                })
            }
            Err(e) => Err(AppError::Persistence(e.to_string())),
        }
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        if self.get_user(&user.id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user.id)));
        }
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))?;
        tracing::info!(user_id = %user.id, "Updated user");
        Ok(())
    }
}
