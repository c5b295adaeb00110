//! Database layer: the store contract and its implementations.

pub mod firestore;
pub mod memory;
pub mod store;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use store::{AttendanceStore, StoreOp, StoreTx, TimeRecord};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const ATTENDANCES: &str = "attendances";
    /// Every punch row, active and superseded
    pub const ATTENDANCE_TIMES: &str = "attendance_times";
}
