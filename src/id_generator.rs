use std::sync::atomic::{AtomicU64, Ordering};

// Snapshot sequence numbers are shared by every editor in the process so they stay monotonic.
static NEXT_SNAPSHOT_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_snapshot_sequence() -> u64 {
    NEXT_SNAPSHOT_SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

pub fn next_task_id() -> u64 {
    NEXT_TASK_ID.fetch_add(1, Ordering::SeqCst)
}
