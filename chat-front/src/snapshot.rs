//! Snapshot persistence and the human-in-the-loop controller.

pub mod controller;
pub mod redis_store;
pub mod store;

pub use controller::HitlController;
pub use redis_store::RedisSnapshotStore;
pub use store::{InMemorySnapshotStore, Snapshot, SnapshotStore};
