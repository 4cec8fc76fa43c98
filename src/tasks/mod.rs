//! Background Tasks Module
//!
//! Periodic maintenance for the object cache and the response store.

mod cleanup;

pub use cleanup::{spawn_purge_task, spawn_reconcile_task};
