//! Core review pipeline for revbot.
//!
//! This crate holds the pure change-set algorithms — diff addressing
//! ([`address`]), priority-ordered truncation ([`select`]), finding location
//! ([`locate`]), and stale-annotation reconciliation ([`reconcile`]) — plus
//! the untrusted model-response parser ([`findings`]) and the shared
//! WAL-mode SQLite annotation store ([`db`], [`schema`]).
//!
//! Everything outside [`db`] is synchronous and side-effect free: functions
//! take fully materialized collections and return owned results, so callers
//! may assemble inputs incrementally (paginated fetches, channel hops) and
//! invoke the core once per run.

pub mod address;
pub mod db;
pub mod findings;
pub mod locate;
pub mod reconcile;
pub mod schema;
pub mod select;
pub mod types;
