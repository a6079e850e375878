//! Git layer: change-set collection on a dedicated worker thread.

pub mod types;
pub mod worker;
