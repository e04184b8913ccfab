//! Fleet-wide release revision retention.
//!
//! Caps the number of stored revisions per release on every monitored
//! cluster. Revisions beyond the cap are archived to encrypted cold storage
//! and only then deleted from the cluster.

pub mod cluster;
pub mod config;
pub mod directory;
pub mod models;
pub mod observability;
pub mod retention;
pub mod storage;

#[cfg(test)]
mod tests;
