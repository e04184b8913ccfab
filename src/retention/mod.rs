//! Release revision retention.
//!
//! A run walks every monitored cluster and, for each release with more than
//! `max_revisions_per_release` stored revisions, archives the oldest excess
//! revisions to cold storage and then deletes them from the cluster.
//!
//! - [`RevisionEvictionPolicy`]: picks the revisions to evict
//! - [`ArchiveThenDeletePipeline`]: archives each evicted revision, deleting
//!   it only once the archive write succeeded
//! - [`ReleaseSweeper`]: applies the policy to every release of a namespace
//! - [`ClusterSweepTask`]: connects to one cluster and sweeps its namespaces
//! - [`FleetCoordinator`]: pages through the directory and sweeps clusters in
//!   concurrent batches
//!
//! Failures are isolated to the smallest unit they affect and reported in the
//! run's [`Summary`]. A revision left behind by a failed run is picked up by
//! the next one.

mod cluster_task;
mod coordinator;
mod outcome;
mod pipeline;
mod policy;
mod setup;
mod sweeper;
mod worker;

pub use cluster_task::ClusterSweepTask;
pub use coordinator::FleetCoordinator;
pub use outcome::{
    ClusterOutcome, ClusterState, NamespaceOutcome, PipelineOutcome, ReleaseFailure,
    RevisionFailure, Summary,
};
pub use pipeline::ArchiveThenDeletePipeline;
pub use policy::{RevisionEvictionPolicy, evict};
pub use setup::{SetupError, build_coordinator};
pub use sweeper::ReleaseSweeper;
pub use worker::start_retention_worker;
