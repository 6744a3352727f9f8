//! GitHub Actions API data types.
//!
//! Only the members read during enrichment are modelled; unknown members are
//! ignored and missing ones take their default value.

mod artifact;
mod job;
mod nullable;
mod repo;
mod run;

pub use artifact::RunArtifact;
pub use job::Job;
pub use nullable::null_as_default;
pub use repo::RepoRef;
pub use run::{Actor, WorkflowRun};
