//! Pipeline Bill of Materials document model.
//!
//! The document is split into phases: the source state and CI execution
//! context ([`Source`], [`Build`]), the produced artifacts ([`Artifact`]) and
//! the optional promotion path ([`Promotion`]). Optional members are omitted
//! from the serialized form when absent or empty.

mod artifact;
mod build;
mod promotion;
mod record;

pub use artifact::{Artifact, CONTAINER_IMAGE, Provenance, Vulnerabilities};
pub use build::{Build, Runner};
pub use promotion::{CoDeployedService, Promotion};
pub use record::{PipelineRecord, Source, VERSION};
