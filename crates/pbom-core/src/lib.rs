#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod schema;
pub mod validate;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use schema::{
    Artifact, Build, CONTAINER_IMAGE, CoDeployedService, PipelineRecord, Promotion, Provenance,
    Runner, Source, VERSION, Vulnerabilities,
};
pub use validate::{ValidationErrors, is_valid_commit_sha, is_valid_digest};
