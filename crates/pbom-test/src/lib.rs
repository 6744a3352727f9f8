#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod archive;
mod mock;

pub use archive::{json_archive, zip_archive};
pub use mock::MockGithubProvider;
