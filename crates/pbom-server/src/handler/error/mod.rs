//! [`Error`], [`ErrorKind`] and [`Result`].

mod http_error;
mod signature_error;

pub use http_error::{Error, ErrorKind, Result};
