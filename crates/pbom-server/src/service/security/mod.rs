//! Authenticity checks for inbound webhook deliveries.

mod signature;

pub use signature::{SIGNATURE_PREFIX, SignatureError, SignatureVerifier};
