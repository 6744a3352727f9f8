//! Signature verification error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};
use crate::service::SignatureError;

/// Tracing target for signature error conversions.
const TRACING_TARGET: &str = "pbom_server::handler::signature";

impl From<SignatureError> for HttpError<'static> {
    fn from(error: SignatureError) -> Self {
        match error {
            SignatureError::EmptySecret => {
                tracing::error!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Webhook secret is not configured"
                );
            }
            _ => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    error = %error,
                    "Signature verification failed"
                );
            }
        }

        ErrorKind::Unauthorized
            .with_message("Invalid signature")
            .with_context(error.to_string())
    }
}
