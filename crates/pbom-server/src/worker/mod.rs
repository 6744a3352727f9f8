//! Background work started by request handlers.

mod enrichment;

pub use enrichment::EnrichmentDispatcher;
