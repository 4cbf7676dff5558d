//! AI Response Validation
//!
//! Turns unreliable model output into schema-conformant transcripts:
//! - JSON extraction from the raw reply (fences, BOM, surrounding prose)
//! - Normalization of cosmetically wrong-typed values
//! - Schema validation against the fixed transcript shape
//! - One corrective turn per repair round on violations
//!
//! ## Failure classes
//! - Unparseable text is a `MalformedResponse`: no repair turn is issued
//! - Schema violations are recoverable while repair rounds remain

mod extract;
mod repair;
mod schema;

pub use extract::extract_json;
pub use repair::TranscriptValidator;
pub use schema::{ValidationOutcome, normalize, validate};
