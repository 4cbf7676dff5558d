pub mod error;
pub mod transcript;

pub use error::{
    Disposition, ErrorCategory, ErrorClassifier, LlmError, Result, ScribeError, ValidationError,
    ValidationErrorKind,
};
pub use transcript::{
    DATE_FIELD, FieldKind, FieldSpec, METADATA_FIELDS, TOP_LEVEL_KEYS, Transcript,
    TranscriptMetadata,
};
