//! Transcript artifact
//!
//! The structured object produced for every scanned document and written to
//! `<output_dir>/<input_stem>.json`. Field order here is the key order of the
//! artifact on disk.

use serde::{Deserialize, Serialize};

/// Declared JSON type of a metadata field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text; non-strings are coerced to `""`
    String,
    /// List of strings; a bare string becomes a one-element list
    Array,
    /// Non-negative integer; non-numeric values become `0`
    Number,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Array => "array",
            Self::Number => "number",
        }
    }
}

/// One required metadata key and its declared type
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

/// Required top-level keys of a transcript
pub const TOP_LEVEL_KEYS: &[&str] = &["metadata", "original_text", "reviewed_text"];

/// Key holding the date that may arrive as `00-00-YYYY`
pub const DATE_FIELD: &str = "document_date";

/// Required metadata keys, in artifact order
pub const METADATA_FIELDS: &[FieldSpec] = &[
    field("document_id", FieldKind::String),
    field("document_title", FieldKind::String),
    field(DATE_FIELD, FieldKind::String),
    field("document_type", FieldKind::String),
    field("classification_level", FieldKind::String),
    field("author", FieldKind::String),
    field("language", FieldKind::String),
    field("document_description", FieldKind::String),
    field("recipients", FieldKind::Array),
    field("people_mentioned", FieldKind::Array),
    field("organizations", FieldKind::Array),
    field("countries", FieldKind::Array),
    field("cities", FieldKind::Array),
    field("other_places", FieldKind::Array),
    field("keywords", FieldKind::Array),
    field("page_count", FieldKind::Number),
];

/// A validated transcript of one scanned document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub metadata: TranscriptMetadata,
    /// Text exactly as it appears on the page
    pub original_text: String,
    /// Text with OCR noise and obvious typos corrected
    pub reviewed_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    pub document_id: String,
    pub document_title: String,
    pub document_date: String,
    pub document_type: String,
    pub classification_level: String,
    pub author: String,
    pub language: String,
    pub document_description: String,
    pub recipients: Vec<String>,
    pub people_mentioned: Vec<String>,
    pub organizations: Vec<String>,
    pub countries: Vec<String>,
    pub cities: Vec<String>,
    pub other_places: Vec<String>,
    pub keywords: Vec<String>,
    pub page_count: u32,
}

impl Transcript {
    /// Pretty-printed artifact body
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
