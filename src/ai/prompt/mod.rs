//! Prompt Builder System
//!
//! Builds the transcription prompt sent with every page image and the
//! corrective turn issued after a schema violation.

use serde_json::{Map, Value, json};

use crate::config::LlmConfig;
use crate::types::{
    FieldKind, METADATA_FIELDS, Result, ScribeError, TOP_LEVEL_KEYS, ValidationError,
};

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Raw text section with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Code block with language
    Code { language: String, content: String },
    /// Bulleted list under a header
    List { header: String, items: Vec<String> },
}

/// Prompt builder for consistent prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a role definition section
    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: Vec<&str>) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.into_iter().map(String::from).collect(),
        ));
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    /// Add text section with header
    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    pub fn code(mut self, language: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Code {
            language: language.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn list(mut self, header: &str, items: Vec<String>) -> Self {
        self.sections.push(PromptSection::List {
            header: header.to_string(),
            items,
        });
        self
    }

    /// Build the final prompt string
    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(&content);
                    prompt.push_str("\n\n");
                }
                PromptSection::Code { language, content } => {
                    prompt.push_str(&format!("```{}\n", language));
                    prompt.push_str(&content);
                    prompt.push_str("\n```\n\n");
                }
                PromptSection::List { header, items } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    for item in items {
                        prompt.push_str(&format!("- {}\n", item));
                    }
                    prompt.push('\n');
                }
            }
        }

        prompt.trim_end().to_string()
    }
}

/// Preset prompt templates
pub struct PromptTemplates;

impl PromptTemplates {
    /// Built-in instruction sent with every page image
    pub fn transcription() -> PromptBuilder {
        PromptBuilder::new()
            .role(
                "archivist",
                "transcribing scanned historical and government documents",
            )
            .objectives(vec![
                "Transcribe the page exactly as written into `original_text`",
                "Correct OCR noise and obvious typos into `reviewed_text`",
                "Fill every metadata field from what the page shows",
            ])
            .list(
                "Rules",
                vec![
                    "Use an empty string or empty list when a value is not on the page".to_string(),
                    "Write dates as YYYY-MM-DD, using 00 for unknown month or day".to_string(),
                    "`page_count` is a whole number".to_string(),
                    "Respond with a single JSON object and nothing else".to_string(),
                ],
            )
            .section("Output Schema", "Return JSON with exactly this shape:")
            .code("json", &schema_skeleton())
    }

    /// Corrective follow-up turn enumerating every violation
    pub fn repair(violations: &[ValidationError]) -> String {
        PromptBuilder::new()
            .text("Your previous response does not match the required JSON schema.")
            .list(
                "Violations",
                violations.iter().map(|v| v.to_string()).collect(),
            )
            .text(
                "Return the complete corrected JSON object with every required key. \
                 Respond with JSON only.",
            )
            .build()
    }
}

/// JSON skeleton listing every required key with a placeholder of its type
fn schema_skeleton() -> String {
    let metadata: Map<String, Value> = METADATA_FIELDS
        .iter()
        .map(|field| {
            let placeholder = match field.kind {
                FieldKind::String => json!("string"),
                FieldKind::Array => json!(["string"]),
                FieldKind::Number => json!(0),
            };
            (field.name.to_string(), placeholder)
        })
        .collect();

    let mut root = Map::new();
    for key in TOP_LEVEL_KEYS {
        let value = if *key == "metadata" {
            Value::Object(metadata.clone())
        } else {
            json!("string")
        };
        root.insert(key.to_string(), value);
    }

    serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_default()
}

/// Prompt text for a run: the configured override file, or the built-in prompt
pub fn load_prompt(config: &LlmConfig) -> Result<String> {
    match &config.prompt_file {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                ScribeError::Config(format!(
                    "Failed to read prompt file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            if text.trim().is_empty() {
                return Err(ScribeError::Config(format!(
                    "Prompt file {} is empty",
                    path.display()
                )));
            }
            Ok(text)
        }
        None => Ok(PromptTemplates::transcription().build()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_basic_prompt() {
        let prompt = PromptBuilder::new()
            .role("archivist", "cables")
            .objectives(vec!["Read the page", "Fill the schema"])
            .build();

        assert!(prompt.contains("<ROLE>"));
        assert!(prompt.contains("archivist"));
        assert!(prompt.contains("1. Read the page"));
        assert!(prompt.contains("2. Fill the schema"));
    }

    #[test]
    fn test_transcription_prompt_names_every_field() {
        let prompt = PromptTemplates::transcription().build();
        assert!(prompt.contains("```json"));
        for key in TOP_LEVEL_KEYS {
            assert!(prompt.contains(key), "missing {key}");
        }
        for field in METADATA_FIELDS {
            assert!(prompt.contains(field.name), "missing {}", field.name);
        }
    }

    #[test]
    fn test_repair_prompt_lists_each_violation() {
        let prompt = PromptTemplates::repair(&[
            ValidationError::missing("metadata.document_date"),
            ValidationError::wrong_type("original_text", "string", "array"),
        ]);
        assert!(prompt.contains("- 'metadata.document_date': required key is missing"));
        assert!(prompt.contains("- 'original_text': expected string, got array"));
    }

    #[test]
    fn test_load_prompt_override() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "Transcribe this page as JSON.").unwrap();
        let config = LlmConfig {
            prompt_file: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(load_prompt(&config).unwrap(), "Transcribe this page as JSON.");
    }

    #[test]
    fn test_load_prompt_missing_file_is_config_error() {
        let config = LlmConfig {
            prompt_file: Some("/nonexistent/prompt.txt".into()),
            ..Default::default()
        };
        assert!(matches!(load_prompt(&config), Err(ScribeError::Config(_))));
    }
}
