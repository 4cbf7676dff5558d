use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::types::{Result, Transcript};

/// Write a transcript as pretty-printed UTF-8 JSON.
///
/// The bytes go to a temp file in the destination directory that is then
/// renamed over `path`, so the artifact is either absent or complete.
pub fn write_transcript_atomic(path: &Path, transcript: &Transcript) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut body = transcript.to_pretty_json()?;
    body.push('\n');

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(body.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transcript::fixtures::conformant_value;
    use tempfile::TempDir;

    #[test]
    fn test_write_round_trips_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("page.json");
        let transcript: Transcript = serde_json::from_value(conformant_value()).unwrap();

        write_transcript_atomic(&path, &transcript).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Transcript = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, transcript);
        assert!(written.ends_with("}\n"));

        let entries = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_write_replaces_existing_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.json");
        std::fs::write(&path, "stale").unwrap();
        let transcript: Transcript = serde_json::from_value(conformant_value()).unwrap();

        write_transcript_atomic(&path, &transcript).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("DOC-0001"));
    }
}
