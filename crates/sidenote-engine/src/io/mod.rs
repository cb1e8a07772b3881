use crate::editor::Highlight;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A note as persisted: content plus every highlight anchored in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub content: String,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    /// Incremented by the caller on every save
    #[serde(default)]
    pub version: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid note record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid notes directory: {0}")]
    InvalidNotesDir(String),
}

/// Read a note record from a JSON file
pub fn read_record(path: &Path) -> Result<NoteRecord, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Write a note record as pretty JSON
pub fn write_record(path: &Path, record: &NoteRecord) -> Result<(), IoError> {
    // Create parent directories if they don't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    log::debug!(
        "wrote {} highlights to {}",
        record.highlights.len(),
        path.display()
    );
    Ok(())
}

/// Note records directly inside `notes_root`, sorted by path
pub fn list_records(notes_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_notes_dir(notes_root)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(notes_root)? {
        let path = entry?.path();
        if path.is_file()
            && let Some(ext) = path.extension()
            && ext == "json"
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub fn validate_notes_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidNotesDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchoring::TextAnchor;
    use tempfile::TempDir;

    fn record() -> NoteRecord {
        NoteRecord {
            content: "The quick brown fox".to_string(),
            highlights: vec![Highlight::new(
                "h1",
                TextAnchor::new("brown fox", "The quick ", ""),
            )],
            version: 1,
        }
    }

    #[test]
    fn test_write_then_read_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("note.json");

        write_record(&path, &record()).unwrap();
        let loaded = read_record(&path).unwrap();

        assert_eq!(loaded.content, "The quick brown fox");
        assert_eq!(loaded.highlights[0].anchor, record().highlights[0].anchor);
        assert_eq!(loaded.version, 1);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = read_record(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_malformed_record_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(read_record(&path), Err(IoError::Json(_))));
    }

    #[test]
    fn test_minimal_record_uses_defaults() {
        let record: NoteRecord = serde_json::from_str(r#"{"content": "x"}"#).unwrap();
        assert!(record.highlights.is_empty());
        assert_eq!(record.version, 0);
    }

    #[test]
    fn test_list_records_ignores_other_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("readme.md"), "# hi").unwrap();

        let files = list_records(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_handle_invalid_notes_directory() {
        let result = list_records(Path::new("/this/path/does/not/exist"));
        assert!(result.unwrap_err().to_string().contains("notes directory"));
    }
}
