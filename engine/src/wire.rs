//! Wire formats: the remote blob and the export/import file.
//!
//! All JSON shape validation happens here, once, before data crosses into the
//! typed [`Document`] model. Call sites never inspect raw JSON themselves.
//! Malformed payloads surface as [`Error::MalformedPayload`]; a structurally
//! valid payload is still rejected if it violates the document invariants
//! (duplicate or empty sibling ids).

use crate::{document::Document, error::Result, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version string stamped into export files.
pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// Metadata carried alongside the courses in the remote blob.
///
/// `last_modified` is informational; the sync decision uses the server-side
/// timestamp reported by the remote store, not this field. Both fields are
/// defaulted so blobs written by older clients still parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMetadata {
    #[serde(default = "unix_epoch")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub total_courses: usize,
}

/// The single shared remote blob: `{ courses, metadata }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub courses: Vec<crate::document::Course>,
    #[serde(default = "RemoteDocument::default_metadata")]
    pub metadata: RemoteMetadata,
}

impl RemoteDocument {
    fn default_metadata() -> RemoteMetadata {
        RemoteMetadata {
            last_modified: unix_epoch(),
            total_courses: 0,
        }
    }

    /// Wrap a document for pushing, stamping the given modification instant.
    pub fn from_document(document: &Document, last_modified: DateTime<Utc>) -> Self {
        Self {
            metadata: RemoteMetadata {
                last_modified,
                total_courses: document.len(),
            },
            courses: document.courses.clone(),
        }
    }

    /// Unwrap into the typed document.
    pub fn into_document(self) -> Document {
        Document {
            courses: self.courses,
        }
    }

    /// Serialize for the remote store.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::MalformedPayload(e.to_string()))
    }

    /// Parse and validate a remote payload.
    ///
    /// Unknown fields are ignored; the `courses` array is mandatory. The
    /// parsed document is validated before it is handed out, so malformed
    /// remote data never reaches local state.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self =
            serde_json::from_str(json).map_err(|e| Error::MalformedPayload(e.to_string()))?;
        Document {
            courses: parsed.courses.clone(),
        }
        .validate()?;
        Ok(parsed)
    }
}

/// Metadata stamped into export files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub exported_at: DateTime<Utc>,
    pub version: String,
    pub total_courses: usize,
}

/// A backup file: `{ courses, metadata }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFile {
    pub courses: Vec<crate::document::Course>,
    pub metadata: ExportMetadata,
}

impl ExportFile {
    /// Build an export of the given document at the given instant.
    pub fn from_document(document: &Document, exported_at: DateTime<Utc>) -> Self {
        Self {
            metadata: ExportMetadata {
                exported_at,
                version: EXPORT_FORMAT_VERSION.to_string(),
                total_courses: document.len(),
            },
            courses: document.courses.clone(),
        }
    }

    /// Serialize, pretty-printed for a human-readable backup file.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::MalformedPayload(e.to_string()))
    }
}

/// Import a backup payload.
///
/// Accepts any JSON object with an array-valued `courses` field; everything
/// else in the payload is tolerated and ignored. The result is validated
/// before it is handed out.
pub fn import_document(json: &str) -> Result<Document> {
    #[derive(Deserialize)]
    struct Tolerant {
        courses: Vec<crate::document::Course>,
    }

    let parsed: Tolerant =
        serde_json::from_str(json).map_err(|e| Error::MalformedPayload(e.to_string()))?;
    let document = Document {
        courses: parsed.courses,
    };
    document.validate()?;
    Ok(document)
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Course, Section, Tab, TabKind};

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn sample_document() -> Document {
        let mut course = Course::new("course-1", "Rust Basics", ts(1000));
        course.description = "An introduction".into();
        let mut section = Section::new("sec-1", "Getting Started", ts(1100));
        let mut tab = Tab::new("tab-1", "Install", TabKind::Text, ts(1200));
        tab.content = "rustup default stable".into();
        section.tabs.push(tab);
        course.sections.push(section);
        Document {
            courses: vec![course],
        }
    }

    #[test]
    fn remote_document_roundtrip() {
        let doc = sample_document();
        let blob = RemoteDocument::from_document(&doc, ts(5000));
        assert_eq!(blob.metadata.total_courses, 1);

        let json = blob.to_json().unwrap();
        let parsed = RemoteDocument::from_json(&json).unwrap();
        assert_eq!(parsed.metadata.last_modified, ts(5000));
        assert_eq!(parsed.into_document(), doc);
    }

    #[test]
    fn remote_document_tolerates_missing_metadata() {
        let parsed = RemoteDocument::from_json(r#"{"courses": []}"#).unwrap();
        assert_eq!(parsed.metadata.last_modified, DateTime::<Utc>::UNIX_EPOCH);
        assert!(parsed.into_document().is_empty());
    }

    #[test]
    fn remote_document_rejects_garbage() {
        assert!(matches!(
            RemoteDocument::from_json("not json"),
            Err(Error::MalformedPayload(_))
        ));
        assert!(matches!(
            RemoteDocument::from_json(r#"{"courses": "nope"}"#),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn remote_document_rejects_duplicate_ids() {
        let json = r#"{"courses": [
            {"id": "course-1", "title": "A"},
            {"id": "course-1", "title": "B"}
        ]}"#;
        assert!(matches!(
            RemoteDocument::from_json(json),
            Err(Error::DuplicateId { .. })
        ));
    }

    #[test]
    fn export_stamps_metadata() {
        let doc = sample_document();
        let export = ExportFile::from_document(&doc, ts(7000));
        assert_eq!(export.metadata.version, EXPORT_FORMAT_VERSION);
        assert_eq!(export.metadata.total_courses, 1);
        assert_eq!(export.metadata.exported_at, ts(7000));
    }

    #[test]
    fn export_import_roundtrip_preserves_courses() {
        let doc = sample_document();
        let json = ExportFile::from_document(&doc, ts(7000)).to_json_pretty().unwrap();
        let imported = import_document(&json).unwrap();
        assert_eq!(imported, doc);
    }

    #[test]
    fn import_tolerates_extra_shape() {
        let json = r#"{
            "courses": [{"id": "course-1", "title": "Rust"}],
            "metadata": {"anything": true},
            "settings": {"theme": "dark"},
            "unrelated": [1, 2, 3]
        }"#;
        let imported = import_document(json).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported.course("course-1").unwrap().title, "Rust");
    }

    #[test]
    fn import_requires_courses_array() {
        assert!(matches!(
            import_document(r#"{"metadata": {}}"#),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn import_accepts_legacy_numeric_ids() {
        let json = r#"{"courses": [{"id": 1719849600000, "title": "Legacy"}]}"#;
        let imported = import_document(json).unwrap();
        assert_eq!(imported.course("1719849600000").unwrap().title, "Legacy");
    }
}
