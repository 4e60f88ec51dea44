//! Edge case tests for lectern-engine
//!
//! These tests cover boundary conditions and unusual inputs.

use chrono::{DateTime, Utc};
use lectern_engine::{
    import_document, merge_documents, Course, Document, Error, RemoteDocument, Section, Tab,
    TabKind,
};

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

// ============================================================================
// String Edge Cases
// ============================================================================

#[test]
fn unicode_titles_and_content_survive_the_wire() {
    let titles = vec![
        "日本語テスト",
        "Привет мир",
        "مرحبا بالعالم",
        "🎉🚀💯",
        "Ω≈ç√∫",
        "Hello\nWorld\tTab",
    ];

    let mut doc = Document::new();
    for (i, title) in titles.iter().enumerate() {
        let mut course = Course::new(format!("course-{i}"), *title, at(1_000));
        let mut section = Section::new("sec-1", *title, at(1_000));
        let mut tab = Tab::new("tab-1", *title, TabKind::Text, at(1_000));
        tab.content = title.to_string();
        section.tabs.push(tab);
        course.sections.push(section);
        doc.add_course(course).unwrap();
    }

    let json = RemoteDocument::from_document(&doc, at(2_000)).to_json().unwrap();
    let parsed = RemoteDocument::from_json(&json).unwrap().into_document();
    assert_eq!(parsed, doc);
}

#[test]
fn very_long_tab_content() {
    // 1MB body
    let body = "x".repeat(1024 * 1024);

    let mut course = Course::new("course-1", "Big", at(1_000));
    let mut section = Section::new("sec-1", "Main", at(1_000));
    let mut tab = Tab::new("tab-1", "Blob", TabKind::Text, at(1_000));
    tab.content = body.clone();
    section.tabs.push(tab);
    course.sections.push(section);
    let doc = Document {
        courses: vec![course],
    };

    let json = RemoteDocument::from_document(&doc, at(2_000)).to_json().unwrap();
    let parsed = RemoteDocument::from_json(&json).unwrap().into_document();
    let tab = parsed.course("course-1").unwrap().section("sec-1").unwrap().tab("tab-1");
    assert_eq!(tab.unwrap().content.len(), 1024 * 1024);
}

#[test]
fn empty_titles_are_allowed_but_empty_ids_are_not() {
    let doc = Document {
        courses: vec![Course::new("course-1", "", at(1_000))],
    };
    assert!(doc.validate().is_ok());

    let doc = Document {
        courses: vec![Course::new("", "Untitled", at(1_000))],
    };
    assert!(matches!(doc.validate(), Err(Error::EmptyId("course"))));
}

// ============================================================================
// Empty and Degenerate Documents
// ============================================================================

#[test]
fn merging_empty_documents_is_empty() {
    let merged = merge_documents(&Document::new(), &Document::new());
    assert!(merged.is_empty());
    assert_eq!(merged.latest_modified(), None);
}

#[test]
fn merging_with_an_empty_side_keeps_the_other() {
    let doc = Document {
        courses: vec![Course::new("course-1", "Only", at(1_000))],
    };

    let merged = merge_documents(&doc, &Document::new());
    assert_eq!(merged.len(), 1);
    let merged = merge_documents(&Document::new(), &doc);
    assert_eq!(merged.len(), 1);
}

#[test]
fn course_with_no_sections_merges_cleanly() {
    let local = Document {
        courses: vec![Course::new("course-1", "Bare", at(1_000))],
    };
    let mut remote_course = Course::new("course-1", "Bare", at(1_000));
    remote_course.sections.push(Section::new("sec-1", "Added", at(2_000)));
    let remote = Document {
        courses: vec![remote_course],
    };

    let merged = merge_documents(&local, &remote);
    assert_eq!(merged.course("course-1").unwrap().sections.len(), 1);
}

// ============================================================================
// Timestamp Edge Cases
// ============================================================================

#[test]
fn identical_timestamps_everywhere_favor_local() {
    let mut local_course = Course::new("course-1", "Local Title", at(1_000));
    local_course.touch(at(5_000));
    let mut remote_course = Course::new("course-1", "Remote Title", at(1_000));
    remote_course.touch(at(5_000));

    let merged = merge_documents(
        &Document {
            courses: vec![local_course],
        },
        &Document {
            courses: vec![remote_course],
        },
    );
    assert_eq!(merged.course("course-1").unwrap().title, "Local Title");
}

#[test]
fn epoch_created_at_is_always_the_loser() {
    // A legacy entity with no timestamps deserializes at the epoch and loses
    // against anything that carries a real timestamp.
    let legacy: Course = serde_json::from_str(r#"{"id": "course-1", "title": "Legacy"}"#).unwrap();
    assert_eq!(legacy.effective_at(), DateTime::<Utc>::UNIX_EPOCH);

    let mut fresh = Course::new("course-1", "Fresh", at(1_000));
    fresh.touch(at(1_000));

    let merged = merge_documents(
        &Document {
            courses: vec![legacy],
        },
        &Document {
            courses: vec![fresh],
        },
    );
    assert_eq!(merged.course("course-1").unwrap().title, "Fresh");
}

// ============================================================================
// Legacy Payloads
// ============================================================================

#[test]
fn full_legacy_payload_with_numeric_ids_imports() {
    let json = r#"{
        "courses": [{
            "id": 1719849600000,
            "title": "Legacy Course",
            "sections": [{
                "id": 1719849600001,
                "title": "Legacy Section",
                "tabs": [{
                    "id": 1719849600002,
                    "title": "Legacy Tab",
                    "content": "old notes",
                    "type": "text"
                }]
            }]
        }]
    }"#;

    let doc = import_document(json).unwrap();
    let course = doc.course("1719849600000").unwrap();
    let section = course.section("1719849600001").unwrap();
    assert_eq!(section.tab("1719849600002").unwrap().content, "old notes");
}

#[test]
fn remote_blob_missing_optional_fields_parses() {
    let json = r#"{
        "courses": [{"id": "course-1", "title": "Sparse"}],
        "metadata": {}
    }"#;

    let blob = RemoteDocument::from_json(json).unwrap();
    assert_eq!(blob.metadata.last_modified, DateTime::<Utc>::UNIX_EPOCH);
    let doc = blob.into_document();
    assert!(doc.course("course-1").unwrap().sections.is_empty());
}
