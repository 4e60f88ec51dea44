//! The course document model.
//!
//! A [`Document`] is the full ordered collection of courses, each holding
//! sections, each holding tabs. Identifiers are caller-assigned and must be
//! unique among siblings. Entities carry creation/update timestamps and are
//! replaced copy-on-write by the sync layer, never mutated in place.

use crate::{error::Result, CourseId, Error, SectionId, TabId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Kind of content a tab holds.
///
/// Closed set, enforced at the deserialization boundary. Free-form type
/// strings from a remote payload are rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    /// Plain text content
    #[default]
    Text,
    /// Embedded video only
    Video,
    /// Text plus embedded video
    Mixed,
}

impl TabKind {
    /// Stable wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TabKind::Text => "text",
            TabKind::Video => "video",
            TabKind::Mixed => "mixed",
        }
    }
}

impl FromStr for TabKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(TabKind::Text),
            "video" => Ok(TabKind::Video),
            "mixed" => Ok(TabKind::Mixed),
            other => Err(Error::InvalidTabKind(other.to_string())),
        }
    }
}

impl fmt::Display for TabKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single content tab inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Unique within the parent section
    #[serde(deserialize_with = "id_compat")]
    pub id: TabId,
    pub title: String,
    /// Text blob (markdown in the editing shell)
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: TabKind,
    #[serde(default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    /// Falls back to `created_at` when absent
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl Tab {
    /// Create a new tab at the given instant.
    pub fn new(id: impl Into<TabId>, title: impl Into<String>, kind: TabKind, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            video_url: None,
            kind,
            created_at: at,
            last_modified: None,
        }
    }

    /// Record a modification at the given instant.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_modified = Some(at.max(self.created_at));
    }

    /// Effective timestamp: `last_modified` if present, else `created_at`.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.last_modified.unwrap_or(self.created_at)
    }
}

/// A titled group of tabs inside a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// Unique within the parent course
    #[serde(deserialize_with = "id_compat")]
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub tabs: Vec<Tab>,
    #[serde(default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Section {
    /// Create a new empty section at the given instant.
    pub fn new(id: impl Into<SectionId>, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tabs: Vec::new(),
            created_at: at,
            updated_at: None,
        }
    }

    /// Record a modification at the given instant.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at.max(self.created_at));
    }

    /// Effective timestamp: `updated_at` if present, else `created_at`.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Find a tab by id.
    pub fn tab(&self, id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.id == id)
    }
}

/// A course: the top-level entity of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Stable, caller-assigned, unique across the collection.
    ///
    /// Legacy exports used numeric ids; deserialization accepts either a
    /// JSON string or number.
    #[serde(deserialize_with = "id_compat")]
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Order is display-significant but not sync-significant
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default = "unix_epoch")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Monotonically increasing, bumped on every mutation
    #[serde(default = "initial_version")]
    pub version: u64,
}

impl Course {
    /// Create a new empty course at the given instant, version 1.
    pub fn new(id: impl Into<CourseId>, title: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            sections: Vec::new(),
            created_at: at,
            updated_at: None,
            version: 1,
        }
    }

    /// Record a mutation at the given instant: bumps `updated_at` and `version`.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at.max(self.created_at));
        self.version += 1;
    }

    /// Effective timestamp: `updated_at` if present, else `created_at`.
    pub fn effective_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    /// Find a section by id.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// The full ordered collection of courses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub courses: Vec<Course>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of courses.
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    /// Check whether the document has no courses.
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Find a course by id.
    pub fn course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    /// Find a course by id, mutably.
    pub fn course_mut(&mut self, id: &str) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.id == id)
    }

    /// Add a course, rejecting a duplicate id.
    pub fn add_course(&mut self, course: Course) -> Result<()> {
        if self.course(&course.id).is_some() {
            return Err(Error::DuplicateId {
                scope: "course",
                id: course.id,
            });
        }
        self.courses.push(course);
        Ok(())
    }

    /// Remove a course by id. Returns true if a course was removed.
    ///
    /// Removal leaves no record behind; a copy still present on another
    /// device will be reintroduced by a later merge.
    pub fn remove_course(&mut self, id: &str) -> bool {
        let before = self.courses.len();
        self.courses.retain(|c| c.id != id);
        self.courses.len() != before
    }

    /// The most recent effective timestamp anywhere in the tree, or `None`
    /// for an empty document.
    pub fn latest_modified(&self) -> Option<DateTime<Utc>> {
        self.courses
            .iter()
            .flat_map(|course| {
                std::iter::once(course.effective_at())
                    .chain(course.sections.iter().flat_map(|section| {
                        std::iter::once(section.effective_at())
                            .chain(section.tabs.iter().map(Tab::effective_at))
                    }))
            })
            .max()
    }

    /// Validate sibling-id uniqueness at every level and reject empty ids.
    ///
    /// This is the single schema check run at the wire boundary before data
    /// crosses into the typed model.
    pub fn validate(&self) -> Result<()> {
        let mut course_ids = HashSet::new();
        for course in &self.courses {
            check_id("course", &course.id, &mut course_ids)?;
            let mut section_ids = HashSet::new();
            for section in &course.sections {
                check_id("section", &section.id, &mut section_ids)?;
                let mut tab_ids = HashSet::new();
                for tab in &section.tabs {
                    check_id("tab", &tab.id, &mut tab_ids)?;
                }
            }
        }
        Ok(())
    }
}

fn check_id<'a>(scope: &'static str, id: &'a str, seen: &mut HashSet<&'a str>) -> Result<()> {
    if id.is_empty() {
        return Err(Error::EmptyId(scope));
    }
    if !seen.insert(id) {
        return Err(Error::DuplicateId {
            scope,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn initial_version() -> u64 {
    1
}

/// Accept a JSON string or number as an id. Legacy exports assigned ids from
/// `Date.now()` and serialized them as numbers.
fn id_compat<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => Ok(s),
        Raw::Number(n) => Ok(n.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn new_course_starts_at_version_one() {
        let course = Course::new("course-1", "Rust Basics", ts(1000));
        assert_eq!(course.version, 1);
        assert_eq!(course.created_at, ts(1000));
        assert!(course.updated_at.is_none());
        assert_eq!(course.effective_at(), ts(1000));
    }

    #[test]
    fn touch_bumps_version_and_updated_at() {
        let mut course = Course::new("course-1", "Rust Basics", ts(1000));
        course.touch(ts(2000));
        assert_eq!(course.version, 2);
        assert_eq!(course.updated_at, Some(ts(2000)));
        assert_eq!(course.effective_at(), ts(2000));
    }

    #[test]
    fn touch_never_moves_updated_at_before_created_at() {
        let mut course = Course::new("course-1", "Rust Basics", ts(1000));
        course.touch(ts(500)); // clock skew
        assert_eq!(course.updated_at, Some(ts(1000)));
    }

    #[test]
    fn tab_effective_falls_back_to_created_at() {
        let mut tab = Tab::new("tab-1", "Intro", TabKind::Text, ts(1000));
        assert_eq!(tab.effective_at(), ts(1000));
        tab.touch(ts(3000));
        assert_eq!(tab.effective_at(), ts(3000));
    }

    #[test]
    fn tab_kind_from_str_closed_set() {
        assert_eq!("text".parse::<TabKind>().unwrap(), TabKind::Text);
        assert_eq!("video".parse::<TabKind>().unwrap(), TabKind::Video);
        assert_eq!("mixed".parse::<TabKind>().unwrap(), TabKind::Mixed);
        assert!(matches!(
            "markdown".parse::<TabKind>(),
            Err(Error::InvalidTabKind(_))
        ));
    }

    #[test]
    fn add_course_rejects_duplicate_id() {
        let mut doc = Document::new();
        doc.add_course(Course::new("course-1", "First", ts(1000))).unwrap();
        let result = doc.add_course(Course::new("course-1", "Second", ts(2000)));
        assert!(matches!(result, Err(Error::DuplicateId { .. })));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn remove_course_leaves_no_record() {
        let mut doc = Document::new();
        doc.add_course(Course::new("course-1", "First", ts(1000))).unwrap();
        assert!(doc.remove_course("course-1"));
        assert!(!doc.remove_course("course-1"));
        assert!(doc.is_empty());
    }

    #[test]
    fn latest_modified_scans_whole_tree() {
        let mut course = Course::new("course-1", "First", ts(1000));
        let mut section = Section::new("sec-1", "Basics", ts(1100));
        let mut tab = Tab::new("tab-1", "Intro", TabKind::Text, ts(1200));
        tab.touch(ts(9000)); // deepest entity is the newest
        section.tabs.push(tab);
        course.sections.push(section);

        let mut doc = Document::new();
        doc.add_course(course).unwrap();
        assert_eq!(doc.latest_modified(), Some(ts(9000)));

        assert_eq!(Document::new().latest_modified(), None);
    }

    #[test]
    fn validate_rejects_duplicate_sibling_ids() {
        let mut course = Course::new("course-1", "First", ts(1000));
        course.sections.push(Section::new("sec-1", "A", ts(1000)));
        course.sections.push(Section::new("sec-1", "B", ts(1000)));

        let mut doc = Document::new();
        doc.courses.push(course);
        assert!(matches!(
            doc.validate(),
            Err(Error::DuplicateId { scope: "section", .. })
        ));
    }

    #[test]
    fn validate_allows_same_id_under_different_parents() {
        let mut course_a = Course::new("course-a", "A", ts(1000));
        course_a.sections.push(Section::new("sec-1", "A1", ts(1000)));
        let mut course_b = Course::new("course-b", "B", ts(1000));
        course_b.sections.push(Section::new("sec-1", "B1", ts(1000)));

        let doc = Document {
            courses: vec![course_a, course_b],
        };
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_id() {
        let doc = Document {
            courses: vec![Course::new("", "Anonymous", ts(1000))],
        };
        assert!(matches!(doc.validate(), Err(Error::EmptyId("course"))));
    }

    #[test]
    fn serialization_uses_camel_case_and_type_tag() {
        let mut tab = Tab::new("tab-1", "Intro", TabKind::Video, ts(1000));
        tab.video_url = Some("https://example.com/v".into());

        let json = serde_json::to_value(&tab).unwrap();
        assert_eq!(json["type"], "video");
        assert!(json.get("videoUrl").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let course: Course = serde_json::from_value(json!({
            "id": 1719849600000u64,
            "title": "Legacy Course"
        }))
        .unwrap();
        assert_eq!(course.id, "1719849600000");
        assert_eq!(course.version, 1);
        assert_eq!(course.created_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn unknown_tab_kind_is_rejected() {
        let result: std::result::Result<Tab, _> = serde_json::from_value(json!({
            "id": "tab-1",
            "title": "Intro",
            "type": "hologram"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let mut course = Course::new("course-1", "Rust Basics", ts(1000));
        course.description = "An introduction".into();
        let mut section = Section::new("sec-1", "Getting Started", ts(1100));
        section.tabs.push(Tab::new("tab-1", "Install", TabKind::Text, ts(1200)));
        course.sections.push(section);
        course.touch(ts(1300));

        let doc = Document {
            courses: vec![course],
        };
        let json = serde_json::to_string(&doc).unwrap();
        let parsed: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, parsed);
    }
}
