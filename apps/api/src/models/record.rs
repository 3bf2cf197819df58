use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::repository::RepositorySummary;

/// The literal accepted in date fields for an ongoing entry.
pub const PRESENT: &str = "Present";

/// Identifier of an education or experience entry.
/// Assigned once at creation (UUID v4), never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImage {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub github: String,
    pub website: String,
    pub profile_image: Option<ProfileImage>,
    pub show_icons: bool,
}

impl Default for PersonalInfo {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            location: String::new(),
            linkedin: String::new(),
            github: String::new(),
            website: String::new(),
            profile_image: None,
            show_icons: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub id: EntryId,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub gpa: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl EducationEntry {
    /// A blank entry with a freshly assigned id.
    pub fn empty() -> Self {
        Self {
            id: EntryId::new(),
            institution: String::new(),
            degree: String::new(),
            field_of_study: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            gpa: None,
            achievements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceKind {
    #[default]
    Work,
    Project,
    Volunteer,
    Honor,
}

impl ExperienceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceKind::Work => "work",
            ExperienceKind::Project => "project",
            ExperienceKind::Volunteer => "volunteer",
            ExperienceKind::Honor => "honor",
        }
    }
}

/// A repository attached to an experience entry, with the metadata it had
/// when it was linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryLink {
    pub repository_id: u64,
    pub snapshot: RepositorySummary,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub id: EntryId,
    #[serde(rename = "type", default)]
    pub kind: ExperienceKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub repository: Option<RepositoryLink>,
}

impl ExperienceEntry {
    pub fn empty(kind: ExperienceKind) -> Self {
        Self {
            id: EntryId::new(),
            kind,
            title: String::new(),
            organization: String::new(),
            location: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            description: String::new(),
            technologies: Vec::new(),
            repository: None,
        }
    }

    pub fn is_repository_backed(&self) -> bool {
        self.repository.is_some()
    }
}

/// The complete in-progress resume owned by a form orchestrator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub personal: PersonalInfo,
    pub education: Vec<EducationEntry>,
    pub experience: Vec<ExperienceEntry>,
    /// Repositories forwarded to the generation backend, independent of
    /// the ones linked from experience entries.
    #[serde(default)]
    pub selected_repositories: BTreeSet<u64>,
}

impl AggregateRecord {
    /// Built-in starting point when nothing has been stored yet:
    /// one blank education entry and one blank work entry.
    pub fn template() -> Self {
        Self {
            personal: PersonalInfo::default(),
            education: vec![EducationEntry::empty()],
            experience: vec![ExperienceEntry::empty(ExperienceKind::Work)],
            selected_repositories: BTreeSet::new(),
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_has_one_blank_entry_per_list() {
        let record = AggregateRecord::template();
        assert_eq!(record.education.len(), 1);
        assert_eq!(record.experience.len(), 1);
        assert_eq!(record.experience[0].kind, ExperienceKind::Work);
        assert!(record.personal.show_icons);
        assert!(record.selected_repositories.is_empty());
    }

    #[test]
    fn test_template_ids_are_fresh() {
        let a = AggregateRecord::template();
        let b = AggregateRecord::template();
        assert_ne!(a.education[0].id, b.education[0].id);
        assert_ne!(a.experience[0].id, b.experience[0].id);
    }

    #[test]
    fn test_experience_kind_serializes_under_type_key() {
        let entry = ExperienceEntry::empty(ExperienceKind::Volunteer);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "volunteer");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn test_profile_image_bytes_are_base64_in_json() {
        let image = ProfileImage {
            mime_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        };
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["data"], "iVBORw==");
        let back: ProfileImage = serde_json::from_value(json).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_personal_fields_default_when_missing() {
        let raw = r#"{
            "personal": {"fullName": "Ada Lovelace"},
            "education": [],
            "experience": []
        }"#;
        let record: AggregateRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.personal.full_name, "Ada Lovelace");
        assert!(record.personal.show_icons);
        assert!(record.selected_repositories.is_empty());
    }

    #[test]
    fn test_snapshot_without_sections_is_rejected() {
        let raw = r#"{"personal": {"fullName": "Ada Lovelace"}}"#;
        assert!(serde_json::from_str::<AggregateRecord>(raw).is_err());
    }
}
