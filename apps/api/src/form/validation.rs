//! Whole-record validation, run before handing the record to the
//! generation backend.
//!
//! Rules:
//! - full name and email are required
//! - every education entry needs institution, degree, field of study and both dates
//! - every experience entry not backed by a repository needs title,
//!   organization and both dates
//! - no start date may be `Present`
//! - there must be something to generate from: a selected repository or an
//!   experience entry without a repository link
//!
//! An incomplete education entry blocks submission even when the user is
//! looking at another section; issues are reported as one aggregated list.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::form::validators::is_present;
use crate::form::Section;
use crate::models::record::{AggregateRecord, EntryId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKey {
    FullName,
    Email,
    Education { id: EntryId, field: &'static str },
    Experience { id: EntryId, field: &'static str },
    Content,
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKey::FullName => f.write_str("fullName"),
            IssueKey::Email => f.write_str("email"),
            IssueKey::Education { id, field } => write!(f, "education.{id}.{field}"),
            IssueKey::Experience { id, field } => write!(f, "experience.{id}.{field}"),
            IssueKey::Content => f.write_str("content"),
        }
    }
}

impl Serialize for IssueKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Required,
    PresentAsStart,
    NoContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionIssue {
    pub key: IssueKey,
    pub kind: IssueKind,
    pub section: Section,
    pub message: String,
}

impl SubmissionIssue {
    fn required(key: IssueKey, section: Section, message: String) -> Self {
        Self {
            key,
            kind: IssueKind::Required,
            section,
            message,
        }
    }
}

pub fn validate_record(record: &AggregateRecord) -> Vec<SubmissionIssue> {
    let mut issues = Vec::new();

    if record.personal.full_name.trim().is_empty() {
        issues.push(SubmissionIssue::required(
            IssueKey::FullName,
            Section::Personal,
            "Full name is required".to_string(),
        ));
    }
    if record.personal.email.trim().is_empty() {
        issues.push(SubmissionIssue::required(
            IssueKey::Email,
            Section::Personal,
            "Email is required".to_string(),
        ));
    }

    for (n, entry) in record.education.iter().enumerate() {
        let required = [
            ("institution", "institution", &entry.institution),
            ("degree", "degree", &entry.degree),
            ("fieldOfStudy", "field of study", &entry.field_of_study),
            ("startDate", "start date", &entry.start_date),
            ("endDate", "end date", &entry.end_date),
        ];
        for (field, label, value) in required {
            if value.trim().is_empty() {
                issues.push(SubmissionIssue::required(
                    IssueKey::Education { id: entry.id, field },
                    Section::Education,
                    format!("Education #{}: {label} is required", n + 1),
                ));
            }
        }
        if is_present(&entry.start_date) {
            issues.push(SubmissionIssue {
                key: IssueKey::Education {
                    id: entry.id,
                    field: "startDate",
                },
                kind: IssueKind::PresentAsStart,
                section: Section::Education,
                message: format!("Education #{}: 'Present' can only be an end date", n + 1),
            });
        }
    }

    for (n, entry) in record.experience.iter().enumerate() {
        if !entry.is_repository_backed() {
            let required = [
                ("title", "title", &entry.title),
                ("organization", "organization", &entry.organization),
                ("startDate", "start date", &entry.start_date),
                ("endDate", "end date", &entry.end_date),
            ];
            for (field, label, value) in required {
                if value.trim().is_empty() {
                    issues.push(SubmissionIssue::required(
                        IssueKey::Experience { id: entry.id, field },
                        Section::Experience,
                        format!("Experience #{}: {label} is required", n + 1),
                    ));
                }
            }
        }
        if is_present(&entry.start_date) {
            issues.push(SubmissionIssue {
                key: IssueKey::Experience {
                    id: entry.id,
                    field: "startDate",
                },
                kind: IssueKind::PresentAsStart,
                section: Section::Experience,
                message: format!("Experience #{}: 'Present' can only be an end date", n + 1),
            });
        }
    }

    let has_manual_experience = record.experience.iter().any(|e| !e.is_repository_backed());
    if record.selected_repositories.is_empty() && !has_manual_experience {
        issues.push(SubmissionIssue {
            key: IssueKey::Content,
            kind: IssueKind::NoContent,
            section: Section::Experience,
            message: "Add at least one experience entry or select a GitHub repository".to_string(),
        });
    }

    issues
}
