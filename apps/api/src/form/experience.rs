use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;

use crate::form::field_errors::{FieldErrorKind, FieldErrors, FieldKey};
use crate::form::validators::{sanitize_rich, sanitize_strict};
use crate::form::{date_error, edit_entry, remove_entry, remove_item, set_item, SectionUpdate};
use crate::models::record::{EntryId, ExperienceEntry, ExperienceKind, RepositoryLink};
use crate::models::repository::RepositorySummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExperienceField {
    Title,
    Organization,
    Location,
    StartDate,
    EndDate,
    Description,
}

impl ExperienceField {
    pub fn name(self) -> &'static str {
        match self {
            ExperienceField::Title => "title",
            ExperienceField::Organization => "organization",
            ExperienceField::Location => "location",
            ExperienceField::StartDate => "startDate",
            ExperienceField::EndDate => "endDate",
            ExperienceField::Description => "description",
        }
    }

    fn sanitize(self, value: &str) -> String {
        match self {
            ExperienceField::Description => sanitize_rich(value),
            _ => sanitize_strict(value),
        }
    }

    fn check(self, value: &str) -> Option<FieldErrorKind> {
        match self {
            ExperienceField::StartDate => date_error(value, true),
            ExperienceField::EndDate => date_error(value, false),
            _ => None,
        }
    }

    fn write(self, entry: &mut ExperienceEntry, value: String) {
        match self {
            ExperienceField::Title => entry.title = value,
            ExperienceField::Organization => entry.organization = value,
            ExperienceField::Location => entry.location = value,
            ExperienceField::StartDate => entry.start_date = value,
            ExperienceField::EndDate => entry.end_date = value,
            ExperienceField::Description => entry.description = value,
        }
    }
}

/// Work, project, volunteer and honor entries, plus the repository selection.
#[derive(Debug, Default)]
pub struct ExperienceSection {
    errors: FieldErrors,
}

impl ExperienceSection {
    pub fn add(
        &self,
        entries: &[ExperienceEntry],
        kind: ExperienceKind,
    ) -> (EntryId, SectionUpdate) {
        let entry = ExperienceEntry::empty(kind);
        let id = entry.id;
        let mut next = entries.to_vec();
        next.push(entry);
        (id, SectionUpdate::Experience(next))
    }

    pub fn update(
        &mut self,
        entries: &[ExperienceEntry],
        id: EntryId,
        field: ExperienceField,
        value: &str,
    ) -> Option<SectionUpdate> {
        let value = field.sanitize(value);
        let outcome = field.check(&value);
        let next = edit_entry(entries, id, |entry| {
            field.write(entry, value);
            true
        })?;
        self.errors.record(FieldKey::entry(id, field.name()), outcome);
        Some(SectionUpdate::Experience(next))
    }

    pub fn set_kind(
        &self,
        entries: &[ExperienceEntry],
        id: EntryId,
        kind: ExperienceKind,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| {
            entry.kind = kind;
            true
        })
        .map(SectionUpdate::Experience)
    }

    pub fn remove(&mut self, entries: &[ExperienceEntry], id: EntryId) -> Option<SectionUpdate> {
        let next = remove_entry(entries, id)?;
        self.errors.clear_entry(id);
        Some(SectionUpdate::Experience(next))
    }

    pub fn add_technology(
        &self,
        entries: &[ExperienceEntry],
        id: EntryId,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| {
            entry.technologies.push(String::new());
            true
        })
        .map(SectionUpdate::Experience)
    }

    pub fn update_technology(
        &self,
        entries: &[ExperienceEntry],
        id: EntryId,
        index: usize,
        value: &str,
    ) -> Option<SectionUpdate> {
        let value = sanitize_strict(value);
        edit_entry(entries, id, |entry| set_item(&mut entry.technologies, index, value))
            .map(SectionUpdate::Experience)
    }

    pub fn remove_technology(
        &self,
        entries: &[ExperienceEntry],
        id: EntryId,
        index: usize,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| remove_item(&mut entry.technologies, index))
            .map(SectionUpdate::Experience)
    }

    /// Attaches a repository snapshot. Empty title, description and
    /// technologies are prefilled from the repository metadata.
    pub fn link_repository(
        &self,
        entries: &[ExperienceEntry],
        id: EntryId,
        repository: &RepositorySummary,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| {
            if entry.title.is_empty() {
                entry.title = sanitize_strict(&repository.name);
            }
            if entry.description.is_empty() {
                if let Some(description) = &repository.description {
                    entry.description = sanitize_rich(description);
                }
            }
            if entry.technologies.is_empty() {
                entry.technologies = technologies_from(repository);
            }
            entry.repository = Some(RepositoryLink {
                repository_id: repository.id,
                snapshot: repository.clone(),
                linked_at: Utc::now(),
            });
            true
        })
        .map(SectionUpdate::Experience)
    }

    pub fn unlink_repository(
        &self,
        entries: &[ExperienceEntry],
        id: EntryId,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| entry.repository.take().is_some())
            .map(SectionUpdate::Experience)
    }

    pub fn select_repository(
        &self,
        selected: &BTreeSet<u64>,
        repository_id: u64,
    ) -> Option<SectionUpdate> {
        let mut next = selected.clone();
        next.insert(repository_id)
            .then_some(SectionUpdate::SelectedRepositories(next))
    }

    pub fn deselect_repository(
        &self,
        selected: &BTreeSet<u64>,
        repository_id: u64,
    ) -> Option<SectionUpdate> {
        let mut next = selected.clone();
        next.remove(&repository_id)
            .then_some(SectionUpdate::SelectedRepositories(next))
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn reset(&mut self) {
        self.errors.clear();
    }
}

fn technologies_from(repository: &RepositorySummary) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let candidates = repository
        .primary_languages()
        .into_iter()
        .map(str::to_string)
        .chain(repository.readme_tags.iter().cloned());
    for tag in candidates {
        if !tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            tags.push(tag);
        }
    }
    tags
}
