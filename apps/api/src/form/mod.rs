// Multi-section resume form: field validators, section models, whole-record
// validation and the orchestrator that owns the record.
// Section models never write the record; they hand back a SectionUpdate that
// the orchestrator commits and persists.

pub mod education;
pub mod experience;
pub mod field_errors;
pub mod handlers;
pub mod orchestrator;
pub mod personal;
pub mod sessions;
pub mod validation;
pub mod validators;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::form::field_errors::FieldErrorKind;
use crate::form::validators::{is_present, is_valid_date};
use crate::models::record::{
    AggregateRecord, EducationEntry, EntryId, ExperienceEntry, PersonalInfo,
};

/// The fixed, ordered stages of the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Personal,
    Education,
    Experience,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Personal, Section::Education, Section::Experience];

    pub fn first() -> Section {
        Section::ALL[0]
    }

    pub fn last() -> Section {
        Section::ALL[Section::ALL.len() - 1]
    }

    fn index(self) -> usize {
        match self {
            Section::Personal => 0,
            Section::Education => 1,
            Section::Experience => 2,
        }
    }

    pub fn next(self) -> Option<Section> {
        Section::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<Section> {
        self.index().checked_sub(1).map(|i| Section::ALL[i])
    }
}

/// A replacement slice produced by a section model, applied by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionUpdate {
    Personal(PersonalInfo),
    Education(Vec<EducationEntry>),
    Experience(Vec<ExperienceEntry>),
    SelectedRepositories(BTreeSet<u64>),
}

impl SectionUpdate {
    pub fn apply(self, record: &mut AggregateRecord) {
        match self {
            SectionUpdate::Personal(personal) => record.personal = personal,
            SectionUpdate::Education(entries) => record.education = entries,
            SectionUpdate::Experience(entries) => record.experience = entries,
            SectionUpdate::SelectedRepositories(ids) => record.selected_repositories = ids,
        }
    }
}

/// Entries addressable by id within their list.
pub trait Entry: Clone {
    fn id(&self) -> EntryId;
}

impl Entry for EducationEntry {
    fn id(&self) -> EntryId {
        self.id
    }
}

impl Entry for ExperienceEntry {
    fn id(&self) -> EntryId {
        self.id
    }
}

/// Copies `entries`, applies `edit` to the one matching `id`.
/// `None` when the id is unknown or `edit` reports nothing changed.
pub(crate) fn edit_entry<T: Entry>(
    entries: &[T],
    id: EntryId,
    edit: impl FnOnce(&mut T) -> bool,
) -> Option<Vec<T>> {
    let mut next = entries.to_vec();
    let entry = next.iter_mut().find(|e| e.id() == id)?;
    edit(entry).then_some(next)
}

pub(crate) fn remove_entry<T: Entry>(entries: &[T], id: EntryId) -> Option<Vec<T>> {
    let position = entries.iter().position(|e| e.id() == id)?;
    let mut next = entries.to_vec();
    next.remove(position);
    Some(next)
}

/// Writes `value` at `index` of a list sub-field; false when out of range.
pub(crate) fn set_item(items: &mut [String], index: usize, value: String) -> bool {
    match items.get_mut(index) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

pub(crate) fn remove_item(items: &mut Vec<String>, index: usize) -> bool {
    if index < items.len() {
        items.remove(index);
        true
    } else {
        false
    }
}

/// Field-level check shared by education and experience dates.
/// Empty values are not errors; completeness is a submission concern.
pub(crate) fn date_error(value: &str, is_start: bool) -> Option<FieldErrorKind> {
    if value.is_empty() {
        None
    } else if !is_valid_date(value) {
        Some(FieldErrorKind::InvalidDate)
    } else if is_start && is_present(value) {
        Some(FieldErrorKind::PresentAsStart)
    } else {
        None
    }
}
