use serde::Deserialize;

use crate::form::field_errors::{FieldErrorKind, FieldErrors, FieldKey};
use crate::form::validators::{is_valid_gpa, sanitize_strict};
use crate::form::{date_error, edit_entry, remove_entry, remove_item, set_item, SectionUpdate};
use crate::models::record::{EducationEntry, EntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EducationField {
    Institution,
    Degree,
    FieldOfStudy,
    StartDate,
    EndDate,
    Gpa,
}

impl EducationField {
    pub fn name(self) -> &'static str {
        match self {
            EducationField::Institution => "institution",
            EducationField::Degree => "degree",
            EducationField::FieldOfStudy => "fieldOfStudy",
            EducationField::StartDate => "startDate",
            EducationField::EndDate => "endDate",
            EducationField::Gpa => "gpa",
        }
    }

    fn check(self, value: &str) -> Option<FieldErrorKind> {
        match self {
            EducationField::StartDate => date_error(value, true),
            EducationField::EndDate => date_error(value, false),
            EducationField::Gpa if !value.is_empty() && !is_valid_gpa(value) => {
                Some(FieldErrorKind::InvalidGpa)
            }
            _ => None,
        }
    }

    fn write(self, entry: &mut EducationEntry, value: String) {
        match self {
            EducationField::Institution => entry.institution = value,
            EducationField::Degree => entry.degree = value,
            EducationField::FieldOfStudy => entry.field_of_study = value,
            EducationField::StartDate => entry.start_date = value,
            EducationField::EndDate => entry.end_date = value,
            EducationField::Gpa => entry.gpa = (!value.is_empty()).then_some(value),
        }
    }
}

/// The education list. Operations on unknown ids or indices yield no update.
#[derive(Debug, Default)]
pub struct EducationSection {
    errors: FieldErrors,
}

impl EducationSection {
    pub fn add(&self, entries: &[EducationEntry]) -> (EntryId, SectionUpdate) {
        let entry = EducationEntry::empty();
        let id = entry.id;
        let mut next = entries.to_vec();
        next.push(entry);
        (id, SectionUpdate::Education(next))
    }

    pub fn update(
        &mut self,
        entries: &[EducationEntry],
        id: EntryId,
        field: EducationField,
        value: &str,
    ) -> Option<SectionUpdate> {
        let value = sanitize_strict(value);
        let outcome = field.check(&value);
        let next = edit_entry(entries, id, |entry| {
            field.write(entry, value);
            true
        })?;
        self.errors.record(FieldKey::entry(id, field.name()), outcome);
        Some(SectionUpdate::Education(next))
    }

    pub fn remove(&mut self, entries: &[EducationEntry], id: EntryId) -> Option<SectionUpdate> {
        let next = remove_entry(entries, id)?;
        self.errors.clear_entry(id);
        Some(SectionUpdate::Education(next))
    }

    pub fn add_achievement(
        &self,
        entries: &[EducationEntry],
        id: EntryId,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| {
            entry.achievements.push(String::new());
            true
        })
        .map(SectionUpdate::Education)
    }

    pub fn update_achievement(
        &self,
        entries: &[EducationEntry],
        id: EntryId,
        index: usize,
        value: &str,
    ) -> Option<SectionUpdate> {
        let value = sanitize_strict(value);
        edit_entry(entries, id, |entry| set_item(&mut entry.achievements, index, value))
            .map(SectionUpdate::Education)
    }

    pub fn remove_achievement(
        &self,
        entries: &[EducationEntry],
        id: EntryId,
        index: usize,
    ) -> Option<SectionUpdate> {
        edit_entry(entries, id, |entry| remove_item(&mut entry.achievements, index))
            .map(SectionUpdate::Education)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn reset(&mut self) {
        self.errors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries_of(update: SectionUpdate) -> Vec<EducationEntry> {
        match update {
            SectionUpdate::Education(entries) => entries,
            other => panic!("expected education update, got {other:?}"),
        }
    }

    #[test]
    fn test_add_then_remove_restores_list() {
        let mut section = EducationSection::default();
        let before = vec![EducationEntry::empty()];

        let (id, update) = section.add(&before);
        let after_add = entries_of(update);
        assert_eq!(after_add.len(), 2);
        assert_eq!(after_add[1].id, id);

        let after_remove = entries_of(section.remove(&after_add, id).unwrap());
        assert_eq!(after_remove, before);
    }

    #[test]
    fn test_ids_are_not_reused_after_removal() {
        let mut section = EducationSection::default();
        let (first, update) = section.add(&[]);
        let entries = entries_of(update);
        let emptied = entries_of(section.remove(&entries, first).unwrap());
        let (second, _) = section.add(&emptied);
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_gpa_is_written_and_flagged() {
        let mut section = EducationSection::default();
        let entries = vec![EducationEntry::empty()];
        let id = entries[0].id;

        let next = entries_of(
            section
                .update(&entries, id, EducationField::Gpa, "4.2/4.0")
                .unwrap(),
        );

        assert_eq!(next[0].gpa.as_deref(), Some("4.2/4.0"));
        assert_eq!(
            section.errors().get(&FieldKey::entry(id, "gpa")),
            Some(FieldErrorKind::InvalidGpa)
        );
    }

    #[test]
    fn test_clearing_gpa_sets_none() {
        let mut section = EducationSection::default();
        let mut entry = EducationEntry::empty();
        entry.gpa = Some("3.9/4.0".to_string());
        let id = entry.id;

        let next = entries_of(section.update(&[entry], id, EducationField::Gpa, "  ").unwrap());
        assert_eq!(next[0].gpa, None);
    }

    #[test]
    fn test_present_start_date_flagged() {
        let mut section = EducationSection::default();
        let entries = vec![EducationEntry::empty()];
        let id = entries[0].id;
        section.update(&entries, id, EducationField::StartDate, "Present");
        assert_eq!(
            section.errors().get(&FieldKey::entry(id, "startDate")),
            Some(FieldErrorKind::PresentAsStart)
        );
    }

    #[test]
    fn test_update_unknown_id_is_noop() {
        let mut section = EducationSection::default();
        let entries = vec![EducationEntry::empty()];
        assert!(section
            .update(&entries, EntryId::new(), EducationField::Degree, "BSc")
            .is_none());
        assert!(section.errors().is_empty());
    }

    #[test]
    fn test_remove_drops_entry_errors() {
        let mut section = EducationSection::default();
        let entries = vec![EducationEntry::empty()];
        let id = entries[0].id;
        section.update(&entries, id, EducationField::EndDate, "someday");
        assert_eq!(section.errors().len(), 1);

        section.remove(&entries, id);
        assert!(section.errors().is_empty());
    }

    #[test]
    fn test_achievement_lifecycle() {
        let section = EducationSection::default();
        let entries = vec![EducationEntry::empty()];
        let id = entries[0].id;

        let entries = entries_of(section.add_achievement(&entries, id).unwrap());
        let entries = entries_of(section.add_achievement(&entries, id).unwrap());
        let entries = entries_of(
            section
                .update_achievement(&entries, id, 1, "<b>Dean's List</b>")
                .unwrap(),
        );
        assert_eq!(entries[0].achievements, vec!["", "Dean's List"]);

        let entries = entries_of(section.remove_achievement(&entries, id, 0).unwrap());
        assert_eq!(entries[0].achievements, vec!["Dean's List"]);

        assert!(section.update_achievement(&entries, id, 5, "x").is_none());
    }
}
