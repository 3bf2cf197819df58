use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::record::EntryId;

/// Why a single field value was flagged. Recorded, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    InvalidEmail,
    InvalidPhone,
    InvalidUrl,
    InvalidDate,
    PresentAsStart,
    InvalidGpa,
    UnsupportedImageType,
    ImageTooLarge,
}

impl FieldErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            FieldErrorKind::InvalidEmail => "Please enter a valid email address",
            FieldErrorKind::InvalidPhone => "Please enter a valid phone number",
            FieldErrorKind::InvalidUrl => "Please enter a valid URL",
            FieldErrorKind::InvalidDate => "Use the format YYYY-MM or 'Present'",
            FieldErrorKind::PresentAsStart => "'Present' can only be used as an end date",
            FieldErrorKind::InvalidGpa => "Use the format earned/total, e.g. 3.8/4.0",
            FieldErrorKind::UnsupportedImageType => "Please upload a JPEG, PNG or WebP image",
            FieldErrorKind::ImageTooLarge => "Image must be 5 MB or smaller",
        }
    }
}

/// Position of a field: the owning entry (none for personal info) and the
/// field's wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKey {
    pub entry: Option<EntryId>,
    pub field: &'static str,
}

impl FieldKey {
    pub fn personal(field: &'static str) -> Self {
        Self { entry: None, field }
    }

    pub fn entry(id: EntryId, field: &'static str) -> Self {
        Self {
            entry: Some(id),
            field,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrorView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<EntryId>,
    pub field: &'static str,
    pub kind: FieldErrorKind,
    pub message: &'static str,
}

/// Per-field error flags held by a section model.
#[derive(Debug, Clone, Default)]
pub struct FieldErrors {
    errors: BTreeMap<FieldKey, FieldErrorKind>,
}

impl FieldErrors {
    /// Sets the flag for `key`, or clears it when `outcome` is `None`.
    pub fn record(&mut self, key: FieldKey, outcome: Option<FieldErrorKind>) {
        match outcome {
            Some(kind) => {
                self.errors.insert(key, kind);
            }
            None => {
                self.errors.remove(&key);
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &FieldKey) -> Option<FieldErrorKind> {
        self.errors.get(key).copied()
    }

    /// Drops every flag belonging to a removed entry.
    pub fn clear_entry(&mut self, id: EntryId) {
        self.errors.retain(|key, _| key.entry != Some(id));
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn views(&self) -> impl Iterator<Item = FieldErrorView> + '_ {
        self.errors.iter().map(|(key, kind)| FieldErrorView {
            entry_id: key.entry,
            field: key.field,
            kind: *kind,
            message: kind.message(),
        })
    }
}
