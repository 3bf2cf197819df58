use serde::Deserialize;

use crate::form::field_errors::{FieldErrorKind, FieldErrors, FieldKey};
use crate::form::validators::{
    is_valid_email, is_valid_phone, is_valid_url, sanitize_strict, validate_image, ImageRejection,
};
use crate::form::SectionUpdate;
use crate::models::record::{PersonalInfo, ProfileImage};

const PROFILE_IMAGE_FIELD: &str = "profileImage";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PersonalField {
    FullName,
    Email,
    Phone,
    Location,
    Linkedin,
    Github,
    Website,
}

impl PersonalField {
    pub fn name(self) -> &'static str {
        match self {
            PersonalField::FullName => "fullName",
            PersonalField::Email => "email",
            PersonalField::Phone => "phone",
            PersonalField::Location => "location",
            PersonalField::Linkedin => "linkedin",
            PersonalField::Github => "github",
            PersonalField::Website => "website",
        }
    }

    fn check(self, value: &str) -> Option<FieldErrorKind> {
        if value.is_empty() {
            return None;
        }
        match self {
            PersonalField::Email if !is_valid_email(value) => Some(FieldErrorKind::InvalidEmail),
            PersonalField::Phone if !is_valid_phone(value) => Some(FieldErrorKind::InvalidPhone),
            PersonalField::Linkedin | PersonalField::Github | PersonalField::Website
                if !is_valid_url(value) =>
            {
                Some(FieldErrorKind::InvalidUrl)
            }
            _ => None,
        }
    }

    fn slot(self, personal: &mut PersonalInfo) -> &mut String {
        match self {
            PersonalField::FullName => &mut personal.full_name,
            PersonalField::Email => &mut personal.email,
            PersonalField::Phone => &mut personal.phone,
            PersonalField::Location => &mut personal.location,
            PersonalField::Linkedin => &mut personal.linkedin,
            PersonalField::Github => &mut personal.github,
            PersonalField::Website => &mut personal.website,
        }
    }
}

/// Identity and contact details. Every text field is strictly sanitized.
#[derive(Debug, Default)]
pub struct PersonalSection {
    errors: FieldErrors,
}

impl PersonalSection {
    pub fn update(
        &mut self,
        personal: &PersonalInfo,
        field: PersonalField,
        value: &str,
    ) -> SectionUpdate {
        let value = sanitize_strict(value);
        self.errors
            .record(FieldKey::personal(field.name()), field.check(&value));

        let mut next = personal.clone();
        *field.slot(&mut next) = value;
        SectionUpdate::Personal(next)
    }

    /// Rejections leave the current image untouched.
    pub fn set_image(
        &mut self,
        personal: &PersonalInfo,
        mime_type: &str,
        data: &[u8],
    ) -> Result<SectionUpdate, ImageRejection> {
        let key = FieldKey::personal(PROFILE_IMAGE_FIELD);
        if let Err(rejection) = validate_image(mime_type, data.len()) {
            let kind = match rejection {
                ImageRejection::UnsupportedType { .. } => FieldErrorKind::UnsupportedImageType,
                ImageRejection::TooLarge { .. } => FieldErrorKind::ImageTooLarge,
            };
            self.errors.record(key, Some(kind));
            return Err(rejection);
        }
        self.errors.record(key, None);

        let mut next = personal.clone();
        next.profile_image = Some(ProfileImage {
            mime_type: mime_type.to_string(),
            data: data.to_vec(),
        });
        Ok(SectionUpdate::Personal(next))
    }

    pub fn clear_image(&mut self, personal: &PersonalInfo) -> SectionUpdate {
        self.errors
            .record(FieldKey::personal(PROFILE_IMAGE_FIELD), None);
        let mut next = personal.clone();
        next.profile_image = None;
        SectionUpdate::Personal(next)
    }

    pub fn set_show_icons(&self, personal: &PersonalInfo, show: bool) -> SectionUpdate {
        let mut next = personal.clone();
        next.show_icons = show;
        SectionUpdate::Personal(next)
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

    fn personal_of(update: SectionUpdate) -> PersonalInfo {
        match update {
            SectionUpdate::Personal(p) => p,
            other => panic!("expected personal update, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_email_is_recorded_but_written() {
        let mut section = PersonalSection::default();
        let update = section.update(&PersonalInfo::default(), PersonalField::Email, "ada@");
        let next = personal_of(update);

        assert_eq!(next.email, "ada@");
        assert_eq!(
            section.errors().get(&FieldKey::personal("email")),
            Some(FieldErrorKind::InvalidEmail)
        );
    }

    #[test]
    fn test_fixing_value_clears_error() {
        let mut section = PersonalSection::default();
        let personal = PersonalInfo::default();
        section.update(&personal, PersonalField::Phone, "123");
        assert!(!section.errors().is_empty());

        section.update(&personal, PersonalField::Phone, "+44 20 7946 0958");
        assert!(section.errors().is_empty());
    }

    #[test]
    fn test_markup_is_stripped_from_name() {
        let mut section = PersonalSection::default();
        let next = personal_of(section.update(
            &PersonalInfo::default(),
            PersonalField::FullName,
            "<img src=x onerror=alert(1)>Ada <i>Lovelace</i>",
        ));
        assert_eq!(next.full_name, "Ada Lovelace");
    }

    #[test]
    fn test_empty_optional_url_is_not_an_error() {
        let mut section = PersonalSection::default();
        section.update(&PersonalInfo::default(), PersonalField::Website, "");
        assert!(section.errors().is_empty());
    }

    #[test]
    fn test_relative_linkedin_url_flagged() {
        let mut section = PersonalSection::default();
        section.update(
            &PersonalInfo::default(),
            PersonalField::Linkedin,
            "linkedin.com/in/ada",
        );
        assert_eq!(
            section.errors().get(&FieldKey::personal("linkedin")),
            Some(FieldErrorKind::InvalidUrl)
        );
    }

    #[test]
    fn test_rejected_image_keeps_previous_one() {
        let mut section = PersonalSection::default();
        let personal = personal_of(
            section
                .set_image(&PersonalInfo::default(), "image/png", &[1, 2, 3])
                .unwrap(),
        );

        let svg = vec![0u8; 2 * 1024 * 1024];
        let result = section.set_image(&personal, "image/svg+xml", &svg);

        assert!(matches!(result, Err(ImageRejection::UnsupportedType { .. })));
        assert_eq!(
            personal.profile_image.as_ref().map(|i| i.data.clone()),
            Some(vec![1, 2, 3])
        );
        assert_eq!(
            section.errors().get(&FieldKey::personal("profileImage")),
            Some(FieldErrorKind::UnsupportedImageType)
        );
    }

    #[test]
    fn test_show_icons_toggle() {
        let section = PersonalSection::default();
        let next = personal_of(section.set_show_icons(&PersonalInfo::default(), false));
        assert!(!next.show_icons);
    }
}
