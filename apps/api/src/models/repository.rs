use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A GitHub repository as offered to the experience section and forwarded
/// to the generation backend.
///
/// `languages` maps language name to bytes of code, as reported by GitHub.
/// `readme_tags` are technology tags derived from the README text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub languages: BTreeMap<String, u64>,
    #[serde(default)]
    pub readme_tags: Vec<String>,
    pub html_url: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
}

impl RepositorySummary {
    /// Languages ordered by bytes of code, largest first.
    pub fn primary_languages(&self) -> Vec<&str> {
        let mut langs: Vec<(&str, u64)> = self
            .languages
            .iter()
            .map(|(name, bytes)| (name.as_str(), *bytes))
            .collect();
        langs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        langs.into_iter().map(|(name, _)| name).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_languages_sorted_by_size() {
        let repo = RepositorySummary {
            id: 1,
            name: "templar".to_string(),
            full_name: "octo/templar".to_string(),
            description: None,
            private: false,
            topics: vec![],
            languages: BTreeMap::from([
                ("TypeScript".to_string(), 1200),
                ("Rust".to_string(), 90_000),
                ("Shell".to_string(), 40),
            ]),
            readme_tags: vec![],
            html_url: "https://github.com/octo/templar".to_string(),
            stargazers_count: 0,
            forks_count: 0,
        };
        assert_eq!(
            repo.primary_languages(),
            vec!["Rust", "TypeScript", "Shell"]
        );
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"id": 7, "name": "dotfiles", "htmlUrl": "https://github.com/octo/dotfiles"}"#;
        let repo: RepositorySummary = serde_json::from_str(raw).unwrap();
        assert_eq!(repo.id, 7);
        assert!(repo.languages.is_empty());
        assert!(!repo.private);
    }
}
