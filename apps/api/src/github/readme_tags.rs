//! Technology tags from README text.
//!
//! Tokens are matched against a fixed vocabulary; anything outside it is ignored.
//! Plain English words that double as technology names ("go", "rest") are
//! left out.

const TECH_VOCABULARY: &[(&str, &str)] = &[
    ("rust", "Rust"),
    ("python", "Python"),
    ("typescript", "TypeScript"),
    ("javascript", "JavaScript"),
    ("golang", "Go"),
    ("java", "Java"),
    ("kotlin", "Kotlin"),
    ("swift", "Swift"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("ruby", "Ruby"),
    ("php", "PHP"),
    ("react", "React"),
    ("vue", "Vue"),
    ("angular", "Angular"),
    ("svelte", "Svelte"),
    ("next.js", "Next.js"),
    ("nextjs", "Next.js"),
    ("node.js", "Node.js"),
    ("nodejs", "Node.js"),
    ("express", "Express"),
    ("django", "Django"),
    ("flask", "Flask"),
    ("fastapi", "FastAPI"),
    ("spring", "Spring"),
    ("rails", "Rails"),
    ("tailwind", "Tailwind CSS"),
    ("tailwindcss", "Tailwind CSS"),
    ("graphql", "GraphQL"),
    ("grpc", "gRPC"),
    ("docker", "Docker"),
    ("kubernetes", "Kubernetes"),
    ("k8s", "Kubernetes"),
    ("terraform", "Terraform"),
    ("aws", "AWS"),
    ("gcp", "GCP"),
    ("azure", "Azure"),
    ("postgresql", "PostgreSQL"),
    ("postgres", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("sqlite", "SQLite"),
    ("mongodb", "MongoDB"),
    ("redis", "Redis"),
    ("kafka", "Kafka"),
    ("tensorflow", "TensorFlow"),
    ("pytorch", "PyTorch"),
    ("webassembly", "WebAssembly"),
    ("wasm", "WebAssembly"),
    ("tokio", "Tokio"),
    ("axum", "Axum"),
];

/// Distinct vocabulary tags found in `text`, sorted.
pub fn derive_readme_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut tags: Vec<String> = lowered
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            TECH_VOCABULARY
                .iter()
                .find(|(needle, _)| *needle == token)
                .map(|(_, tag)| tag.to_string())
        })
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_known_technologies() {
        let readme = "# tiny-db\n\nA key-value store written in Rust, with a Docker image \
                      and a Node.js client. Backed by PostgreSQL.";
        assert_eq!(
            derive_readme_tags(readme),
            vec!["Docker", "Node.js", "PostgreSQL", "Rust"]
        );
    }

    #[test]
    fn test_aliases_collapse_to_one_tag() {
        assert_eq!(
            derive_readme_tags("Deploys to k8s. Kubernetes manifests live in deploy/."),
            vec!["Kubernetes"]
        );
    }

    #[test]
    fn test_sentence_punctuation_is_ignored() {
        assert_eq!(derive_readme_tags("Written in Python."), vec!["Python"]);
        assert_eq!(derive_readme_tags("(React, Redux)"), vec!["React"]);
    }

    #[test]
    fn test_symbols_in_names() {
        assert_eq!(
            derive_readme_tags("Engine core in C++ and tools in C#"),
            vec!["C#", "C++"]
        );
    }

    #[test]
    fn test_common_words_are_not_tags() {
        assert!(derive_readme_tags("Let's go! A REST client for the rest of us.").is_empty());
    }
}
