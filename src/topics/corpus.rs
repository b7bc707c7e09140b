// Topic keyword corpus: the targeting keywords grouped by topic.
//
// The naive extractor only counts words that appear here, and analyzed
// keywords can be mapped back to the topics they belong to.

use std::collections::{BTreeSet, HashSet};

/// A named group of targeting keywords.
#[derive(Debug, Clone, Copy)]
pub struct Topic {
    pub slug: &'static str,
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

pub const DATA_SCIENCE: Topic = Topic {
    slug: "data-science",
    name: "Data Science",
    keywords: &[
        "data-science", "datascience", "machine-learning", "ml", "ai", "pandas", "numpy", "scipy",
        "jupyter", "tensorflow", "pytorch", "keras", "scikit-learn", "sklearn", "matplotlib",
        "statistics", "regression", "classification", "nlp", "spacy", "dataset", "datasets",
        "dataframe", "notebook", "notebooks", "neural", "embeddings", "transformers", "llm",
    ],
};

pub const BACKEND_WEB: Topic = Topic {
    slug: "backend-web",
    name: "Backend Web",
    keywords: &[
        "django", "flask", "fastapi", "rails", "laravel", "express", "api", "rest", "graphql",
        "backend", "server", "database", "postgres", "postgresql", "mysql", "redis", "sqlalchemy",
        "orm", "celery", "http", "spring", "microservices", "grpc",
    ],
};

pub const FRONTEND_WEB: Topic = Topic {
    slug: "frontend-web",
    name: "Frontend Web",
    keywords: &[
        "javascript", "typescript", "react", "vue", "angular", "svelte", "css", "html", "frontend",
        "webpack", "vite", "npm", "yarn", "nodejs", "node", "jquery", "tailwind", "sass", "dom",
        "nextjs", "redux",
    ],
};

pub const SECURITY_PRIVACY: Topic = Topic {
    slug: "security-privacy",
    name: "Security & Privacy",
    keywords: &[
        "security", "privacy", "encryption", "authentication", "oauth", "vulnerability",
        "vulnerabilities", "cve", "xss", "csrf", "tls", "ssl", "cryptography", "gdpr", "firewall",
        "malware", "phishing", "pentest", "infosec",
    ],
};

pub const DEVOPS: Topic = Topic {
    slug: "devops",
    name: "DevOps",
    keywords: &[
        "devops", "docker", "kubernetes", "k8s", "terraform", "ansible", "ci", "cd", "ci-cd",
        "jenkins", "aws", "azure", "gcp", "cloud", "helm", "prometheus", "grafana", "monitoring",
        "deployment", "containers", "serverless", "nginx", "linux",
    ],
};

pub const PYTHON: Topic = Topic {
    slug: "python",
    name: "Python",
    keywords: &[
        "python", "pip", "pypi", "virtualenv", "venv", "conda", "pytest", "asyncio", "django",
        "flask", "pandas", "numpy", "cython", "mypy", "poetry",
    ],
};

pub const GAME_DEV: Topic = Topic {
    slug: "game-dev",
    name: "Game Development",
    keywords: &[
        "gamedev", "game", "games", "unity", "unreal", "godot", "opengl", "vulkan", "directx",
        "shader", "shaders", "sprite", "sprites", "pygame", "physics", "rendering",
    ],
};

pub const BLOCKCHAIN: Topic = Topic {
    slug: "blockchain",
    name: "Blockchain",
    keywords: &[
        "blockchain", "ethereum", "bitcoin", "solidity", "web3", "crypto", "cryptocurrency",
        "nft", "defi", "smart-contract", "smart-contracts", "wallet", "token", "tokens",
    ],
};

pub const TECH_WRITING: Topic = Topic {
    slug: "techwriting",
    name: "Technical Writing",
    keywords: &[
        "documentation", "docs", "sphinx", "mkdocs", "markdown", "restructuredtext", "rst",
        "docstring", "docstrings", "readme", "techwriting", "docs-as-code", "asciidoc",
        "tutorial", "tutorials",
    ],
};

/// Every topic the analyzer targets.
pub const ALL_TOPICS: [Topic; 9] = [
    DATA_SCIENCE,
    BACKEND_WEB,
    FRONTEND_WEB,
    SECURITY_PRIVACY,
    DEVOPS,
    PYTHON,
    GAME_DEV,
    BLOCKCHAIN,
    TECH_WRITING,
];

/// The union of all topic keywords.
pub fn default_corpus() -> HashSet<String> {
    ALL_TOPICS
        .iter()
        .flat_map(|topic| topic.keywords.iter())
        .map(|kw| kw.to_string())
        .collect()
}

/// Map keywords to the slugs of the topics that contain them (sorted, deduplicated).
pub fn topics_for_keywords<S: AsRef<str>>(keywords: &[S]) -> Vec<&'static str> {
    let found: BTreeSet<&'static str> = ALL_TOPICS
        .iter()
        .filter(|topic| {
            keywords
                .iter()
                .any(|kw| topic.keywords.contains(&kw.as_ref()))
        })
        .map(|topic| topic.slug)
        .collect();
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_is_lowercase() {
        for topic in ALL_TOPICS {
            for kw in topic.keywords {
                assert_eq!(*kw, kw.to_lowercase(), "{} in {}", kw, topic.slug);
            }
        }
    }

    #[test]
    fn test_default_corpus_dedupes_shared_keywords() {
        let corpus = default_corpus();
        // "django" lives in both backend-web and python
        assert!(corpus.contains("django"));
        let total: usize = ALL_TOPICS.iter().map(|t| t.keywords.len()).sum();
        assert!(corpus.len() < total);
    }

    #[test]
    fn test_topics_for_keywords() {
        let topics = topics_for_keywords(&["django", "kubernetes"]);
        assert_eq!(topics, vec!["backend-web", "devops", "python"]);
        assert!(topics_for_keywords::<&str>(&[]).is_empty());
        assert!(topics_for_keywords(&["gardening"]).is_empty());
    }
}
