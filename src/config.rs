use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::pr::PullRequestContext;

/// Name of the optional tunables file looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = ".doc-agent.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Tunables loaded from .doc-agent.toml.
///
/// All sections are optional; the agent runs with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github: GitHubSettings,

    #[serde(default)]
    pub generation: GenerationSettings,

    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub docs: DocsSettings,

    #[serde(default)]
    pub collector: CollectorSettings,

    #[serde(default)]
    pub git: GitSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// REST API base, overridable for GitHub Enterprise
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Hard prefix cut applied to the PR diff before prompting
    pub max_diff_chars: usize,
    /// Hard prefix cut applied to the concatenated codebase bundle
    pub max_bundle_chars: usize,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_diff_chars: 30_000,
            max_bundle_chars: 400_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocsSettings {
    /// Documentation directory, relative to the repository root
    pub dir: String,
}

impl Default for DocsSettings {
    fn default() -> Self {
        Self {
            dir: "docs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    /// File extensions (without the dot) fed into the architecture prompt
    pub extensions: Vec<String>,
    /// Path segments that exclude a file wherever they appear
    pub exclude_dirs: Vec<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        let extensions = [
            "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "rb", "php", "cs", "c", "h",
            "cpp", "hpp", "swift", "scala", "sh",
        ];
        let exclude_dirs = [
            ".git",
            "target",
            "node_modules",
            "dist",
            "build",
            "__pycache__",
            ".venv",
            "venv",
            "vendor",
        ];
        Self {
            extensions: extensions.iter().map(|s| s.to_string()).collect(),
            exclude_dirs: exclude_dirs.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub remote: String,
    pub bot_name: String,
    pub bot_email: String,
    pub commit_message: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            bot_name: "github-actions[bot]".to_string(),
            bot_email: "41898282+github-actions[bot]@users.noreply.github.com".to_string(),
            commit_message: "docs: update AI-generated documentation [skip ci]".to_string(),
        }
    }
}

impl Settings {
    /// Load settings for a repository checkout.
    ///
    /// An explicit path must exist. Otherwise .doc-agent.toml in the
    /// repository root is used when present, falling back to defaults.
    pub fn load(explicit: Option<&Path>, repo_root: &Path) -> Result<Settings, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        let path = repo_root.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Settings::default())
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Deny-list used by the codebase collector: the configured segments
    /// plus the documentation directory itself.
    pub fn excluded_segments(&self) -> Vec<String> {
        let mut segments = self.collector.exclude_dirs.clone();
        for segment in Path::new(&self.docs.dir).components() {
            let segment = segment.as_os_str().to_string_lossy().to_string();
            if segment != "." && !segments.contains(&segment) {
                segments.push(segment);
            }
        }
        segments
    }
}

/// Raw required values as handed to the process (flags or environment).
#[derive(Debug, Clone, Default)]
pub struct ContextValues {
    pub ai_credential: Option<String>,
    pub hosting_token: Option<String>,
    pub repository: Option<String>,
    pub pr_number: Option<String>,
    pub branch: Option<String>,
}

impl PullRequestContext {
    /// Validate the required values and build the run's context.
    ///
    /// Every value must be present and non-blank; nothing touches the
    /// network before this succeeds.
    pub fn load(values: ContextValues) -> Result<PullRequestContext, ConfigError> {
        let ai_credential = require("GEMINI_API_KEY", values.ai_credential)?;
        let hosting_token = require("GITHUB_TOKEN", values.hosting_token)?;
        let repository = require("GITHUB_REPOSITORY", values.repository)?;
        let pr_number = require("PR_NUMBER", values.pr_number)?;
        let branch = require("GITHUB_HEAD_REF", values.branch)?;

        let valid_repo = matches!(
            repository.split_once('/'),
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/')
        );
        if !valid_repo {
            return Err(ConfigError::Invalid {
                name: "GITHUB_REPOSITORY",
                reason: format!("expected owner/repo, got {repository:?}"),
            });
        }

        let pr_number = match pr_number.parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "PR_NUMBER",
                    reason: format!("expected a positive integer, got {pr_number:?}"),
                })
            }
        };

        Ok(PullRequestContext {
            repository,
            pr_number,
            branch,
            hosting_token,
            ai_credential,
        })
    }
}

fn require(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_values() -> ContextValues {
        ContextValues {
            ai_credential: Some("gemini-key".to_string()),
            hosting_token: Some("ghp_token".to_string()),
            repository: Some("org/repo".to_string()),
            pr_number: Some("42".to_string()),
            branch: Some("feature/login".to_string()),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.github.api_base, "https://api.github.com");
        assert_eq!(settings.generation.model, "gemini-1.5-flash");
        assert_eq!(settings.limits.max_diff_chars, 30_000);
        assert_eq!(settings.docs.dir, "docs");
        assert!(settings.collector.extensions.contains(&"rs".to_string()));
        assert_eq!(settings.git.remote, "origin");
    }

    #[test]
    fn test_parse_settings_toml() {
        let toml_str = r#"
[generation]
model = "gemini-2.0-flash"

[limits]
max_diff_chars = 1000

[collector]
extensions = ["ts"]
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.generation.model, "gemini-2.0-flash");
        assert_eq!(settings.generation.timeout_secs, 120);
        assert_eq!(settings.limits.max_diff_chars, 1000);
        assert_eq!(settings.limits.max_bundle_chars, 400_000);
        assert_eq!(settings.collector.extensions, vec!["ts".to_string()]);
        assert!(settings.collector.exclude_dirs.contains(&".git".to_string()));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings.docs.dir, "docs");
    }

    #[test]
    fn test_load_reads_repo_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[docs]\ndir = \"documentation\"\n").unwrap();
        let settings = Settings::load(None, dir.path()).unwrap();
        assert_eq!(settings.docs.dir, "documentation");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::load(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(_)));
    }

    #[test]
    fn test_excluded_segments_include_docs_dir() {
        let settings = Settings::default();
        let segments = settings.excluded_segments();
        assert!(segments.contains(&"docs".to_string()));
        assert!(segments.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_context_load_success() {
        let ctx = PullRequestContext::load(full_values()).unwrap();
        assert_eq!(ctx.repository, "org/repo");
        assert_eq!(ctx.pr_number, 42);
        assert_eq!(ctx.branch, "feature/login");
        assert_eq!(ctx.hosting_token, "ghp_token");
        assert_eq!(ctx.ai_credential, "gemini-key");
    }

    #[test]
    fn test_context_missing_value() {
        let mut values = full_values();
        values.hosting_token = None;
        let err = PullRequestContext::load(values).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GITHUB_TOKEN")));
    }

    #[test]
    fn test_context_blank_value_is_missing() {
        let mut values = full_values();
        values.branch = Some("   ".to_string());
        let err = PullRequestContext::load(values).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GITHUB_HEAD_REF")));
    }

    #[test]
    fn test_context_invalid_pr_number() {
        let mut values = full_values();
        values.pr_number = Some("forty-two".to_string());
        let err = PullRequestContext::load(values).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PR_NUMBER", .. }));

        let mut values = full_values();
        values.pr_number = Some("0".to_string());
        assert!(PullRequestContext::load(values).is_err());
    }

    #[test]
    fn test_context_invalid_repository() {
        let mut values = full_values();
        values.repository = Some("just-a-name".to_string());
        let err = PullRequestContext::load(values).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "GITHUB_REPOSITORY", .. }));
    }
}
