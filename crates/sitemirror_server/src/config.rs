use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Admin listener host (default: 127.0.0.1)
    pub host: String,
    /// Admin listener port (default: 3040)
    pub port: u16,
    /// Content database file path (default: ./site_content.db)
    pub database_path: PathBuf,
    /// Snapshot writer configuration
    pub snapshot: SnapshotConfig,
    /// Git mirror configuration
    pub git: GitSyncConfig,
}

/// Snapshot writer configuration.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Write snapshots at all (default: true)
    pub enabled: bool,
    /// Directory the artifacts are written to (default: ./content-snapshot)
    pub dir: PathBuf,
    /// Quiescence window before a scheduled write fires (default: 600ms)
    pub debounce: Duration,
}

/// Git mirror configuration.
#[derive(Debug, Clone)]
pub struct GitSyncConfig {
    /// Mirror snapshots into git (default: true iff a token is set)
    pub enabled: bool,
    /// Credential token (GITHUB_TOKEN, then GH_TOKEN, then GIT_TOKEN)
    pub token: Option<String>,
    /// Local working tree to commit in (default: .)
    pub workdir: PathBuf,
    /// Remote whose URL is pushed to (default: origin)
    pub remote_name: String,
    /// Explicit push URL, overrides the remote's URL
    pub remote_url: Option<String>,
    /// `owner/repo` for the API strategy
    pub repository: Option<String>,
    /// Directory inside the remote repository holding the artifacts (default: content-snapshot)
    pub path_prefix: String,
    /// Target branch (default: main)
    pub branch: String,
    /// Commit message prefix (default: "chore(content): snapshot")
    pub commit_prefix: String,
    /// API base URL (default: https://api.github.com)
    pub api_base_url: String,
    /// Author name for local commits
    pub author_name: String,
    /// Author email for local commits
    pub author_email: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("./content-snapshot"),
            debounce: Duration::from_millis(600),
        }
    }
}

impl Default for GitSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: None,
            workdir: PathBuf::from("."),
            remote_name: "origin".to_string(),
            remote_url: None,
            repository: None,
            path_prefix: "content-snapshot".to_string(),
            branch: "main".to_string(),
            commit_prefix: "chore(content): snapshot".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            author_name: "Site Editor".to_string(),
            author_email: "site-editor@users.noreply.github.com".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("PORT")
            .unwrap_or_else(|| "3040".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_path =
            PathBuf::from(var("DATABASE_PATH").unwrap_or_else(|| "./site_content.db".to_string()));

        let snapshot_defaults = SnapshotConfig::default();
        let snapshot = SnapshotConfig {
            enabled: parse_flag("SNAPSHOT_ENABLED", var("SNAPSHOT_ENABLED"), true)?,
            dir: var("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(snapshot_defaults.dir),
            debounce: match var("SNAPSHOT_DEBOUNCE_MS") {
                Some(raw) => Duration::from_millis(
                    raw.parse()
                        .map_err(|_| ConfigError::InvalidNumber("SNAPSHOT_DEBOUNCE_MS"))?,
                ),
                None => snapshot_defaults.debounce,
            },
        };

        let token = var("GITHUB_TOKEN")
            .or_else(|| var("GH_TOKEN"))
            .or_else(|| var("GIT_TOKEN"));

        let repository = var("GITHUB_REPOSITORY").or_else(|| {
            match (var("VERCEL_GIT_REPO_OWNER"), var("VERCEL_GIT_REPO_SLUG")) {
                (Some(owner), Some(slug)) => Some(format!("{}/{}", owner, slug)),
                _ => None,
            }
        });

        let git_defaults = GitSyncConfig::default();
        let git = GitSyncConfig {
            enabled: parse_flag("GIT_SYNC_ENABLED", var("GIT_SYNC_ENABLED"), token.is_some())?,
            workdir: var("GIT_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or(git_defaults.workdir),
            remote_name: var("GIT_REMOTE").unwrap_or(git_defaults.remote_name),
            remote_url: var("GIT_REMOTE_URL"),
            repository,
            path_prefix: var("GIT_SNAPSHOT_PATH")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or(git_defaults.path_prefix),
            branch: var("GIT_BRANCH").unwrap_or(git_defaults.branch),
            commit_prefix: var("GIT_COMMIT_PREFIX").unwrap_or(git_defaults.commit_prefix),
            api_base_url: var("GITHUB_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(git_defaults.api_base_url),
            author_name: var("GIT_AUTHOR_NAME").unwrap_or(git_defaults.author_name),
            author_email: var("GIT_AUTHOR_EMAIL").unwrap_or(git_defaults.author_email),
            token,
        };

        Ok(Config {
            host,
            port,
            database_path,
            snapshot,
            git,
        })
    }

    /// Get the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl GitSyncConfig {
    /// Check if the API strategy has everything it needs.
    pub fn is_api_configured(&self) -> bool {
        self.token.is_some() && self.repository.is_some()
    }
}

fn parse_flag(
    name: &'static str,
    raw: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(_) => Err(ConfigError::InvalidFlag(name)),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidNumber(&'static str),
    InvalidFlag(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "Invalid PORT environment variable"),
            ConfigError::InvalidNumber(name) => write!(f, "Invalid number in {}", name),
            ConfigError::InvalidFlag(name) => {
                write!(f, "Invalid boolean in {} (use true/false)", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
