use std::path::{Path, PathBuf};

use itertools::iproduct;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_WORDLIST_PATH: &str = "wordlists/common.txt";

pub const DEFAULT_EXTENSIONS: &[&str] = &["", ".php", ".html", ".txt", ".bak", ".old", ".backup"];

const DEFAULT_WORDLIST_HEADER: &str = "# Default wordlist for path discovery";

const DEFAULT_WORDS: &[&str] = &[
    "index",
    "home",
    "admin",
    "wp-admin",
    "login",
    "wp-login",
    "administrator",
    "backup",
    "backups",
    "webmail",
    "conf",
    "config",
    "phpmyadmin",
    "dashboard",
    "api",
    "v1",
    "api/v1",
    "api/v2",
    "static",
    "uploads",
    "images",
    "img",
    "css",
    "js",
    "assets",
    "docs",
    "documentation",
    "blog",
    "wp-content",
    "includes",
    "include",
    "users",
    "user",
    "admin/login",
    "administrator/login",
    "install",
    "setup",
    "wp-includes",
    "private",
    "public",
    "src",
    "source",
    "test",
    "dev",
    "development",
    "staging",
    "prod",
    "production",
    "wp-json",
    "robots.txt",
    "sitemap.xml",
    ".git",
    ".env",
    ".htaccess",
    ".htpasswd",
    "readme",
    "readme.txt",
    "readme.md",
    "license",
    "license.txt",
    "CHANGELOG",
    "server-status",
    "server-info",
];

#[derive(Debug, Error)]
pub enum WordlistError {
    #[error("failed to read wordlist: {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create default wordlist: {path}: {source}")]
    Bootstrap {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the words of a session come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WordlistSource {
    /// The well-known wordlist location. A minimal list is written there on first use.
    Default(PathBuf),
    /// A user supplied file. Never created when missing.
    FilePath(PathBuf),
    Inline(Vec<String>),
}

impl Default for WordlistSource {
    fn default() -> Self {
        Self::Default(PathBuf::from(DEFAULT_WORDLIST_PATH))
    }
}

impl WordlistSource {
    pub fn describe(&self) -> String {
        match self {
            Self::Default(path) | Self::FilePath(path) => path.display().to_string(),
            Self::Inline(values) => format!("<inline: {} entries>", values.len()),
        }
    }

    /// Returns the base words in source order, comments and blank lines removed.
    pub async fn load(&self) -> Result<Vec<String>, WordlistError> {
        match self {
            Self::Inline(values) => Ok(base_paths(values.iter().map(String::as_str)).collect()),
            Self::Default(path) => {
                ensure_default_wordlist(path).await?;
                read_wordlist_file(path).await
            }
            Self::FilePath(path) => read_wordlist_file(path).await,
        }
    }
}

/// Lazily yields one base path per non-empty, non-comment line.
pub fn base_paths<'a, I>(lines: I) -> impl Iterator<Item = String> + 'a
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: 'a,
{
    lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub word: String,
    pub extension: String,
}

impl Candidate {
    pub fn path(&self) -> String {
        format!("{}{}", self.word, self.extension)
    }
}

/// Expands every word with every extension, word-major, extensions in configured order.
pub fn expand_candidates<'a, I>(
    words: I,
    extensions: &'a [String],
) -> impl Iterator<Item = Candidate> + 'a
where
    I: IntoIterator<Item = String>,
    I::IntoIter: 'a,
{
    iproduct!(words, extensions.iter()).map(|(word, extension)| Candidate {
        word,
        extension: extension.clone(),
    })
}

pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

pub fn default_wordlist_contents() -> String {
    let mut out = String::from(DEFAULT_WORDLIST_HEADER);
    out.push('\n');
    for word in DEFAULT_WORDS {
        out.push_str(word);
        out.push('\n');
    }
    out
}

pub async fn ensure_default_wordlist(path: &Path) -> Result<(), WordlistError> {
    if tokio::fs::metadata(path).await.is_ok() {
        return Ok(());
    }
    let bootstrap_err = |source| WordlistError::Bootstrap {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(bootstrap_err)?;
    }
    tokio::fs::write(path, default_wordlist_contents())
        .await
        .map_err(bootstrap_err)?;
    info!(path = %path.display(), "created default wordlist");
    Ok(())
}

async fn read_wordlist_file(path: &Path) -> Result<Vec<String>, WordlistError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| WordlistError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(base_paths(contents.lines()).collect())
}
