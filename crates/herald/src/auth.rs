//! Secret and token resolution.
//!
//! Secret-bearing fields (`token`, `password`, `secret`, announcer `webhook`)
//! accept three forms:
//! - a literal value,
//! - `env:VAR_NAME`, read from the process environment,
//! - `file:/path/to/secret`, read from disk and trimmed.
//!
//! Releaser tokens additionally fall back to `HERALD_<KIND>_TOKEN` and then
//! `<KIND>_TOKEN` when the section does not configure one.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::model::ReleaserKind;

/// Prefix for an environment variable indirection.
pub const ENV_PREFIX: &str = "env:";
/// Prefix for a file indirection.
pub const FILE_PREFIX: &str = "file:";
/// Prefix of tool-specific token variables.
pub const HERALD_TOKEN_PREFIX: &str = "HERALD_";

/// Where a resolved secret came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    None,
    /// Literal value in the configuration.
    Literal,
    /// Environment variable (named).
    Env(String),
    /// File on disk.
    File(PathBuf),
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::None => write!(f, "none"),
            TokenSource::Literal => write!(f, "config"),
            TokenSource::Env(name) => write!(f, "env {name}"),
            TokenSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// A resolved secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub token: Option<String>,
    pub source: TokenSource,
}

impl AuthInfo {
    pub fn none() -> Self {
        Self {
            token: None,
            source: TokenSource::None,
        }
    }

    pub fn detected(&self) -> bool {
        self.token.is_some()
    }
}

/// Resolve one secret value.
///
/// Relative `file:` paths are taken relative to `base_dir`. An empty result
/// (unset variable, empty file) is an error.
pub fn resolve_secret(value: &str, base_dir: &Path) -> Result<AuthInfo> {
    if let Some(name) = value.strip_prefix(ENV_PREFIX) {
        let name = name.trim();
        let token = env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("environment variable {name} is not set"))?;
        return Ok(AuthInfo {
            token: Some(token),
            source: TokenSource::Env(name.to_string()),
        });
    }

    if let Some(path) = value.strip_prefix(FILE_PREFIX) {
        let path = base_dir.join(path.trim());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read secret file: {}", path.display()))?;
        let token = content.trim().to_string();
        if token.is_empty() {
            return Err(anyhow!("secret file is empty: {}", path.display()));
        }
        return Ok(AuthInfo {
            token: Some(token),
            source: TokenSource::File(path),
        });
    }

    if value.is_empty() {
        return Ok(AuthInfo::none());
    }

    Ok(AuthInfo {
        token: Some(value.to_string()),
        source: TokenSource::Literal,
    })
}

/// Resolve an optional secret field. `None` resolves to no secret.
pub fn resolve_optional(value: Option<&str>, base_dir: &Path) -> Result<Option<String>> {
    match value {
        Some(v) => Ok(resolve_secret(v, base_dir)?.token),
        None => Ok(None),
    }
}

/// Environment variables consulted for a releaser without a configured token.
pub fn token_env_vars(kind: ReleaserKind) -> [String; 2] {
    let upper = kind.name().to_uppercase();
    [
        format!("{HERALD_TOKEN_PREFIX}{upper}_TOKEN"),
        format!("{upper}_TOKEN"),
    ]
}

/// Resolve the API token of a releaser.
///
/// This checks in order:
/// 1. the configured `token` (with indirections),
/// 2. `HERALD_<KIND>_TOKEN`,
/// 3. `<KIND>_TOKEN`.
pub fn resolve_token(kind: ReleaserKind, configured: Option<&str>, base_dir: &Path) -> Result<AuthInfo> {
    if let Some(value) = configured {
        let auth = resolve_secret(value, base_dir)?;
        if auth.detected() {
            return Ok(auth);
        }
    }

    for name in token_env_vars(kind) {
        if let Ok(token) = env::var(&name)
            && !token.is_empty()
        {
            return Ok(AuthInfo {
                token: Some(token),
                source: TokenSource::Env(name),
            });
        }
    }

    Ok(AuthInfo::none())
}

/// Mask a token for safe display (show first 4 and last 4 chars).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 8 {
        return "*".repeat(token.len());
    }
    format!("{}****{}", &token[..4], &token[token.len() - 4..])
}
