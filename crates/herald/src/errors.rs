//! Typed errors at the registry and provider boundaries.
//!
//! Provider internals use `anyhow`; each category converts at its boundary
//! into one of the action errors below so the engine can attribute the
//! failure without inspecting messages.

use thiserror::Error;

use crate::types::Category;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raised by the provider registry; never by validators.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no releaser is enabled; enable exactly one of release.github, release.gitlab, release.gitea, release.codeberg, release.generic")]
    NoReleaser,
    #[error("only one releaser may be enabled, found: {}", .enabled.join(", "))]
    MultipleReleasers { enabled: Vec<String> },
    #[error("no active {category} provider matches {}", .requested.join(", "))]
    NothingResolved {
        category: Category,
        requested: Vec<String>,
    },
    #[error("{category} provider '{name}' has no configuration section")]
    MissingSection { category: Category, name: String },
}

macro_rules! action_error {
    ($(#[$meta:meta])* $name:ident, $verb:literal) => {
        $(#[$meta])*
        #[derive(Debug, Error)]
        #[error("{provider} failed to {verb}: {source}", verb = $verb)]
        pub struct $name {
            pub provider: String,
            #[source]
            pub source: BoxError,
        }

        impl $name {
            pub fn new(provider: impl Into<String>, source: impl Into<BoxError>) -> Self {
                Self {
                    provider: provider.into(),
                    source: source.into(),
                }
            }
        }
    };
}

action_error!(
    /// Checksum or file preparation failed.
    PrepareError,
    "prepare"
);
action_error!(DownloadError, "download");
action_error!(DeployError, "deploy");
action_error!(
    /// Tagging or publishing the release failed.
    ReleaseError,
    "release"
);
action_error!(UploadError, "upload");
action_error!(AnnounceError, "announce");

/// Build a boxed error from an `anyhow::Error`, keeping its context chain in
/// the message.
pub fn boxed(err: anyhow::Error) -> BoxError {
    format!("{err:#}").into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn multiple_releasers_names_every_section() {
        let err = ConfigurationError::MultipleReleasers {
            enabled: vec!["github".to_string(), "gitlab".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "only one releaser may be enabled, found: github, gitlab"
        );
    }

    #[test]
    fn nothing_resolved_names_category_and_request() {
        let err = ConfigurationError::NothingResolved {
            category: Category::Announce,
            requested: vec!["irc".to_string()],
        };
        assert_eq!(err.to_string(), "no active announce provider matches irc");
    }

    #[test]
    fn action_error_keeps_context_chain() {
        let cause = Err::<(), _>(anyhow::anyhow!("connection refused"))
            .context("POST https://hooks.example.com")
            .unwrap_err();
        let err = AnnounceError::new("slack", boxed(cause));
        assert_eq!(
            err.to_string(),
            "slack failed to announce: POST https://hooks.example.com: connection refused"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
