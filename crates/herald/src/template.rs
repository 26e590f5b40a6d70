//! `{{key}}` substitution for messages, tag names and URLs.

use std::collections::BTreeMap;

use handlebars::{Handlebars, RenderError, RenderErrorReason};
use thiserror::Error;

pub const PROJECT_NAME: &str = "projectName";
pub const PROJECT_VERSION: &str = "projectVersion";
pub const PROJECT_DESCRIPTION: &str = "projectDescription";
pub const TAG_NAME: &str = "tagName";
pub const RELEASE_NAME: &str = "releaseName";
pub const RELEASE_URL: &str = "releaseUrl";
pub const BRANCH: &str = "branch";
pub const COMMIT_SHORT_HASH: &str = "commitShortHash";
pub const ARTIFACT_FILE_NAME: &str = "artifactFileName";

/// Every key a template may reference.
pub const KNOWN_KEYS: [&str; 9] = [
    PROJECT_NAME,
    PROJECT_VERSION,
    PROJECT_DESCRIPTION,
    TAG_NAME,
    RELEASE_NAME,
    RELEASE_URL,
    BRANCH,
    COMMIT_SHORT_HASH,
    ARTIFACT_FILE_NAME,
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template key '{key}'")]
    UnknownKey { key: String },
    #[error("invalid template: {message}")]
    Syntax { message: String },
}

impl From<RenderError> for TemplateError {
    fn from(err: RenderError) -> Self {
        match err.reason() {
            RenderErrorReason::MissingVariable(Some(key)) => TemplateError::UnknownKey {
                key: key.clone(),
            },
            _ => TemplateError::Syntax {
                message: err.to_string(),
            },
        }
    }
}

/// Property map templates are rendered against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Props {
    values: BTreeMap<String, String>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map with every known key bound to a placeholder; used to check
    /// templates before any real value exists.
    pub fn placeholders() -> Self {
        let mut props = Self::new();
        for key in KNOWN_KEYS {
            props.set(key, format!("<{key}>"));
        }
        props
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

fn engine() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
}

/// Render `template`, replacing every `{{key}}` with its value in `props`.
///
/// Rendering is strict: a key missing from `props` is an error. Values are
/// inserted verbatim, without HTML escaping.
pub fn render(template: &str, props: &Props) -> Result<String, TemplateError> {
    Ok(engine().render_template(template, &props.values)?)
}

/// Render against [`Props::placeholders`], reporting only whether the
/// template is well formed.
pub fn check(template: &str) -> Result<(), TemplateError> {
    render(template, &Props::placeholders()).map(|_| ())
}
