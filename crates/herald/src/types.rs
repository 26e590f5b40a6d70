use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution phase selected by the caller for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Validate everything, execute nothing.
    Config,
    /// Prepare checksums and files.
    Assemble,
    /// Fetch remote assets.
    Download,
    /// Push staged artifacts to deploy targets.
    Deploy,
    /// Notify announcers about an existing release.
    Announce,
    /// The whole release pipeline.
    #[default]
    Full,
}

impl Mode {
    /// Categories executed for this mode, in execution order.
    pub fn categories(self) -> &'static [Category] {
        match self {
            Mode::Config => &[],
            Mode::Assemble => &[Category::Prepare],
            Mode::Download => &[Category::Download],
            Mode::Deploy => &[Category::Deploy],
            Mode::Announce => &[Category::Announce],
            Mode::Full => &[
                Category::Prepare,
                Category::Download,
                Category::Deploy,
                Category::Release,
                Category::Upload,
                Category::Announce,
            ],
        }
    }

    /// Whether the validator for `section` applies in this mode.
    pub fn validates(self, section: Section) -> bool {
        use Section::*;
        match self {
            Mode::Config | Mode::Full => true,
            Mode::Assemble => matches!(
                section,
                Project | Distributions | Files | Checksum | Signing
            ),
            Mode::Download => matches!(section, Project | Download),
            Mode::Deploy => matches!(
                section,
                Project | Distributions | Files | Signing | Release | Deploy
            ),
            Mode::Announce => matches!(section, Project | Release | Announce),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Config => "config",
            Mode::Assemble => "assemble",
            Mode::Download => "download",
            Mode::Deploy => "deploy",
            Mode::Announce => "announce",
            Mode::Full => "full",
        };
        f.write_str(s)
    }
}

/// Named configuration subtree, one validator each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Project,
    Distributions,
    Files,
    Checksum,
    Signing,
    Release,
    Deploy,
    Download,
    Upload,
    Announce,
}

/// Provider category. Variant order is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Prepare,
    Download,
    Deploy,
    Release,
    Upload,
    Announce,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Prepare => "prepare",
            Category::Download => "download",
            Category::Deploy => "deploy",
            Category::Release => "release",
            Category::Upload => "upload",
            Category::Announce => "announce",
        };
        f.write_str(s)
    }
}

/// What the orchestrator does when a provider of a category fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the remaining categories.
    #[default]
    Fatal,
    /// Record the failure and keep going.
    Isolated,
}

/// Project state every activation decision is made against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub snapshot: bool,
    pub prerelease: bool,
    pub branch: Option<String>,
    pub tag: Option<String>,
}

impl ProjectState {
    pub fn is_release(&self) -> bool {
        !self.snapshot
    }
}

/// What a releaser published; consumed by upload and announce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub release_name: String,
    /// Human-facing release page (empty for local tags).
    pub url: String,
    /// Hosting-side release id, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Asset upload endpoint, when the hosting API has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
}

/// Git context information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitContext {
    /// Current commit SHA
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Current branch name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// Current tag (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Whether the working tree has uncommitted changes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
}

impl GitContext {
    pub fn short_commit(&self) -> Option<&str> {
        self.commit.as_deref().map(|c| &c[..c.len().min(7)])
    }
}
