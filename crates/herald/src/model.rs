//! The raw configuration tree.
//!
//! Every field a user may omit is an `Option` (or an empty collection) so
//! that defaulting can tell "unset" apart from "explicitly set". Resolved
//! activation flags are carried on the sections themselves (`resolved`) and
//! are never read from input.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::activation::{Activation, EnabledAware, impl_activatable, impl_timeout_aware};
use crate::types::{FailurePolicy, ProjectState};

/// Default snapshot detection pattern.
pub const DEFAULT_SNAPSHOT_PATTERN: &str = ".*-SNAPSHOT";
/// Default tag used for snapshot releases.
pub const DEFAULT_SNAPSHOT_LABEL: &str = "early-access";
/// Default aggregate checksum file name.
pub const DEFAULT_CHECKSUM_NAME: &str = "checksums.txt";

/// Root of the configuration tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub project: ProjectConfig,
    pub distributions: BTreeMap<String, Distribution>,
    pub files: FilesConfig,
    pub checksum: ChecksumConfig,
    pub signing: SigningConfig,
    pub release: ReleaseConfig,
    pub deploy: DeployConfig,
    pub download: DownloadConfig,
    pub upload: UploadConfig,
    pub announce: AnnounceConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    /// `semver` (default), `calver:<FORMAT>`, or `custom`.
    pub version_pattern: Option<String>,
    pub snapshot: SnapshotConfig,
    pub prerelease: PrereleaseConfig,
    /// Filled by the project validator.
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProjectState>,
}

impl ProjectConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or_default()
    }

    pub fn is_snapshot(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.snapshot)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Explicit flag; overrides pattern matching when set.
    pub enabled: Option<bool>,
    pub pattern: Option<String>,
    /// Tag name used by releasers for snapshot releases.
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrereleaseConfig {
    pub enabled: Option<bool>,
    pub pattern: Option<String>,
}

/// Version scheme a project version must follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPattern {
    Semver,
    Calver(String),
    Custom,
}

impl VersionPattern {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "semver" => Some(VersionPattern::Semver),
            "custom" => Some(VersionPattern::Custom),
            lower if lower.starts_with("calver:") => {
                let format = value["calver:".len()..].trim();
                (!format.is_empty()).then(|| VersionPattern::Calver(format.to_string()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPattern::Semver => f.write_str("semver"),
            VersionPattern::Calver(format) => write!(f, "calver:{format}"),
            VersionPattern::Custom => f.write_str("custom"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Distribution {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub artifacts: Vec<PathBuf>,
}

impl_activatable!(Distribution);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub artifacts: Vec<PathBuf>,
}

impl_activatable!(FilesConfig);

/// Digest algorithms available for checksums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl Algorithm {
    /// File extension used for individual checksum files.
    pub fn extension(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Sha384 => "sha384",
            Algorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksumConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// Aggregate checksum file name.
    pub name: Option<String>,
    /// Also write one `<file>.<algorithm>` per artifact.
    pub individual: Option<bool>,
    /// Include distribution artifacts.
    pub artifacts: Option<bool>,
    /// Include `files` artifacts.
    pub files: Option<bool>,
    pub algorithms: Vec<Algorithm>,
}

impl_activatable!(ChecksumConfig);

impl ChecksumConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_CHECKSUM_NAME)
    }

    pub fn individual(&self) -> bool {
        self.individual.unwrap_or(false)
    }

    pub fn include_artifacts(&self) -> bool {
        self.artifacts.unwrap_or(true)
    }

    pub fn include_files(&self) -> bool {
        self.files.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub armored: Option<bool>,
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub passphrase: Option<String>,
}

impl_activatable!(SigningConfig, Activation::Never);

/// Git hosting flavours that can tag and publish a release.
///
/// Declaration order is the schema order used for every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaserKind {
    Github,
    Gitlab,
    Gitea,
    Codeberg,
    Generic,
}

impl ReleaserKind {
    pub const ALL: [ReleaserKind; 5] = [
        ReleaserKind::Github,
        ReleaserKind::Gitlab,
        ReleaserKind::Gitea,
        ReleaserKind::Codeberg,
        ReleaserKind::Generic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReleaserKind::Github => "github",
            ReleaserKind::Gitlab => "gitlab",
            ReleaserKind::Gitea => "gitea",
            ReleaserKind::Codeberg => "codeberg",
            ReleaserKind::Generic => "generic",
        }
    }

    pub fn default_host(self) -> Option<&'static str> {
        match self {
            ReleaserKind::Github => Some("github.com"),
            ReleaserKind::Gitlab => Some("gitlab.com"),
            ReleaserKind::Codeberg => Some("codeberg.org"),
            ReleaserKind::Gitea | ReleaserKind::Generic => None,
        }
    }

    pub fn default_api_endpoint(self) -> Option<&'static str> {
        match self {
            ReleaserKind::Github => Some("https://api.github.com"),
            ReleaserKind::Gitlab => Some("https://gitlab.com/api/v4"),
            ReleaserKind::Codeberg => Some("https://codeberg.org/api/v1"),
            ReleaserKind::Gitea | ReleaserKind::Generic => None,
        }
    }

    /// Whether this flavour can attach assets to a release.
    pub fn supports_assets(self) -> bool {
        matches!(
            self,
            ReleaserKind::Github | ReleaserKind::Gitea | ReleaserKind::Codeberg
        )
    }

    /// Whether this flavour talks to a hosting API (and needs a token).
    pub fn is_hosted(self) -> bool {
        !matches!(self, ReleaserKind::Generic)
    }
}

impl fmt::Display for ReleaserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub github: Option<GitService>,
    pub gitlab: Option<GitService>,
    pub gitea: Option<GitService>,
    pub codeberg: Option<GitService>,
    pub generic: Option<GitService>,
}

impl ReleaseConfig {
    pub fn get(&self, kind: ReleaserKind) -> Option<&GitService> {
        match kind {
            ReleaserKind::Github => self.github.as_ref(),
            ReleaserKind::Gitlab => self.gitlab.as_ref(),
            ReleaserKind::Gitea => self.gitea.as_ref(),
            ReleaserKind::Codeberg => self.codeberg.as_ref(),
            ReleaserKind::Generic => self.generic.as_ref(),
        }
    }

    pub fn get_mut(&mut self, kind: ReleaserKind) -> Option<&mut GitService> {
        match kind {
            ReleaserKind::Github => self.github.as_mut(),
            ReleaserKind::Gitlab => self.gitlab.as_mut(),
            ReleaserKind::Gitea => self.gitea.as_mut(),
            ReleaserKind::Codeberg => self.codeberg.as_mut(),
            ReleaserKind::Generic => self.generic.as_mut(),
        }
    }

    /// Present sections, in schema order.
    pub fn configured(&self) -> impl Iterator<Item = (ReleaserKind, &GitService)> {
        ReleaserKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind).map(|svc| (kind, svc)))
    }

    /// Present and enabled sections, in schema order.
    pub fn enabled(&self) -> impl Iterator<Item = (ReleaserKind, &GitService)> {
        self.configured().filter(|(_, svc)| svc.is_enabled())
    }
}

/// One git hosting releaser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitService {
    pub enabled: Option<bool>,
    pub owner: Option<String>,
    /// Repository name; defaults to the project name.
    pub name: Option<String>,
    pub host: Option<String>,
    pub api_endpoint: Option<String>,
    /// Token, or `env:VAR` / `file:/path`.
    pub token: Option<String>,
    pub tag_name: Option<String>,
    pub release_name: Option<String>,
    pub draft: Option<bool>,
    pub prerelease: Option<bool>,
    pub upload_assets: Option<bool>,
    pub connect_timeout: Option<u32>,
    pub read_timeout: Option<u32>,
}

impl EnabledAware for GitService {
    fn enabled_flag(&self) -> Option<bool> {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = Some(enabled);
    }
}

impl_timeout_aware!(GitService);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub on_failure: Option<FailurePolicy>,
    pub artifactory: Option<MavenDeployer>,
    pub github: Option<MavenDeployer>,
    pub nexus2: Option<MavenDeployer>,
}

impl_activatable!(DeployConfig);

/// Deploy target flavours; at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployerKind {
    Artifactory,
    Github,
    Nexus2,
}

impl DeployerKind {
    pub const ALL: [DeployerKind; 3] = [
        DeployerKind::Artifactory,
        DeployerKind::Github,
        DeployerKind::Nexus2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DeployerKind::Artifactory => "artifactory",
            DeployerKind::Github => "github",
            DeployerKind::Nexus2 => "nexus2",
        }
    }
}

impl fmt::Display for DeployerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl DeployConfig {
    pub fn get(&self, kind: DeployerKind) -> Option<&MavenDeployer> {
        match kind {
            DeployerKind::Artifactory => self.artifactory.as_ref(),
            DeployerKind::Github => self.github.as_ref(),
            DeployerKind::Nexus2 => self.nexus2.as_ref(),
        }
    }

    pub fn get_mut(&mut self, kind: DeployerKind) -> Option<&mut MavenDeployer> {
        match kind {
            DeployerKind::Artifactory => self.artifactory.as_mut(),
            DeployerKind::Github => self.github.as_mut(),
            DeployerKind::Nexus2 => self.nexus2.as_mut(),
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MavenDeployer {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Directory whose contents are deployed, relative to the base directory.
    pub staging_repository: Option<PathBuf>,
    pub snapshot_supported: Option<bool>,
    pub connect_timeout: Option<u32>,
    pub read_timeout: Option<u32>,
}

impl_activatable!(MavenDeployer);
impl_timeout_aware!(MavenDeployer);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub on_failure: Option<FailurePolicy>,
    pub http: BTreeMap<String, HttpDownloader>,
}

impl_activatable!(DownloadConfig);

impl DownloadConfig {
    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpDownloader {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// Base URL for relative asset inputs.
    pub url: Option<String>,
    pub assets: Vec<DownloadAsset>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Option<u32>,
    pub read_timeout: Option<u32>,
}

impl_activatable!(HttpDownloader);
impl_timeout_aware!(HttpDownloader);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadAsset {
    /// Source URL template, absolute or relative to the downloader `url`.
    pub input: String,
    /// Output file name; defaults to the last URL path segment.
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    pub on_failure: Option<FailurePolicy>,
    pub http: BTreeMap<String, HttpUploader>,
}

impl_activatable!(UploadConfig);

impl UploadConfig {
    pub fn failure_policy(&self) -> FailurePolicy {
        self.on_failure.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HttpMethod {
    #[default]
    Put,
    Post,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpUploader {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// Target URL template; may reference `{{artifactFileName}}`.
    pub url: Option<String>,
    pub method: Option<HttpMethod>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub artifacts: Option<bool>,
    pub files: Option<bool>,
    pub checksums: Option<bool>,
    pub connect_timeout: Option<u32>,
    pub read_timeout: Option<u32>,
}

impl_activatable!(HttpUploader);
impl_timeout_aware!(HttpUploader);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnounceConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// Run announcers concurrently.
    pub parallel: Option<bool>,
    pub discord: Option<AnnouncerConfig>,
    pub mattermost: Option<AnnouncerConfig>,
    pub slack: Option<AnnouncerConfig>,
    pub teams: Option<AnnouncerConfig>,
    pub webhooks: BTreeMap<String, AnnouncerConfig>,
}

impl_activatable!(AnnounceConfig);

/// Chat flavours with a dedicated section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChatKind {
    Discord,
    Mattermost,
    Slack,
    Teams,
}

impl ChatKind {
    pub const ALL: [ChatKind; 4] = [
        ChatKind::Discord,
        ChatKind::Mattermost,
        ChatKind::Slack,
        ChatKind::Teams,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChatKind::Discord => "discord",
            ChatKind::Mattermost => "mattermost",
            ChatKind::Slack => "slack",
            ChatKind::Teams => "teams",
        }
    }
}

impl AnnounceConfig {
    pub fn chat(&self, kind: ChatKind) -> Option<&AnnouncerConfig> {
        match kind {
            ChatKind::Discord => self.discord.as_ref(),
            ChatKind::Mattermost => self.mattermost.as_ref(),
            ChatKind::Slack => self.slack.as_ref(),
            ChatKind::Teams => self.teams.as_ref(),
        }
    }

    pub fn chat_mut(&mut self, kind: ChatKind) -> Option<&mut AnnouncerConfig> {
        match kind {
            ChatKind::Discord => self.discord.as_mut(),
            ChatKind::Mattermost => self.mattermost.as_mut(),
            ChatKind::Slack => self.slack.as_mut(),
            ChatKind::Teams => self.teams.as_mut(),
        }
    }

    pub fn parallel(&self) -> bool {
        self.parallel.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    pub active: Option<Activation>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<bool>,
    /// Incoming webhook URL, or `env:VAR` / `file:/path`.
    pub webhook: Option<String>,
    /// Message template.
    pub message: Option<String>,
    pub title: Option<String>,
    /// HMAC secret (generic webhooks only).
    pub secret: Option<String>,
    pub connect_timeout: Option<u32>,
    pub read_timeout: Option<u32>,
}

impl_activatable!(AnnouncerConfig);
impl_timeout_aware!(AnnouncerConfig);
