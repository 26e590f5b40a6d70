//! Default filling.
//!
//! Every filler only writes fields that are still unset, so applying it twice
//! is the same as applying it once and explicit configuration always wins.

use crate::activation::{Activatable, TimeoutAware};
use crate::model::{
    Algorithm, AnnounceConfig, AnnouncerConfig, ChecksumConfig, DEFAULT_CHECKSUM_NAME,
    DEFAULT_SNAPSHOT_LABEL, DEFAULT_SNAPSHOT_PATTERN, DeployConfig, Distribution,
    DownloadConfig, FilesConfig, GitService, HttpDownloader, HttpMethod, HttpUploader,
    MavenDeployer, ProjectConfig, ReleaserKind, SigningConfig, UploadConfig,
};
use crate::types::FailurePolicy;

pub const DEFAULT_TAG_NAME: &str = "v{{projectVersion}}";
pub const DEFAULT_RELEASE_NAME: &str = "Release {{tagName}}";
pub const DEFAULT_ANNOUNCE_MESSAGE: &str =
    "{{projectName}} {{projectVersion}} has been released! {{releaseUrl}}";
pub const DEFAULT_ANNOUNCE_TITLE: &str = "{{projectName}} {{projectVersion}}";

/// Fill unset fields of a section with their defaults.
pub trait FillDefaults {
    fn fill_defaults(&mut self);
}

/// Pin the activation policy to the section's default if none is configured.
pub fn fill_activation<T: Activatable + ?Sized>(section: &mut T) {
    if section.activation().is_none() {
        let policy = section.default_activation();
        section.set_activation(policy);
    }
}

impl FillDefaults for ProjectConfig {
    fn fill_defaults(&mut self) {
        self.version_pattern.get_or_insert_with(|| "semver".to_string());
        self.snapshot
            .pattern
            .get_or_insert_with(|| DEFAULT_SNAPSHOT_PATTERN.to_string());
        self.snapshot
            .label
            .get_or_insert_with(|| DEFAULT_SNAPSHOT_LABEL.to_string());
    }
}

impl FillDefaults for Distribution {
    fn fill_defaults(&mut self) {
        fill_activation(self);
    }
}

impl FillDefaults for FilesConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
    }
}

impl FillDefaults for ChecksumConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.name.get_or_insert_with(|| DEFAULT_CHECKSUM_NAME.to_string());
        self.individual.get_or_insert(false);
        self.artifacts.get_or_insert(true);
        self.files.get_or_insert(true);
        if !self.algorithms.contains(&Algorithm::Sha256) {
            self.algorithms.push(Algorithm::Sha256);
        }
    }
}

impl FillDefaults for SigningConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.armored.get_or_insert(true);
    }
}

impl FillDefaults for MavenDeployer {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.snapshot_supported.get_or_insert(true);
        self.fill_timeouts();
    }
}

impl FillDefaults for DeployConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.on_failure.get_or_insert(FailurePolicy::Fatal);
        for deployer in [
            self.artifactory.as_mut(),
            self.github.as_mut(),
            self.nexus2.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            deployer.fill_defaults();
        }
    }
}

impl FillDefaults for HttpDownloader {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.fill_timeouts();
    }
}

impl FillDefaults for DownloadConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.on_failure.get_or_insert(FailurePolicy::Fatal);
        self.http.values_mut().for_each(FillDefaults::fill_defaults);
    }
}

impl FillDefaults for HttpUploader {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.method.get_or_insert(HttpMethod::Put);
        self.artifacts.get_or_insert(true);
        self.files.get_or_insert(true);
        self.checksums.get_or_insert(true);
        self.fill_timeouts();
    }
}

impl FillDefaults for UploadConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.on_failure.get_or_insert(FailurePolicy::Fatal);
        self.http.values_mut().for_each(FillDefaults::fill_defaults);
    }
}

impl FillDefaults for AnnouncerConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.message
            .get_or_insert_with(|| DEFAULT_ANNOUNCE_MESSAGE.to_string());
        self.title
            .get_or_insert_with(|| DEFAULT_ANNOUNCE_TITLE.to_string());
        self.fill_timeouts();
    }
}

impl FillDefaults for AnnounceConfig {
    fn fill_defaults(&mut self) {
        fill_activation(self);
        self.parallel.get_or_insert(false);
        for announcer in [
            self.discord.as_mut(),
            self.mattermost.as_mut(),
            self.slack.as_mut(),
            self.teams.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            announcer.fill_defaults();
        }
        self.webhooks
            .values_mut()
            .for_each(FillDefaults::fill_defaults);
    }
}

/// Fill a releaser. Depends on the project (name, resolved state), so it is
/// not a plain [`FillDefaults`] impl.
pub fn fill_releaser(kind: ReleaserKind, service: &mut GitService, project: &ProjectConfig) {
    service.enabled.get_or_insert(true);
    if let Some(name) = project.name.as_deref() {
        service.name.get_or_insert_with(|| name.to_string());
    }
    if let Some(host) = kind.default_host() {
        service.host.get_or_insert_with(|| host.to_string());
    }
    if let Some(endpoint) = kind.default_api_endpoint() {
        service
            .api_endpoint
            .get_or_insert_with(|| endpoint.to_string());
    }

    let state = project.state.as_ref();
    let snapshot = state.is_some_and(|s| s.snapshot);
    if snapshot {
        let label = project
            .snapshot
            .label
            .as_deref()
            .unwrap_or(DEFAULT_SNAPSHOT_LABEL);
        service.tag_name.get_or_insert_with(|| label.to_string());
    } else {
        service
            .tag_name
            .get_or_insert_with(|| DEFAULT_TAG_NAME.to_string());
    }
    service
        .release_name
        .get_or_insert_with(|| DEFAULT_RELEASE_NAME.to_string());
    service.draft.get_or_insert(false);
    // Snapshot releases are published as prereleases.
    service
        .prerelease
        .get_or_insert(snapshot || state.is_some_and(|s| s.prerelease));
    service.upload_assets.get_or_insert(kind.supports_assets());
    service.fill_timeouts();
}

/// Default the GitHub Packages URL from the github releaser's coordinates.
pub fn fill_github_deployer(deployer: &mut MavenDeployer, releaser: Option<&GitService>) {
    if deployer.url.is_some() {
        return;
    }
    let Some(releaser) = releaser else {
        return;
    };
    if let (Some(owner), Some(name)) = (releaser.owner.as_deref(), releaser.name.as_deref()) {
        deployer.url = Some(format!("https://maven.pkg.github.com/{owner}/{name}"));
    }
}
