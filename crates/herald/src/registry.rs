//! Provider registry.
//!
//! [`resolve`] turns a validated model into the ordered builders of one
//! category. The set of provider kinds is closed ([`ProviderKind`]); the
//! order within a category is the schema order of the sections, then map
//! keys in name order, so resolution never depends on iteration order of
//! anything unordered.
//!
//! Cardinality:
//! - release: exactly one enabled releaser, otherwise a [`ConfigurationError`].
//! - deploy: zero or one per deployer kind (the model only has one slot each).
//! - prepare, download, upload, announce: zero to many.
//!
//! An explicit selection (`--only`) that filters every candidate out is an
//! error; an empty category without a selection is simply skipped.

use crate::activation::{Activatable, EnabledAware};
use crate::errors::ConfigurationError;
use crate::model::{ChatKind, DeployerKind, Model, ReleaserKind};
use crate::providers::Provider;
use crate::providers::announce::WebhookAnnouncer;
use crate::providers::deploy::MavenDeployProvider;
use crate::providers::download::HttpDownloadProvider;
use crate::providers::prepare::{ChecksumPreparer, FilesPreparer};
use crate::providers::release::GitReleaseProvider;
use crate::providers::upload::{HttpUploadProvider, RELEASE_ASSETS, ReleaseAssetsUploader};
use crate::types::Category;

/// Every concrete provider the registry knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Checksum,
    Files,
    HttpDownloader,
    Deployer(DeployerKind),
    Releaser(ReleaserKind),
    ReleaseAssets(ReleaserKind),
    HttpUploader,
    Chat(ChatKind),
    Webhook,
}

/// A resolved, not yet constructed, provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderBuilder {
    pub category: Category,
    pub name: String,
    pub kind: ProviderKind,
}

impl ProviderBuilder {
    fn new(category: Category, name: impl Into<String>, kind: ProviderKind) -> Self {
        Self {
            category,
            name: name.into(),
            kind,
        }
    }

    fn missing(&self) -> ConfigurationError {
        ConfigurationError::MissingSection {
            category: self.category,
            name: self.name.clone(),
        }
    }

    /// Construct the provider over a copy of its section.
    pub fn build(&self, model: &Model) -> Result<Provider, ConfigurationError> {
        let provider = match self.kind {
            ProviderKind::Checksum => {
                Provider::Preparer(Box::new(ChecksumPreparer::new(model.checksum.clone())))
            }
            ProviderKind::Files => {
                Provider::Preparer(Box::new(FilesPreparer::new(model.files.clone())))
            }
            ProviderKind::HttpDownloader => {
                let config = model
                    .download
                    .http
                    .get(&self.name)
                    .ok_or_else(|| self.missing())?;
                Provider::Downloader(Box::new(HttpDownloadProvider::new(
                    self.name.clone(),
                    config.clone(),
                )))
            }
            ProviderKind::Deployer(kind) => {
                let config = model.deploy.get(kind).ok_or_else(|| self.missing())?;
                Provider::Deployer(Box::new(MavenDeployProvider::new(kind, config.clone())))
            }
            ProviderKind::Releaser(kind) => {
                let config = model.release.get(kind).ok_or_else(|| self.missing())?;
                Provider::Releaser(Box::new(GitReleaseProvider::new(kind, config.clone())))
            }
            ProviderKind::ReleaseAssets(kind) => {
                let config = model.release.get(kind).ok_or_else(|| self.missing())?;
                Provider::Uploader(Box::new(ReleaseAssetsUploader::new(kind, config.clone())))
            }
            ProviderKind::HttpUploader => {
                let config = model
                    .upload
                    .http
                    .get(&self.name)
                    .ok_or_else(|| self.missing())?;
                Provider::Uploader(Box::new(HttpUploadProvider::new(
                    self.name.clone(),
                    config.clone(),
                )))
            }
            ProviderKind::Chat(kind) => {
                let config = model.announce.chat(kind).ok_or_else(|| self.missing())?;
                Provider::Announcer(Box::new(WebhookAnnouncer::chat(kind, config.clone())))
            }
            ProviderKind::Webhook => {
                let config = model
                    .announce
                    .webhooks
                    .get(&self.name)
                    .ok_or_else(|| self.missing())?;
                Provider::Announcer(Box::new(WebhookAnnouncer::webhook(
                    self.name.clone(),
                    config.clone(),
                )))
            }
        };
        Ok(provider)
    }
}

/// Ordered builders for `category`, optionally narrowed to `selection`.
pub fn resolve(
    category: Category,
    model: &Model,
    selection: Option<&[String]>,
) -> Result<Vec<ProviderBuilder>, ConfigurationError> {
    let candidates = match category {
        Category::Release => vec![releaser(model)?],
        Category::Prepare => prepare(model),
        Category::Download => download(model),
        Category::Deploy => deploy(model),
        Category::Upload => upload(model),
        Category::Announce => announce(model),
    };

    let Some(requested) = selection.filter(|names| !names.is_empty()) else {
        return Ok(candidates);
    };
    let selected: Vec<ProviderBuilder> = candidates
        .into_iter()
        .filter(|b| requested.iter().any(|name| *name == b.name))
        .collect();
    if selected.is_empty() {
        return Err(ConfigurationError::NothingResolved {
            category,
            requested: requested.to_vec(),
        });
    }
    Ok(selected)
}

/// The single enabled releaser.
pub fn releaser(model: &Model) -> Result<ProviderBuilder, ConfigurationError> {
    let enabled: Vec<ReleaserKind> = model.release.enabled().map(|(kind, _)| kind).collect();
    match enabled.as_slice() {
        [] => Err(ConfigurationError::NoReleaser),
        [kind] => Ok(ProviderBuilder::new(
            Category::Release,
            kind.name(),
            ProviderKind::Releaser(*kind),
        )),
        many => Err(ConfigurationError::MultipleReleasers {
            enabled: many.iter().map(|k| k.name().to_string()).collect(),
        }),
    }
}

fn prepare(model: &Model) -> Vec<ProviderBuilder> {
    let mut out = Vec::new();
    if model.checksum.is_active() {
        out.push(ProviderBuilder::new(
            Category::Prepare,
            "checksum",
            ProviderKind::Checksum,
        ));
    }
    if model.files.is_active() && !model.files.artifacts.is_empty() {
        out.push(ProviderBuilder::new(Category::Prepare, "files", ProviderKind::Files));
    }
    out
}

fn download(model: &Model) -> Vec<ProviderBuilder> {
    if !model.download.is_active() {
        return Vec::new();
    }
    model
        .download
        .http
        .iter()
        .filter(|(_, d)| d.is_active())
        .map(|(name, _)| {
            ProviderBuilder::new(Category::Download, name.as_str(), ProviderKind::HttpDownloader)
        })
        .collect()
}

fn deploy(model: &Model) -> Vec<ProviderBuilder> {
    if !model.deploy.is_active() {
        return Vec::new();
    }
    DeployerKind::ALL
        .into_iter()
        .filter(|kind| model.deploy.get(*kind).is_some_and(|d| d.is_active()))
        .map(|kind| ProviderBuilder::new(Category::Deploy, kind.name(), ProviderKind::Deployer(kind)))
        .collect()
}

fn upload(model: &Model) -> Vec<ProviderBuilder> {
    if !model.upload.is_active() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut enabled = model.release.enabled();
    if let (Some((kind, service)), None) = (enabled.next(), enabled.next())
        && kind.supports_assets()
        && service.is_enabled()
        && service.upload_assets == Some(true)
    {
        out.push(ProviderBuilder::new(
            Category::Upload,
            RELEASE_ASSETS,
            ProviderKind::ReleaseAssets(kind),
        ));
    }
    out.extend(
        model
            .upload
            .http
            .iter()
            .filter(|(_, u)| u.is_active())
            .map(|(name, _)| {
                ProviderBuilder::new(Category::Upload, name.as_str(), ProviderKind::HttpUploader)
            }),
    );
    out
}

fn announce(model: &Model) -> Vec<ProviderBuilder> {
    if !model.announce.is_active() {
        return Vec::new();
    }
    let mut out: Vec<ProviderBuilder> = ChatKind::ALL
        .into_iter()
        .filter(|kind| model.announce.chat(*kind).is_some_and(|a| a.is_active()))
        .map(|kind| ProviderBuilder::new(Category::Announce, kind.name(), ProviderKind::Chat(kind)))
        .collect();
    out.extend(
        model
            .announce
            .webhooks
            .iter()
            .filter(|(_, a)| a.is_active())
            .map(|(name, _)| {
                ProviderBuilder::new(Category::Announce, name.as_str(), ProviderKind::Webhook)
            }),
    );
    out
}
