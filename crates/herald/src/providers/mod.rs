//! Provider contracts and the adapters behind them.
//!
//! A provider is bound to one resolved configuration section. It owns a copy
//! of that section, reads everything else through [`ExecutionContext`], and
//! exposes one category action. Dry runs reach the action too; each
//! provider skips only its mutating calls.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::activation::Activatable;
use crate::context::RunOptions;
use crate::engine::Reporter;
use crate::errors::{
    AnnounceError, BoxError, DeployError, DownloadError, PrepareError, ReleaseError, UploadError,
};
use crate::model::Model;
use crate::template::{self, Props};
use crate::types::{Category, ReleaseInfo};

pub mod announce;
pub mod deploy;
pub mod download;
pub(crate) mod http;
pub mod prepare;
pub mod release;
#[cfg(test)]
pub(crate) mod test_server;
pub mod upload;

/// Read-only view of the run handed to every provider invocation.
pub struct ExecutionContext<'a> {
    pub options: &'a RunOptions,
    pub model: &'a Model,
    /// Release published earlier in this run, if any.
    pub release: Option<&'a ReleaseInfo>,
    pub props: Props,
}

impl<'a> ExecutionContext<'a> {
    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    pub fn render(&self, text: &str) -> Result<String> {
        Ok(template::render(text, &self.props)?)
    }

    /// Log a suppressed mutation.
    pub fn simulate(&self, reporter: &mut dyn Reporter, action: &str) {
        reporter.info(&format!("[dry-run] {action}"));
    }

    pub fn output_dir(&self, sub: &str) -> PathBuf {
        self.options.output_dir.join(sub)
    }

    /// Artifacts of every active distribution, in name order.
    pub fn distribution_artifacts(&self) -> Vec<PathBuf> {
        self.model
            .distributions
            .values()
            .filter(|d| d.is_active())
            .flat_map(|d| d.artifacts.iter())
            .map(|p| self.options.resolve_path(p))
            .collect()
    }

    /// Artifacts of the `files` section when it is active.
    pub fn file_artifacts(&self) -> Vec<PathBuf> {
        if !self.model.files.is_active() {
            return Vec::new();
        }
        self.model
            .files
            .artifacts
            .iter()
            .map(|p| self.options.resolve_path(p))
            .collect()
    }

    /// Checksum files the prepare stage writes for the current artifacts.
    pub fn checksum_files(&self) -> Vec<PathBuf> {
        let config = &self.model.checksum;
        if !config.is_active() {
            return Vec::new();
        }
        let dir = self.output_dir(prepare::CHECKSUMS_DIR);
        let inputs = prepare::checksum_inputs(config, self);
        prepare::checksum_outputs(config, &inputs)
            .into_iter()
            .map(|name| dir.join(name))
            .collect()
    }

    /// Assets to publish, honoring the include flags.
    pub fn asset_set(&self, artifacts: bool, files: bool, checksums: bool) -> Vec<PathBuf> {
        let mut set = Vec::new();
        if artifacts {
            set.extend(self.distribution_artifacts());
        }
        if files {
            set.extend(self.file_artifacts());
        }
        if checksums {
            set.extend(self.checksum_files());
        }
        set
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub trait Preparer: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn prepare(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), PrepareError>;
}

pub trait Downloader: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn download(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DownloadError>;
}

pub trait Deployer: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn deploy(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DeployError>;
}

pub trait Releaser: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn release(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<ReleaseInfo, ReleaseError>;
}

pub trait Uploader: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn upload(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), UploadError>;
}

pub trait Announcer: Send + Sync {
    fn name(&self) -> &str;
    fn is_enabled(&self) -> bool;
    fn announce(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), AnnounceError>;
}

/// A built provider, tagged by category.
pub enum Provider {
    Preparer(Box<dyn Preparer>),
    Downloader(Box<dyn Downloader>),
    Deployer(Box<dyn Deployer>),
    Releaser(Box<dyn Releaser>),
    Uploader(Box<dyn Uploader>),
    Announcer(Box<dyn Announcer>),
}

impl Provider {
    pub fn category(&self) -> Category {
        match self {
            Provider::Preparer(_) => Category::Prepare,
            Provider::Downloader(_) => Category::Download,
            Provider::Deployer(_) => Category::Deploy,
            Provider::Releaser(_) => Category::Release,
            Provider::Uploader(_) => Category::Upload,
            Provider::Announcer(_) => Category::Announce,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Provider::Preparer(p) => p.name(),
            Provider::Downloader(p) => p.name(),
            Provider::Deployer(p) => p.name(),
            Provider::Releaser(p) => p.name(),
            Provider::Uploader(p) => p.name(),
            Provider::Announcer(p) => p.name(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Provider::Preparer(p) => p.is_enabled(),
            Provider::Downloader(p) => p.is_enabled(),
            Provider::Deployer(p) => p.is_enabled(),
            Provider::Releaser(p) => p.is_enabled(),
            Provider::Uploader(p) => p.is_enabled(),
            Provider::Announcer(p) => p.is_enabled(),
        }
    }

    /// Run the category action. A releaser's result is returned so later
    /// categories can use it.
    pub fn invoke(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<Option<ReleaseInfo>, BoxError> {
        match self {
            Provider::Preparer(p) => p.prepare(cx, reporter)?,
            Provider::Downloader(p) => p.download(cx, reporter)?,
            Provider::Deployer(p) => p.deploy(cx, reporter)?,
            Provider::Releaser(p) => return Ok(Some(p.release(cx, reporter)?)),
            Provider::Uploader(p) => p.upload(cx, reporter)?,
            Provider::Announcer(p) => p.announce(cx, reporter)?,
        }
        Ok(None)
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.category(), self.name())
    }
}
