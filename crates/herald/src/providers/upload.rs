//! Uploaders: attach assets to the published release, or push them to an
//! arbitrary HTTP endpoint.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::activation::{Activatable, EnabledAware, TimeoutAware};
use crate::engine::Reporter;
use crate::errors::{UploadError, boxed};
use crate::model::{GitService, HttpMethod, HttpUploader, ReleaserKind};
use crate::providers::release::{api_token, authorize};
use crate::providers::{ExecutionContext, Uploader, file_name, http};
use crate::template;
use crate::types::ReleaseInfo;

/// Name the registry gives the release-asset uploader.
pub const RELEASE_ASSETS: &str = "release-assets";

fn read_asset(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Attaches artifacts, files and checksums to the release created in this run.
pub struct ReleaseAssetsUploader {
    kind: ReleaserKind,
    config: GitService,
}

impl ReleaseAssetsUploader {
    pub fn new(kind: ReleaserKind, config: GitService) -> Self {
        Self { kind, config }
    }

    fn assets_url(&self, release: &ReleaseInfo) -> Result<String> {
        if let Some(upload_url) = release.upload_url.as_deref() {
            return Ok(upload_url.to_string());
        }
        let id = release
            .id
            .context("the published release did not report an id")?;
        let api = self
            .config
            .api_endpoint
            .as_deref()
            .context("api_endpoint is not set")?;
        let owner = self.config.owner.as_deref().context("owner is not set")?;
        let name = self.config.name.as_deref().context("name is not set")?;
        Ok(http::join_url(
            api,
            &format!("repos/{owner}/{name}/releases/{id}/assets"),
        ))
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let assets = cx.asset_set(true, true, true);
        if assets.is_empty() {
            reporter.info("no assets to attach");
            return Ok(());
        }

        let token = api_token(self.kind, &self.config, cx)?;
        if cx.dry_run() {
            for asset in &assets {
                cx.simulate(reporter, &format!("attach {}", file_name(asset)));
            }
            return Ok(());
        }

        let release = cx
            .release
            .context("no release was published in this run")?;
        let url = self.assets_url(release)?;
        let client = http::client(self.config.timeouts())?;

        for asset in &assets {
            let name = file_name(asset);
            let request = client
                .post(&url)
                .query(&[("name", name.as_str())])
                .header("Content-Type", "application/octet-stream")
                .body(read_asset(asset)?);
            http::send(authorize(self.kind, request, &token), &format!("attach {name}"))?;
            reporter.info(&format!("attached {name}"));
        }
        Ok(())
    }
}

impl Uploader for ReleaseAssetsUploader {
    fn name(&self) -> &str {
        RELEASE_ASSETS
    }

    fn is_enabled(&self) -> bool {
        EnabledAware::is_enabled(&self.config) && self.config.upload_assets == Some(true)
    }

    fn upload(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), UploadError> {
        self.run(cx, reporter)
            .map_err(|err| UploadError::new(self.name(), boxed(err)))
    }
}

/// Sends each asset to a templated URL; `{{artifactFileName}}` is the asset.
pub struct HttpUploadProvider {
    name: String,
    config: HttpUploader,
}

impl HttpUploadProvider {
    pub fn new(name: impl Into<String>, config: HttpUploader) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let url = self.config.url.as_deref().context("url is not set")?;
        let method = self.config.method.unwrap_or_default();
        let assets = cx.asset_set(
            self.config.artifacts.unwrap_or(true),
            self.config.files.unwrap_or(true),
            self.config.checksums.unwrap_or(true),
        );
        if assets.is_empty() {
            reporter.info("no assets to upload");
            return Ok(());
        }

        let verb = match method {
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
        };
        let mut planned = Vec::with_capacity(assets.len());
        for asset in assets {
            let props = cx
                .props
                .clone()
                .with(template::ARTIFACT_FILE_NAME, file_name(&asset));
            planned.push((template::render(url, &props)?, asset));
        }

        let credentials = http::Credentials::resolve(
            self.config.username.as_deref(),
            self.config.password.as_deref(),
            &cx.options.base_dir,
        )?;
        if cx.dry_run() {
            for (target, _) in &planned {
                cx.simulate(reporter, &format!("{verb} {target}"));
            }
            return Ok(());
        }

        let client = http::client(self.config.timeouts())?;
        for (target, asset) in &planned {
            let request = match method {
                HttpMethod::Put => client.put(target),
                HttpMethod::Post => client.post(target),
            };
            let request = http::authenticate(request.body(read_asset(asset)?), credentials.as_ref());
            http::send(request, &format!("{verb} {target}"))?;
            reporter.debug(&format!("uploaded {}", asset.display()));
        }
        reporter.info(&format!("uploaded {} asset(s)", planned.len()));
        Ok(())
    }
}

impl Uploader for HttpUploadProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.config.is_active()
    }

    fn upload(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), UploadError> {
        self.run(cx, reporter)
            .map_err(|err| UploadError::new(self.name.clone(), boxed(err)))
    }
}
