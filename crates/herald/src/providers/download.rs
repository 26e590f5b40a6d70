//! HTTP asset downloads.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::activation::{Activatable, TimeoutAware};
use crate::engine::Reporter;
use crate::errors::{DownloadError, boxed};
use crate::model::HttpDownloader;
use crate::providers::{Downloader, ExecutionContext, http};
use crate::validate::download::asset_output_name;

pub const DOWNLOADS_DIR: &str = "downloads";

pub struct HttpDownloadProvider {
    name: String,
    config: HttpDownloader,
}

impl HttpDownloadProvider {
    pub fn new(name: impl Into<String>, config: HttpDownloader) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Absolute URL and target path of every asset.
    fn plan(&self, cx: &ExecutionContext<'_>) -> Result<Vec<(String, PathBuf)>> {
        let base = self
            .config
            .url
            .as_deref()
            .map(|url| cx.render(url))
            .transpose()?;
        let dir = cx.output_dir(DOWNLOADS_DIR).join(&self.name);

        let mut planned = Vec::with_capacity(self.config.assets.len());
        for asset in &self.config.assets {
            let input = cx.render(&asset.input)?;
            let url = if input.starts_with("http://") || input.starts_with("https://") {
                input.clone()
            } else {
                let base = base
                    .as_deref()
                    .with_context(|| format!("asset '{input}' is relative and no url is set"))?;
                http::join_url(base, &input)
            };
            let output = asset_output_name(&input, asset.output.as_deref())
                .with_context(|| format!("no output file name for '{input}'"))?;
            planned.push((url, dir.join(output)));
        }
        Ok(planned)
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let planned = self.plan(cx)?;
        let credentials = http::Credentials::resolve(
            self.config.username.as_deref(),
            self.config.password.as_deref(),
            &cx.options.base_dir,
        )?;
        if cx.dry_run() {
            for (url, target) in &planned {
                cx.simulate(reporter, &format!("download {url} -> {}", target.display()));
            }
            return Ok(());
        }

        let client = http::client(self.config.timeouts())?;
        for (url, target) in &planned {
            let request = http::authenticate(client.get(url), credentials.as_ref());
            let bytes = http::send(request, &format!("GET {url}"))?
                .bytes()
                .with_context(|| format!("failed to read body of {url}"))?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(target, &bytes)
                .with_context(|| format!("failed to write {}", target.display()))?;
            reporter.info(&format!("downloaded {url} ({} bytes)", bytes.len()));
        }
        Ok(())
    }
}

impl Downloader for HttpDownloadProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.config.is_active()
    }

    fn download(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DownloadError> {
        self.run(cx, reporter)
            .map_err(|err| DownloadError::new(self.name.clone(), boxed(err)))
    }
}
