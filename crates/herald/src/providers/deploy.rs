//! Maven-layout deployers.
//!
//! Every deployer uploads the same thing: the files of a pre-built staging
//! repository, each PUT to `<url>/<path relative to the staging root>`.
//! Artifactory, GitHub Packages and Nexus 2 differ only in their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::activation::{Activatable, TimeoutAware};
use crate::engine::Reporter;
use crate::errors::{DeployError, boxed};
use crate::model::{DeployerKind, MavenDeployer};
use crate::providers::{Deployer, ExecutionContext, http};

pub struct MavenDeployProvider {
    kind: DeployerKind,
    config: MavenDeployer,
}

impl MavenDeployProvider {
    pub fn new(kind: DeployerKind, config: MavenDeployer) -> Self {
        Self { kind, config }
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let url = self.config.url.as_deref().context("url is not set")?;
        let url = cx.render(url)?;
        let staging = self
            .config
            .staging_repository
            .as_deref()
            .context("staging_repository is not set")?;
        let staging = cx.options.resolve_path(staging);
        let files = staged_files(&staging)?;
        if files.is_empty() {
            reporter.warn(&format!("{} contains no files", staging.display()));
            return Ok(());
        }

        let credentials = http::Credentials::resolve(
            self.config.username.as_deref(),
            self.config.password.as_deref(),
            &cx.options.base_dir,
        )?;
        if cx.dry_run() {
            for rel in &files {
                cx.simulate(reporter, &format!("PUT {}", http::join_url(&url, rel)));
            }
            return Ok(());
        }

        let client = http::client(self.config.timeouts())?;
        for rel in &files {
            let target = http::join_url(&url, rel);
            let source = staging.join(rel);
            let body =
                fs::read(&source).with_context(|| format!("failed to read {}", source.display()))?;
            let request = http::authenticate(client.put(&target).body(body), credentials.as_ref());
            http::send(request, &format!("PUT {target}"))?;
            reporter.debug(&format!("deployed {rel}"));
        }
        reporter.info(&format!("deployed {} file(s) to {url}", files.len()));
        Ok(())
    }
}

/// Files under `root` as sorted `/`-separated relative paths.
pub fn staged_files(root: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries =
            fs::read_dir(&dir).with_context(|| format!("failed to read {}", dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("failed to read {}", dir.display()))?
                .path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(rel) = path.strip_prefix(root) {
                let parts: Vec<_> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                out.push(parts.join("/"));
            }
        }
    }
    out.sort();
    Ok(out)
}

impl Deployer for MavenDeployProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_enabled(&self) -> bool {
        self.config.is_active()
    }

    fn deploy(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), DeployError> {
        self.run(cx, reporter)
            .map_err(|err| DeployError::new(self.name(), boxed(err)))
    }
}
