//! Per-run state: options, the model being validated, and its findings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::findings::Findings;
use crate::model::{GitService, Model, ReleaserKind};
use crate::template::{self, Props, TemplateError};
use crate::types::{Category, GitContext, Mode, ProjectState, ReleaseInfo};

/// Output directory, relative to the base directory.
pub const DEFAULT_OUTPUT_DIR: &str = "out/herald";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub base_dir: PathBuf,
    pub output_dir: PathBuf,
    pub dry_run: bool,
    pub mode: Mode,
    pub git: GitContext,
    /// Overrides the branch detected by git.
    pub branch: Option<String>,
    /// Explicit provider names per category (`--only`).
    pub selection: BTreeMap<Category, Vec<String>>,
}

impl RunOptions {
    pub fn new(base_dir: impl Into<PathBuf>, mode: Mode) -> Self {
        let base_dir = base_dir.into();
        Self {
            output_dir: base_dir.join(DEFAULT_OUTPUT_DIR),
            base_dir,
            dry_run: false,
            mode,
            git: GitContext::default(),
            branch: None,
            selection: BTreeMap::new(),
        }
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref().or(self.git.branch.as_deref())
    }

    pub fn tag(&self) -> Option<&str> {
        self.git.tag.as_deref()
    }

    /// Names explicitly requested for `category`, if any.
    pub fn selected(&self, category: Category) -> Option<&[String]> {
        self.selection
            .get(&category)
            .map(Vec::as_slice)
            .filter(|names| !names.is_empty())
    }

    /// Resolve `path` against the base directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Everything one run reads and mutates.
#[derive(Debug, Clone)]
pub struct Context {
    pub options: RunOptions,
    pub model: Model,
    pub findings: Findings,
}

impl Context {
    pub fn new(options: RunOptions, model: Model) -> Self {
        Self {
            options,
            model,
            findings: Findings::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.options.mode
    }

    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// State resolved by the project validator; a release state until then.
    pub fn project_state(&self) -> ProjectState {
        self.model.project.state.clone().unwrap_or_else(|| ProjectState {
            branch: self.options.branch().map(str::to_string),
            tag: self.options.tag().map(str::to_string),
            ..Default::default()
        })
    }

    /// Template properties for this run.
    ///
    /// Release keys come from `release` when a releaser ran in this run,
    /// otherwise from the first enabled releaser's configuration. Release keys
    /// that cannot be rendered are left empty.
    pub fn props(&self, release: Option<&ReleaseInfo>) -> Props {
        let project = &self.model.project;
        let mut props = Props::new();
        props
            .set(template::PROJECT_NAME, project.name())
            .set(template::PROJECT_VERSION, project.version())
            .set(
                template::PROJECT_DESCRIPTION,
                project.description.as_deref().unwrap_or_default(),
            )
            .set(template::BRANCH, self.options.branch().unwrap_or_default())
            .set(
                template::COMMIT_SHORT_HASH,
                self.options.git.short_commit().unwrap_or_default(),
            );

        if let Some(info) = release {
            props
                .set(template::TAG_NAME, info.tag_name.as_str())
                .set(template::RELEASE_NAME, info.release_name.as_str())
                .set(template::RELEASE_URL, info.url.as_str());
            return props;
        }

        let planned = self
            .model
            .release
            .enabled()
            .next()
            .and_then(|(kind, service)| planned_release(kind, service, &props).ok());
        match planned {
            Some(info) => {
                props
                    .set(template::TAG_NAME, info.tag_name)
                    .set(template::RELEASE_NAME, info.release_name)
                    .set(template::RELEASE_URL, info.url);
            }
            None => {
                props
                    .set(template::TAG_NAME, "")
                    .set(template::RELEASE_NAME, "")
                    .set(template::RELEASE_URL, "");
            }
        }
        props
    }
}

/// Render a releaser's tag and release name and derive its release page.
pub fn planned_release(
    kind: ReleaserKind,
    service: &GitService,
    base: &Props,
) -> Result<ReleaseInfo, TemplateError> {
    let tag_name = template::render(
        service
            .tag_name
            .as_deref()
            .unwrap_or(crate::defaults::DEFAULT_TAG_NAME),
        base,
    )?;
    let with_tag = base.clone().with(template::TAG_NAME, tag_name.as_str());
    let release_name = template::render(
        service
            .release_name
            .as_deref()
            .unwrap_or(crate::defaults::DEFAULT_RELEASE_NAME),
        &with_tag,
    )?;
    let url = release_page_url(kind, service, &tag_name).unwrap_or_default();
    Ok(ReleaseInfo {
        tag_name,
        release_name,
        url,
        id: None,
        upload_url: None,
    })
}

/// Public page of a release, when the releaser has one.
pub fn release_page_url(kind: ReleaserKind, service: &GitService, tag: &str) -> Option<String> {
    let host = service.host.as_deref()?;
    let owner = service.owner.as_deref()?;
    let name = service.name.as_deref()?;
    match kind {
        ReleaserKind::Github | ReleaserKind::Gitea | ReleaserKind::Codeberg => Some(format!(
            "https://{host}/{owner}/{name}/releases/tag/{tag}"
        )),
        ReleaserKind::Gitlab => Some(format!("https://{host}/{owner}/{name}/-/releases/{tag}")),
        ReleaserKind::Generic => None,
    }
}
