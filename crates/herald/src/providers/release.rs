//! Releasers: tag the project and publish a release.
//!
//! GitHub, Gitea and Codeberg share one REST shape; GitLab has its own. The
//! generic releaser only creates an annotated tag in the local repository.

use anyhow::{Context, Result, bail};
use reqwest::blocking::RequestBuilder;
use serde::Deserialize;
use serde_json::json;

use crate::activation::{EnabledAware, TimeoutAware};
use crate::auth;
use crate::context::planned_release;
use crate::engine::Reporter;
use crate::errors::{ReleaseError, boxed};
use crate::git;
use crate::model::{GitService, ReleaserKind};
use crate::providers::{ExecutionContext, Releaser, http};
use crate::types::ReleaseInfo;

pub struct GitReleaseProvider {
    kind: ReleaserKind,
    config: GitService,
}

#[derive(Debug, Deserialize)]
struct CreatedRelease {
    id: Option<u64>,
    html_url: Option<String>,
    upload_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitlabRelease {
    #[serde(default, rename = "_links")]
    links: GitlabLinks,
}

#[derive(Debug, Default, Deserialize)]
struct GitlabLinks {
    #[serde(rename = "self")]
    page: Option<String>,
}

impl GitReleaseProvider {
    pub fn new(kind: ReleaserKind, config: GitService) -> Self {
        Self { kind, config }
    }

    fn owner_and_name(&self) -> Result<(&str, &str)> {
        let owner = self.config.owner.as_deref().context("owner is not set")?;
        let name = self.config.name.as_deref().context("name is not set")?;
        Ok((owner, name))
    }

    fn api_endpoint(&self) -> Result<&str> {
        self.config
            .api_endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .context("api_endpoint is not set")
    }

    fn releases_url(&self) -> Result<String> {
        let (owner, name) = self.owner_and_name()?;
        let api = self.api_endpoint()?;
        Ok(match self.kind {
            ReleaserKind::Gitlab => format!("{api}/projects/{owner}%2F{name}/releases"),
            _ => format!("{api}/repos/{owner}/{name}/releases"),
        })
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<ReleaseInfo> {
        let mut info = planned_release(self.kind, &self.config, &cx.props)?;

        if self.kind == ReleaserKind::Generic {
            if cx.dry_run() {
                cx.simulate(reporter, &format!("git tag -a {}", info.tag_name));
            } else {
                git::create_tag(&cx.options.base_dir, &info.tag_name, &info.release_name)?;
                reporter.info(&format!("tagged {}", info.tag_name));
            }
            return Ok(info);
        }

        let url = self.releases_url()?;
        let token = api_token(self.kind, &self.config, cx)?;
        reporter.debug(&format!("using token {}", auth::mask_token(&token)));
        if cx.dry_run() {
            cx.simulate(reporter, &format!("POST {url} ({})", info.tag_name));
            return Ok(info);
        }

        let client = http::client(self.config.timeouts())?;
        let draft = self.config.draft.unwrap_or(false);
        let prerelease = self.config.prerelease.unwrap_or(false);
        let body = match self.kind {
            ReleaserKind::Gitlab => {
                let reference = cx
                    .options
                    .git
                    .commit
                    .as_deref()
                    .or(cx.options.branch())
                    .unwrap_or("HEAD");
                json!({
                    "tag_name": info.tag_name,
                    "name": info.release_name,
                    "ref": reference,
                })
            }
            _ => json!({
                "tag_name": info.tag_name,
                "name": info.release_name,
                "draft": draft,
                "prerelease": prerelease,
            }),
        };

        let request = authorize(self.kind, client.post(&url).json(&body), &token);
        let response = http::send(request, &format!("POST {url}"))?;

        match self.kind {
            ReleaserKind::Gitlab => {
                let created: GitlabRelease = response
                    .json()
                    .context("failed to parse gitlab release response")?;
                if let Some(page) = created.links.page {
                    info.url = page;
                }
            }
            _ => {
                let created: CreatedRelease = response
                    .json()
                    .with_context(|| format!("failed to parse {} release response", self.kind))?;
                info.id = created.id;
                info.upload_url = created
                    .upload_url
                    .map(|u| u.split('{').next().unwrap_or_default().to_string());
                if let Some(page) = created.html_url {
                    info.url = page;
                }
            }
        }

        reporter.info(&format!("published {} ({})", info.release_name, info.url));
        Ok(info)
    }
}

/// Resolve the releaser's API token or fail naming where it is looked up.
pub(crate) fn api_token(
    kind: ReleaserKind,
    service: &GitService,
    cx: &ExecutionContext<'_>,
) -> Result<String> {
    let resolved = auth::resolve_token(kind, service.token.as_deref(), &cx.options.base_dir)?;
    match resolved.token {
        Some(token) => Ok(token),
        None => {
            let [herald_var, plain_var] = auth::token_env_vars(kind);
            bail!("no token configured (set token, {herald_var} or {plain_var})")
        }
    }
}

/// Attach the authentication headers the hosting flavour expects.
pub(crate) fn authorize(kind: ReleaserKind, request: RequestBuilder, token: &str) -> RequestBuilder {
    match kind {
        ReleaserKind::Github => request
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28"),
        ReleaserKind::Gitlab => request.header("PRIVATE-TOKEN", token),
        _ => request.header("Authorization", format!("token {token}")),
    }
}

impl Releaser for GitReleaseProvider {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn is_enabled(&self) -> bool {
        EnabledAware::is_enabled(&self.config)
    }

    fn release(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<ReleaseInfo, ReleaseError> {
        self.run(cx, reporter)
            .map_err(|err| ReleaseError::new(self.name(), boxed(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use crate::model::Model;
    use crate::providers::test_server;
    use crate::template::{self, Props};
    use crate::types::Mode;
    use crate::validate::test_support::CollectingReporter;

    fn service(api: &str) -> GitService {
        GitService {
            enabled: Some(true),
            owner: Some("acme".to_string()),
            name: Some("demo".to_string()),
            host: Some("github.com".to_string()),
            api_endpoint: Some(api.to_string()),
            token: Some("ghp_0123456789".to_string()),
            prerelease: Some(true),
            ..Default::default()
        }
    }

    fn props() -> Props {
        Props::new()
            .with(template::PROJECT_NAME, "demo")
            .with(template::PROJECT_VERSION, "1.4.0")
    }

    #[test]
    fn github_release_posts_and_reads_back_ids() {
        let server = test_server::spawn(vec![(
            201,
            r#"{"id":42,"html_url":"https://github.com/acme/demo/releases/tag/v1.4.0","upload_url":"https://uploads.example/releases/42/assets{?name,label}"}"#.to_string(),
        )]);
        let options = RunOptions::new("/work", Mode::Full);
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };

        let info = GitReleaseProvider::new(ReleaserKind::Github, service(&server.base_url))
            .release(&cx, &mut CollectingReporter::default())
            .expect("release");
        let seen = server.join();

        assert_eq!(info.tag_name, "v1.4.0");
        assert_eq!(info.release_name, "Release v1.4.0");
        assert_eq!(info.id, Some(42));
        assert_eq!(
            info.upload_url.as_deref(),
            Some("https://uploads.example/releases/42/assets")
        );
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/repos/acme/demo/releases");
        assert_eq!(seen[0].header("Authorization"), Some("Bearer ghp_0123456789"));
        let body: serde_json::Value = serde_json::from_str(&seen[0].body).expect("json");
        assert_eq!(body["tag_name"], "v1.4.0");
        assert_eq!(body["prerelease"], true);
    }

    #[test]
    fn gitlab_release_uses_private_token_and_encoded_project() {
        let server = test_server::spawn(vec![(
            201,
            r#"{"_links":{"self":"https://gitlab.com/acme/demo/-/releases/v1.4.0"}}"#.to_string(),
        )]);
        let options = RunOptions::new("/work", Mode::Full);
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };

        let info = GitReleaseProvider::new(ReleaserKind::Gitlab, service(&server.base_url))
            .release(&cx, &mut CollectingReporter::default())
            .expect("release");
        let seen = server.join();

        assert_eq!(info.url, "https://gitlab.com/acme/demo/-/releases/v1.4.0");
        assert_eq!(seen[0].path, "/projects/acme%2Fdemo/releases");
        assert_eq!(seen[0].header("PRIVATE-TOKEN"), Some("ghp_0123456789"));
    }

    #[test]
    fn rejected_release_is_a_release_error() {
        let server = test_server::spawn(vec![(422, r#"{"message":"already_exists"}"#.to_string())]);
        let options = RunOptions::new("/work", Mode::Full);
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };

        let err = GitReleaseProvider::new(ReleaserKind::Gitea, service(&server.base_url))
            .release(&cx, &mut CollectingReporter::default())
            .expect_err("must fail");
        let seen = server.join();
        assert_eq!(seen[0].header("Authorization"), Some("token ghp_0123456789"));
        assert_eq!(err.provider, "gitea");
        assert!(err.to_string().contains("already_exists"), "{err}");
    }

    #[test]
    fn dry_run_returns_the_planned_release() {
        let mut options = RunOptions::new("/work", Mode::Full);
        options.dry_run = true;
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };
        let mut reporter = CollectingReporter::default();

        let info = GitReleaseProvider::new(ReleaserKind::Github, service("http://127.0.0.1:9"))
            .release(&cx, &mut reporter)
            .expect("dry run");
        assert_eq!(info.url, "https://github.com/acme/demo/releases/tag/v1.4.0");
        assert_eq!(
            reporter.lines,
            vec![
                "debug: using token ghp_****6789".to_string(),
                "info: [dry-run] POST http://127.0.0.1:9/repos/acme/demo/releases (v1.4.0)"
                    .to_string()
            ]
        );
    }

    #[test]
    fn dry_run_without_a_token_fails_like_a_real_run() {
        let mut options = RunOptions::new("/work", Mode::Full);
        options.dry_run = true;
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };
        let mut reporter = CollectingReporter::default();

        let err = temp_env::with_vars(
            [
                ("HERALD_GITHUB_TOKEN", None::<&str>),
                ("GITHUB_TOKEN", None::<&str>),
            ],
            || {
                let service = GitService {
                    token: None,
                    ..service("http://127.0.0.1:9")
                };
                GitReleaseProvider::new(ReleaserKind::Github, service)
                    .release(&cx, &mut reporter)
                    .expect_err("no token")
            },
        );
        assert_eq!(err.provider, "github");
        assert!(err.to_string().contains("no token configured"), "{err}");
        assert!(reporter.lines.iter().all(|l| !l.contains("[dry-run]")));
    }

    #[test]
    fn generic_dry_run_only_logs_the_tag() {
        let mut options = RunOptions::new("/work", Mode::Full);
        options.dry_run = true;
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };
        let mut reporter = CollectingReporter::default();

        let info = GitReleaseProvider::new(
            ReleaserKind::Generic,
            GitService {
                enabled: Some(true),
                ..Default::default()
            },
        )
        .release(&cx, &mut reporter)
        .expect("dry run");
        assert_eq!(info.tag_name, "v1.4.0");
        assert!(info.url.is_empty());
        assert_eq!(reporter.lines, vec!["info: [dry-run] git tag -a v1.4.0".to_string()]);
    }
}
