//! Releaser validation.
//!
//! At most one releaser may be enabled; runs that publish a release need
//! exactly one. Both rules are reported as findings here so the run aborts
//! before anything executes.

use crate::activation::EnabledAware;
use crate::auth;
use crate::context::Context;
use crate::defaults::fill_releaser;
use crate::engine::Reporter;
use crate::model::ReleaserKind;
use crate::types::Category;
use crate::validate::{check_template, check_timeouts, is_blank};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;

    for kind in ReleaserKind::ALL {
        let Some(service) = model.release.get_mut(kind) else {
            continue;
        };
        fill_releaser(kind, service, &model.project);
        let path = format!("release.{kind}");
        if !service.is_enabled() {
            reporter.debug(&format!("{path} is disabled"));
            continue;
        }

        if kind.is_hosted() {
            if is_blank(service.owner.as_deref()) {
                findings.error(format!("{path}.owner must not be blank"));
            }
            if is_blank(service.name.as_deref()) {
                findings.error(format!("{path}.name must not be blank"));
            }
            if is_blank(service.api_endpoint.as_deref()) {
                findings.error(format!("{path}.api_endpoint must be set for {kind}"));
            }
            match auth::resolve_token(kind, service.token.as_deref(), &options.base_dir) {
                Ok(token) if token.detected() => {
                    reporter.debug(&format!("{path}.token resolved from {}", token.source));
                }
                Ok(_) => {
                    let [herald_var, plain_var] = auth::token_env_vars(kind);
                    findings.error(format!(
                        "{path}.token is required (or set {herald_var} / {plain_var})"
                    ));
                }
                Err(err) => {
                    findings.error(format!("{path}.token: {err:#}"));
                }
            }
        }

        check_template(&format!("{path}.tag_name"), service.tag_name.as_deref(), findings);
        check_template(
            &format!("{path}.release_name"),
            service.release_name.as_deref(),
            findings,
        );
        if is_blank(service.tag_name.as_deref()) {
            findings.error(format!("{path}.tag_name must not be blank"));
        }

        if service.upload_assets == Some(true) && !kind.supports_assets() {
            findings.warning(format!(
                "{path}.upload_assets is not supported by {kind}; assets will not be uploaded"
            ));
            service.upload_assets = Some(false);
        }
        if kind == ReleaserKind::Generic && service.draft == Some(true) {
            findings.warning(format!("{path}.draft has no effect on local tags"));
        }

        check_timeouts(&path, service, findings);
    }

    let enabled: Vec<ReleaserKind> = model.release.enabled().map(|(kind, _)| kind).collect();
    match enabled.as_slice() {
        [] if options.mode.categories().contains(&Category::Release) => {
            findings.error(
                "no releaser is enabled; enable exactly one of release.github, release.gitlab, release.gitea, release.codeberg, release.generic",
            );
        }
        [] | [_] => {}
        many => {
            let names: Vec<&str> = many.iter().map(|kind| kind.name()).collect();
            findings.error(format!(
                "only one releaser may be enabled, found: {}",
                names.join(", ")
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use crate::model::{GitService, Model};
    use crate::types::{Mode, ProjectState};
    use crate::validate::test_support::CollectingReporter;

    fn model() -> Model {
        let mut model = Model::default();
        model.project.name = Some("demo".to_string());
        model.project.version = Some("1.0.0".to_string());
        model.project.state = Some(ProjectState::default());
        model
    }

    fn github() -> GitService {
        GitService {
            owner: Some("acme".to_string()),
            token: Some("t0k3n".to_string()),
            ..Default::default()
        }
    }

    fn run(model: Model, mode: Mode) -> Context {
        let mut ctx = Context::new(RunOptions::new("/work", mode), model);
        validate(&mut ctx, &mut CollectingReporter::default());
        ctx
    }

    #[test]
    fn single_github_releaser_is_valid() {
        let mut m = model();
        m.release.github = Some(github());
        let ctx = run(m, Mode::Full);
        assert!(ctx.findings.is_empty(), "{:?}", ctx.findings);
        let gh = ctx.model.release.github.expect("github");
        assert_eq!(gh.name.as_deref(), Some("demo"));
        assert_eq!(gh.tag_name.as_deref(), Some("v{{projectVersion}}"));
    }

    #[test]
    fn two_enabled_releasers_are_an_error() {
        let mut m = model();
        m.release.github = Some(github());
        m.release.generic = Some(GitService::default());
        let ctx = run(m, Mode::Config);
        let errors: Vec<_> = ctx.findings.errors().map(|f| f.message.as_str()).collect();
        assert_eq!(
            errors,
            vec!["only one releaser may be enabled, found: github, generic"]
        );
    }

    #[test]
    fn disabled_releaser_does_not_count() {
        let mut m = model();
        m.release.github = Some(github());
        m.release.generic = Some(GitService {
            enabled: Some(false),
            ..Default::default()
        });
        assert!(!run(m, Mode::Full).findings.has_errors());
    }

    #[test]
    fn full_run_needs_a_releaser() {
        assert!(run(model(), Mode::Full).findings.has_errors());
        assert!(!run(model(), Mode::Announce).findings.has_errors());
    }

    #[test]
    fn missing_token_is_an_error_even_in_dry_run() {
        temp_env::with_vars(
            [
                ("HERALD_GITHUB_TOKEN", None::<&str>),
                ("GITHUB_TOKEN", None::<&str>),
            ],
            || {
                let mut m = model();
                m.release.github = Some(GitService {
                    token: None,
                    ..github()
                });
                assert!(run(m.clone(), Mode::Full).findings.has_errors());

                let mut options = RunOptions::new("/work", Mode::Full);
                options.dry_run = true;
                let mut ctx = Context::new(options, m);
                validate(&mut ctx, &mut CollectingReporter::default());
                assert_eq!(ctx.findings.errors().count(), 1);
            },
        );
    }

    #[test]
    fn gitlab_asset_upload_is_forced_off() {
        let mut m = model();
        m.release.gitlab = Some(GitService {
            upload_assets: Some(true),
            ..github()
        });
        let ctx = run(m, Mode::Full);
        assert!(!ctx.findings.has_errors());
        assert_eq!(ctx.findings.warnings().count(), 1);
        assert_eq!(ctx.model.release.gitlab.expect("gitlab").upload_assets, Some(false));
    }

    #[test]
    fn gitea_needs_an_api_endpoint() {
        let mut m = model();
        m.release.gitea = Some(github());
        let ctx = run(m, Mode::Full);
        assert!(
            ctx.findings
                .errors()
                .any(|f| f.message == "release.gitea.api_endpoint must be set for gitea")
        );
    }

    #[test]
    fn generic_releaser_needs_no_token() {
        let mut m = model();
        m.release.generic = Some(GitService::default());
        assert!(run(m, Mode::Full).findings.is_empty());
    }

    #[test]
    fn unknown_template_key_in_tag_is_an_error() {
        let mut m = model();
        m.release.github = Some(GitService {
            tag_name: Some("v{{version}}".to_string()),
            ..github()
        });
        assert!(run(m, Mode::Full).findings.has_errors());
    }
}
