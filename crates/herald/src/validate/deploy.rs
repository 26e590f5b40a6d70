//! Deployer validation.
//!
//! The deploy container is resolved first; each deployer is then resolved on
//! its own. A container that is active but ends up with no active deployer is
//! switched off, so later stages see a single consistent flag.

use crate::activation::Activatable;
use crate::context::Context;
use crate::defaults::{FillDefaults, fill_github_deployer};
use crate::engine::Reporter;
use crate::model::DeployerKind;
use crate::types::Category;
use crate::validate::{check_secret, check_timeouts, is_blank, resolve_activation};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let deploy = &mut model.deploy;
    deploy.fill_defaults();
    if !resolve_activation("deploy", deploy, &state, findings) {
        reporter.debug("deploy is not active");
        return;
    }
    let deploying = options.mode.categories().contains(&Category::Deploy);

    let mut any_active = false;
    for kind in DeployerKind::ALL {
        let Some(deployer) = deploy.get_mut(kind) else {
            continue;
        };
        if kind == DeployerKind::Github {
            fill_github_deployer(deployer, model.release.github.as_ref());
        }
        let path = format!("deploy.{kind}");
        if !resolve_activation(&path, deployer, &state, findings) {
            reporter.debug(&format!("{path} is not active"));
            continue;
        }
        any_active = true;

        if is_blank(deployer.url.as_deref()) {
            findings.error(format!("{path}.url must not be blank"));
        }
        if state.snapshot && deployer.snapshot_supported == Some(false) {
            findings.error(format!(
                "{path} does not accept snapshots; version {} is a snapshot",
                model.project.version()
            ));
        }
        match deployer.staging_repository.as_deref() {
            None => findings.error(format!("{path}.staging_repository must be set")),
            Some(dir) => {
                let dir = options.resolve_path(dir);
                if !dir.is_dir() {
                    let message = format!(
                        "{path}.staging_repository {} is not a directory",
                        dir.display()
                    );
                    if deploying {
                        findings.error(message);
                    } else {
                        findings.warning(message);
                    }
                }
            }
        }
        check_secret(
            &format!("{path}.password"),
            deployer.password.as_deref(),
            deployer.username.is_some(),
            &options.base_dir,
            findings,
        );
        check_timeouts(&path, deployer, findings);
    }

    if !any_active {
        reporter.debug("deploy has no active deployers; disabling deploy");
        deploy.deactivate();
    }
}
