use crate::context::Context;
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::validate::{missing_file_severity, resolve_activation};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let severity = missing_file_severity(options.mode.categories());

    for (name, distribution) in model.distributions.iter_mut() {
        distribution.fill_defaults();
        if !resolve_activation(&format!("distributions.{name}"), distribution, &state, findings) {
            reporter.debug(&format!("distributions.{name} is not active"));
            continue;
        }
        if distribution.artifacts.is_empty() {
            findings.error(format!("distributions.{name}.artifacts must not be empty"));
        }
        for artifact in &distribution.artifacts {
            let path = options.resolve_path(artifact);
            if !path.is_file() {
                findings.append(
                    severity,
                    format!(
                        "distributions.{name}: artifact {} does not exist",
                        path.display()
                    ),
                );
            }
        }
    }
}
