use crate::context::Context;
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::validate::{check_secret, resolve_activation};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let signing = &mut model.signing;
    signing.fill_defaults();
    if !resolve_activation("signing", signing, &state, findings) {
        reporter.debug("signing is not active");
        return;
    }

    for (field, value) in [
        ("public_key", signing.public_key.as_deref()),
        ("secret_key", signing.secret_key.as_deref()),
        ("passphrase", signing.passphrase.as_deref()),
    ] {
        check_secret(
            &format!("signing.{field}"),
            value,
            true,
            &options.base_dir,
            findings,
        );
    }
}
