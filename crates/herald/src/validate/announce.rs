use crate::context::{Context, RunOptions};
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::findings::Findings;
use crate::model::{AnnouncerConfig, ChatKind};
use crate::types::ProjectState;
use crate::validate::{check_secret, check_template, check_timeouts, resolve_activation};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let announce = &mut model.announce;
    announce.fill_defaults();
    if !resolve_activation("announce", announce, &state, findings) {
        reporter.debug("announce is not active");
        return;
    }

    for kind in ChatKind::ALL {
        if let Some(announcer) = announce.chat_mut(kind) {
            let path = format!("announce.{}", kind.name());
            check_announcer(&path, announcer, false, &state, options, findings, reporter);
        }
    }
    for (name, announcer) in announce.webhooks.iter_mut() {
        let path = format!("announce.webhooks.{name}");
        check_announcer(&path, announcer, true, &state, options, findings, reporter);
    }
}

fn check_announcer(
    path: &str,
    announcer: &mut AnnouncerConfig,
    webhook: bool,
    state: &ProjectState,
    options: &RunOptions,
    findings: &mut Findings,
    reporter: &mut dyn Reporter,
) {
    if !resolve_activation(path, announcer, state, findings) {
        reporter.debug(&format!("{path} is not active"));
        return;
    }
    check_secret(
        &format!("{path}.webhook"),
        announcer.webhook.as_deref(),
        true,
        &options.base_dir,
        findings,
    );
    check_template(&format!("{path}.message"), announcer.message.as_deref(), findings);
    check_template(&format!("{path}.title"), announcer.title.as_deref(), findings);
    match announcer.secret.as_deref() {
        Some(_) if !webhook => {
            findings.warning(format!("{path}.secret is only used by generic webhooks"));
        }
        Some(secret) => check_secret(
            &format!("{path}.secret"),
            Some(secret),
            false,
            &options.base_dir,
            findings,
        ),
        None => {}
    }
    check_timeouts(path, announcer, findings);
}
