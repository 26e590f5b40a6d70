//! Announcers: chat services and generic webhooks.

use anyhow::{Context, Result};
use herald_webhook::{WebhookConfig, WebhookPayload, WebhookType, send_webhook};

use crate::activation::{Activatable, TimeoutAware};
use crate::auth;
use crate::engine::Reporter;
use crate::errors::{AnnounceError, boxed};
use crate::model::{AnnouncerConfig, ChatKind};
use crate::providers::{Announcer, ExecutionContext};
use crate::template;

pub struct WebhookAnnouncer {
    name: String,
    webhook_type: WebhookType,
    config: AnnouncerConfig,
}

impl WebhookAnnouncer {
    pub fn chat(kind: ChatKind, config: AnnouncerConfig) -> Self {
        let webhook_type = match kind {
            ChatKind::Discord => WebhookType::Discord,
            ChatKind::Mattermost => WebhookType::Mattermost,
            ChatKind::Slack => WebhookType::Slack,
            ChatKind::Teams => WebhookType::Teams,
        };
        Self {
            name: kind.name().to_string(),
            webhook_type,
            config,
        }
    }

    /// A generic JSON webhook, optionally HMAC-signed.
    pub fn webhook(name: impl Into<String>, config: AnnouncerConfig) -> Self {
        Self {
            name: name.into(),
            webhook_type: WebhookType::Generic,
            config,
        }
    }

    fn payload(&self, cx: &ExecutionContext<'_>) -> Result<WebhookPayload> {
        let message = cx.render(
            self.config
                .message
                .as_deref()
                .unwrap_or(crate::defaults::DEFAULT_ANNOUNCE_MESSAGE),
        )?;
        let title = self
            .config
            .title
            .as_deref()
            .map(|t| cx.render(t))
            .transpose()?;
        let prop = |key: &str| {
            cx.props
                .get(key)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Ok(WebhookPayload {
            message,
            title,
            project: prop(template::PROJECT_NAME),
            version: prop(template::PROJECT_VERSION),
            tag: prop(template::TAG_NAME),
            url: prop(template::RELEASE_URL),
            ..Default::default()
        })
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let payload = self.payload(cx)?;
        let url = auth::resolve_optional(self.config.webhook.as_deref(), &cx.options.base_dir)?
            .context("webhook is not set")?;
        let secret = match self.webhook_type {
            WebhookType::Generic => {
                auth::resolve_optional(self.config.secret.as_deref(), &cx.options.base_dir)?
            }
            _ => None,
        };
        if cx.dry_run() {
            cx.simulate(
                reporter,
                &format!("announce to {}: {}", self.name, payload.message),
            );
            return Ok(());
        }

        let timeouts = self.config.timeouts();
        let config = WebhookConfig {
            url,
            webhook_type: self.webhook_type,
            secret,
            connect_timeout_secs: timeouts.connect.as_secs(),
            read_timeout_secs: timeouts.read.as_secs(),
        };
        send_webhook(&config, &payload)?;
        reporter.info(&format!("announced to {}", self.name));
        Ok(())
    }
}

impl Announcer for WebhookAnnouncer {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.config.is_active()
    }

    fn announce(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), AnnounceError> {
        self.run(cx, reporter)
            .map_err(|err| AnnounceError::new(self.name.clone(), boxed(err)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use crate::model::Model;
    use crate::providers::test_server;
    use crate::template::Props;
    use crate::types::Mode;
    use crate::validate::test_support::CollectingReporter;

    fn props() -> Props {
        Props::new()
            .with(template::PROJECT_NAME, "demo")
            .with(template::PROJECT_VERSION, "2.1.0")
            .with(template::TAG_NAME, "v2.1.0")
            .with(template::RELEASE_URL, "https://example.com/r/v2.1.0")
    }

    fn config(url: &str) -> AnnouncerConfig {
        AnnouncerConfig {
            webhook: Some(url.to_string()),
            message: Some("{{projectName}} {{tagName}} is out".to_string()),
            resolved: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn slack_announcement_renders_the_message() {
        let server = test_server::spawn(vec![(200, "ok".to_string())]);
        let options = RunOptions::new("/work", Mode::Announce);
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };

        WebhookAnnouncer::chat(ChatKind::Slack, config(&server.base_url))
            .announce(&cx, &mut CollectingReporter::default())
            .expect("announce");
        let seen = server.join();

        let body: serde_json::Value = serde_json::from_str(&seen[0].body).expect("json");
        assert_eq!(body["text"], "demo v2.1.0 is out");
        assert_eq!(body["attachments"][0]["title_link"], "https://example.com/r/v2.1.0");
    }

    #[test]
    fn generic_webhook_is_signed_when_a_secret_is_set() {
        let server = test_server::spawn(vec![(204, String::new())]);
        let options = RunOptions::new("/work", Mode::Announce);
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };

        WebhookAnnouncer::webhook(
            "ops",
            AnnouncerConfig {
                secret: Some("hush".to_string()),
                ..config(&server.base_url)
            },
        )
        .announce(&cx, &mut CollectingReporter::default())
        .expect("announce");
        let seen = server.join();

        let body: serde_json::Value = serde_json::from_str(&seen[0].body).expect("json");
        assert_eq!(body["message"], "demo v2.1.0 is out");
        assert_eq!(body["tag"], "v2.1.0");
        let signature = seen[0]
            .header(herald_webhook::SIGNATURE_HEADER)
            .expect("signature header");
        assert_eq!(
            signature,
            herald_webhook::sign("hush", &seen[0].body).expect("sign")
        );
    }

    #[test]
    fn failed_delivery_names_the_announcer() {
        let server = test_server::spawn(vec![(500, "boom".to_string())]);
        let options = RunOptions::new("/work", Mode::Announce);
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };

        let err = WebhookAnnouncer::chat(ChatKind::Teams, config(&server.base_url))
            .announce(&cx, &mut CollectingReporter::default())
            .expect_err("must fail");
        server.join();
        assert_eq!(err.provider, "teams");
        assert!(err.to_string().contains("500"), "{err}");
    }

    #[test]
    fn dry_run_sends_nothing() {
        let mut options = RunOptions::new("/work", Mode::Announce);
        options.dry_run = true;
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };
        let mut reporter = CollectingReporter::default();

        WebhookAnnouncer::chat(ChatKind::Discord, config("http://127.0.0.1:9"))
            .announce(&cx, &mut reporter)
            .expect("dry run");
        assert_eq!(
            reporter.lines,
            vec!["info: [dry-run] announce to discord: demo v2.1.0 is out".to_string()]
        );
    }

    #[test]
    fn dry_run_still_resolves_the_webhook() {
        let mut options = RunOptions::new("/work", Mode::Announce);
        options.dry_run = true;
        let model = Model::default();
        let cx = ExecutionContext {
            options: &options,
            model: &model,
            release: None,
            props: props(),
        };
        let mut reporter = CollectingReporter::default();

        let err = temp_env::with_var("HERALD_TEST_UNSET_HOOK", None::<&str>, || {
            WebhookAnnouncer::chat(ChatKind::Slack, config("env:HERALD_TEST_UNSET_HOOK"))
                .announce(&cx, &mut reporter)
                .expect_err("unresolvable webhook")
        });
        assert_eq!(err.provider, "slack");
        assert!(reporter.lines.is_empty(), "{:?}", reporter.lines);
    }
}
