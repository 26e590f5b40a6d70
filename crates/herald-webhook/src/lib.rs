//! Chat and webhook announcement transport for herald.
//!
//! This crate turns a release announcement into the JSON body each chat
//! flavour expects (Slack, Discord, Microsoft Teams, Mattermost, or a plain
//! generic webhook) and delivers it with a blocking HTTP POST that honours
//! explicit connect and read timeouts.
//!
//! # Example
//!
//! ```ignore
//! use herald_webhook::{WebhookConfig, WebhookPayload, WebhookType, send_webhook};
//!
//! let config = WebhookConfig {
//!     url: "https://hooks.slack.com/services/...".to_string(),
//!     webhook_type: WebhookType::Slack,
//!     ..Default::default()
//! };
//!
//! let payload = WebhookPayload {
//!     message: "demo 1.0.0 has been released".to_string(),
//!     ..Default::default()
//! };
//!
//! send_webhook(&config, &payload).expect("send");
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Header carrying the HMAC-SHA256 signature of the request body.
pub const SIGNATURE_HEADER: &str = "X-Herald-Signature";

/// Chat flavour of a webhook endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookType {
    /// Generic webhook (POST the payload as JSON)
    #[default]
    Generic,
    /// Slack incoming webhook
    Slack,
    /// Discord webhook
    Discord,
    /// Microsoft Teams incoming webhook (MessageCard)
    Teams,
    /// Mattermost incoming webhook
    Mattermost,
}

impl std::fmt::Display for WebhookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebhookType::Generic => write!(f, "webhook"),
            WebhookType::Slack => write!(f, "slack"),
            WebhookType::Discord => write!(f, "discord"),
            WebhookType::Teams => write!(f, "teams"),
            WebhookType::Mattermost => write!(f, "mattermost"),
        }
    }
}

/// Delivery settings for one webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL
    pub url: String,
    /// Chat flavour used to shape the body
    #[serde(default)]
    pub webhook_type: WebhookType,
    /// Optional secret; when set the body is signed with HMAC-SHA256
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    20
}

fn default_read_timeout() -> u64 {
    60
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            webhook_type: WebhookType::default(),
            secret: None,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

/// Announcement payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Main message (already rendered)
    pub message: String,
    /// Optional title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Project name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Project version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Release tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Release URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Additional fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Build the request body for the configured chat flavour.
pub fn render_body(webhook_type: WebhookType, payload: &WebhookPayload) -> Result<String> {
    let body = match webhook_type {
        WebhookType::Generic => serde_json::to_string(payload)?,
        WebhookType::Slack => slack_payload(payload)?,
        WebhookType::Discord => discord_payload(payload)?,
        WebhookType::Teams => teams_payload(payload)?,
        WebhookType::Mattermost => mattermost_payload(payload)?,
    };
    Ok(body)
}

/// Compute the `sha256=<hex>` signature for a body.
pub fn sign(secret: &str, body: &str) -> Result<String> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    type HmacSha256 = Hmac<Sha256>;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("failed to initialise webhook signature")?;
    mac.update(body.as_bytes());
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Send an announcement, failing on transport errors, timeouts, and
/// non-success HTTP statuses.
pub fn send_webhook(config: &WebhookConfig, payload: &WebhookPayload) -> Result<()> {
    if config.url.trim().is_empty() {
        bail!("webhook URL is empty");
    }

    let client = reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.read_timeout_secs))
        .build()
        .context("failed to create HTTP client")?;

    let body = render_body(config.webhook_type, payload)?;

    let mut request = client
        .post(&config.url)
        .header("Content-Type", "application/json");

    if let Some(secret) = &config.secret {
        request = request.header(SIGNATURE_HEADER, sign(secret, &body)?);
    }

    let response = request
        .body(body)
        .send()
        .with_context(|| format!("failed to send {} request", config.webhook_type))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().unwrap_or_default();
        bail!(
            "{} request failed with status {}: {}",
            config.webhook_type,
            status,
            text
        );
    }

    Ok(())
}

fn title_of(payload: &WebhookPayload) -> String {
    payload.title.clone().unwrap_or_else(|| match (&payload.project, &payload.version) {
        (Some(p), Some(v)) => format!("{p} {v}"),
        (Some(p), None) => p.clone(),
        _ => "Release announcement".to_string(),
    })
}

fn slack_payload(payload: &WebhookPayload) -> Result<String> {
    let mut fields = vec![];

    if let Some(version) = &payload.version {
        fields.push(json!({
            "title": "Version",
            "value": version,
            "short": true
        }));
    }

    if let Some(tag) = &payload.tag {
        fields.push(json!({
            "title": "Tag",
            "value": tag,
            "short": true
        }));
    }

    let slack_json = json!({
        "text": payload.message,
        "attachments": [{
            "color": "good",
            "title": title_of(payload),
            "title_link": payload.url,
            "fields": fields
        }]
    });

    Ok(serde_json::to_string(&slack_json)?)
}

fn discord_payload(payload: &WebhookPayload) -> Result<String> {
    let mut fields = vec![];

    if let Some(version) = &payload.version {
        fields.push(json!({
            "name": "Version",
            "value": version,
            "inline": true
        }));
    }

    if let Some(tag) = &payload.tag {
        fields.push(json!({
            "name": "Tag",
            "value": tag,
            "inline": true
        }));
    }

    let discord_json = json!({
        "content": payload.message,
        "embeds": [{
            "title": title_of(payload),
            "url": payload.url,
            "color": 65280_u32,
            "fields": fields
        }]
    });

    Ok(serde_json::to_string(&discord_json)?)
}

fn teams_payload(payload: &WebhookPayload) -> Result<String> {
    let teams_json = json!({
        "@type": "MessageCard",
        "@context": "http://schema.org/extensions",
        "themeColor": "00FF00",
        "summary": title_of(payload),
        "title": title_of(payload),
        "text": payload.message
    });

    Ok(serde_json::to_string(&teams_json)?)
}

fn mattermost_payload(payload: &WebhookPayload) -> Result<String> {
    let text = match &payload.url {
        Some(url) => format!("{}\n{}", payload.message, url),
        None => payload.message.clone(),
    };

    Ok(serde_json::to_string(&json!({ "text": text }))?)
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use tiny_http::{Response, Server, StatusCode};

    use super::*;

    fn released() -> WebhookPayload {
        WebhookPayload {
            message: "demo 1.0.0 has been released".to_string(),
            project: Some("demo".to_string()),
            version: Some("1.0.0".to_string()),
            tag: Some("v1.0.0".to_string()),
            url: Some("https://example.com/releases/v1.0.0".to_string()),
            ..Default::default()
        }
    }

    /// Serve `expected` requests with `status`, recording each body and signature header.
    fn spawn_server(
        status: u16,
        expected: usize,
    ) -> (String, Arc<Mutex<Vec<(String, Option<String>)>>>, thread::JoinHandle<()>) {
        let server = Server::http("127.0.0.1:0").expect("server");
        let addr = format!("http://{}", server.server_addr());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let handle = thread::spawn(move || {
            for _ in 0..expected {
                let mut req = match server.recv() {
                    Ok(r) => r,
                    Err(_) => return,
                };
                let mut body = String::new();
                let _ = req.as_reader().read_to_string(&mut body);
                let sig = req
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv(SIGNATURE_HEADER))
                    .map(|h| h.value.as_str().to_string());
                seen_clone.lock().expect("lock").push((body, sig));
                let _ = req.respond(Response::from_string("ok").with_status_code(StatusCode(status)));
            }
        });

        (addr, seen, handle)
    }

    #[test]
    fn webhook_type_default_is_generic() {
        assert_eq!(WebhookType::default(), WebhookType::Generic);
    }

    #[test]
    fn webhook_config_default_timeouts() {
        let config = WebhookConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.connect_timeout_secs, 20);
        assert_eq!(config.read_timeout_secs, 60);
    }

    #[test]
    fn slack_body_carries_message_and_fields() {
        let json = render_body(WebhookType::Slack, &released()).expect("format");
        assert!(json.contains("\"attachments\""));
        assert!(json.contains("\"text\":\"demo 1.0.0 has been released\""));
        assert!(json.contains("\"title\":\"demo 1.0.0\""));
        assert!(json.contains("v1.0.0"));
    }

    #[test]
    fn discord_body_uses_embeds() {
        let json = render_body(WebhookType::Discord, &released()).expect("format");
        assert!(json.contains("\"embeds\""));
        assert!(json.contains("\"color\":65280"));
        assert!(json.contains("\"content\":\"demo 1.0.0 has been released\""));
    }

    #[test]
    fn teams_body_is_message_card() {
        let json = render_body(WebhookType::Teams, &released()).expect("format");
        assert!(json.contains("\"@type\":\"MessageCard\""));
        assert!(json.contains("\"text\":\"demo 1.0.0 has been released\""));
    }

    #[test]
    fn mattermost_body_appends_url() {
        let json = render_body(WebhookType::Mattermost, &released()).expect("format");
        insta::assert_snapshot!(json, @r#"{"text":"demo 1.0.0 has been released\nhttps://example.com/releases/v1.0.0"}"#);
    }

    #[test]
    fn generic_body_flattens_extra_fields() {
        let mut payload = released();
        payload
            .extra
            .insert("channel".to_string(), serde_json::Value::String("ops".to_string()));
        let json = render_body(WebhookType::Generic, &payload).expect("format");
        assert!(json.contains("\"channel\":\"ops\""));
        assert!(!json.contains("\"title\""));
    }

    #[test]
    fn signature_is_stable_for_same_input() {
        let a = sign("s3cret", "{}").expect("sign");
        let b = sign("s3cret", "{}").expect("sign");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256="));
        assert_ne!(a, sign("other", "{}").expect("sign"));
    }

    #[test]
    fn send_posts_signed_body() {
        let (url, seen, handle) = spawn_server(200, 1);
        let config = WebhookConfig {
            url,
            secret: Some("s3cret".to_string()),
            ..Default::default()
        };

        send_webhook(&config, &released()).expect("send");
        handle.join().expect("join");

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        let (body, sig) = &seen[0];
        assert!(body.contains("demo 1.0.0 has been released"));
        assert_eq!(sig.as_deref(), Some(sign("s3cret", body).expect("sign").as_str()));
    }

    #[test]
    fn send_fails_on_error_status() {
        let (url, _seen, handle) = spawn_server(500, 1);
        let config = WebhookConfig {
            url,
            webhook_type: WebhookType::Slack,
            ..Default::default()
        };

        let err = send_webhook(&config, &released()).expect_err("must fail");
        handle.join().expect("join");
        assert!(format!("{err:#}").contains("500"));
    }

    #[test]
    fn send_rejects_empty_url() {
        let err = send_webhook(&WebhookConfig::default(), &released()).expect_err("must fail");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn send_unreachable_endpoint_fails_fast() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let config = WebhookConfig {
            url: format!("http://{addr}"),
            connect_timeout_secs: 1,
            read_timeout_secs: 1,
            ..Default::default()
        };
        assert!(send_webhook(&config, &released()).is_err());
    }
}
