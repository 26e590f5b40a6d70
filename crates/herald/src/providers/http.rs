use std::path::Path;

use anyhow::{Context, Result, bail};
use reqwest::blocking::{Client, RequestBuilder, Response};

use crate::activation::Timeouts;
use crate::auth;

pub(crate) fn client(timeouts: Timeouts) -> Result<Client> {
    Client::builder()
        .user_agent(format!("herald/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeouts.connect)
        .timeout(timeouts.read)
        .build()
        .context("failed to build HTTP client")
}

/// Basic-auth credentials, resolved before anything is sent.
pub(crate) struct Credentials {
    username: String,
    password: Option<String>,
}

impl Credentials {
    /// `None` when no username is configured. The password goes through
    /// secret indirection.
    pub(crate) fn resolve(
        username: Option<&str>,
        password: Option<&str>,
        base_dir: &Path,
    ) -> Result<Option<Self>> {
        let Some(username) = username else {
            return Ok(None);
        };
        let password = auth::resolve_optional(password, base_dir)
            .with_context(|| format!("failed to resolve the password for {username}"))?;
        Ok(Some(Self {
            username: username.to_string(),
            password,
        }))
    }
}

pub(crate) fn authenticate(request: RequestBuilder, credentials: Option<&Credentials>) -> RequestBuilder {
    match credentials {
        Some(c) => request.basic_auth(&c.username, c.password.as_deref()),
        None => request,
    }
}

/// Send and fail on any non-2xx status, naming `what` in the error.
pub(crate) fn send(request: RequestBuilder, what: &str) -> Result<Response> {
    let resp = request
        .send()
        .with_context(|| format!("{what}: request failed"))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        let body = body.trim();
        if body.is_empty() {
            bail!("{what}: unexpected status {status}");
        }
        bail!("{what}: unexpected status {status}: {}", truncate(body, 200));
    }
    Ok(resp)
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Join a base URL and a relative path with exactly one slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
