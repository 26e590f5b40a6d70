//! Project validation and project-state resolution.

use regex::Regex;

use crate::activation::compile_pattern;
use crate::context::Context;
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::findings::Findings;
use crate::model::{ProjectConfig, VersionPattern};
use crate::types::ProjectState;
use crate::validate::is_blank;

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let project = &mut model.project;
    project.fill_defaults();

    if is_blank(project.name.as_deref()) {
        findings.error("project.name must not be blank");
    }
    if is_blank(project.version.as_deref()) {
        findings.error("project.version must not be blank");
    } else {
        check_version(project, findings);
    }

    let snapshot_re = pattern(
        "project.snapshot.pattern",
        project.snapshot.pattern.as_deref(),
        findings,
    );
    let prerelease_re = pattern(
        "project.prerelease.pattern",
        project.prerelease.pattern.as_deref(),
        findings,
    );

    let version = project.version().trim();
    let snapshot = project
        .snapshot
        .enabled
        .unwrap_or_else(|| snapshot_re.as_ref().is_some_and(|re| re.is_match(version)));
    let prerelease = project.prerelease.enabled.unwrap_or_else(|| match &prerelease_re {
        Some(re) => re.is_match(version),
        None => {
            !snapshot
                && semver::Version::parse(version).is_ok_and(|v| !v.pre.is_empty())
        }
    });

    let state = ProjectState {
        snapshot,
        prerelease,
        branch: options.branch().map(str::to_string),
        tag: options.tag().map(str::to_string),
    };
    reporter.debug(&format!(
        "project {} {} resolved as {}{}",
        project.name(),
        version,
        if snapshot { "snapshot" } else { "release" },
        if prerelease { " (prerelease)" } else { "" }
    ));
    project.state = Some(state);
}

fn pattern(path: &str, value: Option<&str>, findings: &mut Findings) -> Option<Regex> {
    let value = value?;
    match compile_pattern(value) {
        Ok(re) => Some(re),
        Err(err) => {
            findings.error(format!("{path} '{value}' is not a valid regex: {err}"));
            None
        }
    }
}

fn check_version(project: &ProjectConfig, findings: &mut Findings) {
    let version = project.version().trim();
    let raw = project.version_pattern.as_deref().unwrap_or("semver");
    let Some(scheme) = VersionPattern::parse(raw) else {
        findings.error(format!(
            "project.version_pattern '{raw}' must be one of semver, calver:<FORMAT>, custom"
        ));
        return;
    };

    match scheme {
        VersionPattern::Semver => {
            if let Err(err) = semver::Version::parse(version) {
                findings.error(format!(
                    "project.version '{version}' is not a valid semver version: {err}"
                ));
            }
        }
        VersionPattern::Calver(format) => match calver_regex(&format) {
            Ok(re) => {
                // Snapshot suffixes are allowed on top of the calendar format.
                let base = version.strip_suffix("-SNAPSHOT").unwrap_or(version);
                if !re.is_match(base) {
                    findings.error(format!(
                        "project.version '{version}' does not match calver format {format}"
                    ));
                }
            }
            Err(msg) => findings.error(format!("project.version_pattern: {msg}")),
        },
        VersionPattern::Custom => {}
    }
}

const CALVER_TOKENS: [(&str, &str); 13] = [
    ("MODIFIER", "[A-Za-z0-9]+"),
    ("MAJOR", r"(?:0|[1-9]\d*)"),
    ("MINOR", r"(?:0|[1-9]\d*)"),
    ("MICRO", r"(?:0|[1-9]\d*)"),
    ("YYYY", r"\d{4}"),
    ("YY", r"[1-9]\d{0,2}"),
    ("0Y", r"\d{2,3}"),
    ("MM", "(?:[1-9]|1[0-2])"),
    ("0M", "(?:0[1-9]|1[0-2])"),
    ("WW", "(?:[1-9]|[1-4][0-9]|5[0-2])"),
    ("0W", "(?:0[1-9]|[1-4][0-9]|5[0-2])"),
    ("DD", "(?:[1-9]|[12][0-9]|3[01])"),
    ("0D", "(?:0[1-9]|[12][0-9]|3[01])"),
];

/// Translate a calver format (`YYYY.0M.MICRO`) into an anchored regex.
pub(crate) fn calver_regex(format: &str) -> Result<Regex, String> {
    let mut out = String::from("^");
    let mut rest = format;
    let mut tokens = 0;

    'scan: while !rest.is_empty() {
        for (token, re) in CALVER_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(re);
                rest = tail;
                tokens += 1;
                continue 'scan;
            }
        }
        let ch = rest.chars().next().unwrap_or_default();
        if !matches!(ch, '.' | '-' | '_') {
            return Err(format!("unknown calver token at '{rest}'"));
        }
        out.push_str(&regex::escape(&ch.to_string()));
        rest = &rest[ch.len_utf8()..];
    }
    if tokens == 0 {
        return Err(format!("calver format '{format}' has no tokens"));
    }
    out.push('$');
    Regex::new(&out).map_err(|err| err.to_string())
}
