//! Section validators.
//!
//! One validator per [`Section`]. Each one fills defaults, resolves
//! activation, and appends findings; none of them returns early on a
//! problem. [`validate_model`] runs them all in a fixed order so that later
//! sections can read what earlier ones resolved (project state first).

use std::path::Path;

use crate::activation::{Activatable, Activation, MAX_TIMEOUT, TimeoutAware, compile_pattern};
use crate::auth;
use crate::context::Context;
use crate::engine::Reporter;
use crate::findings::{Findings, Severity};
use crate::template;
use crate::types::{Category, ProjectState, Section};

pub mod announce;
pub mod checksum;
pub mod deploy;
pub mod distributions;
pub mod download;
pub mod files;
pub mod project;
pub mod release;
pub mod signing;
pub mod upload;

/// Validation order. Project comes first; release precedes deploy (the
/// github deployer reads the github releaser).
pub const ORDER: [Section; 10] = [
    Section::Project,
    Section::Distributions,
    Section::Files,
    Section::Checksum,
    Section::Signing,
    Section::Release,
    Section::Deploy,
    Section::Download,
    Section::Upload,
    Section::Announce,
];

/// Run every validator that applies to the context's mode.
pub fn validate_model(ctx: &mut Context, reporter: &mut dyn Reporter) {
    for section in ORDER {
        validate_section(section, ctx, reporter);
    }
}

/// Run one validator. Sections outside the current mode are skipped silently.
pub fn validate_section(section: Section, ctx: &mut Context, reporter: &mut dyn Reporter) {
    if !ctx.mode().validates(section) {
        return;
    }
    match section {
        Section::Project => project::validate(ctx, reporter),
        Section::Distributions => distributions::validate(ctx, reporter),
        Section::Files => files::validate(ctx, reporter),
        Section::Checksum => checksum::validate(ctx, reporter),
        Section::Signing => signing::validate(ctx, reporter),
        Section::Release => release::validate(ctx, reporter),
        Section::Deploy => deploy::validate(ctx, reporter),
        Section::Download => download::validate(ctx, reporter),
        Section::Upload => upload::validate(ctx, reporter),
        Section::Announce => announce::validate(ctx, reporter),
    }
}

/// Resolve a section's activation, reporting an `active` pattern that does
/// not compile. Such a pattern never matches.
pub(crate) fn resolve_activation<T: Activatable + ?Sized>(
    path: &str,
    section: &mut T,
    state: &ProjectState,
    findings: &mut Findings,
) -> bool {
    if let Some(Activation::Pattern(pattern)) = section.activation()
        && let Err(err) = compile_pattern(pattern)
    {
        findings.error(format!("{path}.active '{pattern}' is not a valid regex: {err}"));
    }
    section.resolve(state)
}

pub(crate) fn check_timeouts<T: TimeoutAware + ?Sized>(
    path: &str,
    section: &T,
    findings: &mut Findings,
) {
    for (field, value) in [
        ("connect_timeout", section.connect_timeout()),
        ("read_timeout", section.read_timeout()),
    ] {
        if let Some(secs) = value
            && !(1..=MAX_TIMEOUT).contains(&secs)
        {
            findings.error(format!(
                "{path}.{field} must be between 1 and {MAX_TIMEOUT} seconds, got {secs}"
            ));
        }
    }
}

/// Check that a secret-bearing field resolves. `required` turns an absent
/// value into a finding.
pub(crate) fn check_secret(
    path: &str,
    value: Option<&str>,
    required: bool,
    base_dir: &Path,
    findings: &mut Findings,
) {
    match value {
        Some(value) => {
            if let Err(err) = auth::resolve_secret(value, base_dir) {
                findings.error(format!("{path}: {err:#}"));
            }
        }
        None if required => {
            findings.error(format!("{path} is required"));
        }
        None => {}
    }
}

pub(crate) fn check_template(path: &str, value: Option<&str>, findings: &mut Findings) {
    if let Some(value) = value
        && let Err(err) = template::check(value)
    {
        findings.error(format!("{path}: {err}"));
    }
}

/// Missing files are fatal only when this run is going to read them.
pub(crate) fn missing_file_severity(categories: &[Category]) -> Severity {
    if categories.contains(&Category::Prepare) {
        Severity::Error
    } else {
        Severity::Warning
    }
}

pub(crate) fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
