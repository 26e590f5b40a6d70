use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::activation::Activatable;
use crate::context::Context;
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::validate::resolve_activation;

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context { model, findings, .. } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let checksum = &mut model.checksum;
    checksum.fill_defaults();
    if !resolve_activation("checksum", checksum, &state, findings) {
        reporter.debug("checksum is not active");
        return;
    }

    let name = checksum.name();
    if name.trim().is_empty() {
        findings.error("checksum.name must not be blank");
    } else if name.contains(['/', '\\']) || name == "." || name == ".." {
        findings.error(format!("checksum.name '{name}' must be a plain file name"));
    }

    let mut seen = BTreeSet::new();
    for algorithm in &checksum.algorithms {
        if !seen.insert(*algorithm) {
            findings.warning(format!("checksum.algorithms lists {algorithm} more than once"));
        }
    }

    if !checksum.include_artifacts() && !checksum.include_files() {
        findings.warning("checksum is active but neither artifacts nor files are included");
    }

    let mut inputs: Vec<&PathBuf> = Vec::new();
    if checksum.include_artifacts() {
        inputs.extend(
            model
                .distributions
                .values()
                .filter(|d| d.is_active())
                .flat_map(|d| d.artifacts.iter()),
        );
    }
    if checksum.include_files() && model.files.is_active() {
        inputs.extend(model.files.artifacts.iter());
    }
    let mut by_name: BTreeMap<String, BTreeSet<&PathBuf>> = BTreeMap::new();
    for input in inputs {
        if let Some(name) = input.file_name() {
            by_name
                .entry(name.to_string_lossy().into_owned())
                .or_default()
                .insert(input);
        }
    }
    for (name, paths) in by_name {
        if paths.len() > 1 {
            let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            findings.error(format!(
                "checksum: artifacts share the file name '{name}' ({})",
                paths.join(", ")
            ));
        }
    }
}
