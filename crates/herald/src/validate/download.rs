use std::collections::BTreeSet;

use crate::context::Context;
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::validate::{check_secret, check_template, check_timeouts, resolve_activation};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let download = &mut model.download;
    download.fill_defaults();
    if !resolve_activation("download", download, &state, findings) {
        reporter.debug("download is not active");
        return;
    }

    for (name, downloader) in download.http.iter_mut() {
        let path = format!("download.http.{name}");
        if !resolve_activation(&path, downloader, &state, findings) {
            reporter.debug(&format!("{path} is not active"));
            continue;
        }

        if downloader.assets.is_empty() {
            findings.error(format!("{path}.assets must not be empty"));
        }
        check_template(&format!("{path}.url"), downloader.url.as_deref(), findings);

        let mut outputs = BTreeSet::new();
        for (index, asset) in downloader.assets.iter().enumerate() {
            let asset_path = format!("{path}.assets[{index}]");
            if asset.input.trim().is_empty() {
                findings.error(format!("{asset_path}.input must not be blank"));
                continue;
            }
            check_template(&format!("{asset_path}.input"), Some(&asset.input), findings);
            let absolute = asset.input.starts_with("http://") || asset.input.starts_with("https://");
            if !absolute && downloader.url.is_none() {
                findings.error(format!(
                    "{asset_path}.input '{}' is relative but {path}.url is not set",
                    asset.input
                ));
            }
            match asset_output_name(&asset.input, asset.output.as_deref()) {
                Some(output) => {
                    if !outputs.insert(output.clone()) {
                        findings.error(format!("{path}: more than one asset writes {output}"));
                    }
                }
                None => findings.error(format!(
                    "{asset_path}.output must be set; no file name in '{}'",
                    asset.input
                )),
            }
        }

        check_secret(
            &format!("{path}.password"),
            downloader.password.as_deref(),
            downloader.username.is_some(),
            &options.base_dir,
            findings,
        );
        check_timeouts(&path, downloader, findings);
    }
}

/// File name an asset is written under: the explicit output or the last
/// path segment of the input (query and fragment stripped).
pub(crate) fn asset_output_name(input: &str, output: Option<&str>) -> Option<String> {
    if let Some(output) = output.map(str::trim).filter(|o| !o.is_empty()) {
        return Some(output.to_string());
    }
    let without_query = input.split(['?', '#']).next().unwrap_or_default();
    let last = without_query.rsplit('/').next().unwrap_or_default().trim();
    (!last.is_empty() && !last.contains("{{")).then(|| last.to_string())
}
