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
    let files = &mut model.files;
    files.fill_defaults();
    if !resolve_activation("files", files, &state, findings) {
        reporter.debug("files is not active");
        return;
    }

    let severity = missing_file_severity(options.mode.categories());
    let mut seen = std::collections::BTreeSet::new();
    for artifact in &files.artifacts {
        let path = options.resolve_path(artifact);
        if !path.is_file() {
            findings.append(
                severity,
                format!("files: artifact {} does not exist", path.display()),
            );
        }
        if let Some(name) = path.file_name()
            && !seen.insert(name.to_os_string())
        {
            findings.error(format!(
                "files: more than one artifact is named {}",
                name.to_string_lossy()
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::activation::Activatable;
    use crate::context::RunOptions;
    use crate::model::{FilesConfig, Model};
    use crate::types::Mode;
    use crate::validate::test_support::CollectingReporter;

    fn run(dir: &std::path::Path, mode: Mode, artifacts: &[&str]) -> Context {
        let model = Model {
            files: FilesConfig {
                artifacts: artifacts.iter().map(Into::into).collect(),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut ctx = Context::new(RunOptions::new(dir, mode), model);
        validate(&mut ctx, &mut CollectingReporter::default());
        ctx
    }

    #[test]
    fn empty_files_section_is_fine() {
        let td = tempdir().expect("tempdir");
        let ctx = run(td.path(), Mode::Full, &[]);
        assert!(ctx.findings.is_empty());
        assert!(ctx.model.files.is_active());
    }

    #[test]
    fn missing_file_is_an_error_when_assembling() {
        let td = tempdir().expect("tempdir");
        let ctx = run(td.path(), Mode::Assemble, &["NOTICE"]);
        assert!(ctx.findings.has_errors());
    }

    #[test]
    fn missing_file_only_warns_in_deploy_mode() {
        let td = tempdir().expect("tempdir");
        let ctx = run(td.path(), Mode::Deploy, &["NOTICE"]);
        assert!(!ctx.findings.has_errors());
        assert_eq!(ctx.findings.warnings().count(), 1);
    }

    #[test]
    fn clashing_file_names_are_rejected() {
        let td = tempdir().expect("tempdir");
        fs::create_dir_all(td.path().join("a")).expect("mkdir");
        fs::create_dir_all(td.path().join("b")).expect("mkdir");
        fs::write(td.path().join("a/LICENSE"), "a").expect("write");
        fs::write(td.path().join("b/LICENSE"), "b").expect("write");
        let ctx = run(td.path(), Mode::Assemble, &["a/LICENSE", "b/LICENSE"]);
        let errors: Vec<_> = ctx.findings.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("LICENSE"));
    }
}
