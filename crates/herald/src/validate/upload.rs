use crate::context::Context;
use crate::defaults::FillDefaults;
use crate::engine::Reporter;
use crate::validate::{check_secret, check_template, check_timeouts, is_blank, resolve_activation};

pub fn validate(ctx: &mut Context, reporter: &mut dyn Reporter) {
    let Context {
        options,
        model,
        findings,
    } = ctx;
    let state = model.project.state.clone().unwrap_or_default();
    let upload = &mut model.upload;
    upload.fill_defaults();
    if !resolve_activation("upload", upload, &state, findings) {
        reporter.debug("upload is not active");
        return;
    }

    for (name, uploader) in upload.http.iter_mut() {
        let path = format!("upload.http.{name}");
        if !resolve_activation(&path, uploader, &state, findings) {
            reporter.debug(&format!("{path} is not active"));
            continue;
        }

        match uploader.url.as_deref() {
            url if is_blank(url) => findings.error(format!("{path}.url must not be blank")),
            url => {
                check_template(&format!("{path}.url"), url, findings);
                if url.is_some_and(|u| !u.contains("{{artifactFileName}}")) {
                    findings.warning(format!(
                        "{path}.url does not reference {{{{artifactFileName}}}}; every artifact targets the same URL"
                    ));
                }
            }
        }
        if uploader.artifacts == Some(false)
            && uploader.files == Some(false)
            && uploader.checksums == Some(false)
        {
            findings.warning(format!("{path} excludes artifacts, files and checksums"));
        }

        check_secret(
            &format!("{path}.password"),
            uploader.password.as_deref(),
            uploader.username.is_some(),
            &options.base_dir,
            findings,
        );
        check_timeouts(&path, uploader, findings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use crate::model::{HttpMethod, HttpUploader, Model};
    use crate::types::Mode;
    use crate::validate::test_support::CollectingReporter;

    fn run(uploader: HttpUploader) -> Context {
        let mut model = Model::default();
        model.upload.http.insert("mirror".to_string(), uploader);
        let mut ctx = Context::new(RunOptions::new("/work", Mode::Full), model);
        validate(&mut ctx, &mut CollectingReporter::default());
        ctx
    }

    #[test]
    fn templated_url_is_valid_and_defaults_fill() {
        let ctx = run(HttpUploader {
            url: Some("https://files.example.com/{{tagName}}/{{artifactFileName}}".to_string()),
            ..Default::default()
        });
        assert!(ctx.findings.is_empty(), "{:?}", ctx.findings);
        let uploader = &ctx.model.upload.http["mirror"];
        assert_eq!(uploader.method, Some(HttpMethod::Put));
        assert_eq!(uploader.checksums, Some(true));
    }

    #[test]
    fn missing_url_is_an_error() {
        assert!(run(HttpUploader::default()).findings.has_errors());
    }

    #[test]
    fn url_without_file_name_warns() {
        let ctx = run(HttpUploader {
            url: Some("https://files.example.com/drop".to_string()),
            ..Default::default()
        });
        assert!(!ctx.findings.has_errors());
        let warnings: Vec<_> = ctx.findings.warnings().map(|f| f.message.as_str()).collect();
        assert_eq!(
            warnings,
            vec!["upload.http.mirror.url does not reference {{artifactFileName}}; every artifact targets the same URL"]
        );
    }
}
