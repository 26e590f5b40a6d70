//! Loading the configuration tree from `herald.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::model::Model;

/// Configuration file looked up in the base directory.
pub const CONFIG_FILE: &str = "herald.toml";

/// Parse a configuration document.
pub fn parse(text: &str) -> Result<Model> {
    Ok(toml::from_str(text)?)
}

/// Load configuration from a specific file path.
pub fn load_from_file(path: &Path) -> Result<Model> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    parse(&content).with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Locate and load the configuration for `base_dir`.
///
/// An explicit `config_file` is resolved against `base_dir` and must exist;
/// otherwise `herald.toml` in `base_dir` is used.
pub fn load(base_dir: &Path, config_file: Option<&Path>) -> Result<(PathBuf, Model)> {
    let path = match config_file {
        Some(file) if file.is_absolute() => file.to_path_buf(),
        Some(file) => base_dir.join(file),
        None => base_dir.join(CONFIG_FILE),
    };
    if !path.is_file() {
        bail!("config file not found: {}", path.display());
    }
    let model = load_from_file(&path)?;
    Ok((path, model))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::activation::Activation;
    use crate::model::{Algorithm, ReleaserKind};

    const SAMPLE: &str = r#"
[project]
name = "demo"
version = "1.2.3"

[checksum]
algorithms = ["sha512"]

[release.github]
owner = "acme"
token = "env:GH_TOKEN"

[announce.slack]
active = "release"
webhook = "env:SLACK_WEBHOOK"

[announce.webhooks.ops]
webhook = "https://hooks.example.com/ops"
secret = "file:ops.secret"
"#;

    #[test]
    fn loads_herald_toml_from_base_dir() {
        let td = tempdir().expect("tempdir");
        fs::write(td.path().join(CONFIG_FILE), SAMPLE).expect("write");

        let (path, model) = load(td.path(), None).expect("load");
        assert_eq!(path, td.path().join(CONFIG_FILE));
        assert_eq!(model.project.name(), "demo");
        assert_eq!(model.checksum.algorithms, vec![Algorithm::Sha512]);
        let configured: Vec<_> = model.release.configured().map(|(k, _)| k).collect();
        assert_eq!(configured, vec![ReleaserKind::Github]);
        assert_eq!(
            model.announce.slack.as_ref().and_then(|s| s.active.clone()),
            Some(Activation::Release)
        );
        assert!(model.announce.webhooks.contains_key("ops"));
    }

    #[test]
    fn explicit_config_file_is_relative_to_base_dir() {
        let td = tempdir().expect("tempdir");
        fs::create_dir_all(td.path().join("ci")).expect("mkdir");
        fs::write(td.path().join("ci/release.toml"), SAMPLE).expect("write");

        let (path, _) = load(td.path(), Some(Path::new("ci/release.toml"))).expect("load");
        assert_eq!(path, td.path().join("ci/release.toml"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let td = tempdir().expect("tempdir");
        let err = load(td.path(), None).expect_err("must fail");
        assert!(err.to_string().starts_with("config file not found"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let td = tempdir().expect("tempdir");
        let path = td.path().join(CONFIG_FILE);
        fs::write(&path, "[project\nname = 1").expect("write");
        let err = load_from_file(&path).expect_err("must fail");
        assert!(format!("{err:#}").contains("failed to parse config file"));
    }

    #[test]
    fn resolved_flags_cannot_be_injected() {
        let model = parse("[checksum]\nresolved = true\n").expect("parse");
        assert_eq!(model.checksum.resolved, None);
    }
}
