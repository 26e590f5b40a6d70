//! Checksum and file preparation.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::activation::Activatable;
use crate::engine::Reporter;
use crate::errors::{PrepareError, boxed};
use crate::model::{Algorithm, ChecksumConfig, FilesConfig};
use crate::providers::{ExecutionContext, Preparer, file_name};

pub const CHECKSUMS_DIR: &str = "checksums";
pub const FILES_DIR: &str = "files";

/// Hex digest of a file's contents.
pub fn digest_file(path: &Path, algorithm: Algorithm) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let bytes = match algorithm {
        Algorithm::Sha256 => hash_reader::<Sha256>(&mut file)?,
        Algorithm::Sha384 => hash_reader::<Sha384>(&mut file)?,
        Algorithm::Sha512 => hash_reader::<Sha512>(&mut file)?,
    };
    Ok(hex::encode(bytes))
}

fn hash_reader<D: Digest + io::Write>(reader: &mut impl io::Read) -> Result<Vec<u8>> {
    let mut hasher = D::new();
    io::copy(reader, &mut hasher).context("failed to read file for hashing")?;
    Ok(hasher.finalize().to_vec())
}

/// Aggregate file name for `algorithm`; SHA-256 uses the configured name.
pub fn aggregate_name(name: &str, algorithm: Algorithm) -> String {
    if algorithm == Algorithm::Sha256 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{algorithm}.{ext}"),
        _ => format!("{name}_{algorithm}"),
    }
}

/// Name of the individual checksum file for an artifact.
pub fn individual_name(artifact: &str, algorithm: Algorithm) -> String {
    format!("{artifact}.{}", algorithm.extension())
}

fn unique_algorithms(config: &ChecksumConfig) -> Vec<Algorithm> {
    let mut algorithms = Vec::new();
    for algorithm in &config.algorithms {
        if !algorithms.contains(algorithm) {
            algorithms.push(*algorithm);
        }
    }
    algorithms
}

/// Artifacts the checksum stage digests in this run.
pub fn checksum_inputs(config: &ChecksumConfig, cx: &ExecutionContext<'_>) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    if config.include_artifacts() {
        inputs.extend(cx.distribution_artifacts());
    }
    if config.include_files() {
        inputs.extend(cx.file_artifacts());
    }
    inputs
}

/// File names the checksum stage writes for `inputs`, in write order.
pub fn checksum_outputs(config: &ChecksumConfig, inputs: &[PathBuf]) -> Vec<String> {
    if inputs.is_empty() {
        return Vec::new();
    }
    let mut names = Vec::new();
    for algorithm in unique_algorithms(config) {
        if config.individual() {
            names.extend(inputs.iter().map(|i| individual_name(&file_name(i), algorithm)));
        }
        names.push(aggregate_name(config.name(), algorithm));
    }
    names
}

pub struct ChecksumPreparer {
    config: ChecksumConfig,
}

impl ChecksumPreparer {
    pub fn new(config: ChecksumConfig) -> Self {
        Self { config }
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let inputs = checksum_inputs(&self.config, cx);
        if inputs.is_empty() {
            reporter.info("no artifacts to checksum");
            return Ok(());
        }

        let dir = cx.output_dir(CHECKSUMS_DIR);
        if !cx.dry_run() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        for algorithm in unique_algorithms(&self.config) {
            let mut aggregate = String::new();
            for input in &inputs {
                let hex = digest_file(input, algorithm)?;
                let name = file_name(input);
                aggregate.push_str(&format!("{hex}  {name}\n"));

                if self.config.individual() {
                    let target = dir.join(individual_name(&name, algorithm));
                    write_or_simulate(cx, reporter, &target, &format!("{hex}\n"))?;
                }
            }
            let target = dir.join(aggregate_name(self.config.name(), algorithm));
            write_or_simulate(cx, reporter, &target, &aggregate)?;
            reporter.info(&format!(
                "{algorithm}: {} artifact(s) -> {}",
                inputs.len(),
                target.display()
            ));
        }
        Ok(())
    }
}

fn write_or_simulate(
    cx: &ExecutionContext<'_>,
    reporter: &mut dyn Reporter,
    target: &Path,
    contents: &str,
) -> Result<()> {
    if cx.dry_run() {
        cx.simulate(reporter, &format!("write {}", target.display()));
        return Ok(());
    }
    fs::write(target, contents).with_context(|| format!("failed to write {}", target.display()))
}

impl Preparer for ChecksumPreparer {
    fn name(&self) -> &str {
        "checksum"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_active()
    }

    fn prepare(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), PrepareError> {
        self.run(cx, reporter)
            .map_err(|err| PrepareError::new(self.name(), boxed(err)))
    }
}

/// Copies `files` artifacts into the output directory.
pub struct FilesPreparer {
    config: FilesConfig,
}

impl FilesPreparer {
    pub fn new(config: FilesConfig) -> Self {
        Self { config }
    }

    fn run(&self, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Result<()> {
        let dir = cx.output_dir(FILES_DIR);
        if !cx.dry_run() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        for artifact in &self.config.artifacts {
            let source = cx.options.resolve_path(artifact);
            let metadata = fs::metadata(&source)
                .with_context(|| format!("failed to read {}", source.display()))?;
            let target = dir.join(file_name(&source));
            if cx.dry_run() {
                cx.simulate(
                    reporter,
                    &format!("copy {} -> {}", source.display(), target.display()),
                );
                continue;
            }
            fs::copy(&source, &target).with_context(|| {
                format!("failed to copy {} to {}", source.display(), target.display())
            })?;
            reporter.debug(&format!("copied {} ({} bytes)", source.display(), metadata.len()));
        }
        reporter.info(&format!("{} file(s) prepared", self.config.artifacts.len()));
        Ok(())
    }
}

impl Preparer for FilesPreparer {
    fn name(&self) -> &str {
        "files"
    }

    fn is_enabled(&self) -> bool {
        self.config.is_active()
    }

    fn prepare(
        &self,
        cx: &ExecutionContext<'_>,
        reporter: &mut dyn Reporter,
    ) -> Result<(), PrepareError> {
        self.run(cx, reporter)
            .map_err(|err| PrepareError::new(self.name(), boxed(err)))
    }
}
