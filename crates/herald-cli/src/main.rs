use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};

use herald::config;
use herald::context::{Context, RunOptions};
use herald::engine::{self, Reporter, RunReport};
use herald::git;
use herald::types::{Category, Mode};

/// Exit code for a run that never got past loading its configuration.
const EXIT_ABORTED: i32 = 3;

#[derive(Parser, Debug)]
#[command(name = "herald", version)]
#[command(about = "Validate release configuration and drive release integrations")]
struct Cli {
    /// Project base directory (default: current directory)
    #[arg(long, global = true)]
    basedir: Option<PathBuf>,

    /// Configuration file, relative to the base directory (default: herald.toml)
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    /// Log every mutation instead of performing it.
    #[arg(long, global = true)]
    dry_run: bool,

    /// Override the branch detected from git.
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Print debug output.
    #[arg(long, global = true)]
    debug: bool,

    /// Summary format written to stdout.
    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve and validate the whole configuration without executing anything.
    Config,
    /// Compute checksums and copy extra files into the output directory.
    Assemble(Only),
    /// Fetch remote assets.
    Download(Only),
    /// Push staged artifacts to deploy targets.
    Deploy(Only),
    /// Run the full pipeline: assemble, download, deploy, release, upload, announce.
    Release(Only),
    /// Notify announcers about the current release.
    Announce(Only),
}

#[derive(clap::Args, Debug, Default)]
struct Only {
    /// Run only the named providers of this command's category (repeatable).
    #[arg(long = "only", value_name = "NAME")]
    names: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

impl Commands {
    fn mode(&self) -> Mode {
        match self {
            Commands::Config => Mode::Config,
            Commands::Assemble(_) => Mode::Assemble,
            Commands::Download(_) => Mode::Download,
            Commands::Deploy(_) => Mode::Deploy,
            Commands::Release(_) => Mode::Full,
            Commands::Announce(_) => Mode::Announce,
        }
    }

    /// Category `--only` applies to, with the requested names.
    fn selection(&self) -> Option<(Category, &[String])> {
        let (category, only) = match self {
            Commands::Config => return None,
            Commands::Assemble(only) => (Category::Prepare, only),
            Commands::Download(only) => (Category::Download, only),
            Commands::Deploy(only) => (Category::Deploy, only),
            Commands::Release(only) => (Category::Release, only),
            Commands::Announce(only) => (Category::Announce, only),
        };
        (!only.names.is_empty()).then_some((category, only.names.as_slice()))
    }
}

struct CliReporter {
    debug: bool,
}

impl Reporter for CliReporter {
    fn debug(&mut self, msg: &str) {
        if self.debug {
            eprintln!("[debug] {msg}");
        }
    }

    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() {
    let cli = Cli::parse();
    let mut reporter = CliReporter { debug: cli.debug };

    let code = match run(&cli, &mut reporter) {
        Ok(report) => {
            if let Err(err) = print_report(&report, cli.format) {
                reporter.error(&format!("{err:#}"));
            }
            report.exit_code()
        }
        Err(err) => {
            reporter.error(&format!("{err:#}"));
            EXIT_ABORTED
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli, reporter: &mut CliReporter) -> Result<RunReport> {
    let base_dir = match &cli.basedir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    let (path, model) = config::load(&base_dir, cli.config_file.as_deref())?;
    reporter.debug(&format!("config: {}", path.display()));

    let mut options = RunOptions::new(&base_dir, cli.cmd.mode());
    options.dry_run = cli.dry_run;
    options.branch = cli.branch.clone();
    if let Some(git) = git::collect_git_context(&base_dir) {
        options.git = git;
    } else {
        reporter.debug("no git repository detected");
    }
    if let Some((category, names)) = cli.cmd.selection() {
        options.selection.insert(category, names.to_vec());
    }

    let mut ctx = Context::new(options, model);
    Ok(engine::run(&mut ctx, reporter))
}

fn print_report(report: &RunReport, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(report).context("failed to render report")?;
            println!("{json}");
        }
        Format::Text => print!("{}", render_text(report)),
    }
    Ok(())
}

fn render_text(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("mode: {}\n", report.mode));
    if report.dry_run {
        out.push_str("dry-run: true\n");
    }
    for finding in &report.findings {
        out.push_str(&format!("{finding}\n"));
    }
    if let Some(err) = &report.configuration_error {
        out.push_str(&format!("configuration error: {err}\n"));
    }
    for exec in &report.executed {
        let marker = if exec.simulated { " (simulated)" } else { "" };
        out.push_str(&format!("executed: {}.{}{marker}\n", exec.category, exec.name));
    }
    for failure in &report.failures {
        out.push_str(&format!(
            "failed: {}.{}: {}\n",
            failure.category, failure.name, failure.message
        ));
    }
    if let Some(release) = &report.release {
        out.push_str(&format!("release: {} {}\n", release.tag_name, release.url));
    }
    out.push_str(&format!("state: {}\n", report.state));
    out
}
