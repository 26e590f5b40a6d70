//! The orchestrator.
//!
//! One call to [`run`] takes a context through
//! `Idle -> Validating -> (Aborted | Validated) -> Executing ->
//! (PartiallyFailed | Succeeded | Failed)`:
//!
//! 1. every validator that applies to the mode runs and appends findings;
//! 2. any ERROR aborts before a single provider is built;
//! 3. the registry resolves and builds the providers of every category the
//!    mode executes (a [`ConfigurationError`](crate::errors::ConfigurationError)
//!    also aborts);
//! 4. categories execute in [`Category`] order, each provider under the
//!    category's [`FailurePolicy`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::context::Context;
use crate::errors::BoxError;
use crate::findings::{Finding, Severity};
use crate::model::Model;
use crate::providers::{ExecutionContext, Provider};
use crate::registry;
use crate::types::{Category, FailurePolicy, Mode, ReleaseInfo};
use crate::validate;

pub trait Reporter {
    fn debug(&mut self, _msg: &str) {}
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Attributes every line to one provider invocation. The prefix exists only
/// as long as the wrapper does.
pub struct PrefixedReporter<'a> {
    prefix: String,
    inner: &'a mut dyn Reporter,
}

impl<'a> PrefixedReporter<'a> {
    pub fn new(prefix: impl Into<String>, inner: &'a mut dyn Reporter) -> Self {
        Self {
            prefix: prefix.into(),
            inner,
        }
    }
}

impl Reporter for PrefixedReporter<'_> {
    fn debug(&mut self, msg: &str) {
        self.inner.debug(&format!("[{}] {msg}", self.prefix));
    }
    fn info(&mut self, msg: &str) {
        self.inner.info(&format!("[{}] {msg}", self.prefix));
    }
    fn warn(&mut self, msg: &str) {
        self.inner.warn(&format!("[{}] {msg}", self.prefix));
    }
    fn error(&mut self, msg: &str) {
        self.inner.error(&format!("[{}] {msg}", self.prefix));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Holds the lines of one concurrently running provider until they can be
/// replayed in order.
#[derive(Debug, Default)]
pub struct BufferedReporter {
    lines: Vec<(Level, String)>,
}

impl BufferedReporter {
    pub fn replay(self, into: &mut dyn Reporter) {
        for (level, line) in self.lines {
            match level {
                Level::Debug => into.debug(&line),
                Level::Info => into.info(&line),
                Level::Warn => into.warn(&line),
                Level::Error => into.error(&line),
            }
        }
    }
}

impl Reporter for BufferedReporter {
    fn debug(&mut self, msg: &str) {
        self.lines.push((Level::Debug, msg.to_string()));
    }
    fn info(&mut self, msg: &str) {
        self.lines.push((Level::Info, msg.to_string()));
    }
    fn warn(&mut self, msg: &str) {
        self.lines.push((Level::Warn, msg.to_string()));
    }
    fn error(&mut self, msg: &str) {
        self.lines.push((Level::Error, msg.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Validating,
    Aborted,
    Validated,
    Executing,
    PartiallyFailed,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Aborted)
                | (Validating, Validated)
                // Registry errors abort before execution; config runs stop here.
                | (Validated, Aborted)
                | (Validated, Succeeded)
                | (Validated, Executing)
                | (Executing, PartiallyFailed)
                | (Executing, Succeeded)
                | (Executing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Aborted | RunState::PartiallyFailed | RunState::Succeeded | RunState::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Validating => "validating",
            RunState::Aborted => "aborted",
            RunState::Validated => "validated",
            RunState::Executing => "executing",
            RunState::PartiallyFailed => "partially failed",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderExecution {
    pub category: Category,
    pub name: String,
    /// Ran in dry-run mode; mutations were only logged.
    pub simulated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub category: Category,
    pub name: String,
    pub message: String,
    pub policy: FailurePolicy,
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    pub dry_run: bool,
    pub state: RunState,
    /// Every state entered, starting with `Idle`.
    pub transitions: Vec<RunState>,
    pub findings: Vec<Finding>,
    /// Set when the registry rejected the validated model.
    pub configuration_error: Option<String>,
    pub executed: Vec<ProviderExecution>,
    pub failures: Vec<ProviderFailure>,
    pub release: Option<ReleaseInfo>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    fn new(mode: Mode, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            mode,
            dry_run,
            state: RunState::Idle,
            transitions: vec![RunState::Idle],
            findings: Vec::new(),
            configuration_error: None,
            executed: Vec::new(),
            failures: Vec::new(),
            release: None,
            started_at: now,
            finished_at: now,
        }
    }

    fn advance(&mut self, next: RunState, reporter: &mut dyn Reporter) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {next}",
            self.state
        );
        reporter.debug(&format!("state: {} -> {next}", self.state));
        self.state = next;
        self.transitions.push(next);
        if next.is_terminal() {
            self.finished_at = Utc::now();
        }
    }

    /// Process exit code: 0 succeeded, 1 failed, 2 partially failed,
    /// 3 aborted.
    pub fn exit_code(&self) -> i32 {
        match self.state {
            RunState::Succeeded => 0,
            RunState::PartiallyFailed => 2,
            RunState::Aborted => 3,
            _ => 1,
        }
    }
}

/// What happens to the rest of the run when a provider of `category` fails.
pub fn failure_policy(category: Category, model: &Model) -> FailurePolicy {
    match category {
        Category::Prepare | Category::Release => FailurePolicy::Fatal,
        Category::Download => model.download.failure_policy(),
        Category::Deploy => model.deploy.failure_policy(),
        Category::Upload => model.upload.failure_policy(),
        Category::Announce => FailurePolicy::Isolated,
    }
}

type Plan = Vec<(Category, Vec<Provider>)>;

fn build_plan(ctx: &Context) -> Result<Plan, crate::errors::ConfigurationError> {
    let mut plan = Vec::new();
    for &category in ctx.mode().categories() {
        let builders =
            registry::resolve(category, &ctx.model, ctx.options.selected(category))?;
        let providers = builders
            .iter()
            .map(|b| b.build(&ctx.model))
            .collect::<Result<Vec<_>, _>>()?;
        plan.push((category, providers));
    }
    Ok(plan)
}

type Outcome = Result<Option<ReleaseInfo>, BoxError>;

fn invoke(provider: &Provider, cx: &ExecutionContext<'_>, reporter: &mut dyn Reporter) -> Outcome {
    let mut scoped = PrefixedReporter::new(
        format!("{}.{}", provider.category(), provider.name()),
        reporter,
    );
    provider.invoke(cx, &mut scoped)
}

/// Run every provider on its own thread; lines are buffered per provider and
/// returned alongside its outcome, in input order.
fn invoke_concurrently(
    providers: &[&Provider],
    cx: &ExecutionContext<'_>,
) -> Vec<(BufferedReporter, Outcome)> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = providers
            .iter()
            .map(|&provider| {
                scope.spawn(move || {
                    let mut buffer = BufferedReporter::default();
                    let outcome = invoke(provider, cx, &mut buffer);
                    (buffer, outcome)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    (BufferedReporter::default(), Err("provider panicked".into()))
                })
            })
            .collect()
    })
}

/// Records one outcome; returns true when the run must stop.
fn record(
    report: &mut RunReport,
    provider: &Provider,
    outcome: Outcome,
    policy: FailurePolicy,
    released: &mut Option<ReleaseInfo>,
    reporter: &mut dyn Reporter,
) -> bool {
    let category = provider.category();
    match outcome {
        Ok(info) => {
            report.executed.push(ProviderExecution {
                category,
                name: provider.name().to_string(),
                simulated: report.dry_run,
            });
            if info.is_some() {
                *released = info;
            }
            false
        }
        Err(err) => {
            let message = err.to_string();
            let line = format!("[{category}.{}] {message}", provider.name());
            match policy {
                FailurePolicy::Fatal => reporter.error(&line),
                FailurePolicy::Isolated => reporter.warn(&line),
            }
            report.failures.push(ProviderFailure {
                category,
                name: provider.name().to_string(),
                message,
                policy,
            });
            policy == FailurePolicy::Fatal
        }
    }
}

/// Validate the context's model and, unless aborted, execute the providers of
/// every category its mode covers.
pub fn run(ctx: &mut Context, reporter: &mut dyn Reporter) -> RunReport {
    let mut report = RunReport::new(ctx.mode(), ctx.dry_run());

    report.advance(RunState::Validating, reporter);
    validate::validate_model(ctx, reporter);
    for finding in ctx.findings.all_messages() {
        match finding.severity {
            Severity::Error => reporter.error(&finding.message),
            Severity::Warning => reporter.warn(&finding.message),
        }
    }
    report.findings = ctx.findings.all_messages().to_vec();
    if ctx.findings.has_errors() {
        let count = ctx.findings.errors().count();
        reporter.error(&format!("validation failed with {count} error(s)"));
        report.advance(RunState::Aborted, reporter);
        return report;
    }
    report.advance(RunState::Validated, reporter);

    if ctx.mode().categories().is_empty() {
        report.advance(RunState::Succeeded, reporter);
        return report;
    }

    let plan = match build_plan(ctx) {
        Ok(plan) => plan,
        Err(err) => {
            reporter.error(&err.to_string());
            report.configuration_error = Some(err.to_string());
            report.advance(RunState::Aborted, reporter);
            return report;
        }
    };

    report.advance(RunState::Executing, reporter);
    if ctx.dry_run() {
        reporter.info("dry run: mutating calls are logged, not performed");
    }

    let mut released: Option<ReleaseInfo> = None;
    let mut stopped = false;
    for (category, providers) in &plan {
        let category = *category;
        let policy = failure_policy(category, &ctx.model);
        let enabled: Vec<&Provider> = providers
            .iter()
            .filter(|p| {
                let enabled = p.is_enabled();
                if !enabled {
                    reporter.debug(&format!("{category}.{} is disabled; skipping", p.name()));
                }
                enabled
            })
            .collect();
        if enabled.is_empty() {
            reporter.debug(&format!("{category}: nothing to run"));
            continue;
        }
        reporter.info(&format!("{category}: {} provider(s)", enabled.len()));

        let mut published = None;
        {
            let cx = ExecutionContext {
                options: &ctx.options,
                model: &ctx.model,
                release: released.as_ref(),
                props: ctx.props(released.as_ref()),
            };
            let concurrent =
                category == Category::Announce && ctx.model.announce.parallel() && enabled.len() > 1;
            if concurrent {
                for (provider, (buffer, outcome)) in
                    enabled.iter().zip(invoke_concurrently(&enabled, &cx))
                {
                    buffer.replay(reporter);
                    stopped |=
                        record(&mut report, provider, outcome, policy, &mut published, reporter);
                }
            } else {
                for provider in &enabled {
                    let outcome = invoke(provider, &cx, reporter);
                    if record(&mut report, provider, outcome, policy, &mut published, reporter) {
                        stopped = true;
                        break;
                    }
                }
            }
        }
        if published.is_some() {
            released = published;
        }
        if stopped {
            reporter.error(&format!("{category} failed; skipping remaining categories"));
            break;
        }
    }

    report.release = released;
    let terminal = if stopped {
        RunState::Failed
    } else if report.failures.is_empty() {
        RunState::Succeeded
    } else {
        RunState::PartiallyFailed
    };
    report.advance(terminal, reporter);
    report
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::context::RunOptions;
    use crate::model::{AnnouncerConfig, GitService};
    use crate::providers::test_server;
    use crate::validate::test_support::CollectingReporter;

    fn model() -> Model {
        let mut model = Model::default();
        model.project.name = Some("demo".to_string());
        model.project.version = Some("1.0.0".to_string());
        model
    }

    fn webhook(url: &str) -> AnnouncerConfig {
        AnnouncerConfig {
            webhook: Some(url.to_string()),
            ..Default::default()
        }
    }

    fn github(api: &str) -> GitService {
        GitService {
            owner: Some("acme".to_string()),
            api_endpoint: Some(api.to_string()),
            token: Some("ghp_0123456789".to_string()),
            ..Default::default()
        }
    }

    fn names(report: &RunReport) -> Vec<String> {
        report
            .executed
            .iter()
            .map(|e| format!("{}.{}", e.category, e.name))
            .collect()
    }

    #[test]
    fn prefixed_reporter_attributes_lines() {
        let mut sink = CollectingReporter::default();
        {
            let mut scoped = PrefixedReporter::new("announce.slack", &mut sink);
            scoped.info("sent");
            scoped.warn("slow");
        }
        sink.info("after");
        assert_eq!(
            sink.lines,
            vec![
                "info: [announce.slack] sent".to_string(),
                "warn: [announce.slack] slow".to_string(),
                "info: after".to_string(),
            ]
        );
    }

    #[test]
    fn buffered_lines_replay_in_order_and_level() {
        let mut buffer = BufferedReporter::default();
        buffer.debug("one");
        buffer.error("two");
        let mut sink = CollectingReporter::default();
        buffer.replay(&mut sink);
        assert_eq!(sink.lines, vec!["debug: one".to_string(), "error: two".to_string()]);
    }

    #[test]
    fn transitions_follow_the_state_machine() {
        use RunState::*;
        assert!(Idle.can_transition_to(Validating));
        assert!(Validating.can_transition_to(Aborted));
        assert!(Executing.can_transition_to(PartiallyFailed));
        assert!(!Idle.can_transition_to(Executing));
        assert!(!Aborted.can_transition_to(Validated));
        assert!(!Validating.can_transition_to(Executing));
        assert!(!Succeeded.can_transition_to(Failed));
    }

    #[test]
    fn exit_codes_distinguish_outcomes() {
        let mut report = RunReport::new(Mode::Full, false);
        for (state, code) in [
            (RunState::Succeeded, 0),
            (RunState::Failed, 1),
            (RunState::PartiallyFailed, 2),
            (RunState::Aborted, 3),
        ] {
            report.state = state;
            assert_eq!(report.exit_code(), code);
        }
    }

    #[test]
    fn config_mode_validates_without_executing() {
        let mut ctx = Context::new(RunOptions::new("/work", Mode::Config), model());
        let report = run(&mut ctx, &mut CollectingReporter::default());
        assert_eq!(report.state, RunState::Succeeded);
        assert_eq!(
            report.transitions,
            vec![
                RunState::Idle,
                RunState::Validating,
                RunState::Validated,
                RunState::Succeeded
            ]
        );
        assert!(report.executed.is_empty());
    }

    #[test]
    fn second_of_three_announcers_failing_is_a_partial_failure() {
        let server = test_server::spawn(vec![
            (200, String::new()),
            (500, "down".to_string()),
            (200, String::new()),
        ]);
        let mut m = model();
        for name in ["first", "second", "third"] {
            m.announce
                .webhooks
                .insert(name.to_string(), webhook(&format!("{}/{name}", server.base_url)));
        }
        let mut ctx = Context::new(RunOptions::new("/work", Mode::Announce), m);
        let mut reporter = CollectingReporter::default();

        let report = run(&mut ctx, &mut reporter);
        let seen = server.join();

        assert_eq!(report.state, RunState::PartiallyFailed);
        assert_eq!(report.exit_code(), 2);
        assert_eq!(names(&report), vec!["announce.first", "announce.third"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].name, "second");
        assert!(report.failures[0].message.contains("500"));
        let paths: Vec<_> = seen.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/first", "/second", "/third"]);
        assert!(
            reporter
                .lines
                .iter()
                .any(|l| l.starts_with("warn: [announce.second] second failed to announce"))
        );
    }

    #[test]
    fn concurrent_announcers_keep_attribution_and_isolation() {
        let ok_a = test_server::spawn(vec![(200, String::new())]);
        let bad = test_server::spawn(vec![(503, String::new())]);
        let ok_c = test_server::spawn(vec![(200, String::new())]);
        let mut m = model();
        m.announce.parallel = Some(true);
        m.announce.webhooks.insert("a".to_string(), webhook(&ok_a.base_url));
        m.announce.webhooks.insert("b".to_string(), webhook(&bad.base_url));
        m.announce.webhooks.insert("c".to_string(), webhook(&ok_c.base_url));
        let mut ctx = Context::new(RunOptions::new("/work", Mode::Announce), m);
        let mut reporter = CollectingReporter::default();

        let report = run(&mut ctx, &mut reporter);
        ok_a.join();
        bad.join();
        ok_c.join();

        assert_eq!(report.state, RunState::PartiallyFailed);
        assert_eq!(names(&report), vec!["announce.a", "announce.c"]);
        let announced: Vec<_> = reporter
            .lines
            .iter()
            .filter(|l| l.contains("] announced to "))
            .cloned()
            .collect();
        assert_eq!(
            announced,
            vec![
                "info: [announce.a] announced to a".to_string(),
                "info: [announce.c] announced to c".to_string(),
            ]
        );
    }

    #[test]
    fn dry_run_release_and_announce_make_no_requests() {
        let td = tempdir().expect("tempdir");
        let server = test_server::spawn(Vec::new());
        let mut m = model();
        m.release.github = Some(github(&server.base_url));
        m.announce.slack = Some(webhook(&server.base_url));
        let mut options = RunOptions::new(td.path(), Mode::Full);
        options.dry_run = true;
        let mut ctx = Context::new(options, m);
        let mut reporter = CollectingReporter::default();

        let report = run(&mut ctx, &mut reporter);
        let seen = server.join();

        assert!(seen.is_empty());
        assert_eq!(report.state, RunState::Succeeded, "{:?}", reporter.lines);
        assert_eq!(
            names(&report),
            vec![
                "prepare.checksum",
                "release.github",
                "upload.release-assets",
                "announce.slack"
            ]
        );
        assert!(report.executed.iter().all(|e| e.simulated));
        assert_eq!(
            report.release.as_ref().map(|r| r.tag_name.as_str()),
            Some("v1.0.0")
        );
        let simulated: Vec<_> = reporter
            .lines
            .iter()
            .filter(|l| l.contains("[dry-run]"))
            .cloned()
            .collect();
        assert!(
            simulated
                .iter()
                .any(|l| l.starts_with("info: [release.github] [dry-run] POST")),
            "{simulated:?}"
        );
        assert!(
            simulated
                .iter()
                .any(|l| l.starts_with("info: [announce.slack] [dry-run] announce to slack: demo 1.0.0 has been released!")),
            "{simulated:?}"
        );
        assert!(!td.path().join("out").exists());
    }

    #[test]
    fn two_enabled_releasers_abort_before_any_execution() {
        let mut m = model();
        m.release.github = Some(github("http://127.0.0.1:9"));
        m.release.gitlab = Some(github("http://127.0.0.1:9"));
        m.announce.slack = Some(webhook("http://127.0.0.1:9"));
        let mut ctx = Context::new(RunOptions::new("/work", Mode::Full), m);
        let mut reporter = CollectingReporter::default();

        let report = run(&mut ctx, &mut reporter);

        assert_eq!(report.state, RunState::Aborted);
        assert_eq!(report.exit_code(), 3);
        assert_eq!(
            report.transitions,
            vec![RunState::Idle, RunState::Validating, RunState::Aborted]
        );
        assert!(report.executed.is_empty());
        assert!(
            report
                .findings
                .iter()
                .any(|f| f.message == "only one releaser may be enabled, found: github, gitlab")
        );
    }

    #[test]
    fn every_finding_is_reported_when_aborting() {
        let mut ctx = Context::new(RunOptions::new("/work", Mode::Config), Model::default());
        let mut reporter = CollectingReporter::default();
        let report = run(&mut ctx, &mut reporter);

        assert_eq!(report.state, RunState::Aborted);
        let errors: Vec<_> = reporter
            .lines
            .iter()
            .filter(|l| l.starts_with("error: "))
            .cloned()
            .collect();
        assert_eq!(
            errors,
            vec![
                "error: project.name must not be blank".to_string(),
                "error: project.version must not be blank".to_string(),
                "error: validation failed with 2 error(s)".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_selection_aborts_with_a_configuration_error() {
        let mut m = model();
        m.announce.slack = Some(webhook("http://127.0.0.1:9"));
        let mut options = RunOptions::new("/work", Mode::Announce);
        options
            .selection
            .insert(Category::Announce, vec!["irc".to_string()]);
        let mut ctx = Context::new(options, m);

        let report = run(&mut ctx, &mut CollectingReporter::default());

        assert_eq!(report.state, RunState::Aborted);
        assert_eq!(
            report.transitions,
            vec![
                RunState::Idle,
                RunState::Validating,
                RunState::Validated,
                RunState::Aborted
            ]
        );
        assert_eq!(
            report.configuration_error.as_deref(),
            Some("no active announce provider matches irc")
        );
        assert!(report.executed.is_empty());
    }

    #[test]
    fn failed_release_stops_the_run() {
        let td = tempdir().expect("tempdir");
        let server = test_server::spawn(vec![(500, "boom".to_string())]);
        let mut m = model();
        m.release.github = Some(github(&server.base_url));
        m.announce.slack = Some(webhook("http://127.0.0.1:9"));
        let mut ctx = Context::new(RunOptions::new(td.path(), Mode::Full), m);

        let report = run(&mut ctx, &mut CollectingReporter::default());
        server.join();

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(names(&report), vec!["prepare.checksum"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category, Category::Release);
        assert_eq!(report.failures[0].policy, FailurePolicy::Fatal);
    }

    #[test]
    fn isolated_deploy_failure_is_a_partial_failure() {
        let td = tempdir().expect("tempdir");
        let staging = td.path().join("staging");
        std::fs::create_dir_all(&staging).expect("mkdir");
        std::fs::write(staging.join("a.jar"), b"jar").expect("write");
        let server = test_server::spawn(vec![(500, String::new()), (201, String::new())]);

        let mut m = model();
        m.deploy.on_failure = Some(FailurePolicy::Isolated);
        let deployer = crate::model::MavenDeployer {
            url: Some(server.base_url.clone()),
            staging_repository: Some("staging".into()),
            ..Default::default()
        };
        m.deploy.artifactory = Some(deployer.clone());
        m.deploy.nexus2 = Some(deployer);
        let mut ctx = Context::new(RunOptions::new(td.path(), Mode::Deploy), m);

        let report = run(&mut ctx, &mut CollectingReporter::default());
        server.join();

        assert_eq!(report.state, RunState::PartiallyFailed);
        assert_eq!(names(&report), vec!["deploy.nexus2"]);
        assert_eq!(report.failures[0].name, "artifactory");
        assert_eq!(report.failures[0].policy, FailurePolicy::Isolated);
    }
}
