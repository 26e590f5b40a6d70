//! # Herald
//!
//! Configuration resolution, validation, and provider orchestration for
//! release automation.
//!
//! Herald takes a partially specified release configuration, fills in
//! defaults, decides which sections are active for the current project state,
//! collects every configuration problem in one pass, and then drives the
//! enabled integrations (checksums, downloads, deployers, a releaser,
//! uploaders, announcers) in a fixed order.
//!
//! ## Pipeline
//!
//! 1. [`config::load`] reads `herald.toml` into a [`model::Model`].
//! 2. [`engine::run`] validates the model for the run's [`types::Mode`]
//!    ([`validate::validate_model`]), aborting on any ERROR finding.
//! 3. [`registry::resolve`] picks the providers of each category the mode
//!    executes.
//! 4. The engine executes them category by category, honouring dry-run and
//!    each category's failure policy, and returns an [`engine::RunReport`].
//!
//! ## Example
//!
//! ```ignore
//! use herald::{config, context, engine, types};
//!
//! let (_, model) = config::load(base_dir, None)?;
//! let options = context::RunOptions::new(base_dir, types::Mode::Announce);
//! let mut ctx = context::Context::new(options, model);
//! let report = engine::run(&mut ctx, &mut reporter);
//! std::process::exit(report.exit_code());
//! ```

/// Activation policies and the section capability traits.
pub mod activation;

/// Secret indirections (`env:`, `file:`) and releaser token lookup.
pub mod auth;

/// `herald.toml` loading.
pub mod config;

/// Run options and the per-run context.
pub mod context;

/// Per-section default filling.
pub mod defaults;

/// The orchestrator and its reporters.
pub mod engine;

/// Typed registry and provider errors.
pub mod errors;

/// The error accumulator.
pub mod findings;

/// Git context capture and tagging.
pub mod git;

/// The configuration tree.
pub mod model;

/// Provider contracts and adapters.
pub mod providers;

/// Provider resolution per category.
pub mod registry;

/// `{{key}}` templates.
pub mod template;

/// Modes, categories and shared value types.
pub mod types;

/// Section validators.
pub mod validate;
