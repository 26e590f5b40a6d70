//! Activation policies and the capability traits sections compose.
//!
//! A section that can be switched on conditionally implements
//! [`Activatable`]: it carries an optional [`Activation`] policy plus a
//! cached resolution. Resolution runs once per validation pass; afterwards
//! [`Activatable::is_active`] is a plain read.

use std::fmt;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::ProjectState;

pub const DEFAULT_CONNECT_TIMEOUT: u32 = 20;
pub const DEFAULT_READ_TIMEOUT: u32 = 60;
pub const MAX_TIMEOUT: u32 = 300;

/// Activation policy of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Activation {
    Never,
    Always,
    /// Active when the project is not a snapshot.
    Release,
    /// Active when the project is a prerelease (and not a snapshot).
    Prerelease,
    /// Active when the project is a snapshot.
    Snapshot,
    /// Active when the current branch (or tag) fully matches the pattern.
    Pattern(String),
}

impl From<String> for Activation {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "never" => Activation::Never,
            "always" => Activation::Always,
            "release" => Activation::Release,
            "prerelease" => Activation::Prerelease,
            "snapshot" => Activation::Snapshot,
            _ => Activation::Pattern(value.trim().to_string()),
        }
    }
}

impl From<&str> for Activation {
    fn from(value: &str) -> Self {
        Activation::from(value.to_string())
    }
}

impl From<Activation> for String {
    fn from(value: Activation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Never => f.write_str("never"),
            Activation::Always => f.write_str("always"),
            Activation::Release => f.write_str("release"),
            Activation::Prerelease => f.write_str("prerelease"),
            Activation::Snapshot => f.write_str("snapshot"),
            Activation::Pattern(p) => f.write_str(p),
        }
    }
}

/// Compile a branch/tag pattern so that it must match the whole ref.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

/// Evaluate a policy against the project state.
///
/// An uncompilable pattern never matches; validators report it separately.
pub fn resolve_active(policy: &Activation, state: &ProjectState) -> bool {
    match policy {
        Activation::Never => false,
        Activation::Always => true,
        Activation::Release => !state.snapshot,
        Activation::Prerelease => !state.snapshot && state.prerelease,
        Activation::Snapshot => state.snapshot,
        Activation::Pattern(pattern) => {
            let Ok(re) = compile_pattern(pattern) else {
                return false;
            };
            [state.branch.as_deref(), state.tag.as_deref()]
                .into_iter()
                .flatten()
                .any(|r| re.is_match(r))
        }
    }
}

/// A section with a conditional activation policy and a cached resolution.
pub trait Activatable {
    fn activation(&self) -> Option<&Activation>;
    fn set_activation(&mut self, policy: Activation);
    fn cached_active(&self) -> Option<bool>;
    fn cache_active(&mut self, active: bool);

    /// Policy used when none is configured.
    fn default_activation(&self) -> Activation {
        Activation::Always
    }

    /// Resolve once and cache. Later calls return the cached value.
    fn resolve(&mut self, state: &ProjectState) -> bool {
        if let Some(active) = self.cached_active() {
            return active;
        }
        let policy = self
            .activation()
            .cloned()
            .unwrap_or_else(|| self.default_activation());
        let active = resolve_active(&policy, state);
        self.cache_active(active);
        active
    }

    /// Unresolved sections report inactive.
    fn is_active(&self) -> bool {
        self.cached_active().unwrap_or(false)
    }

    /// Turn a resolved section off after the fact (e.g. a container whose
    /// children all ended up inactive).
    fn deactivate(&mut self) {
        self.cache_active(false);
    }
}

/// A section switched on and off by a plain boolean (git releasers).
pub trait EnabledAware {
    fn enabled_flag(&self) -> Option<bool>;
    fn set_enabled(&mut self, enabled: bool);

    /// Present sections are enabled unless told otherwise.
    fn is_enabled(&self) -> bool {
        self.enabled_flag().unwrap_or(true)
    }
}

/// Resolved connect/read timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

/// A section that talks to the network and therefore carries timeouts (seconds).
pub trait TimeoutAware {
    fn connect_timeout(&self) -> Option<u32>;
    fn read_timeout(&self) -> Option<u32>;
    fn timeouts_mut(&mut self) -> (&mut Option<u32>, &mut Option<u32>);

    fn fill_timeouts(&mut self) {
        let (connect, read) = self.timeouts_mut();
        connect.get_or_insert(DEFAULT_CONNECT_TIMEOUT);
        read.get_or_insert(DEFAULT_READ_TIMEOUT);
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: Duration::from_secs(u64::from(
                self.connect_timeout().unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            )),
            read: Duration::from_secs(u64::from(
                self.read_timeout().unwrap_or(DEFAULT_READ_TIMEOUT),
            )),
        }
    }
}

/// Implements [`Activatable`] for a struct with `active: Option<Activation>`
/// and `resolved: Option<bool>` fields.
macro_rules! impl_activatable {
    ($ty:ty) => {
        $crate::activation::impl_activatable!($ty, $crate::activation::Activation::Always);
    };
    ($ty:ty, $default:expr) => {
        impl $crate::activation::Activatable for $ty {
            fn activation(&self) -> Option<&$crate::activation::Activation> {
                self.active.as_ref()
            }
            fn set_activation(&mut self, policy: $crate::activation::Activation) {
                self.active = Some(policy);
            }
            fn cached_active(&self) -> Option<bool> {
                self.resolved
            }
            fn cache_active(&mut self, active: bool) {
                self.resolved = Some(active);
            }
            fn default_activation(&self) -> $crate::activation::Activation {
                $default
            }
        }
    };
}

/// Implements [`TimeoutAware`] for a struct with `connect_timeout` and
/// `read_timeout` fields.
macro_rules! impl_timeout_aware {
    ($ty:ty) => {
        impl $crate::activation::TimeoutAware for $ty {
            fn connect_timeout(&self) -> Option<u32> {
                self.connect_timeout
            }
            fn read_timeout(&self) -> Option<u32> {
                self.read_timeout
            }
            fn timeouts_mut(&mut self) -> (&mut Option<u32>, &mut Option<u32>) {
                (&mut self.connect_timeout, &mut self.read_timeout)
            }
        }
    };
}

pub(crate) use impl_activatable;
pub(crate) use impl_timeout_aware;
