// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Virtual environment prompt labeling.
//!
//! The shell prompt shows a short label whenever a Python virtual
//! environment is active. The environment advertises itself through the
//! `VIRTUAL_ENV` environment variable, which holds the absolute path of
//! the environment's root directory. That path is rarely worth showing
//! as-is:
//!
//! - Environment managers keep every environment in one farm directory
//!   named "virtualenvs", with entries named `<project>-<hash>`. Only the
//!   project half of the entry is worth showing.
//! - Ad-hoc environments tend to live inside their project under a stock
//!   name like ".venv" or "env". The stock name says nothing, while the
//!   project directory above it says everything.
//! - Anything else is assumed to be deliberately named, and shows as-is.
//!
//! These three derivations live in [`RULE_ORDER`] as an explicit ordered
//! rule table. Rules are tried top to bottom, and the first rule that
//! applies decides the label text. Paths that fit no recognizable shape
//! degrade to the last rule with the whole string as the base name, so
//! labeling never fails.
//!
//! The interpreter version segment also lives here. It is purely cosmetic
//! and plays no part in label derivation.

use crate::config::PromptSettings;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    process::Command,
};

/// Environment variable an activated virtual environment announces itself
/// through.
pub const ACTIVE_ENV_VAR: &str = "VIRTUAL_ENV";

/// Directory that managed environment farms are kept under.
const MANAGED_FARM_DIR: &str = "virtualenvs";

/// Interpreter names probed for the version segment, in order.
const PYTHON_BINS: [&str; 2] = ["python3", "python"];

/// What the status line renders for an active environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Glyph rendered in front of the text.
    pub icon: String,

    /// Environment name to display.
    pub text: String,
}

impl Display for Label {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} {}", self.icon, self.text)
    }
}

/// Name derivation rules in decreasing precedence.
///
/// Kept as data instead of nested branching so the precedence stays
/// visible, and each rule can be exercised on its own.
pub const RULE_ORDER: [NameRule; 3] = [
    NameRule::ManagedSuffix,
    NameRule::GenericBase,
    NameRule::Verbatim,
];

/// One way to derive a display name from an environment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// Environment lives in a managed farm: chop the trailing `-<hash>`.
    ManagedSuffix,

    /// Base name is a stock environment name: show the parent directory.
    GenericBase,

    /// Base name was chosen by a human: show it untouched.
    Verbatim,
}

impl NameRule {
    /// Check whether this rule decides the given `(dir, base)` split.
    pub fn applies(&self, dir: &str, base: &str, generic_names: &[String]) -> bool {
        match self {
            Self::ManagedSuffix => dir == MANAGED_FARM_DIR,
            Self::GenericBase => generic_names.iter().any(|name| name == base),
            Self::Verbatim => true,
        }
    }

    /// Derive the display name from the `(dir, base)` split.
    pub fn derive(&self, dir: &str, base: &str) -> String {
        match self {
            Self::ManagedSuffix => base
                .rsplit_once('-')
                .map(|(project, _hash)| project)
                .unwrap_or(base)
                .to_string(),
            Self::GenericBase => dir.to_string(),
            Self::Verbatim => base.to_string(),
        }
    }
}

/// Compute prompt labels for active virtual environments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeler {
    icon: String,
    generic_names: Vec<String>,
}

impl Labeler {
    /// Construct new labeler from prompt settings.
    pub fn new(settings: &PromptSettings) -> Self {
        Self {
            icon: settings.icon.clone(),
            generic_names: settings.generic_names.clone(),
        }
    }

    /// Compute the label for an active environment path.
    ///
    /// Returns [`None`] when no environment is active, i.e., the path is
    /// absent or empty. A path without any separators is treated as one
    /// unrecognized base name and shows verbatim.
    pub fn label(&self, active_env_path: Option<&str>) -> Option<Label> {
        let path = active_env_path.filter(|path| !path.is_empty())?;
        let (dir, base) = split_env_path(path);

        let rule = RULE_ORDER
            .iter()
            .find(|rule| rule.applies(dir, base, &self.generic_names))
            .unwrap_or(&NameRule::Verbatim);

        Some(Label {
            icon: self.icon.clone(),
            text: rule.derive(dir, base),
        })
    }
}

impl Default for Labeler {
    fn default() -> Self {
        Self::new(&PromptSettings::default())
    }
}

/// Read the active environment path from the process environment.
///
/// An unset variable and an empty one both mean "no environment active".
pub fn active_env() -> Option<String> {
    std::env::var(ACTIVE_ENV_VAR)
        .ok()
        .filter(|path| !path.is_empty())
}

/// Probe the resident Python interpreter for its version.
///
/// Purely cosmetic, so every failure collapses to [`None`]. The leading
/// "Python " of the interpreter's banner is dropped, leaving only the
/// version number.
pub fn python_version() -> Option<String> {
    PYTHON_BINS.iter().find_map(|bin| probe_version(bin))
}

fn probe_version(bin: &str) -> Option<String> {
    let output = Command::new(bin).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }

    let banner = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let version = banner.strip_prefix("Python ").unwrap_or(&banner).to_string();

    (!version.is_empty()).then_some(version)
}

/// Split an environment path into parent directory name and base name.
fn split_env_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((front, base)) => {
            let dir = front.rsplit_once('/').map(|(_, dir)| dir).unwrap_or(front);
            (dir, base)
        }
        None => ("", trimmed),
    }
}
