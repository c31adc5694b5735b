// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! 1Password CLI access.
//!
//! SSH keys are stored as SSHKEY items in a 1Password vault, and the only
//! sanctioned way in is the 1Password CLI (`op`), driven as a subprocess
//! with JSON output. Under WSL the Windows CLI (`op.exe`) must be used
//! instead, because only it can reach the agent and vault session living
//! on the Windows side.
//!
//! The [`SecretVault`] trait keeps the rest of the crate independent of
//! the CLI, so vault access can be faked in tests.

use crate::path::{find_in_path, is_wsl};

use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Field labels requested from every SSH key item, in order.
///
/// The CLI returns fields in the order requested, so callers can rely on
/// field 0 being the public key and field 1 being the parameter block.
const FIELD_LABELS: &str = "label=public key,label=dotkit params";

/// One vault item from the SSHKEY listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyRef {
    /// Vault-unique item identifier.
    pub id: String,

    /// Human-chosen item title.
    pub title: String,
}

/// One field pulled from a vault item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawField {
    /// Field contents.
    pub value: String,

    /// Secret reference of the form `op://<vault>/<title>/<field>`.
    #[serde(default)]
    pub reference: Option<String>,
}

/// Layer of indirection for secret store access.
#[allow(async_fn_in_trait)]
pub trait SecretVault {
    /// List every SSH key item in the vault.
    async fn list_ssh_keys(&self) -> Result<Vec<KeyRef>>;

    /// Fetch the public key and parameter fields of one item.
    async fn fetch_fields(&self, id: &str) -> Result<Vec<RawField>>;
}

/// Secret store access through the 1Password CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpCli {
    exe: PathBuf,
}

impl OpCli {
    /// Construct client around an explicit CLI executable.
    pub fn new(exe: impl Into<PathBuf>) -> Self {
        Self { exe: exe.into() }
    }

    /// Find the 1Password CLI on PATH.
    ///
    /// Looks for `op.exe` under WSL, and `op` everywhere else.
    ///
    /// # Errors
    ///
    /// - Return [`OpError::CliMissing`] if no suitable executable exists.
    pub fn discover() -> Result<Self> {
        let wsl = is_wsl();
        let name = if wsl { "op.exe" } else { "op" };
        find_in_path(name)
            .map(Self::new)
            .ok_or(OpError::CliMissing { wsl })
    }

    #[instrument(skip(self), level = "debug")]
    async fn call(&self, args: &[&str]) -> Result<String> {
        debug!("running {:?}", self.exe.display());
        let output = Command::new(&self.exe)
            .args(args)
            .output()
            .await
            .map_err(OpError::Spawn)?;

        if !output.status.success() {
            return Err(OpError::CliFailure {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SecretVault for OpCli {
    async fn list_ssh_keys(&self) -> Result<Vec<KeyRef>> {
        let listing = self
            .call(&["item", "list", "--categories", "SSHKEY", "--format", "json"])
            .await?;

        Ok(serde_json::from_str(&listing)?)
    }

    async fn fetch_fields(&self, id: &str) -> Result<Vec<RawField>> {
        let fields = self
            .call(&["item", "get", "--format", "json", "--fields", FIELD_LABELS, id])
            .await?;

        Ok(serde_json::from_str(&fields)?)
    }
}

/// 1Password CLI error types.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// CLI executable is nowhere on PATH.
    #[error("1Password CLI is not installed{}", wsl_hint(*wsl))]
    CliMissing { wsl: bool },

    /// CLI could not be spawned.
    #[error("failed to spawn 1Password CLI")]
    Spawn(#[source] std::io::Error),

    /// CLI ran and reported failure.
    #[error("1Password CLI failed ({status}):\n{stderr}")]
    CliFailure {
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// CLI output is not the JSON we expect.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn wsl_hint(wsl: bool) -> &'static str {
    if wsl {
        " (under WSL the Windows CLI is required, not the Linux one)"
    } else {
        ""
    }
}

/// Friendly result alias :3
pub type Result<T, E = OpError> = std::result::Result<T, E>;
