// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! SSH directory generation.
//!
//! The dotfiles keep no private key material on disk. SSH keys live in a
//! 1Password vault, and authentication goes through the 1Password SSH
//! agent. What the local machine does need is an `ssh_config` that maps
//! hosts to key names, plus the public half of each key. This module
//! regenerates the whole SSH directory from the vault in one shot.
//!
//! # Vault Contract
//!
//! Every SSHKEY item that should land in the generated config carries two
//! extra fields: a "public key" field, and a "dotkit params" field holding
//! newline separated `key value` parameters ("url" required; "user",
//! "aliases", "options" optional). Items whose title marks them for
//! skipping (signing keys by default) are left alone.
//!
//! # Regeneration
//!
//! Regeneration replaces the previous directory, but only after archiving
//! it next to itself as `<dir>-<timestamp>.old.tar.gz`. The generated
//! config starts with a header warning that manual edits will not survive
//! the next run, and, outside WSL, a `Host *` block pointing
//! `IdentityAgent` at the 1Password agent socket. WSL hosts reach the
//! agent through a global Windows pipe instead, so the block is omitted
//! there.
//!
//! # See Also
//!
//! 1. [1Password SSH agent](https://developer.1password.com/docs/ssh/agent/)

pub mod entry;
pub mod op;

use crate::{
    config::SshSettings,
    path::{find_in_path, home_dir, is_wsl},
    ssh::{
        entry::ConfigEntry,
        op::{KeyRef, SecretVault},
    },
};

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use futures::{stream, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use inquire::Text;
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Header stamped at the top of every generated config.
const CONFIG_HEADER: &str = "# This file was generated by dotkit. Changes will be overwritten on the\n\
                             # next `dotkit sync-ssh` run.\n";

/// Number of vault item fetches kept in flight at once.
const FETCH_LIMIT: usize = 4;

/// Outcome of one SSH directory regeneration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Key names written into the generated config, in vault order.
    pub entries: Vec<String>,

    /// Archive holding the previous directory, when one existed.
    pub backup: Option<PathBuf>,
}

/// Regenerate an SSH directory from vault contents.
///
/// Lists the vault's SSH key items, drops the ones marked for skipping,
/// fetches the rest concurrently, then replaces `ssh_dir` with a fresh
/// config and public key files. The previous directory is archived before
/// anything is removed, and nothing touches the file system until every
/// entry has resolved. Config stanzas keep the vault's listing order even
/// though fetches complete out of order.
///
/// `wsl` drops the identity agent block from the generated config, since
/// WSL hosts reach the agent through a global Windows pipe.
///
/// # Errors
///
/// - Return [`SshError::Op`] if the vault cannot be listed or fetched from.
/// - Return [`SshError::Entry`] if an item is missing its url parameter.
/// - Return [`SshError::Backup`] if the previous directory cannot be
///   archived.
/// - Return [`SshError::RemovePrevious`], [`SshError::CreateDir`], or
///   [`SshError::WriteConfig`] if the directory swap fails.
#[instrument(skip(vault, settings, bar), level = "debug")]
pub async fn sync<V: SecretVault>(
    vault: &V,
    settings: &SshSettings,
    ssh_dir: &Path,
    wsl: bool,
    bar: ProgressBar,
) -> Result<SyncReport> {
    let keys = vault.list_ssh_keys().await?;
    let wanted: Vec<KeyRef> = keys
        .into_iter()
        .filter(|key| {
            if should_skip(&key.title, &settings.skip_titles) {
                info!("skipping {:?}", key.title);
                return false;
            }
            true
        })
        .collect();

    bar.set_length(wanted.len() as u64);
    let entries: Vec<ConfigEntry> = stream::iter(&wanted)
        .map(|key| {
            let bar = bar.clone();
            async move {
                debug!("fetching fields of {:?}", key.title);
                let fields = vault.fetch_fields(&key.id).await?;
                let entry = ConfigEntry::from_fields(&fields)?;
                bar.inc(1);
                Ok::<ConfigEntry, SshError>(entry)
            }
        })
        .buffered(FETCH_LIMIT)
        .try_collect()
        .await?;
    bar.finish_and_clear();

    let backup = archive_previous(ssh_dir)?;
    mkdirp::mkdirp(ssh_dir).map_err(|err| SshError::CreateDir {
        source: err,
        path: ssh_dir.to_path_buf(),
    })?;

    let config_path = ssh_dir.join("config");
    std::fs::write(&config_path, render_config(&entries, settings, wsl)).map_err(|err| {
        SshError::WriteConfig {
            source: err,
            path: config_path,
        }
    })?;

    for entry in &entries {
        entry.write_public_key(ssh_dir)?;
        info!("generated key and config entry for {}", entry.name);
    }

    Ok(SyncReport {
        entries: entries.iter().map(|entry| entry.name.clone()).collect(),
        backup,
    })
}

/// Resolve the SSH directory to regenerate.
///
/// Plain hosts own `~/.ssh`. WSL sessions manage the Windows-side
/// directory instead, which requires the Windows username: taken from
/// PowerShell when available, asked for interactively otherwise.
///
/// # Errors
///
/// - Return [`SshError::NoWayHome`] if the home directory cannot be
///   determined.
/// - Return [`SshError::Prompt`] if the interactive username prompt fails.
pub fn resolve_ssh_dir() -> Result<PathBuf> {
    if !is_wsl() {
        return Ok(home_dir()?.join(".ssh"));
    }

    let user = match windows_username()? {
        Some(user) => user,
        None => Text::new("Windows username?")
            .with_help_message("needed to locate the Windows-side .ssh directory")
            .prompt()?,
    };

    Ok(PathBuf::from("/mnt/c/users").join(user).join(".ssh"))
}

/// Ask PowerShell for the Windows username.
fn windows_username() -> Result<Option<String>> {
    let Some(powershell) = find_in_path("powershell.exe") else {
        return Ok(None);
    };

    let output = std::process::Command::new(powershell)
        .arg("$env:UserName")
        .output()
        .map_err(SshError::Syscall)?;
    if !output.status.success() {
        warn!("powershell.exe could not report the Windows username");
        return Ok(None);
    }

    let user = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!user.is_empty()).then_some(user))
}

/// Check whether an item title marks its key as one to leave alone.
fn should_skip(title: &str, skip_titles: &[String]) -> bool {
    let title = title.to_lowercase();
    skip_titles
        .iter()
        .any(|skip| title.contains(&skip.to_lowercase()))
}

/// Render the full generated config.
fn render_config(entries: &[ConfigEntry], settings: &SshSettings, wsl: bool) -> String {
    let mut config = String::from(CONFIG_HEADER);

    if !wsl {
        config.push('\n');
        config.push_str(&format!(
            "Host *\n\tIdentityAgent {}\n",
            settings.identity_agent.display()
        ));
    }

    for entry in entries {
        config.push('\n');
        config.push_str(&entry.to_string());
    }

    config
}

/// Archive an existing SSH directory next to itself.
///
/// Produces `<dir>-<timestamp>.old.tar.gz`, and removes the directory only
/// once the archive has been fully written out.
#[instrument(level = "debug")]
fn archive_previous(ssh_dir: &Path) -> Result<Option<PathBuf>> {
    if !ssh_dir.exists() {
        return Ok(None);
    }

    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let archive_path = PathBuf::from(format!("{}-{stamp}.old.tar.gz", ssh_dir.display()));
    info!(
        "moving previous version of {:?} to {:?}",
        ssh_dir.display(),
        archive_path.display()
    );

    let write_archive = || -> std::io::Result<()> {
        let archive = File::create(&archive_path)?;
        let encoder = GzEncoder::new(archive, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        builder.append_dir_all(".", ssh_dir)?;
        builder.into_inner()?.finish()?;
        Ok(())
    };
    write_archive().map_err(|err| SshError::Backup {
        source: err,
        path: archive_path.clone(),
    })?;

    std::fs::remove_dir_all(ssh_dir).map_err(|err| SshError::RemovePrevious {
        source: err,
        path: ssh_dir.to_path_buf(),
    })?;

    Ok(Some(archive_path))
}

/// SSH directory generation error types.
#[derive(Debug, thiserror::Error)]
pub enum SshError {
    /// Vault access fails.
    #[error(transparent)]
    Op(#[from] crate::ssh::op::OpError),

    /// Vault item cannot be turned into a config entry.
    #[error(transparent)]
    Entry(#[from] crate::ssh::entry::EntryError),

    /// Home directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] crate::path::NoWayHome),

    /// Interactive prompt fails.
    #[error(transparent)]
    Prompt(#[from] inquire::InquireError),

    /// Previous directory cannot be archived.
    #[error("failed to archive previous SSH directory to {:?}", path.display())]
    Backup {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Previous directory cannot be removed after archiving.
    #[error("failed to remove previous SSH directory at {:?}", path.display())]
    RemovePrevious {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// SSH directory cannot be created.
    #[error("failed to create SSH directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Generated config cannot be written.
    #[error("failed to write SSH config at {:?}", path.display())]
    WriteConfig {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// External command fails.
    #[error(transparent)]
    Syscall(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SshError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn entry(name: &str, url: &str) -> ConfigEntry {
        ConfigEntry {
            name: name.into(),
            public_key: "ssh-ed25519 AAAA".into(),
            url: url.into(),
            user: None,
            aliases: Vec::new(),
            options: Vec::new(),
        }
    }

    #[test_case("commit signing key", true; "lowercase pattern in title")]
    #[test_case("Signing Key", true; "case insensitive match")]
    #[test_case("forge key", false; "unrelated title")]
    #[test]
    fn skip_title_matching(title: &str, expect: bool) {
        let skip_titles = vec!["signing".to_string()];
        pretty_assertions::assert_eq!(should_skip(title, &skip_titles), expect);
    }

    #[test]
    fn render_config_points_at_identity_agent() {
        let config = render_config(
            &[entry("forge_key", "forge.example.com")],
            &SshSettings::default(),
            false,
        );

        assert!(config.contains("Host *\n\tIdentityAgent ~/.1password/agent.sock\n"));
        assert!(config.contains("Host forge.example.com\n"));
    }

    #[test]
    fn render_config_omits_identity_agent_under_wsl() {
        let config = render_config(
            &[entry("forge_key", "forge.example.com")],
            &SshSettings::default(),
            true,
        );

        assert!(!config.contains("IdentityAgent"));
        assert!(config.contains("Host forge.example.com\n"));
    }
}
