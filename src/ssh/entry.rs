// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! SSH config entry modeling.
//!
//! Turn the raw fields fetched for a vault item into one `Host` stanza of
//! the generated config, plus the public key file the stanza points at.
//! The stanza format targets OpenSSH's `ssh_config`, with `%d` standing in
//! for the user's home directory so the generated file stays portable
//! across machines.

use crate::ssh::op::RawField;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};
use tracing::warn;

/// Prefix of every 1Password secret reference.
const REFERENCE_SCHEME: &str = "op://";

/// One `Host` stanza of the generated config, plus its public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// Key name used for the public key file.
    pub name: String,

    /// Public key contents.
    pub public_key: String,

    /// Host the key connects to.
    pub url: String,

    /// Login user, when the entry pins one.
    pub user: Option<String>,

    /// Extra host aliases.
    pub aliases: Vec<String>,

    /// Raw `ssh_config` option lines to append verbatim.
    pub options: Vec<String>,
}

impl ConfigEntry {
    /// Build an entry from the two fields fetched for a vault item.
    ///
    /// Field 0 must hold the public key, field 1 the newline separated
    /// `key value` parameter block. The key name comes from the item title
    /// embedded in field 0's secret reference, falling back to the url
    /// when the reference cannot be parsed; spaces in the name become
    /// underscores so it can serve as a file name. Unknown parameters are
    /// ignored with a warning.
    ///
    /// # Errors
    ///
    /// - Return [`EntryError::MissingField`] if the item came back with
    ///   anything other than the expected two fields.
    /// - Return [`EntryError::MissingUrl`] if the parameter block lacks a
    ///   url, since without it there is nothing to connect to.
    pub fn from_fields(fields: &[RawField]) -> Result<Self> {
        let [key_field, params_field] = fields else {
            return Err(EntryError::MissingField {
                count: fields.len(),
            });
        };

        let title = key_field.reference.as_deref().and_then(reference_title);

        let mut url = None;
        let mut user = None;
        let mut aliases = Vec::new();
        let mut options = Vec::new();
        for line in params_field.value.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (param, value) = line.split_once(' ').unwrap_or((line, ""));
            match param {
                "url" => url = Some(value.to_string()),
                "user" => user = Some(value.to_string()),
                "aliases" => {
                    aliases = value.split(',').map(|alias| alias.trim().to_string()).collect();
                }
                "options" => {
                    options = value.split(',').map(|option| option.trim().to_string()).collect();
                }
                unknown => warn!("ignoring unknown key parameter {unknown:?}"),
            }
        }

        let Some(url) = url else {
            return Err(EntryError::MissingUrl {
                title: title.unwrap_or_else(|| "<untitled>".into()),
            });
        };

        let name = title.unwrap_or_else(|| url.clone()).replace(' ', "_");

        Ok(Self {
            name,
            public_key: key_field.value.clone(),
            url,
            user,
            aliases,
            options,
        })
    }

    /// Write the public key file for this entry into the SSH directory.
    ///
    /// # Errors
    ///
    /// - Return [`EntryError::WriteKey`] if the file cannot be written.
    pub fn write_public_key(&self, ssh_dir: &Path) -> Result<PathBuf> {
        let path = ssh_dir.join(format!("{}.pub", self.name));
        std::fs::write(&path, &self.public_key).map_err(|err| EntryError::WriteKey {
            source: err,
            path: path.clone(),
        })?;

        Ok(path)
    }
}

impl Display for ConfigEntry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "Host {}", self.url)?;
        for alias in &self.aliases {
            write!(fmt, " {alias}")?;
        }
        writeln!(fmt)?;

        writeln!(fmt, "\tHostName {}", self.url)?;
        writeln!(fmt, "\tIdentityFile \"%d/.ssh/{}.pub\"", self.name)?;
        writeln!(fmt, "\tIdentitiesOnly yes")?;

        if let Some(user) = &self.user {
            writeln!(fmt, "\tUser {user}")?;
        }

        for option in &self.options {
            writeln!(fmt, "\t{option}")?;
        }

        Ok(())
    }
}

/// Extract the item title from a secret reference.
///
/// References look like `op://<vault>/<title>/<field>`; the title is the
/// second path segment.
fn reference_title(reference: &str) -> Option<String> {
    let path = reference.strip_prefix(REFERENCE_SCHEME)?;
    let title = path.split('/').nth(1)?;

    (!title.is_empty()).then(|| title.to_string())
}

/// Config entry error types.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    /// Vault item came back without the expected two fields.
    #[error("expected public key and parameter fields, got {count} field(s)")]
    MissingField { count: usize },

    /// Parameter block lacks the required url.
    #[error("key {title:?} does not specify a url parameter")]
    MissingUrl { title: String },

    /// Public key file cannot be written.
    #[error("failed to write public key file at {:?}", path.display())]
    WriteKey {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = EntryError> = std::result::Result<T, E>;
