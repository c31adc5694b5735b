// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of dotkit's configuration file to simplify the
//! process of serialization and deserialization. File I/O is left to the
//! caller to figure out.
//!
//! The configuration file itself is optional. Every field carries a
//! default, so a missing file, an empty file, and a file that only sets a
//! couple of fields are all valid.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Tool settings layout.
///
/// Dotkit reads one TOML file at `$XDG_CONFIG_HOME/dotkit/config.toml`,
/// split into a section per feature: prompt segment computation, and SSH
/// directory generation.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Prompt segment settings.
    #[serde(default)]
    pub prompt: PromptSettings,

    /// SSH directory generation settings.
    #[serde(default)]
    pub ssh: SshSettings,
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on identity agent field.
        settings.ssh.identity_agent = PathBuf::from(
            shellexpand::full(settings.ssh.identity_agent.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Prompt segment settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct PromptSettings {
    /// Glyph rendered in front of the environment name.
    #[serde(default = "default_icon")]
    pub icon: String,

    /// Environment directory names too generic to display on their own.
    #[serde(default = "default_generic_names")]
    pub generic_names: Vec<String>,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            icon: default_icon(),
            generic_names: default_generic_names(),
        }
    }
}

/// SSH directory generation settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct SshSettings {
    /// Socket the 1Password SSH agent listens on.
    #[serde(default = "default_identity_agent")]
    pub identity_agent: PathBuf,

    /// Vault item titles to leave out of the generated config.
    #[serde(default = "default_skip_titles")]
    pub skip_titles: Vec<String>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            identity_agent: default_identity_agent(),
            skip_titles: default_skip_titles(),
        }
    }
}

fn default_icon() -> String {
    "🐍".into()
}

fn default_generic_names() -> Vec<String> {
    vec![
        "virtualenv".into(),
        "venv".into(),
        ".venv".into(),
        "env".into(),
    ]
}

fn default_identity_agent() -> PathBuf {
    PathBuf::from("~/.1password/agent.sock")
}

fn default_skip_titles() -> Vec<String> {
    vec!["signing".into()]
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("AGENT_DIR", "/home/blah/.1password")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = r#"
            [prompt]
            icon = "PY"
            generic_names = ["virtualenv", "venv"]

            [ssh]
            identity_agent = "$AGENT_DIR/agent.sock"
            skip_titles = ["signing", "legacy"]
        "#
        .parse()?;

        let expect = Settings {
            prompt: PromptSettings {
                icon: "PY".into(),
                generic_names: vec!["virtualenv".into(), "venv".into()],
            },
            ssh: SshSettings {
                identity_agent: "/home/blah/.1password/agent.sock".into(),
                skip_titles: vec!["signing".into(), "legacy".into()],
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_empty_settings_falls_back_to_defaults() -> anyhow::Result<()> {
        let result: Settings = "".parse()?;

        assert_eq!(result.prompt, PromptSettings::default());
        assert_eq!(result.ssh.skip_titles, vec!["signing".to_string()]);

        Ok(())
    }

    #[test]
    fn serialize_settings() {
        let result = Settings {
            prompt: PromptSettings {
                icon: "🐍".into(),
                generic_names: vec!["virtualenv".into(), "venv".into()],
            },
            ssh: SshSettings {
                identity_agent: "/home/blah/.1password/agent.sock".into(),
                skip_titles: vec!["signing".into(), "legacy".into()],
            },
        }
        .to_string();

        let expect = indoc! {r#"
            [prompt]
            icon = "🐍"
            generic_names = [
                "virtualenv",
                "venv",
            ]

            [ssh]
            identity_agent = "/home/blah/.1password/agent.sock"
            skip_titles = [
                "signing",
                "legacy",
            ]
        "#};

        assert_eq!(result, expect);
    }
}
