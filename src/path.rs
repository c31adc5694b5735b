// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine absolute path to dotkit's configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/dotkit/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotkit").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Check whether the current session runs inside WSL.
///
/// WSL kernels advertise themselves through `/proc/version`, which mentions
/// "microsoft" in its release string. Anything unreadable counts as not
/// being WSL.
pub fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|version| version.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

/// Find an executable on PATH.
///
/// Minimal `which` equivalent: checks each PATH entry for a regular file
/// with the given name. Does not check the executable bit.
pub fn find_in_path(name: impl AsRef<Path>) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name.as_ref());
        candidate.is_file().then_some(candidate)
    })
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test]
    fn find_in_path_scans_path_entries() {
        std::fs::write("mytool", "").unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_var("PATH", &cwd);

        assert_eq!(find_in_path("mytool"), Some(cwd.join("mytool")));
        assert_eq!(find_in_path("missing"), None);
    }
}
