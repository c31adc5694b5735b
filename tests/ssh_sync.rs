// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotkit::{
    config::SshSettings,
    ssh::{
        self,
        op::{KeyRef, RawField, Result as OpResult, SecretVault},
        SshError,
    },
};

use indicatif::ProgressBar;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

/// In-memory vault fixture.
struct VaultFixture {
    keys: Vec<(KeyRef, Vec<RawField>)>,
}

impl VaultFixture {
    fn new() -> Self {
        Self { keys: Vec::new() }
    }

    fn with_key(mut self, title: &str, public_key: &str, params: &str) -> Self {
        let id = format!("id-{}", self.keys.len());
        let reference = format!("op://dotfiles/{title}/public key");
        self.keys.push((
            KeyRef {
                id,
                title: title.into(),
            },
            vec![
                RawField {
                    value: public_key.into(),
                    reference: Some(reference),
                },
                RawField {
                    value: params.into(),
                    reference: None,
                },
            ],
        ));

        self
    }
}

impl SecretVault for VaultFixture {
    async fn list_ssh_keys(&self) -> OpResult<Vec<KeyRef>> {
        Ok(self.keys.iter().map(|(key, _)| key.clone()).collect())
    }

    async fn fetch_fields(&self, id: &str) -> OpResult<Vec<RawField>> {
        Ok(self
            .keys
            .iter()
            .find(|(key, _)| key.id == id)
            .map(|(_, fields)| fields.clone())
            .unwrap_or_default())
    }
}

#[tokio::test]
async fn sync_generates_fresh_directory() -> anyhow::Result<()> {
    let scratch = tempdir()?;
    let ssh_dir = scratch.path().join(".ssh");
    let vault = VaultFixture::new()
        .with_key(
            "forge key",
            "ssh-ed25519 AAAAC3Nza forge",
            "url forge.example.com\nuser git\naliases forge,fg",
        )
        .with_key(
            "backup host",
            "ssh-ed25519 AAAAC3Nza backup",
            "url backup.example.com\noptions Port 2222,Compression yes",
        );

    let report = ssh::sync(
        &vault,
        &SshSettings::default(),
        &ssh_dir,
        false,
        ProgressBar::hidden(),
    )
    .await?;

    assert_eq!(
        report.entries,
        vec!["forge_key".to_string(), "backup_host".to_string()]
    );
    assert_eq!(report.backup, None);

    let config = std::fs::read_to_string(ssh_dir.join("config"))?;
    let expect = "# This file was generated by dotkit. Changes will be overwritten on the\n\
                  # next `dotkit sync-ssh` run.\n\
                  \n\
                  Host *\n\
                  \tIdentityAgent ~/.1password/agent.sock\n\
                  \n\
                  Host forge.example.com forge fg\n\
                  \tHostName forge.example.com\n\
                  \tIdentityFile \"%d/.ssh/forge_key.pub\"\n\
                  \tIdentitiesOnly yes\n\
                  \tUser git\n\
                  \n\
                  Host backup.example.com\n\
                  \tHostName backup.example.com\n\
                  \tIdentityFile \"%d/.ssh/backup_host.pub\"\n\
                  \tIdentitiesOnly yes\n\
                  \tPort 2222\n\
                  \tCompression yes\n";
    assert_eq!(config, expect);

    assert_eq!(
        std::fs::read_to_string(ssh_dir.join("forge_key.pub"))?,
        "ssh-ed25519 AAAAC3Nza forge"
    );
    assert_eq!(
        std::fs::read_to_string(ssh_dir.join("backup_host.pub"))?,
        "ssh-ed25519 AAAAC3Nza backup"
    );

    Ok(())
}

#[tokio::test]
async fn sync_archives_previous_directory() -> anyhow::Result<()> {
    let scratch = tempdir()?;
    let ssh_dir = scratch.path().join(".ssh");
    std::fs::create_dir(&ssh_dir)?;
    std::fs::write(ssh_dir.join("config"), "# old config\n")?;

    let vault = VaultFixture::new().with_key(
        "forge key",
        "ssh-ed25519 AAAAC3Nza forge",
        "url forge.example.com",
    );

    let report = ssh::sync(
        &vault,
        &SshSettings::default(),
        &ssh_dir,
        true,
        ProgressBar::hidden(),
    )
    .await?;

    let backup = report.backup.expect("previous directory should be archived");
    assert!(backup.is_file());
    let backup_name = backup.file_name().unwrap().to_string_lossy().into_owned();
    assert!(backup_name.starts_with(".ssh-"));
    assert!(backup_name.ends_with(".old.tar.gz"));

    // Old contents must be gone, and no agent block under WSL.
    let config = std::fs::read_to_string(ssh_dir.join("config"))?;
    assert!(!config.contains("old config"));
    assert!(!config.contains("IdentityAgent"));
    assert!(config.contains("Host forge.example.com\n"));

    Ok(())
}

#[tokio::test]
async fn sync_skips_marked_titles() -> anyhow::Result<()> {
    let scratch = tempdir()?;
    let ssh_dir = scratch.path().join(".ssh");
    let vault = VaultFixture::new()
        .with_key(
            "commit signing key",
            "ssh-ed25519 AAAAC3Nza signing",
            "url github.com",
        )
        .with_key(
            "forge key",
            "ssh-ed25519 AAAAC3Nza forge",
            "url forge.example.com",
        );

    let report = ssh::sync(
        &vault,
        &SshSettings::default(),
        &ssh_dir,
        false,
        ProgressBar::hidden(),
    )
    .await?;

    assert_eq!(report.entries, vec!["forge_key".to_string()]);

    let config = std::fs::read_to_string(ssh_dir.join("config"))?;
    assert!(!config.contains("github.com"));
    assert!(!ssh_dir.join("commit_signing_key.pub").exists());

    Ok(())
}

#[tokio::test]
async fn sync_requires_url_parameter() -> anyhow::Result<()> {
    let scratch = tempdir()?;
    let ssh_dir = scratch.path().join(".ssh");
    let vault = VaultFixture::new().with_key("broken key", "ssh-ed25519 AAAA", "user git");

    let result = ssh::sync(
        &vault,
        &SshSettings::default(),
        &ssh_dir,
        false,
        ProgressBar::hidden(),
    )
    .await;

    assert!(matches!(result, Err(SshError::Entry(_))));
    // Nothing may touch the file system until every entry has resolved.
    assert!(!ssh_dir.exists());

    Ok(())
}
