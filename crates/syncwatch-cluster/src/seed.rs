//! Dataset seeding
//!
//! Before launch, every node home receives the same large genesis: either
//! freshly generated accounts or a copy of an existing snapshot.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::info;

use crate::error::{BringupError, Result};
use crate::local::{run_to_completion, GENESIS_FILE};

/// Directory holding the chain database inside a node home
pub const DATA_DIR: &str = "data";

/// Where the seeded dataset comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// Generate `accounts` additional accounts in every home
    Generate { accounts: u64 },
    /// Copy genesis and chain data from a prepared snapshot
    Snapshot(PathBuf),
    /// Leave the homes as `init` produced them
    Skip,
}

impl DatasetSource {
    /// Copy `snapshot` if given, otherwise generate `accounts`
    pub fn from_snapshot_or_generate(snapshot: Option<PathBuf>, accounts: u64) -> Self {
        match snapshot {
            Some(path) => DatasetSource::Snapshot(path),
            None => DatasetSource::Generate { accounts },
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Generate { accounts } => write!(f, "{} generated accounts", accounts),
            DatasetSource::Snapshot(path) => write!(f, "snapshot {}", path.display()),
            DatasetSource::Skip => f.write_str("no dataset"),
        }
    }
}

/// Fills node homes with the scenario's dataset
#[async_trait]
pub trait DatasetSeeder: Send + Sync {
    /// Add `accounts` generated accounts to each home in `destinations`
    async fn populate(&self, accounts: u64, destinations: &[PathBuf]) -> Result<()>;

    /// Copy the snapshot at `source` into each home in `destinations`
    async fn copy_snapshot(&self, source: &Path, destinations: &[PathBuf]) -> Result<()>;

    /// Seed `destinations` from `source`
    async fn seed(&self, source: &DatasetSource, destinations: &[PathBuf]) -> Result<()> {
        info!(%source, homes = destinations.len(), "Seeding dataset");
        match source {
            DatasetSource::Generate { accounts } => self.populate(*accounts, destinations).await,
            DatasetSource::Snapshot(path) => self.copy_snapshot(path, destinations).await,
            DatasetSource::Skip => Ok(()),
        }
    }
}

/// Seeds homes with the `genesis-populate` tool and plain file copies
#[derive(Debug, Clone)]
pub struct GenesisPopulate {
    binary: PathBuf,
}

impl GenesisPopulate {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

#[async_trait]
impl DatasetSeeder for GenesisPopulate {
    async fn populate(&self, accounts: u64, destinations: &[PathBuf]) -> Result<()> {
        for home in destinations {
            let mut command = Command::new(&self.binary);
            command
                .arg("--home")
                .arg(home)
                .arg("--additional-accounts-num")
                .arg(accounts.to_string());
            run_to_completion(&mut command).await?;
            info!(home = %home.display(), accounts, "Populated genesis");
        }
        Ok(())
    }

    async fn copy_snapshot(&self, source: &Path, destinations: &[PathBuf]) -> Result<()> {
        let genesis = source.join(GENESIS_FILE);
        if !tokio::fs::try_exists(&genesis).await.unwrap_or(false) {
            return Err(BringupError::InvalidSnapshot(source.to_path_buf()));
        }
        let data = source.join(DATA_DIR);

        for home in destinations {
            tokio::fs::copy(&genesis, home.join(GENESIS_FILE))
                .await
                .map_err(|e| BringupError::io(home.join(GENESIS_FILE), e))?;

            let target = home.join(DATA_DIR);
            if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                tokio::fs::remove_dir_all(&target)
                    .await
                    .map_err(|e| BringupError::io(&target, e))?;
            }
            if tokio::fs::try_exists(&data).await.unwrap_or(false) {
                copy_dir_all(data.clone(), target).await?;
            }
            info!(home = %home.display(), snapshot = %source.display(), "Copied snapshot");
        }
        Ok(())
    }
}

/// Recursively copy `from` into a new directory `to`
async fn copy_dir_all(from: PathBuf, to: PathBuf) -> Result<()> {
    let target = to.clone();
    tokio::task::spawn_blocking(move || copy_dir_blocking(&from, &to))
        .await
        .map_err(|e| BringupError::io(target, std::io::Error::other(e)))?
}

fn copy_dir_blocking(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).map_err(|e| BringupError::io(to, e))?;
    let entries = std::fs::read_dir(from).map_err(|e| BringupError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| BringupError::io(from, e))?;
        let path = entry.path();
        let dest = to.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| BringupError::io(&path, e))?;
        if file_type.is_dir() {
            copy_dir_blocking(&path, &dest)?;
        } else {
            std::fs::copy(&path, &dest).map_err(|e| BringupError::io(&path, e))?;
        }
    }
    Ok(())
}
