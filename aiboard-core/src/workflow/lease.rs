//! Liveness leases for service instances sharing one board store

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Exclusive file lock held for as long as a service instance lives
///
/// Executions record the lease id of the instance driving them. The lock is
/// released by the OS when the process dies, so another instance can tell an
/// interrupted execution from one that is still making progress.
pub struct InstanceLease {
    id: Uuid,
    path: PathBuf,
    file: Option<File>,
}

impl InstanceLease {
    /// Create and lock a fresh lease next to the store file
    pub fn acquire(store_path: &Path) -> Result<Self> {
        let dir = lease_dir(store_path);
        std::fs::create_dir_all(&dir).context("Failed to create lease directory")?;

        let id = Uuid::new_v4();
        let path = lease_path(store_path, id);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .context("Failed to create instance lease")?;
        file.try_lock_exclusive()
            .context("Failed to lock instance lease")?;

        tracing::debug!("Acquired instance lease {}", id);
        Ok(Self {
            id,
            path,
            file: Some(file),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Whether the instance holding lease `owner` is still alive
    ///
    /// A lease left behind by a dead instance is removed.
    pub fn is_held(store_path: &Path, owner: Uuid) -> bool {
        let path = lease_path(store_path, owner);
        let Ok(file) = OpenOptions::new().write(true).open(&path) else {
            return false;
        };
        if file.try_lock_exclusive().is_err() {
            return true;
        }

        let _ = file.unlock();
        drop(file);
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!("Failed to remove stale lease {}: {}", path.display(), e);
        }
        false
    }
}

impl Drop for InstanceLease {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

fn lease_dir(store_path: &Path) -> PathBuf {
    let mut name = store_path.file_name().unwrap_or_default().to_os_string();
    name.push(".leases");
    store_path.with_file_name(name)
}

fn lease_path(store_path: &Path, id: Uuid) -> PathBuf {
    lease_dir(store_path).join(format!("{}.lock", id))
}
