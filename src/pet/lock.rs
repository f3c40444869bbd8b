//! Exclusive ownership of the state file by a running daemon.
//!
//! The daemon keeps its own [`StateStore`](super::StateStore) in memory and
//! saves it on every tick, so any other process writing the same file would
//! be overwritten. The daemon holds a pid lock next to the state file for its
//! whole lifetime; commands that change the pet check it first.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PetError, Result};

/// Pid lock held by the daemon. Released on drop.
#[derive(Debug)]
pub struct DaemonLock {
    path: PathBuf,
}

impl DaemonLock {
    /// Lock file guarding `state_path`: `<state_path>.lock`.
    pub fn path_for(state_path: &Path) -> PathBuf {
        let mut name = state_path.as_os_str().to_owned();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Take the lock for `state_path`. A lock left behind by a dead process
    /// is replaced; a live holder yields [`PetError::StateLocked`].
    pub fn acquire(state_path: &Path) -> Result<Self> {
        let path = Self::path_for(state_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PetError::Persistence(format!("create {}: {}", parent.display(), e))
            })?;
        }

        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    write!(file, "{}", std::process::id()).map_err(|e| {
                        PetError::Persistence(format!("write {}: {}", path.display(), e))
                    })?;
                    debug!(path = %path.display(), "Daemon lock acquired");
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(pid) = Self::holder(state_path)? {
                        return Err(PetError::StateLocked { pid });
                    }
                    warn!(path = %path.display(), "Removing stale daemon lock");
                    match std::fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => {
                            return Err(PetError::Persistence(format!(
                                "remove {}: {}",
                                path.display(),
                                e
                            )))
                        }
                    }
                }
                Err(e) => {
                    return Err(PetError::Persistence(format!(
                        "create {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Err(PetError::Persistence(format!(
            "could not take {}",
            path.display()
        )))
    }

    /// Pid of the live process holding the lock for `state_path`, if any.
    pub fn holder(state_path: &Path) -> Result<Option<u32>> {
        let path = Self::path_for(state_path);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PetError::Persistence(format!(
                    "read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(content
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|&pid| process_alive(pid)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to release daemon lock");
        }
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs the permission and existence checks only.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}
