use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::error::LockError;
use crate::ports::InstanceLock;

/// Lock file holding the owner's process id.
///
/// Advisory only: it protects against launching the same driver twice on the
/// same path, nothing is enforced by the OS. `create_new` makes the existence
/// check and the creation one step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidFileLock;

impl PidFileLock {
    pub fn new() -> Self {
        Self
    }
}

impl InstanceLock for PidFileLock {
    fn acquire(&self, path: &Path) -> Result<bool, LockError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(source) => {
                return Err(LockError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        file.write_all(std::process::id().to_string().as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(true)
    }

    fn release(&self, path: &Path) -> Result<bool, LockError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LockError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}
