//! InstanceLock port - 単一起動ロック
//!
//! pool 自身はロックを管理しない。driver が submit 前に acquire し、
//! shutdown が返った後に release する。

use std::path::Path;

use crate::error::LockError;

/// Advisory single-instance lock keyed by a path.
pub trait InstanceLock {
    /// `Ok(false)` when the lock is already held.
    fn acquire(&self, path: &Path) -> Result<bool, LockError>;

    /// `Ok(false)` when there was nothing to release.
    fn release(&self, path: &Path) -> Result<bool, LockError>;
}
