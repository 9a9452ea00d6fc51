//! Low-level fsync operations for durability.
//!
//! Checkpoint writes must survive a crash or power loss. Syncing the file
//! alone is not enough on POSIX systems: a create or rename updates the
//! directory entry, and that entry only becomes durable when the directory
//! itself is synced.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Syncs a file's contents and metadata to disk (`fsync(2)`).
pub fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

/// Syncs a directory to disk, making its entries durable.
///
/// Without this, a freshly renamed checkpoint can revert to its old name
/// after a power loss even though its contents were synced.
pub fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn fsync_file_works() {
        let dir = tempdir().unwrap();
        let mut file = File::create(dir.path().join("state.json")).unwrap();
        file.write_all(b"{}").unwrap();
        fsync_file(&file).unwrap();
    }

    #[test]
    fn fsync_dir_works() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("state.json")).unwrap();
        fsync_dir(dir.path()).unwrap();
    }

    #[test]
    fn fsync_dir_fails_on_nonexistent() {
        assert!(fsync_dir(Path::new("/nonexistent/path/for/fsync")).is_err());
    }
}
