//! The item source: one item per non-blank line.

use std::fs;
use std::io;
use std::path::Path;

use crate::types::ItemName;

/// Reads the item list, dropping blank lines and keeping file order.
///
/// A missing file yields an empty list ("no session possible"), which the
/// caller surfaces to the user; it is not an error. Other IO failures are
/// propagated.
pub fn read_items(path: &Path) -> io::Result<Vec<ItemName>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    Ok(contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(ItemName::new)
        .collect())
}

/// Creates an empty item file if none exists, so the user has something to
/// fill in. Returns whether a file was created.
pub fn ensure_items_file(path: &Path) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    fs::File::create(path)?;
    Ok(true)
}
