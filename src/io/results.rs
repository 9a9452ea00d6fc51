//! The result sink: the final total order, one record per line.

use std::fs;
use std::io;
use std::path::Path;

use crate::types::ItemName;

/// Writes the final ranking, best first, one `name,` record per line.
///
/// Called exactly once, after the completion transition and before the
/// checkpoint is cleared. An existing file is overwritten.
pub fn write_results(path: &Path, ranking: &[ItemName]) -> io::Result<()> {
    let mut out = String::new();
    for item in ranking {
        out.push_str(item.as_str());
        out.push_str(",\n");
    }
    fs::write(path, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_one_record_per_item_best_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let ranking = vec![ItemName::new("Dog"), ItemName::new("Cat")];
        write_results(&path, &ranking).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Dog,\nCat,\n");
    }

    #[test]
    fn empty_ranking_writes_an_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");

        write_results(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn overwrites_stale_results() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "old contents that are much longer than the new\n").unwrap();

        write_results(&path, &[ItemName::new("Cat")]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Cat,\n");
    }
}
