//! Trivial I/O collaborators: the item source and the result sink.

pub mod items;
pub mod results;

pub use items::{ensure_items_file, read_items};
pub use results::write_results;
