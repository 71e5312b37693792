//! Collaborators that feed the slave from the local machine.
pub mod sample_file;

pub use sample_file::{parse_sample_line, FileSampleSource};
