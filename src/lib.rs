//! This crate sorts line oriented text that may not fit in memory, similar to linux sort.
//!
//! Lines are ordered by a key: the complete line, or a single column selected by index and a
//! literal delimiter. Keys are compared as strings, integers, human readable sizes (`2K`,
//! `1.5M`, `3G`) or month abbreviations (`Jan` .. `Dec`). Keys that do not parse under the
//! selected interpretation sort after keys that do. The order can be reversed, lines with equal
//! keys can be reduced to the first one, and input can be checked for order without sorting it.
//!
//! Input larger than the configured partition threshold is cut into partitions kept outside of
//! memory. Partitions are sorted independently, using multiple CPU cores, and then merged on a
//! heap holding one pending line per partition. Small input is sorted in memory, with identical
//! results.
//!
//! # Examples
//! ```
//! use std::path::PathBuf;
//! use line_file_sort::config::Config;
//! use line_file_sort::sort::Sort;
//! use line_file_sort::source::{LineSource, WriteSink};
//!
//! // sort a TSV file numerically by its second column
//! fn sort_records(input: PathBuf, output: PathBuf, tmp: PathBuf) -> Result<(), anyhow::Error> {
//!     let config = Config::default()
//!         .with_column(2)
//!         .with_numeric(true)
//!         // set number of CPU cores used to sort partitions. The default is to use all
//!         // available cores.
//!         .with_tasks(2)
//!         // set the directory for intermediate results. The default is the system temp dir -
//!         // std::env::temp_dir(), however, for large files it is recommended to provide a
//!         // dedicated directory.
//!         .with_tmp_dir(tmp);
//!
//!     let mut sink = WriteSink::create(&output)?;
//!     Sort::new(config)?.sort(LineSource::from_path(&input)?, &mut sink)?;
//!     Ok(())
//! }
//! ```
//!

pub(crate) mod key;
pub(crate) mod chunk_iterator;
pub(crate) mod partition_cursor;
pub(crate) mod sort_command;
pub(crate) mod merge;

pub mod config;
pub mod order;
pub mod field;
pub mod field_type;
pub mod line_record;
pub mod memory_sort;
pub mod partition_store;
pub mod source;
pub mod sort;
