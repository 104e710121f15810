use std::path::PathBuf;

use regex::Regex;

use crate::field_type::FieldType;
use crate::order::Order;

/// What the key extractor returns when the requested column does not exist in a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnFallback {
    /// Use the complete line as the key
    WholeLine,
    /// Use an empty key
    Empty,
}

/// Sort configuration.
///
/// A configuration is fully built before any line is processed and is only read during a run.
///
/// # Examples
/// ```
/// use line_file_sort::config::Config;
///
/// // sort by the second comma separated column, numerically, largest first
/// let config = Config::default()
///     .with_column(2)
///     .with_delimiter(",")
///     .with_numeric(true)
///     .with_reverse(true);
/// assert!(config.reverse());
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    column: usize,
    delimiter: String,
    numeric: bool,
    human_size: bool,
    month: bool,
    order: Order,
    unique: bool,
    ignore_trailing_blanks: bool,
    check_sorted_only: bool,
    column_fallback: ColumnFallback,
    ignore_empty: bool,
    ignore_lines: Option<Regex>,
    tmp: PathBuf,
    tmp_prefix: String,
    tmp_suffix: String,
    tasks: usize,
    queue_size: usize,
    max_partition_bytes: u64,
    threshold_factor: f64,
}

impl Default for Config {
    /// * the complete line is the key, fields are separated by TAB ('\t')
    /// * lexicographic ascending order, duplicates are kept
    /// * a missing column falls back to the complete line
    /// * partitions of 100 MiB, partitioning starts above 1.2 times that size
    /// * intermediate files go to std::env::temp_dir()
    /// * all CPU cores are used for sorting partitions
    fn default() -> Self {
        Config {
            column: 0,
            delimiter: "\t".to_string(),
            numeric: false,
            human_size: false,
            month: false,
            order: Order::Asc,
            unique: false,
            ignore_trailing_blanks: false,
            check_sorted_only: false,
            column_fallback: ColumnFallback::WholeLine,
            ignore_empty: false,
            ignore_lines: None,
            tmp: std::env::temp_dir(),
            tmp_prefix: "part-".to_string(),
            tmp_suffix: ".unmerged".to_string(),
            tasks: 0,
            queue_size: 4096,
            max_partition_bytes: 100 * 1024 * 1024,
            threshold_factor: 1.2,
        }
    }
}

impl Config {
    /// Select the key column, starting at 1. Column 0 uses the complete line.
    pub fn with_column(mut self, column: usize) -> Config {
        self.column = column;
        self
    }

    /// Set the literal column delimiter. The default is "\t"
    pub fn with_delimiter(mut self, delimiter: &str) -> Config {
        self.delimiter = delimiter.to_string();
        self
    }

    /// Compare keys as integers
    pub fn with_numeric(mut self, numeric: bool) -> Config {
        self.numeric = numeric;
        self
    }

    /// Compare keys as human readable sizes such as 2K or 1.5G
    pub fn with_human_size(mut self, human_size: bool) -> Config {
        self.human_size = human_size;
        self
    }

    /// Compare keys as month abbreviations
    pub fn with_month(mut self, month: bool) -> Config {
        self.month = month;
        self
    }

    /// Reverse the result of every comparison
    pub fn with_reverse(mut self, reverse: bool) -> Config {
        self.order = if reverse { Order::Desc } else { Order::Asc };
        self
    }

    /// Set [Order]
    pub fn with_order(mut self, order: Order) -> Config {
        self.order = order;
        self
    }

    /// Output only the first of the lines with equal keys
    pub fn with_unique(mut self, unique: bool) -> Config {
        self.unique = unique;
        self
    }

    /// Strip trailing blanks from keys before comparison
    pub fn with_ignore_trailing_blanks(mut self, ignore_trailing_blanks: bool) -> Config {
        self.ignore_trailing_blanks = ignore_trailing_blanks;
        self
    }

    /// Only check whether the input is sorted, see [Sort::run](crate::sort::Sort::run)
    pub fn with_check_sorted_only(mut self, check_sorted_only: bool) -> Config {
        self.check_sorted_only = check_sorted_only;
        self
    }

    /// Set the key used when the requested column is out of range. The default is
    /// [ColumnFallback::WholeLine]
    pub fn with_column_fallback(mut self, column_fallback: ColumnFallback) -> Config {
        self.column_fallback = column_fallback;
        self
    }

    /// Drop empty lines from the input
    pub fn with_ignore_empty(mut self, ignore_empty: bool) -> Config {
        self.ignore_empty = ignore_empty;
        self
    }

    /// Drop every input line matching the regex. Matching lines will not appear in the output.
    pub fn with_ignore_lines(mut self, r: Regex) -> Config {
        self.ignore_lines = Some(r);
        self
    }

    /// Set directory for intermediate files. By default use std::env::temp_dir()
    pub fn with_tmp_dir(mut self, tmp: PathBuf) -> Config {
        self.tmp = tmp;
        self
    }

    /// Set the number of tasks sorting partitions. Zero uses all system cores
    pub fn with_tasks(mut self, tasks: usize) -> Config {
        self.tasks = tasks;
        self
    }

    /// Partitions are cut once they accumulate `max_partition_bytes`, counting line terminators
    pub fn with_max_partition_bytes(mut self, max_partition_bytes: u64) -> Config {
        self.max_partition_bytes = max_partition_bytes;
        self
    }

    /// Input larger than `max_partition_bytes * threshold_factor` is sorted externally
    pub fn with_threshold_factor(mut self, threshold_factor: f64) -> Config {
        self.threshold_factor = threshold_factor;
        self
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn numeric(&self) -> bool {
        self.numeric
    }

    pub fn human_size(&self) -> bool {
        self.human_size
    }

    pub fn month(&self) -> bool {
        self.month
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn reverse(&self) -> bool {
        self.order == Order::Desc
    }

    pub fn unique(&self) -> bool {
        self.unique
    }

    pub fn ignore_trailing_blanks(&self) -> bool {
        self.ignore_trailing_blanks
    }

    pub fn check_sorted_only(&self) -> bool {
        self.check_sorted_only
    }

    pub fn column_fallback(&self) -> ColumnFallback {
        self.column_fallback
    }

    pub fn ignore_empty(&self) -> bool {
        self.ignore_empty
    }

    pub fn ignore_lines(&self) -> &Option<Regex> {
        &self.ignore_lines
    }

    pub fn tmp(&self) -> &PathBuf {
        &self.tmp
    }

    pub fn tmp_prefix(&self) -> &String {
        &self.tmp_prefix
    }

    pub fn tmp_suffix(&self) -> &String {
        &self.tmp_suffix
    }

    /// Number of sorting tasks, resolving zero to the number of cores
    pub fn tasks(&self) -> usize {
        if self.tasks == 0 {
            num_cpus::get()
        } else {
            self.tasks
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queue_size
    }

    pub fn max_partition_bytes(&self) -> u64 {
        self.max_partition_bytes
    }

    /// Input size above which the input is partitioned
    pub fn partition_threshold(&self) -> u64 {
        (self.max_partition_bytes as f64 * self.threshold_factor) as u64
    }

    /// The key interpretation in effect. Human size wins over month, month over numeric.
    pub fn field_type(&self) -> FieldType {
        if self.human_size {
            FieldType::HumanSize
        } else if self.month {
            FieldType::Month
        } else if self.numeric {
            FieldType::Integer
        } else {
            FieldType::String
        }
    }

    /// Whether a line is dropped by the ignore filters
    pub(crate) fn is_ignored(&self, line: &str) -> bool {
        if self.ignore_empty && line.trim().is_empty() {
            return true;
        }
        match &self.ignore_lines {
            Some(r) => r.is_match(line),
            None => false,
        }
    }
}
