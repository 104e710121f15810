use std::cmp::Ordering;
use std::ops::Range;

use crate::config::Config;
use crate::field::key_range;
use crate::key::{compare_keys, Key};
use crate::order::Order;

/// A line together with its parsed sort key.
///
/// The key is derived once per line. Both the in-memory sort and the merge heap order lines
/// through the [Ord] implementation of this type.
#[derive(Debug)]
pub(crate) struct LineRecord {
    line: String,
    key_range: Range<usize>,
    key: Key,
    order: Order,
}

impl LineRecord {
    pub(crate) fn new(line: String, config: &Config) -> LineRecord {
        let key_range = record_key_range(&line, config);
        let key = Key::new(&line[key_range.clone()], config.field_type());
        LineRecord {
            line,
            key_range,
            key,
            order: config.order(),
        }
    }

    pub(crate) fn raw_key(&self) -> &str {
        &self.line[self.key_range.clone()]
    }

    pub(crate) fn line(self) -> String {
        self.line
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.line
    }
}

fn record_key_range(line: &str, config: &Config) -> Range<usize> {
    let range = key_range(line, config.column(), config.delimiter(), config.column_fallback());
    if config.ignore_trailing_blanks() {
        let trimmed = line[range.clone()].trim_end_matches([' ', '\t']);
        range.start..range.start + trimmed.len()
    } else {
        range
    }
}

/// Compare two lines under `config`.
///
/// The key of each line is extracted by column and delimiter, optionally stripped of trailing
/// blanks and parsed according to [Config::field_type]. Keys that fail to parse sort after keys
/// that parse, two failing keys compare as strings. Reverse order inverts the final result.
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use line_file_sort::config::Config;
/// use line_file_sort::line_record::compare;
///
/// let numeric = Config::default().with_numeric(true);
/// assert_eq!(compare("2", "10", &numeric), Ordering::Less);
/// assert_eq!(compare("2", "10", &Config::default()), Ordering::Greater);
/// ```
pub fn compare(a: &str, b: &str, config: &Config) -> Ordering {
    let field_type = config.field_type();
    let a_raw = &a[record_key_range(a, config)];
    let b_raw = &b[record_key_range(b, config)];
    let ordering = compare_keys(a_raw, &Key::new(a_raw, field_type), b_raw, &Key::new(b_raw, field_type));
    config.order().apply(ordering)
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = compare_keys(self.raw_key(), &self.key, other.raw_key(), &other.key);
        self.order.apply(ordering)
    }
}
