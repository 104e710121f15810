use crate::config::Config;
use crate::line_record::LineRecord;

/// Sort lines in memory under `config`.
///
/// The sort is stable, lines with equal keys keep their input order. With
/// [Config::unique] only the first line of every run of equal keys is kept.
///
/// # Examples
/// ```
/// use line_file_sort::config::Config;
/// use line_file_sort::memory_sort::sort_lines;
///
/// let lines = vec!["10".to_string(), "2".to_string(), "1".to_string(), "20".to_string()];
/// let sorted = sort_lines(lines, &Config::default().with_numeric(true));
/// assert_eq!(sorted, vec!["1", "2", "10", "20"]);
/// ```
pub fn sort_lines(lines: Vec<String>, config: &Config) -> Vec<String> {
    sort_records(lines, config)
        .into_iter()
        .map(|line_record| line_record.line())
        .collect()
}

pub(crate) fn sort_records(lines: Vec<String>, config: &Config) -> Vec<LineRecord> {
    let mut line_records: Vec<LineRecord> = lines
        .into_iter()
        .map(|line| LineRecord::new(line, config))
        .collect();
    line_records.sort();
    if config.unique() {
        // equality is key equality under the same ordering used by the sort
        line_records.dedup();
    }
    line_records
}
