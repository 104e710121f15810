use std::cmp::{max, min};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use rlimit::{getrlimit, Resource, setrlimit};

use crate::chunk_iterator::{partition, write_partition, ChunkIterator};
use crate::config::Config;
use crate::line_record::LineRecord;
use crate::memory_sort::sort_records;
use crate::merge::{merge, remove_partitions};
use crate::partition_store::{FilePartitionStore, PartitionId, PartitionStore};
use crate::sort_command::sort_partitions;
use crate::source::{LineSink, LineSource};

/// File descriptors kept available on top of one per merged partition
const RESERVED_FILES: u64 = 256;

/// Result of [Sort::run]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The input was sorted, `lines` lines were written
    Sorted { lines: usize },
    /// The input was only checked
    Checked { sorted: bool },
}

/// Sort line oriented text, in memory or through sorted partitions merged on a heap.
///
/// Input whose size exceeds [Config::partition_threshold] is cut into partitions, every
/// partition is sorted by a pool of worker threads, and the sorted partitions are merged into
/// the sink. Smaller input is sorted in memory. Both paths produce identical output.
///
/// # Examples
/// ```
/// use line_file_sort::config::Config;
/// use line_file_sort::sort::Sort;
/// use line_file_sort::source::LineSource;
///
/// fn sort_sizes() -> Result<Vec<String>, anyhow::Error> {
///     let config = Config::default().with_human_size(true);
///     let source = LineSource::from_lines(vec!["1K".into(), "2M".into(), "512".into(), "3G".into()]);
///     let mut output: Vec<String> = Vec::new();
///     Sort::new(config)?.sort(source, &mut output)?;
///     Ok(output)
/// }
/// assert_eq!(sort_sizes().unwrap(), vec!["512", "1K", "2M", "3G"]);
/// ```
pub struct Sort {
    config: Config,
    store: Arc<dyn PartitionStore>,
}

impl Sort {
    /// Create a Sort keeping partitions as files in a private directory under [Config::tmp]
    pub fn new(config: Config) -> Result<Sort, anyhow::Error> {
        let store = FilePartitionStore::new(&config)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Create a Sort keeping partitions in `store`
    pub fn with_store(config: Config, store: Arc<dyn PartitionStore>) -> Sort {
        Sort {
            config,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn PartitionStore> {
        &self.store
    }

    /// Sort `source` into `sink`, or only check it when [Config::check_sorted_only] is set.
    pub fn run(&self, source: LineSource, sink: &mut dyn LineSink) -> Result<Outcome, anyhow::Error> {
        if self.config.check_sorted_only() {
            let sorted = self.check(source)?;
            Ok(Outcome::Checked { sorted })
        } else {
            let lines = self.sort(source, sink)?;
            Ok(Outcome::Sorted { lines })
        }
    }

    /// Sort `source` into `sink`, returning the number of lines written.
    ///
    /// On error the output written so far must be discarded.
    pub fn sort(&self, source: LineSource, sink: &mut dyn LineSink) -> Result<usize, anyhow::Error> {
        let size = source.size();
        let threshold = self.config.partition_threshold();
        let lines = self.filtered(source);
        match size {
            Some(size) if size <= threshold => {
                log::info!("Sorting {} bytes in memory", size);
                let lines = lines.collect::<Result<Vec<String>, anyhow::Error>>()?;
                self.sort_in_memory(lines, sink)
            }
            Some(size) => {
                log::info!("Sorting {} bytes in partitions of {} bytes", size, self.config.max_partition_bytes());
                let chunks = ChunkIterator::new(lines, self.config.max_partition_bytes());
                let partitions = partition(chunks, self.store.as_ref())?;
                self.sort_external(partitions, sink)
            }
            None => {
                // unknown size, the input is in memory if it fits into the first chunk
                let mut chunks = ChunkIterator::new(lines, self.config.max_partition_bytes());
                let first = match chunks.next() {
                    Some(first) => first?,
                    None => return self.sort_in_memory(Vec::new(), sink),
                };
                let second = match chunks.next() {
                    Some(second) => second?,
                    None => {
                        log::info!("Sorting input of unknown size in memory");
                        return self.sort_in_memory(first.into_lines(), sink);
                    }
                };
                log::info!("Sorting input of unknown size in partitions of {} bytes", self.config.max_partition_bytes());
                let mut partitions = vec![write_partition(first, self.store.as_ref())?];
                partitions.push(write_partition(second, self.store.as_ref())?);
                partitions.extend(partition(chunks, self.store.as_ref())?);
                self.sort_external(partitions, sink)
            }
        }
    }

    /// Check whether `source` is already sorted, without writing anything.
    ///
    /// The check stops at the first line out of order. With [Config::unique], adjacent lines
    /// with equal keys are out of order too.
    pub fn check(&self, source: LineSource) -> Result<bool, anyhow::Error> {
        let mut check = SortedCheck::new(&self.config);
        for line in self.filtered(source) {
            if !check.accept(line?) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check whether the concatenation of `partitions`, in the given order, is sorted.
    ///
    /// Partitions are read one after another and are not modified.
    pub fn check_partitions(&self, partitions: &[PartitionId]) -> Result<bool, anyhow::Error> {
        let mut check = SortedCheck::new(&self.config);
        for id in partitions {
            for line in self.store.open_for_read(*id)? {
                if !check.accept(line?) {
                    log::info!("Found disorder in {}", id);
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Cut `source` into unsorted partitions of about [Config::max_partition_bytes]
    pub fn partition(&self, source: LineSource) -> Result<Vec<PartitionId>, anyhow::Error> {
        let chunks = ChunkIterator::new(self.filtered(source), self.config.max_partition_bytes());
        partition(chunks, self.store.as_ref())
    }

    /// Sort every partition in place. Returns after all partitions are written back.
    pub fn sort_partitions(&self, partitions: &[PartitionId]) -> Result<(), anyhow::Error> {
        sort_partitions(partitions, &self.store, &self.config)
    }

    /// Merge partitions, each already sorted under this configuration, into `sink`.
    ///
    /// The partitions are removed afterwards, also when the merge fails.
    pub fn merge(&self, partitions: &[PartitionId], sink: &mut dyn LineSink) -> Result<usize, anyhow::Error> {
        if let Err(e) = Self::raise_open_files_limit(partitions.len()) {
            if let Err(cleanup_error) = remove_partitions(partitions, self.store.as_ref()) {
                log::warn!("Failed to remove partitions: {}", cleanup_error);
            }
            return Err(e);
        }
        let result = merge(partitions, self.store.as_ref(), &self.config, sink);
        merge_result(result, Self::restore_open_files_limit())
    }

    fn sort_external(&self, partitions: Vec<PartitionId>, sink: &mut dyn LineSink) -> Result<usize, anyhow::Error> {
        if let Err(e) = self.sort_partitions(&partitions) {
            if let Err(cleanup_error) = remove_partitions(&partitions, self.store.as_ref()) {
                log::warn!("Failed to remove partitions: {}", cleanup_error);
            }
            return Err(e);
        }
        self.merge(&partitions, sink)
    }

    fn sort_in_memory(&self, lines: Vec<String>, sink: &mut dyn LineSink) -> Result<usize, anyhow::Error> {
        let line_records = sort_records(lines, &self.config);
        for line_record in &line_records {
            sink.write_line(line_record.as_str())?;
        }
        sink.flush()?;
        log::info!("Finished in memory sort, {} lines", line_records.len());
        Ok(line_records.len())
    }

    fn filtered<'a>(&'a self, source: LineSource) -> impl Iterator<Item = Result<String, anyhow::Error>> + 'a {
        source.filter(move |line| match line {
            Ok(line) => !self.config.is_ignored(line),
            Err(_) => true,
        })
    }

    fn get_rlimits() -> Result<(u64, u64), anyhow::Error> {
        getrlimit(Resource::NOFILE).with_context(|| "getrlimit")
    }

    fn set_rlimits(soft: u64, hard: u64) -> Result<(), anyhow::Error> {
        setrlimit(Resource::NOFILE, soft, hard)
            .with_context(|| format!("set rlimit NOFILE, soft: {}, hard: {}", soft, hard))?;
        Ok(())
    }

    /// Raise the soft NOFILE limit so that every partition can stay open during the merge.
    ///
    /// The limit is process wide. It is restored to the value seen by the first of overlapping
    /// merges once the last of them finishes.
    fn raise_open_files_limit(partitions: usize) -> Result<(), anyhow::Error> {
        let mut limit = OPEN_FILES_LIMIT.lock().map_err(|_| anyhow!("Open files limit lock poisoned"))?;
        let current = Self::get_rlimits()?;
        if let Some(new_soft) = limit.required_soft(current, partitions as u64 + RESERVED_FILES) {
            log::info!("Set new rlimit NOFILE, soft: {}, hard: {}", new_soft, current.1);
            Self::set_rlimits(new_soft, current.1)?;
            limit.raised(current);
        }
        limit.enter();
        Ok(())
    }

    fn restore_open_files_limit() -> Result<(), anyhow::Error> {
        let mut limit = OPEN_FILES_LIMIT.lock().map_err(|_| anyhow!("Open files limit lock poisoned"))?;
        if let Some((soft, hard)) = limit.leave() {
            log::info!("Restore rlimit NOFILE, soft: {}, hard: {}", soft, hard);
            Self::set_rlimits(soft, hard)?;
        }
        Ok(())
    }
}

/// A merge failure takes precedence over a failure to restore the open files limit
fn merge_result(result: Result<usize, anyhow::Error>, restored: Result<(), anyhow::Error>) -> Result<usize, anyhow::Error> {
    match (result, restored) {
        (Ok(merged_len), Ok(())) => Ok(merged_len),
        (Ok(_), Err(restore_error)) => Err(restore_error),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_error)) => {
            log::warn!("Failed to restore open files limit: {}", restore_error);
            Err(e)
        }
    }
}

static OPEN_FILES_LIMIT: Mutex<OpenFilesLimit> = Mutex::new(OpenFilesLimit::new());

/// Bookkeeping of the NOFILE limit shared by all merges in the process
struct OpenFilesLimit {
    merges: usize,
    original: Option<(u64, u64)>,
}

impl OpenFilesLimit {
    const fn new() -> OpenFilesLimit {
        OpenFilesLimit {
            merges: 0,
            original: None,
        }
    }

    /// The soft limit to set, if `current` is too low for `required` open files
    fn required_soft(&self, current: (u64, u64), required: u64) -> Option<u64> {
        let (soft, hard) = current;
        if required <= soft {
            None
        } else {
            Some(min(max(required, soft), hard))
        }
    }

    /// Remember the limits in place before the first change
    fn raised(&mut self, previous: (u64, u64)) {
        self.original.get_or_insert(previous);
    }

    fn enter(&mut self) {
        self.merges += 1;
    }

    /// The limits to restore, once the last running merge is done
    fn leave(&mut self) -> Option<(u64, u64)> {
        self.merges = self.merges.saturating_sub(1);
        if self.merges == 0 {
            self.original.take()
        } else {
            None
        }
    }
}

/// Adjacent pair check over a stream of lines, keeping only the last line seen
struct SortedCheck<'a> {
    config: &'a Config,
    previous: Option<LineRecord>,
}

impl<'a> SortedCheck<'a> {
    fn new(config: &'a Config) -> SortedCheck<'a> {
        SortedCheck {
            config,
            previous: None,
        }
    }

    /// Accept the next line, returning false when it is out of order
    fn accept(&mut self, line: String) -> bool {
        let current = LineRecord::new(line, self.config);
        let in_order = match &self.previous {
            None => true,
            Some(previous) if self.config.unique() => previous < &current,
            Some(previous) => previous <= &current,
        };
        self.previous = Some(current);
        in_order
    }
}
