use std::collections::BinaryHeap;
use std::thread;

use crate::config::Config;
use crate::line_record::LineRecord;
use crate::partition_cursor::{HeapEntry, PartitionCursor};
use crate::partition_store::{PartitionId, PartitionStore};
use crate::source::LineSink;

/// Merge sorted partitions into `sink`, returning the number of lines written.
///
/// Every partition must already be sorted under `config`. The heap holds at most one pending
/// line per open partition. With [Config::unique] a line whose key equals the key of the
/// previously written line is skipped. All partitions are removed afterwards, whether the merge
/// succeeded or not.
pub(crate) fn merge(partitions: &[PartitionId], store: &dyn PartitionStore, config: &Config, sink: &mut dyn LineSink) -> Result<usize, anyhow::Error> {
    log::info!("Merging {} sorted partitions, thread: {}", partitions.len(), thread::current().name().unwrap_or("unnamed"));
    let result = merge_partitions(partitions, store, config, sink);
    let cleanup = remove_partitions(partitions, store);
    match result {
        Ok(merged_len) => {
            cleanup?;
            log::info!("Finished merging sorted partitions, merged length: {} lines", merged_len);
            Ok(merged_len)
        }
        Err(e) => {
            if let Err(cleanup_error) = cleanup {
                log::warn!("Failed to remove partitions after merge failure: {}", cleanup_error);
            }
            Err(e)
        }
    }
}

fn merge_partitions(partitions: &[PartitionId], store: &dyn PartitionStore, config: &Config, sink: &mut dyn LineSink) -> Result<usize, anyhow::Error> {
    let mut cursors = Vec::with_capacity(partitions.len());
    let mut heap = BinaryHeap::with_capacity(partitions.len());
    for (index, id) in partitions.iter().enumerate() {
        let mut cursor = PartitionCursor::open(*id, store)?;
        if let Some(line_record) = cursor.next_record(config)? {
            heap.push(HeapEntry::new(line_record, index));
        }
        cursors.push(cursor);
    }

    let mut merged_len: usize = 0;
    let mut previous: Option<LineRecord> = None;
    while let Some(entry) = heap.pop() {
        let index = entry.cursor();
        let line_record = entry.line_record();
        if config.unique() {
            let duplicate = matches!(&previous, Some(previous) if *previous == line_record);
            if !duplicate {
                sink.write_line(line_record.as_str())?;
                merged_len += 1;
                previous = Some(line_record);
            }
        } else {
            sink.write_line(line_record.as_str())?;
            merged_len += 1;
        }

        match cursors[index].next_record(config)? {
            Some(next) => heap.push(HeapEntry::new(next, index)),
            None => log::debug!("Exhausted {}", cursors[index].id()),
        }
    }
    sink.flush()?;
    Ok(merged_len)
}

/// Try to remove every partition, returning the first failure.
pub(crate) fn remove_partitions(partitions: &[PartitionId], store: &dyn PartitionStore) -> Result<(), anyhow::Error> {
    let mut first_error = None;
    for id in partitions {
        if let Err(e) = store.remove(*id) {
            log::warn!("Failed to remove {}: {}", id, e);
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use crate::config::Config;
    use crate::merge::merge;
    use crate::partition_store::{MemoryPartitionStore, PartitionId, PartitionLines, PartitionStore};
    use crate::source::LineSink;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn partitions(store: &dyn PartitionStore, contents: &[&[&str]]) -> Result<Vec<PartitionId>, anyhow::Error> {
        let mut ids = Vec::new();
        for content in contents {
            let id = store.create()?;
            store.append(id, &lines(content))?;
            ids.push(id);
        }
        Ok(ids)
    }

    #[test]
    fn test_merge_two() -> Result<(), anyhow::Error> {
        let store = MemoryPartitionStore::new();
        let ids = partitions(&store, &[&["A", "C"], &["B", "D"]])?;
        let mut output: Vec<String> = Vec::new();
        let merged = merge(&ids, &store, &Config::default(), &mut output)?;
        assert_eq!(merged, 4);
        assert_eq!(output, lines(&["A", "B", "C", "D"]));
        assert!(store.is_empty());
        Ok(())
    }

    #[test]
    fn test_merge_empty_and_single() -> Result<(), anyhow::Error> {
        let store = MemoryPartitionStore::new();
        let ids = partitions(&store, &[&[], &["x", "y"], &[]])?;
        let mut output: Vec<String> = Vec::new();
        merge(&ids, &store, &Config::default(), &mut output)?;
        assert_eq!(output, lines(&["x", "y"]));

        let mut output: Vec<String> = Vec::new();
        assert_eq!(merge(&[], &store, &Config::default(), &mut output)?, 0);
        assert!(output.is_empty());
        Ok(())
    }

    #[test]
    fn test_merge_reverse() -> Result<(), anyhow::Error> {
        let store = MemoryPartitionStore::new();
        let ids = partitions(&store, &[&["20", "3"], &["x", "100", "5"]])?;
        let config = Config::default().with_numeric(true).with_reverse(true);
        let mut output: Vec<String> = Vec::new();
        merge(&ids, &store, &config, &mut output)?;
        assert_eq!(output, lines(&["x", "100", "20", "5", "3"]));
        Ok(())
    }

    #[test]
    fn test_merge_unique_across_partitions() -> Result<(), anyhow::Error> {
        let store = MemoryPartitionStore::new();
        let ids = partitions(&store, &[&["a 1", "c 1"], &["a 2", "b 2"], &["c 3"]])?;
        let config = Config::default().with_column(1).with_delimiter(" ").with_unique(true);
        let mut output: Vec<String> = Vec::new();
        merge(&ids, &store, &config, &mut output)?;
        assert_eq!(output, lines(&["a 1", "b 2", "c 1"]));
        Ok(())
    }

    #[test]
    fn test_merge_keeps_duplicates() -> Result<(), anyhow::Error> {
        let store = MemoryPartitionStore::new();
        let ids = partitions(&store, &[&["a", "b"], &["a", "b"]])?;
        let mut output: Vec<String> = Vec::new();
        merge(&ids, &store, &Config::default(), &mut output)?;
        assert_eq!(output, lines(&["a", "a", "b", "b"]));
        Ok(())
    }

    struct FailingStore {
        inner: MemoryPartitionStore,
    }

    impl PartitionStore for FailingStore {
        fn create(&self) -> Result<PartitionId, anyhow::Error> {
            self.inner.create()
        }

        fn append(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error> {
            self.inner.append(id, lines)
        }

        fn open_for_read(&self, id: PartitionId) -> Result<PartitionLines, anyhow::Error> {
            let lines = self.inner.open_for_read(id)?;
            Ok(Box::new(lines.take(1).chain(std::iter::once(Err(anyhow!("disk failure"))))))
        }

        fn overwrite(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error> {
            self.inner.overwrite(id, lines)
        }

        fn remove(&self, id: PartitionId) -> Result<(), anyhow::Error> {
            self.inner.remove(id)
        }
    }

    #[test]
    fn test_read_error_surfaces_and_cleans_up() -> Result<(), anyhow::Error> {
        let store = FailingStore { inner: MemoryPartitionStore::new() };
        let ids = partitions(&store, &[&["a", "b"], &["c", "d"]])?;
        let mut output: Vec<String> = Vec::new();
        let result = merge(&ids, &store, &Config::default(), &mut output);
        assert!(result.is_err());
        assert!(store.inner.is_empty());
        Ok(())
    }

    struct FailingSink;

    impl LineSink for FailingSink {
        fn write_line(&mut self, _line: &str) -> Result<(), anyhow::Error> {
            Err(anyhow!("sink closed"))
        }
    }

    #[test]
    fn test_sink_error_surfaces() -> Result<(), anyhow::Error> {
        let store = MemoryPartitionStore::new();
        let ids = partitions(&store, &[&["a"], &["b"]])?;
        let result = merge(&ids, &store, &Config::default(), &mut FailingSink);
        assert!(result.is_err());
        assert!(store.is_empty());
        Ok(())
    }
}
