use std::cmp::Ordering;

use crate::config::Config;
use crate::line_record::LineRecord;
use crate::partition_store::{PartitionId, PartitionLines, PartitionStore};

/// Read position over one sorted partition during the merge
pub(crate) struct PartitionCursor {
    id: PartitionId,
    lines: PartitionLines,
    exhausted: bool,
}

impl PartitionCursor {
    pub(crate) fn open(id: PartitionId, store: &dyn PartitionStore) -> Result<PartitionCursor, anyhow::Error> {
        Ok(
            PartitionCursor {
                id,
                lines: store.open_for_read(id)?,
                exhausted: false,
            }
        )
    }

    /// The next unconsumed line, or None once the partition is exhausted
    pub(crate) fn next_record(&mut self, config: &Config) -> Result<Option<LineRecord>, anyhow::Error> {
        if self.exhausted {
            return Ok(None);
        }
        match self.lines.next() {
            Some(line) => Ok(Some(LineRecord::new(line?, config))),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }

    pub(crate) fn id(&self) -> PartitionId {
        self.id
    }
}

/// Pending line of one cursor in the merge heap.
///
/// Comparison operators are flipped to work with BinaryHeap (Max Heap). Equal lines pop in
/// cursor order, so ties keep partition creation order.
pub(crate) struct HeapEntry {
    line_record: LineRecord,
    cursor: usize,
}

impl HeapEntry {
    pub(crate) fn new(line_record: LineRecord, cursor: usize) -> HeapEntry {
        HeapEntry {
            line_record,
            cursor,
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn line_record(self) -> LineRecord {
        self.line_record
    }
}

impl Eq for HeapEntry {}

impl PartialEq<Self> for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.line_record.cmp(&self.line_record)
            .then_with(|| other.cursor.cmp(&self.cursor))
    }
}
