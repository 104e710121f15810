use crate::partition_store::{PartitionId, PartitionStore};

/// A run of consecutive input lines
#[derive(Debug)]
pub(crate) struct Chunk {
    lines: Vec<String>,
    bytes: u64,
}

impl Chunk {
    pub(crate) fn lines(&self) -> &Vec<String> {
        &self.lines
    }

    pub(crate) fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes
    }
}

/// Cuts a line sequence into chunks of at least `max_bytes`, counting one terminator byte per
/// line. The last chunk holds whatever is left and may be smaller.
pub(crate) struct ChunkIterator<I> {
    lines: I,
    max_bytes: u64,
    done: bool,
}

impl<I> ChunkIterator<I>
where
    I: Iterator<Item = Result<String, anyhow::Error>>,
{
    pub(crate) fn new(lines: I, max_bytes: u64) -> ChunkIterator<I> {
        ChunkIterator {
            lines,
            max_bytes,
            done: false,
        }
    }
}

impl<I> Iterator for ChunkIterator<I>
where
    I: Iterator<Item = Result<String, anyhow::Error>>,
{
    type Item = Result<Chunk, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut lines = Vec::new();
        let mut bytes = 0;
        while bytes < self.max_bytes || lines.is_empty() {
            match self.lines.next() {
                Some(Ok(line)) => {
                    bytes += line.len() as u64 + 1;
                    lines.push(line);
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if lines.is_empty() {
            None
        } else {
            Some(Ok(Chunk { lines, bytes }))
        }
    }
}

/// Write every chunk into a new partition of `store`, returning partition ids in creation order.
///
/// Any failure aborts partitioning. Partitions written before the failure are left in the store.
pub(crate) fn partition<I>(chunks: ChunkIterator<I>, store: &dyn PartitionStore) -> Result<Vec<PartitionId>, anyhow::Error>
where
    I: Iterator<Item = Result<String, anyhow::Error>>,
{
    let mut partitions = Vec::new();
    for chunk in chunks {
        partitions.push(write_partition(chunk?, store)?);
    }
    log::info!("Partitioned input into {} partitions", partitions.len());
    Ok(partitions)
}

pub(crate) fn write_partition(chunk: Chunk, store: &dyn PartitionStore) -> Result<PartitionId, anyhow::Error> {
    let id = store.create()?;
    store.append(id, chunk.lines())?;
    log::debug!("Wrote {}, lines: {}, bytes: {}", id, chunk.lines().len(), chunk.bytes());
    Ok(id)
}
