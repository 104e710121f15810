use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Context};
use tempfile::{Builder, TempDir};

use crate::config::Config;

/// Opaque handle of a partition, unique within its [PartitionStore]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(u64);

impl Display for PartitionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "partition-{}", self.0)
    }
}

/// Sequential reader over the lines of one partition
pub type PartitionLines = Box<dyn Iterator<Item = Result<String, anyhow::Error>>>;

/// Storage for partitions: append-only sequences of lines kept outside of the sort's memory.
///
/// A partition must be readable after it was written and closed. Implementations are shared
/// between the chunk sort workers, but a single partition is never written concurrently.
pub trait PartitionStore: Send + Sync {
    /// Create a new empty partition
    fn create(&self) -> Result<PartitionId, anyhow::Error>;

    /// Append lines to the end of a partition
    fn append(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error>;

    /// Open a partition for reading from its first line
    fn open_for_read(&self, id: PartitionId) -> Result<PartitionLines, anyhow::Error>;

    /// Replace the content of a partition
    fn overwrite(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error>;

    /// Remove a partition. The identifier is invalid afterwards
    fn remove(&self, id: PartitionId) -> Result<(), anyhow::Error>;
}

/// Partitions stored as plain text files, one line per record.
///
/// Every store owns a private directory under [Config::tmp], so concurrent sorts never share
/// partition files. The directory and whatever is left in it are removed when the store is
/// dropped.
pub struct FilePartitionStore {
    dir: TempDir,
    prefix: String,
    suffix: String,
    next_id: AtomicU64,
    paths: Mutex<HashMap<PartitionId, PathBuf>>,
}

impl FilePartitionStore {
    pub fn new(config: &Config) -> Result<FilePartitionStore, anyhow::Error> {
        let dir = Builder::new()
            .prefix("line-file-sort-")
            .tempdir_in(config.tmp())
            .with_context(|| format!("Failed to create partition directory in {}", config.tmp().display()))?;
        log::debug!("Partition directory: {}", dir.path().display());
        Ok(
            FilePartitionStore {
                dir,
                prefix: config.tmp_prefix().clone(),
                suffix: config.tmp_suffix().clone(),
                next_id: AtomicU64::new(0),
                paths: Mutex::new(HashMap::new()),
            }
        )
    }

    /// The directory holding the partition files
    pub fn dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// The file backing a partition
    pub fn path(&self, id: PartitionId) -> Result<PathBuf, anyhow::Error> {
        let paths = self.paths.lock().map_err(|_| anyhow!("Partition index lock poisoned"))?;
        paths.get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown {}", id))
    }

    fn write_lines(file: File, lines: &[String]) -> Result<(), std::io::Error> {
        let mut writer = BufWriter::new(file);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }
}

impl PartitionStore for FilePartitionStore {
    fn create(&self) -> Result<PartitionId, anyhow::Error> {
        let tmp_file = Builder::new()
            .prefix(&self.prefix)
            .suffix(&self.suffix)
            .tempfile_in(self.dir.path())
            .with_context(|| "Failed to create new temp file")?;
        let (_file, path) = tmp_file
            .keep()
            .with_context(|| "Failed to persist temp file")?;
        let id = PartitionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut paths = self.paths.lock().map_err(|_| anyhow!("Partition index lock poisoned"))?;
        paths.insert(id, path);
        Ok(id)
    }

    fn append(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error> {
        let path = self.path(id)?;
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .with_context(|| format!("path: {}", path.display()))?;
        Self::write_lines(file, lines).with_context(|| format!("path: {}", path.display()))
    }

    fn open_for_read(&self, id: PartitionId) -> Result<PartitionLines, anyhow::Error> {
        let path = self.path(id)?;
        let file = File::open(&path).with_context(|| format!("path: {}", path.display()))?;
        Ok(Box::new(PartitionReader::new(path, file)))
    }

    fn overwrite(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error> {
        let path = self.path(id)?;
        let file = File::create(&path).with_context(|| format!("path: {}", path.display()))?;
        Self::write_lines(file, lines).with_context(|| format!("path: {}", path.display()))
    }

    fn remove(&self, id: PartitionId) -> Result<(), anyhow::Error> {
        let path = {
            let mut paths = self.paths.lock().map_err(|_| anyhow!("Partition index lock poisoned"))?;
            paths.remove(&id).ok_or_else(|| anyhow!("Unknown {}", id))?
        };
        std::fs::remove_file(&path).with_context(|| format!("path: {}", path.display()))
    }
}

/// Reads back the lines of a partition file.
///
/// Only the '\n' written after every line is removed, so a line ending with '\r' keeps it.
struct PartitionReader {
    path: PathBuf,
    reader: BufReader<File>,
}

impl PartitionReader {
    fn new(path: PathBuf, file: File) -> PartitionReader {
        PartitionReader {
            path,
            reader: BufReader::new(file),
        }
    }
}

impl Iterator for PartitionReader {
    type Item = Result<String, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e).with_context(|| format!("path: {}", self.path.display()))),
        }
    }
}

/// Partitions kept in a map in memory. Useful for tests and for callers that only need the
/// merge machinery.
#[derive(Default)]
pub struct MemoryPartitionStore {
    next_id: AtomicU64,
    partitions: Mutex<HashMap<PartitionId, Vec<String>>>,
}

impl MemoryPartitionStore {
    pub fn new() -> MemoryPartitionStore {
        MemoryPartitionStore::default()
    }

    /// Number of live partitions
    pub fn len(&self) -> usize {
        self.partitions.lock().map(|partitions| partitions.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the lines of a partition
    pub fn lines(&self, id: PartitionId) -> Result<Vec<String>, anyhow::Error> {
        let partitions = self.partitions.lock().map_err(|_| anyhow!("Partition map lock poisoned"))?;
        partitions.get(&id)
            .cloned()
            .ok_or_else(|| anyhow!("Unknown {}", id))
    }

    fn with_partition<T>(&self, id: PartitionId, f: impl FnOnce(&mut Vec<String>) -> T) -> Result<T, anyhow::Error> {
        let mut partitions = self.partitions.lock().map_err(|_| anyhow!("Partition map lock poisoned"))?;
        let partition = partitions.get_mut(&id).ok_or_else(|| anyhow!("Unknown {}", id))?;
        Ok(f(partition))
    }
}

impl PartitionStore for MemoryPartitionStore {
    fn create(&self) -> Result<PartitionId, anyhow::Error> {
        let id = PartitionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut partitions = self.partitions.lock().map_err(|_| anyhow!("Partition map lock poisoned"))?;
        partitions.insert(id, Vec::new());
        Ok(id)
    }

    fn append(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error> {
        self.with_partition(id, |partition| partition.extend_from_slice(lines))
    }

    fn open_for_read(&self, id: PartitionId) -> Result<PartitionLines, anyhow::Error> {
        let lines = self.lines(id)?;
        Ok(Box::new(lines.into_iter().map(Ok)))
    }

    fn overwrite(&self, id: PartitionId, lines: &[String]) -> Result<(), anyhow::Error> {
        self.with_partition(id, |partition| *partition = lines.to_vec())
    }

    fn remove(&self, id: PartitionId) -> Result<(), anyhow::Error> {
        let mut partitions = self.partitions.lock().map_err(|_| anyhow!("Partition map lock poisoned"))?;
        partitions.remove(&id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Unknown {}", id))
    }
}
