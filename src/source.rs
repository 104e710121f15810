use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context};

/// A forward-only sequence of input lines with an optional size probe.
///
/// Line terminators ('\n' or "\r\n") are not part of the lines.
///
/// # Examples
/// ```
/// use line_file_sort::source::LineSource;
///
/// let source = LineSource::from_reader("b\na\n".as_bytes(), None);
/// assert_eq!(source.size(), None);
/// let lines: Vec<String> = source.collect::<Result<_, _>>().unwrap();
/// assert_eq!(lines, vec!["b", "a"]);
/// ```
pub struct LineSource {
    lines: Box<dyn Iterator<Item = Result<String, anyhow::Error>>>,
    size: Option<u64>,
}

impl LineSource {
    /// Read lines from a file. The size probe is the file length.
    pub fn from_path(path: &Path) -> Result<LineSource, anyhow::Error> {
        let metadata = path.metadata()
            .with_context(|| anyhow!("path: {}", path.display()))?;
        if metadata.is_dir() {
            return Err(anyhow!("path: {} is a directory", path.display()));
        }
        let file = File::open(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Ok(Self::from_reader(file, Some(metadata.len())))
    }

    /// Read lines from any reader, e.g. STDIN. Pass `None` when the size is not known.
    pub fn from_reader<R: Read + 'static>(reader: R, size: Option<u64>) -> LineSource {
        let lines = BufReader::new(reader)
            .lines()
            .map(|line| line.with_context(|| "Failed to read input line"));
        LineSource {
            lines: Box::new(lines),
            size,
        }
    }

    /// Lines already in memory. The size probe counts one terminator byte per line.
    pub fn from_lines(lines: Vec<String>) -> LineSource {
        let size = lines.iter().map(|line| line.len() as u64 + 1).sum();
        LineSource {
            lines: Box::new(lines.into_iter().map(Ok)),
            size: Some(size),
        }
    }

    /// Total input size in bytes, if known
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

impl Iterator for LineSource {
    type Item = Result<String, anyhow::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.next()
    }
}

/// Receives the ordered output one line at a time
pub trait LineSink {
    fn write_line(&mut self, line: &str) -> Result<(), anyhow::Error>;

    fn flush(&mut self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

impl LineSink for Vec<String> {
    fn write_line(&mut self, line: &str) -> Result<(), anyhow::Error> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Buffered sink writing newline terminated lines to a [Write]
pub struct WriteSink<W: Write> {
    writer: BufWriter<W>,
}

impl WriteSink<File> {
    /// Write the output to a new file, truncating an existing one
    pub fn create(path: &Path) -> Result<WriteSink<File>, anyhow::Error> {
        let file = File::create(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Ok(WriteSink::new(file))
    }
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> WriteSink<W> {
        WriteSink {
            writer: BufWriter::new(writer),
        }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, anyhow::Error> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush output: {}", e.error()))
    }
}

impl<W: Write> LineSink for WriteSink<W> {
    fn write_line(&mut self, line: &str) -> Result<(), anyhow::Error> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), anyhow::Error> {
        self.writer.flush()?;
        Ok(())
    }
}
