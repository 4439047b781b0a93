//! Growing Log Files
//!
//! `FileLineSource` reads a text file that another process keeps appending
//! to. Each poll either yields one complete line, reports that a line has
//! started but not finished, or reports the current end of data. Bytes of an
//! unfinished line stay buffered and are completed by later polls.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::application::ports::{LinePoll, LineSource, SourceError};

/// Default delay between attempts to complete a partial line.
pub const DEFAULT_LINE_RETRY: Duration = Duration::from_millis(500);

/// File-backed line source.
#[derive(Debug)]
pub struct FileLineSource {
    path: PathBuf,
    reader: BufReader<File>,
    pending: Vec<u8>,
    retry_delay: Duration,
}

impl FileLineSource {
    /// Open a file and read it from its first byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_from_start(path: impl AsRef<Path>, retry_delay: Duration) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        tracing::debug!(path = %path.display(), "Opened log from start");
        Ok(Self::with_file(path, file, retry_delay))
    }

    /// Open a file positioned at its current end; only data appended later is read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or seeked.
    pub fn open_at_end(path: impl AsRef<Path>, retry_delay: Duration) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let offset = file.seek(SeekFrom::End(0))?;
        tracing::debug!(path = %path.display(), offset, "Opened log at end");
        Ok(Self::with_file(path, file, retry_delay))
    }

    fn with_file(path: PathBuf, file: File, retry_delay: Duration) -> Self {
        Self {
            path,
            reader: BufReader::new(file),
            pending: Vec::new(),
            retry_delay,
        }
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of an unterminated line read so far.
    #[must_use]
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }
}

impl LineSource for FileLineSource {
    fn poll_line(&mut self) -> Result<LinePoll, SourceError> {
        self.reader.read_until(b'\n', &mut self.pending)?;

        if self.pending.last() == Some(&b'\n') {
            self.pending.pop();
            if self.pending.last() == Some(&b'\r') {
                self.pending.pop();
            }
            let line = String::from_utf8(std::mem::take(&mut self.pending))?;
            return Ok(LinePoll::Line(line));
        }

        if self.pending.is_empty() {
            Ok(LinePoll::EndOfStream)
        } else {
            Ok(LinePoll::Partial)
        }
    }

    fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn append(file: &mut NamedTempFile, text: &str) {
        file.write_all(text.as_bytes()).unwrap();
        file.flush().unwrap();
    }

    #[test]
    fn reads_complete_lines_then_end_of_stream() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "first\nsecond\r\n");

        let mut source = FileLineSource::open_from_start(file.path(), DEFAULT_LINE_RETRY).unwrap();

        assert_eq!(source.poll_line().unwrap(), LinePoll::Line("first".into()));
        assert_eq!(source.poll_line().unwrap(), LinePoll::Line("second".into()));
        assert_eq!(source.poll_line().unwrap(), LinePoll::EndOfStream);
    }

    #[test]
    fn partial_line_is_completed_by_a_later_append() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "100,10.0,5");

        let mut source = FileLineSource::open_from_start(file.path(), DEFAULT_LINE_RETRY).unwrap();
        assert_eq!(source.poll_line().unwrap(), LinePoll::Partial);
        assert_eq!(source.pending_bytes(), 10);

        append(&mut file, ",3,8,1.0,1.0,0.5\n");
        assert_eq!(
            source.poll_line().unwrap(),
            LinePoll::Line("100,10.0,5,3,8,1.0,1.0,0.5".into())
        );
        assert_eq!(source.pending_bytes(), 0);
    }

    #[test]
    fn open_at_end_skips_existing_content() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "old\n");

        let mut source = FileLineSource::open_at_end(file.path(), DEFAULT_LINE_RETRY).unwrap();
        assert_eq!(source.poll_line().unwrap(), LinePoll::EndOfStream);

        append(&mut file, "new\n");
        assert_eq!(source.poll_line().unwrap(), LinePoll::Line("new".into()));
    }

    #[test]
    fn end_of_stream_is_not_sticky() {
        let mut file = NamedTempFile::new().unwrap();
        let mut source = FileLineSource::open_from_start(file.path(), DEFAULT_LINE_RETRY).unwrap();
        assert_eq!(source.poll_line().unwrap(), LinePoll::EndOfStream);

        append(&mut file, "later\n");
        assert_eq!(source.poll_line().unwrap(), LinePoll::Line("later".into()));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, b'\n']).unwrap();
        file.flush().unwrap();

        let mut source = FileLineSource::open_from_start(file.path(), DEFAULT_LINE_RETRY).unwrap();
        assert!(matches!(source.poll_line(), Err(SourceError::Encoding(_))));
    }

    #[test]
    fn next_line_waits_for_the_terminator() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "par");
        let path = file.path().to_path_buf();

        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            append(&mut file, "tial\n");
            file
        });

        let mut source = FileLineSource::open_from_start(&path, Duration::from_millis(5)).unwrap();
        let line = source.next_line(&CancellationToken::new()).unwrap();
        let _file = writer.join().unwrap();

        assert_eq!(line.as_deref(), Some("partial"));
    }

    #[test]
    fn next_line_gives_up_on_a_partial_line_once_closed() {
        let mut file = NamedTempFile::new().unwrap();
        append(&mut file, "never finished");

        let closed = CancellationToken::new();
        closed.cancel();

        let mut source =
            FileLineSource::open_from_start(file.path(), Duration::from_millis(5)).unwrap();
        assert!(matches!(source.next_line(&closed), Err(SourceError::Closed)));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileLineSource::open_from_start(dir.path().join("absent.log"), DEFAULT_LINE_RETRY);
        assert!(result.is_err());
    }
}
