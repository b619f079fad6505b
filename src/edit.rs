use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// A line-addressable text buffer backed by a single snapshot string.
///
/// Lines keep their original terminators so that a buffer which is opened,
/// left untouched, and saved again round-trips byte for byte. All edits are
/// expressed as [`SpanEdit`]s against the current snapshot and applied as one
/// batch, after which the line index is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBuffer {
    path: PathBuf,
    text: String,
    lines: Vec<LineSpan>,
    /// xxh3 of the on-disk content at open time, `None` for in-memory buffers
    disk_hash: Option<u64>,
    dirty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineSpan {
    start: usize,
    end: usize,
    terminator_len: usize,
}

/// Borrowed view of one line of a [`TextBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Zero-based line index
    pub index: usize,
    /// Line content without its terminator
    pub text: &'a str,
    /// The terminator (`"\n"`, `"\r\n"`, or `""` for an unterminated last line)
    pub terminator: &'a str,
    /// Byte offset of the first character of the line
    pub start: usize,
}

impl<'a> Line<'a> {
    /// Line content with surrounding whitespace removed.
    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }

    /// Byte offset just past the line's content (before the terminator).
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    /// Byte offset just past the line's terminator.
    pub fn end_including_terminator(&self) -> usize {
        self.end() + self.terminator.len()
    }

    pub fn has_terminator(&self) -> bool {
        !self.terminator.is_empty()
    }
}

/// Replacement of the snapshot range `[start, end)` with `new_text`.
///
/// A zero-width span (`start == end`) is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanEdit {
    pub start: usize,
    pub end: usize,
    pub new_text: String,
}

impl SpanEdit {
    pub fn replace(start: usize, end: usize, new_text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            new_text: new_text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at, at, text)
    }

    pub fn delete(start: usize, end: usize) -> Self {
        Self::replace(start, end, String::new())
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Invalid byte range: [{start}, {end}) in buffer of length {len}")]
    InvalidByteRange { start: usize, end: usize, len: usize },

    #[error("Overlapping edits at byte {at} in {file}")]
    OverlappingEdits { file: PathBuf, at: usize },

    #[error("Edit would split a UTF-8 character at byte {at}")]
    NotCharBoundary { at: usize },

    #[error("{0} changed on disk since it was opened")]
    ModifiedOnDisk(PathBuf),

    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },
}

/// Result of saving a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "SaveResult should be checked to know whether the file was written"]
pub enum SaveResult {
    /// Buffer content was written to disk
    Written { file: PathBuf, bytes: usize },
    /// Buffer had no pending edits
    Unchanged { file: PathBuf },
}

impl TextBuffer {
    /// Build an in-memory buffer. `path` is only used for error reporting
    /// until [`TextBuffer::save`] is called.
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = index_lines(&text);
        Self {
            path: path.into(),
            text,
            lines,
            disk_hash: None,
            dirty: false,
        }
    }

    /// Open a buffer from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EditError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| EditError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let hash = xxh3_64(&bytes);
        let text = String::from_utf8(bytes).map_err(|source| EditError::Utf8 {
            path: path.to_path_buf(),
            source,
        })?;

        let mut buffer = Self::from_text(path, text);
        buffer.disk_hash = Some(hash);
        Ok(buffer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Line at `index`, if any.
    pub fn line(&self, index: usize) -> Option<Line<'_>> {
        self.lines.get(index).map(|span| self.view(index, span))
    }

    /// Iterate over the current snapshot's lines.
    pub fn lines(&self) -> impl Iterator<Item = Line<'_>> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(move |(index, span)| self.view(index, span))
    }

    /// Terminator to use for newly created lines: the first one found in the
    /// buffer, falling back to `"\n"`.
    pub fn line_ending(&self) -> &'static str {
        match self.lines().find(|line| line.has_terminator()) {
            Some(line) if line.terminator == "\r\n" => "\r\n",
            _ => "\n",
        }
    }

    fn view(&self, index: usize, span: &LineSpan) -> Line<'_> {
        Line {
            index,
            text: &self.text[span.start..span.end],
            terminator: &self.text[span.end..span.end + span.terminator_len],
            start: span.start,
        }
    }

    /// Apply edits computed against the current snapshot as a single batch.
    ///
    /// Edits are sorted by start offset descending and spliced bottom-to-top
    /// so earlier offsets stay valid. Insertions at the same offset keep the
    /// order in which they were supplied. Returns the number of edits applied.
    pub fn apply_batch(&mut self, edits: Vec<SpanEdit>) -> Result<usize, EditError> {
        if edits.is_empty() {
            return Ok(0);
        }

        for edit in &edits {
            self.check_span(edit)?;
        }

        let mut ordered: Vec<(usize, SpanEdit)> = edits.into_iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.start
                .cmp(&a.start)
                .then(b.end.cmp(&a.end))
                .then(ib.cmp(ia))
        });

        // Sorted descending: for non-overlapping regions the earlier edit's
        // end must not pass the later edit's start.
        for window in ordered.windows(2) {
            let (later, earlier) = (&window[0].1, &window[1].1);
            if earlier.end > later.start {
                return Err(EditError::OverlappingEdits {
                    file: self.path.clone(),
                    at: later.start,
                });
            }
        }

        let count = ordered.len();
        let mut text = std::mem::take(&mut self.text);
        for (_, edit) in ordered {
            text.replace_range(edit.start..edit.end, &edit.new_text);
        }

        self.lines = index_lines(&text);
        self.text = text;
        self.dirty = true;
        Ok(count)
    }

    fn check_span(&self, edit: &SpanEdit) -> Result<(), EditError> {
        if edit.start > edit.end || edit.end > self.text.len() {
            return Err(EditError::InvalidByteRange {
                start: edit.start,
                end: edit.end,
                len: self.text.len(),
            });
        }
        for at in [edit.start, edit.end] {
            if !self.text.is_char_boundary(at) {
                return Err(EditError::NotCharBoundary { at });
            }
        }
        Ok(())
    }

    /// Write pending edits back to the buffer's path atomically.
    ///
    /// If the buffer was opened from disk, the file must still hold the
    /// content it was opened with.
    pub fn save(&mut self) -> Result<SaveResult, EditError> {
        if !self.dirty {
            return Ok(SaveResult::Unchanged {
                file: self.path.clone(),
            });
        }

        if let Some(expected) = self.disk_hash {
            let current = fs::read(&self.path).map_err(|source| EditError::Io {
                path: self.path.clone(),
                source,
            })?;
            if xxh3_64(&current) != expected {
                return Err(EditError::ModifiedOnDisk(self.path.clone()));
            }
        }

        atomic_write(&self.path, self.text.as_bytes())?;

        // Bump mtime so IDE file watchers notice the rewrite
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.path, now).map_err(|source| EditError::Io {
            path: self.path.clone(),
            source,
        })?;

        self.disk_hash = Some(xxh3_64(self.text.as_bytes()));
        self.dirty = false;

        Ok(SaveResult::Written {
            file: self.path.clone(),
            bytes: self.text.len(),
        })
    }
}

fn index_lines(text: &str) -> Vec<LineSpan> {
    let mut lines = Vec::new();
    let mut start = 0;
    for chunk in text.split_inclusive('\n') {
        let terminator_len = if chunk.ends_with("\r\n") {
            2
        } else if chunk.ends_with('\n') {
            1
        } else {
            0
        };
        let end = start + chunk.len() - terminator_len;
        lines.push(LineSpan {
            start,
            end,
            terminator_len,
        });
        start += chunk.len();
    }
    lines
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the original file is left untouched.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let io_err = |source: std::io::Error| EditError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Tempfile in the same directory keeps the rename on one filesystem
    let parent = path.parent().ok_or_else(|| {
        io_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
