//! CRLF line scanner over the connection read buffer.
//!
//! The scanner resumes at `checked_index` and never looks at a byte twice, so a
//! request arriving in many small reads costs the same as one read. Lines are
//! reported as spans into the buffer; the buffer itself is left untouched.

use std::ops::Range;

use crate::codec::buffer::ReadBuffer;

/// Result of scanning for the next line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineStatus {
    /// A full line was found; the range excludes the `\r\n` terminator
    Complete(Range<usize>),
    /// The received data ends before a terminator
    Incomplete,
    /// A lone `\r` or `\n` at the given offset
    Malformed(usize),
}

#[derive(Debug, Default)]
pub struct LineScanner {
    line_start: usize,
}

impl LineScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset where the line currently being scanned starts.
    #[inline]
    pub fn line_start(&self) -> usize {
        self.line_start
    }

    pub fn reset(&mut self) {
        self.line_start = 0;
    }

    pub fn scan(&mut self, buf: &mut ReadBuffer) -> LineStatus {
        let data = buf.filled();
        let read_index = data.len();
        let mut index = buf.checked_index();

        // a `\r` that ended the previous read must be followed by `\n`
        if index > self.line_start && index < read_index && data[index - 1] == b'\r' && data[index] != b'\n' {
            return LineStatus::Malformed(index - 1);
        }

        while index < read_index {
            match data[index] {
                b'\r' => {
                    if index + 1 == read_index {
                        buf.set_checked_index(read_index);
                        return LineStatus::Incomplete;
                    }
                    if data[index + 1] == b'\n' {
                        return self.complete(buf, index, index + 2);
                    }
                    buf.set_checked_index(index);
                    return LineStatus::Malformed(index);
                }
                b'\n' => {
                    // only reachable when the `\r` arrived at the end of an earlier read
                    if index > self.line_start && data[index - 1] == b'\r' {
                        return self.complete(buf, index - 1, index + 1);
                    }
                    buf.set_checked_index(index);
                    return LineStatus::Malformed(index);
                }
                _ => index += 1,
            }
        }

        buf.set_checked_index(read_index);
        LineStatus::Incomplete
    }

    fn complete(&mut self, buf: &mut ReadBuffer, line_end: usize, next_line: usize) -> LineStatus {
        let line = self.line_start..line_end;
        buf.set_checked_index(next_line);
        self.line_start = next_line;
        LineStatus::Complete(line)
    }
}
