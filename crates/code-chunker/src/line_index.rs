use crate::types::Span;
use std::ops::Range;

/// Byte offset ↔ line number lookups for one file
#[derive(Debug, Clone)]
pub(crate) struct LineIndex {
    /// Start offset of every line
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub(crate) fn new(content: &[u8]) -> Self {
        let mut starts = vec![0];
        for (idx, byte) in content.iter().enumerate() {
            if *byte == b'\n' && idx + 1 < content.len() {
                starts.push(idx + 1);
            }
        }
        Self {
            starts,
            len: content.len(),
        }
    }

    /// Number of lines (0 for empty content)
    pub(crate) fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.starts.len()
        }
    }

    /// 1-based line holding `offset`
    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset).max(1)
    }

    /// Span for `[start, end)`; the end line is the line of the last byte
    pub(crate) fn span(&self, start: usize, end: usize) -> Span {
        let end = end.min(self.len);
        let start = start.min(end);
        Span {
            start,
            end,
            start_line: self.line_of(start),
            end_line: self.line_of(end.saturating_sub(1).max(start)),
        }
    }

    /// Byte range of a 1-based line, including its terminator
    pub(crate) fn line_range(&self, line: usize) -> Range<usize> {
        let idx = line.saturating_sub(1);
        let start = self.starts.get(idx).copied().unwrap_or(self.len);
        let end = self.starts.get(idx + 1).copied().unwrap_or(self.len);
        start..end
    }

    /// Start offsets of the lines overlapping `[start, end)`
    pub(crate) fn line_starts_in(&self, start: usize, end: usize) -> impl Iterator<Item = usize> + '_ {
        let first = self.line_of(start) - 1;
        self.starts[first..]
            .iter()
            .copied()
            .take_while(move |&line_start| line_start < end)
            .map(move |line_start| line_start.max(start))
    }
}

/// Content length of a line without its `\n` / `\r\n` terminator
pub(crate) fn content_len(line: &[u8]) -> usize {
    let mut len = line.len();
    if len > 0 && line[len - 1] == b'\n' {
        len -= 1;
    }
    if len > 0 && line[len - 1] == b'\r' {
        len -= 1;
    }
    len
}
