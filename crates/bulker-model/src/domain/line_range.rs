use std::{fmt, ops::Range, str::FromStr};

use crate::ModelError;

/// Half-open range `[start, end)` over the filtered (non-blank) input lines.
///
/// The textual form used as a task payload is `lines_<start>_<last>` where
/// `last` is inclusive, e.g. `[3, 6)` renders as `lines_3_5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    start: usize,
    end: usize,
}

impl LineRange {
    /// Builds `[start, end)`. An empty or inverted range collapses to `start..start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Range covering exactly one line.
    pub fn single(index: usize) -> Self {
        Self::new(index, index + 1)
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Exclusive end.
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Lines of `buffer` covered by this range, clamped to the buffer length.
    pub fn slice<'a, T>(&self, buffer: &'a [T]) -> &'a [T] {
        let end = self.end.min(buffer.len());
        let start = self.start.min(end);
        &buffer[start..end]
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty ranges never come out of the partitioner; render them as start_start.
        let last = self.end.saturating_sub(1).max(self.start);
        write!(f, "lines_{}_{}", self.start, last)
    }
}

impl FromStr for LineRange {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModelError::InvalidRange(s.to_string());

        let mut parts = s.split('_');
        if parts.next() != Some("lines") {
            return Err(invalid());
        }
        let start: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        let last: usize = parts.next().and_then(|p| p.parse().ok()).ok_or_else(invalid)?;
        if parts.next().is_some() || last < start {
            return Err(invalid());
        }
        Ok(Self::new(start, last + 1))
    }
}
