//! Byte ranges into a stream buffer.

use std::ops::Range;

/// A half-open byte range `start..end` into the raw stream buffer.
///
/// Spans let diagnostics point at the exact markup that produced them, even
/// though the buffer keeps growing after the diagnostic was raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    start: usize,
    end: usize,
}

impl Span {
    /// Create a span from a byte range. A reversed range is collapsed to `start..start`.
    pub fn new(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            end: range.end.max(range.start),
        }
    }

    /// Start byte offset.
    pub fn start(self) -> usize {
        self.start
    }

    /// End byte offset (exclusive).
    pub fn end(self) -> usize {
        self.end
    }

    /// Length of the span in bytes.
    pub fn len(self) -> usize {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// The range covered by this span.
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }

    /// Returns a span covering both `self` and `other`.
    pub fn union(self, other: Span) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self::new(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_accessors() {
        let span = Span::new(3..10);
        assert_eq!(span.start(), 3);
        assert_eq!(span.end(), 10);
        assert_eq!(span.len(), 7);
        assert!(!span.is_empty());
        assert_eq!(span.range(), 3..10);
    }

    #[test]
    fn test_reversed_range_collapses() {
        #[allow(clippy::reversed_empty_ranges)]
        let span = Span::new(10..3);
        assert!(span.is_empty());
        assert_eq!(span.start(), 10);
    }

    #[test]
    fn test_union() {
        let span = Span::new(5..8).union(Span::new(2..6));
        assert_eq!(span, Span::new(2..8));
    }
}
