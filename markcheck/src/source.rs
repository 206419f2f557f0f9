use std::ops::Range;

/// Maps byte offsets in a Markdown source to 1-based line numbers and back.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex {
            line_starts,
            len: source.len(),
        }
    }

    /// The 1-based number of the line containing `offset`.
    pub fn line_number(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(i) => i + 1,
            Err(i) => i,
        }
    }

    /// Byte range of a 1-based line, excluding its terminator.
    pub fn line_span(&self, source: &str, line_number: usize) -> Range<usize> {
        let Some(&start) = self.line_starts.get(line_number.saturating_sub(1)) else {
            return self.len..self.len;
        };
        let end = source[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.len);
        start..end
    }
}
