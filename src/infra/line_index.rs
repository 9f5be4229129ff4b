//! Newline index for turning byte offsets into line/column positions.
//!
//! - Single pass over bytes to record '\n' positions.
//! - 1-based external line and column numbers (friendly for diagnostics).
//! - Binary search for byte→line mapping.
//! - An empty buffer has 0 lines; a non-empty one without '\n' has 1.

#[derive(Debug, Clone)]
pub struct NewlineIndex {
    /// Byte positions of every '\n' in the buffer.
    nl_positions: Vec<usize>,
    /// Total byte length of the buffer.
    len: usize,
}

impl NewlineIndex {
    /// Build an index recording positions of '\n'.
    pub fn build(bytes: &[u8]) -> Self {
        let nl_positions = memchr::memchr_iter(b'\n', bytes).collect();

        Self {
            nl_positions,
            len: bytes.len(),
        }
    }

    /// Total number of logical lines.
    pub fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.nl_positions.len() + 1
        }
    }

    /// Start byte (inclusive) of a 1-based line.
    pub fn start_byte_of_line(&self, line1: usize) -> Option<usize> {
        if line1 == 0 || line1 > self.line_count() {
            return None;
        }
        if line1 == 1 {
            return Some(0);
        }
        // One past the previous '\n'
        self.nl_positions
            .get(line1 - 2)
            .map(|&prev_nl| prev_nl + 1)
    }

    /// 1-based line covering `byte`; offsets at '\n' belong to the next line.
    pub fn line_of_byte(&self, byte: usize) -> usize {
        if self.len == 0 {
            return 1;
        }
        let idx = match self.nl_positions.binary_search(&byte) {
            Ok(pos) => pos + 1,
            Err(pos) => pos,
        };
        idx + 1
    }

    /// 1-based (line, column) of `byte`; the column counts bytes.
    pub fn line_col(&self, byte: usize) -> (usize, usize) {
        let byte = byte.min(self.len);
        let line = self.line_of_byte(byte);
        let start = self.start_byte_of_line(line).unwrap_or(0);
        (line, byte - start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines() {
        assert_eq!(NewlineIndex::build(b"").line_count(), 0);
        assert_eq!(NewlineIndex::build(b"a").line_count(), 1);
        assert_eq!(NewlineIndex::build(b"a\nb\n").line_count(), 3);
    }

    #[test]
    fn maps_bytes_to_positions() {
        let idx = NewlineIndex::build(b"var a;\nvar b = ;\n");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(4), (1, 5));
        // First byte after the newline
        assert_eq!(idx.line_col(7), (2, 1));
        assert_eq!(idx.line_col(15), (2, 9));
    }

    #[test]
    fn clamps_past_end() {
        let idx = NewlineIndex::build(b"ab");
        assert_eq!(idx.line_col(99), (1, 3));
    }
}
