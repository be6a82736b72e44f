//! Fenced code block detection.
//!
//! A line whose first non-blank characters are 3+ backticks or 3+ tildes opens
//! a fence. It is closed by a later line starting with the same character
//! repeated at least as many times. An unclosed fence runs to end of text.

use crate::span::Span;

/// Byte ranges of all fenced code blocks in a text, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBlockIndex {
    ranges: Vec<Span>,
}

/// `(fence char, run length)` if `line` opens or closes a fence.
fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }
    let run = trimmed.chars().take_while(|&c| c == first).count();
    (run >= 3).then_some((first, run))
}

impl CodeBlockIndex {
    /// Scan `text` once and record every fenced block, fences included.
    pub fn new(text: &str) -> Self {
        let mut ranges = Vec::new();
        // Currently open fence: (start offset, marker char, run length).
        let mut open: Option<(usize, char, usize)> = None;
        let mut line_start = 0;

        for line in text.split_inclusive('\n') {
            let line_end = line_start + line.len();
            let content = line.trim_end_matches(['\n', '\r']);
            match (open, fence_marker(content)) {
                (None, Some((ch, run))) => open = Some((line_start, ch, run)),
                (Some((start, ch, run)), Some((close_ch, close_run)))
                    if close_ch == ch && close_run >= run =>
                {
                    ranges.push(Span::new(start, line_start + content.len()));
                    open = None;
                }
                _ => {}
            }
            line_start = line_end;
        }

        if let Some((start, _, _)) = open {
            ranges.push(Span::new(start, text.len()));
        }

        Self { ranges }
    }

    pub fn ranges(&self) -> &[Span] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// True if byte offset `pos` lies inside a fenced block.
    pub fn contains(&self, pos: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= pos);
        self.ranges.get(idx).is_some_and(|r| r.contains(pos))
    }
}
