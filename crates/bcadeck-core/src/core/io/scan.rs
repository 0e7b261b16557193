use std::io::{self, BufRead, Lines};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    Prefix,
    Contains,
}

/// A literal label that opens a block in a report.
///
/// Labels are lowercase and compared against the trimmed, lowercased line.
#[derive(Debug, Clone, Copy)]
pub struct Anchor<K> {
    pub label: &'static str,
    pub kind: K,
    pub matching: Match,
    /// The block also ends at the first blank line after its body starts.
    pub until_blank: bool,
}

impl<K> Anchor<K> {
    pub const fn prefix(label: &'static str, kind: K) -> Self {
        Self {
            label,
            kind,
            matching: Match::Prefix,
            until_blank: false,
        }
    }

    pub const fn contains(label: &'static str, kind: K) -> Self {
        Self {
            label,
            kind,
            matching: Match::Contains,
            until_blank: false,
        }
    }

    pub const fn until_blank(mut self) -> Self {
        self.until_blank = true;
        self
    }

    fn matches(&self, lowered: &str) -> bool {
        match self.matching {
            Match::Prefix => lowered.starts_with(self.label),
            Match::Contains => lowered.contains(self.label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// One-based line number in the source.
    pub number: usize,
    /// The line with surrounding whitespace removed.
    pub text: String,
}

/// The lines between one anchor and the next; the anchor line comes first.
#[derive(Debug, Clone)]
pub struct Block<K> {
    pub kind: K,
    pub lines: Vec<Line>,
}

impl<K> Block<K> {
    pub fn anchor(&self) -> &Line {
        &self.lines[0]
    }

    pub fn start_line(&self) -> usize {
        self.anchor().number
    }

    /// Lines following the anchor line.
    pub fn body(&self) -> &[Line] {
        &self.lines[1..]
    }
}

enum State<K> {
    Searching,
    InBlock { block: Block<K>, until_blank: bool },
}

/// Forward-only scanner that splits a report into anchored blocks.
///
/// Lines before the first anchor are skipped, blank lines are dropped, and a
/// block ends where the next anchor starts. Blocks of anchors marked
/// [`Anchor::until_blank`] also end at a blank line, and the lines up to the
/// next anchor are skipped. Only the current block is held in memory, so
/// reports of any length can be scanned.
pub struct BlockScanner<'a, R, K> {
    lines: Lines<R>,
    anchors: &'a [Anchor<K>],
    line_number: usize,
    state: State<K>,
}

impl<'a, R: BufRead, K: Copy> BlockScanner<'a, R, K> {
    /// Anchors are tried in order, so more specific labels must come first.
    pub fn new(reader: R, anchors: &'a [Anchor<K>]) -> Self {
        Self {
            lines: reader.lines(),
            anchors,
            line_number: 0,
            state: State::Searching,
        }
    }

    fn classify(&self, text: &str) -> Option<&'a Anchor<K>> {
        let lowered = text.to_lowercase();
        let anchors: &'a [Anchor<K>] = self.anchors;
        anchors.iter().find(|anchor| anchor.matches(&lowered))
    }
}

impl<R: BufRead, K: Copy> Iterator for BlockScanner<'_, R, K> {
    type Item = io::Result<Block<K>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next() {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    return match std::mem::replace(&mut self.state, State::Searching) {
                        State::InBlock { block, .. } => Some(Ok(block)),
                        State::Searching => None,
                    };
                }
            };
            self.line_number += 1;
            let text = raw.trim();
            if text.is_empty() {
                let closes = matches!(
                    &self.state,
                    State::InBlock { block, until_blank: true } if block.lines.len() > 1
                );
                if closes
                    && let State::InBlock { block, .. } =
                        std::mem::replace(&mut self.state, State::Searching)
                {
                    return Some(Ok(block));
                }
                continue;
            }
            let line = Line {
                number: self.line_number,
                text: text.to_string(),
            };
            if let Some(anchor) = self.classify(text) {
                let opened = State::InBlock {
                    block: Block {
                        kind: anchor.kind,
                        lines: vec![line],
                    },
                    until_blank: anchor.until_blank,
                };
                if let State::InBlock { block, .. } = std::mem::replace(&mut self.state, opened) {
                    return Some(Ok(block));
                }
            } else if let State::InBlock { block, .. } = &mut self.state {
                block.lines.push(line);
            }
        }
    }
}
