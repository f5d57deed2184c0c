//! Delimited block extraction.
//!
//! A block is the text between a line holding only [`START_MARKER`] and a
//! later line holding only [`END_MARKER`]. Surrounding horizontal whitespace
//! on a marker line is tolerated; anything else on the line disqualifies it.
//! Markers are case-sensitive.
//!
//! Matching runs left to right and never overlaps. Start-marker lines inside
//! an open block are kept as content, and each one consumes one extra
//! end-marker line, so a single level of nesting collapses into the outer
//! block:
//!
//! ```text
//! [MCP-START]
//! A
//! [MCP-START]        ─┐
//! B                   │ literal content of the outer block
//! [MCP-END]          ─┘
//! [MCP-END]
//! ```
//!
//! When the input runs out before the nesting balances, the block closes at
//! the first end-marker line seen after it opened. Malformed input never
//! fails; it just yields fewer blocks.

use std::collections::HashMap;

/// Line that opens a block.
pub const START_MARKER: &str = "[MCP-START]";

/// Line that closes a block.
pub const END_MARKER: &str = "[MCP-END]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Start,
    End,
    Text,
}

fn classify(line: &str) -> LineKind {
    match line.trim() {
        START_MARKER => LineKind::Start,
        END_MARKER => LineKind::End,
        _ => LineKind::Text,
    }
}

/// Extract the trimmed inner content of every block in `text`, in order.
///
/// Whitespace-only blocks are returned as empty strings; dropping them is
/// the caller's decision.
pub fn extract_blocks(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let kinds: Vec<LineKind> = lines.iter().map(|l| classify(l)).collect();
    let index = CloseIndex::new(&kinds);

    let mut blocks = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if kinds[i] != LineKind::Start {
            i += 1;
            continue;
        }
        match index.close_for(i + 1) {
            Some(close) => {
                blocks.push(lines[i + 1..close].join("\n").trim().to_string());
                i = close + 1;
            }
            // No end marker anywhere below: nothing further can close.
            None => break,
        }
    }
    blocks
}

/// Precomputed end-marker positions, so each block's close is found
/// without rescanning the rest of the page.
///
/// `balance[k]` is starts minus ends over `kinds[..k]`. Scanning from `from`
/// with depth 0, the nesting depth before line `idx` is
/// `balance[idx] - balance[from]`, so the balanced close is the first end
/// line at or after `from` whose balance equals `balance[from]`.
struct CloseIndex {
    balance: Vec<isize>,
    /// First end line at or after each position.
    next_end: Vec<Option<usize>>,
    /// End lines grouped by the balance before them, ascending.
    ends_by_balance: HashMap<isize, Vec<usize>>,
}

impl CloseIndex {
    fn new(kinds: &[LineKind]) -> Self {
        let mut balance = Vec::with_capacity(kinds.len() + 1);
        let mut ends_by_balance: HashMap<isize, Vec<usize>> = HashMap::new();
        let mut current = 0isize;
        for (idx, kind) in kinds.iter().enumerate() {
            balance.push(current);
            match kind {
                LineKind::Start => current += 1,
                LineKind::End => {
                    ends_by_balance.entry(current).or_default().push(idx);
                    current -= 1;
                }
                LineKind::Text => {}
            }
        }
        balance.push(current);

        let mut next_end = vec![None; kinds.len() + 1];
        for idx in (0..kinds.len()).rev() {
            next_end[idx] = if kinds[idx] == LineKind::End {
                Some(idx)
            } else {
                next_end[idx + 1]
            };
        }

        Self {
            balance,
            next_end,
            ends_by_balance,
        }
    }

    /// Index of the end-marker line closing a block whose body starts at
    /// `from`. Falls back to the first end line when nesting never balances.
    fn close_for(&self, from: usize) -> Option<usize> {
        let target = self.balance[from];
        if let Some(ends) = self.ends_by_balance.get(&target) {
            let pos = ends.partition_point(|&e| e < from);
            if let Some(&close) = ends.get(pos) {
                return Some(close);
            }
        }
        self.next_end[from]
    }
}

/// Count whitespace-delimited tokens.
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}
