//! Tree line table.
//!
//! An implicit-key treap stored in an arena. Each node is one line; subtrees carry
//! their line count and character count, so both "n-th line" and "line containing
//! offset" are a single root-to-leaf walk. Edits replace a contiguous run of lines
//! with split + merge.

use super::{LineRecord, LineTable};
use std::ops::Range;

type Link = Option<usize>;

#[derive(Debug, Clone)]
struct Node {
    record: LineRecord,
    priority: u64,
    left: Link,
    right: Link,
    /// Lines in this subtree.
    lines: usize,
    /// Characters in this subtree.
    chars: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TreeLines {
    nodes: Vec<Node>,
    free: Vec<usize>,
    root: Link,
    seed: u64,
}

impl TreeLines {
    pub(crate) fn from_records(records: &[LineRecord]) -> Self {
        let mut tree = Self::default();
        tree.root = tree.build(records);
        tree
    }

    // splitmix64; deterministic so that identical edit sequences give identical shapes.
    fn next_priority(&mut self) -> u64 {
        self.seed = self.seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.seed;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn alloc(&mut self, record: LineRecord) -> usize {
        let node = Node {
            record,
            priority: self.next_priority(),
            left: None,
            right: None,
            lines: 1,
            chars: record.length,
        };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, link: Link) {
        let mut stack: Vec<usize> = link.into_iter().collect();
        while let Some(index) = stack.pop() {
            stack.extend(self.nodes[index].left);
            stack.extend(self.nodes[index].right);
            self.free.push(index);
        }
    }

    fn lines_of(&self, link: Link) -> usize {
        link.map_or(0, |index| self.nodes[index].lines)
    }

    fn chars_of(&self, link: Link) -> usize {
        link.map_or(0, |index| self.nodes[index].chars)
    }

    fn pull(&mut self, index: usize) {
        let (left, right) = (self.nodes[index].left, self.nodes[index].right);
        let lines = 1 + self.lines_of(left) + self.lines_of(right);
        let chars = self.nodes[index].record.length + self.chars_of(left) + self.chars_of(right);
        let node = &mut self.nodes[index];
        node.lines = lines;
        node.chars = chars;
    }

    /// Cartesian-tree construction over records in line order; O(n).
    fn build(&mut self, records: &[LineRecord]) -> Link {
        let mut spine: Vec<usize> = Vec::new();
        for record in records {
            let node = self.alloc(*record);
            let mut last: Link = None;
            while let Some(&top) = spine.last() {
                if self.nodes[top].priority >= self.nodes[node].priority {
                    break;
                }
                spine.pop();
                self.pull(top);
                last = Some(top);
            }
            self.nodes[node].left = last;
            if let Some(&top) = spine.last() {
                self.nodes[top].right = Some(node);
            }
            spine.push(node);
        }
        let root = spine.first().copied();
        while let Some(top) = spine.pop() {
            self.pull(top);
        }
        root
    }

    /// Split into the first `count` lines and the rest.
    fn split(&mut self, link: Link, count: usize) -> (Link, Link) {
        let Some(index) = link else {
            return (None, None);
        };
        let left_lines = self.lines_of(self.nodes[index].left);
        if count <= left_lines {
            let (a, b) = self.split(self.nodes[index].left, count);
            self.nodes[index].left = b;
            self.pull(index);
            (a, Some(index))
        } else {
            let (a, b) = self.split(self.nodes[index].right, count - left_lines - 1);
            self.nodes[index].right = a;
            self.pull(index);
            (Some(index), b)
        }
    }

    fn merge(&mut self, a: Link, b: Link) -> Link {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(left), Some(right)) => {
                if self.nodes[left].priority > self.nodes[right].priority {
                    let merged = self.merge(self.nodes[left].right, b);
                    self.nodes[left].right = merged;
                    self.pull(left);
                    Some(left)
                } else {
                    let merged = self.merge(a, self.nodes[right].left);
                    self.nodes[right].left = merged;
                    self.pull(right);
                    Some(right)
                }
            }
        }
    }

    #[cfg(test)]
    fn depth(&self, link: Link) -> usize {
        link.map_or(0, |index| {
            1 + self
                .depth(self.nodes[index].left)
                .max(self.depth(self.nodes[index].right))
        })
    }
}

impl LineTable for TreeLines {
    fn line_count(&self) -> usize {
        self.lines_of(self.root)
    }

    fn text_length(&self) -> usize {
        self.chars_of(self.root)
    }

    fn line(&self, index: usize) -> Option<(usize, LineRecord)> {
        let mut link = self.root;
        let mut remaining = index;
        let mut offset = 0;
        while let Some(current) = link {
            let node = &self.nodes[current];
            let left_lines = self.lines_of(node.left);
            if remaining < left_lines {
                link = node.left;
            } else if remaining == left_lines {
                return Some((offset + self.chars_of(node.left), node.record));
            } else {
                offset += self.chars_of(node.left) + node.record.length;
                remaining -= left_lines + 1;
                link = node.right;
            }
        }
        None
    }

    fn line_at_offset(&self, offset: usize) -> (usize, usize) {
        let mut link = self.root;
        let mut remaining = offset;
        let mut line = 0;
        let mut base = 0;
        while let Some(current) = link {
            let node = &self.nodes[current];
            let left_chars = self.chars_of(node.left);
            if remaining < left_chars {
                link = node.left;
                continue;
            }
            let left_lines = self.lines_of(node.left);
            if remaining < left_chars + node.record.length {
                return (line + left_lines, base + left_chars);
            }
            remaining -= left_chars + node.record.length;
            base += left_chars + node.record.length;
            line += left_lines + 1;
            link = node.right;
        }
        // Offset at the very end of the text belongs to the last line.
        let last = self.line_count().saturating_sub(1);
        let start = self.line(last).map_or(0, |(start, _)| start);
        (last, start)
    }

    fn splice(&mut self, lines: Range<usize>, replacement: &[LineRecord]) {
        let (head, rest) = self.split(self.root, lines.start);
        let (removed, tail) = self.split(rest, lines.end - lines.start);
        self.release(removed);
        let inserted = self.build(replacement);
        let head = self.merge(head, inserted);
        self.root = self.merge(head, tail);
    }

    fn records(&self) -> Vec<LineRecord> {
        let mut records = Vec::with_capacity(self.line_count());
        let mut stack = Vec::new();
        let mut link = self.root;
        while link.is_some() || !stack.is_empty() {
            while let Some(current) = link {
                stack.push(current);
                link = self.nodes[current].left;
            }
            if let Some(current) = stack.pop() {
                records.push(self.nodes[current].record);
                link = self.nodes[current].right;
            }
        }
        records
    }
}
