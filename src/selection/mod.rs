//! Selection tracking
//!
//! Maps a live selection over rendered text nodes to a
//! `(block_index, start_offset, end_offset, text)` tuple. Offsets are always
//! relative to the block's original text: every rendered node is registered
//! with the offset at which its text starts in that original text, so
//! highlight markup interleaved by a previous render never shifts them.

mod types;

pub use types::{
    ClientRect, LiveSelection, NodeId, PopupAnchor, ResolvedSelection, SelectionError,
    SelectionPoint, SelectionRange, SelectionTuple, TextBlock,
};

use std::collections::HashMap;

use crate::html::BlockLayout;

/// Where a rendered node sits in the original text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeAnchor {
    block_index: usize,
    base_offset: usize,
}

/// Resolves live selections against a fixed set of text blocks
#[derive(Debug)]
pub struct SelectionTracker {
    blocks: Vec<TextBlock>,
    nodes: HashMap<NodeId, NodeAnchor>,
}

impl SelectionTracker {
    /// Track `blocks`, each initially rendered as a single plain node
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        let mut tracker = Self {
            blocks,
            nodes: HashMap::new(),
        };
        for block_index in 0..tracker.blocks.len() {
            tracker.register(block_index, std::iter::once(0));
        }
        tracker
    }

    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    pub fn block(&self, block_index: usize) -> Option<&TextBlock> {
        self.blocks.get(block_index)
    }

    /// Re-register the nodes of a block after it has been re-rendered
    pub fn apply_layout(&mut self, layout: &BlockLayout) {
        self.register(
            layout.block_index,
            layout.segments.iter().map(|segment| segment.start),
        );
    }

    fn register(&mut self, block_index: usize, starts: impl Iterator<Item = usize>) {
        self.nodes.retain(|_, anchor| anchor.block_index != block_index);
        for base_offset in starts {
            self.nodes.insert(
                NodeId::segment(block_index, base_offset),
                NodeAnchor {
                    block_index,
                    base_offset,
                },
            );
        }
    }

    /// Resolve and clear the live selection
    ///
    /// Surrounding whitespace is excluded from the result, so the returned
    /// text is always exactly the block text between the returned offsets.
    pub fn resolve(
        &self,
        selection: &mut LiveSelection,
    ) -> Result<ResolvedSelection, SelectionError> {
        let (scroll_x, scroll_y) = (selection.scroll_x, selection.scroll_y);
        let range = selection.take().ok_or(SelectionError::NoSelection)?;

        let start = self.locate(&range.start)?;
        let end = self.locate(&range.end)?;
        if start.0 != end.0 {
            return Err(SelectionError::CrossBlock {
                start: start.0,
                end: end.0,
            });
        }

        let block_index = start.0;
        let (mut from, mut to) = (start.1.min(end.1), start.1.max(end.1));

        let block = self
            .blocks
            .get(block_index)
            .ok_or_else(|| SelectionError::UnknownNode(range.start.node.clone()))?;
        let chars: Vec<char> = block.text.chars().collect();
        if to > chars.len() {
            return Err(SelectionError::OutOfBounds {
                block_index,
                offset: to,
                len: chars.len(),
            });
        }

        while from < to && chars[from].is_whitespace() {
            from += 1;
        }
        while to > from && chars[to - 1].is_whitespace() {
            to -= 1;
        }
        if from == to {
            return Err(SelectionError::Empty);
        }

        let text: String = chars[from..to].iter().collect();
        tracing::debug!(block_index, from, to, "Resolved selection");

        Ok(ResolvedSelection {
            tuple: SelectionTuple {
                block_index,
                start_offset: from,
                end_offset: to,
                text,
            },
            anchor: PopupAnchor {
                top: range.rect.top + scroll_y,
                left: range.rect.left + scroll_x,
            },
        })
    }

    fn locate(&self, point: &SelectionPoint) -> Result<(usize, usize), SelectionError> {
        let anchor = self
            .nodes
            .get(&point.node)
            .ok_or_else(|| SelectionError::UnknownNode(point.node.clone()))?;
        let offset = anchor.base_offset.checked_add(point.offset).ok_or_else(|| {
            SelectionError::OutOfBounds {
                block_index: anchor.block_index,
                offset: point.offset,
                len: self
                    .blocks
                    .get(anchor.block_index)
                    .map_or(0, |block| block.text.chars().count()),
            }
        })?;
        Ok((anchor.block_index, offset))
    }
}

/// Slice `text` by character offsets
pub fn slice_chars(text: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let byte_at = |offset: usize| {
        text.char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .nth(offset)
    };
    Some(&text[byte_at(start)?..byte_at(end)?])
}
