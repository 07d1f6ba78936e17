//! Selection types
//!
//! A live selection is expressed against rendered text nodes; a resolved
//! selection is expressed against the original text of a block.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A block of text the user can annotate (a paragraph)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Block identifier in the host document
    pub id: String,
    /// Original, unmodified text of the block
    pub text: String,
}

impl TextBlock {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Length in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Identifier of a rendered text node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Node id of the segment of `block_index` that starts at `start`
    pub fn segment(block_index: usize, start: usize) -> Self {
        Self(format!("b{}-{}", block_index, start))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A boundary point of a selection: a character offset within a rendered node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl SelectionPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Viewport rectangle of a selection range
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClientRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

/// A selected range as reported by the host
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRange {
    pub start: SelectionPoint,
    pub end: SelectionPoint,
    pub rect: ClientRect,
}

/// The live selection of the host view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSelection {
    range: Option<SelectionRange>,
    /// Horizontal scroll position of the viewport
    pub scroll_x: f64,
    /// Vertical scroll position of the viewport
    pub scroll_y: f64,
}

impl LiveSelection {
    pub fn new(range: SelectionRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    pub fn with_scroll(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_none()
    }

    pub(crate) fn take(&mut self) -> Option<SelectionRange> {
        self.range.take()
    }
}

/// A selection resolved against a block's original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionTuple {
    #[serde(rename = "blockIndex")]
    pub block_index: usize,
    #[serde(rename = "startOffset")]
    pub start_offset: usize,
    #[serde(rename = "endOffset")]
    pub end_offset: usize,
    pub text: String,
}

/// Page position where the edit popup opens
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PopupAnchor {
    pub top: f64,
    pub left: f64,
}

/// Result of resolving a live selection
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSelection {
    pub tuple: SelectionTuple,
    pub anchor: PopupAnchor,
}

/// Reasons a selection cannot become an annotation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("No active selection")]
    NoSelection,

    #[error("Selection is empty or whitespace only")]
    Empty,

    #[error("Selection node is not part of a tracked block: {0}")]
    UnknownNode(NodeId),

    #[error("Selection spans blocks {start} and {end}")]
    CrossBlock { start: usize, end: usize },

    #[error("Selection offset {offset} exceeds block {block_index} length {len}")]
    OutOfBounds {
        block_index: usize,
        offset: usize,
        len: usize,
    },
}
