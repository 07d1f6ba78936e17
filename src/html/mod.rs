//! Highlight rendering
//!
//! Splits a block's original text into plain and highlighted segments and
//! renders them as HTML. Segment boundaries are expressed in the original
//! text, which is what keeps selection offsets stable across re-renders.

mod highlights;

pub use highlights::{
    layout_block, render_block, BlockLayout, HighlightConfig, HighlightSpan, Segment, SegmentKind,
};
