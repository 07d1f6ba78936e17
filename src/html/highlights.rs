//! Highlight layout and HTML rendering for text blocks
//!
//! Annotations are laid out against the block's original text: the text is
//! cut into consecutive segments, each either plain or owned by exactly one
//! annotation. Overlaps are resolved first-start-wins; a span overlapping
//! one already placed is suppressed rather than merged.

use crate::annotations::AnnotationId;
use crate::selection::NodeId;

/// Configuration for highlight rendering
#[derive(Debug, Clone)]
pub struct HighlightConfig {
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute for annotation ID
    pub id_attribute: String,
    /// Data attribute carrying the rendered node id
    pub node_attribute: String,
    /// Whether to include inline styles
    pub include_inline_styles: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            class_prefix: "geko-highlight".to_string(),
            id_attribute: "data-annotation-id".to_string(),
            node_attribute: "data-node-id".to_string(),
            include_inline_styles: true,
        }
    }
}

/// An annotation's character range within a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub annotation: AnnotationId,
    pub start: usize,
    pub end: usize,
}

impl HighlightSpan {
    pub fn new(annotation: AnnotationId, start: usize, end: usize) -> Self {
        Self {
            annotation,
            start,
            end,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    Plain,
    Annotation(AnnotationId),
}

/// A rendered text node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub node: NodeId,
    /// Character offset of the segment in the original text
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub kind: SegmentKind,
}

/// Segments of one block, in text order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub block_index: usize,
    pub segments: Vec<Segment>,
    /// Spans that were not rendered (overlapping or out of range)
    pub suppressed: Vec<AnnotationId>,
}

impl BlockLayout {
    /// Annotation that owns the character at `offset`, if any
    pub fn annotation_at(&self, offset: usize) -> Option<&AnnotationId> {
        self.segments
            .iter()
            .find(|s| s.start <= offset && offset < s.end)
            .and_then(|s| match &s.kind {
                SegmentKind::Annotation(id) => Some(id),
                SegmentKind::Plain => None,
            })
    }
}

/// Cut `text` into plain and highlighted segments
///
/// Spans are ordered by start offset; ties keep registration order. The
/// result always covers the whole text, and an empty text yields a single
/// empty plain segment so the block stays selectable.
pub fn layout_block(block_index: usize, text: &str, spans: &[HighlightSpan]) -> BlockLayout {
    let chars: Vec<char> = text.chars().collect();
    let mut ordered: Vec<&HighlightSpan> = spans.iter().collect();
    ordered.sort_by_key(|s| s.start);

    let mut segments = Vec::new();
    let mut suppressed = Vec::new();
    let mut cursor = 0;

    let push = |segments: &mut Vec<Segment>, start: usize, end: usize, kind: SegmentKind| {
        segments.push(Segment {
            node: NodeId::segment(block_index, start),
            start,
            end,
            text: chars[start..end].iter().collect(),
            kind,
        });
    };

    for span in ordered {
        if span.start >= span.end || span.end > chars.len() || span.start < cursor {
            tracing::debug!(
                block_index,
                annotation = %span.annotation,
                start = span.start,
                end = span.end,
                "Suppressed highlight span"
            );
            suppressed.push(span.annotation.clone());
            continue;
        }
        if cursor < span.start {
            push(&mut segments, cursor, span.start, SegmentKind::Plain);
        }
        push(
            &mut segments,
            span.start,
            span.end,
            SegmentKind::Annotation(span.annotation.clone()),
        );
        cursor = span.end;
    }

    if cursor < chars.len() || segments.is_empty() {
        push(&mut segments, cursor, chars.len(), SegmentKind::Plain);
    }

    BlockLayout {
        block_index,
        segments,
        suppressed,
    }
}

/// Render a laid out block as an HTML paragraph
pub fn render_block(layout: &BlockLayout, config: &HighlightConfig) -> String {
    let mut html = format!("<p data-block-index=\"{}\">", layout.block_index);

    for segment in &layout.segments {
        let node = html_escape::encode_double_quoted_attribute(&segment.node.0);
        let text = html_escape::encode_text(&segment.text);
        match &segment.kind {
            SegmentKind::Plain => {
                html.push_str(&format!(
                    "<span {}=\"{}\">{}</span>",
                    config.node_attribute, node, text
                ));
            }
            SegmentKind::Annotation(id) => {
                html.push_str(&format_highlight(id, &node, &text, config));
            }
        }
    }

    html.push_str("</p>");
    html
}

fn format_highlight(id: &AnnotationId, node: &str, text: &str, config: &HighlightConfig) -> String {
    let state = match id {
        AnnotationId::Draft(_) => "draft",
        AnnotationId::Final(_) => "final",
    };
    let class = format!("{} {}-{}", config.class_prefix, config.class_prefix, state);

    let style = if config.include_inline_styles {
        match id {
            AnnotationId::Draft(_) => " style=\"outline: 1px dashed currentColor;\"",
            AnnotationId::Final(_) => " style=\"background-color: #ffe58f; opacity: 0.9;\"",
        }
    } else {
        ""
    };

    format!(
        "<mark class=\"{}\" {}=\"{}\" {}=\"{}\"{}>{}</mark>",
        class,
        config.id_attribute,
        html_escape::encode_double_quoted_attribute(&id.to_string()),
        config.node_attribute,
        node,
        style,
        text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::TempId;

    const TEXT: &str = "I quattro giovani pittori dipingevano la scena del trionfo.";

    fn draft(n: u64, start: usize, end: usize) -> HighlightSpan {
        HighlightSpan::new(AnnotationId::Draft(TempId::new(n)), start, end)
    }

    fn covered(layout: &BlockLayout) -> String {
        layout.segments.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_layout_without_spans() {
        let layout = layout_block(0, TEXT, &[]);
        assert_eq!(layout.segments.len(), 1);
        assert_eq!(layout.segments[0].node, NodeId::segment(0, 0));
        assert_eq!(covered(&layout), TEXT);
    }

    #[test]
    fn test_layout_single_span() {
        let layout = layout_block(2, TEXT, &[draft(1, 10, 17)]);

        let bounds: Vec<_> = layout.segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(bounds, vec![(0, 10), (10, 17), (17, TEXT.len())]);
        assert_eq!(layout.segments[1].text, "giovani");
        assert_eq!(layout.segments[1].node.0, "b2-10");
        assert_eq!(
            layout.annotation_at(12),
            Some(&AnnotationId::Draft(TempId::new(1)))
        );
        assert_eq!(layout.annotation_at(5), None);
    }

    #[test]
    fn test_layout_orders_by_start() {
        let layout = layout_block(0, TEXT, &[draft(2, 18, 25), draft(1, 10, 17)]);
        let kinds: Vec<_> = layout
            .segments
            .iter()
            .filter_map(|s| match &s.kind {
                SegmentKind::Annotation(id) => Some(id.to_string()),
                SegmentKind::Plain => None,
            })
            .collect();
        assert_eq!(kinds, vec!["draft-1", "draft-2"]);
        assert_eq!(covered(&layout), TEXT);
    }

    #[test]
    fn test_layout_adjacent_spans() {
        let layout = layout_block(0, TEXT, &[draft(1, 10, 17), draft(2, 17, 25)]);
        assert!(layout.suppressed.is_empty());
        assert_eq!(layout.segments[2].text, " pittori");
    }

    #[test]
    fn test_overlap_first_start_wins() {
        let layout = layout_block(0, TEXT, &[draft(1, 10, 25), draft(2, 18, 30)]);
        assert_eq!(layout.suppressed, vec![AnnotationId::Draft(TempId::new(2))]);
        assert_eq!(covered(&layout), TEXT);

        // equal starts: first registered wins
        let layout = layout_block(0, TEXT, &[draft(3, 10, 17), draft(4, 10, 25)]);
        assert_eq!(layout.suppressed, vec![AnnotationId::Draft(TempId::new(4))]);
    }

    #[test]
    fn test_out_of_range_span_suppressed() {
        let layout = layout_block(0, "short", &[draft(1, 2, 40), draft(2, 3, 3)]);
        assert_eq!(layout.suppressed.len(), 2);
        assert_eq!(covered(&layout), "short");
    }

    #[test]
    fn test_empty_text() {
        let layout = layout_block(0, "", &[]);
        assert_eq!(layout.segments.len(), 1);
        assert_eq!((layout.segments[0].start, layout.segments[0].end), (0, 0));
    }

    #[test]
    fn test_render_block() {
        let spans = vec![
            draft(1, 10, 17),
            HighlightSpan::new(AnnotationId::final_id("urn:a/1"), 18, 25),
        ];
        let layout = layout_block(0, TEXT, &spans);
        let html = render_block(&layout, &HighlightConfig::default());

        assert!(html.starts_with("<p data-block-index=\"0\">"));
        assert!(html.contains("geko-highlight-draft"));
        assert!(html.contains("geko-highlight-final"));
        assert!(html.contains("data-annotation-id=\"urn:a/1\""));
        assert!(html.contains("data-node-id=\"b0-17\""));
        assert!(html.contains(">giovani</mark>"));
    }

    #[test]
    fn test_render_escapes_text() {
        let layout = layout_block(0, "a <b> & c", &[]);
        let config = HighlightConfig {
            include_inline_styles: false,
            ..HighlightConfig::default()
        };
        let html = render_block(&layout, &config);
        assert!(html.contains("a &lt;b&gt; &amp; c"));
        assert!(!html.contains("style="));
    }
}
