//! Translation of merged annotations into host display primitives.
//!
//! The overlay never paints anything itself. It computes [`OverlaySpan`]s for
//! a line range and hands them to a [`RenderSurface`].

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::{
  annotation::{
    Annotation,
    Display,
    HighlightKind,
    Payload,
    Resolved,
  },
  position::{
    DocumentId,
    LineRange,
  },
};

pub const DEFAULT_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStyle {
  Lens,
  Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
  pub text:  String,
  pub style: ChunkStyle,
}

pub type Chunks = SmallVec<[TextChunk; 3]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayPayload {
  /// Virtual text shown for all lenses of a line.
  VirtualText(Chunks),
  /// Underline from the span column up to `end_column`, or to the end of the
  /// line when `None`.
  Underline {
    end_column: Option<u32>,
    kind:       HighlightKind,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySpan {
  pub line:    u32,
  pub column:  u32,
  pub payload: DisplayPayload,
}

/// The host's drawing primitives.
pub trait RenderSurface: Send {
  fn clear_overlay(&mut self, document: DocumentId, lines: LineRange);
  fn set_overlay(&mut self, document: DocumentId, line: u32, column: u32, payload: &DisplayPayload);
}

/// Compute the spans for `lines`. `annotations` must be ordered by start
/// position, as returned by the store.
pub fn layout(annotations: &[Annotation], lines: LineRange, separator: &str) -> Vec<OverlaySpan> {
  let mut lenses: BTreeMap<u32, (u32, Chunks)> = BTreeMap::new();
  let mut spans = Vec::new();

  for annotation in annotations {
    let display = match &annotation.payload {
      Payload::Resolved(Resolved { display, .. }) => display,
      Payload::Pending(_) => continue,
    };
    match display {
      Display::Text(title) => {
        let line = annotation.line();
        if !lines.contains(line) {
          continue;
        }
        let (_, chunks) = lenses
          .entry(line)
          .or_insert_with(|| (annotation.range.start.character, Chunks::new()));
        if !chunks.is_empty() {
          chunks.push(TextChunk {
            text:  separator.to_string(),
            style: ChunkStyle::Separator,
          });
        }
        chunks.push(TextChunk {
          text:  title.clone(),
          style: ChunkStyle::Lens,
        });
      },
      Display::Highlight(kind) => underline(annotation, *kind, lines, &mut spans),
    }
  }

  spans.extend(
    lenses
      .into_iter()
      .map(|(line, (column, chunks))| OverlaySpan {
        line,
        column,
        payload: DisplayPayload::VirtualText(chunks),
      }),
  );
  spans.sort_by_key(|span| (span.line, span.column));
  spans
}

fn underline(annotation: &Annotation, kind: HighlightKind, lines: LineRange, spans: &mut Vec<OverlaySpan>) {
  let range = annotation.range;
  let Some(covered) = range.lines().intersect(lines) else {
    return;
  };
  for line in covered.start..covered.end {
    let first = line == range.start.line;
    let last = line == range.end.line;
    if last && !first && range.end.character == 0 {
      continue;
    }
    spans.push(OverlaySpan {
      line,
      column: if first { range.start.character } else { 0 },
      payload: DisplayPayload::Underline {
        end_column: last.then_some(range.end.character),
        kind,
      },
    });
  }
}
