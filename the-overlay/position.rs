use std::{
  fmt,
  num::NonZeroU32,
};

use serde::{
  Deserialize,
  Serialize,
};

/// Host handle of an open document. The overlay never owns the document, it
/// only keys its own state by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(NonZeroU32);

impl DocumentId {
  pub const fn new(id: NonZeroU32) -> Self {
    Self(id)
  }

  pub const fn get(self) -> NonZeroU32 {
    self.0
  }
}

impl From<NonZeroU32> for DocumentId {
  fn from(value: NonZeroU32) -> Self {
    Self::new(value)
  }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// One annotation source, usually a language server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId(u32);

impl ProviderId {
  pub const fn new(id: u32) -> Self {
    Self(id)
  }

  pub const fn get(self) -> u32 {
    self.0
  }
}

impl fmt::Display for ProviderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Document-local position, `character` counts chars within the line.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Position {
  pub line:      u32,
  pub character: u32,
}

impl Position {
  pub const fn new(line: u32, character: u32) -> Self {
    Self { line, character }
  }
}

/// Half-open `[start, end)` range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
  pub start: Position,
  pub end:   Position,
}

impl Range {
  pub const fn new(start: Position, end: Position) -> Self {
    Self { start, end }
  }

  /// Zero-width range at `(line, character)`.
  pub const fn point(line: u32, character: u32) -> Self {
    let at = Position::new(line, character);
    Self { start: at, end: at }
  }

  pub fn lines(&self) -> LineRange {
    LineRange::new(self.start.line, self.end.line.saturating_add(1))
  }
}

/// Half-open span of lines, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
  pub start: u32,
  pub end:   u32,
}

impl LineRange {
  pub const ALL: Self = Self {
    start: 0,
    end:   u32::MAX,
  };

  pub const fn new(start: u32, end: u32) -> Self {
    Self { start, end }
  }

  pub const fn single(line: u32) -> Self {
    Self {
      start: line,
      end:   line.saturating_add(1),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.start >= self.end
  }

  pub fn contains(&self, line: u32) -> bool {
    self.start <= line && line < self.end
  }

  pub fn intersect(&self, other: LineRange) -> Option<LineRange> {
    let range = LineRange::new(self.start.max(other.start), self.end.min(other.end));
    (!range.is_empty()).then_some(range)
  }
}
