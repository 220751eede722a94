//! Collaborators the overlay talks to but does not implement.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
  annotation::{
    Action,
    Annotation,
  },
  event::OverlayHandle,
  position::DocumentId,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error("request failed: {0}")]
  Request(String),
  #[error("malformed response: {0}")]
  Malformed(String),
  #[error("{0} is not supported by this provider")]
  Unsupported(&'static str),
}

/// Where annotations come from, typically one language server.
///
/// Every call is a single attempt; an error is terminal for that call.
#[async_trait]
pub trait AnnotationSource: Send + Sync + 'static {
  fn name(&self) -> &str;

  async fn fetch(&self, document: DocumentId) -> Result<Vec<Annotation>, SourceError>;

  async fn resolve(&self, document: DocumentId, stub: Annotation) -> Result<Annotation, SourceError> {
    let _ = (document, stub);
    Err(SourceError::Unsupported("resolve"))
  }

  async fn execute(&self, document: DocumentId, action: Action) -> Result<(), SourceError> {
    let _ = (document, action);
    Err(SourceError::Unsupported("execute"))
  }
}

/// Per-document change notifications. A subscribed document reports its edits
/// through [`OverlayHandle::edited`].
pub trait EditStream: Send {
  fn subscribe(&mut self, document: DocumentId, handle: OverlayHandle);
  fn unsubscribe(&mut self, document: DocumentId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
  NothingToExecute { document: DocumentId, line: u32 },
  NoJumpTarget { document: DocumentId },
}

impl fmt::Display for Notice {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NothingToExecute { line, .. } => {
        write!(f, "No executable annotation found at line {}", line.saturating_add(1))
      },
      Self::NoJumpTarget { .. } => write!(f, "No annotation to jump to"),
    }
  }
}

/// User-facing side: notices and disambiguation.
#[async_trait]
pub trait Interaction: Send + Sync + 'static {
  fn notify(&self, notice: Notice);

  /// Let the user pick one of `labels`. `None` when the choice was dismissed.
  async fn choose(&self, labels: Vec<String>) -> Option<usize>;
}
