use std::sync::Arc;

use tokio::sync::{
  mpsc::UnboundedSender,
  oneshot,
};
use tracing::warn;

use crate::{
  annotation::Annotation,
  collab::{
    AnnotationSource,
    SourceError,
  },
  execute::Candidate,
  position::{
    DocumentId,
    LineRange,
    Position,
    ProviderId,
  },
  store::FetchTicket,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTarget {
  Document(DocumentId),
  All,
}

/// Requests a host sends to the overlay.
pub enum OverlayEvent {
  RegisterProvider {
    provider: ProviderId,
    source:   Arc<dyn AnnotationSource>,
  },
  /// Detaches the provider from every document.
  UnregisterProvider {
    provider: ProviderId,
  },
  Attach {
    document: DocumentId,
    provider: ProviderId,
  },
  Detach {
    document: DocumentId,
    provider: ProviderId,
  },
  Edited {
    document: DocumentId,
    lines:    LineRange,
  },
  /// Lines currently visible for the document; rendering is scoped to them.
  Viewport {
    document: DocumentId,
    lines:    LineRange,
  },
  Refresh {
    target:   RefreshTarget,
    provider: Option<ProviderId>,
  },
  Clear {
    document: DocumentId,
    provider: Option<ProviderId>,
  },
  SetGlobalEnabled {
    enabled: bool,
  },
  /// `None` removes the override.
  SetDocumentEnabled {
    document: DocumentId,
    enabled:  Option<bool>,
  },
  Execute {
    document: DocumentId,
    line:     u32,
  },
  Jump {
    document: DocumentId,
    cursor:   Position,
    count:    i32,
    reply:    oneshot::Sender<Option<Position>>,
  },
  Annotations {
    document: DocumentId,
    reply:    oneshot::Sender<Vec<Annotation>>,
  },
  Shutdown,
}

/// Results of work the overlay spawned, posted back to its queue.
pub(crate) enum Completion {
  Fetched {
    document: DocumentId,
    ticket:   FetchTicket,
    result:   Result<Vec<Annotation>, SourceError>,
  },
  Resolved {
    document: DocumentId,
    provider: ProviderId,
    pass:     u64,
    index:    usize,
    result:   Result<Annotation, SourceError>,
  },
  Chosen {
    document:   DocumentId,
    candidates: Vec<Candidate>,
    selection:  Option<usize>,
  },
  Executed {
    document: DocumentId,
    provider: ProviderId,
    result:   Result<(), SourceError>,
  },
  DebounceElapsed {
    document: DocumentId,
  },
}

pub(crate) enum Message {
  Request(OverlayEvent),
  Completion(Completion),
}

/// Cloneable entry point into a running overlay.
#[derive(Clone)]
pub struct OverlayHandle {
  tx: UnboundedSender<Message>,
}

impl OverlayHandle {
  pub(crate) fn new(tx: UnboundedSender<Message>) -> Self {
    Self { tx }
  }

  /// Queue `event`. Returns `false` once the overlay has shut down.
  pub fn send(&self, event: OverlayEvent) -> bool {
    if self.tx.send(Message::Request(event)).is_err() {
      warn!("overlay is not running, dropping event");
      return false;
    }
    true
  }

  pub fn register_provider(&self, provider: ProviderId, source: Arc<dyn AnnotationSource>) -> bool {
    self.send(OverlayEvent::RegisterProvider { provider, source })
  }

  pub fn unregister_provider(&self, provider: ProviderId) -> bool {
    self.send(OverlayEvent::UnregisterProvider { provider })
  }

  pub fn attach(&self, document: DocumentId, provider: ProviderId) -> bool {
    self.send(OverlayEvent::Attach { document, provider })
  }

  pub fn detach(&self, document: DocumentId, provider: ProviderId) -> bool {
    self.send(OverlayEvent::Detach { document, provider })
  }

  pub fn edited(&self, document: DocumentId, lines: LineRange) -> bool {
    self.send(OverlayEvent::Edited { document, lines })
  }

  pub fn viewport(&self, document: DocumentId, lines: LineRange) -> bool {
    self.send(OverlayEvent::Viewport { document, lines })
  }

  pub fn refresh(&self, target: RefreshTarget, provider: Option<ProviderId>) -> bool {
    self.send(OverlayEvent::Refresh { target, provider })
  }

  pub fn clear(&self, document: DocumentId, provider: Option<ProviderId>) -> bool {
    self.send(OverlayEvent::Clear { document, provider })
  }

  pub fn set_global_enabled(&self, enabled: bool) -> bool {
    self.send(OverlayEvent::SetGlobalEnabled { enabled })
  }

  pub fn set_document_enabled(&self, document: DocumentId, enabled: Option<bool>) -> bool {
    self.send(OverlayEvent::SetDocumentEnabled { document, enabled })
  }

  pub fn execute(&self, document: DocumentId, line: u32) -> bool {
    self.send(OverlayEvent::Execute { document, line })
  }

  /// `None` when there is nothing to jump to, or the overlay is gone.
  pub async fn jump(&self, document: DocumentId, cursor: Position, count: i32) -> Option<Position> {
    let (reply, rx) = oneshot::channel();
    if !self.send(OverlayEvent::Jump {
      document,
      cursor,
      count,
      reply,
    }) {
      return None;
    }
    rx.await.ok().flatten()
  }

  /// Merged annotations of `document`, ordered by position.
  pub async fn annotations(&self, document: DocumentId) -> Vec<Annotation> {
    let (reply, rx) = oneshot::channel();
    if !self.send(OverlayEvent::Annotations { document, reply }) {
      return Vec::new();
    }
    rx.await.unwrap_or_default()
  }

  pub fn shutdown(&self) -> bool {
    self.send(OverlayEvent::Shutdown)
  }

  pub(crate) fn complete(&self, completion: Completion) {
    // the overlay dropping its queue means nobody waits for this anymore
    let _ = self.tx.send(Message::Completion(completion));
  }
}
