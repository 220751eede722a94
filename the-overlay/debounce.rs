use std::time::Duration;

use the_overlay_event::{
  AsyncHook,
  Deadlines,
};
use tokio::time::Instant;
use tracing::trace;

use crate::{
  event::{
    Completion,
    OverlayHandle,
  },
  position::DocumentId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DebounceEvent {
  /// (Re)start the quiescence window of the document.
  Schedule(DocumentId),
  Cancel(DocumentId),
}

/// Per-document edit debouncing. Every document has at most one pending
/// deadline; a newer edit replaces it.
pub(crate) struct EditDebounce {
  deadlines: Deadlines<DocumentId>,
  overlay:   OverlayHandle,
}

impl EditDebounce {
  pub(crate) fn new(window: Duration, overlay: OverlayHandle) -> Self {
    Self {
      deadlines: Deadlines::new(window),
      overlay,
    }
  }
}

impl AsyncHook for EditDebounce {
  type Event = DebounceEvent;

  fn handle_event(&mut self, event: Self::Event, _timeout: Option<Instant>) -> Option<Instant> {
    match event {
      DebounceEvent::Schedule(document) => self.deadlines.schedule(document, Instant::now()),
      DebounceEvent::Cancel(document) => {
        self.deadlines.cancel(document);
      },
    }
    self.deadlines.next()
  }

  fn finish_debounce(&mut self) -> Option<Instant> {
    for document in self.deadlines.take_elapsed(Instant::now()) {
      trace!(%document, "edits settled");
      self.overlay.complete(Completion::DebounceElapsed { document });
    }
    self.deadlines.next()
  }
}
