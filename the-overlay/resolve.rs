//! Second round-trip for annotations that arrive without a payload.

use crate::annotation::Annotation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settle {
  Pending,
  Complete,
}

/// One resolution pass over the list a provider returned for a document.
///
/// Every annotation counts towards completion: resolved ones settle when the
/// pass is created, stubs settle when their resolve request finishes, with or
/// without a payload.
#[derive(Debug)]
pub struct ResolvePass {
  id:          u64,
  annotations: Vec<Annotation>,
  waiting:     Vec<bool>,
  settled:     usize,
}

impl ResolvePass {
  /// Returns the pass and the stubs that need a resolve request, paired with
  /// their index in the list.
  pub fn new(id: u64, annotations: Vec<Annotation>) -> (Self, Vec<(usize, Annotation)>) {
    let waiting: Vec<bool> = annotations.iter().map(Annotation::is_pending).collect();
    let stubs = annotations
      .iter()
      .enumerate()
      .filter(|(_, annotation)| annotation.is_pending())
      .map(|(index, annotation)| (index, annotation.clone()))
      .collect();
    let settled = waiting.iter().filter(|waiting| !**waiting).count();
    let pass = Self {
      id,
      annotations,
      waiting,
      settled,
    };
    (pass, stubs)
  }

  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn annotations(&self) -> &[Annotation] {
    &self.annotations
  }

  pub fn total(&self) -> usize {
    self.annotations.len()
  }

  pub fn settled(&self) -> usize {
    self.settled
  }

  pub fn is_complete(&self) -> bool {
    self.settled == self.total()
  }

  fn status(&self) -> Settle {
    if self.is_complete() {
      Settle::Complete
    } else {
      Settle::Pending
    }
  }

  /// Record the outcome for the stub at `index`. `None` means the resolve
  /// failed and the stub stays as it is. Repeated or out of range indices are
  /// ignored.
  pub fn settle(&mut self, index: usize, resolved: Option<Annotation>) -> Settle {
    let Some(waiting) = self.waiting.get_mut(index) else {
      return self.status();
    };
    if !*waiting {
      return self.status();
    }
    *waiting = false;
    self.settled += 1;
    if let Some(annotation) = resolved {
      self.annotations[index] = annotation;
    }
    self.status()
  }
}
