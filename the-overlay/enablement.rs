use hashbrown::HashMap;

use crate::position::DocumentId;

/// Process-wide default plus optional per-document overrides.
#[derive(Debug)]
pub struct Enablement {
  global:    bool,
  overrides: HashMap<DocumentId, bool, foldhash::fast::RandomState>,
}

impl Default for Enablement {
  fn default() -> Self {
    Self::new(true)
  }
}

impl Enablement {
  pub fn new(global: bool) -> Self {
    Self {
      global,
      overrides: HashMap::default(),
    }
  }

  pub fn global(&self) -> bool {
    self.global
  }

  pub fn override_for(&self, document: DocumentId) -> Option<bool> {
    self.overrides.get(&document).copied()
  }

  pub fn is_enabled(&self, document: DocumentId) -> bool {
    self.override_for(document).unwrap_or(self.global)
  }

  /// Set the process-wide default. Returns the documents among `documents`
  /// that follow it, their effective state has to be re-derived.
  pub fn set_global(
    &mut self,
    enabled: bool,
    documents: impl IntoIterator<Item = DocumentId>,
  ) -> Vec<DocumentId> {
    self.global = enabled;
    documents
      .into_iter()
      .filter(|document| !self.overrides.contains_key(document))
      .collect()
  }

  /// Set or (with `None`) remove the override of one document. Returns the
  /// effective state.
  pub fn set_document(&mut self, document: DocumentId, enabled: Option<bool>) -> bool {
    match enabled {
      Some(enabled) => {
        self.overrides.insert(document, enabled);
      },
      None => {
        self.overrides.remove(&document);
      },
    }
    self.is_enabled(document)
  }
}
