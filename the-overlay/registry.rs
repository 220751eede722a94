use std::collections::{
  BTreeMap,
  BTreeSet,
};

use crate::position::{
  DocumentId,
  ProviderId,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attached {
  /// First provider of the document.
  Document,
  /// Another provider joined an already tracked document.
  Provider,
  Already,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detached {
  /// The document still has other providers.
  Provider,
  /// That was the last provider, the document is no longer tracked.
  Document,
  Unknown,
}

/// Which documents currently have providers attached.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
  documents: BTreeMap<DocumentId, BTreeSet<ProviderId>>,
}

impl DocumentRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn attach(&mut self, document: DocumentId, provider: ProviderId) -> Attached {
    let providers = self.documents.entry(document).or_default();
    let first = providers.is_empty();
    if !providers.insert(provider) {
      return Attached::Already;
    }
    if first {
      Attached::Document
    } else {
      Attached::Provider
    }
  }

  pub fn detach(&mut self, document: DocumentId, provider: ProviderId) -> Detached {
    let Some(providers) = self.documents.get_mut(&document) else {
      return Detached::Unknown;
    };
    if !providers.remove(&provider) {
      return Detached::Unknown;
    }
    if providers.is_empty() {
      self.documents.remove(&document);
      Detached::Document
    } else {
      Detached::Provider
    }
  }

  pub fn contains(&self, document: DocumentId) -> bool {
    self.documents.contains_key(&document)
  }

  pub fn is_attached(&self, document: DocumentId, provider: ProviderId) -> bool {
    self
      .documents
      .get(&document)
      .is_some_and(|providers| providers.contains(&provider))
  }

  pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
    self.documents.keys().copied()
  }

  pub fn providers(&self, document: DocumentId) -> impl Iterator<Item = ProviderId> + '_ {
    self
      .documents
      .get(&document)
      .into_iter()
      .flat_map(|providers| providers.iter().copied())
  }

  pub fn documents_with(&self, provider: ProviderId) -> Vec<DocumentId> {
    self
      .documents
      .iter()
      .filter(|(_, providers)| providers.contains(&provider))
      .map(|(document, _)| *document)
      .collect()
  }
}
