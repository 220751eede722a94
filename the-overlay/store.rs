//! Per-document annotation storage.
//!
//! Each provider's list is stored as one shared slice and replaced as a
//! whole, so a reader always sees either the previous or the next list.

use std::{
  collections::BTreeMap,
  sync::Arc,
};

use hashbrown::{
  HashMap,
  HashSet,
};

use crate::{
  annotation::Annotation,
  position::{
    DocumentId,
    LineRange,
    ProviderId,
  },
};

pub type AnnotationList = Arc<[Annotation]>;

type Map<K, V> = HashMap<K, V, foldhash::fast::RandomState>;

/// Identifies one outstanding fetch of one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
  pub provider: ProviderId,
  pub id:       u64,
}

#[derive(Debug, Default)]
pub struct DocumentState {
  providers: BTreeMap<ProviderId, AnnotationList>,
  version:   u16,
  applied:   u16,
  in_flight: HashSet<FetchTicket, foldhash::fast::RandomState>,
}

impl DocumentState {
  pub fn version(&self) -> u16 {
    self.version
  }

  pub fn applied(&self) -> u16 {
    self.applied
  }

  /// The overlay no longer reflects the stored annotations.
  pub fn is_stale(&self) -> bool {
    self.version != self.applied
  }

  pub fn is_refreshing(&self) -> bool {
    !self.in_flight.is_empty()
  }

  fn bump(&mut self) {
    self.version = self.version.wrapping_add(1);
  }
}

#[derive(Debug, Default)]
pub struct AnnotationStore {
  documents: Map<DocumentId, DocumentState>,
}

impl AnnotationStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn contains(&self, document: DocumentId) -> bool {
    self.documents.contains_key(&document)
  }

  pub fn state(&self, document: DocumentId) -> Option<&DocumentState> {
    self.documents.get(&document)
  }

  pub fn ensure(&mut self, document: DocumentId) -> &mut DocumentState {
    self.documents.entry(document).or_default()
  }

  pub fn remove(&mut self, document: DocumentId) -> Option<DocumentState> {
    self.documents.remove(&document)
  }

  /// Replace the list of `provider`. The list is stable-sorted by start
  /// position first.
  pub fn save(&mut self, document: DocumentId, provider: ProviderId, mut annotations: Vec<Annotation>) {
    annotations.sort_by_key(|annotation| annotation.range.start);
    let state = self.ensure(document);
    state.providers.insert(provider, annotations.into());
    state.bump();
  }

  pub fn snapshot(&self, document: DocumentId, provider: ProviderId) -> Option<AnnotationList> {
    self
      .documents
      .get(&document)
      .and_then(|state| state.providers.get(&provider))
      .cloned()
  }

  /// Merged annotations of every provider ordered by (line, column). Ties
  /// keep provider order, then the order within the provider's list.
  pub fn entries(&self, document: DocumentId) -> Vec<(ProviderId, Annotation)> {
    let Some(state) = self.documents.get(&document) else {
      return Vec::new();
    };
    let mut merged: Vec<_> = state
      .providers
      .iter()
      .flat_map(|(provider, list)| list.iter().map(|annotation| (*provider, annotation.clone())))
      .collect();
    merged.sort_by_key(|(_, annotation)| annotation.range.start);
    merged
  }

  pub fn get(&self, document: DocumentId) -> Vec<Annotation> {
    self
      .entries(document)
      .into_iter()
      .map(|(_, annotation)| annotation)
      .collect()
  }

  /// Empty the list of `provider`, or of every provider when `None`.
  pub fn clear(&mut self, document: DocumentId, provider: Option<ProviderId>) {
    let Some(state) = self.documents.get_mut(&document) else {
      return;
    };
    for (id, list) in state.providers.iter_mut() {
      if provider.is_none_or(|provider| provider == *id) {
        *list = Arc::from([]);
      }
    }
    state.bump();
  }

  pub fn remove_provider(&mut self, document: DocumentId, provider: ProviderId) {
    let Some(state) = self.documents.get_mut(&document) else {
      return;
    };
    state.providers.remove(&provider);
    state.in_flight.retain(|ticket| ticket.provider != provider);
    state.bump();
  }

  /// Drop annotations starting inside `lines`. Returns whether anything was
  /// removed.
  pub fn invalidate_lines(&mut self, document: DocumentId, lines: LineRange) -> bool {
    let Some(state) = self.documents.get_mut(&document) else {
      return false;
    };
    let mut changed = false;
    for list in state.providers.values_mut() {
      if !list.iter().any(|annotation| lines.contains(annotation.line())) {
        continue;
      }
      let kept: Vec<_> = list
        .iter()
        .filter(|annotation| !lines.contains(annotation.line()))
        .cloned()
        .collect();
      *list = kept.into();
      changed = true;
    }
    if changed {
      state.bump();
    }
    changed
  }

  pub fn is_refreshing(&self, document: DocumentId) -> bool {
    self
      .documents
      .get(&document)
      .is_some_and(DocumentState::is_refreshing)
  }

  pub fn begin_fetch(&mut self, document: DocumentId, ticket: FetchTicket) {
    self.ensure(document).in_flight.insert(ticket);
  }

  /// Returns `false` for tickets that are no longer tracked, the completion
  /// is stale in that case.
  pub fn finish_fetch(&mut self, document: DocumentId, ticket: FetchTicket) -> bool {
    self
      .documents
      .get_mut(&document)
      .is_some_and(|state| state.in_flight.remove(&ticket))
  }

  /// Forget every outstanding fetch of `document`; their completions will be
  /// discarded as stale.
  pub fn cancel_fetches(&mut self, document: DocumentId) {
    if let Some(state) = self.documents.get_mut(&document) {
      state.in_flight.clear();
    }
  }

  pub fn mark_applied(&mut self, document: DocumentId) {
    if let Some(state) = self.documents.get_mut(&document) {
      state.applied = state.version;
    }
  }
}
