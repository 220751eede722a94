//! The overlay context: owns every piece of per-document state and is the
//! only consumer of the overlay queue.

use std::{
  collections::{
    BTreeMap,
    BTreeSet,
  },
  sync::Arc,
};

use hashbrown::HashMap;
use the_overlay_event::{
  AsyncHook,
  try_send,
};
use tokio::sync::mpsc::{
  self,
  Sender,
  UnboundedReceiver,
};
use tracing::{
  debug,
  trace,
  warn,
};

use crate::{
  annotation::Annotation,
  collab::{
    AnnotationSource,
    EditStream,
    Interaction,
    Notice,
    SourceError,
  },
  config::OverlayConfig,
  debounce::{
    DebounceEvent,
    EditDebounce,
  },
  enablement::Enablement,
  event::{
    Completion,
    Message,
    OverlayEvent,
    OverlayHandle,
    RefreshTarget,
  },
  execute::{
    Candidate,
    executable_at,
  },
  jump,
  position::{
    DocumentId,
    LineRange,
    ProviderId,
  },
  registry::{
    Attached,
    Detached,
    DocumentRegistry,
  },
  render::{
    RenderSurface,
    layout,
  },
  resolve::{
    ResolvePass,
    Settle,
  },
  store::{
    AnnotationStore,
    FetchTicket,
  },
};

type Map<K, V> = HashMap<K, V, foldhash::fast::RandomState>;

/// Host services the overlay drives.
pub struct Collaborators {
  pub surface:     Box<dyn RenderSurface>,
  pub edits:       Box<dyn EditStream>,
  pub interaction: Arc<dyn Interaction>,
}

pub struct OverlayManager {
  config:       OverlayConfig,
  registry:     DocumentRegistry,
  store:        AnnotationStore,
  enablement:   Enablement,
  providers:    BTreeMap<ProviderId, Arc<dyn AnnotationSource>>,
  passes:       Map<(DocumentId, ProviderId), ResolvePass>,
  viewports:    Map<DocumentId, LineRange>,
  /// Providers attached while their document was refreshing, fetched once the
  /// outstanding fetches drain.
  deferred:     Map<DocumentId, BTreeSet<ProviderId>>,
  surface:      Box<dyn RenderSurface>,
  edits:        Box<dyn EditStream>,
  interaction:  Arc<dyn Interaction>,
  debounce:     Sender<DebounceEvent>,
  handle:       OverlayHandle,
  rx:           UnboundedReceiver<Message>,
  next_request: u64,
}

impl OverlayManager {
  /// Outside a tokio runtime the edit debouncer is not started and edits
  /// never trigger a refresh.
  pub fn new(config: OverlayConfig, collaborators: Collaborators) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = OverlayHandle::new(tx);
    let debounce = EditDebounce::new(config.debounce(), handle.clone()).spawn();
    Self {
      enablement: Enablement::new(config.enable),
      config,
      registry: DocumentRegistry::new(),
      store: AnnotationStore::new(),
      providers: BTreeMap::new(),
      passes: Map::default(),
      viewports: Map::default(),
      deferred: Map::default(),
      surface: collaborators.surface,
      edits: collaborators.edits,
      interaction: collaborators.interaction,
      debounce,
      handle,
      rx,
      next_request: 0,
    }
  }

  pub fn handle(&self) -> OverlayHandle {
    self.handle.clone()
  }

  pub fn config(&self) -> &OverlayConfig {
    &self.config
  }

  pub fn register_provider(&mut self, provider: ProviderId, source: Arc<dyn AnnotationSource>) {
    debug!(%provider, name = source.name(), "provider registered");
    self.providers.insert(provider, source);
  }

  pub fn annotations(&self, document: DocumentId) -> Vec<Annotation> {
    self.store.get(document)
  }

  /// Process queued events until [`OverlayEvent::Shutdown`].
  pub async fn run(mut self) {
    while let Some(message) = self.rx.recv().await {
      let keep_running = match message {
        Message::Request(event) => self.handle_event(event),
        Message::Completion(completion) => {
          self.handle_completion(completion);
          true
        },
      };
      if !keep_running {
        break;
      }
    }
    debug!("overlay stopped");
  }

  fn handle_event(&mut self, event: OverlayEvent) -> bool {
    match event {
      OverlayEvent::RegisterProvider { provider, source } => {
        self.register_provider(provider, source)
      },
      OverlayEvent::UnregisterProvider { provider } => self.unregister_provider(provider),
      OverlayEvent::Attach { document, provider } => self.attach(document, provider),
      OverlayEvent::Detach { document, provider } => self.detach(document, provider),
      OverlayEvent::Edited { document, lines } => self.edited(document, lines),
      OverlayEvent::Viewport { document, lines } => {
        if self.registry.contains(document) {
          self.viewports.insert(document, lines);
          self.render_lines(document, lines);
        }
      },
      OverlayEvent::Refresh { target, provider } => self.refresh(target, provider),
      OverlayEvent::Clear { document, provider } => {
        match provider {
          Some(provider) => {
            self.passes.remove(&(document, provider));
          },
          None => self.drop_passes(document),
        }
        self.store.clear(document, provider);
        self.render_document(document);
      },
      OverlayEvent::SetGlobalEnabled { enabled } => {
        let documents: Vec<_> = self.registry.documents().collect();
        for document in self.enablement.set_global(enabled, documents) {
          self.apply_enablement(document);
        }
      },
      OverlayEvent::SetDocumentEnabled { document, enabled } => {
        self.enablement.set_document(document, enabled);
        if self.registry.contains(document) {
          self.apply_enablement(document);
        }
      },
      OverlayEvent::Execute { document, line } => self.execute(document, line),
      OverlayEvent::Jump {
        document,
        cursor,
        count,
        reply,
      } => {
        let target = jump::jump(&self.store.get(document), cursor, count);
        if target.is_none() {
          self.interaction.notify(Notice::NoJumpTarget { document });
        }
        let _ = reply.send(target);
      },
      OverlayEvent::Annotations { document, reply } => {
        let _ = reply.send(self.store.get(document));
      },
      OverlayEvent::Shutdown => return false,
    }
    true
  }

  fn handle_completion(&mut self, completion: Completion) {
    match completion {
      Completion::Fetched {
        document,
        ticket,
        result,
      } => self.fetched(document, ticket, result),
      Completion::Resolved {
        document,
        provider,
        pass,
        index,
        result,
      } => self.resolved(document, provider, pass, index, result),
      Completion::Chosen {
        document,
        candidates,
        selection,
      } => {
        match selection.and_then(|index| candidates.into_iter().nth(index)) {
          Some(candidate) if self.registry.is_attached(document, candidate.provider) => {
            self.run_candidate(document, candidate)
          },
          Some(candidate) => {
            debug!(%document, provider = %candidate.provider, "discarding stale selection")
          },
          None => debug!(%document, "execution dismissed"),
        }
      },
      Completion::Executed {
        document,
        provider,
        result,
      } => {
        if let Err(err) = result {
          warn!(%document, %provider, "failed to execute annotation action: {err}");
        }
        self.refresh_document(document, None);
      },
      Completion::DebounceElapsed { document } => self.refresh_document(document, None),
    }
  }

  fn next_request(&mut self) -> u64 {
    self.next_request = self.next_request.wrapping_add(1);
    self.next_request
  }

  fn unregister_provider(&mut self, provider: ProviderId) {
    for document in self.registry.documents_with(provider) {
      self.detach(document, provider);
    }
    if self.providers.remove(&provider).is_some() {
      debug!(%provider, "provider unregistered");
    }
  }

  fn attach(&mut self, document: DocumentId, provider: ProviderId) {
    if !self.providers.contains_key(&provider) {
      warn!(%document, %provider, "attach of unregistered provider ignored");
      return;
    }
    match self.registry.attach(document, provider) {
      Attached::Already => return,
      Attached::Document => {
        self.store.ensure(document);
        self.edits.subscribe(document, self.handle.clone());
      },
      Attached::Provider => {},
    }
    debug!(%document, %provider, "provider attached");
    if !self.config.refresh_on_attach {
      return;
    }
    if self.store.is_refreshing(document) {
      trace!(%document, %provider, "deferring refresh of attached provider");
      self.deferred.entry(document).or_default().insert(provider);
      return;
    }
    self.refresh_document(document, Some(provider));
  }

  fn detach(&mut self, document: DocumentId, provider: ProviderId) {
    match self.registry.detach(document, provider) {
      Detached::Unknown => {},
      Detached::Provider => {
        self.store.remove_provider(document, provider);
        self.passes.remove(&(document, provider));
        if let Some(deferred) = self.deferred.get_mut(&document) {
          deferred.remove(&provider);
        }
        self.render_document(document);
      },
      Detached::Document => self.discard_document(document),
    }
  }

  fn discard_document(&mut self, document: DocumentId) {
    debug!(%document, "last provider detached");
    self.store.remove(document);
    self.drop_passes(document);
    self.deferred.remove(&document);
    self.viewports.remove(&document);
    self.surface.clear_overlay(document, LineRange::ALL);
    self.edits.unsubscribe(document);
    self.send_debounce(DebounceEvent::Cancel(document));
  }

  fn edited(&mut self, document: DocumentId, lines: LineRange) {
    if !self.registry.contains(document) {
      return;
    }
    if self.config.clear_on_edit {
      // resolve results for the old text would revive stale positions
      self.drop_passes(document);
      self.store.invalidate_lines(document, lines);
      self.surface.clear_overlay(document, lines);
    }
    self.send_debounce(DebounceEvent::Schedule(document));
  }

  fn send_debounce(&self, event: DebounceEvent) {
    if !try_send(&self.debounce, event) {
      warn!(?event, "edit debouncer unavailable");
    }
  }

  fn apply_enablement(&mut self, document: DocumentId) {
    if self.enablement.is_enabled(document) {
      self.refresh_document(document, None);
      return;
    }
    self.drop_passes(document);
    self.deferred.remove(&document);
    self.store.cancel_fetches(document);
    self.store.clear(document, None);
    self.surface.clear_overlay(document, LineRange::ALL);
    self.store.mark_applied(document);
  }

  fn drop_passes(&mut self, document: DocumentId) {
    self
      .passes
      .retain(|(pass_document, _), _| *pass_document != document);
  }

  fn refresh(&mut self, target: RefreshTarget, provider: Option<ProviderId>) {
    let documents: Vec<_> = match target {
      RefreshTarget::Document(document) => vec![document],
      RefreshTarget::All => self.registry.documents().collect(),
    };
    for document in documents {
      self.refresh_document(document, provider);
    }
  }

  fn refresh_document(&mut self, document: DocumentId, only: Option<ProviderId>) {
    if !self.registry.contains(document) || !self.enablement.is_enabled(document) {
      return;
    }
    if self.store.is_refreshing(document) {
      trace!(%document, "refresh already in flight");
      return;
    }
    let providers: Vec<_> = self
      .registry
      .providers(document)
      .filter(|provider| only.is_none_or(|only| only == *provider))
      .collect();
    self.fetch(document, providers);
  }

  /// Fetch the providers attached while `document` was refreshing, once
  /// nothing is in flight anymore.
  fn fetch_deferred(&mut self, document: DocumentId) {
    if self.store.is_refreshing(document) {
      return;
    }
    let Some(deferred) = self.deferred.remove(&document) else {
      return;
    };
    if !self.enablement.is_enabled(document) {
      return;
    }
    let providers: Vec<_> = deferred
      .into_iter()
      .filter(|provider| self.registry.is_attached(document, *provider))
      .collect();
    self.fetch(document, providers);
  }

  fn fetch(&mut self, document: DocumentId, providers: Vec<ProviderId>) {
    for provider in providers {
      let Some(source) = self.providers.get(&provider).cloned() else {
        continue;
      };
      let ticket = FetchTicket {
        provider,
        id: self.next_request(),
      };
      self.store.begin_fetch(document, ticket);
      let handle = self.handle.clone();
      tokio::spawn(async move {
        let result = source.fetch(document).await;
        handle.complete(Completion::Fetched {
          document,
          ticket,
          result,
        });
      });
    }
  }

  fn fetched(
    &mut self,
    document: DocumentId,
    ticket: FetchTicket,
    result: Result<Vec<Annotation>, SourceError>,
  ) {
    if !self.store.finish_fetch(document, ticket) {
      debug!(%document, provider = %ticket.provider, "discarding stale fetch");
      return;
    }
    match result {
      Ok(annotations) => self.begin_resolve(document, ticket.provider, annotations),
      Err(err) => warn!(%document, provider = %ticket.provider, "annotation fetch failed: {err}"),
    }
    self.fetch_deferred(document);
  }

  fn begin_resolve(&mut self, document: DocumentId, provider: ProviderId, mut annotations: Vec<Annotation>) {
    annotations.sort_by_key(|annotation| annotation.range.start);
    let id = self.next_request();
    let (pass, stubs) = ResolvePass::new(id, annotations);
    self.store.save(document, provider, pass.annotations().to_vec());
    self.render_document(document);
    if pass.is_complete() {
      self.passes.remove(&(document, provider));
      return;
    }

    let Some(source) = self.providers.get(&provider).cloned() else {
      return;
    };
    trace!(%document, %provider, stubs = stubs.len(), "resolving annotations");
    self.passes.insert((document, provider), pass);
    for (index, stub) in stubs {
      let source = source.clone();
      let handle = self.handle.clone();
      tokio::spawn(async move {
        let result = source.resolve(document, stub).await;
        handle.complete(Completion::Resolved {
          document,
          provider,
          pass: id,
          index,
          result,
        });
      });
    }
  }

  fn resolved(
    &mut self,
    document: DocumentId,
    provider: ProviderId,
    pass_id: u64,
    index: usize,
    result: Result<Annotation, SourceError>,
  ) {
    let key = (document, provider);
    let Some(pass) = self.passes.get_mut(&key).filter(|pass| pass.id() == pass_id) else {
      debug!(%document, %provider, "discarding stale resolve");
      return;
    };
    let resolved = match result {
      Ok(annotation) => Some(annotation),
      Err(err) => {
        debug!(%document, %provider, "annotation resolve failed: {err}");
        None
      },
    };
    let line = resolved.as_ref().map(Annotation::line);
    let settle = pass.settle(index, resolved);
    let snapshot = line.map(|_| pass.annotations().to_vec());

    if let (Some(line), Some(snapshot)) = (line, snapshot) {
      self.store.save(document, provider, snapshot);
      self.render_lines(document, LineRange::single(line));
    }
    if settle == Settle::Complete {
      self.passes.remove(&key);
      self.render_document(document);
    }
  }

  fn execute(&mut self, document: DocumentId, line: u32) {
    let mut candidates = executable_at(&self.store.entries(document), line);
    if candidates.is_empty() {
      self.interaction.notify(Notice::NothingToExecute { document, line });
      return;
    }
    if candidates.len() == 1 {
      if let Some(candidate) = candidates.pop() {
        self.run_candidate(document, candidate);
      }
      return;
    }

    let labels = candidates.iter().map(Candidate::label).collect();
    let interaction = self.interaction.clone();
    let handle = self.handle.clone();
    tokio::spawn(async move {
      let selection = interaction.choose(labels).await;
      handle.complete(Completion::Chosen {
        document,
        candidates,
        selection,
      });
    });
  }

  fn run_candidate(&mut self, document: DocumentId, candidate: Candidate) {
    let Some(source) = self.providers.get(&candidate.provider).cloned() else {
      warn!(%document, provider = %candidate.provider, "provider of annotation is gone");
      return;
    };
    // the action may edit the document, do not leave its lens behind meanwhile
    self.surface.clear_overlay(document, LineRange::single(candidate.line));
    let handle = self.handle.clone();
    let provider = candidate.provider;
    tokio::spawn(async move {
      let result = source.execute(document, candidate.action).await;
      handle.complete(Completion::Executed {
        document,
        provider,
        result,
      });
    });
  }

  fn visible(&self, document: DocumentId) -> LineRange {
    self
      .viewports
      .get(&document)
      .copied()
      .unwrap_or(LineRange::ALL)
  }

  fn render_lines(&mut self, document: DocumentId, lines: LineRange) {
    if !self.store.contains(document) {
      return;
    }
    let Some(lines) = lines.intersect(self.visible(document)) else {
      return;
    };
    let annotations = self.store.get(document);
    self.surface.clear_overlay(document, lines);
    for span in layout(&annotations, lines, &self.config.separator) {
      self
        .surface
        .set_overlay(document, span.line, span.column, &span.payload);
    }
  }

  fn render_document(&mut self, document: DocumentId) {
    self.render_lines(document, self.visible(document));
    self.store.mark_applied(document);
  }
}
