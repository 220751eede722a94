use std::{
  collections::{
    BTreeMap,
    BTreeSet,
  },
  num::NonZeroU32,
  sync::{
    Arc,
    atomic::{
      AtomicBool,
      AtomicUsize,
      Ordering,
    },
  },
  time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{
  Value,
  json,
};
use the_overlay::{
  Action,
  Annotation,
  AnnotationSource,
  ChunkStyle,
  Collaborators,
  DisplayPayload,
  DocumentId,
  EditStream,
  HighlightKind,
  Interaction,
  LineRange,
  Notice,
  OverlayConfig,
  OverlayHandle,
  OverlayManager,
  Position,
  ProviderId,
  Range,
  RefreshTarget,
  RenderSurface,
  SourceError,
};
use tokio::{
  sync::Semaphore,
  time::sleep,
};

fn doc(id: u32) -> DocumentId {
  DocumentId::new(NonZeroU32::new(id).unwrap())
}

fn lens(line: u32, character: u32, title: &str) -> Annotation {
  Annotation::lens(Range::point(line, character), Action::new(title, format!("cmd.{title}")))
}

fn highlight(line: u32) -> Annotation {
  Annotation::highlight(
    Range::new(Position::new(line, 0), Position::new(line, 3)),
    HighlightKind::Read,
  )
}

#[derive(Default)]
struct Scripted {
  annotations:  Mutex<Vec<Annotation>>,
  gate:         Option<Arc<Semaphore>>,
  resolve_gate: Option<Arc<Semaphore>>,
  fail_fetch:   AtomicBool,
  fail_resolve: Mutex<Vec<Value>>,
  fetched:      Mutex<Vec<DocumentId>>,
  resolves:     AtomicUsize,
  executed:     Mutex<Vec<Action>>,
}

impl Scripted {
  fn returning(annotations: Vec<Annotation>) -> Arc<Self> {
    Arc::new(Self {
      annotations: Mutex::new(annotations),
      ..Self::default()
    })
  }

  fn gated(annotations: Vec<Annotation>, gate: Arc<Semaphore>) -> Arc<Self> {
    Arc::new(Self {
      annotations: Mutex::new(annotations),
      gate: Some(gate),
      ..Self::default()
    })
  }

  fn fetches(&self) -> usize {
    self.fetched.lock().len()
  }

  fn fetches_of(&self, document: DocumentId) -> usize {
    self
      .fetched
      .lock()
      .iter()
      .filter(|fetched| **fetched == document)
      .count()
  }
}

#[async_trait]
impl AnnotationSource for Scripted {
  fn name(&self) -> &str {
    "scripted"
  }

  async fn fetch(&self, document: DocumentId) -> Result<Vec<Annotation>, SourceError> {
    self.fetched.lock().push(document);
    if let Some(gate) = &self.gate {
      gate
        .acquire()
        .await
        .map_err(|_| SourceError::Request("gate closed".into()))?
        .forget();
    }
    if self.fail_fetch.load(Ordering::SeqCst) {
      return Err(SourceError::Request("server crashed".into()));
    }
    Ok(self.annotations.lock().clone())
  }

  async fn resolve(&self, _document: DocumentId, stub: Annotation) -> Result<Annotation, SourceError> {
    self.resolves.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.resolve_gate {
      gate
        .acquire()
        .await
        .map_err(|_| SourceError::Request("gate closed".into()))?
        .forget();
    }
    let data = stub.stub_data().cloned().unwrap_or(Value::Null);
    if self.fail_resolve.lock().contains(&data) {
      return Err(SourceError::Request(format!("cannot resolve {data}")));
    }
    Ok(Annotation::lens(stub.range, Action::new(format!("resolved {data}"), "run")))
  }

  async fn execute(&self, _document: DocumentId, action: Action) -> Result<(), SourceError> {
    self.executed.lock().push(action);
    Ok(())
  }
}

#[derive(Debug, Clone)]
enum Op {
  Clear(DocumentId, LineRange),
  Set(DocumentId, u32, DisplayPayload),
}

#[derive(Clone, Default)]
struct Canvas {
  ops: Arc<Mutex<Vec<Op>>>,
}

impl Canvas {
  /// What is on screen for `document` after replaying every operation.
  fn lines(&self, document: DocumentId) -> BTreeMap<u32, Vec<String>> {
    let mut lines: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for op in self.ops.lock().iter() {
      match op {
        Op::Clear(target, range) if *target == document => {
          lines.retain(|line, _| !range.contains(*line));
        },
        Op::Set(target, line, payload) if *target == document => {
          lines.entry(*line).or_default().push(describe(payload));
        },
        Op::Clear(..) | Op::Set(..) => {},
      }
    }
    lines
  }

  /// Number of times the whole document was cleared.
  fn full_clears(&self, document: DocumentId) -> usize {
    self
      .ops
      .lock()
      .iter()
      .filter(|op| {
        matches!(op, Op::Clear(target, range) if *target == document && *range == LineRange::ALL)
      })
      .count()
  }

  fn sets(&self) -> usize {
    self
      .ops
      .lock()
      .iter()
      .filter(|op| matches!(op, Op::Set(..)))
      .count()
  }
}

fn describe(payload: &DisplayPayload) -> String {
  match payload {
    DisplayPayload::VirtualText(chunks) => {
      chunks
        .iter()
        .filter(|chunk| chunk.style == ChunkStyle::Lens)
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(",")
    },
    DisplayPayload::Underline { kind, .. } => format!("underline:{kind:?}"),
  }
}

impl RenderSurface for Canvas {
  fn clear_overlay(&mut self, document: DocumentId, lines: LineRange) {
    self.ops.lock().push(Op::Clear(document, lines));
  }

  fn set_overlay(&mut self, document: DocumentId, line: u32, _column: u32, payload: &DisplayPayload) {
    self.ops.lock().push(Op::Set(document, line, payload.clone()));
  }
}

#[derive(Clone, Default)]
struct Subscriptions {
  documents: Arc<Mutex<BTreeSet<DocumentId>>>,
}

impl EditStream for Subscriptions {
  fn subscribe(&mut self, document: DocumentId, _handle: OverlayHandle) {
    self.documents.lock().insert(document);
  }

  fn unsubscribe(&mut self, document: DocumentId) {
    self.documents.lock().remove(&document);
  }
}

#[derive(Default)]
struct Prompts {
  choice:  Option<usize>,
  delay:   Option<Duration>,
  notices: Mutex<Vec<Notice>>,
  offered: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl Interaction for Prompts {
  fn notify(&self, notice: Notice) {
    self.notices.lock().push(notice);
  }

  async fn choose(&self, labels: Vec<String>) -> Option<usize> {
    self.offered.lock().push(labels);
    if let Some(delay) = self.delay {
      sleep(delay).await;
    }
    self.choice
  }
}

struct Harness {
  handle:        OverlayHandle,
  canvas:        Canvas,
  subscriptions: Subscriptions,
  prompts:       Arc<Prompts>,
}

fn start(config: OverlayConfig, prompts: Prompts) -> Harness {
  let canvas = Canvas::default();
  let subscriptions = Subscriptions::default();
  let prompts = Arc::new(prompts);
  let manager = OverlayManager::new(config, Collaborators {
    surface:     Box::new(canvas.clone()),
    edits:       Box::new(subscriptions.clone()),
    interaction: prompts.clone(),
  });
  let handle = manager.handle();
  tokio::spawn(manager.run());
  Harness {
    handle,
    canvas,
    subscriptions,
    prompts,
  }
}

/// Let every ready task run; the paused clock only moves once all are idle.
async fn settle() {
  sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn detaching_last_provider_discards_everything() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  harness
    .handle
    .register_provider(provider, Scripted::returning(vec![lens(0, 0, "a")]));
  harness.handle.attach(doc(1), provider);
  settle().await;
  assert_eq!(harness.canvas.lines(doc(1)).len(), 1);
  assert!(harness.subscriptions.documents.lock().contains(&doc(1)));

  harness.handle.detach(doc(1), provider);
  settle().await;
  assert!(harness.handle.annotations(doc(1)).await.is_empty());
  assert!(harness.canvas.lines(doc(1)).is_empty());
  assert!(harness.subscriptions.documents.lock().is_empty());
  assert!(harness.handle.annotations(doc(9)).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn providers_are_merged_by_position() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let (a, b) = (ProviderId::new(1), ProviderId::new(2));
  harness.handle.register_provider(
    a,
    Scripted::returning(vec![lens(2, 0, "a2"), lens(0, 4, "a0")]),
  );
  harness
    .handle
    .register_provider(b, Scripted::returning(vec![lens(0, 0, "b0")]));
  harness.handle.attach(doc(1), a);
  settle().await;
  harness.handle.attach(doc(1), b);
  settle().await;

  let titles: Vec<_> = harness
    .handle
    .annotations(doc(1))
    .await
    .iter()
    .filter_map(|annotation| annotation.executable_action().map(|action| action.title.clone()))
    .collect();
  assert_eq!(titles, vec!["b0", "a0", "a2"]);
  assert_eq!(harness.canvas.lines(doc(1))[&0], vec!["b0,a0".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn refresh_while_in_flight_is_a_no_op() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let gate = Arc::new(Semaphore::new(0));
  let source = Scripted::gated(vec![lens(0, 0, "a")], gate.clone());
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  harness
    .handle
    .refresh(RefreshTarget::Document(doc(1)), None);
  harness.handle.refresh(RefreshTarget::All, None);
  settle().await;
  assert_eq!(source.fetches(), 1);

  gate.add_permits(1);
  settle().await;
  assert_eq!(harness.handle.annotations(doc(1)).await.len(), 1);

  harness
    .handle
    .refresh(RefreshTarget::Document(doc(1)), None);
  gate.add_permits(1);
  settle().await;
  assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn edit_burst_triggers_one_refresh_after_quiescence() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let source = Scripted::returning(vec![lens(8, 0, "a")]);
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  settle().await;
  assert_eq!(source.fetches(), 1);

  for line in 0..3 {
    harness.handle.edited(doc(1), LineRange::single(line));
    sleep(Duration::from_millis(30)).await;
  }
  // 30ms since the last edit, the 100ms window restarted with it
  sleep(Duration::from_millis(69)).await;
  assert_eq!(source.fetches(), 1);

  sleep(Duration::from_millis(2)).await;
  assert_eq!(source.fetches(), 2);

  sleep(Duration::from_millis(500)).await;
  assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn edits_clear_touched_lines_immediately() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  harness.handle.register_provider(
    provider,
    Scripted::returning(vec![lens(1, 0, "one"), lens(4, 0, "four")]),
  );
  harness.handle.attach(doc(1), provider);
  settle().await;

  harness.handle.edited(doc(1), LineRange::new(0, 2));
  settle().await;
  let lines = harness.canvas.lines(doc(1));
  assert_eq!(lines.keys().copied().collect::<Vec<_>>(), vec![4]);
  assert_eq!(harness.handle.annotations(doc(1)).await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn resolves_render_incrementally_and_complete_once() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let gate = Arc::new(Semaphore::new(0));
  let source = Arc::new(Scripted {
    annotations: Mutex::new(vec![
      Annotation::stub(Range::point(0, 0), Some(json!(1))),
      Annotation::stub(Range::point(1, 0), Some(json!(2))),
      Annotation::stub(Range::point(2, 0), Some(json!(3))),
    ]),
    resolve_gate: Some(gate.clone()),
    fail_resolve: Mutex::new(vec![json!(2)]),
    ..Scripted::default()
  });
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  settle().await;
  assert_eq!(source.resolves.load(Ordering::SeqCst), 3);
  // the stubs themselves render nothing, only the fetch render cleared
  assert_eq!(harness.canvas.full_clears(doc(1)), 1);
  assert!(harness.canvas.lines(doc(1)).is_empty());

  gate.add_permits(1);
  settle().await;
  let lines = harness.canvas.lines(doc(1));
  assert_eq!(lines[&0], vec!["resolved 1".to_string()]);
  assert!(harness.handle.annotations(doc(1)).await[2].is_pending());
  assert_eq!(harness.canvas.full_clears(doc(1)), 1);

  gate.add_permits(2);
  settle().await;
  let annotations = harness.handle.annotations(doc(1)).await;
  assert!(!annotations[0].is_pending());
  assert!(annotations[1].is_pending());
  assert!(!annotations[2].is_pending());
  assert_eq!(harness.canvas.full_clears(doc(1)), 2);

  let lines = harness.canvas.lines(doc(1));
  assert_eq!(lines[&0], vec!["resolved 1".to_string()]);
  assert!(!lines.contains_key(&1));
  assert_eq!(lines[&2], vec!["resolved 3".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn clear_abandons_pending_resolves() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let gate = Arc::new(Semaphore::new(0));
  let source = Arc::new(Scripted {
    annotations: Mutex::new(vec![
      Annotation::stub(Range::point(0, 0), Some(json!(1))),
      Annotation::stub(Range::point(1, 0), Some(json!(2))),
    ]),
    resolve_gate: Some(gate.clone()),
    ..Scripted::default()
  });
  harness.handle.register_provider(provider, source);
  harness.handle.attach(doc(1), provider);
  settle().await;

  harness.handle.clear(doc(1), None);
  settle().await;
  gate.add_permits(2);
  settle().await;
  assert!(harness.handle.annotations(doc(1)).await.is_empty());
  assert!(harness.canvas.lines(doc(1)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn jump_moves_between_highlights() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  harness.handle.register_provider(
    provider,
    Scripted::returning(vec![highlight(0), highlight(2), highlight(5)]),
  );
  harness.handle.attach(doc(1), provider);
  settle().await;

  let target = harness.handle.jump(doc(1), Position::new(0, 0), 2).await;
  assert_eq!(target, Some(Position::new(5, 0)));
  assert_eq!(harness.handle.jump(doc(1), Position::new(5, 0), 2).await, None);
  assert_eq!(*harness.prompts.notices.lock(), vec![Notice::NoJumpTarget {
    document: doc(1),
  }]);
  assert_eq!(harness.canvas.lines(doc(1))[&2], vec![
    "underline:Read".to_string()
  ]);
}

#[tokio::test(start_paused = true)]
async fn global_enable_skips_overridden_documents() {
  let config = OverlayConfig {
    enable: false,
    ..OverlayConfig::default()
  };
  let harness = start(config, Prompts::default());
  let provider = ProviderId::new(1);
  let source = Scripted::returning(vec![lens(0, 0, "a")]);
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  harness.handle.attach(doc(2), provider);
  harness.handle.set_document_enabled(doc(2), Some(false));
  settle().await;
  assert_eq!(source.fetches(), 0);

  harness.handle.set_global_enabled(true);
  settle().await;
  assert_eq!(source.fetches_of(doc(1)), 1);
  assert_eq!(source.fetches_of(doc(2)), 0);

  harness.handle.set_document_enabled(doc(2), None);
  settle().await;
  assert_eq!(source.fetches_of(doc(2)), 1);

  harness.handle.set_global_enabled(false);
  settle().await;
  assert!(harness.handle.annotations(doc(1)).await.is_empty());
  assert!(harness.canvas.lines(doc(1)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn execute_single_candidate_runs_and_refreshes() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let source = Scripted::returning(vec![lens(3, 0, "run")]);
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  settle().await;

  harness.handle.execute(doc(1), 0);
  harness.handle.execute(doc(1), 3);
  settle().await;
  assert_eq!(*harness.prompts.notices.lock(), vec![Notice::NothingToExecute {
    document: doc(1),
    line:     0,
  }]);
  assert_eq!(source.executed.lock().len(), 1);
  assert_eq!(source.executed.lock()[0].command, "cmd.run");
  assert_eq!(source.fetches(), 2);
  assert!(harness.prompts.offered.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn execute_asks_when_candidates_collide() {
  let prompts = Prompts {
    choice: Some(1),
    ..Prompts::default()
  };
  let harness = start(OverlayConfig::default(), prompts);
  let provider = ProviderId::new(1);
  let source = Scripted::returning(vec![lens(3, 0, "run"), lens(3, 6, "debug")]);
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  settle().await;

  harness.handle.execute(doc(1), 3);
  settle().await;
  assert_eq!(*harness.prompts.offered.lock(), vec![vec![
    "run".to_string(),
    "debug".to_string()
  ]]);
  let executed = source.executed.lock();
  assert_eq!(executed.len(), 1);
  assert_eq!(executed[0].title, "debug");
}

#[tokio::test(start_paused = true)]
async fn completion_after_detach_is_discarded() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let gate = Arc::new(Semaphore::new(0));
  harness
    .handle
    .register_provider(provider, Scripted::gated(vec![lens(0, 0, "late")], gate.clone()));
  harness.handle.attach(doc(1), provider);
  settle().await;
  harness.handle.detach(doc(1), provider);
  settle().await;

  gate.add_permits(1);
  settle().await;
  assert!(harness.handle.annotations(doc(1)).await.is_empty());
  assert_eq!(harness.canvas.sets(), 0);
}

#[tokio::test(start_paused = true)]
async fn fetch_error_keeps_previous_annotations() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let source = Scripted::returning(vec![lens(0, 0, "kept")]);
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  settle().await;

  source.fail_fetch.store(true, Ordering::SeqCst);
  harness
    .handle
    .refresh(RefreshTarget::Document(doc(1)), None);
  settle().await;
  assert_eq!(source.fetches(), 2);
  assert_eq!(harness.handle.annotations(doc(1)).await.len(), 1);
  assert_eq!(harness.canvas.lines(doc(1))[&0], vec!["kept".to_string()]);

  // the failed attempt is not left in flight
  harness
    .handle
    .refresh(RefreshTarget::Document(doc(1)), None);
  settle().await;
  assert_eq!(source.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn rendering_follows_the_viewport() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  harness.handle.register_provider(
    provider,
    Scripted::returning(vec![lens(1, 0, "top"), lens(10, 0, "bottom")]),
  );
  harness.handle.attach(doc(1), provider);
  harness.handle.viewport(doc(1), LineRange::new(0, 5));
  settle().await;
  assert_eq!(
    harness.canvas.lines(doc(1)).keys().copied().collect::<Vec<_>>(),
    vec![1]
  );

  harness.handle.viewport(doc(1), LineRange::new(8, 12));
  settle().await;
  assert_eq!(
    harness.canvas.lines(doc(1)).keys().copied().collect::<Vec<_>>(),
    vec![1, 10]
  );
}

#[tokio::test(start_paused = true)]
async fn unregistering_provider_detaches_it_everywhere() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let (a, b) = (ProviderId::new(1), ProviderId::new(2));
  harness
    .handle
    .register_provider(a, Scripted::returning(vec![lens(0, 0, "a")]));
  harness
    .handle
    .register_provider(b, Scripted::returning(vec![lens(1, 0, "b")]));
  harness.handle.attach(doc(1), a);
  harness.handle.attach(doc(2), a);
  settle().await;
  harness.handle.attach(doc(2), b);
  settle().await;

  harness.handle.unregister_provider(a);
  settle().await;
  assert!(harness.handle.annotations(doc(1)).await.is_empty());
  assert_eq!(harness.handle.annotations(doc(2)).await.len(), 1);
  assert_eq!(*harness.subscriptions.documents.lock(), BTreeSet::from([doc(2)]));

  // attaching an unknown provider is ignored
  harness.handle.attach(doc(3), a);
  settle().await;
  assert!(!harness.subscriptions.documents.lock().contains(&doc(3)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_the_loop() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  assert!(harness.handle.shutdown());
  settle().await;
  assert!(!harness.handle.attach(doc(1), ProviderId::new(1)));
}

#[tokio::test(start_paused = true)]
async fn fetch_finishing_after_disable_is_discarded() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let provider = ProviderId::new(1);
  let gate = Arc::new(Semaphore::new(0));
  harness
    .handle
    .register_provider(provider, Scripted::gated(vec![lens(0, 0, "late")], gate.clone()));
  harness.handle.attach(doc(1), provider);
  settle().await;
  harness.handle.set_document_enabled(doc(1), Some(false));
  settle().await;

  gate.add_permits(1);
  settle().await;
  assert!(harness.handle.annotations(doc(1)).await.is_empty());
  assert!(harness.canvas.lines(doc(1)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn selection_after_detach_is_not_executed() {
  let prompts = Prompts {
    choice: Some(0),
    delay: Some(Duration::from_millis(50)),
    ..Prompts::default()
  };
  let harness = start(OverlayConfig::default(), prompts);
  let provider = ProviderId::new(1);
  let source = Scripted::returning(vec![lens(3, 0, "run"), lens(3, 6, "debug")]);
  harness.handle.register_provider(provider, source.clone());
  harness.handle.attach(doc(1), provider);
  settle().await;

  harness.handle.execute(doc(1), 3);
  settle().await;
  harness.handle.detach(doc(1), provider);
  sleep(Duration::from_millis(100)).await;
  assert_eq!(harness.prompts.offered.lock().len(), 1);
  assert!(source.executed.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn provider_attached_during_refresh_is_fetched_afterwards() {
  let harness = start(OverlayConfig::default(), Prompts::default());
  let (a, b) = (ProviderId::new(1), ProviderId::new(2));
  let gate = Arc::new(Semaphore::new(0));
  let first = Scripted::gated(vec![lens(0, 0, "a")], gate.clone());
  let second = Scripted::returning(vec![lens(1, 0, "b")]);
  harness.handle.register_provider(a, first.clone());
  harness.handle.register_provider(b, second.clone());
  harness.handle.attach(doc(1), a);
  harness.handle.attach(doc(1), b);
  settle().await;
  assert_eq!(second.fetches(), 0);

  gate.add_permits(1);
  sleep(Duration::from_secs(1)).await;
  assert_eq!(first.fetches(), 1);
  assert_eq!(second.fetches(), 1);
  assert_eq!(harness.handle.annotations(doc(1)).await.len(), 2);
}
