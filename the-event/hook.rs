//! Debounced background hooks.

use tokio::{
  sync::mpsc::{
    self,
    Sender,
    error::TrySendError,
  },
  time::Instant,
};

/// Capacity of a hook's channel. Edits arrive in bursts while typing.
const HOOK_CAPACITY: usize = 256;

/// A background task that receives events over a channel and acts on them
/// once its deadline passes. Every event may move the deadline; reaching it
/// calls [`AsyncHook::finish_debounce`], which may arm the next one.
pub trait AsyncHook: Sync + Send + 'static + Sized {
  type Event: Sync + Send + 'static;

  /// Called for every received event with the currently armed deadline.
  /// Returns the deadline to arm, `None` disarms.
  fn handle_event(&mut self, event: Self::Event, timeout: Option<Instant>) -> Option<Instant>;

  /// Called when the armed deadline passes. Hooks tracking several
  /// independent deadlines return the earliest one still pending.
  fn finish_debounce(&mut self) -> Option<Instant>;

  /// Start the hook on the current tokio runtime. Outside a runtime nothing
  /// is spawned and every send fails.
  fn spawn(self) -> Sender<Self::Event> {
    let (tx, rx) = mpsc::channel(HOOK_CAPACITY);
    if tokio::runtime::Handle::try_current().is_ok() {
      tokio::spawn(run(self, rx));
    } else {
      log::debug!("no tokio runtime, hook not started");
    }
    tx
  }
}

async fn run<Hook: AsyncHook>(mut hook: Hook, mut rx: mpsc::Receiver<Hook::Event>) {
  let mut deadline = None;
  loop {
    let event = match deadline {
      Some(at) => {
        match tokio::time::timeout_at(at, rx.recv()).await {
          Ok(event) => event,
          Err(_) => {
            deadline = hook.finish_debounce();
            continue;
          },
        }
      },
      None => rx.recv().await,
    };
    let Some(event) = event else {
      break;
    };
    deadline = hook.handle_event(event, deadline);
  }
}

/// Send without ever blocking the caller. Returns `false` when the event was
/// dropped because the hook is saturated or gone.
pub fn try_send<T>(tx: &Sender<T>, event: T) -> bool {
  match tx.try_send(event) {
    Ok(()) => true,
    Err(TrySendError::Full(_)) => {
      log::debug!("hook channel full, dropping event");
      false
    },
    Err(TrySendError::Closed(_)) => false,
  }
}
