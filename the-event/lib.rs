//! Event plumbing shared by the overlay crates: the debounced hook framework
//! and the per-key deadlines the edit debouncer tracks.

mod deadlines;
mod hook;

pub use deadlines::Deadlines;
pub use hook::{
  AsyncHook,
  try_send,
};
