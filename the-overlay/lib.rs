//! Buffer-scoped annotation overlays (code lenses, document highlights).
//!
//! Annotations are fetched per document from any number of providers,
//! resolved lazily, cached per provider and handed to the host's render
//! surface for the visible lines. All state lives in [`OverlayManager`], which
//! consumes one queue of [`OverlayEvent`]s; hosts talk to it through an
//! [`OverlayHandle`].

pub mod annotation;
pub mod collab;
pub mod config;
mod debounce;
pub mod enablement;
pub mod event;
pub mod execute;
pub mod jump;
mod manager;
pub mod position;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod store;

pub use annotation::{
  Action,
  Annotation,
  Display,
  HighlightKind,
  Payload,
  Resolved,
  Stub,
};
pub use collab::{
  AnnotationSource,
  EditStream,
  Interaction,
  Notice,
  SourceError,
};
pub use config::{
  ConfigError,
  OverlayConfig,
};
pub use event::{
  OverlayEvent,
  OverlayHandle,
  RefreshTarget,
};
pub use manager::{
  Collaborators,
  OverlayManager,
};
pub use position::{
  DocumentId,
  LineRange,
  Position,
  ProviderId,
  Range,
};
pub use render::{
  ChunkStyle,
  DisplayPayload,
  OverlaySpan,
  RenderSurface,
  TextChunk,
};
