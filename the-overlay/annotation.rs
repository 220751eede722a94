use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;

use crate::position::Range;

/// Kind of a document highlight, as reported by `textDocument/documentHighlight`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
  #[default]
  Text,
  Read,
  Write,
}

impl HighlightKind {
  /// Unknown codes fall back to [`HighlightKind::Text`], which is also the
  /// protocol default when the kind is omitted.
  pub fn from_lsp_code(code: u64) -> Self {
    match code {
      2 => Self::Read,
      3 => Self::Write,
      _ => Self::Text,
    }
  }
}

/// Provider-specific action attached to an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
  pub title:     String,
  pub command:   String,
  #[serde(default)]
  pub arguments: Vec<Value>,
}

impl Action {
  pub fn new(title: impl Into<String>, command: impl Into<String>) -> Self {
    Self {
      title:     title.into(),
      command:   command.into(),
      arguments: Vec::new(),
    }
  }

  pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
    self.arguments = arguments;
    self
  }

  /// Lenses with an empty command are display-only.
  pub fn is_executable(&self) -> bool {
    !self.command.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Display {
  Text(String),
  Highlight(HighlightKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
  pub display: Display,
  pub action:  Option<Action>,
}

/// Annotation fetched without its payload. `data` is echoed back to the
/// provider when resolving.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stub {
  pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  Resolved(Resolved),
  Pending(Stub),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
  pub range:   Range,
  pub payload: Payload,
}

impl Annotation {
  /// A resolved code lens: the action title is what gets displayed.
  pub fn lens(range: Range, action: Action) -> Self {
    Self {
      range,
      payload: Payload::Resolved(Resolved {
        display: Display::Text(action.title.clone()),
        action:  Some(action),
      }),
    }
  }

  pub fn stub(range: Range, data: Option<Value>) -> Self {
    Self {
      range,
      payload: Payload::Pending(Stub { data }),
    }
  }

  pub fn highlight(range: Range, kind: HighlightKind) -> Self {
    Self {
      range,
      payload: Payload::Resolved(Resolved {
        display: Display::Highlight(kind),
        action:  None,
      }),
    }
  }

  pub fn line(&self) -> u32 {
    self.range.start.line
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.payload, Payload::Pending(_))
  }

  pub fn stub_data(&self) -> Option<&Value> {
    match &self.payload {
      Payload::Pending(stub) => stub.data.as_ref(),
      Payload::Resolved(_) => None,
    }
  }

  /// The action, if this annotation is resolved and its action can run.
  pub fn executable_action(&self) -> Option<&Action> {
    match &self.payload {
      Payload::Resolved(Resolved {
        action: Some(action),
        ..
      }) if action.is_executable() => Some(action),
      Payload::Resolved(_) | Payload::Pending(_) => None,
    }
  }
}
