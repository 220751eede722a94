//! Request params and response parsing for the annotation requests:
//! `textDocument/codeLens`, `codeLens/resolve`,
//! `textDocument/documentHighlight` and `workspace/executeCommand`.

use serde::Deserialize;
use serde_json::{
  Value,
  json,
};
use the_overlay::{
  Action,
  HighlightKind,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LspPosition {
  pub line:      u32,
  pub character: u32,
}

impl LspPosition {
  pub fn new(line: u32, character: u32) -> Self {
    Self { line, character }
  }

  fn as_json(self) -> Value {
    json!({
      "line": self.line,
      "character": self.character,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LspRange {
  pub start: LspPosition,
  pub end:   LspPosition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeLens {
  pub range:   LspRange,
  /// `None` until the lens is resolved.
  pub command: Option<Action>,
  /// The lens exactly as the server sent it, handed back on resolve.
  pub raw:     Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentHighlight {
  pub range: LspRange,
  pub kind:  HighlightKind,
}

#[derive(Debug, Error)]
pub enum PayloadError {
  #[error("invalid lsp annotation result shape")]
  InvalidShape,
  #[error("codeLens/resolve returned no lens")]
  MissingResult,
  #[error("failed to decode lsp annotation payload: {0}")]
  Decode(#[from] serde_json::Error),
}

pub fn code_lens_params(uri: &str) -> Value {
  json!({
    "textDocument": { "uri": uri },
  })
}

pub fn code_lens_resolve_params(lens: &Value) -> Value {
  lens.clone()
}

pub fn document_highlight_params(uri: &str, position: LspPosition) -> Value {
  json!({
    "textDocument": { "uri": uri },
    "position": position.as_json(),
  })
}

pub fn execute_command_params(action: &Action) -> Value {
  if action.arguments.is_empty() {
    return json!({ "command": action.command });
  }
  json!({
    "command": action.command,
    "arguments": action.arguments,
  })
}

pub fn parse_code_lens_response(result: Option<&Value>) -> Result<Vec<CodeLens>, PayloadError> {
  let Some(result) = result else {
    return Ok(Vec::new());
  };
  if result.is_null() {
    return Ok(Vec::new());
  }

  let lenses = result.as_array().ok_or(PayloadError::InvalidShape)?;
  lenses.iter().map(parse_code_lens).collect()
}

pub fn parse_code_lens_resolve_response(result: Option<&Value>) -> Result<CodeLens, PayloadError> {
  match result {
    Some(result) if !result.is_null() => parse_code_lens(result),
    _ => Err(PayloadError::MissingResult),
  }
}

pub fn parse_document_highlight_response(
  result: Option<&Value>,
) -> Result<Vec<DocumentHighlight>, PayloadError> {
  let Some(result) = result else {
    return Ok(Vec::new());
  };
  if result.is_null() {
    return Ok(Vec::new());
  }

  let highlights: Vec<DocumentHighlightPayload> = serde_json::from_value(result.clone())?;
  Ok(
    highlights
      .into_iter()
      .map(DocumentHighlightPayload::into_highlight)
      .collect(),
  )
}

fn parse_code_lens(value: &Value) -> Result<CodeLens, PayloadError> {
  let payload: CodeLensPayload = serde_json::from_value(value.clone())?;
  Ok(CodeLens {
    range:   payload.range.into_range(),
    command: payload.command.map(CommandPayload::into_action),
    raw:     value.clone(),
  })
}

#[derive(Debug, Deserialize)]
struct CodeLensPayload {
  range:   RangePayload,
  command: Option<CommandPayload>,
}

#[derive(Debug, Deserialize)]
struct CommandPayload {
  title:     String,
  command:   String,
  #[serde(default)]
  arguments: Vec<Value>,
}

impl CommandPayload {
  fn into_action(self) -> Action {
    Action::new(self.title, self.command).with_arguments(self.arguments)
  }
}

#[derive(Debug, Deserialize)]
struct DocumentHighlightPayload {
  range: RangePayload,
  kind:  Option<u64>,
}

impl DocumentHighlightPayload {
  fn into_highlight(self) -> DocumentHighlight {
    DocumentHighlight {
      range: self.range.into_range(),
      kind:  self
        .kind
        .map(HighlightKind::from_lsp_code)
        .unwrap_or_default(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct RangePayload {
  start: PositionPayload,
  end:   PositionPayload,
}

impl RangePayload {
  fn into_range(self) -> LspRange {
    LspRange {
      start: self.start.into_position(),
      end:   self.end.into_position(),
    }
  }
}

#[derive(Debug, Deserialize)]
struct PositionPayload {
  line:      u32,
  character: u32,
}

impl PositionPayload {
  fn into_position(self) -> LspPosition {
    LspPosition {
      line:      self.line,
      character: self.character,
    }
  }
}
