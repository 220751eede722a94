use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use serde_json::Value;
use the_overlay::{
  Action,
  Annotation,
  AnnotationSource,
  DocumentId,
  Position,
  Range,
  SourceError,
};
use thiserror::Error;
use tracing::trace;

use crate::{
  encoding::{
    OffsetEncoding,
    to_char_column,
    to_lsp_character,
  },
  payload::{
    LspPosition,
    LspRange,
    PayloadError,
    code_lens_params,
    code_lens_resolve_params,
    document_highlight_params,
    execute_command_params,
    parse_code_lens_resolve_response,
    parse_code_lens_response,
    parse_document_highlight_response,
  },
};

pub const CODE_LENS: &str = "textDocument/codeLens";
pub const CODE_LENS_RESOLVE: &str = "codeLens/resolve";
pub const DOCUMENT_HIGHLIGHT: &str = "textDocument/documentHighlight";
pub const EXECUTE_COMMAND: &str = "workspace/executeCommand";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
  #[error("language server is not running")]
  NotRunning,
  #[error("{method} failed: {message}")]
  Failed { method: String, message: String },
}

impl From<RequestError> for SourceError {
  fn from(err: RequestError) -> Self {
    SourceError::Request(err.to_string())
  }
}

impl From<PayloadError> for SourceError {
  fn from(err: PayloadError) -> Self {
    SourceError::Malformed(err.to_string())
  }
}

/// The client side of one language server connection.
#[async_trait]
pub trait LspRequester: Send + Sync + 'static {
  async fn request(&self, method: &str, params: Value) -> Result<Option<Value>, RequestError>;

  fn offset_encoding(&self) -> OffsetEncoding {
    OffsetEncoding::default()
  }
}

#[derive(Debug, Clone)]
struct TrackedDocument {
  uri:    String,
  text:   String,
  cursor: Position,
}

/// Uri, text and cursor of the documents the host has open, shared between
/// the host (writer) and the sources (readers).
#[derive(Debug, Clone, Default)]
pub struct DocumentLookup {
  documents: Arc<RwLock<HashMap<DocumentId, TrackedDocument, foldhash::fast::RandomState>>>,
}

impl DocumentLookup {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn open(&self, document: DocumentId, uri: impl Into<String>, text: impl Into<String>) {
    self.documents.write().insert(document, TrackedDocument {
      uri:    uri.into(),
      text:   text.into(),
      cursor: Position::default(),
    });
  }

  pub fn close(&self, document: DocumentId) {
    self.documents.write().remove(&document);
  }

  pub fn set_text(&self, document: DocumentId, text: impl Into<String>) {
    if let Some(tracked) = self.documents.write().get_mut(&document) {
      tracked.text = text.into();
    }
  }

  pub fn set_cursor(&self, document: DocumentId, cursor: Position) {
    if let Some(tracked) = self.documents.write().get_mut(&document) {
      tracked.cursor = cursor;
    }
  }

  pub fn uri(&self, document: DocumentId) -> Option<String> {
    self
      .documents
      .read()
      .get(&document)
      .map(|tracked| tracked.uri.clone())
  }

  pub fn cursor(&self, document: DocumentId) -> Option<Position> {
    self
      .documents
      .read()
      .get(&document)
      .map(|tracked| tracked.cursor)
  }

  fn require_uri(&self, document: DocumentId) -> Result<String, SourceError> {
    self
      .uri(document)
      .ok_or_else(|| SourceError::Request(format!("document {document} is not open")))
  }

  fn with_line<T>(&self, document: DocumentId, line: u32, f: impl FnOnce(&str) -> T) -> Option<T> {
    let documents = self.documents.read();
    let tracked = documents.get(&document)?;
    let text = tracked.text.lines().nth(line as usize)?;
    Some(f(text))
  }

  /// Server position to document position. Lines the lookup does not know
  /// keep the server column.
  fn position(&self, document: DocumentId, position: LspPosition, encoding: OffsetEncoding) -> Position {
    let character = self
      .with_line(document, position.line, |text| {
        to_char_column(text, position.character, encoding)
      })
      .unwrap_or(position.character);
    Position::new(position.line, character)
  }

  fn range(&self, document: DocumentId, range: LspRange, encoding: OffsetEncoding) -> Range {
    Range::new(
      self.position(document, range.start, encoding),
      self.position(document, range.end, encoding),
    )
  }

  fn lsp_position(&self, document: DocumentId, position: Position, encoding: OffsetEncoding) -> LspPosition {
    let character = self
      .with_line(document, position.line, |text| {
        to_lsp_character(text, position.character, encoding)
      })
      .unwrap_or(position.character);
    LspPosition::new(position.line, character)
  }
}

/// Code lenses of one server. Unresolved lenses become stubs carrying the
/// lens as the server sent it.
pub struct CodeLensSource<R> {
  requester: Arc<R>,
  documents: DocumentLookup,
}

impl<R: LspRequester> CodeLensSource<R> {
  pub fn new(requester: Arc<R>, documents: DocumentLookup) -> Self {
    Self {
      requester,
      documents,
    }
  }
}

#[async_trait]
impl<R: LspRequester> AnnotationSource for CodeLensSource<R> {
  fn name(&self) -> &str {
    "code-lens"
  }

  async fn fetch(&self, document: DocumentId) -> Result<Vec<Annotation>, SourceError> {
    let uri = self.documents.require_uri(document)?;
    let result = self
      .requester
      .request(CODE_LENS, code_lens_params(&uri))
      .await?;
    let lenses = parse_code_lens_response(result.as_ref())?;
    trace!(%document, count = lenses.len(), "code lenses received");

    let encoding = self.requester.offset_encoding();
    let annotations = lenses
      .into_iter()
      .map(|lens| {
        let range = self.documents.range(document, lens.range, encoding);
        match lens.command {
          Some(action) => Annotation::lens(range, action),
          None => Annotation::stub(range, Some(lens.raw)),
        }
      })
      .collect();
    Ok(annotations)
  }

  async fn resolve(&self, document: DocumentId, stub: Annotation) -> Result<Annotation, SourceError> {
    let lens = stub
      .stub_data()
      .ok_or_else(|| SourceError::Malformed("code lens stub without data".into()))?;
    let result = self
      .requester
      .request(CODE_LENS_RESOLVE, code_lens_resolve_params(lens))
      .await?;
    let resolved = parse_code_lens_resolve_response(result.as_ref())?;
    let action = resolved
      .command
      .ok_or_else(|| SourceError::Malformed("resolved code lens has no command".into()))?;
    let range = self
      .documents
      .range(document, resolved.range, self.requester.offset_encoding());
    Ok(Annotation::lens(range, action))
  }

  async fn execute(&self, _document: DocumentId, action: Action) -> Result<(), SourceError> {
    self
      .requester
      .request(EXECUTE_COMMAND, execute_command_params(&action))
      .await?;
    Ok(())
  }
}

/// Read/write highlights of the symbol under the document's cursor.
pub struct DocumentHighlightSource<R> {
  requester: Arc<R>,
  documents: DocumentLookup,
}

impl<R: LspRequester> DocumentHighlightSource<R> {
  pub fn new(requester: Arc<R>, documents: DocumentLookup) -> Self {
    Self {
      requester,
      documents,
    }
  }
}

#[async_trait]
impl<R: LspRequester> AnnotationSource for DocumentHighlightSource<R> {
  fn name(&self) -> &str {
    "document-highlight"
  }

  async fn fetch(&self, document: DocumentId) -> Result<Vec<Annotation>, SourceError> {
    let uri = self.documents.require_uri(document)?;
    let encoding = self.requester.offset_encoding();
    let cursor = self.documents.cursor(document).unwrap_or_default();
    let position = self.documents.lsp_position(document, cursor, encoding);
    let result = self
      .requester
      .request(DOCUMENT_HIGHLIGHT, document_highlight_params(&uri, position))
      .await?;

    let highlights = parse_document_highlight_response(result.as_ref())?;
    Ok(
      highlights
        .into_iter()
        .map(|highlight| {
          Annotation::highlight(
            self.documents.range(document, highlight.range, encoding),
            highlight.kind,
          )
        })
        .collect(),
    )
  }
}
